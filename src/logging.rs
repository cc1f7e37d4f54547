//! Logging abstraction layer
//!
//! Every record emitted by the navigator goes through the macros below, which forward
//! to either the `log` crate or the `tracing` crate depending on the enabled feature.
//! All records share the [`LOG_TARGET`] target so applications can filter navigation
//! noise independently (`RUST_LOG=stack_navigator=debug`).
//!
//! # Features
//!
//! - `log` (default) - Uses the standard `log` crate
//! - `tracing` - Uses the `tracing` crate for structured logging
//!
//! Choose one feature at compile time. They are mutually exclusive.
//!
//! # Levels
//!
//! - `debug` - entry into a coordinator operation (`push`, `navigate`, `recover`, ...)
//! - `trace` - individual stack mutations and redirect hops
//! - `info` / `warn` - guard vetoes, resyncs, skipped restoration entries
//!
//! ```ignore
//! use stack_navigator::{trace_log, debug_log, info_log};
//!
//! trace_log!("Binding route to path '{}'", label);
//! debug_log!("push: {}", route.to_uri());
//! info_log!("Navigation aborted by guard");
//! ```

/// Log target shared by every record the crate emits.
pub const LOG_TARGET: &str = "stack_navigator";

#[doc(hidden)]
#[macro_export]
macro_rules! __navigator_log {
    ($level:ident, $($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::$level!(target: $crate::logging::LOG_TARGET, $($arg)*);
        #[cfg(feature = "log")]
        ::log::$level!(target: $crate::logging::LOG_TARGET, $($arg)*);
    };
}

/// Trace-level logging (individual stack mutations)
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        $crate::__navigator_log!(trace, $($arg)*)
    };
}

/// Debug-level logging (navigation entry points)
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::__navigator_log!(debug, $($arg)*)
    };
}

/// Info-level logging
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        $crate::__navigator_log!(info, $($arg)*)
    };
}

/// Warn-level logging
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        $crate::__navigator_log!(warn, $($arg)*)
    };
}

/// Error-level logging
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        $crate::__navigator_log!(error, $($arg)*)
    };
}
