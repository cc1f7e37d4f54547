//! Error handling for the navigator
//!
//! Navigation failures fall into two groups:
//!
//! - **Configuration / invariant violations** (unknown layout constructor, missing path
//!   label, activating a route a fixed stack does not contain, ...). These are returned
//!   as [`NavigationError`] and terminate the current call. Callers are expected to fix
//!   their wiring, not to recover at runtime.
//! - **Callback failures** raised by user guards, redirects or deep-link handlers. They
//!   are wrapped in [`NavigationError::Callback`] and propagated unchanged to whoever
//!   triggered the navigation.
//!
//! A guard veto is *not* an error: it is reported through the `Ok` value of the
//! operation (`Ok(false)` / `Ok(Some(false))`).

use crate::path::PathId;
use std::error::Error as StdError;
use std::rc::Rc;

/// Convenient result alias used across the crate.
pub type Result<T, E = NavigationError> = std::result::Result<T, E>;

/// Errors that can occur during navigation
#[derive(Debug, Clone, thiserror::Error)]
pub enum NavigationError {
    /// A fixed stack was asked to activate a route it does not contain
    #[error("route '{uri}' is not part of stack '{path}'")]
    RouteNotInStack { path: String, uri: String },

    /// `go_to_indexed` was called with an index outside the fixed stack
    #[error("index {index} is out of range for stack '{path}' of length {len}")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    /// A fixed stack cannot be constructed empty
    #[error("indexed stack '{path}' requires at least one route")]
    EmptyIndexedStack { path: String },

    /// No layout constructor is registered for the requested layout type
    #[error("no layout constructor registered for '{name}'")]
    UnknownLayout { name: String },

    /// No restoration converter is registered under the given key
    #[error("no restoration converter registered for key '{key}'")]
    UnknownConverter { key: String },

    /// A path participating in restoration has no debug label
    #[error("stack path {id} has no debug label; restoration requires stable labels")]
    MissingDebugLabel { id: PathId },

    /// Two registered paths share the same debug label
    #[error("debug label '{label}' is used by more than one stack path")]
    DuplicateDebugLabel { label: String },

    /// A path uses a label reserved by the restoration tree
    #[error("debug label '{label}' is reserved")]
    ReservedDebugLabel { label: String },

    /// The route instance is already placed in a stack path
    #[error("route '{uri}' is already bound to stack path {path_id}")]
    RouteAlreadyBound { uri: String, path_id: PathId },

    /// The path is already owned by another coordinator
    #[error("stack path '{path}' is already bound to another coordinator")]
    PathAlreadyBound { path: String },

    /// A layout resolved to a path the coordinator does not own
    #[error("stack path '{path}' is not registered with this coordinator")]
    UnknownPath { path: String },

    /// A route declared as a layout did not resolve its child path
    #[error("layout '{name}' did not resolve a child path")]
    MissingLayoutPath { name: String },

    /// The layout chain of a route refers back to itself
    #[error("layout chain of '{name}' contains a cycle")]
    LayoutCycle { name: String },

    /// The configured redirect limit was exceeded
    #[error("redirect chain starting at '{uri}' exceeded {limit} hops")]
    RedirectLimitExceeded { uri: String, limit: usize },

    /// No URI parser was configured on the coordinator
    #[error("no route parser configured; cannot parse '{uri}'")]
    NoRouteParser { uri: String },

    /// The URI parser did not recognise the URI
    #[error("route not found: {uri}")]
    RouteNotFound { uri: String },

    /// The restoration tree does not have the expected shape
    #[error("invalid restoration state: {message}")]
    InvalidRestorationState { message: String },

    /// The operation needs a coordinator but the path is not bound to one
    #[error("stack path '{path}' is not bound to a coordinator")]
    Unbound { path: String },

    /// Error raised by a user-supplied guard, redirect or handler
    #[error("navigation callback failed: {0}")]
    Callback(Rc<dyn StdError>),
}

impl NavigationError {
    /// Wrap an error raised by application code (guard, redirect, handler).
    pub fn callback<E>(error: E) -> Self
    where
        E: StdError + 'static,
    {
        NavigationError::Callback(Rc::new(error))
    }

    /// Build a callback error from a plain message.
    pub fn message(message: impl Into<String>) -> Self {
        NavigationError::callback(CallbackMessage(message.into()))
    }

    /// Check if this error was raised by application code
    pub fn is_callback(&self) -> bool {
        matches!(self, NavigationError::Callback(_))
    }

    /// Check if this error is a configuration/invariant violation
    pub fn is_invariant_violation(&self) -> bool {
        !self.is_callback()
    }
}

impl From<serde_json::Error> for NavigationError {
    fn from(error: serde_json::Error) -> Self {
        NavigationError::InvalidRestorationState {
            message: error.to_string(),
        }
    }
}

/// Plain-text error used by [`NavigationError::message`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
struct CallbackMessage(String);

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_error_display() {
        let error = NavigationError::RouteNotFound {
            uri: "/test".to_string(),
        };
        assert_eq!(error.to_string(), "route not found: /test");
    }

    #[test]
    fn test_index_out_of_range_display() {
        let error = NavigationError::IndexOutOfRange {
            path: "tabs".to_string(),
            index: 4,
            len: 3,
        };
        assert_eq!(
            error.to_string(),
            "index 4 is out of range for stack 'tabs' of length 3"
        );
        assert!(error.is_invariant_violation());
    }

    #[test]
    fn test_callback_error_message() {
        let error = NavigationError::message("session expired");
        assert!(error.is_callback());
        assert!(!error.is_invariant_violation());
        assert_eq!(
            error.to_string(),
            "navigation callback failed: session expired"
        );
    }

    #[test]
    fn test_serde_error_maps_to_restoration_error() {
        let parse_error = serde_json::from_str::<u32>("not-json").unwrap_err();
        let error = NavigationError::from(parse_error);
        assert!(matches!(
            error,
            NavigationError::InvalidRestorationState { .. }
        ));
    }
}
