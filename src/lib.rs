//! # Stack Navigator
//!
//! A navigation runtime unifying imperative stack navigation (push/pop) and declarative,
//! URI-driven navigation in one coordinated model:
//!
//! - **Stack Paths** - Mutable stacks and fixed tab stacks with change listeners
//! - **Nested Layouts** - Routes declare the shell they live in; shells are found or created
//! - **Route Guards** - Async vetoes on removal (unsaved changes, confirmations)
//! - **Redirects** - Async substitution before placement (login walls)
//! - **Deep Links** - Per-route placement strategies for external URIs
//! - **Reconciliation** - Myers diff to move a stack to a target list with minimal edits
//! - **Restoration** - Serialize the whole state to JSON and rebuild it after process death
//! - **Route Matching** - URI patterns with parameters, constraints and an LRU parse cache
//!
//! Rendering is left to the UI layer: it draws the stacks, listens for changes, and
//! forwards URI changes and back gestures to the [`Coordinator`].
//!
//! # Quick Start
//!
//! ```
//! use stack_navigator::{Coordinator, NavigationPath, PropValue, Route, RouteTarget};
//!
//! struct Home;
//!
//! impl RouteTarget for Home {
//!     fn to_uri(&self) -> String {
//!         "/".to_string()
//!     }
//! }
//!
//! struct Profile(String);
//!
//! impl RouteTarget for Profile {
//!     fn to_uri(&self) -> String {
//!         format!("/profile/{}", self.0)
//!     }
//!
//!     fn props(&self) -> Vec<PropValue> {
//!         vec![self.0.as_str().into()]
//!     }
//! }
//!
//! let coordinator = Coordinator::builder(NavigationPath::with_label("root"))
//!     .build()
//!     .unwrap();
//!
//! pollster::block_on(async {
//!     coordinator.push(Route::new(Home)).await.unwrap();
//!     let result = coordinator.push(Route::new(Profile("42".into()))).await.unwrap();
//!     assert_eq!(coordinator.current_uri(), "/profile/42");
//!
//!     coordinator.pop(None).await.unwrap();
//!     assert!(result.await.is_none());
//!     assert_eq!(coordinator.current_uri(), "/");
//! });
//! ```
//!
//! # Route Guards
//!
//! ```
//! use stack_navigator::{GuardContext, GuardFuture, GuardResult, RouteGuard, RouteTarget};
//!
//! struct Editor {
//!     dirty: bool,
//! }
//!
//! impl RouteTarget for Editor {
//!     fn to_uri(&self) -> String {
//!         "/editor".to_string()
//!     }
//!
//!     fn as_guard(&self) -> Option<&dyn RouteGuard> {
//!         Some(self)
//!     }
//! }
//!
//! impl RouteGuard for Editor {
//!     fn pop_guard<'a>(&'a self, _cx: &'a GuardContext) -> GuardFuture<'a> {
//!         let dirty = self.dirty;
//!         Box::pin(async move {
//!             Ok(if dirty {
//!                 GuardResult::deny("unsaved changes")
//!             } else {
//!                 GuardResult::allow()
//!             })
//!         })
//!     }
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)
//! - `cache` (default) - LRU cache for [`RouteTable`] parsing
//! - `transition` (default) - Transition descriptors for the UI layer

#![doc(html_root_url = "https://docs.rs/stack-navigator/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Cache (optional)
#[cfg(feature = "cache")]
pub mod cache;

// Error handling
pub mod error;

// Route identity and reconciliation
pub mod diff;
pub mod equality;
pub mod route;

// Route capabilities
pub mod deep_link;
pub mod guards;
pub mod layout;
pub mod redirect;
pub mod restoration;
#[cfg(feature = "transition")]
pub mod transition;

// Stacks and orchestration
pub mod coordinator;
pub mod path;

// URI parsing
pub mod matcher;
pub mod params;

// Re-export main types for convenient access
#[cfg(feature = "cache")]
pub use cache::CacheStats;
pub use coordinator::{
    AsyncRouteParser, Coordinator, CoordinatorBuilder, CoordinatorConfig, PathKind,
    PathSnapshot, RouteParser, ACTIVE_ROUTE_KEY,
};
pub use deep_link::{DeepLinkStrategy, RouteDeepLink};
pub use diff::DiffOp;
pub use equality::{deep_equals, deep_hash, CustomProp, PropValue};
pub use error::{NavigationError, Result};
pub use guards::{
    guard_fn, BoxedGuard, FnGuard, GuardBuilder, GuardContext, GuardFuture, GuardResult,
    Guards, RouteGuard,
};
pub use layout::{LayoutKey, LayoutRegistry, LayoutStrategy, RouteLayout};
pub use matcher::{Constraint, RouteMatch, RoutePattern, RouteTable, Segment};
pub use params::{QueryParams, RouteParams};
pub use path::{IndexedStackPath, ListenerId, NavigationPath, PathId, StackPath};
pub use redirect::{
    resolve_redirects, RedirectContext, RedirectFuture, RedirectResult, RouteRedirect,
};
pub use restoration::{
    LayoutTag, PathState, PayloadStrategy, RestorationState, RouteRestorable, SerializedRoute,
};
pub use route::{Route, RouteResult, RouteResultFuture, RouteTarget};
#[cfg(feature = "transition")]
pub use transition::{RouteTransition, SlideDirection, Transition};
