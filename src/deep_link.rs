//! Deep-link placement
//!
//! When a route arrives from outside the app (`Coordinator::recover`), its
//! [`RouteDeepLink`] capability decides how it lands in the stacks. Routes without the
//! capability replace the whole navigation state.

use crate::coordinator::Coordinator;
use crate::error::Result;
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

/// How a deep-linked route is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeepLinkStrategy {
    /// Push on top of the current state
    Push,
    /// Wipe every path and show the route alone
    #[default]
    Replace,
    /// Hand the raw URI to [`RouteDeepLink::deep_link_handler`]
    Custom,
}

/// Route capability choosing the deep-link placement
///
/// # Example
///
/// ```
/// use stack_navigator::{DeepLinkStrategy, RouteDeepLink};
///
/// struct Article;
///
/// impl RouteDeepLink for Article {
///     fn deep_link_strategy(&self) -> DeepLinkStrategy {
///         DeepLinkStrategy::Push
///     }
/// }
/// ```
pub trait RouteDeepLink {
    fn deep_link_strategy(&self) -> DeepLinkStrategy;

    /// Custom placement, called with the raw URI for [`DeepLinkStrategy::Custom`].
    ///
    /// The handler owns every stack mutation; the default does nothing.
    fn deep_link_handler<'a>(
        &'a self,
        coordinator: &'a Coordinator,
        uri: &'a str,
    ) -> LocalBoxFuture<'a, Result<()>> {
        let _ = (coordinator, uri);
        Box::pin(async { Ok(()) })
    }
}
