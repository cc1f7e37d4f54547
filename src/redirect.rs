//! Redirect resolution
//!
//! A route declaring [`RouteRedirect`] may substitute itself before it is placed in a
//! stack, typically to send an anonymous user to a login screen. Resolution follows the
//! chain until it reaches a route that does not redirect (or redirects to itself).

use crate::coordinator::Coordinator;
use crate::error::{NavigationError, Result};
use crate::route::Route;
use crate::trace_log;
use futures::future::LocalBoxFuture;

/// Outcome of a single redirect hook
#[derive(Debug, Clone)]
pub enum RedirectResult {
    /// Keep the route as it is
    Proceed,
    /// Do not navigate at all
    Stay,
    /// Navigate to another route instead
    To(Route),
}

impl RedirectResult {
    pub fn to(route: Route) -> Self {
        RedirectResult::To(route)
    }
}

/// Information handed to a redirect hook
#[derive(Clone)]
pub struct RedirectContext {
    /// The candidate currently being resolved
    pub route: Route,
    /// Coordinator driving the navigation, if any
    pub coordinator: Option<Coordinator>,
    /// Number of hops already taken in this chain
    pub hops: usize,
}

/// Future returned by [`RouteRedirect::redirect`]
pub type RedirectFuture<'a> = LocalBoxFuture<'a, Result<RedirectResult>>;

/// Route capability substituting the route before placement
///
/// # Example
///
/// ```
/// use stack_navigator::{RedirectContext, RedirectFuture, RedirectResult, Route, RouteRedirect, RouteTarget};
///
/// struct Login;
///
/// impl RouteTarget for Login {
///     fn to_uri(&self) -> String {
///         "/login".to_string()
///     }
/// }
///
/// struct Account {
///     authed: bool,
/// }
///
/// impl RouteRedirect for Account {
///     fn redirect<'a>(&'a self, _cx: &'a RedirectContext) -> RedirectFuture<'a> {
///         Box::pin(async move {
///             Ok(if self.authed {
///                 RedirectResult::Proceed
///             } else {
///                 RedirectResult::to(Route::new(Login))
///             })
///         })
///     }
/// }
/// ```
pub trait RouteRedirect {
    fn redirect<'a>(&'a self, cx: &'a RedirectContext) -> RedirectFuture<'a>;
}

/// Follow the redirect chain starting at `route`.
///
/// Returns `Ok(None)` when a hook asks to stay put; the caller must then leave every
/// stack untouched. Each route replaced along the way that was never placed has its
/// result settled with `None`, so nobody awaiting it is left hanging.
pub async fn resolve_redirects(
    route: Route,
    coordinator: Option<&Coordinator>,
    limit: Option<usize>,
) -> Result<Option<Route>> {
    let origin = route.to_uri();
    let mut current = route;
    let mut hops = 0;

    loop {
        let Some(redirect) = current.target().as_redirect() else {
            return Ok(Some(current));
        };

        let cx = RedirectContext {
            route: current.clone(),
            coordinator: coordinator.cloned(),
            hops,
        };
        let next = match redirect.redirect(&cx).await? {
            RedirectResult::Proceed => return Ok(Some(current)),
            RedirectResult::Stay => {
                trace_log!("Redirect of '{}' stays put", current.to_uri());
                return Ok(None);
            }
            RedirectResult::To(next) if next.ptr_eq(&current) => return Ok(Some(current)),
            RedirectResult::To(next) => next,
        };

        if let Some(limit) = limit {
            if hops >= limit {
                return Err(NavigationError::RedirectLimitExceeded { uri: origin, limit });
            }
        }

        trace_log!("Redirect '{}' -> '{}'", current.to_uri(), next.to_uri());
        if !current.is_bound() {
            current.complete_on_result(None);
        }
        current = next;
        hops += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteTarget;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Leaf(&'static str);

    impl RouteTarget for Leaf {
        fn to_uri(&self) -> String {
            self.0.to_string()
        }
    }

    /// Redirects `remaining` more times before settling on a leaf
    struct Chain {
        remaining: usize,
    }

    impl RouteTarget for Chain {
        fn to_uri(&self) -> String {
            format!("/chain/{}", self.remaining)
        }

        fn as_redirect(&self) -> Option<&dyn RouteRedirect> {
            Some(self)
        }
    }

    impl RouteRedirect for Chain {
        fn redirect<'a>(&'a self, _cx: &'a RedirectContext) -> RedirectFuture<'a> {
            Box::pin(async move {
                Ok(RedirectResult::to(if self.remaining == 0 {
                    Route::new(Leaf("/end"))
                } else {
                    Route::new(Chain {
                        remaining: self.remaining - 1,
                    })
                }))
            })
        }
    }

    struct SelfRedirect {
        calls: Rc<Cell<usize>>,
    }

    impl RouteTarget for SelfRedirect {
        fn to_uri(&self) -> String {
            "/self".to_string()
        }

        fn as_redirect(&self) -> Option<&dyn RouteRedirect> {
            Some(self)
        }
    }

    impl RouteRedirect for SelfRedirect {
        fn redirect<'a>(&'a self, cx: &'a RedirectContext) -> RedirectFuture<'a> {
            self.calls.set(self.calls.get() + 1);
            let same = cx.route.clone();
            Box::pin(async move { Ok(RedirectResult::To(same)) })
        }
    }

    struct Stay;

    impl RouteTarget for Stay {
        fn to_uri(&self) -> String {
            "/stay".to_string()
        }

        fn as_redirect(&self) -> Option<&dyn RouteRedirect> {
            Some(self)
        }
    }

    impl RouteRedirect for Stay {
        fn redirect<'a>(&'a self, _cx: &'a RedirectContext) -> RedirectFuture<'a> {
            Box::pin(async { Ok(RedirectResult::Stay) })
        }
    }

    #[test]
    fn test_plain_route_resolves_to_itself() {
        let route = Route::new(Leaf("/home"));
        let resolved = pollster::block_on(resolve_redirects(route.clone(), None, None)).unwrap();
        assert!(resolved.unwrap().ptr_eq(&route));
    }

    #[test]
    fn test_chain_terminates_at_leaf() {
        let route = Route::new(Chain { remaining: 5 });
        let original = route.result();
        let resolved = pollster::block_on(resolve_redirects(route, None, None))
            .unwrap()
            .unwrap();
        assert_eq!(resolved.to_uri(), "/end");

        // The replaced route was never placed; its waiter is released
        assert!(pollster::block_on(original).is_none());
    }

    #[test]
    fn test_self_redirect_does_not_loop() {
        let calls = Rc::new(Cell::new(0));
        let route = Route::new(SelfRedirect {
            calls: calls.clone(),
        });
        let resolved = pollster::block_on(resolve_redirects(route.clone(), None, None))
            .unwrap()
            .unwrap();
        assert!(resolved.ptr_eq(&route));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_stay_put() {
        let route = Route::new(Stay);
        let resolved = pollster::block_on(resolve_redirects(route.clone(), None, None)).unwrap();
        assert!(resolved.is_none());
        assert!(!route.is_settled());
    }

    #[test]
    fn test_redirect_limit() {
        let route = Route::new(Chain { remaining: 10 });
        let error = pollster::block_on(resolve_redirects(route, None, Some(3))).unwrap_err();
        assert!(matches!(
            error,
            NavigationError::RedirectLimitExceeded { limit: 3, .. }
        ));

        let route = Route::new(Chain { remaining: 1 });
        let resolved = pollster::block_on(resolve_redirects(route, None, Some(3))).unwrap();
        assert_eq!(resolved.map(|r| r.to_uri()), Some("/end".to_string()));
    }
}
