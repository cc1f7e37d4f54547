//! Pop guards
//!
//! A guard lets a route veto its own removal: an editor with unsaved changes, a
//! checkout flow that must ask for confirmation, a tab that cannot be left while an
//! upload runs. Guards are consulted by `pop`, by `navigate` while it pops down to a
//! target, and by fixed stacks before switching away from the current tab.
//!
//! Guards never run on `reset`/`replace` or on platform-forced removal.

use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::route::Route;
use crate::{debug_log, info_log};
use futures::future::LocalBoxFuture;
use std::future::Future;

/// Result of a guard check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardResult {
    /// Allow the route to be removed
    Allow,

    /// Keep the route in place
    Deny {
        /// Reason for denying removal
        reason: String,
    },
}

impl GuardResult {
    /// Create an allow result
    pub fn allow() -> Self {
        GuardResult::Allow
    }

    /// Create a deny result with reason
    pub fn deny(reason: impl Into<String>) -> Self {
        GuardResult::Deny {
            reason: reason.into(),
        }
    }

    /// Check if result is allow
    pub fn is_allow(&self) -> bool {
        matches!(self, GuardResult::Allow)
    }

    /// Check if result is deny
    pub fn is_deny(&self) -> bool {
        matches!(self, GuardResult::Deny { .. })
    }

    /// Reason given by a denying guard
    pub fn reason(&self) -> Option<&str> {
        match self {
            GuardResult::Deny { reason } => Some(reason.as_str()),
            GuardResult::Allow => None,
        }
    }
}

impl From<bool> for GuardResult {
    fn from(allow: bool) -> Self {
        if allow {
            GuardResult::Allow
        } else {
            GuardResult::deny("vetoed")
        }
    }
}

/// Information handed to a guard
#[derive(Clone)]
pub struct GuardContext {
    /// The route about to be removed
    pub route: Route,
    /// Coordinator owning the route's path, if the path is bound to one
    pub coordinator: Option<Coordinator>,
}

impl GuardContext {
    pub fn new(route: Route, coordinator: Option<Coordinator>) -> Self {
        Self { route, coordinator }
    }
}

/// Future returned by [`RouteGuard::pop_guard`]
pub type GuardFuture<'a> = LocalBoxFuture<'a, Result<GuardResult>>;

/// Trait for pop guards
///
/// Returned errors are propagated to the caller of the navigation that triggered the
/// check; the stack is left untouched.
///
/// # Example
///
/// ```
/// use stack_navigator::{GuardContext, GuardFuture, GuardResult, RouteGuard};
/// use std::cell::Cell;
///
/// struct Editor {
///     dirty: Cell<bool>,
/// }
///
/// impl RouteGuard for Editor {
///     fn pop_guard<'a>(&'a self, _cx: &'a GuardContext) -> GuardFuture<'a> {
///         Box::pin(async move {
///             Ok(if self.dirty.get() {
///                 GuardResult::deny("unsaved changes")
///             } else {
///                 GuardResult::allow()
///             })
///         })
///     }
/// }
/// ```
pub trait RouteGuard {
    /// Decide whether the route may be removed
    fn pop_guard<'a>(&'a self, cx: &'a GuardContext) -> GuardFuture<'a>;

    /// Get guard name (for debugging and log records)
    fn name(&self) -> &str {
        "RouteGuard"
    }

    /// Optional priority for guard execution order
    ///
    /// Higher priority guards run first inside [`Guards`]. Default is 0.
    fn priority(&self) -> i32 {
        0
    }
}

/// Boxed route guard for dynamic dispatch
pub type BoxedGuard = Box<dyn RouteGuard>;

/// Create a guard from a closure returning a future
///
/// # Example
///
/// ```
/// use stack_navigator::{guard_fn, GuardResult};
///
/// let guard = guard_fn(|cx| {
///     let uri = cx.route.to_uri();
///     async move { Ok(GuardResult::from(!uri.starts_with("/checkout"))) }
/// });
/// ```
pub fn guard_fn<F, Fut>(f: F) -> FnGuard<F>
where
    F: Fn(&GuardContext) -> Fut,
    Fut: Future<Output = Result<GuardResult>> + 'static,
{
    FnGuard { f }
}

/// Guard created from a function or closure
pub struct FnGuard<F> {
    f: F,
}

impl<F, Fut> RouteGuard for FnGuard<F>
where
    F: Fn(&GuardContext) -> Fut,
    Fut: Future<Output = Result<GuardResult>> + 'static,
{
    fn pop_guard<'a>(&'a self, cx: &'a GuardContext) -> GuardFuture<'a> {
        Box::pin((self.f)(cx))
    }

    fn name(&self) -> &str {
        "FnGuard"
    }
}

// ============================================================================
// Guard Composition
// ============================================================================

/// Combines multiple guards with AND logic
///
/// Guards run one after another in priority order. The first deny wins and the
/// remaining guards are not consulted.
///
/// # Example
///
/// ```
/// use stack_navigator::{guard_fn, GuardResult, Guards};
///
/// let guards = Guards::builder()
///     .guard(guard_fn(|_| async { Ok(GuardResult::allow()) }))
///     .guard(guard_fn(|_| async { Ok(GuardResult::deny("upload in progress")) }))
///     .build();
/// assert_eq!(guards.len(), 2);
/// ```
#[derive(Default)]
pub struct Guards {
    guards: Vec<BoxedGuard>,
}

impl Guards {
    pub fn new(guards: Vec<BoxedGuard>) -> Self {
        Self { guards }
    }

    /// Start building a guard composition
    pub fn builder() -> GuardBuilder {
        GuardBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

/// Helper macro for creating a [`Guards`] composition
///
/// # Example
/// ```
/// use stack_navigator::{guard_fn, guards, GuardResult};
///
/// let composed = guards![
///     guard_fn(|_| async { Ok(GuardResult::allow()) }),
/// ];
/// assert_eq!(composed.len(), 1);
/// ```
#[macro_export]
macro_rules! guards {
    ($($guard:expr),* $(,)?) => {
        $crate::guards::Guards::new(
            vec![$(Box::new($guard) as Box<dyn $crate::guards::RouteGuard>),*]
        )
    };
}

/// Builder for Guards with fluent API
#[derive(Default)]
pub struct GuardBuilder {
    guards: Vec<BoxedGuard>,
}

impl GuardBuilder {
    pub fn new() -> Self {
        Self { guards: Vec::new() }
    }

    /// Add a guard to the composition
    pub fn guard<G: RouteGuard + 'static>(mut self, guard: G) -> Self {
        self.guards.push(Box::new(guard));
        self
    }

    /// Add a boxed guard
    pub fn boxed_guard(mut self, guard: BoxedGuard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn build(self) -> Guards {
        Guards::new(self.guards)
    }
}

impl RouteGuard for Guards {
    fn pop_guard<'a>(&'a self, cx: &'a GuardContext) -> GuardFuture<'a> {
        let mut sorted: Vec<&'a dyn RouteGuard> = self.guards.iter().map(|g| g.as_ref()).collect();
        sorted.sort_by_key(|g| -g.priority());

        Box::pin(async move {
            for guard in sorted {
                match guard.pop_guard(cx).await? {
                    GuardResult::Allow => continue,
                    deny => {
                        debug_log!("Guard '{}' denied removal", guard.name());
                        return Ok(deny);
                    }
                }
            }
            Ok(GuardResult::Allow)
        })
    }

    fn name(&self) -> &str {
        "Guards"
    }

    fn priority(&self) -> i32 {
        // Priority is max of all child guards
        self.guards.iter().map(|g| g.priority()).max().unwrap_or(0)
    }
}

/// Consult the route's guard, if it declares one.
///
/// Returns `Ok(true)` when removal may proceed.
pub(crate) async fn check_pop_guard(route: &Route, coordinator: Option<Coordinator>) -> Result<bool> {
    let Some(guard) = route.target().as_guard() else {
        return Ok(true);
    };

    let cx = GuardContext::new(route.clone(), coordinator);
    match guard.pop_guard(&cx).await? {
        GuardResult::Allow => Ok(true),
        GuardResult::Deny { reason } => {
            info_log!(
                "Removal of '{}' vetoed by guard '{}': {}",
                route.to_uri(),
                guard.name(),
                reason
            );
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteTarget;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Page;

    impl RouteTarget for Page {
        fn to_uri(&self) -> String {
            "/page".to_string()
        }
    }

    fn context() -> GuardContext {
        GuardContext::new(Route::new(Page), None)
    }

    struct Recording {
        name: &'static str,
        priority: i32,
        allow: bool,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl RouteGuard for Recording {
        fn pop_guard<'a>(&'a self, _cx: &'a GuardContext) -> GuardFuture<'a> {
            Box::pin(async move {
                self.log.borrow_mut().push(self.name);
                Ok(GuardResult::from(self.allow))
            })
        }

        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }
    }

    #[test]
    fn test_guard_result_allow() {
        let result = GuardResult::allow();
        assert!(result.is_allow());
        assert!(!result.is_deny());
        assert_eq!(result.reason(), None);
    }

    #[test]
    fn test_guard_result_deny() {
        let result = GuardResult::deny("Unsaved changes");
        assert!(result.is_deny());
        assert_eq!(result.reason(), Some("Unsaved changes"));
    }

    #[test]
    fn test_guard_fn_helper() {
        let guard = guard_fn(|_| async { Ok(GuardResult::allow()) });
        assert_eq!(guard.name(), "FnGuard");
        assert_eq!(guard.priority(), 0);

        let cx = context();
        let result = pollster::block_on(guard.pop_guard(&cx)).unwrap();
        assert!(result.is_allow());
    }

    #[test]
    fn test_guards_run_in_priority_order_and_stop_on_deny() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let guards = Guards::builder()
            .guard(Recording {
                name: "low",
                priority: 1,
                allow: true,
                log: log.clone(),
            })
            .guard(Recording {
                name: "high",
                priority: 10,
                allow: false,
                log: log.clone(),
            })
            .build();
        assert_eq!(guards.priority(), 10);

        let cx = context();
        let result = pollster::block_on(guards.pop_guard(&cx)).unwrap();
        assert!(result.is_deny());
        assert_eq!(*log.borrow(), vec!["high"]);
    }

    #[test]
    fn test_empty_guards_allow() {
        let guards = Guards::default();
        let cx = context();
        assert!(pollster::block_on(guards.pop_guard(&cx)).unwrap().is_allow());
    }

    #[test]
    fn test_guard_errors_propagate() {
        let guard = guard_fn(|_| async { Err(crate::NavigationError::message("dialog crashed")) });
        let cx = context();
        let error = pollster::block_on(guard.pop_guard(&cx)).unwrap_err();
        assert!(error.is_callback());
    }

    #[test]
    fn test_check_pop_guard_without_capability() {
        let route = Route::new(Page);
        assert!(pollster::block_on(check_pop_guard(&route, None)).unwrap());
    }
}
