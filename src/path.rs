//! Stack paths
//!
//! A stack path is an ordered, observable sequence of routes. Two shapes exist:
//!
//! - [`NavigationPath`] - a mutable stack; its active route is the last element
//! - [`IndexedStackPath`] - a fixed, pre-populated list (tabs); only the active index
//!   changes
//!
//! [`StackPath`] wraps either one for code that does not care which it holds.
//!
//! A route belongs to at most one path at a time. Paths record their id on the routes
//! they hold and clear it when the route leaves; inserting a route that is still bound
//! somewhere fails with [`NavigationError::RouteAlreadyBound`].
//!
//! Listeners fire after every committed mutation, never in the middle of one, and are
//! called with no internal borrow held, so they may read the path (or the coordinator)
//! freely.

use crate::coordinator::{Coordinator, CoordinatorInner};
use crate::diff::{diff, DiffOp, DiffPlan};
use crate::error::{NavigationError, Result};
use crate::guards::check_pop_guard;
use crate::redirect::resolve_redirects;
use crate::route::{Route, RouteResult, RouteResultFuture};
use crate::{debug_log, trace_log};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Id of a live stack path
///
/// Derived from the address of the path's shared state, so it is unique among the paths
/// alive at the same time. A path unbinds the routes it still holds when dropped, so a
/// stale id never outlives its path on a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(usize);

impl PathId {
    fn of<T>(inner: &Weak<T>) -> Self {
        Self(inner.as_ptr().cast::<()>() as usize)
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

/// Handle returned by `add_listener`, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Change listeners of a path or coordinator
#[derive(Default)]
pub(crate) struct Listeners {
    next: Cell<u64>,
    entries: RefCell<Vec<(ListenerId, Rc<dyn Fn()>)>>,
}

impl Listeners {
    pub(crate) fn add(&self, listener: impl Fn() + 'static) -> ListenerId {
        let id = ListenerId(self.next.get());
        self.next.set(id.0 + 1);
        self.entries.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    pub(crate) fn notify(&self) {
        // Snapshot first: listeners may add or remove listeners
        let snapshot: Vec<Rc<dyn Fn()>> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// State shared by both path shapes
pub(crate) struct PathCore {
    id: PathId,
    label: Option<String>,
    listeners: Listeners,
    coordinator: RefCell<Weak<CoordinatorInner>>,
}

impl PathCore {
    fn new(id: PathId, label: Option<String>) -> Self {
        Self {
            id,
            label,
            listeners: Listeners::default(),
            coordinator: RefCell::new(Weak::new()),
        }
    }

    fn describe(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }

    fn coordinator(&self) -> Option<Coordinator> {
        let inner = self.coordinator.borrow().upgrade();
        inner.map(Coordinator::from_inner)
    }

    fn redirect_limit(&self, coordinator: Option<&Coordinator>) -> Option<usize> {
        coordinator.and_then(|coordinator| coordinator.config().redirect_limit)
    }

    fn notify(&self) {
        self.listeners.notify();
    }
}

// Routes kept alive elsewhere must not point at a freed path id
fn release_routes(id: PathId, routes: &[Route]) {
    for route in routes {
        if route.path_id() == Some(id) {
            route.unbind();
        }
    }
}

fn already_bound(route: &Route, path: PathId) -> NavigationError {
    NavigationError::RouteAlreadyBound {
        uri: route.to_uri(),
        path_id: path,
    }
}

// ============================================================================
// NavigationPath
// ============================================================================

struct NavigationInner {
    core: PathCore,
    routes: RefCell<Vec<Route>>,
}

impl Drop for NavigationInner {
    fn drop(&mut self) {
        release_routes(self.core.id, self.routes.get_mut());
    }
}

/// Mutable navigation stack
///
/// # Example
///
/// ```
/// use stack_navigator::{NavigationPath, Route, RouteTarget};
///
/// struct Home;
///
/// impl RouteTarget for Home {
///     fn to_uri(&self) -> String {
///         "/".to_string()
///     }
/// }
///
/// let path = NavigationPath::with_label("root");
/// pollster::block_on(path.push(Route::new(Home))).unwrap();
/// assert_eq!(path.len(), 1);
/// assert_eq!(pollster::block_on(path.pop(None)).unwrap(), Some(true));
/// assert!(path.is_empty());
/// ```
#[derive(Clone)]
pub struct NavigationPath {
    inner: Rc<NavigationInner>,
}

impl NavigationPath {
    /// Create an unlabeled path. Unlabeled paths cannot be restored.
    pub fn new() -> Self {
        Self::create(None)
    }

    /// Create a path with a stable debug label
    pub fn with_label(label: impl Into<String>) -> Self {
        Self::create(Some(label.into()))
    }

    fn create(label: Option<String>) -> Self {
        Self {
            inner: Rc::new_cyclic(|weak| NavigationInner {
                core: PathCore::new(PathId::of(weak), label),
                routes: RefCell::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn core(&self) -> &PathCore {
        &self.inner.core
    }

    pub fn id(&self) -> PathId {
        self.inner.core.id
    }

    pub fn label(&self) -> Option<&str> {
        self.inner.core.label.as_deref()
    }

    /// Snapshot of the routes, bottom first
    pub fn stack(&self) -> Vec<Route> {
        self.inner.routes.borrow().clone()
    }

    /// The top route
    pub fn active_route(&self) -> Option<Route> {
        self.inner.routes.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.routes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.routes.borrow().is_empty()
    }

    /// Check if an equal route is in the stack
    pub fn contains(&self, route: &Route) -> bool {
        self.inner.routes.borrow().iter().any(|entry| entry == route)
    }

    /// Coordinator this path is registered with
    pub fn coordinator(&self) -> Option<Coordinator> {
        self.inner.core.coordinator()
    }

    pub fn add_listener(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.inner.core.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.core.listeners.remove(id)
    }

    /// Check if both handles point to the same path
    pub fn ptr_eq(&self, other: &NavigationPath) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Resolve redirects, then append the route.
    ///
    /// The returned future settles when the route leaves the stack. If a redirect asks
    /// to stay put nothing is pushed and the original route's future is returned.
    pub async fn push(&self, route: Route) -> Result<RouteResultFuture> {
        let coordinator = self.coordinator();
        let limit = self.inner.core.redirect_limit(coordinator.as_ref());
        match resolve_redirects(route.clone(), coordinator.as_ref(), limit).await? {
            Some(resolved) => self.push_resolved(resolved),
            None => Ok(route.result()),
        }
    }

    pub(crate) fn push_resolved(&self, route: Route) -> Result<RouteResultFuture> {
        if let Some(bound) = route.path_id() {
            return Err(already_bound(&route, bound));
        }
        route.bind(self.id());
        trace_log!("push '{}' onto '{}'", route.to_uri(), self.describe());
        self.inner.routes.borrow_mut().push(route.clone());
        self.inner.core.notify();
        Ok(route.result())
    }

    /// Resolve redirects, then push the route or move an equal entry to the top.
    ///
    /// If an equal route is already on top nothing changes and its pending future is
    /// returned.
    pub async fn push_or_move_to_top(&self, route: Route) -> Result<RouteResultFuture> {
        let coordinator = self.coordinator();
        let limit = self.inner.core.redirect_limit(coordinator.as_ref());
        match resolve_redirects(route.clone(), coordinator.as_ref(), limit).await? {
            Some(resolved) => self.push_or_move_resolved(resolved),
            None => Ok(route.result()),
        }
    }

    pub(crate) fn push_or_move_resolved(&self, route: Route) -> Result<RouteResultFuture> {
        let relocated = {
            let mut routes = self.inner.routes.borrow_mut();
            if let Some(bound) = route.path_id() {
                if !routes.iter().any(|entry| entry.ptr_eq(&route)) {
                    return Err(already_bound(&route, bound));
                }
            }

            match routes.iter().position(|entry| *entry == route) {
                Some(index) if index + 1 == routes.len() => {
                    return Ok(routes[index].result());
                }
                Some(index) => Some(routes.remove(index)),
                None => None,
            }
        };

        if let Some(existing) = relocated {
            // Moving is not popping: the old placement resolves without a value
            trace_log!("move '{}' to top of '{}'", existing.to_uri(), self.describe());
            existing.discard();
        }

        route.bind(self.id());
        self.inner.routes.borrow_mut().push(route.clone());
        self.inner.core.notify();
        Ok(route.result())
    }

    /// Pop the top route, consulting its guard.
    ///
    /// Returns `Ok(None)` if the stack is empty, `Ok(Some(false))` if the guard vetoed
    /// (or the stack changed while the guard was pending) and `Ok(Some(true))` once the
    /// route is removed and its future settled with `result`.
    pub async fn pop(&self, result: RouteResult) -> Result<Option<bool>> {
        let Some(top) = self.active_route() else {
            return Ok(None);
        };

        if !check_pop_guard(&top, self.coordinator()).await? {
            return Ok(Some(false));
        }

        {
            let mut routes = self.inner.routes.borrow_mut();
            if !routes.last().is_some_and(|last| last.ptr_eq(&top)) {
                debug_log!(
                    "'{}' is no longer on top of '{}'; pop skipped",
                    top.to_uri(),
                    self.describe()
                );
                return Ok(Some(false));
            }
            routes.pop();
        }

        trace_log!("pop '{}' from '{}'", top.to_uri(), self.describe());
        top.mark_removed_via_api(result.clone());
        top.unbind();
        top.complete_on_result(result);
        self.inner.core.notify();
        Ok(Some(true))
    }

    /// Pop until an entry equal to `target` is on top.
    ///
    /// Returns `Ok(false)` if a guard vetoed or `target` is not (or no longer) in the
    /// stack.
    pub async fn pop_until(&self, target: &Route) -> Result<bool> {
        loop {
            let Some(top) = self.active_route() else {
                return Ok(false);
            };
            if top == *target {
                return Ok(true);
            }
            if !self.contains(target) {
                return Ok(false);
            }
            if self.pop(None).await? != Some(true) {
                return Ok(false);
            }
        }
    }

    fn detach(&self, route: &Route) -> Option<Route> {
        let mut routes = self.inner.routes.borrow_mut();
        let index = routes
            .iter()
            .position(|entry| entry.ptr_eq(route))
            .or_else(|| routes.iter().position(|entry| entry == route))?;
        let removed = routes.remove(index);
        removed.unbind();
        Some(removed)
    }

    /// Detach a route at any position, bypassing guards.
    ///
    /// The route's future is not settled with a value; it resolves to `None` once the
    /// instance is dropped.
    pub fn remove(&self, route: &Route) -> bool {
        match self.detach(route) {
            Some(removed) => {
                trace_log!("remove '{}' from '{}'", removed.to_uri(), self.describe());
                self.inner.core.notify();
                true
            }
            None => false,
        }
    }

    /// React to the platform having removed a route on its own (swipe-back).
    ///
    /// Routes already popped through the API are left alone so their result is not
    /// settled twice.
    pub fn handle_platform_removal(&self, route: &Route) -> bool {
        if route.was_removed_via_api() && !route.is_bound() {
            trace_log!("'{}' already removed through the API", route.to_uri());
            return false;
        }
        match self.detach(route) {
            Some(removed) => {
                trace_log!(
                    "platform removed '{}' from '{}'",
                    removed.to_uri(),
                    self.describe()
                );
                removed.complete_on_result(None);
                self.inner.core.notify();
                true
            }
            None => false,
        }
    }

    /// Reset the path, then push `route` (after redirects).
    pub async fn activate_route(&self, route: Route) -> Result<RouteResultFuture> {
        let coordinator = self.coordinator();
        let limit = self.inner.core.redirect_limit(coordinator.as_ref());
        match resolve_redirects(route.clone(), coordinator.as_ref(), limit).await? {
            Some(resolved) => self.activate_resolved(resolved),
            None => Ok(route.result()),
        }
    }

    pub(crate) fn activate_resolved(&self, route: Route) -> Result<RouteResultFuture> {
        if let Some(bound) = route.path_id() {
            if bound != self.id() {
                return Err(already_bound(&route, bound));
            }
        }
        let drained = std::mem::take(&mut *self.inner.routes.borrow_mut());
        for entry in &drained {
            entry.discard();
        }

        trace_log!("activate '{}' in '{}'", route.to_uri(), self.describe());
        route.bind(self.id());
        self.inner.routes.borrow_mut().push(route.clone());
        self.inner.core.notify();
        Ok(route.result())
    }

    /// Clear the path without consulting guards; every route settles with `None`.
    pub fn reset(&self) {
        let drained = std::mem::take(&mut *self.inner.routes.borrow_mut());
        if drained.is_empty() {
            return;
        }
        trace_log!("reset '{}' ({} routes)", self.describe(), drained.len());
        for entry in &drained {
            entry.discard();
        }
        self.inner.core.notify();
    }

    /// Bring the stack in line with `target` using a minimal edit script.
    ///
    /// Routes that survive keep their instance and pending future; removed routes
    /// settle with `None`.
    pub fn reconcile(&self, target: Vec<Route>) -> Result<()> {
        let ops = diff(&self.stack(), &target);
        self.apply_diff(&ops)
    }

    /// Apply an edit script computed against the current stack.
    ///
    /// Out-of-range deletes are skipped and out-of-range inserts append. When the
    /// script both deletes and inserts, the new list is materialised first and swapped
    /// in at once, with a single notification.
    pub fn apply_diff(&self, ops: &[DiffOp<Route>]) -> Result<()> {
        let plan = DiffPlan::from_ops(ops);
        if plan.is_empty() {
            return Ok(());
        }

        let current = self.stack();
        let released: Vec<Route> = plan
            .deletes
            .iter()
            .filter_map(|&index| current.get(index).cloned())
            .collect();
        for (_, route) in &plan.inserts {
            if let Some(bound) = route.path_id() {
                let reinserted = bound == self.id() && released.iter().any(|r| r.ptr_eq(route));
                if !reinserted {
                    return Err(already_bound(route, bound));
                }
            }
        }

        if plan.inserts.is_empty() {
            let mut removed = Vec::with_capacity(plan.deletes.len());
            {
                let mut routes = self.inner.routes.borrow_mut();
                for &index in &plan.deletes {
                    if index < routes.len() {
                        removed.push(routes.remove(index));
                    }
                }
            }
            for route in &removed {
                route.discard();
            }
        } else if plan.deletes.is_empty() {
            let mut routes = self.inner.routes.borrow_mut();
            for (index, route) in &plan.inserts {
                route.bind(self.id());
                let index = (*index).min(routes.len());
                routes.insert(index, route.clone());
            }
        } else {
            let mut next = current.clone();
            plan.apply_to(&mut next);
            for route in &current {
                if !next.iter().any(|entry| entry.ptr_eq(route)) {
                    route.discard();
                }
            }
            for route in &next {
                if !current.iter().any(|entry| entry.ptr_eq(route)) {
                    route.bind(self.id());
                }
            }
            *self.inner.routes.borrow_mut() = next;
        }

        trace_log!(
            "applied diff to '{}': {} deletes, {} inserts",
            self.describe(),
            plan.deletes.len(),
            plan.inserts.len()
        );
        self.inner.core.notify();
        Ok(())
    }

    fn describe(&self) -> String {
        self.inner.core.describe()
    }
}

impl Default for NavigationPath {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NavigationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uris: Vec<String> = self.stack().iter().map(Route::to_uri).collect();
        f.debug_struct("NavigationPath")
            .field("id", &self.id())
            .field("label", &self.label())
            .field("stack", &uris)
            .finish()
    }
}

// ============================================================================
// IndexedStackPath
// ============================================================================

struct IndexedInner {
    core: PathCore,
    routes: Vec<Route>,
    active: Cell<usize>,
}

impl Drop for IndexedInner {
    fn drop(&mut self) {
        release_routes(self.core.id, &self.routes);
    }
}

/// Fixed list of routes with one active index (tabs)
///
/// Entries never leave the stack, so their result futures are settled with `None` at
/// construction.
#[derive(Clone)]
pub struct IndexedStackPath {
    inner: Rc<IndexedInner>,
}

impl IndexedStackPath {
    /// Create a fixed stack; `routes` must not be empty.
    pub fn new(label: impl Into<String>, routes: Vec<Route>) -> Result<Self> {
        let label = label.into();
        if routes.is_empty() {
            return Err(NavigationError::EmptyIndexedStack { path: label });
        }
        if let Some((route, bound)) = routes
            .iter()
            .find_map(|route| route.path_id().map(|bound| (route, bound)))
        {
            return Err(already_bound(route, bound));
        }

        let inner = Rc::new_cyclic(|weak| IndexedInner {
            core: PathCore::new(PathId::of(weak), Some(label)),
            routes,
            active: Cell::new(0),
        });
        for route in &inner.routes {
            route.bind(inner.core.id);
            route.complete_on_result(None);
        }

        Ok(Self { inner })
    }

    pub(crate) fn core(&self) -> &PathCore {
        &self.inner.core
    }

    pub fn id(&self) -> PathId {
        self.inner.core.id
    }

    pub fn label(&self) -> Option<&str> {
        self.inner.core.label.as_deref()
    }

    pub fn stack(&self) -> Vec<Route> {
        self.inner.routes.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.routes.len()
    }

    /// Always false: fixed stacks are never empty
    pub fn is_empty(&self) -> bool {
        self.inner.routes.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.inner.active.get()
    }

    pub fn active_route(&self) -> Route {
        self.inner.routes[self.active_index()].clone()
    }

    /// Index of the entry matching `route` (same instance first, then equality)
    pub fn position(&self, route: &Route) -> Option<usize> {
        self.inner
            .routes
            .iter()
            .position(|entry| entry.ptr_eq(route))
            .or_else(|| self.inner.routes.iter().position(|entry| entry == route))
    }

    pub fn contains(&self, route: &Route) -> bool {
        self.position(route).is_some()
    }

    pub fn coordinator(&self) -> Option<Coordinator> {
        self.inner.core.coordinator()
    }

    pub fn add_listener(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.inner.core.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.core.listeners.remove(id)
    }

    pub fn ptr_eq(&self, other: &IndexedStackPath) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.len() {
            Ok(())
        } else {
            Err(NavigationError::IndexOutOfRange {
                path: self.inner.core.describe(),
                index,
                len: self.len(),
            })
        }
    }

    fn locate(&self, route: &Route) -> Result<usize> {
        self.position(route)
            .ok_or_else(|| NavigationError::RouteNotInStack {
                path: self.inner.core.describe(),
                uri: route.to_uri(),
            })
    }

    /// Switch to the tab at `index`.
    ///
    /// The current tab's guard is consulted first, then the target's redirects are
    /// resolved. A redirect to a route outside this stack is handed to the
    /// coordinator's `recover` instead of switching.
    pub async fn go_to_indexed(&self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        if index == self.active_index() {
            return Ok(true);
        }

        let coordinator = self.coordinator();
        if !self.release_active(index, coordinator.as_ref()).await? {
            return Ok(false);
        }
        let released = self.active_route();

        let target = self.inner.routes[index].clone();
        let limit = self.inner.core.redirect_limit(coordinator.as_ref());
        match resolve_redirects(target.clone(), coordinator.as_ref(), limit).await? {
            None => Ok(false),
            Some(resolved) if resolved.ptr_eq(&target) => {
                if !self.active_route().ptr_eq(&released)
                    && !self.release_active(index, coordinator.as_ref()).await?
                {
                    return Ok(false);
                }
                self.set_index(index);
                Ok(true)
            }
            Some(resolved) => {
                let Some(coordinator) = coordinator else {
                    return Err(NavigationError::Unbound {
                        path: self.inner.core.describe(),
                    });
                };
                debug_log!(
                    "tab '{}' redirected to '{}'; recovering through the coordinator",
                    target.to_uri(),
                    resolved.to_uri()
                );
                coordinator.recover_resolved(resolved, None).await?;
                Ok(true)
            }
        }
    }

    /// Ask the active tab's guard to let go, until the answer comes from the tab that is
    /// still active once the guard settles.
    ///
    /// Returns `Ok(true)` without asking if `index` became active in the meantime.
    async fn release_active(
        &self,
        index: usize,
        coordinator: Option<&Coordinator>,
    ) -> Result<bool> {
        loop {
            if index == self.active_index() {
                return Ok(true);
            }
            let outgoing = self.active_route();
            if !check_pop_guard(&outgoing, coordinator.cloned()).await? {
                return Ok(false);
            }
            if self.active_route().ptr_eq(&outgoing) {
                return Ok(true);
            }
            debug_log!(
                "active tab of '{}' changed while '{}' was guarded; asking again",
                self.inner.core.describe(),
                outgoing.to_uri()
            );
        }
    }

    /// Switch to the entry equal to `route`; errors if there is none.
    pub async fn activate_route(&self, route: &Route) -> Result<bool> {
        let index = self.locate(route)?;
        self.go_to_indexed(index).await
    }

    /// Like `activate_route` for a route whose redirects are already resolved.
    pub(crate) async fn activate_resolved(&self, route: &Route) -> Result<bool> {
        let index = self.locate(route)?;
        if index == self.active_index() {
            return Ok(true);
        }
        if !self.release_active(index, self.coordinator().as_ref()).await? {
            return Ok(false);
        }
        self.set_index(index);
        Ok(true)
    }

    /// Set the active index without guards or redirects.
    pub(crate) fn set_active_index(&self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.set_index(index);
        Ok(())
    }

    pub(crate) fn set_active_route(&self, route: &Route) -> Result<()> {
        let index = self.locate(route)?;
        self.set_index(index);
        Ok(())
    }

    /// Go back to the first tab without consulting guards.
    pub fn reset(&self) {
        self.set_index(0);
    }

    fn set_index(&self, index: usize) {
        if self.inner.active.replace(index) != index {
            trace_log!(
                "'{}' active index -> {}",
                self.inner.core.describe(),
                index
            );
            self.inner.core.notify();
        }
    }
}

impl fmt::Debug for IndexedStackPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uris: Vec<String> = self.inner.routes.iter().map(Route::to_uri).collect();
        f.debug_struct("IndexedStackPath")
            .field("id", &self.id())
            .field("label", &self.label())
            .field("stack", &uris)
            .field("active_index", &self.active_index())
            .finish()
    }
}

// ============================================================================
// StackPath
// ============================================================================

/// Either kind of stack path
#[derive(Clone, Debug)]
pub enum StackPath {
    Navigation(NavigationPath),
    Indexed(IndexedStackPath),
}

impl StackPath {
    pub(crate) fn core(&self) -> &PathCore {
        match self {
            StackPath::Navigation(path) => path.core(),
            StackPath::Indexed(path) => path.core(),
        }
    }

    pub fn id(&self) -> PathId {
        self.core().id
    }

    pub fn label(&self) -> Option<&str> {
        self.core().label.as_deref()
    }

    /// Label, or `#id` for unlabeled paths
    pub fn describe(&self) -> String {
        self.core().describe()
    }

    pub fn stack(&self) -> Vec<Route> {
        match self {
            StackPath::Navigation(path) => path.stack(),
            StackPath::Indexed(path) => path.stack(),
        }
    }

    pub fn active_route(&self) -> Option<Route> {
        match self {
            StackPath::Navigation(path) => path.active_route(),
            StackPath::Indexed(path) => Some(path.active_route()),
        }
    }

    /// Active index of a fixed stack
    pub fn active_index(&self) -> Option<usize> {
        match self {
            StackPath::Navigation(_) => None,
            StackPath::Indexed(path) => Some(path.active_index()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            StackPath::Navigation(path) => path.len(),
            StackPath::Indexed(path) => path.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_mutable(&self) -> bool {
        matches!(self, StackPath::Navigation(_))
    }

    pub fn contains(&self, route: &Route) -> bool {
        match self {
            StackPath::Navigation(path) => path.contains(route),
            StackPath::Indexed(path) => path.contains(route),
        }
    }

    pub fn as_navigation(&self) -> Option<&NavigationPath> {
        match self {
            StackPath::Navigation(path) => Some(path),
            StackPath::Indexed(_) => None,
        }
    }

    pub fn as_indexed(&self) -> Option<&IndexedStackPath> {
        match self {
            StackPath::Navigation(_) => None,
            StackPath::Indexed(path) => Some(path),
        }
    }

    /// Force-clear the path without consulting guards
    pub fn reset(&self) {
        match self {
            StackPath::Navigation(path) => path.reset(),
            StackPath::Indexed(path) => path.reset(),
        }
    }

    /// Make `route` the active route.
    ///
    /// Mutable paths are reset and receive the route; fixed paths switch to the equal
    /// entry. Returns `Ok(false)` if a guard vetoed the switch.
    pub async fn activate_route(&self, route: Route) -> Result<bool> {
        match self {
            StackPath::Navigation(path) => path.activate_route(route).await.map(|_| true),
            StackPath::Indexed(path) => path.activate_route(&route).await,
        }
    }

    pub fn add_listener(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.core().listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.core().listeners.remove(id)
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.core().listeners.len()
    }

    /// Check if both values refer to the same path
    pub fn same_path(&self, other: &StackPath) -> bool {
        self.id() == other.id()
    }

    pub(crate) fn bound_coordinator(&self) -> Option<Coordinator> {
        self.core().coordinator()
    }

    pub(crate) fn attach(&self, coordinator: Weak<CoordinatorInner>) {
        *self.core().coordinator.borrow_mut() = coordinator;
    }

    pub(crate) fn detach_coordinator(&self) {
        *self.core().coordinator.borrow_mut() = Weak::new();
    }
}

impl From<NavigationPath> for StackPath {
    fn from(path: NavigationPath) -> Self {
        StackPath::Navigation(path)
    }
}

impl From<IndexedStackPath> for StackPath {
    fn from(path: IndexedStackPath) -> Self {
        StackPath::Indexed(path)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equality::PropValue;
    use crate::guards::{GuardContext, GuardFuture, GuardResult, RouteGuard};
    use crate::route::RouteTarget;
    use pollster::block_on;

    #[derive(Debug)]
    struct Page(&'static str);

    impl RouteTarget for Page {
        fn to_uri(&self) -> String {
            format!("/{}", self.0)
        }

        fn props(&self) -> Vec<PropValue> {
            vec![self.0.into()]
        }
    }

    struct Locked {
        allow: Rc<Cell<bool>>,
    }

    impl RouteTarget for Locked {
        fn to_uri(&self) -> String {
            "/locked".to_string()
        }

        fn as_guard(&self) -> Option<&dyn RouteGuard> {
            Some(self)
        }
    }

    impl RouteGuard for Locked {
        fn pop_guard<'a>(&'a self, _cx: &'a GuardContext) -> GuardFuture<'a> {
            let allow = self.allow.get();
            Box::pin(async move { Ok(GuardResult::from(allow)) })
        }
    }

    fn page(name: &'static str) -> Route {
        Route::new(Page(name))
    }

    fn uris(path: &NavigationPath) -> Vec<String> {
        path.stack().iter().map(Route::to_uri).collect()
    }

    fn counter(path: &NavigationPath) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let observed = count.clone();
        path.add_listener(move || observed.set(observed.get() + 1));
        count
    }

    #[test]
    fn test_push_then_pop_settles_result() {
        let path = NavigationPath::with_label("root");
        block_on(path.push(page("a"))).unwrap();
        let result = block_on(path.push(page("b"))).unwrap();

        let popped = block_on(path.pop(Some(Rc::new(42_u32)))).unwrap();
        assert_eq!(popped, Some(true));
        assert_eq!(uris(&path), vec!["/a"]);

        let value = block_on(result).and_then(|v| v.downcast_ref::<u32>().copied());
        assert_eq!(value, Some(42));
    }

    #[test]
    fn test_pop_empty_returns_none() {
        let path = NavigationPath::new();
        assert_eq!(block_on(path.pop(None)).unwrap(), None);
    }

    #[test]
    fn test_guard_veto_leaves_stack_unchanged() {
        let allow = Rc::new(Cell::new(false));
        let path = NavigationPath::new();
        block_on(path.push(page("home"))).unwrap();
        block_on(path.push(Route::new(Locked {
            allow: allow.clone(),
        })))
        .unwrap();

        assert_eq!(block_on(path.pop(None)).unwrap(), Some(false));
        assert_eq!(path.len(), 2);

        allow.set(true);
        assert_eq!(block_on(path.pop(None)).unwrap(), Some(true));
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_route_bound_once() {
        let first = NavigationPath::new();
        let second = NavigationPath::new();
        let route = page("a");

        block_on(first.push(route.clone())).unwrap();
        assert_eq!(route.path_id(), Some(first.id()));

        let error = block_on(second.push(route.clone())).unwrap_err();
        assert!(matches!(error, NavigationError::RouteAlreadyBound { .. }));
        assert!(second.is_empty());
    }

    #[test]
    fn test_dropped_path_releases_routes() {
        let route = page("a");
        {
            let path = NavigationPath::new();
            block_on(path.push(route.clone())).unwrap();
            assert!(route.is_bound());
        }
        assert!(!route.is_bound());

        let first = NavigationPath::new();
        let second = NavigationPath::new();
        assert_ne!(first.id(), second.id());
        block_on(second.push(route.clone())).unwrap();
        assert_eq!(route.path_id(), Some(second.id()));
    }

    #[test]
    fn test_push_or_move_to_top() {
        let path = NavigationPath::new();
        for name in ["a", "b", "c"] {
            block_on(path.push(page(name))).unwrap();
        }
        let original_b = path.stack()[1].clone();
        let old_result = original_b.result();

        block_on(path.push_or_move_to_top(page("b"))).unwrap();
        assert_eq!(uris(&path), vec!["/a", "/c", "/b"]);
        assert!(block_on(old_result).is_none());
        assert!(!original_b.is_bound());
    }

    #[test]
    fn test_push_or_move_to_top_already_on_top_is_noop() {
        let path = NavigationPath::new();
        block_on(path.push(page("a"))).unwrap();
        let top = path.active_route().unwrap();
        let notified = counter(&path);

        block_on(path.push_or_move_to_top(page("a"))).unwrap();
        assert_eq!(path.len(), 1);
        assert!(path.active_route().unwrap().ptr_eq(&top));
        assert!(!top.is_settled());
        assert_eq!(notified.get(), 0);
    }

    #[test]
    fn test_remove_bypasses_guard() {
        let path = NavigationPath::new();
        let locked = Route::new(Locked {
            allow: Rc::new(Cell::new(false)),
        });
        block_on(path.push(page("home"))).unwrap();
        block_on(path.push(locked.clone())).unwrap();

        assert!(path.remove(&locked));
        assert_eq!(path.len(), 1);
        assert!(!locked.is_bound());
        assert!(!path.remove(&locked));
    }

    #[test]
    fn test_platform_removal_after_api_pop_is_ignored() {
        let path = NavigationPath::new();
        block_on(path.push(page("a"))).unwrap();
        let b = page("b");
        let result = block_on(path.push(b.clone())).unwrap();

        block_on(path.pop(Some(Rc::new("kept")))).unwrap();
        assert!(!path.handle_platform_removal(&b));

        let value = block_on(result).and_then(|v| v.downcast_ref::<&str>().copied());
        assert_eq!(value, Some("kept"));
    }

    #[test]
    fn test_platform_removal_settles_none() {
        let path = NavigationPath::new();
        block_on(path.push(page("a"))).unwrap();
        let b = page("b");
        let result = block_on(path.push(b.clone())).unwrap();

        assert!(path.handle_platform_removal(&b));
        assert_eq!(uris(&path), vec!["/a"]);
        assert!(block_on(result).is_none());
    }

    #[test]
    fn test_reset_settles_everything() {
        let path = NavigationPath::new();
        let first = block_on(path.push(page("a"))).unwrap();
        let second = block_on(path.push(page("b"))).unwrap();

        path.reset();
        assert!(path.is_empty());
        assert!(block_on(first).is_none());
        assert!(block_on(second).is_none());
    }

    #[test]
    fn test_activate_route_resets_then_pushes() {
        let path = NavigationPath::new();
        block_on(path.push(page("a"))).unwrap();
        block_on(path.push(page("b"))).unwrap();

        block_on(path.activate_route(page("c"))).unwrap();
        assert_eq!(uris(&path), vec!["/c"]);
    }

    #[test]
    fn test_pop_until() {
        let path = NavigationPath::new();
        for name in ["a", "x", "b", "c"] {
            block_on(path.push(page(name))).unwrap();
        }
        assert!(block_on(path.pop_until(&page("x"))).unwrap());
        assert_eq!(uris(&path), vec!["/a", "/x"]);

        assert!(!block_on(path.pop_until(&page("missing"))).unwrap());
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_reconcile_keeps_surviving_instances() {
        let path = NavigationPath::new();
        for name in ["a", "b", "c"] {
            block_on(path.push(page(name))).unwrap();
        }
        let kept_a = path.stack()[0].clone();
        let kept_c = path.stack()[2].clone();
        let dropped_b = path.stack()[1].clone();
        let dropped_result = dropped_b.result();
        let notified = counter(&path);

        path.reconcile(vec![page("a"), page("d"), page("c")]).unwrap();

        assert_eq!(uris(&path), vec!["/a", "/d", "/c"]);
        assert!(path.stack()[0].ptr_eq(&kept_a));
        assert!(path.stack()[2].ptr_eq(&kept_c));
        assert!(!kept_a.is_settled());
        assert!(block_on(dropped_result).is_none());
        assert!(!dropped_b.is_bound());
        assert_eq!(path.stack()[1].path_id(), Some(path.id()));
        assert_eq!(notified.get(), 1);
    }

    #[test]
    fn test_reconcile_inserts_and_deletes_only() {
        let path = NavigationPath::new();
        path.reconcile(vec![page("a"), page("b")]).unwrap();
        assert_eq!(uris(&path), vec!["/a", "/b"]);

        path.reconcile(vec![page("b")]).unwrap();
        assert_eq!(uris(&path), vec!["/b"]);

        path.reconcile(vec![page("b")]).unwrap();
        assert_eq!(uris(&path), vec!["/b"]);
    }

    #[test]
    fn test_apply_diff_tolerates_out_of_range() {
        let path = NavigationPath::new();
        block_on(path.push(page("a"))).unwrap();

        let ops = vec![
            DiffOp::Delete { old_index: 9 },
            DiffOp::Insert {
                element: page("z"),
                new_index: 42,
            },
        ];
        path.apply_diff(&ops).unwrap();
        assert_eq!(uris(&path), vec!["/a", "/z"]);
    }

    #[test]
    fn test_listeners_can_be_removed() {
        let path = NavigationPath::new();
        let count = Rc::new(Cell::new(0));
        let observed = count.clone();
        let id = path.add_listener(move || observed.set(observed.get() + 1));

        block_on(path.push(page("a"))).unwrap();
        assert!(path.remove_listener(id));
        block_on(path.push(page("b"))).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_indexed_stack_construction() {
        let tabs = vec![page("feed"), page("search")];
        let feed_result = tabs[0].result();
        let path = IndexedStackPath::new("tabs", tabs).unwrap();

        assert_eq!(path.active_index(), 0);
        assert_eq!(path.active_route().to_uri(), "/feed");
        assert!(block_on(feed_result).is_none());

        let error = IndexedStackPath::new("empty", Vec::new()).unwrap_err();
        assert!(matches!(error, NavigationError::EmptyIndexedStack { .. }));
    }

    #[test]
    fn test_indexed_go_to() {
        let path = IndexedStackPath::new("tabs", vec![page("feed"), page("search")]).unwrap();
        let notified = Rc::new(Cell::new(0));
        let observed = notified.clone();
        path.add_listener(move || observed.set(observed.get() + 1));

        assert!(block_on(path.go_to_indexed(1)).unwrap());
        assert_eq!(path.active_index(), 1);
        assert!(block_on(path.go_to_indexed(1)).unwrap());
        assert_eq!(notified.get(), 1);

        let error = block_on(path.go_to_indexed(2)).unwrap_err();
        assert!(matches!(error, NavigationError::IndexOutOfRange { index: 2, len: 2, .. }));
    }

    #[test]
    fn test_indexed_guard_blocks_switch() {
        let allow = Rc::new(Cell::new(false));
        let locked = Route::new(Locked {
            allow: allow.clone(),
        });
        let path = IndexedStackPath::new("tabs", vec![locked, page("other")]).unwrap();

        assert!(!block_on(path.go_to_indexed(1)).unwrap());
        assert_eq!(path.active_index(), 0);

        allow.set(true);
        assert!(block_on(path.go_to_indexed(1)).unwrap());
    }

    #[test]
    fn test_indexed_rejects_unknown_route() {
        let path = IndexedStackPath::new("tabs", vec![page("feed")]).unwrap();
        let error = block_on(path.activate_route(&page("elsewhere"))).unwrap_err();
        assert!(matches!(error, NavigationError::RouteNotInStack { .. }));

        assert!(block_on(path.activate_route(&page("feed"))).unwrap());
    }

    #[test]
    fn test_stack_path_dispatch() {
        let nav: StackPath = NavigationPath::with_label("root").into();
        let tabs: StackPath = IndexedStackPath::new("tabs", vec![page("a"), page("b")])
            .unwrap()
            .into();

        assert!(nav.is_mutable());
        assert!(!tabs.is_mutable());
        assert_eq!(nav.active_route(), None);
        assert_eq!(tabs.active_index(), Some(0));

        assert!(block_on(tabs.activate_route(page("b"))).unwrap());
        assert_eq!(tabs.active_index(), Some(1));
        tabs.reset();
        assert_eq!(tabs.active_index(), Some(0));

        assert!(block_on(nav.activate_route(page("x"))).unwrap());
        assert_eq!(nav.len(), 1);
        assert_eq!(nav.describe(), "root");
    }
}
