//! Route entities
//!
//! A [`Route`] is a cheap, cloneable handle around an application-defined
//! [`RouteTarget`]. Identity is structural: two routes are equal when they wrap the same
//! concrete type and their [`RouteTarget::props`] are deep-equal. Each instance also
//! carries framework-owned transient state that is never part of identity:
//!
//! - the result future handed to whoever pushed it, recreated on every placement
//! - the id of the stack path currently holding it
//! - the pending result and "removed through the stack API" flag used to tell an
//!   API pop apart from a platform-forced removal
//!
//! # Example
//!
//! ```
//! use stack_navigator::{PropValue, Route, RouteTarget};
//!
//! #[derive(Debug)]
//! struct Profile {
//!     id: String,
//! }
//!
//! impl RouteTarget for Profile {
//!     fn to_uri(&self) -> String {
//!         format!("/profile/{}", self.id)
//!     }
//!
//!     fn props(&self) -> Vec<PropValue> {
//!         vec![self.id.clone().into()]
//!     }
//! }
//!
//! let a = Route::new(Profile { id: "42".into() });
//! let b = Route::new(Profile { id: "42".into() });
//! assert_eq!(a, b);
//! assert!(!a.ptr_eq(&b));
//! ```

use crate::deep_link::RouteDeepLink;
use crate::equality::{deep_equals_list, deep_hash_list, PropValue};
use crate::guards::RouteGuard;
use crate::layout::{LayoutKey, RouteLayout};
use crate::path::PathId;
use crate::redirect::RouteRedirect;
use crate::restoration::RouteRestorable;
#[cfg(feature = "transition")]
use crate::transition::RouteTransition;
use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Payload a popped route hands back to whoever pushed it.
pub type RouteResult = Option<Rc<dyn Any>>;

/// Cloneable future resolving to a route's [`RouteResult`].
///
/// Resolves to `None` when the route is removed without a value, or when the route
/// instance is dropped before ever being settled.
pub type RouteResultFuture = Shared<LocalBoxFuture<'static, RouteResult>>;

/// Application-defined navigation destination.
///
/// Only [`to_uri`](RouteTarget::to_uri) is required. Capabilities are opted into by
/// overriding the matching `as_*` accessor and returning `Some(self)`.
pub trait RouteTarget: 'static {
    /// Canonical URI of this destination
    fn to_uri(&self) -> String;

    /// Semantically relevant fields, compared with deep equality
    fn props(&self) -> Vec<PropValue> {
        Vec::new()
    }

    /// Layout this route must be nested in, if any
    fn layout(&self) -> Option<LayoutKey> {
        None
    }

    /// Veto hook consulted before the route is popped
    fn as_guard(&self) -> Option<&dyn RouteGuard> {
        None
    }

    /// Substitution hook consulted before the route is placed
    fn as_redirect(&self) -> Option<&dyn RouteRedirect> {
        None
    }

    /// Marks this route as a layout owning a child path
    fn as_layout(&self) -> Option<&dyn RouteLayout> {
        None
    }

    /// Placement strategy when the route arrives through a deep link
    fn as_deep_link(&self) -> Option<&dyn RouteDeepLink> {
        None
    }

    /// Transition descriptor for the UI collaborator
    #[cfg(feature = "transition")]
    fn as_transition(&self) -> Option<&dyn RouteTransition> {
        None
    }

    /// Structured restoration payload, used instead of the URI
    fn as_restorable(&self) -> Option<&dyn RouteRestorable> {
        None
    }
}

struct RouteState {
    path: Option<PathId>,
    completer: Option<oneshot::Sender<RouteResult>>,
    result: RouteResultFuture,
    pending_result: RouteResult,
    removed_via_api: bool,
}

impl RouteState {
    fn new() -> Self {
        let (completer, result) = result_channel();
        Self {
            path: None,
            completer: Some(completer),
            result,
            pending_result: None,
            removed_via_api: false,
        }
    }
}

fn result_channel() -> (oneshot::Sender<RouteResult>, RouteResultFuture) {
    let (tx, rx) = oneshot::channel();
    let future = rx.map(|received| received.unwrap_or(None)).boxed_local().shared();
    (tx, future)
}

/// A future that has already resolved to `None`.
pub(crate) fn settled_result() -> RouteResultFuture {
    futures::future::ready(None).boxed_local().shared()
}

struct RouteInner {
    target: Rc<dyn RouteTarget>,
    any: Rc<dyn Any>,
    type_id: TypeId,
    type_name: &'static str,
    state: RefCell<RouteState>,
}

/// Handle to a route instance.
///
/// Cloning the handle does not create a new instance: use [`Route::ptr_eq`] to compare
/// instances and `==` to compare identities.
#[derive(Clone)]
pub struct Route {
    inner: Rc<RouteInner>,
}

impl Route {
    /// Wrap an application route.
    pub fn new<T: RouteTarget>(target: T) -> Self {
        let target = Rc::new(target);
        Self {
            inner: Rc::new(RouteInner {
                target: target.clone(),
                any: target,
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                state: RefCell::new(RouteState::new()),
            }),
        }
    }

    /// The wrapped application route
    pub fn target(&self) -> &dyn RouteTarget {
        self.inner.target.as_ref()
    }

    /// Downcast to the concrete application type
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.any.downcast_ref::<T>()
    }

    /// Check the concrete application type
    pub fn is<T: 'static>(&self) -> bool {
        self.inner.type_id == TypeId::of::<T>()
    }

    /// Concrete type of the wrapped route
    pub fn type_id(&self) -> TypeId {
        self.inner.type_id
    }

    /// Fully qualified type name, used as the layout marker during restoration
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name
    }

    pub fn to_uri(&self) -> String {
        self.inner.target.to_uri()
    }

    pub fn props(&self) -> Vec<PropValue> {
        self.inner.target.props()
    }

    /// Check if this route owns a child path
    pub fn is_layout(&self) -> bool {
        self.inner.target.as_layout().is_some()
    }

    /// Layout this route must be nested in
    pub fn layout(&self) -> Option<LayoutKey> {
        self.inner.target.layout()
    }

    /// Check if two handles point to the same instance
    pub fn ptr_eq(&self, other: &Route) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Id of the stack path currently holding this route
    pub fn path_id(&self) -> Option<PathId> {
        self.inner.state.borrow().path
    }

    pub fn is_bound(&self) -> bool {
        self.path_id().is_some()
    }

    /// Future resolving to the result of the current placement.
    pub fn result(&self) -> RouteResultFuture {
        self.inner.state.borrow().result.clone()
    }

    /// Check if the current placement has been settled
    pub fn is_settled(&self) -> bool {
        self.inner.state.borrow().completer.is_none()
    }

    /// Settle the current result future. Settling twice is a no-op.
    pub fn complete_on_result(&self, result: RouteResult) {
        let completer = self.inner.state.borrow_mut().completer.take();
        if let Some(completer) = completer {
            // The receiving side may already be gone; nothing to report then.
            let _ = completer.send(result);
        }
    }

    /// Check if the route left its path through `pop`
    pub fn was_removed_via_api(&self) -> bool {
        self.inner.state.borrow().removed_via_api
    }

    /// Result recorded by the last API pop, if any
    pub fn pending_result(&self) -> RouteResult {
        self.inner.state.borrow().pending_result.clone()
    }

    /// Attach to a path with a fresh result future.
    ///
    /// The previous future, if never settled, resolves to `None`.
    pub(crate) fn bind(&self, path: PathId) {
        let (completer, result) = result_channel();
        let mut state = self.inner.state.borrow_mut();
        state.path = Some(path);
        state.completer = Some(completer);
        state.result = result;
        state.pending_result = None;
        state.removed_via_api = false;
    }

    pub(crate) fn unbind(&self) {
        self.inner.state.borrow_mut().path = None;
    }

    pub(crate) fn mark_removed_via_api(&self, result: RouteResult) {
        let mut state = self.inner.state.borrow_mut();
        state.removed_via_api = true;
        state.pending_result = result;
    }

    /// Detach and settle with `None`.
    pub(crate) fn discard(&self) {
        self.unbind();
        self.complete_on_result(None);
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.inner.type_id == other.inner.type_id
            && (Rc::ptr_eq(&self.inner, &other.inner)
                || deep_equals_list(&self.props(), &other.props()))
    }
}

impl Hash for Route {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.type_id.hash(state);
        state.write_u64(deep_hash_list(&self.props()));
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .inner
            .type_name
            .rsplit("::")
            .next()
            .unwrap_or(self.inner.type_name);
        f.debug_struct("Route")
            .field("type", &name)
            .field("uri", &self.to_uri())
            .field("path", &self.path_id())
            .finish()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

// ============================================================================
// Tests
// ============================================================================
