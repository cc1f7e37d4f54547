//! Navigation coordinator
//!
//! The [`Coordinator`] owns the root [`NavigationPath`] plus every auxiliary path
//! (layout child paths, modals) and is the single entry point for navigation:
//!
//! - `push` / `push_or_move_to_top` / `replace` for programmatic navigation
//! - `pop` / `try_pop` for back navigation
//! - `navigate` for browser-style history moves and external URIs
//! - `recover` for deep links
//!
//! Every operation resolves redirects first, then threads the layout chain of the
//! resolved route into place, then mutates the innermost path. Stacks are only touched
//! once resolution has succeeded.

use crate::deep_link::DeepLinkStrategy;
use crate::error::{NavigationError, Result};
use crate::layout::{child_path, place, resolve_layout_path, LayoutRegistry, LayoutStrategy};
use crate::matcher::RouteTable;
use crate::path::{ListenerId, Listeners, NavigationPath, PathId, StackPath};
use crate::redirect::resolve_redirects;
use crate::restoration::ConverterRegistry;
use crate::route::{settled_result, Route, RouteResult, RouteResultFuture, RouteTarget};
#[cfg(feature = "transition")]
use crate::transition::Transition;
use crate::{debug_log, info_log, trace_log, warn_log};
use futures::future::{FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Label reserved for the active route entry of the restoration tree
pub const ACTIVE_ROUTE_KEY: &str = "activeRoute";

// ============================================================================
// Configuration
// ============================================================================

/// Coordinator configuration
///
/// Can be loaded from JSON; missing fields take their defaults.
///
/// ```
/// use stack_navigator::CoordinatorConfig;
///
/// let config: CoordinatorConfig = serde_json::from_str(r#"{ "redirect_limit": 8 }"#).unwrap();
/// assert_eq!(config.redirect_limit, Some(8));
/// assert_eq!(config.parse_cache_capacity, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Maximum redirect hops per navigation; `None` follows chains of any length
    pub redirect_limit: Option<usize>,
    /// Capacity of the route table's parse cache; zero disables it
    pub parse_cache_capacity: usize,
    /// Transition for routes that do not describe their own
    #[cfg(feature = "transition")]
    pub default_transition: Transition,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            redirect_limit: None,
            parse_cache_capacity: 256,
            #[cfg(feature = "transition")]
            default_transition: Transition::None,
        }
    }
}

/// Synchronous `uri -> route` parser
pub type RouteParser = Rc<dyn Fn(&str) -> Option<Route>>;

/// Asynchronous `uri -> route` parser used for regular navigation
pub type AsyncRouteParser = Rc<dyn Fn(String) -> LocalBoxFuture<'static, Result<Option<Route>>>>;

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Coordinator`]
///
/// # Example
///
/// ```
/// use stack_navigator::{Coordinator, IndexedStackPath, NavigationPath, Route, RouteTarget};
///
/// struct Feed;
///
/// impl RouteTarget for Feed {
///     fn to_uri(&self) -> String {
///         "/feed".to_string()
///     }
/// }
///
/// let coordinator = Coordinator::builder(NavigationPath::with_label("root"))
///     .path(IndexedStackPath::new("tabs", vec![Route::new(Feed)]).unwrap())
///     .build()
///     .unwrap();
///
/// assert_eq!(coordinator.paths().len(), 2);
/// assert_eq!(coordinator.current_uri(), "/");
/// ```
pub struct CoordinatorBuilder {
    root: NavigationPath,
    paths: Vec<StackPath>,
    config: CoordinatorConfig,
    parser: Option<RouteParser>,
    async_parser: Option<AsyncRouteParser>,
    route_table: Option<RouteTable>,
    layouts: LayoutRegistry,
    converters: ConverterRegistry,
}

impl CoordinatorBuilder {
    fn new(root: NavigationPath) -> Self {
        Self {
            root,
            paths: Vec::new(),
            config: CoordinatorConfig::default(),
            parser: None,
            async_parser: None,
            route_table: None,
            layouts: LayoutRegistry::new(),
            converters: ConverterRegistry::new(),
        }
    }

    /// Register an auxiliary path
    pub fn path(mut self, path: impl Into<StackPath>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Synchronous URI parser; takes precedence over the route table
    pub fn route_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&str) -> Option<Route> + 'static,
    {
        self.parser = Some(Rc::new(parser));
        self
    }

    /// Asynchronous URI parser for `navigate_uri` / `recover_uri`.
    ///
    /// Restoration always uses the synchronous parser.
    pub fn async_route_parser<F, Fut>(mut self, parser: F) -> Self
    where
        F: Fn(String) -> Fut + 'static,
        Fut: Future<Output = Result<Option<Route>>> + 'static,
    {
        self.async_parser = Some(Rc::new(move |uri| parser(uri).boxed_local()));
        self
    }

    /// Pattern-based synchronous URI parser
    pub fn route_table(mut self, table: RouteTable) -> Self {
        self.route_table = Some(table);
        self
    }

    /// Register the constructor for layout type `L`
    pub fn define_layout<L, F>(mut self, construct: F) -> Self
    where
        L: RouteTarget,
        F: Fn() -> L + 'static,
    {
        self.layouts.define(construct);
        self
    }

    /// Register a restoration converter for routes serialized under `key`
    pub fn define_converter<F>(mut self, key: impl Into<String>, convert: F) -> Self
    where
        F: Fn(&serde_json::Value) -> Result<Route> + 'static,
    {
        self.converters.define(key, convert);
        self
    }

    /// Validate the paths and bind them to the new coordinator.
    pub fn build(self) -> Result<Coordinator> {
        let mut paths = vec![StackPath::Navigation(self.root.clone())];
        paths.extend(self.paths);

        let mut labels = HashSet::new();
        let mut ids = HashSet::new();
        for path in &paths {
            if path.bound_coordinator().is_some() {
                return Err(NavigationError::PathAlreadyBound {
                    path: path.describe(),
                });
            }
            if !ids.insert(path.id()) {
                return Err(NavigationError::DuplicateDebugLabel {
                    label: path.describe(),
                });
            }
            if let Some(label) = path.label() {
                if label == ACTIVE_ROUTE_KEY {
                    return Err(NavigationError::ReservedDebugLabel {
                        label: label.to_string(),
                    });
                }
                if !labels.insert(label.to_string()) {
                    return Err(NavigationError::DuplicateDebugLabel {
                        label: label.to_string(),
                    });
                }
            }
        }

        if let Some(table) = &self.route_table {
            table.set_cache_capacity(self.config.parse_cache_capacity);
        }

        let inner = Rc::new(CoordinatorInner {
            root: self.root,
            paths,
            config: self.config,
            parser: self.parser,
            async_parser: self.async_parser,
            route_table: self.route_table,
            layouts: self.layouts,
            converters: self.converters,
            listeners: Listeners::default(),
            forwarders: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        });

        let weak = Rc::downgrade(&inner);
        let mut forwarders = Vec::with_capacity(inner.paths.len());
        for path in &inner.paths {
            path.attach(weak.clone());
            let coordinator = weak.clone();
            let id = path.add_listener(move || {
                if let Some(inner) = coordinator.upgrade() {
                    inner.listeners.notify();
                }
            });
            forwarders.push((path.clone(), id));
        }
        *inner.forwarders.borrow_mut() = forwarders;

        debug_log!("Coordinator built with {} paths", inner.paths.len());
        Ok(Coordinator { inner })
    }
}

// ============================================================================
// Coordinator
// ============================================================================

pub(crate) struct CoordinatorInner {
    root: NavigationPath,
    /// Root first, then auxiliary paths in registration order
    paths: Vec<StackPath>,
    config: CoordinatorConfig,
    parser: Option<RouteParser>,
    async_parser: Option<AsyncRouteParser>,
    route_table: Option<RouteTable>,
    layouts: LayoutRegistry,
    converters: ConverterRegistry,
    listeners: Listeners,
    forwarders: RefCell<Vec<(StackPath, ListenerId)>>,
    disposed: Cell<bool>,
}

/// Top-level navigation orchestrator
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Rc<CoordinatorInner>,
}

impl Coordinator {
    pub fn builder(root: NavigationPath) -> CoordinatorBuilder {
        CoordinatorBuilder::new(root)
    }

    pub(crate) fn from_inner(inner: Rc<CoordinatorInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn root(&self) -> NavigationPath {
        self.inner.root.clone()
    }

    /// Every registered path, root first
    pub fn paths(&self) -> Vec<StackPath> {
        self.inner.paths.clone()
    }

    /// Find a path by debug label
    pub fn path(&self, label: &str) -> Option<StackPath> {
        self.inner
            .paths
            .iter()
            .find(|path| path.label() == Some(label))
            .cloned()
    }

    /// Find a path by id
    pub fn find_path(&self, id: PathId) -> Option<StackPath> {
        self.inner.paths.iter().find(|path| path.id() == id).cloned()
    }

    /// Check if `path` is registered with this coordinator
    pub fn owns(&self, path: &StackPath) -> bool {
        self.inner.paths.iter().any(|owned| owned.same_path(path))
    }

    pub fn layouts(&self) -> &LayoutRegistry {
        &self.inner.layouts
    }

    pub(crate) fn converters(&self) -> &ConverterRegistry {
        &self.inner.converters
    }

    pub fn route_table(&self) -> Option<&RouteTable> {
        self.inner.route_table.as_ref()
    }

    pub fn ptr_eq(&self, other: &Coordinator) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------------
    // Active hierarchy
    // ------------------------------------------------------------------------

    /// Walk from the root down through each visible layout.
    fn active_chain(&self) -> (Vec<StackPath>, Vec<Route>) {
        let mut paths = vec![StackPath::Navigation(self.root())];
        let mut layouts = Vec::new();

        loop {
            let Some(top) = paths.last().and_then(StackPath::active_route) else {
                break;
            };
            if !top.is_layout() {
                break;
            }
            let Ok(child) = child_path(self, &top) else {
                break;
            };
            if paths.iter().any(|visited| visited.same_path(&child)) {
                break;
            }
            paths.push(child);
            layouts.push(top);
        }

        (paths, layouts)
    }

    /// Paths from the root to the innermost visible layout's child path
    pub fn active_layout_paths(&self) -> Vec<StackPath> {
        self.active_chain().0
    }

    /// Layout routes currently visible, outermost first
    pub fn active_layouts(&self) -> Vec<Route> {
        self.active_chain().1
    }

    /// Innermost visible layout
    pub fn active_layout(&self) -> Option<Route> {
        self.active_layouts().pop()
    }

    /// Innermost visible path; target of `pop` and guards
    pub fn active_path(&self) -> StackPath {
        self.active_layout_paths()
            .pop()
            .unwrap_or_else(|| StackPath::Navigation(self.root()))
    }

    pub fn active_route(&self) -> Option<Route> {
        self.active_path().active_route()
    }

    /// URI of the active route, or `/` when nothing is shown
    pub fn current_uri(&self) -> String {
        self.active_route()
            .map_or_else(|| "/".to_string(), |route| route.to_uri())
    }

    /// Transition the UI should play for `route`
    #[cfg(feature = "transition")]
    pub fn transition_for(&self, route: &Route) -> Transition {
        route
            .target()
            .as_transition()
            .map_or(self.inner.config.default_transition, |t| t.transition())
    }

    // ------------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------------

    /// Register a listener fired after every committed change on any path
    pub fn add_listener(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.inner.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Fire listeners without a mutation, e.g. to resync the URL bar
    pub fn notify_listeners(&self) {
        self.inner.listeners.notify();
    }

    /// Unregister from every path. Paths may then be bound to another coordinator.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let forwarders = std::mem::take(&mut *self.inner.forwarders.borrow_mut());
        for (path, id) in forwarders {
            path.remove_listener(id);
            path.detach_coordinator();
        }
        debug_log!("Coordinator disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    async fn resolve(&self, route: Route) -> Result<Option<Route>> {
        resolve_redirects(route, Some(self), self.inner.config.redirect_limit).await
    }

    /// Resolve redirects and layouts, then push `route` onto its path.
    ///
    /// On a fixed path the equal entry is activated and the returned future is already
    /// settled.
    pub async fn push(&self, route: Route) -> Result<RouteResultFuture> {
        debug_log!("push '{}'", route.to_uri());
        match self.resolve(route.clone()).await? {
            Some(resolved) => self.push_resolved(resolved).await,
            None => Ok(route.result()),
        }
    }

    pub(crate) async fn push_resolved(&self, route: Route) -> Result<RouteResultFuture> {
        let Some(path) = resolve_layout_path(self, &route, LayoutStrategy::PushToTop).await? else {
            return Ok(settled_result());
        };
        match path {
            StackPath::Navigation(path) => path.push_resolved(route),
            StackPath::Indexed(path) => {
                path.activate_resolved(&route).await?;
                Ok(settled_result())
            }
        }
    }

    /// Like [`push`](Self::push), but an equal route already in the path is moved to the
    /// top instead of duplicated.
    pub async fn push_or_move_to_top(&self, route: Route) -> Result<RouteResultFuture> {
        debug_log!("push_or_move_to_top '{}'", route.to_uri());
        let Some(resolved) = self.resolve(route.clone()).await? else {
            return Ok(route.result());
        };
        let Some(path) = resolve_layout_path(self, &resolved, LayoutStrategy::PushToTop).await?
        else {
            return Ok(settled_result());
        };
        match path {
            StackPath::Navigation(path) => path.push_or_move_resolved(resolved),
            StackPath::Indexed(path) => {
                path.activate_resolved(&resolved).await?;
                Ok(settled_result())
            }
        }
    }

    /// Wipe every path (guards bypassed) and show `route` alone.
    ///
    /// Redirects are resolved before anything is reset, so a failing or stay-put
    /// redirect leaves the state untouched.
    pub async fn replace(&self, route: Route) -> Result<RouteResultFuture> {
        debug_log!("replace with '{}'", route.to_uri());
        match self.resolve(route.clone()).await? {
            Some(resolved) => self.replace_resolved(resolved).await,
            None => Ok(route.result()),
        }
    }

    pub(crate) async fn replace_resolved(&self, route: Route) -> Result<RouteResultFuture> {
        for path in &self.inner.paths {
            path.reset();
        }
        let Some(path) = resolve_layout_path(self, &route, LayoutStrategy::Override).await? else {
            return Ok(settled_result());
        };
        match path {
            StackPath::Navigation(path) => path.activate_resolved(route),
            StackPath::Indexed(path) => {
                path.set_active_route(&route)?;
                Ok(settled_result())
            }
        }
    }

    /// Mutable active paths that can be popped, innermost first
    fn poppable_paths(&self) -> Vec<NavigationPath> {
        self.active_layout_paths()
            .iter()
            .rev()
            .filter_map(StackPath::as_navigation)
            .filter(|path| path.len() >= 2)
            .cloned()
            .collect()
    }

    /// Pop the innermost active mutable path holding at least two routes.
    ///
    /// The last route of a path is never popped through this entry point.
    pub async fn pop(&self, result: RouteResult) -> Result<()> {
        self.try_pop(result).await.map(|_| ())
    }

    /// Like [`pop`](Self::pop), reporting whether a route was removed.
    ///
    /// Returns `Ok(false)` if the guard vetoed or nothing could be popped.
    pub async fn try_pop(&self, result: RouteResult) -> Result<bool> {
        let Some(path) = self.poppable_paths().into_iter().next() else {
            trace_log!("Nothing to pop");
            return Ok(false);
        };
        debug_log!("pop from '{}'", path.label().unwrap_or("<unlabeled>"));
        Ok(path.pop(result).await? == Some(true))
    }

    /// Platform back button: `try_pop` without a result
    pub async fn handle_back_button(&self) -> Result<bool> {
        self.try_pop(None).await
    }

    /// Move to `route` the way browser history does.
    ///
    /// Each layout of the chain is popped back to if present and pushed otherwise; the
    /// route itself is then popped back to, or pushed if new. Returns `Ok(false)` if a
    /// guard vetoed a pop or a redirect asked to stay; listeners are then notified so
    /// the visible URI snaps back to the real state.
    pub async fn navigate(&self, route: Route) -> Result<bool> {
        debug_log!("navigate to '{}'", route.to_uri());
        let Some(resolved) = self.resolve(route).await? else {
            self.notify_listeners();
            return Ok(false);
        };

        let placed = match resolve_layout_path(self, &resolved, LayoutStrategy::PopUntil).await? {
            Some(path) => place(&path, resolved, LayoutStrategy::PopUntil).await?,
            None => false,
        };
        if !placed {
            info_log!("Navigation vetoed; resyncing listeners with '{}'", self.current_uri());
            self.notify_listeners();
        }
        Ok(placed)
    }

    /// Deep-link entry point.
    ///
    /// After redirects, the route's [`DeepLinkStrategy`](crate::DeepLinkStrategy)
    /// decides the placement; routes without one replace the whole state.
    pub async fn recover(&self, route: Route) -> Result<()> {
        debug_log!("recover '{}'", route.to_uri());
        match self.resolve(route).await? {
            Some(resolved) => self.recover_resolved(resolved, None).await,
            None => Ok(()),
        }
    }

    pub(crate) async fn recover_resolved(&self, route: Route, uri: Option<String>) -> Result<()> {
        let strategy = route
            .target()
            .as_deep_link()
            .map(|deep_link| deep_link.deep_link_strategy())
            .unwrap_or_default();
        trace_log!("recover '{}' with {:?}", route.to_uri(), strategy);

        match strategy {
            DeepLinkStrategy::Push => {
                self.push_resolved(route).await?;
            }
            DeepLinkStrategy::Replace => {
                self.replace_resolved(route).await?;
            }
            DeepLinkStrategy::Custom => {
                let uri = uri.unwrap_or_else(|| route.to_uri());
                if let Some(deep_link) = route.target().as_deep_link() {
                    deep_link.deep_link_handler(self, &uri).await?;
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // URI bridge
    // ------------------------------------------------------------------------

    /// Parse `uri` with the synchronous parser (or the route table).
    pub fn parse_uri(&self, uri: &str) -> Result<Route> {
        let parsed = if let Some(parser) = &self.inner.parser {
            parser(uri)
        } else if let Some(table) = &self.inner.route_table {
            table.parse(uri)
        } else {
            return Err(NavigationError::NoRouteParser {
                uri: uri.to_string(),
            });
        };
        parsed.ok_or_else(|| NavigationError::RouteNotFound {
            uri: uri.to_string(),
        })
    }

    /// Parse `uri` with the asynchronous parser, falling back to the synchronous one.
    pub async fn parse_uri_async(&self, uri: &str) -> Result<Route> {
        let Some(parser) = self.inner.async_parser.clone() else {
            return self.parse_uri(uri);
        };
        parser(uri.to_string())
            .await?
            .ok_or_else(|| NavigationError::RouteNotFound {
                uri: uri.to_string(),
            })
    }

    /// The platform reported a URI change (back/forward, typed URL)
    pub async fn navigate_uri(&self, uri: &str) -> Result<bool> {
        match self.parse_uri_async(uri).await {
            Ok(route) => self.navigate(route).await,
            Err(error) => {
                warn_log!("Cannot navigate to '{}': {}", uri, error);
                self.notify_listeners();
                Err(error)
            }
        }
    }

    /// The platform delivered a deep link
    pub async fn recover_uri(&self, uri: &str) -> Result<()> {
        debug_log!("recover uri '{}'", uri);
        let route = self.parse_uri_async(uri).await?;
        match self.resolve(route).await? {
            Some(resolved) => self.recover_resolved(resolved, Some(uri.to_string())).await,
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Per-path view of the current state
    pub fn debug_snapshot(&self) -> Vec<PathSnapshot> {
        let active: Vec<PathId> = self
            .active_layout_paths()
            .iter()
            .map(StackPath::id)
            .collect();
        self.inner
            .paths
            .iter()
            .map(|path| PathSnapshot {
                id: path.id().get(),
                label: path.label().map(str::to_string),
                kind: if path.is_mutable() {
                    PathKind::Navigation
                } else {
                    PathKind::Indexed
                },
                routes: path.stack().iter().map(Route::to_uri).collect(),
                active_index: path.active_index(),
                active: active.contains(&path.id()),
            })
            .collect()
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("paths", &self.inner.paths)
            .field("config", &self.inner.config)
            .field("layouts", &self.inner.layouts)
            .field("current_uri", &self.current_uri())
            .finish_non_exhaustive()
    }
}

/// Shape of a path in a [`PathSnapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    Navigation,
    Indexed,
}

/// Serializable description of one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSnapshot {
    pub id: usize,
    pub label: Option<String>,
    pub kind: PathKind,
    /// URIs, bottom first
    pub routes: Vec<String>,
    pub active_index: Option<usize>,
    /// Whether the path is part of the active layout chain
    pub active: bool,
}
