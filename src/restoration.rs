//! State restoration
//!
//! [`Coordinator::serialize`] turns the whole navigation state into a JSON tree that the
//! platform can persist across process death, and [`Coordinator::deserialize`] rebuilds
//! it on the next cold start:
//!
//! ```json
//! {
//!   "root": ["/", { "strategy": "converter", "key": "profile", "payload": { "id": "42" } }],
//!   "shell": [{ "type": "layout", "value": "app::Shell" }],
//!   "tabs": 1,
//!   "activeRoute": "/"
//! }
//! ```
//!
//! Mutable paths store their routes, bottom first; fixed paths store their active index.
//! Entries are keyed by path label, so labels must stay stable across app versions.
//! Plain routes are stored as URIs and rebuilt with the coordinator's synchronous parser.

use crate::coordinator::{Coordinator, ACTIVE_ROUTE_KEY};
use crate::error::{NavigationError, Result};
use crate::path::{IndexedStackPath, NavigationPath, StackPath};
use crate::route::Route;
use crate::{debug_log, warn_log};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// Route capability: restore from a structured payload instead of the URI
///
/// The payload is handed back to the converter registered under
/// [`restoration_key`](RouteRestorable::restoration_key) with
/// [`CoordinatorBuilder::define_converter`](crate::CoordinatorBuilder::define_converter).
pub trait RouteRestorable {
    /// Converter key; must stay stable across app versions
    fn restoration_key(&self) -> &str;

    fn serialize_payload(&self) -> Result<Value>;
}

type RouteConverter = Rc<dyn Fn(&Value) -> Result<Route>>;

/// Payload converters by key
#[derive(Default)]
pub(crate) struct ConverterRegistry {
    converters: HashMap<String, RouteConverter>,
}

impl ConverterRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn define<F>(&mut self, key: impl Into<String>, convert: F)
    where
        F: Fn(&Value) -> Result<Route> + 'static,
    {
        self.converters.insert(key.into(), Rc::new(convert));
    }

    pub(crate) fn convert(&self, key: &str, payload: &Value) -> Result<Route> {
        let convert = self
            .converters
            .get(key)
            .ok_or_else(|| NavigationError::UnknownConverter {
                key: key.to_string(),
            })?;
        convert(payload)
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.converters.keys()).finish()
    }
}

/// `"type": "layout"` tag of a layout entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutTag {
    Layout,
}

/// `"strategy"` tag of a structured entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadStrategy {
    Converter,
}

/// One serialized route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedRoute {
    /// Plain route, rebuilt by the URI parser
    Uri(String),
    /// Layout route, rebuilt by the layout registry from its type name
    Layout {
        #[serde(rename = "type")]
        tag: LayoutTag,
        value: String,
    },
    /// Restorable route, rebuilt by the converter registered under `key`
    Custom {
        strategy: PayloadStrategy,
        key: String,
        payload: Value,
    },
}

impl SerializedRoute {
    pub fn uri(uri: impl Into<String>) -> Self {
        SerializedRoute::Uri(uri.into())
    }

    pub fn layout(type_name: impl Into<String>) -> Self {
        SerializedRoute::Layout {
            tag: LayoutTag::Layout,
            value: type_name.into(),
        }
    }

    pub fn custom(key: impl Into<String>, payload: Value) -> Self {
        SerializedRoute::Custom {
            strategy: PayloadStrategy::Converter,
            key: key.into(),
            payload,
        }
    }

    /// Serialized form of `route`
    pub fn from_route(route: &Route) -> Result<Self> {
        if route.is_layout() {
            return Ok(Self::layout(route.type_name()));
        }
        match route.target().as_restorable() {
            Some(restorable) => Ok(Self::custom(
                restorable.restoration_key(),
                restorable.serialize_payload()?,
            )),
            None => Ok(Self::uri(route.to_uri())),
        }
    }
}

/// Saved state of one path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathState {
    /// Active index of a fixed path
    Index(usize),
    /// Routes of a mutable path, bottom first
    Routes(Vec<SerializedRoute>),
}

/// Full restoration tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestorationState {
    #[serde(
        rename = "activeRoute",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub active_route: Option<SerializedRoute>,
    /// Path states by label
    #[serde(flatten)]
    pub paths: BTreeMap<String, PathState>,
}

/// Restoration work for one path, prepared before anything is mutated
enum Restore {
    Routes(NavigationPath, Vec<Route>),
    Index(IndexedStackPath, usize),
}

impl Coordinator {
    /// Capture the state of every path plus the active route.
    ///
    /// Fails with [`NavigationError::MissingDebugLabel`] if a path has no label.
    pub fn restoration_state(&self) -> Result<RestorationState> {
        let mut paths = BTreeMap::new();
        for path in self.paths() {
            let label = path
                .label()
                .ok_or_else(|| NavigationError::MissingDebugLabel {
                    id: path.id(),
                })?
                .to_string();
            let state = match &path {
                StackPath::Navigation(path) => PathState::Routes(
                    path.stack()
                        .iter()
                        .map(SerializedRoute::from_route)
                        .collect::<Result<_>>()?,
                ),
                StackPath::Indexed(path) => PathState::Index(path.active_index()),
            };
            paths.insert(label, state);
        }

        let active_route = self
            .active_route()
            .map(|route| SerializedRoute::from_route(&route))
            .transpose()?;

        Ok(RestorationState {
            active_route,
            paths,
        })
    }

    /// [`restoration_state`](Self::restoration_state) as a JSON tree
    pub fn serialize(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.restoration_state()?)?)
    }

    /// Rebuild a route from its serialized form
    pub fn deserialize_route(&self, serialized: &SerializedRoute) -> Result<Route> {
        match serialized {
            SerializedRoute::Uri(uri) => self.parse_uri(uri),
            SerializedRoute::Layout { value, .. } => self.layouts().construct_by_name(value),
            SerializedRoute::Custom { key, payload, .. } => {
                self.converters().convert(key, payload)
            }
        }
    }

    /// Restore a tree produced by [`serialize`](Self::serialize)
    pub async fn deserialize(&self, tree: Value) -> Result<()> {
        let state: RestorationState = serde_json::from_value(tree)?;
        self.restore(state).await
    }

    /// Restore every path, then navigate to the saved active route once.
    ///
    /// Every route is rebuilt before any path changes, so a missing converter or layout
    /// leaves the current state untouched. Labels no path carries are skipped.
    pub async fn restore(&self, state: RestorationState) -> Result<()> {
        let mut plan = Vec::with_capacity(state.paths.len());
        for (label, saved) in &state.paths {
            if label == ACTIVE_ROUTE_KEY {
                continue;
            }
            let Some(path) = self.path(label) else {
                warn_log!("No path labeled '{}'; skipping its saved state", label);
                continue;
            };
            let step = match (path, saved) {
                (StackPath::Navigation(path), PathState::Routes(routes)) => {
                    let routes = routes
                        .iter()
                        .map(|route| self.deserialize_route(route))
                        .collect::<Result<Vec<_>>>()?;
                    Restore::Routes(path, routes)
                }
                (StackPath::Indexed(path), PathState::Index(index)) => {
                    if *index >= path.len() {
                        return Err(NavigationError::IndexOutOfRange {
                            path: label.clone(),
                            index: *index,
                            len: path.len(),
                        });
                    }
                    Restore::Index(path, *index)
                }
                (StackPath::Navigation(_), PathState::Index(_)) => {
                    return Err(NavigationError::InvalidRestorationState {
                        message: format!("path '{label}' is mutable but an index was saved"),
                    });
                }
                (StackPath::Indexed(_), PathState::Routes(_)) => {
                    return Err(NavigationError::InvalidRestorationState {
                        message: format!("path '{label}' is fixed but a route list was saved"),
                    });
                }
            };
            plan.push(step);
        }

        let active = state
            .active_route
            .as_ref()
            .map(|route| self.deserialize_route(route))
            .transpose()?;

        debug_log!("Restoring {} paths", plan.len());
        for step in plan {
            match step {
                Restore::Routes(path, routes) => path.reconcile(routes)?,
                Restore::Index(path, index) => path.set_active_index(index)?,
            }
        }

        if let Some(active) = active {
            self.navigate(active).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equality::PropValue;
    use crate::layout::{LayoutKey, RouteLayout};
    use crate::redirect::{RedirectContext, RedirectFuture, RedirectResult, RouteRedirect};
    use crate::route::RouteTarget;
    use pollster::block_on;
    use serde_json::json;
    use std::cell::Cell;

    struct Home;

    impl RouteTarget for Home {
        fn to_uri(&self) -> String {
            "/".to_string()
        }
    }

    struct Profile(String);

    impl RouteTarget for Profile {
        fn to_uri(&self) -> String {
            format!("/profile/{}", self.0)
        }

        fn props(&self) -> Vec<PropValue> {
            vec![self.0.as_str().into()]
        }

        fn as_restorable(&self) -> Option<&dyn RouteRestorable> {
            Some(self)
        }
    }

    impl RouteRestorable for Profile {
        fn restoration_key(&self) -> &str {
            "profile"
        }

        fn serialize_payload(&self) -> Result<Value> {
            Ok(json!({ "id": self.0 }))
        }
    }

    struct Tab(&'static str);

    impl RouteTarget for Tab {
        fn to_uri(&self) -> String {
            format!("/tab/{}", self.0)
        }

        fn props(&self) -> Vec<PropValue> {
            vec![self.0.into()]
        }
    }

    struct Shell;

    impl RouteTarget for Shell {
        fn to_uri(&self) -> String {
            "/shell".to_string()
        }

        fn as_layout(&self) -> Option<&dyn RouteLayout> {
            Some(self)
        }
    }

    impl RouteLayout for Shell {
        fn resolve_path(&self, coordinator: &Coordinator) -> Option<StackPath> {
            coordinator.path("shell")
        }
    }

    struct Inbox;

    impl RouteTarget for Inbox {
        fn to_uri(&self) -> String {
            "/inbox".to_string()
        }

        fn layout(&self) -> Option<LayoutKey> {
            Some(LayoutKey::of::<Shell>())
        }
    }

    /// Counts how often restoration re-evaluates it
    struct Audited(Rc<Cell<usize>>);

    impl RouteTarget for Audited {
        fn to_uri(&self) -> String {
            "/audited".to_string()
        }

        fn as_redirect(&self) -> Option<&dyn RouteRedirect> {
            Some(self)
        }
    }

    impl RouteRedirect for Audited {
        fn redirect<'a>(&'a self, _cx: &'a RedirectContext) -> RedirectFuture<'a> {
            self.0.set(self.0.get() + 1);
            Box::pin(async { Ok(RedirectResult::Proceed) })
        }
    }

    fn coordinator_with(audits: Rc<Cell<usize>>) -> Coordinator {
        let tabs = IndexedStackPath::new(
            "tabs",
            vec![Route::new(Tab("feed")), Route::new(Tab("search"))],
        )
        .unwrap();
        Coordinator::builder(NavigationPath::with_label("root"))
            .path(tabs)
            .path(NavigationPath::with_label("shell"))
            .define_layout(|| Shell)
            .define_converter("profile", |payload| {
                let id = payload["id"]
                    .as_str()
                    .ok_or_else(|| NavigationError::message("profile payload without id"))?;
                Ok(Route::new(Profile(id.to_string())))
            })
            .route_parser(move |uri| match uri {
                "/" => Some(Route::new(Home)),
                "/inbox" => Some(Route::new(Inbox)),
                "/audited" => Some(Route::new(Audited(audits.clone()))),
                _ => None,
            })
            .build()
            .unwrap()
    }

    fn coordinator() -> Coordinator {
        coordinator_with(Rc::new(Cell::new(0)))
    }

    fn uris(path: &StackPath) -> Vec<String> {
        path.stack().iter().map(Route::to_uri).collect()
    }

    #[test]
    fn test_serialize_tree_layout() {
        let coordinator = coordinator();
        block_on(coordinator.push(Route::new(Home))).unwrap();
        block_on(coordinator.push(Route::new(Profile("42".to_string())))).unwrap();
        block_on(coordinator.path("tabs").unwrap().activate_route(Route::new(Tab("search"))))
            .unwrap();

        let tree = coordinator.serialize().unwrap();
        assert_eq!(
            tree,
            json!({
                "root": ["/", { "strategy": "converter", "key": "profile", "payload": { "id": "42" } }],
                "tabs": 1,
                "shell": [],
                "activeRoute": { "strategy": "converter", "key": "profile", "payload": { "id": "42" } }
            })
        );
    }

    #[test]
    fn test_round_trip() {
        let source = coordinator();
        block_on(source.push(Route::new(Home))).unwrap();
        block_on(source.push(Route::new(Profile("42".to_string())))).unwrap();
        block_on(source.path("tabs").unwrap().activate_route(Route::new(Tab("search"))))
            .unwrap();
        let tree = source.serialize().unwrap();

        let restored = coordinator();
        block_on(restored.deserialize(tree)).unwrap();

        assert_eq!(
            uris(&restored.root().into()),
            vec!["/".to_string(), "/profile/42".to_string()]
        );
        assert_eq!(restored.path("tabs").unwrap().active_index(), Some(1));
        assert_eq!(restored.current_uri(), "/profile/42");
        assert_eq!(restored.root().stack(), source.root().stack());
    }

    #[test]
    fn test_layout_routes_use_markers() {
        let source = coordinator();
        block_on(source.push(Route::new(Inbox))).unwrap();
        let tree = source.serialize().unwrap();
        assert_eq!(
            tree["root"],
            json!([{ "type": "layout", "value": std::any::type_name::<Shell>() }])
        );

        let restored = coordinator();
        block_on(restored.deserialize(tree)).unwrap();
        assert!(restored.root().stack()[0].is::<Shell>());
        assert_eq!(uris(&restored.path("shell").unwrap()), vec!["/inbox"]);
        assert_eq!(restored.current_uri(), "/inbox");
    }

    #[test]
    fn test_active_route_is_reevaluated_once() {
        let audits = Rc::new(Cell::new(0));
        let restored = coordinator_with(audits.clone());
        let tree = json!({ "root": ["/", "/audited"], "activeRoute": "/audited" });

        block_on(restored.deserialize(tree)).unwrap();
        assert_eq!(audits.get(), 1);
        assert_eq!(restored.root().len(), 2);
    }

    #[test]
    fn test_missing_label_fails() {
        let coordinator = Coordinator::builder(NavigationPath::new()).build().unwrap();
        let error = coordinator.serialize().unwrap_err();
        assert!(matches!(error, NavigationError::MissingDebugLabel { .. }));
    }

    #[test]
    fn test_unknown_converter_leaves_state_untouched() {
        let coordinator = coordinator();
        block_on(coordinator.push(Route::new(Home))).unwrap();

        let tree = json!({
            "root": ["/", { "strategy": "converter", "key": "settings", "payload": null }],
            "tabs": 1
        });
        let error = block_on(coordinator.deserialize(tree)).unwrap_err();
        assert!(matches!(error, NavigationError::UnknownConverter { key } if key == "settings"));
        assert_eq!(coordinator.root().len(), 1);
        assert_eq!(coordinator.path("tabs").unwrap().active_index(), Some(0));
    }

    #[test]
    fn test_shape_mismatch_and_bounds() {
        let coordinator = coordinator();
        let error = block_on(coordinator.deserialize(json!({ "tabs": ["/"] }))).unwrap_err();
        assert!(matches!(error, NavigationError::InvalidRestorationState { .. }));

        let error = block_on(coordinator.deserialize(json!({ "tabs": 7 }))).unwrap_err();
        assert!(matches!(error, NavigationError::IndexOutOfRange { index: 7, .. }));
    }

    #[test]
    fn test_unknown_labels_are_skipped() {
        let coordinator = coordinator();
        block_on(coordinator.deserialize(json!({ "legacy": ["/"], "root": ["/"] }))).unwrap();
        assert_eq!(coordinator.root().len(), 1);
    }

    #[test]
    fn test_restoration_state_parses_untagged_entries() {
        let state: RestorationState = serde_json::from_value(json!({
            "root": ["/", { "type": "layout", "value": "app::Shell" }],
            "tabs": 2,
            "activeRoute": "/"
        }))
        .unwrap();

        assert_eq!(state.active_route, Some(SerializedRoute::uri("/")));
        assert_eq!(state.paths["tabs"], PathState::Index(2));
        assert_eq!(
            state.paths["root"],
            PathState::Routes(vec![
                SerializedRoute::uri("/"),
                SerializedRoute::layout("app::Shell")
            ])
        );
    }
}
