//! Layout resolution
//!
//! A layout is a route that owns a nested child path, such as a tab shell or a
//! settings split view. A route names the layout it must live in through
//! [`RouteTarget::layout`]; that layout may itself require a parent layout, and so on up
//! to the root path.
//!
//! Before a route is placed, the coordinator threads every layout of that chain into its
//! parent path (root-most first), reusing the instance already visible in the active
//! hierarchy when there is one and constructing a fresh one from the registry otherwise.

use crate::coordinator::Coordinator;
use crate::error::{NavigationError, Result};
use crate::path::StackPath;
use crate::route::{Route, RouteTarget};
use crate::trace_log;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Static reference to a layout type
#[derive(Clone, Copy)]
pub struct LayoutKey {
    type_id: TypeId,
    name: &'static str,
}

impl LayoutKey {
    /// Key for the layout route type `L`
    pub fn of<L: RouteTarget>() -> Self {
        Self {
            type_id: TypeId::of::<L>(),
            name: std::any::type_name::<L>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified type name, also used as the restoration marker
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for LayoutKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for LayoutKey {}

impl Hash for LayoutKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for LayoutKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LayoutKey").field(&self.name).finish()
    }
}

/// Route capability: the route owns a child path
///
/// # Example
///
/// ```
/// use stack_navigator::{Coordinator, RouteLayout, RouteTarget, StackPath};
///
/// struct TabShell;
///
/// impl RouteTarget for TabShell {
///     fn to_uri(&self) -> String {
///         "/tabs".to_string()
///     }
///
///     fn as_layout(&self) -> Option<&dyn RouteLayout> {
///         Some(self)
///     }
/// }
///
/// impl RouteLayout for TabShell {
///     fn resolve_path(&self, coordinator: &Coordinator) -> Option<StackPath> {
///         coordinator.path("tabs")
///     }
/// }
/// ```
pub trait RouteLayout {
    /// The child path this layout renders, looked up on the coordinator
    fn resolve_path(&self, coordinator: &Coordinator) -> Option<StackPath>;
}

/// How each layout (and finally the route) is threaded into its parent path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStrategy {
    /// Become the sole content of a mutable parent, or its active index (`replace`)
    Override,
    /// Push, or move an equal entry to the top (`push`)
    PushToTop,
    /// Pop down to an equal entry, consulting guards; push if absent (`navigate`)
    PopUntil,
}

type LayoutConstructor = Rc<dyn Fn() -> Route>;

struct LayoutDefinition {
    name: &'static str,
    construct: LayoutConstructor,
}

/// Constructors for layout routes, keyed by type
#[derive(Default)]
pub struct LayoutRegistry {
    by_type: HashMap<TypeId, LayoutDefinition>,
    by_name: HashMap<&'static str, TypeId>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the constructor for layout type `L`
    pub fn define<L, F>(&mut self, construct: F)
    where
        L: RouteTarget,
        F: Fn() -> L + 'static,
    {
        let key = LayoutKey::of::<L>();
        self.by_name.insert(key.name, key.type_id);
        self.by_type.insert(
            key.type_id,
            LayoutDefinition {
                name: key.name,
                construct: Rc::new(move || Route::new(construct())),
            },
        );
    }

    pub fn contains(&self, key: &LayoutKey) -> bool {
        self.by_type.contains_key(&key.type_id)
    }

    /// Construct a fresh layout route
    pub fn construct(&self, key: &LayoutKey) -> Result<Route> {
        self.by_type
            .get(&key.type_id)
            .map(|definition| (definition.construct)())
            .ok_or_else(|| NavigationError::UnknownLayout {
                name: key.name.to_string(),
            })
    }

    /// Construct a fresh layout route from its restoration marker
    pub fn construct_by_name(&self, name: &str) -> Result<Route> {
        self.by_name
            .get(name)
            .and_then(|type_id| self.by_type.get(type_id))
            .map(|definition| (definition.construct)())
            .ok_or_else(|| NavigationError::UnknownLayout {
                name: name.to_string(),
            })
    }

    /// Registered layout names
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_type.values().map(|definition| definition.name)
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl fmt::Debug for LayoutRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Child path owned by `layout`, which must be registered with the coordinator.
pub(crate) fn child_path(coordinator: &Coordinator, layout: &Route) -> Result<StackPath> {
    let missing = || NavigationError::MissingLayoutPath {
        name: layout.type_name().to_string(),
    };
    let path = layout
        .target()
        .as_layout()
        .ok_or_else(missing)?
        .resolve_path(coordinator)
        .ok_or_else(missing)?;

    if coordinator.owns(&path) {
        Ok(path)
    } else {
        Err(NavigationError::UnknownPath {
            path: path.describe(),
        })
    }
}

/// Layout chain required by `key`, root-most first.
///
/// Instances visible in the active hierarchy are reused; the rest are constructed.
fn layout_chain(coordinator: &Coordinator, key: LayoutKey) -> Result<Vec<Route>> {
    let active = coordinator.active_layouts();
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(key);

    while let Some(key) = next {
        if !seen.insert(key.type_id) {
            return Err(NavigationError::LayoutCycle {
                name: key.name.to_string(),
            });
        }
        let layout = match active.iter().find(|route| route.type_id() == key.type_id) {
            Some(existing) => existing.clone(),
            None => coordinator.layouts().construct(&key)?,
        };
        next = layout.layout();
        chain.push(layout);
    }

    chain.reverse();
    Ok(chain)
}

/// Place every layout `route` depends on and return the path `route` belongs in.
///
/// Returns `Ok(None)` if a guard vetoed a pop along the way; layouts placed before the
/// veto stay where they are.
pub(crate) async fn resolve_layout_path(
    coordinator: &Coordinator,
    route: &Route,
    strategy: LayoutStrategy,
) -> Result<Option<StackPath>> {
    let root = StackPath::Navigation(coordinator.root());
    let Some(key) = route.layout() else {
        return Ok(Some(root));
    };

    let chain = layout_chain(coordinator, key)?;
    let mut parent = root;
    for layout in chain {
        trace_log!(
            "Placing layout '{}' into '{}' ({:?})",
            layout.to_uri(),
            parent.describe(),
            strategy
        );
        if !place(&parent, layout.clone(), strategy).await? {
            return Ok(None);
        }
        parent = child_path(coordinator, &layout)?;
    }
    Ok(Some(parent))
}

/// Thread `route` into `path`. Returns `Ok(false)` on a guard veto.
pub(crate) async fn place(path: &StackPath, route: Route, strategy: LayoutStrategy) -> Result<bool> {
    match (strategy, path) {
        (LayoutStrategy::Override, StackPath::Navigation(path)) => {
            path.activate_resolved(route)?;
            Ok(true)
        }
        (LayoutStrategy::Override, StackPath::Indexed(path)) => {
            path.set_active_route(&route)?;
            Ok(true)
        }
        (LayoutStrategy::PopUntil, StackPath::Navigation(path)) if path.contains(&route) => {
            path.pop_until(&route).await
        }
        (LayoutStrategy::PushToTop | LayoutStrategy::PopUntil, StackPath::Navigation(path)) => {
            path.push_or_move_resolved(route)?;
            Ok(true)
        }
        (LayoutStrategy::PushToTop | LayoutStrategy::PopUntil, StackPath::Indexed(path)) => {
            path.activate_resolved(&route).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shell;

    impl RouteTarget for Shell {
        fn to_uri(&self) -> String {
            "/shell".to_string()
        }
    }

    struct Settings;

    impl RouteTarget for Settings {
        fn to_uri(&self) -> String {
            "/settings".to_string()
        }
    }

    #[test]
    fn test_layout_key_identity() {
        assert_eq!(LayoutKey::of::<Shell>(), LayoutKey::of::<Shell>());
        assert_ne!(LayoutKey::of::<Shell>(), LayoutKey::of::<Settings>());
        assert!(LayoutKey::of::<Shell>().name().ends_with("Shell"));
    }

    #[test]
    fn test_registry_constructs_fresh_instances() {
        let mut registry = LayoutRegistry::new();
        registry.define(|| Shell);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&LayoutKey::of::<Shell>()));

        let a = registry.construct(&LayoutKey::of::<Shell>()).unwrap();
        let b = registry.construct(&LayoutKey::of::<Shell>()).unwrap();
        assert!(a.is::<Shell>());
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_registry_lookup_by_name() {
        let mut registry = LayoutRegistry::new();
        registry.define(|| Shell);

        let name = LayoutKey::of::<Shell>().name();
        assert!(registry.construct_by_name(name).unwrap().is::<Shell>());
    }

    #[test]
    fn test_unknown_layout() {
        let registry = LayoutRegistry::new();
        let error = registry.construct(&LayoutKey::of::<Settings>()).unwrap_err();
        assert!(matches!(error, NavigationError::UnknownLayout { .. }));

        let error = registry.construct_by_name("nope::Layout").unwrap_err();
        assert!(matches!(error, NavigationError::UnknownLayout { name } if name == "nope::Layout"));
    }
}
