//! Nested binding environment threaded through rendering.
//!
//! Scopes live in an arena and point at their parent by index. A pass creates
//! a root, then one child per loop iteration or repeated line; children are
//! released before their parent is touched again, so the arena behaves as a
//! stack and never holds dangling parents.

use crate::run::{Delivery, Driver, Restaurant, SplitRestaurant, Stop};

/// The kinds of entity a scope can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Driver,
    Delivery,
    Pickup,
    SplitRestaurant,
    BackupDriver,
    AlternateType,
    ItineraryStop,
}

impl BindingKind {
    const COUNT: usize = 7;

    fn slot(self) -> usize {
        match self {
            BindingKind::Driver => 0,
            BindingKind::Delivery => 1,
            BindingKind::Pickup => 2,
            BindingKind::SplitRestaurant => 3,
            BindingKind::BackupDriver => 4,
            BindingKind::AlternateType => 5,
            BindingKind::ItineraryStop => 6,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            BindingKind::Driver => "driver",
            BindingKind::Delivery => "delivery",
            BindingKind::Pickup => "pickup restaurant",
            BindingKind::SplitRestaurant => "split restaurant",
            BindingKind::BackupDriver => "backup driver",
            BindingKind::AlternateType => "alternate type",
            BindingKind::ItineraryStop => "itinerary stop",
        }
    }
}

/// A bound value. Everything borrows from the delivery run.
#[derive(Debug, Clone, Copy)]
pub enum Binding<'run> {
    Driver(&'run Driver),
    Delivery(&'run Delivery),
    Pickup(&'run Restaurant),
    SplitRestaurant(&'run SplitRestaurant),
    BackupDriver(&'run str),
    AlternateType(&'run str),
    ItineraryStop(Stop),
}

impl Binding<'_> {
    pub fn kind(&self) -> BindingKind {
        match self {
            Binding::Driver(_) => BindingKind::Driver,
            Binding::Delivery(_) => BindingKind::Delivery,
            Binding::Pickup(_) => BindingKind::Pickup,
            Binding::SplitRestaurant(_) => BindingKind::SplitRestaurant,
            Binding::BackupDriver(_) => BindingKind::BackupDriver,
            Binding::AlternateType(_) => BindingKind::AlternateType,
            Binding::ItineraryStop(_) => BindingKind::ItineraryStop,
        }
    }
}

/// Index of a scope in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(usize);

#[derive(Debug)]
struct Node<'run> {
    label: String,
    parent: Option<ScopeId>,
    bindings: [Option<Binding<'run>>; BindingKind::COUNT],
}

/// Arena of scopes for one rendering pass.
#[derive(Debug, Default)]
pub struct Scopes<'run> {
    nodes: Vec<Node<'run>>,
}

impl<'run> Scopes<'run> {
    pub fn new() -> Self {
        Scopes { nodes: Vec::new() }
    }

    /// Start a new root scope.
    pub fn root(&mut self, label: impl Into<String>) -> ScopeId {
        self.push(label.into(), None)
    }

    /// Create a scope whose lookups fall back to `parent`.
    pub fn child(&mut self, parent: ScopeId, label: impl Into<String>) -> ScopeId {
        self.push(label.into(), Some(parent))
    }

    fn push(&mut self, label: String, parent: Option<ScopeId>) -> ScopeId {
        self.nodes.push(Node {
            label,
            parent,
            bindings: [None; BindingKind::COUNT],
        });
        ScopeId(self.nodes.len() - 1)
    }

    /// Bind a value at `scope`. Bind before anything below `scope` is created.
    pub fn bind(&mut self, scope: ScopeId, binding: Binding<'run>) {
        if let Some(node) = self.nodes.get_mut(scope.0) {
            node.bindings[binding.kind().slot()] = Some(binding);
        }
    }

    /// Nearest binding of `kind`, walking from `scope` toward the root.
    pub fn lookup(&self, scope: ScopeId, kind: BindingKind) -> Option<Binding<'run>> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let node = self.nodes.get(id.0)?;
            if let Some(binding) = node.bindings[kind.slot()] {
                return Some(binding);
            }
            current = node.parent;
        }
        None
    }

    /// Drop `scope` and everything created after it.
    pub fn release(&mut self, scope: ScopeId) {
        self.nodes.truncate(scope.0);
    }

    pub fn label(&self, scope: ScopeId) -> &str {
        self.nodes.get(scope.0).map_or("", |node| node.label.as_str())
    }

    /// Labels from the root down to `scope`, e.g. `driver alice/Consumer[1]`.
    pub fn path(&self, scope: ScopeId) -> String {
        let mut labels = Vec::new();
        let mut current = Some(scope);
        while let Some(node) = current.and_then(|id| self.nodes.get(id.0)) {
            labels.push(node.label.as_str());
            current = node.parent;
        }
        labels.reverse();
        labels.join("/")
    }

    // Typed lookups.

    pub fn driver(&self, scope: ScopeId) -> Option<&'run Driver> {
        match self.lookup(scope, BindingKind::Driver)? {
            Binding::Driver(driver) => Some(driver),
            _ => None,
        }
    }

    pub fn delivery(&self, scope: ScopeId) -> Option<&'run Delivery> {
        match self.lookup(scope, BindingKind::Delivery)? {
            Binding::Delivery(delivery) => Some(delivery),
            _ => None,
        }
    }

    pub fn pickup(&self, scope: ScopeId) -> Option<&'run Restaurant> {
        match self.lookup(scope, BindingKind::Pickup)? {
            Binding::Pickup(restaurant) => Some(restaurant),
            _ => None,
        }
    }

    pub fn split_restaurant(&self, scope: ScopeId) -> Option<&'run SplitRestaurant> {
        match self.lookup(scope, BindingKind::SplitRestaurant)? {
            Binding::SplitRestaurant(split) => Some(split),
            _ => None,
        }
    }

    pub fn backup_driver(&self, scope: ScopeId) -> Option<&'run str> {
        match self.lookup(scope, BindingKind::BackupDriver)? {
            Binding::BackupDriver(name) => Some(name),
            _ => None,
        }
    }

    pub fn alternate_type(&self, scope: ScopeId) -> Option<&'run str> {
        match self.lookup(scope, BindingKind::AlternateType)? {
            Binding::AlternateType(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn itinerary_stop(&self, scope: ScopeId) -> Option<Stop> {
        match self.lookup(scope, BindingKind::ItineraryStop)? {
            Binding::ItineraryStop(stop) => Some(stop),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_bindings_are_visible_until_rebound() {
        let alice = Driver::new("alice");
        let bob = Delivery::new("Bob", "A");
        let carol = Delivery::new("Carol", "A");

        let mut scopes = Scopes::new();
        let root = scopes.root("driver alice");
        scopes.bind(root, Binding::Driver(&alice));
        scopes.bind(root, Binding::Delivery(&bob));

        let child = scopes.child(root, "Consumer[0]");
        assert_eq!(scopes.driver(child).map(|d| d.user_name.as_str()), Some("alice"));
        assert_eq!(scopes.delivery(child).map(|d| d.name.as_str()), Some("Bob"));

        scopes.bind(child, Binding::Delivery(&carol));
        assert_eq!(scopes.delivery(child).map(|d| d.name.as_str()), Some("Carol"));
        assert_eq!(scopes.delivery(root).map(|d| d.name.as_str()), Some("Bob"));
    }

    #[test]
    fn unbound_at_root() {
        let mut scopes = Scopes::new();
        let root = scopes.root("group");
        let child = scopes.child(root, "x");
        assert!(scopes.lookup(child, BindingKind::Pickup).is_none());
        assert!(scopes.backup_driver(child).is_none());
    }

    #[test]
    fn release_truncates_and_paths_follow_parents() {
        let mut scopes = Scopes::new();
        let root = scopes.root("driver alice");
        let a = scopes.child(root, "Pickup[0]");
        let b = scopes.child(a, "AlternateMeals[1]");
        assert_eq!(scopes.path(b), "driver alice/Pickup[0]/AlternateMeals[1]");
        assert_eq!(scopes.label(a), "Pickup[0]");

        scopes.release(a);
        let again = scopes.child(root, "Pickup[1]");
        assert_eq!(again, a);
        assert_eq!(scopes.path(again), "driver alice/Pickup[1]");
    }
}
