//! Handle registry: correlates Rapier handles with scene nodes and event subscribers.
//!
//! Owned by one [`Simulation`](crate::Simulation); there is no process-wide instance, so several
//! simulations can coexist (tests do this constantly).
//!
//! Handle reuse
//! - Rapier handles are arena indices with a generation counter, so a handle freed and then
//!   recreated does not compare equal to its predecessor.
//! - Entries are still purged synchronously at removal time. Callers must not keep a handle
//!   across a removal boundary.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rapier3d::prelude::{ActiveEvents, ColliderHandle, RigidBodyHandle};

use crate::events::{CollisionPayload, ContactForcePayload};
use crate::scene::NodeId;

pub type CollisionCallback = Rc<dyn Fn(&CollisionPayload)>;
pub type ContactForceCallback = Rc<dyn Fn(&ContactForcePayload)>;

/// Optional subscriber callbacks for one collider or body.
#[derive(Clone, Default)]
pub struct EventBundle {
    pub on_collision_enter: Option<CollisionCallback>,
    pub on_collision_exit: Option<CollisionCallback>,
    pub on_contact_force: Option<ContactForceCallback>,
}

impl EventBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_collision_enter(mut self, f: impl Fn(&CollisionPayload) + 'static) -> Self {
        self.on_collision_enter = Some(Rc::new(f));
        self
    }

    pub fn on_collision_exit(mut self, f: impl Fn(&CollisionPayload) + 'static) -> Self {
        self.on_collision_exit = Some(Rc::new(f));
        self
    }

    pub fn on_contact_force(mut self, f: impl Fn(&ContactForcePayload) + 'static) -> Self {
        self.on_contact_force = Some(Rc::new(f));
        self
    }

    pub fn wants_collisions(&self) -> bool {
        self.on_collision_enter.is_some() || self.on_collision_exit.is_some()
    }

    pub fn wants_contact_forces(&self) -> bool {
        self.on_contact_force.is_some()
    }
}

impl std::fmt::Debug for EventBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBundle")
            .field("on_collision_enter", &self.on_collision_enter.is_some())
            .field("on_collision_exit", &self.on_collision_exit.is_some())
            .field("on_contact_force", &self.on_contact_force.is_some())
            .finish()
    }
}

/// Single-slot cell holding the latest [`EventBundle`] of a subscriber.
///
/// The dispatcher dereferences the cell at call time, so a replaced bundle takes effect on the
/// very next event, even within the same step.
#[derive(Clone, Debug, Default)]
pub struct Subscription(Rc<RefCell<EventBundle>>);

impl Subscription {
    pub fn new(bundle: EventBundle) -> Self {
        Self(Rc::new(RefCell::new(bundle)))
    }

    /// Replace (not merge) the bundle.
    pub fn replace(&self, bundle: EventBundle) {
        *self.0.borrow_mut() = bundle;
    }

    /// Clone of the current bundle. Callbacks are `Rc`s, so this is cheap and releases the
    /// borrow before any callback runs.
    pub fn current(&self) -> EventBundle {
        self.0.borrow().clone()
    }

    pub fn wants_collisions(&self) -> bool {
        self.0.borrow().wants_collisions()
    }

    pub fn wants_contact_forces(&self) -> bool {
        self.0.borrow().wants_contact_forces()
    }

    pub fn ptr_eq(&self, other: &Subscription) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Default)]
pub struct HandleRegistry {
    collider_nodes: HashMap<ColliderHandle, NodeId>,
    collider_events: HashMap<ColliderHandle, Subscription>,
    body_nodes: HashMap<RigidBodyHandle, NodeId>,
    body_events: HashMap<RigidBodyHandle, Subscription>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_body(&mut self, handle: RigidBodyHandle, node: NodeId, events: Subscription) {
        self.body_nodes.insert(handle, node);
        self.body_events.insert(handle, events);
    }

    pub fn insert_collider(&mut self, handle: ColliderHandle, node: NodeId, events: Subscription) {
        self.collider_nodes.insert(handle, node);
        self.collider_events.insert(handle, events);
    }

    /// Drop both body entries. Returns `false` if nothing was registered.
    pub fn purge_body(&mut self, handle: RigidBodyHandle) -> bool {
        let node = self.body_nodes.remove(&handle);
        let events = self.body_events.remove(&handle);
        node.is_some() || events.is_some()
    }

    /// Drop both collider entries. Returns `false` if nothing was registered.
    pub fn purge_collider(&mut self, handle: ColliderHandle) -> bool {
        let node = self.collider_nodes.remove(&handle);
        let events = self.collider_events.remove(&handle);
        node.is_some() || events.is_some()
    }

    pub fn body_node(&self, handle: RigidBodyHandle) -> Option<NodeId> {
        self.body_nodes.get(&handle).copied()
    }

    pub fn body_events(&self, handle: RigidBodyHandle) -> Option<&Subscription> {
        self.body_events.get(&handle)
    }

    pub fn collider_node(&self, handle: ColliderHandle) -> Option<NodeId> {
        self.collider_nodes.get(&handle).copied()
    }

    pub fn collider_events(&self, handle: ColliderHandle) -> Option<&Subscription> {
        self.collider_events.get(&handle)
    }

    pub fn contains_body(&self, handle: RigidBodyHandle) -> bool {
        self.body_nodes.contains_key(&handle)
    }

    pub fn contains_collider(&self, handle: ColliderHandle) -> bool {
        self.collider_nodes.contains_key(&handle)
    }

    /// Snapshot of registered bodies. Iterating a copy keeps callers free to purge mid-loop.
    pub fn bodies(&self) -> Vec<(RigidBodyHandle, NodeId)> {
        self.body_nodes.iter().map(|(h, n)| (*h, *n)).collect()
    }

    pub fn body_count(&self) -> usize {
        self.body_nodes.len()
    }

    pub fn collider_count(&self) -> usize {
        self.collider_nodes.len()
    }

    /// Event classes a collider must report, given its own and its parent body's subscribers.
    pub fn active_events(
        &self,
        collider: ColliderHandle,
        parent: Option<RigidBodyHandle>,
    ) -> ActiveEvents {
        let own = self.collider_events(collider);
        let body = parent.and_then(|b| self.body_events(b));
        active_events_for(own, body)
    }

    pub fn clear(&mut self) {
        self.collider_nodes.clear();
        self.collider_events.clear();
        self.body_nodes.clear();
        self.body_events.clear();
    }
}

/// `NONE | COLLISION | CONTACT_FORCE | BOTH` from the union of two subscriptions.
pub fn active_events_for(
    collider: Option<&Subscription>,
    body: Option<&Subscription>,
) -> ActiveEvents {
    let subs = [collider, body];
    let mut flags = ActiveEvents::empty();
    if subs.iter().flatten().any(|s| s.wants_collisions()) {
        flags |= ActiveEvents::COLLISION_EVENTS;
    }
    if subs.iter().flatten().any(|s| s.wants_contact_forces()) {
        flags |= ActiveEvents::CONTACT_FORCE_EVENTS;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn node(scene: &mut crate::scene::SceneGraph) -> NodeId {
        scene
            .add(crate::scene::SceneGraph::ROOT, Default::default())
            .unwrap()
    }

    #[test]
    fn purge_removes_entries_exactly_once() {
        let mut scene = crate::scene::SceneGraph::new();
        let n = node(&mut scene);
        let mut registry = HandleRegistry::new();
        let body = RigidBodyHandle::from_raw_parts(7, 1);
        let collider = ColliderHandle::from_raw_parts(2, 0);

        registry.insert_body(body, n, Subscription::default());
        registry.insert_collider(collider, n, Subscription::default());
        assert!(registry.contains_body(body));
        assert!(registry.contains_collider(collider));

        assert!(registry.purge_body(body));
        assert!(registry.purge_collider(collider));
        assert!(!registry.contains_body(body));
        assert!(registry.body_events(body).is_none());
        assert!(registry.collider_events(collider).is_none());

        // Second purge: nothing left, no panic.
        assert!(!registry.purge_body(body));
        assert!(!registry.purge_collider(collider));
    }

    #[test]
    fn reused_index_with_new_generation_is_a_distinct_key() {
        let mut scene = crate::scene::SceneGraph::new();
        let n = node(&mut scene);
        let mut registry = HandleRegistry::new();
        let old = RigidBodyHandle::from_raw_parts(0, 0);
        let new = RigidBodyHandle::from_raw_parts(0, 1);

        registry.insert_body(new, n, Subscription::default());
        assert!(!registry.contains_body(old));
        assert!(!registry.purge_body(old));
        assert!(registry.contains_body(new));
    }

    #[test]
    fn active_events_follow_collider_and_body_subscribers() {
        let none = Subscription::default();
        let enter = Subscription::new(EventBundle::new().on_collision_enter(|_| {}));
        let force = Subscription::new(EventBundle::new().on_contact_force(|_| {}));

        assert_eq!(active_events_for(None, None), ActiveEvents::empty());
        assert_eq!(active_events_for(Some(&none), None), ActiveEvents::empty());
        assert_eq!(
            active_events_for(Some(&enter), None),
            ActiveEvents::COLLISION_EVENTS
        );
        assert_eq!(
            active_events_for(Some(&none), Some(&force)),
            ActiveEvents::CONTACT_FORCE_EVENTS
        );
        assert_eq!(
            active_events_for(Some(&enter), Some(&force)),
            ActiveEvents::COLLISION_EVENTS | ActiveEvents::CONTACT_FORCE_EVENTS
        );
    }

    #[test]
    fn replaced_bundle_is_seen_through_existing_clones() {
        let hits = Rc::new(Cell::new(0));
        let sub = Subscription::new(EventBundle::new());
        let held_by_registry = sub.clone();

        let h = hits.clone();
        sub.replace(EventBundle::new().on_collision_exit(move |_| h.set(h.get() + 1)));

        assert!(held_by_registry.ptr_eq(&sub));
        assert!(held_by_registry.wants_collisions());
        assert!(held_by_registry.current().on_collision_enter.is_none());
        assert!(held_by_registry.current().on_collision_exit.is_some());
    }
}
