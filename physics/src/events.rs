//! Routing of drained engine events to collider- and body-level subscribers.
//!
//! Once per completed step the dispatcher drains both event queues of the [`PhysicsWorld`] and,
//! for every event, resolves both colliders to a [`Source`] (scene nodes plus subscriptions).
//! Resolution is lazy and memoized for the duration of one drain, so a collider that shows up in
//! many pairs is looked up once.
//!
//! Notes
//! - A collider's parent body is asked of the engine, not cached, since parentage can change.
//! - Handlers on one side are skipped when the other side has no scene node any more.
//! - Handles without subscribers are dropped silently; that is most of the traffic.

use std::collections::HashMap;

use rapier3d::prelude::{ColliderHandle, ContactForceEvent, Real, RigidBodyHandle, Vector};

use crate::registry::{CollisionCallback, EventBundle, HandleRegistry, Subscription};
use crate::scene::NodeId;
use crate::world::PhysicsWorld;

/// One side of a contact pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Source {
    pub collider: ColliderHandle,
    pub collider_node: Option<NodeId>,
    pub body: Option<RigidBodyHandle>,
    pub body_node: Option<NodeId>,
}

impl Source {
    /// Whether any scene node still represents this side.
    pub fn is_mounted(&self) -> bool {
        self.collider_node.is_some() || self.body_node.is_some()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionPayload {
    pub this: Source,
    pub target: Source,
    /// Either collider is a sensor.
    pub sensor: bool,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactForcePayload {
    pub this: Source,
    pub target: Source,
    pub total_force: Vector<Real>,
    pub total_force_magnitude: Real,
    pub max_force_direction: Vector<Real>,
    pub max_force_magnitude: Real,
}

#[derive(Clone)]
struct Resolved {
    source: Source,
    collider_events: Option<Subscription>,
    body_events: Option<Subscription>,
}

impl Resolved {
    /// Subscriber bundles, collider first then body, cloned out of their cells.
    fn bundles(&self) -> impl Iterator<Item = EventBundle> + '_ {
        [self.collider_events.as_ref(), self.body_events.as_ref()]
            .into_iter()
            .flatten()
            .map(Subscription::current)
    }
}

/// Counters from one [`EventDispatcher::dispatch`] call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub collision_events: usize,
    pub contact_force_events: usize,
    pub callbacks: usize,
}

#[derive(Debug, Default)]
pub struct EventDispatcher;

impl EventDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Drain both queues of `world` and invoke the interested subscribers.
    pub fn dispatch(&self, world: &PhysicsWorld, registry: &HandleRegistry) -> DispatchReport {
        let mut memo: HashMap<ColliderHandle, Resolved> = HashMap::new();
        let mut report = DispatchReport::default();

        for event in world.drain_collision_events() {
            report.collision_events += 1;
            let a = resolve(&mut memo, world, registry, event.collider1());
            let b = resolve(&mut memo, world, registry, event.collider2());
            let sensor = event.sensor();

            report.callbacks += if event.started() {
                collision_side(&a, &b, sensor, |e| e.on_collision_enter.clone())
                    + collision_side(&b, &a, sensor, |e| e.on_collision_enter.clone())
            } else {
                collision_side(&a, &b, sensor, |e| e.on_collision_exit.clone())
                    + collision_side(&b, &a, sensor, |e| e.on_collision_exit.clone())
            };
        }

        for event in world.drain_contact_force_events() {
            report.contact_force_events += 1;
            let a = resolve(&mut memo, world, registry, event.collider1);
            let b = resolve(&mut memo, world, registry, event.collider2);

            report.callbacks += force_side(&a, &b, &event) + force_side(&b, &a, &event);
        }

        if report.callbacks == 0 && report.collision_events + report.contact_force_events > 0 {
            log::trace!(
                "dropped {} collision and {} contact-force events without subscribers",
                report.collision_events,
                report.contact_force_events
            );
        }

        report
    }
}

fn resolve(
    memo: &mut HashMap<ColliderHandle, Resolved>,
    world: &PhysicsWorld,
    registry: &HandleRegistry,
    collider: ColliderHandle,
) -> Resolved {
    memo.entry(collider)
        .or_insert_with(|| {
            let body = world.collider_parent(collider);
            Resolved {
                source: Source {
                    collider,
                    collider_node: registry.collider_node(collider),
                    body,
                    body_node: body.and_then(|b| registry.body_node(b)),
                },
                collider_events: registry.collider_events(collider).cloned(),
                body_events: body.and_then(|b| registry.body_events(b)).cloned(),
            }
        })
        .clone()
}

fn collision_side(
    this: &Resolved,
    target: &Resolved,
    sensor: bool,
    pick: impl Fn(&EventBundle) -> Option<CollisionCallback>,
) -> usize {
    if !target.source.is_mounted() {
        return 0;
    }

    let payload = CollisionPayload {
        this: this.source,
        target: target.source,
        sensor,
    };

    let mut calls = 0;
    for bundle in this.bundles() {
        if let Some(callback) = pick(&bundle) {
            callback(&payload);
            calls += 1;
        }
    }
    calls
}

fn force_side(this: &Resolved, target: &Resolved, event: &ContactForceEvent) -> usize {
    if !target.source.is_mounted() {
        return 0;
    }

    let payload = ContactForcePayload {
        this: this.source,
        target: target.source,
        total_force: event.total_force,
        total_force_magnitude: event.total_force_magnitude,
        max_force_direction: event.max_force_direction,
        max_force_magnitude: event.max_force_magnitude,
    };

    let mut calls = 0;
    for bundle in this.bundles() {
        if let Some(callback) = bundle.on_contact_force {
            callback(&payload);
            calls += 1;
        }
    }
    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use rapier3d::prelude::*;

    use crate::scene::{LocalTransform, SceneGraph};

    struct Pair {
        world: PhysicsWorld,
        registry: HandleRegistry,
        a: ColliderHandle,
        b: ColliderHandle,
        node_a: NodeId,
        node_b: NodeId,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
    }

    /// Ball `a` dropped onto a fixed box `b`, with both colliders registered.
    fn dropping_pair(a_events: EventBundle) -> Pair {
        let mut scene = SceneGraph::new();
        let node_a = scene.add(SceneGraph::ROOT, LocalTransform::default()).unwrap();
        let node_b = scene.add(SceneGraph::ROOT, LocalTransform::default()).unwrap();

        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0]);
        let mut registry = HandleRegistry::new();

        let body_b = world.insert_body(RigidBodyBuilder::fixed().build());
        let b = world.insert_collider(
            ColliderBuilder::cuboid(5.0, 0.5, 5.0).build(),
            Some(body_b),
        );
        registry.insert_body(body_b, node_b, Subscription::default());
        registry.insert_collider(b, node_b, Subscription::default());

        let body_a = world.insert_body(
            RigidBodyBuilder::dynamic()
                .translation(vector![0.0, 1.2, 0.0])
                .build(),
        );
        let a_sub = Subscription::new(a_events);
        let a = world.insert_collider(
            ColliderBuilder::ball(0.5)
                .active_events(crate::registry::active_events_for(Some(&a_sub), None))
                .build(),
            Some(body_a),
        );
        registry.insert_collider(a, node_a, a_sub);

        Pair {
            world,
            registry,
            a,
            b,
            node_a,
            node_b,
            body_a,
            body_b,
        }
    }

    fn run_until_events(pair: &mut Pair, dispatcher: &EventDispatcher) -> DispatchReport {
        for _ in 0..120 {
            pair.world.step();
            let report = dispatcher.dispatch(&pair.world, &pair.registry);
            if report.collision_events > 0 {
                return report;
            }
        }
        DispatchReport::default()
    }

    #[test]
    fn enter_reaches_subscriber_once_with_other_node_as_target() {
        let seen: Rc<RefCell<Vec<CollisionPayload>>> = Rc::default();
        let sink = seen.clone();
        let mut pair = dropping_pair(
            EventBundle::new().on_collision_enter(move |p| sink.borrow_mut().push(*p)),
        );

        let report = run_until_events(&mut pair, &EventDispatcher::new());
        assert_eq!(report.collision_events, 1);
        assert_eq!(report.callbacks, 1);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].this.collider, pair.a);
        assert_eq!(seen[0].this.collider_node, Some(pair.node_a));
        assert_eq!(seen[0].target.collider, pair.b);
        assert_eq!(seen[0].target.collider_node, Some(pair.node_b));
        assert_eq!(seen[0].target.body, Some(pair.body_b));
        assert_eq!(seen[0].target.body_node, Some(pair.node_b));
        assert!(!seen[0].sensor);
    }

    #[test]
    fn unmounted_target_skips_handlers() {
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        let mut pair =
            dropping_pair(EventBundle::new().on_collision_enter(move |_| *h.borrow_mut() += 1));
        pair.registry.purge_collider(pair.b);
        pair.registry.purge_body(pair.body_b);

        let report = run_until_events(&mut pair, &EventDispatcher::new());
        assert_eq!(report.collision_events, 1);
        assert_eq!(report.callbacks, 0);
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn callback_replaced_before_drain_is_the_one_invoked() {
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();
        let old = log.clone();
        let mut pair = dropping_pair(
            EventBundle::new().on_collision_enter(move |_| old.borrow_mut().push("old")),
        );

        let new = log.clone();
        pair.registry
            .collider_events(pair.a)
            .unwrap()
            .replace(EventBundle::new().on_collision_enter(move |_| new.borrow_mut().push("new")));

        run_until_events(&mut pair, &EventDispatcher::new());
        assert_eq!(*log.borrow(), vec!["new"]);
    }

    #[test]
    fn resolution_is_memoized_per_drain() {
        let pair = dropping_pair(EventBundle::new());
        let mut memo = HashMap::new();

        let first = resolve(&mut memo, &pair.world, &pair.registry, pair.b);
        let second = resolve(&mut memo, &pair.world, &pair.registry, pair.b);
        assert_eq!(memo.len(), 1);
        assert_eq!(first.source, second.source);
        assert_eq!(first.source.body, Some(pair.body_b));
    }

    #[test]
    fn contact_forces_reach_subscriber_with_both_sources() {
        let seen: Rc<RefCell<Vec<ContactForcePayload>>> = Rc::default();
        let sink = seen.clone();
        let mut pair =
            dropping_pair(EventBundle::new().on_contact_force(move |p| sink.borrow_mut().push(*p)));
        let dispatcher = EventDispatcher::new();

        let mut forces = 0;
        for _ in 0..120 {
            pair.world.step();
            forces += dispatcher.dispatch(&pair.world, &pair.registry).contact_force_events;
        }
        assert!(forces > 0);

        let seen = seen.borrow();
        assert_eq!(seen.len(), forces);
        let first = &seen[0];
        assert_eq!(first.this.collider, pair.a);
        assert_eq!(first.this.collider_node, Some(pair.node_a));
        assert_eq!(first.target.collider, pair.b);
        assert_eq!(first.target.body_node, Some(pair.node_b));
        assert!(first.total_force_magnitude > 0.0);
    }

    #[test]
    fn exit_fires_once_per_separation() {
        let enters = Rc::new(RefCell::new(0));
        let exits: Rc<RefCell<Vec<CollisionPayload>>> = Rc::default();
        let (en, ex) = (enters.clone(), exits.clone());
        let mut pair = dropping_pair(
            EventBundle::new()
                .on_collision_enter(move |_| *en.borrow_mut() += 1)
                .on_collision_exit(move |p| ex.borrow_mut().push(*p)),
        );
        let dispatcher = EventDispatcher::new();
        run_until_events(&mut pair, &dispatcher);
        assert_eq!(*enters.borrow(), 1);

        // Lift the ball well clear of the box and hold it there.
        pair.world.set_gravity(vector![0.0, 0.0, 0.0]);
        let ball = &mut pair.world.bodies[pair.body_a];
        ball.set_translation(vector![0.0, 5.0, 0.0], true);
        ball.set_linvel(vector![0.0, 0.0, 0.0], true);
        for _ in 0..30 {
            pair.world.step();
            dispatcher.dispatch(&pair.world, &pair.registry);
        }

        let exits = exits.borrow();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].this.collider, pair.a);
        assert_eq!(exits[0].target.collider_node, Some(pair.node_b));
        assert_eq!(*enters.borrow(), 1);
    }

    #[test]
    fn collider_bundle_runs_before_body_bundle() {
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();
        let from_collider = log.clone();
        let mut pair = dropping_pair(
            EventBundle::new()
                .on_collision_enter(move |_| from_collider.borrow_mut().push("collider")),
        );
        let from_body = log.clone();
        pair.registry.insert_body(
            pair.body_a,
            pair.node_a,
            Subscription::new(
                EventBundle::new().on_collision_enter(move |_| from_body.borrow_mut().push("body")),
            ),
        );

        let report = run_until_events(&mut pair, &EventDispatcher::new());
        assert_eq!(report.collision_events, 1);
        assert_eq!(report.callbacks, 2);
        assert_eq!(*log.borrow(), vec!["collider", "body"]);
    }
}
