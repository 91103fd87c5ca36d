//! Fixed-step simulation driver.
//!
//! [`Simulation`] owns the world, the handle registry and the transform cache of one simulation
//! scope. Render frames hand it their elapsed time through [`Simulation::advance`]; it converts
//! that into a whole number of fixed engine steps and writes interpolated poses back to the scene.
//!
//! Per sub-step
//! 1. pre-step hooks (character controllers live here), in registration order
//! 2. snapshot the previous pose of every moving registered body
//! 3. one engine step
//! 4. post-step hooks
//! 5. event drain
//!
//! Notes
//! - Until [`Simulation::initialize`] has run, `advance` steps nothing and mounting fails with
//!   [`PhysicsError::NotReady`].
//! - Fixed and sleeping bodies are never written back; their scene transform is authoritative.
//! - Hooks receive the world only. Registry changes requested by callbacks must be deferred until
//!   `advance` returns.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rapier3d::prelude::*;

use crate::builders::{ColliderDesc, RigidBodyDesc, spherical_joint};
use crate::constants::{FIXED_STEP, MAX_FRAME_DELTA};
use crate::error::{PhysicsError, Result};
use crate::events::EventDispatcher;
use crate::registry::{EventBundle, HandleRegistry, Subscription};
use crate::scene::{NodeId, SceneGraph};
use crate::settings::WorldSettings;
use crate::transform::{TransformSync, correction_for, decompose, interpolate};
use crate::world::PhysicsWorld;

/// Callback run once per fixed step with the step length.
pub type StepHook = Rc<RefCell<dyn FnMut(&mut PhysicsWorld, Real)>>;

/// Wrap a closure as a [`StepHook`].
pub fn step_hook(f: impl FnMut(&mut PhysicsWorld, Real) + 'static) -> StepHook {
    Rc::new(RefCell::new(f))
}

/// Outcome of one [`Simulation::advance`] call.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StepReport {
    /// Engine steps executed during the call.
    pub steps: u32,
    /// Leftover fraction of a step, in `[0, 1)`.
    pub alpha: f64,
}

pub struct Simulation {
    settings: WorldSettings,
    world: Option<PhysicsWorld>,
    registry: HandleRegistry,
    sync: TransformSync,
    dispatcher: EventDispatcher,
    pre_step: Vec<StepHook>,
    post_step: Vec<StepHook>,
    previous: HashMap<RigidBodyHandle, Isometry<Real>>,
    accumulator: f64,
    alpha: f64,
}

impl Simulation {
    pub fn new(settings: WorldSettings) -> Self {
        Self {
            settings,
            world: None,
            registry: HandleRegistry::new(),
            sync: TransformSync::new(),
            dispatcher: EventDispatcher::new(),
            pre_step: Vec::new(),
            post_step: Vec::new(),
            previous: HashMap::new(),
            accumulator: 0.0,
            alpha: 0.0,
        }
    }

    /// Build the world. Calling it again on a ready simulation does nothing.
    pub fn initialize(&mut self) -> Result<()> {
        if self.world.is_some() {
            return Ok(());
        }
        self.settings.validate()?;
        self.world = Some(PhysicsWorld::new(self.settings.gravity_vector()));
        log::debug!("physics world initialized, gravity {:?}", self.settings.gravity);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.world.is_some()
    }

    /// Tear the scope down: the world, every registry entry, cached pose and hook.
    pub fn shutdown(&mut self) {
        if let Some(world) = self.world.take() {
            log::debug!("physics world shut down: {world:?}");
        }
        self.registry.clear();
        self.sync.clear();
        self.previous.clear();
        self.pre_step.clear();
        self.post_step.clear();
        self.accumulator = 0.0;
        self.alpha = 0.0;
    }

    pub fn world(&self) -> Option<&PhysicsWorld> {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> Option<&mut PhysicsWorld> {
        self.world.as_mut()
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Change gravity now and for any later re-initialization.
    pub fn set_gravity(&mut self, gravity: Vector<Real>) {
        self.settings.gravity = [gravity.x, gravity.y, gravity.z];
        if let Some(world) = self.world.as_mut() {
            world.set_gravity(gravity);
        }
    }

    /// Create a body at the node's current world pose.
    pub fn mount_body(
        &mut self,
        scene: &SceneGraph,
        node: NodeId,
        desc: &RigidBodyDesc,
    ) -> Result<RigidBodyHandle> {
        let world = self.world.as_mut().ok_or(PhysicsError::NotReady)?;

        let pose = decompose(&scene.world_matrix(node)?);
        let correction = correction_for(scene, node)?;

        let handle = world.insert_body(desc.build(pose.translation, pose.rotation));
        self.sync.insert(handle, correction);
        self.registry.insert_body(handle, node, Subscription::default());

        log::debug!("mounted {:?} body {handle:?} on {node:?}", desc.kind);
        Ok(handle)
    }

    /// Create a collider sized by the node's world scale.
    ///
    /// With a `parent`, the collider is posed relative to that body so the node's world pose is
    /// preserved. Without one, it is freestanding at the node's world pose.
    pub fn mount_collider(
        &mut self,
        scene: &SceneGraph,
        node: NodeId,
        desc: &ColliderDesc,
        parent: Option<RigidBodyHandle>,
    ) -> Result<ColliderHandle> {
        let world = self.world.as_mut().ok_or(PhysicsError::NotReady)?;

        let pose = decompose(&scene.world_matrix(node)?);
        let world_iso = pose.isometry();

        let (local, parent_events) = match parent {
            Some(body) => {
                let body_iso = world
                    .bodies
                    .get(body)
                    .ok_or(PhysicsError::UnknownBody)?
                    .position();
                (body_iso.inv_mul(&world_iso), self.registry.body_events(body))
            }
            None => (world_iso, None),
        };

        let active_events = crate::registry::active_events_for(None, parent_events);
        let collider = desc.build(
            &pose.scale,
            local.translation.vector,
            local.rotation,
            active_events,
        )?;

        let handle = world.insert_collider(collider, parent);
        self.registry.insert_collider(handle, node, Subscription::default());

        log::debug!("mounted collider {handle:?} on {node:?} (parent {parent:?})");
        Ok(handle)
    }

    /// Remove a body, the colliders attached to it and their registry entries.
    ///
    /// Returns `false` when there was nothing left to remove.
    pub fn unmount_body(&mut self, handle: RigidBodyHandle) -> bool {
        let attached: Vec<ColliderHandle> = self
            .world
            .as_ref()
            .and_then(|w| w.bodies.get(handle))
            .map(|b| b.colliders().to_vec())
            .unwrap_or_default();

        let mut removed = self.registry.purge_body(handle);
        for collider in attached {
            removed |= self.registry.purge_collider(collider);
        }
        self.sync.forget(handle);
        self.previous.remove(&handle);

        if let Some(world) = self.world.as_mut() {
            removed |= world.remove_body(handle);
        }
        removed
    }

    pub fn unmount_collider(&mut self, handle: ColliderHandle) -> bool {
        let mut removed = self.registry.purge_collider(handle);
        if let Some(world) = self.world.as_mut() {
            removed |= world.remove_collider(handle);
        }
        removed
    }

    /// Replace the body's subscriber bundle and refresh its colliders' event masks.
    pub fn set_body_events(&mut self, handle: RigidBodyHandle, bundle: EventBundle) -> bool {
        let Some(subscription) = self.registry.body_events(handle) else {
            return false;
        };
        subscription.replace(bundle);

        let Some(world) = self.world.as_mut() else {
            return true;
        };
        let attached: Vec<ColliderHandle> = world
            .bodies
            .get(handle)
            .map(|b| b.colliders().to_vec())
            .unwrap_or_default();
        for collider in attached {
            let flags = self.registry.active_events(collider, Some(handle));
            if let Some(c) = world.colliders.get_mut(collider) {
                c.set_active_events(flags);
            }
        }
        true
    }

    /// Replace the collider's subscriber bundle and refresh its event mask.
    pub fn set_collider_events(&mut self, handle: ColliderHandle, bundle: EventBundle) -> bool {
        let Some(subscription) = self.registry.collider_events(handle) else {
            return false;
        };
        subscription.replace(bundle);

        let Some(world) = self.world.as_mut() else {
            return true;
        };
        let flags = self
            .registry
            .active_events(handle, world.collider_parent(handle));
        if let Some(c) = world.colliders.get_mut(handle) {
            c.set_active_events(flags);
        }
        true
    }

    /// Ball-and-socket joint between two live bodies, anchors in each body's local frame.
    pub fn mount_spherical_joint(
        &mut self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        anchor1: Point<Real>,
        anchor2: Point<Real>,
    ) -> Result<ImpulseJointHandle> {
        let world = self.world.as_mut().ok_or(PhysicsError::NotReady)?;
        if !world.is_body_live(body1) || !world.is_body_live(body2) {
            return Err(PhysicsError::UnknownBody);
        }
        Ok(world.insert_joint(body1, body2, spherical_joint(anchor1, anchor2)))
    }

    pub fn unmount_joint(&mut self, handle: ImpulseJointHandle) -> bool {
        match self.world.as_mut() {
            Some(world) => world.remove_joint(handle),
            None => false,
        }
    }

    /// Register a hook run before every engine step. Returns `false` if it is already registered.
    pub fn add_pre_step(&mut self, hook: StepHook) -> bool {
        add_hook(&mut self.pre_step, hook)
    }

    /// Register a hook run after every engine step. Returns `false` if it is already registered.
    pub fn add_post_step(&mut self, hook: StepHook) -> bool {
        add_hook(&mut self.post_step, hook)
    }

    pub fn remove_pre_step(&mut self, hook: &StepHook) -> bool {
        remove_hook(&mut self.pre_step, hook)
    }

    pub fn remove_post_step(&mut self, hook: &StepHook) -> bool {
        remove_hook(&mut self.post_step, hook)
    }

    /// Consume `frame_delta` seconds of render time.
    pub fn advance(&mut self, scene: &mut SceneGraph, frame_delta: f64) -> StepReport {
        let Some(world) = self.world.as_mut() else {
            log::trace!("advance before initialize, nothing to step");
            return StepReport::default();
        };

        let delta = if !frame_delta.is_finite() || frame_delta < 0.0 {
            0.0
        } else if frame_delta > MAX_FRAME_DELTA {
            log::warn!("frame delta {frame_delta:.3}s clamped to {MAX_FRAME_DELTA}s");
            MAX_FRAME_DELTA
        } else {
            frame_delta
        };

        self.accumulator += delta;
        let dt = FIXED_STEP as Real;
        let mut steps = 0;

        while self.accumulator >= FIXED_STEP {
            run_hooks(&self.pre_step, world, dt);

            self.previous.clear();
            for (handle, _) in self.registry.bodies() {
                if world.is_body_moving(handle) {
                    self.previous.insert(handle, *world.bodies[handle].position());
                }
            }

            world.step();
            run_hooks(&self.post_step, world, dt);
            self.dispatcher.dispatch(world, &self.registry);

            self.accumulator -= FIXED_STEP;
            steps += 1;
        }

        self.alpha = (self.accumulator / FIXED_STEP).clamp(0.0, 1.0 - f64::EPSILON);

        for (handle, node) in self.registry.bodies() {
            if !world.is_body_moving(handle) {
                continue;
            }
            let (Some(previous), Some(body)) =
                (self.previous.get(&handle), world.bodies.get(handle))
            else {
                continue;
            };

            let pose = interpolate(previous, body.position(), self.alpha as Real);
            if let Err(err) = self.sync.write_back(scene, node, handle, &pose) {
                log::trace!("skipping write-back of {handle:?}: {err}");
            }
        }

        StepReport {
            steps,
            alpha: self.alpha,
        }
    }
}

fn add_hook(hooks: &mut Vec<StepHook>, hook: StepHook) -> bool {
    if hooks.iter().any(|h| Rc::ptr_eq(h, &hook)) {
        return false;
    }
    hooks.push(hook);
    true
}

fn remove_hook(hooks: &mut Vec<StepHook>, hook: &StepHook) -> bool {
    let before = hooks.len();
    hooks.retain(|h| !Rc::ptr_eq(h, hook));
    hooks.len() != before
}

fn run_hooks(hooks: &[StepHook], world: &mut PhysicsWorld, dt: Real) {
    for hook in hooks {
        let mut f = hook.borrow_mut();
        (*f)(world, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::builders::{BodyKind, ShapeDesc};
    use crate::scene::{LocalTransform, Quat, Vec3};

    fn ready(gravity: [f32; 3]) -> Simulation {
        let mut sim = Simulation::new(WorldSettings { gravity });
        sim.initialize().unwrap();
        sim
    }

    fn ball() -> ColliderDesc {
        ColliderDesc::new(ShapeDesc::Ball { radius: 0.5 })
    }

    #[test]
    fn nothing_happens_before_initialize() {
        let mut sim = Simulation::new(WorldSettings::default());
        let mut scene = SceneGraph::new();
        let node = scene.add(SceneGraph::ROOT, LocalTransform::default()).unwrap();

        assert!(!sim.is_ready());
        assert_eq!(sim.advance(&mut scene, 0.1).steps, 0);
        assert!(matches!(
            sim.mount_body(&scene, node, &RigidBodyDesc::default()),
            Err(PhysicsError::NotReady)
        ));

        sim.initialize().unwrap();
        assert!(sim.is_ready());
        assert!(sim.advance(&mut scene, 0.1).steps > 0);
    }

    #[test]
    fn step_count_does_not_depend_on_how_time_is_split() {
        let mut scene = SceneGraph::new();
        let mut a = ready([0.0, -9.81, 0.0]);
        let mut b = ready([0.0, -9.81, 0.0]);

        let steps_a: u32 = [0.17, 0.17, 0.17]
            .iter()
            .map(|d| a.advance(&mut scene, *d).steps)
            .sum();
        let steps_b: u32 = [0.013, 0.2, 0.1, 0.197]
            .iter()
            .map(|d| b.advance(&mut scene, *d).steps)
            .sum();

        let expected = (0.51 / FIXED_STEP).floor() as u32;
        assert_eq!(steps_a, expected);
        assert_eq!(steps_b, expected);
        assert!((a.accumulator() - b.accumulator()).abs() < 1.0e-9);
    }

    #[test]
    fn huge_frame_delta_is_clamped() {
        let mut scene = SceneGraph::new();
        let mut clamped = ready([0.0, -9.81, 0.0]);
        let mut reference = ready([0.0, -9.81, 0.0]);

        let big = clamped.advance(&mut scene, 10.0).steps;
        let max = reference.advance(&mut scene, MAX_FRAME_DELTA).steps;
        assert_eq!(big, max);
        assert!(big <= 15);
    }

    #[test]
    fn alpha_stays_below_one() {
        let mut scene = SceneGraph::new();
        let mut sim = ready([0.0, -9.81, 0.0]);

        for delta in [0.0, 0.001, FIXED_STEP, 0.0333, 0.25, 3.0, -1.0, f64::NAN, 0.016] {
            let report = sim.advance(&mut scene, delta);
            assert!((0.0..1.0).contains(&report.alpha), "alpha {}", report.alpha);
            assert_eq!(report.alpha, sim.alpha());
        }
    }

    #[test]
    fn hooks_run_around_each_step_and_are_not_registered_twice() {
        let mut scene = SceneGraph::new();
        let mut sim = ready([0.0, -9.81, 0.0]);
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();

        let pre_log = log.clone();
        let pre = step_hook(move |_, dt| {
            assert!((dt - FIXED_STEP as Real).abs() < 1.0e-9);
            pre_log.borrow_mut().push("pre");
        });
        let post_log = log.clone();
        let post = step_hook(move |_, _| post_log.borrow_mut().push("post"));

        assert!(sim.add_pre_step(pre.clone()));
        assert!(!sim.add_pre_step(pre.clone()));
        assert!(sim.add_post_step(post.clone()));

        let steps = sim.advance(&mut scene, 2.5 * FIXED_STEP).steps;
        assert_eq!(steps, 2);
        assert_eq!(*log.borrow(), vec!["pre", "post", "pre", "post"]);

        assert!(sim.remove_pre_step(&pre));
        assert!(!sim.remove_pre_step(&pre));
        log.borrow_mut().clear();
        sim.advance(&mut scene, FIXED_STEP);
        assert_eq!(*log.borrow(), vec!["post"]);
    }

    #[test]
    fn unmount_purges_registry_and_remount_is_registered() {
        let mut scene = SceneGraph::new();
        let mut sim = ready([0.0, -9.81, 0.0]);
        let node = scene
            .add(
                SceneGraph::ROOT,
                LocalTransform::from_translation(Vec3::new(0.0, 3.0, 0.0)),
            )
            .unwrap();

        let body = sim
            .mount_body(&scene, node, &RigidBodyDesc::default())
            .unwrap();
        let collider = sim.mount_collider(&scene, node, &ball(), Some(body)).unwrap();
        assert!(sim.registry().contains_body(body));
        assert!(sim.registry().contains_collider(collider));
        assert!(sim.sync.is_tracked(body));

        assert!(sim.unmount_body(body));
        assert!(!sim.sync.is_tracked(body));
        assert!(!sim.registry().contains_body(body));
        assert!(!sim.registry().contains_collider(collider));
        assert!(sim.registry().body_events(body).is_none());

        // Overlapping teardown: second call is a quiet no-op.
        assert!(!sim.unmount_body(body));
        assert!(!sim.unmount_collider(collider));
        assert_eq!(sim.registry().body_count(), 0);
        assert_eq!(sim.registry().collider_count(), 0);

        let again = sim
            .mount_body(&scene, node, &RigidBodyDesc::default())
            .unwrap();
        assert!(sim.registry().contains_body(again));
        assert_eq!(sim.registry().body_node(again), Some(node));
    }

    #[test]
    fn unmount_after_shutdown_is_harmless() {
        let mut scene = SceneGraph::new();
        let mut sim = ready([0.0, -9.81, 0.0]);
        let node = scene.add(SceneGraph::ROOT, LocalTransform::default()).unwrap();
        let body = sim
            .mount_body(&scene, node, &RigidBodyDesc::default())
            .unwrap();

        sim.shutdown();
        assert!(!sim.unmount_body(body));
        assert!(!sim.is_ready());
    }

    #[test]
    fn collider_is_sized_by_world_scale() {
        let mut scene = SceneGraph::new();
        let mut sim = ready([0.0, -9.81, 0.0]);
        let group = scene
            .add(
                SceneGraph::ROOT,
                LocalTransform::default().with_scale(Vec3::new(2.0, 2.0, 2.0)),
            )
            .unwrap();
        let node = scene.add(group, LocalTransform::default()).unwrap();

        let collider = sim.mount_collider(&scene, node, &ball(), None).unwrap();
        let world = sim.world().unwrap();
        let radius = world.colliders[collider].shape().as_ball().unwrap().radius;
        assert!((radius - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn nested_body_writes_parent_relative_pose() {
        let mut scene = SceneGraph::new();
        let mut sim = ready([0.0, 0.0, 0.0]);
        let group = scene
            .add(
                SceneGraph::ROOT,
                LocalTransform::from_translation(Vec3::new(5.0, 0.0, 0.0)),
            )
            .unwrap();
        let node = scene
            .add(group, LocalTransform::from_translation(Vec3::new(0.0, 1.0, 0.0)))
            .unwrap();

        let desc = RigidBodyDesc {
            linvel: vector![1.0, 0.0, 0.0],
            ..RigidBodyDesc::default()
        };
        let body = sim.mount_body(&scene, node, &desc).unwrap();
        sim.mount_collider(&scene, node, &ball(), Some(body)).unwrap();

        let world_x = sim.world().unwrap().bodies[body].translation().x;
        assert!((world_x - 5.0).abs() < 1.0e-6);

        // 6 steps with alpha 0.6: the rendered pose lags the engine by 0.4 of a step.
        let report = sim.advance(&mut scene, 0.11);
        assert_eq!(report.steps, 6);

        let shown = (report.steps as f64 - 1.0 + report.alpha) * FIXED_STEP;
        let local = scene.local(node).unwrap();
        assert!((local.translation.x as f64 - shown).abs() < 1.0e-3);
        assert!((local.translation.y - 1.0).abs() < 1.0e-4);
    }

    #[test]
    fn fixed_bodies_are_never_written_back() {
        let mut scene = SceneGraph::new();
        let mut sim = ready([0.0, -9.81, 0.0]);
        let node = scene.add(SceneGraph::ROOT, LocalTransform::default()).unwrap();
        sim.mount_body(&scene, node, &RigidBodyDesc::new(BodyKind::Fixed))
            .unwrap();

        // The scene may move a fixed body's node; the driver leaves it alone.
        scene
            .set_local_pose(node, Vec3::new(3.0, 0.0, 0.0), Quat::identity())
            .unwrap();
        sim.advance(&mut scene, 0.1);
        assert_eq!(scene.local(node).unwrap().translation, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn collision_enter_is_routed_during_advance() {
        let mut scene = SceneGraph::new();
        let mut sim = ready([0.0, -9.81, 0.0]);

        let floor = scene
            .add(
                SceneGraph::ROOT,
                LocalTransform::from_translation(Vec3::new(0.0, -0.5, 0.0)),
            )
            .unwrap();
        let floor_body = sim
            .mount_body(&scene, floor, &RigidBodyDesc::new(BodyKind::Fixed))
            .unwrap();
        let cuboid = ColliderDesc::new(ShapeDesc::Cuboid {
            half_extents: vector![10.0, 0.5, 10.0],
        });
        sim.mount_collider(&scene, floor, &cuboid, Some(floor_body))
            .unwrap();

        let node = scene
            .add(
                SceneGraph::ROOT,
                LocalTransform::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            )
            .unwrap();
        let body = sim
            .mount_body(&scene, node, &RigidBodyDesc::default())
            .unwrap();
        sim.mount_collider(&scene, node, &ball(), Some(body)).unwrap();

        let hits = Rc::new(Cell::new(0));
        let target = Rc::new(Cell::new(None));
        let (h, t) = (hits.clone(), target.clone());
        assert!(sim.set_body_events(
            body,
            EventBundle::new().on_collision_enter(move |p| {
                h.set(h.get() + 1);
                t.set(p.target.body_node);
            }),
        ));

        for _ in 0..60 {
            sim.advance(&mut scene, FIXED_STEP);
        }
        assert!(hits.get() >= 1);
        assert_eq!(target.get(), Some(floor));
    }

    #[test]
    fn resting_spheres_fall_asleep_on_the_floor() {
        const RADIUS: f32 = 0.5;
        let mut scene = SceneGraph::new();
        let mut sim = ready([0.0, -9.81, 0.0]);

        // Floor top face at y = 0.
        let floor = scene
            .add(
                SceneGraph::ROOT,
                LocalTransform::from_translation(Vec3::new(0.0, -0.5, 0.0)),
            )
            .unwrap();
        let floor_body = sim
            .mount_body(&scene, floor, &RigidBodyDesc::new(BodyKind::Fixed))
            .unwrap();
        let cuboid = ColliderDesc::new(ShapeDesc::Cuboid {
            half_extents: vector![30.0, 0.5, 30.0],
        });
        sim.mount_collider(&scene, floor, &cuboid, Some(floor_body))
            .unwrap();

        let mut spheres = Vec::new();
        for i in 0..10 {
            let node = scene
                .add(
                    SceneGraph::ROOT,
                    LocalTransform::from_translation(Vec3::new(i as f32 * 2.0 - 9.0, 1.0, 0.0)),
                )
                .unwrap();
            let body = sim
                .mount_body(&scene, node, &RigidBodyDesc::default())
                .unwrap();
            let desc = ColliderDesc::new(ShapeDesc::Ball { radius: RADIUS });
            sim.mount_collider(&scene, node, &desc, Some(body)).unwrap();
            spheres.push(body);
        }

        // 5 simulated seconds.
        let mut steps = 0;
        while steps < 300 {
            steps += sim.advance(&mut scene, FIXED_STEP).steps;
        }

        let world = sim.world().unwrap();
        for handle in spheres {
            let body = &world.bodies[handle];
            assert!(body.is_sleeping(), "{handle:?} still awake");
            let y = body.translation().y;
            assert!((y - RADIUS).abs() < RADIUS, "{handle:?} resting at y = {y}");
        }
    }
}
