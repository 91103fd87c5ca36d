//! Ownership of the Rapier simulation state.
//!
//! [`PhysicsWorld`] bundles every Rapier set and pipeline needed to step a dynamic world, plus the
//! channel-backed event collector whose queues are drained once per step.
//!
//! Notes
//! - The timestep is fixed at construction ([`FIXED_STEP`]); variable frame time is handled by the
//!   driver, never here.
//! - Removal helpers check liveness first. A body that was already freed (bulk teardown, or its
//!   parent scope going away) is skipped and reported with `false`.

use std::sync::mpsc::{Receiver, channel};

use rapier3d::prelude::*;

use crate::constants::FIXED_STEP;

pub struct PhysicsWorld {
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub impulse_joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub islands: IslandManager,
    pub broad_phase: BroadPhaseBvh,
    pub narrow_phase: NarrowPhase,
    pub ccd_solver: CCDSolver,
    pub integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    event_collector: ChannelEventCollector,
    collision_recv: Receiver<CollisionEvent>,
    contact_force_recv: Receiver<ContactForceEvent>,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector<Real>) -> Self {
        let (collision_send, collision_recv) = channel();
        let (contact_force_send, contact_force_recv) = channel();

        let integration_parameters = IntegrationParameters {
            dt: FIXED_STEP as Real,
            ..IntegrationParameters::default()
        };

        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            gravity,
            event_collector: ChannelEventCollector::new(collision_send, contact_force_send),
            collision_recv,
            contact_force_recv,
        }
    }

    pub fn gravity(&self) -> Vector<Real> {
        self.gravity
    }

    /// Takes effect on the next [`step`](Self::step).
    pub fn set_gravity(&mut self, gravity: Vector<Real>) {
        self.gravity = gravity;
    }

    pub fn timestep(&self) -> Real {
        self.integration_parameters.dt
    }

    /// Advance the engine by exactly one fixed step. Events are queued, not dispatched.
    pub fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &self.event_collector,
        );
    }

    pub fn is_body_live(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some()
    }

    pub fn is_collider_live(&self, handle: ColliderHandle) -> bool {
        self.colliders.get(handle).is_some()
    }

    pub fn is_joint_live(&self, handle: ImpulseJointHandle) -> bool {
        self.impulse_joints.get(handle).is_some()
    }

    pub fn insert_body(&mut self, body: RigidBody) -> RigidBodyHandle {
        self.bodies.insert(body)
    }

    /// Insert a collider, attached to `parent` when given and still live.
    pub fn insert_collider(
        &mut self,
        collider: Collider,
        parent: Option<RigidBodyHandle>,
    ) -> ColliderHandle {
        match parent {
            Some(body) if self.is_body_live(body) => {
                self.colliders.insert_with_parent(collider, body, &mut self.bodies)
            }
            _ => self.colliders.insert(collider),
        }
    }

    pub fn insert_joint(
        &mut self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        joint: impl Into<GenericJoint>,
    ) -> ImpulseJointHandle {
        self.impulse_joints.insert(body1, body2, joint, true)
    }

    /// Remove a body along with its attached colliders and joints.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        if !self.is_body_live(handle) {
            log::debug!("body {handle:?} already removed, skipping");
            return false;
        }
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    pub fn remove_collider(&mut self, handle: ColliderHandle) -> bool {
        if !self.is_collider_live(handle) {
            log::debug!("collider {handle:?} already removed, skipping");
            return false;
        }
        self.colliders
            .remove(handle, &mut self.islands, &mut self.bodies, true)
            .is_some()
    }

    pub fn remove_joint(&mut self, handle: ImpulseJointHandle) -> bool {
        if !self.is_joint_live(handle) {
            log::debug!("joint {handle:?} already removed, skipping");
            return false;
        }
        self.impulse_joints.remove(handle, true).is_some()
    }

    /// The body a collider is attached to, as the engine currently reports it.
    pub fn collider_parent(&self, handle: ColliderHandle) -> Option<RigidBodyHandle> {
        self.colliders.get(handle).and_then(|c| c.parent())
    }

    /// Whether the body's visual transform should follow the simulation this frame.
    pub fn is_body_moving(&self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .get(handle)
            .is_some_and(|b| !b.is_fixed() && !b.is_sleeping())
    }

    /// Borrowed pipeline for scene queries.
    pub fn query_pipeline<'a>(&'a self, filter: QueryFilter<'a>) -> QueryPipeline<'a> {
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        )
    }

    /// Mutable pipeline, needed to push dynamic bodies out of a character's way.
    pub fn query_pipeline_mut<'a>(&'a mut self, filter: QueryFilter<'a>) -> QueryPipelineMut<'a> {
        self.broad_phase.as_query_pipeline_mut(
            self.narrow_phase.query_dispatcher(),
            &mut self.bodies,
            &mut self.colliders,
            filter,
        )
    }

    pub fn drain_collision_events(&self) -> Vec<CollisionEvent> {
        self.collision_recv.try_iter().collect()
    }

    pub fn drain_contact_force_events(&self) -> Vec<ContactForceEvent> {
        self.contact_force_recv.try_iter().collect()
    }
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .field("joints", &self.impulse_joints.len())
            .finish()
    }
}
