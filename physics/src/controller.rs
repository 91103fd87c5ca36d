//! Kinematic character controller driven by polled input.
//!
//! One [`CharacterController`] moves one kinematic-position body. Each fixed step it polls its
//! [`InputSource`], integrates vertical velocity, asks Rapier's `KinematicCharacterController` for
//! the largest non-penetrating displacement and commits it as the body's next kinematic
//! translation.
//!
//! Notes
//! - Grounded/airborne flips on every step the resolver reports a change (no hysteresis).
//! - Missing input or a detached/removed body make the step a no-op.
//! - Movement intent maps `x` to world X and `y` to world Z.

use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::Vector2;
use rapier3d::control::{CharacterCollision, KinematicCharacterController};
use rapier3d::prelude::*;

use crate::driver::{StepHook, step_hook};
use crate::error::Result;
use crate::settings::ControllerSettings;
use crate::world::PhysicsWorld;

/// Input state sampled once per fixed step.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct InputSnapshot {
    /// Planar intent, length at most 1.
    pub movement: Vector2<Real>,
    pub jump: bool,
    pub sprint: bool,
    pub pointer_locked: bool,
}

/// Anything the controller can poll for input.
pub trait InputSource {
    /// `None` while no input is available yet.
    fn poll(&self) -> Option<InputSnapshot>;
}

/// Input source whose snapshot is set by the owner (scripts, tests, replays).
#[derive(Debug, Default)]
pub struct ScriptedInput {
    slot: RefCell<Option<InputSnapshot>>,
}

impl ScriptedInput {
    pub fn new(snapshot: InputSnapshot) -> Self {
        Self {
            slot: RefCell::new(Some(snapshot)),
        }
    }

    pub fn set(&self, snapshot: InputSnapshot) {
        *self.slot.borrow_mut() = Some(snapshot);
    }

    pub fn clear(&self) {
        *self.slot.borrow_mut() = None;
    }
}

impl InputSource for ScriptedInput {
    fn poll(&self) -> Option<InputSnapshot> {
        *self.slot.borrow()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum GroundState {
    Grounded,
    #[default]
    Airborne,
}

/// Initial upward speed reaching `jump_height` under `gravity` (negative is down).
pub fn jump_velocity(jump_height: Real, gravity: Real) -> Real {
    (jump_height * -2.0 * gravity).max(0.0).sqrt()
}

/// Vertical velocity for the coming step.
pub fn next_vertical_velocity(
    current: Real,
    grounded: bool,
    jump: bool,
    jump_height: Real,
    gravity: Real,
    dt: Real,
) -> Real {
    let mut velocity = current;
    if grounded && velocity < 0.0 {
        velocity = 0.0;
    }

    if grounded && jump {
        jump_velocity(jump_height, gravity)
    } else {
        velocity + gravity * dt
    }
}

/// Planar displacement for one step of `dt` seconds.
pub fn horizontal_displacement(
    movement: Vector2<Real>,
    sprint: bool,
    settings: &ControllerSettings,
    dt: Real,
) -> Vector<Real> {
    let intent = if movement.norm_squared() > 1.0 {
        movement.normalize()
    } else {
        movement
    };
    let speed = if sprint {
        settings.sprint_speed
    } else {
        settings.walk_speed
    };
    vector![intent.x, 0.0, intent.y] * speed * dt
}

pub struct CharacterController {
    settings: ControllerSettings,
    kcc: KinematicCharacterController,
    input: Rc<dyn InputSource>,
    body: Option<RigidBodyHandle>,
    state: GroundState,
    vertical_velocity: Real,
    collisions: Vec<CharacterCollision>,
}

impl CharacterController {
    pub fn new(settings: ControllerSettings, input: Rc<dyn InputSource>) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            kcc: settings.to_rapier(),
            settings,
            input,
            body: None,
            state: GroundState::default(),
            vertical_velocity: 0.0,
            collisions: Vec::new(),
        })
    }

    /// Drive `body`, which should be kinematic-position based with exactly one collider.
    pub fn attach(&mut self, body: RigidBodyHandle) {
        self.body = Some(body);
        self.state = GroundState::Airborne;
        self.vertical_velocity = 0.0;
    }

    pub fn detach(&mut self) -> Option<RigidBodyHandle> {
        self.body.take()
    }

    pub fn body(&self) -> Option<RigidBodyHandle> {
        self.body
    }

    pub fn state(&self) -> GroundState {
        self.state
    }

    pub fn vertical_velocity(&self) -> Real {
        self.vertical_velocity
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Resolve and commit one fixed step of movement.
    pub fn step(&mut self, world: &mut PhysicsWorld, dt: Real) {
        let Some(body) = self.body else {
            return;
        };
        let Some(input) = self.input.poll() else {
            return;
        };
        let Some(collider) = world
            .bodies
            .get(body)
            .and_then(|b| b.colliders().first().copied())
        else {
            log::trace!("controlled body {body:?} has no collider yet");
            return;
        };
        let Some((shape, shape_pos)) = world
            .colliders
            .get(collider)
            .map(|c| (c.shared_shape().clone(), *c.position()))
        else {
            return;
        };

        let gravity = world.gravity().y;
        self.vertical_velocity = next_vertical_velocity(
            self.vertical_velocity,
            self.state == GroundState::Grounded,
            input.jump,
            self.settings.jump_height,
            gravity,
            dt,
        );

        let desired = horizontal_displacement(input.movement, input.sprint, &self.settings, dt)
            + vector![0.0, self.vertical_velocity * dt, 0.0];

        let filter = QueryFilter::default()
            .exclude_rigid_body(body)
            .exclude_sensors();

        self.collisions.clear();
        let collisions = &mut self.collisions;
        let movement = if self.settings.apply_impulses {
            let mut queries = world.query_pipeline_mut(filter);
            let movement = self.kcc.move_shape(
                dt,
                &queries.as_ref(),
                &*shape,
                &shape_pos,
                desired,
                |c| collisions.push(c),
            );
            self.kcc.solve_character_collision_impulses(
                dt,
                &mut queries,
                &*shape,
                self.settings.character_mass,
                collisions.iter(),
            );
            movement
        } else {
            let queries = world.query_pipeline(filter);
            self.kcc
                .move_shape(dt, &queries, &*shape, &shape_pos, desired, |_| {})
        };

        self.state = if movement.grounded {
            GroundState::Grounded
        } else {
            GroundState::Airborne
        };

        if let Some(rb) = world.bodies.get_mut(body) {
            let next = rb.translation() + movement.translation;
            rb.set_next_kinematic_translation(next);
        }
    }

    /// Share the controller and wrap its `step` as a pre-step hook.
    pub fn into_hook(self) -> (Rc<RefCell<Self>>, StepHook) {
        let shared = Rc::new(RefCell::new(self));
        let inner = shared.clone();
        let hook = step_hook(move |world, dt| inner.borrow_mut().step(world, dt));
        (shared, hook)
    }
}
