pub mod builders;
pub mod constants;
pub mod controller;
pub mod driver;
pub mod error;
pub mod events;
pub mod registry;
pub mod scene;
pub mod settings;
pub mod transform;
pub mod world;

// Re-export Rapier so downstream crates can use its macros and types without depending on
// `rapier3d` directly.
pub use rapier3d;

pub use builders::{BodyKind, ColliderDesc, RigidBodyDesc, ShapeDesc, spherical_joint};
pub use constants::{FIXED_STEP, MAX_FRAME_DELTA};
pub use controller::{
    CharacterController, GroundState, InputSnapshot, InputSource, ScriptedInput,
    horizontal_displacement, jump_velocity, next_vertical_velocity,
};
pub use driver::{Simulation, StepHook, StepReport, step_hook};
pub use error::{PhysicsError, Result};
pub use events::{CollisionPayload, ContactForcePayload, DispatchReport, EventDispatcher, Source};
pub use registry::{EventBundle, HandleRegistry, Subscription};
pub use scene::{LocalTransform, Mat4, NodeId, Quat, SceneGraph, Vec3};
pub use settings::{ControllerSettings, PlaygroundSettings, WorldSettings};
pub use transform::{TransformSync, WorldPose, decompose, interpolate};
pub use world::PhysicsWorld;
