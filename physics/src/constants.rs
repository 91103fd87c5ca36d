/// Simulation time slice (seconds). The engine is always advanced by exactly this amount.
pub const FIXED_STEP: f64 = 1.0 / 60.0;

/// Largest frame delta (seconds) accepted by the fixed-step driver.
///
/// Anything larger (tab suspend, debugger pause) is clamped before accumulation so one frame
/// can never schedule more than `MAX_FRAME_DELTA / FIXED_STEP` sub-steps.
pub const MAX_FRAME_DELTA: f64 = 0.25;

/// Default world gravity (m/s^2), +Y up.
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Default planar walking speed (m/s) for the character controller.
pub const DEFAULT_WALK_SPEED: f32 = 4.0;

/// Default planar sprinting speed (m/s) for the character controller.
pub const DEFAULT_SPRINT_SPEED: f32 = 8.0;

/// Default apex height (meters) of a standing jump.
pub const DEFAULT_JUMP_HEIGHT: f32 = 1.5;

/// Small gap preserved between the character and its surroundings (meters).
pub const DEFAULT_CONTROLLER_OFFSET: f32 = 0.01;

/// Highest ledge (meters) the controller climbs automatically.
pub const DEFAULT_AUTOSTEP_MAX_HEIGHT: f32 = 0.5;

/// Minimum free width (meters) on top of a ledge for autostep to engage.
pub const DEFAULT_AUTOSTEP_MIN_WIDTH: f32 = 0.2;

/// Max downward distance (meters) the controller snaps to keep contact with the ground.
pub const DEFAULT_SNAP_TO_GROUND: f32 = 0.5;

/// Mass (kg) used when the controller pushes dynamic bodies.
pub const DEFAULT_CHARACTER_MASS: f32 = 80.0;
