/*!
World and character-controller settings.

These structs centralize the tunables of the simulation and the kinematic character
controller (KCC). Every field has a default (see `constants`), so a settings file only needs
to list the values it overrides.

Notes
- Distances are in meters, time in seconds, angles in degrees (converted to radians when the
  Rapier controller is built).
- Autostep and snap-to-ground are always enabled; set their distances to tune them.
- `validate()` is called by the consumers (`Simulation::initialize`, `CharacterController::new`)
  so a bad file fails at construction instead of mid-simulation.
*/

use rapier3d::control::{CharacterAutostep, CharacterLength, KinematicCharacterController};
use rapier3d::prelude::{Real, Vector};
use serde::Deserialize;

use crate::constants::{
    DEFAULT_AUTOSTEP_MAX_HEIGHT, DEFAULT_AUTOSTEP_MIN_WIDTH, DEFAULT_CHARACTER_MASS,
    DEFAULT_CONTROLLER_OFFSET, DEFAULT_GRAVITY, DEFAULT_JUMP_HEIGHT, DEFAULT_SNAP_TO_GROUND,
    DEFAULT_SPRINT_SPEED, DEFAULT_WALK_SPEED,
};
use crate::error::{PhysicsError, Result};

/// Settings of the simulated world.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldSettings {
    /// World gravity (m/s^2).
    pub gravity: [f32; 3],
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
        }
    }
}

impl WorldSettings {
    pub fn gravity_vector(&self) -> Vector<Real> {
        Vector::new(self.gravity[0], self.gravity[1], self.gravity[2])
    }

    pub fn validate(&self) -> Result<()> {
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(PhysicsError::InvalidSettings(format!(
                "gravity must be finite, got {:?}",
                self.gravity
            )));
        }
        Ok(())
    }
}

/// Kinematic character controller settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControllerSettings {
    /// Planar speed while walking (m/s).
    pub walk_speed: f32,

    /// Planar speed while sprinting (m/s).
    pub sprint_speed: f32,

    /// Apex height of a standing jump (meters).
    pub jump_height: f32,

    /// Small gap preserved between the character and its surroundings (meters).
    /// Keep `offset` small but non-zero for numerical stability.
    pub offset: f32,

    /// Autostep maximum height (meters).
    pub autostep_max_height: f32,

    /// Autostep minimum width (meters).
    pub autostep_min_width: f32,

    /// Whether autostep can climb on top of dynamic bodies.
    pub autostep_include_dynamic: bool,

    /// Max ground-snapping distance (meters).
    pub snap_to_ground: f32,

    /// Maximum climbable slope angle (degrees).
    pub max_slope_climb_deg: f32,

    /// Minimum slope angle (degrees) before automatic sliding starts.
    pub min_slope_slide_deg: f32,

    /// Whether the controller should slide against obstacles.
    pub slide: bool,

    /// Increase if the character gets stuck when sliding (small, meters).
    pub normal_nudge_factor: f32,

    /// Mass used to compute impulses applied to pushed dynamic bodies (kg).
    pub character_mass: f32,

    /// Transfer impulses to the dynamic bodies the character runs into.
    pub apply_impulses: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            walk_speed: DEFAULT_WALK_SPEED,
            sprint_speed: DEFAULT_SPRINT_SPEED,
            jump_height: DEFAULT_JUMP_HEIGHT,
            offset: DEFAULT_CONTROLLER_OFFSET,
            autostep_max_height: DEFAULT_AUTOSTEP_MAX_HEIGHT,
            autostep_min_width: DEFAULT_AUTOSTEP_MIN_WIDTH,
            autostep_include_dynamic: false,
            snap_to_ground: DEFAULT_SNAP_TO_GROUND,
            max_slope_climb_deg: 45.0,
            min_slope_slide_deg: 30.0,
            slide: true,
            normal_nudge_factor: 1.0e-4,
            character_mass: DEFAULT_CHARACTER_MASS,
            apply_impulses: true,
        }
    }
}

impl ControllerSettings {
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("walk_speed", self.walk_speed),
            ("sprint_speed", self.sprint_speed),
            ("jump_height", self.jump_height),
            ("offset", self.offset),
            ("autostep_max_height", self.autostep_max_height),
            ("autostep_min_width", self.autostep_min_width),
            ("snap_to_ground", self.snap_to_ground),
            ("normal_nudge_factor", self.normal_nudge_factor),
            ("character_mass", self.character_mass),
        ];

        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(PhysicsError::InvalidSettings(format!(
                    "`{name}` must be a finite, non-negative number, got {value}"
                )));
            }
        }

        for (name, deg) in [
            ("max_slope_climb_deg", self.max_slope_climb_deg),
            ("min_slope_slide_deg", self.min_slope_slide_deg),
        ] {
            if !(0.0..=90.0).contains(&deg) {
                return Err(PhysicsError::InvalidSettings(format!(
                    "`{name}` must be within [0, 90] degrees, got {deg}"
                )));
            }
        }

        Ok(())
    }

    /// Build the Rapier controller configured by these settings.
    pub fn to_rapier(&self) -> KinematicCharacterController {
        KinematicCharacterController {
            offset: CharacterLength::Absolute(self.offset),
            slide: self.slide,
            autostep: Some(CharacterAutostep {
                max_height: CharacterLength::Absolute(self.autostep_max_height),
                min_width: CharacterLength::Absolute(self.autostep_min_width),
                include_dynamic_bodies: self.autostep_include_dynamic,
            }),
            max_slope_climb_angle: self.max_slope_climb_deg.to_radians(),
            min_slope_slide_angle: self.min_slope_slide_deg.to_radians(),
            snap_to_ground: Some(CharacterLength::Absolute(self.snap_to_ground)),
            normal_nudge_factor: self.normal_nudge_factor as Real,
            ..KinematicCharacterController::default()
        }
    }
}

/// Everything a playground session reads from its settings file.
///
/// ```toml
/// [world]
/// gravity = [0.0, -9.81, 0.0]
///
/// [controller]
/// walk_speed = 5.0
/// jump_height = 1.2
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaygroundSettings {
    pub world: WorldSettings,
    pub controller: ControllerSettings,
}

impl PlaygroundSettings {
    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.world.validate()?;
        settings.controller.validate()?;
        Ok(settings)
    }
}
