use nalgebra::Vector2;
use physics::{InputSnapshot, ScriptedInput};

/// Timed input keyframes standing in for a keyboard.
///
/// Each keyframe holds from its start time until the next one begins.
pub struct InputScript {
    keyframes: Vec<(f64, InputSnapshot)>,
}

impl InputScript {
    pub fn demo() -> Self {
        let idle = InputSnapshot {
            pointer_locked: true,
            ..InputSnapshot::default()
        };
        let forward = InputSnapshot {
            movement: Vector2::new(0.0, 1.0),
            ..idle
        };

        Self {
            keyframes: vec![
                (0.0, idle),
                (1.0, forward),
                (2.5, InputSnapshot {
                    sprint: true,
                    ..forward
                }),
                (3.0, InputSnapshot {
                    jump: true,
                    ..forward
                }),
                (3.1, forward),
                (4.5, InputSnapshot {
                    movement: Vector2::new(1.0, 1.0).normalize(),
                    ..idle
                }),
                (6.0, idle),
                (7.0, InputSnapshot {
                    jump: true,
                    ..idle
                }),
                (7.1, idle),
            ],
        }
    }

    pub fn sample(&self, time: f64) -> InputSnapshot {
        self.keyframes
            .iter()
            .rev()
            .find(|(start, _)| *start <= time)
            .map(|(_, snapshot)| *snapshot)
            .unwrap_or_default()
    }

    pub fn apply(&self, time: f64, input: &ScriptedInput) {
        input.set(self.sample(time));
    }
}
