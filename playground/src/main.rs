//! Headless physics playground.
//!
//! Builds the demo level, feeds a scripted input track to the player and advances the simulation
//! with uneven frame times, the way a browser render loop would.
//!
//! Usage: `playground [settings.toml]`. Log filtering follows `RUST_LOG` (default `info`).

mod input;
mod level;
mod player;

use anyhow::Context;
use physics::{FIXED_STEP, PlaygroundSettings, SceneGraph, Simulation};
use tracing_subscriber::EnvFilter;

use crate::input::InputScript;
use crate::level::Level;
use crate::player::Player;

/// Simulated wall-clock length of the session (seconds).
const SESSION_SECS: f64 = 10.0;

/// Frame times cycled through to mimic a jittery render loop.
const FRAME_DELTAS: [f64; 6] = [0.0166, 0.0171, 0.0334, 0.0083, 0.0162, 0.0205];

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = load_settings()?;

    let mut scene = SceneGraph::new();
    let mut sim = Simulation::new(settings.world.clone());

    // Frames rendered while the engine is still booting step nothing.
    for _ in 0..3 {
        let report = sim.advance(&mut scene, FIXED_STEP);
        debug_assert_eq!(report.steps, 0);
    }
    sim.initialize().context("initializing physics world")?;

    let mut level = Level::build(&mut sim, &mut scene)?;
    let player = Player::spawn(&mut sim, &mut scene, &settings.controller)?;
    let script = InputScript::demo();

    let mut elapsed = 0.0;
    let mut frame = 0usize;
    let mut total_steps = 0u32;
    let mut next_report = 1.0;

    while elapsed < SESSION_SECS {
        // One long hitch halfway through, as after a suspended tab.
        let delta = if frame == 300 {
            1.5
        } else {
            FRAME_DELTAS[frame % FRAME_DELTAS.len()]
        };
        frame += 1;
        elapsed += delta;

        script.apply(elapsed, &player.input);
        let report = sim.advance(&mut scene, delta);
        total_steps += report.steps;
        level.process_despawns(&mut sim, &mut scene);

        if elapsed >= next_report {
            next_report = next_report_after(elapsed);
            let state = player.controller.borrow().state();
            let position = player.translation(&sim);
            tracing::info!(
                "t={elapsed:.2}s steps={total_steps} alpha={:.2} player={state:?} at {position:?}",
                report.alpha
            );
        }
    }

    let world = sim.world().context("world vanished mid-session")?;
    let sleeping = level
        .spheres
        .iter()
        .filter(|(_, body)| world.bodies.get(*body).is_some_and(|b| b.is_sleeping()))
        .count();
    let (_, bob) = level.pendulum;
    tracing::info!(
        "done: {frame} frames, {total_steps} steps, {} sphere contacts, {sleeping}/{} spheres asleep, pendulum bob at {:?}, sensor live: {}",
        level.sphere_hits.get(),
        level.spheres.len(),
        world.bodies.get(bob).map(|b| *b.translation()),
        world.is_collider_live(level.sensor),
    );

    player.despawn(&mut sim, &mut scene);
    sim.shutdown();
    Ok(())
}

fn load_settings() -> anyhow::Result<PlaygroundSettings> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(PlaygroundSettings::default());
    };
    let text =
        std::fs::read_to_string(&path).with_context(|| format!("reading settings from {path}"))?;
    let settings = PlaygroundSettings::from_toml_str(&text)
        .with_context(|| format!("parsing settings from {path}"))?;
    tracing::info!("loaded settings from {path}");
    Ok(settings)
}

/// The next whole second after `elapsed`, so a long hitch yields one report, not a burst.
fn next_report_after(elapsed: f64) -> f64 {
    elapsed.floor() + 1.0
}
