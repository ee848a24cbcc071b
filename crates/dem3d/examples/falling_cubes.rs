//! Drop a pile of cubes and report how they settle.
//!
//! Run with: RUST_LOG=info cargo run -p dem3d --example falling_cubes --release
//! Pass a JSON parameter file as the first argument to override defaults.

use dem3d::{LayoutShape, ParticleLayout, Quat, RigidBodySimulation, SimulationParams, Vec3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::Path;

const STEPS: usize = 1500;
const REPORT_EVERY: usize = 250;
const BODY_COUNT: usize = 24;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let layout = ParticleLayout::generate(LayoutShape::CubeShell { per_edge: 3 }, 1.0, 1.0)?;
    let params = match std::env::args().nth(1) {
        Some(path) => SimulationParams::load_json(Path::new(&path))?.for_layout(&layout),
        None => SimulationParams::default().for_layout(&layout),
    };
    // Bodies start on a lattice wide enough that no two overlap.
    let spacing = 2.0 * layout.bounding_radius + 0.25;
    log::info!(
        "{} particles per body, body mass {}, bounding radius {:.3}",
        layout.len(),
        layout.mass,
        layout.bounding_radius
    );
    let mut sim = RigidBodySimulation::new(params, layout)?;

    let mut rng = StdRng::seed_from_u64(2024);
    for i in 0..BODY_COUNT {
        let column = (i % 4) as f32 - 1.5;
        let row = (i / 4 % 2) as f32 - 0.5;
        let layer = (i / 8) as f32;
        let position = Vec3::new(column, 1.0 + layer, row) * spacing;
        let orientation = Quat::from_euler(
            glam::EulerRot::XYZ,
            rng.gen_range(-0.5..0.5),
            rng.gen_range(-0.5..0.5),
            rng.gen_range(-0.5..0.5),
        );
        let velocity = Vec3::new(rng.gen_range(-1.0..1.0), 0.0, rng.gen_range(-1.0..1.0));
        sim.spawn_body(position, orientation, velocity, Vec3::ZERO)?;
    }

    for step in 1..=STEPS {
        sim.step();
        if step % REPORT_EVERY == 0 {
            let bodies = sim.bodies();
            let mean_height =
                bodies.iter().map(|b| b.position.y).sum::<f32>() / bodies.len() as f32;
            let max_speed = bodies
                .iter()
                .map(|b| b.linear_velocity.length())
                .fold(0.0_f32, f32::max);
            let stats = sim.last_grid_stats();
            log::info!(
                "step {:5}: mean height {:.3}, max speed {:.3}, dropped {} / outside {}",
                step,
                mean_height,
                max_speed,
                stats.overflowed,
                stats.out_of_bounds
            );
        }
    }

    println!("{}", sim.snapshot().to_json()?);
    Ok(())
}
