//! skidphys-sim: headless scenario runner. Steps a world at a fixed rate,
//! logs per-tick stats and hashes and leaves the event ledger on disk.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};

use skidphys_core::{vec3, Quat};
use skidphys_world::*;

/* ---------------- env helpers ---------------- */
fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}
fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

/* ---------------- cli ---------------- */
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// One box onto a ground plane.
    Drop,
    /// Five boxes stacked on a ground plane.
    Stack,
    /// Four-wheel raycast car driving off from rest.
    Vehicle,
    /// Chain of ball-socket links hanging from a fixed anchor.
    Pendulum,
}

#[derive(Parser, Debug)]
#[command(name = "skidphys-sim", about = "Run a physics scenario headless")]
struct Args {
    #[arg(value_enum, default_value_t = Scenario::Drop)]
    scenario: Scenario,

    /// Number of `step` calls. Defaults to RPHYS_STEPS or 300.
    #[arg(long)]
    steps: Option<u32>,

    /// Frame time handed to each call. Defaults to RPHYS_DT or 1/RPHYS_HZ.
    #[arg(long)]
    dt: Option<f32>,

    /// World configuration as (possibly partial) JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory ledger JSONL dumps are written to.
    #[arg(long, default_value = "out")]
    ledger_dir: PathBuf,

    /// Dump the ledger every N ticks; 0 writes only the final dump.
    #[arg(long, default_value_t = 0)]
    json_every: u32,

    /// Print the state hash every N ticks; 0 prints only the final hash.
    #[arg(long, default_value_t = 20)]
    print_every: u32,
}

fn hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/* ---------------- scenes ---------------- */
const GROUND: Shape = Shape::Plane { normal: Vec3::Y, d: 0.0 };

fn at(x: f32, y: f32, z: f32) -> Isometry { Isometry::from_translation(vec3(x, y, z)) }

struct Scene {
    world: World,
    /// Body whose pose is reported each print.
    focus: BodyId,
    vehicle: Option<VehicleId>,
}

fn build_scene(scenario: Scenario, builder: WorldBuilder) -> Result<Scene> {
    let mut w = builder.build().context("building world")?;
    w.add_body(RigidBodyDesc::fixed(GROUND, Isometry::IDENTITY))?;

    let scene = match scenario {
        Scenario::Drop => {
            let b = w.add_body(RigidBodyDesc::dynamic(Shape::Box { hx: 0.5, hy: 0.5, hz: 0.5 }, 1.0, at(0.0, 1.5, 0.0)))?;
            Scene { world: w, focus: b, vehicle: None }
        }
        Scenario::Stack => {
            let mut top = None;
            for i in 0..5 {
                let pose = Isometry { pos: vec3(0.0, 0.5 + 1.01 * i as f32, 0.0), rot: Quat::from_rotation_y(0.05 * i as f32) };
                top = Some(w.add_body(RigidBodyDesc::dynamic(Shape::Box { hx: 0.5, hy: 0.5, hz: 0.5 }, 1.0, pose))?);
            }
            let Some(focus) = top else { bail!("empty stack") };
            Scene { world: w, focus, vehicle: None }
        }
        Scenario::Vehicle => {
            let chassis = w.add_body(RigidBodyDesc::dynamic(Shape::Box { hx: 1.0, hy: 0.5, hz: 2.0 }, 800.0, at(0.0, 1.0, 0.0)))?;
            let v = w.add_vehicle(chassis)?;
            let tuning = VehicleTuning { suspension_stiffness: 20.0, max_suspension_travel_cm: 50.0, ..VehicleTuning::default() };
            for (x, z) in [(-1.0, 1.5), (1.0, 1.5), (-1.0, -1.5), (1.0, -1.5)] {
                w.add_wheel(v, vec3(x, 0.0, z), -Vec3::Y, -Vec3::X, 0.6, 0.4, &tuning, z > 0.0)?;
            }
            Scene { world: w, focus: chassis, vehicle: Some(v) }
        }
        Scenario::Pendulum => {
            let ball = Shape::Sphere { r: 0.2 };
            let mut prev = w.add_body(RigidBodyDesc::fixed(ball, at(0.0, 6.0, 0.0)))?;
            for i in 1..=4 {
                let link = w.add_body(RigidBodyDesc::dynamic(ball, 1.0, at(i as f32, 6.0, 0.0)))?;
                let kind = ConstraintKind::PointToPoint { pivot_a: vec3(0.5, 0.0, 0.0), pivot_b: vec3(-0.5, 0.0, 0.0) };
                w.add_constraint(prev, link, kind, true)?;
                prev = link;
            }
            Scene { world: w, focus: prev, vehicle: None }
        }
    };
    Ok(scene)
}

/* ---------------- main ---------------- */
fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let hz = env_u32("RPHYS_HZ", 60).clamp(30, 240);
    let mut dt = args.dt.unwrap_or_else(|| env_f32("RPHYS_DT", 1.0 / hz as f32));
    if !(dt > 0.0) { dt = 1.0 / 60.0; }
    let steps = args.steps.unwrap_or_else(|| env_u32("RPHYS_STEPS", 300));

    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            WorldConfig::from_json_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => WorldConfig::default(),
    };
    log::info!("scenario {:?}: {steps} steps of {dt:.5}s, fixed {:.5}s", args.scenario, config.fixed_time_step);

    let builder = WorldBuilder::new()
        .with_config(config)
        .with_debug(DebugSettings { json_every: args.json_every, ..DebugSettings::default() })
        .with_ledger(8192, args.ledger_dir.clone());
    let Scene { mut world, focus, vehicle } = build_scene(args.scenario, builder)?;

    for tick in 1..=steps {
        if let Some(v) = vehicle {
            // rear-wheel drive after the car has settled
            let force = if tick > 120 { 1500.0 } else { 0.0 };
            for wheel in [2, 3] { world.apply_engine_force(v, force, wheel)?; }
        }
        let stats = world.step(dt);

        if args.print_every > 0 && tick % args.print_every == 0 {
            let pose = world.body_pose(focus)?;
            let state = world.activation_state(focus)?;
            let speed = match vehicle {
                Some(v) => format!("  {:.1} km/h", world.vehicle(v)?.current_speed_kmh()),
                None => String::new(),
            };
            println!(
                "tick {tick:04}  pairs={} contacts={} islands={} ({} asleep)  pos=({:.3}, {:.3}, {:.3}) {state:?}{speed}  hash={}",
                stats.pairs_tested, stats.contacts, stats.islands, stats.sleeping_islands,
                pose.pos.x, pose.pos.y, pose.pos.z, &hex(&world.step_hash())[..16],
            );
        }
    }

    let broken = world.broken_constraints();
    if !broken.is_empty() {
        log::warn!("{} constraints broke", broken.len());
    }
    let path = world
        .ledger()
        .write_jsonl(&args.ledger_dir, world.tick_index())
        .with_context(|| format!("writing ledger to {}", args.ledger_dir.display()))?;
    log::info!("ledger: {} events ({} dropped) -> {}", world.ledger().len(), world.ledger().dropped(), path.display());
    println!("final hash {}", hex(&world.step_hash()));
    Ok(())
}
