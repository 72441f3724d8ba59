use skidphys_core::vec3;
use skidphys_world::*;

fn main() -> PhysicsResult<()> {
    let mut w = WorldBuilder::new().with_capacity(64).build()?;

    // Ground (static)
    w.add_body(RigidBodyDesc::fixed(Shape::Plane { normal: Vec3::Y, d: 0.0 }, Isometry::IDENTITY))?;

    // Falling box
    let b = w.add_body(RigidBodyDesc::dynamic(
        Shape::Box { hx: 0.25, hy: 0.25, hz: 0.25 },
        1.0,
        Isometry::from_translation(vec3(0.0, 2.0, 0.0)),
    ))?;

    for step in 0..60 {
        let stats = w.step(1.0 / 60.0);
        let hash = w.step_hash();
        let y = w.body_pose(b)?.pos.y;
        println!("step {step:02}  pairs={}  y={y:.3}  hash={:02x?}", stats.pairs_tested, &hash[..8]);
    }
    Ok(())
}
