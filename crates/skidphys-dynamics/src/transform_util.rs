use skidphys_core::types::{Isometry, Vec3};
use skidphys_core::Quat;

/// Largest rotation a body may make in one step.
pub const ANGULAR_MOTION_THRESHOLD: f32 = 0.25 * core::f32::consts::PI;

/// Exponential-map integration of a pose over `dt`.
pub fn integrate_transform(cur: &Isometry, lin: Vec3, ang: Vec3, dt: f32) -> Isometry {
    let pos = cur.pos + lin * dt;

    let mut ang = ang;
    let mut angle = ang.length();
    if angle * dt > ANGULAR_MOTION_THRESHOLD {
        let clamped = ANGULAR_MOTION_THRESHOLD / dt;
        ang *= clamped / angle;
        angle = clamped;
    }
    let axis = if angle < 0.001 {
        // Taylor expansion of sin(x/2)/x
        ang * (0.5 * dt - (dt * dt * dt) * 0.020_833_334 * angle * angle)
    } else {
        ang * ((0.5 * angle * dt).sin() / angle)
    };
    let dorn = Quat::from_xyzw(axis.x, axis.y, axis.z, (angle * dt * 0.5).cos());
    let rot = (dorn * cur.rot).normalize();
    Isometry { pos, rot }
}

/// Velocities that carry `from` to `to` in `dt`.
pub fn calculate_velocity(from: &Isometry, to: &Isometry, dt: f32) -> (Vec3, Vec3) {
    if dt <= 0.0 { return (Vec3::ZERO, Vec3::ZERO); }
    let lin = (to.pos - from.pos) / dt;
    let mut dq = (to.rot * from.rot.inverse()).normalize();
    if dq.w < 0.0 { dq = -dq; }
    let (axis, angle) = dq.to_axis_angle();
    let ang = if angle.abs() < 1.0e-6 { Vec3::ZERO } else { Vec3::from(axis) * (angle / dt) };
    (lin, ang)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use skidphys_core::vec3;

    #[test]
    fn integrates_spin_about_y() {
        let x = integrate_transform(&Isometry::IDENTITY, vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0), 0.5);
        assert_relative_eq!(x.pos.x, 0.5);
        let (_, angle) = x.rot.to_axis_angle();
        assert_relative_eq!(angle, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn clamps_fast_spin() {
        let x = integrate_transform(&Isometry::IDENTITY, Vec3::ZERO, vec3(0.0, 0.0, 1000.0), 1.0 / 60.0);
        let (_, angle) = x.rot.to_axis_angle();
        assert_relative_eq!(angle, ANGULAR_MOTION_THRESHOLD, epsilon = 1e-4);
    }

    #[test]
    fn velocity_round_trips_integration() {
        let from = Isometry::from_translation(vec3(1.0, 2.0, 3.0));
        let to = integrate_transform(&from, vec3(0.0, -3.0, 1.0), vec3(0.2, 0.4, -0.1), 0.1);
        let (lin, ang) = calculate_velocity(&from, &to, 0.1);
        assert_relative_eq!(lin.y, -3.0, epsilon = 1e-4);
        assert_relative_eq!(ang.x, 0.2, epsilon = 1e-3);
        assert_relative_eq!(ang.y, 0.4, epsilon = 1e-3);
        assert_relative_eq!(ang.z, -0.1, epsilon = 1e-3);
    }
}
