use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position plus Euler orientation (degrees, yaw about +Y)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub euler: Vec3,
}

impl Pose {
    pub fn new(position: Vec3, euler: Vec3) -> Self {
        Self { position, euler }
    }

    pub fn distance(&self, other: &Pose) -> f32 {
        self.position.distance(other.position)
    }

    /// Interpolate with separate parameters for translation and rotation.
    /// Euler angles are blended component-wise.
    pub fn interpolate(start: &Pose, target: &Pose, t_position: f32, t_rotation: f32) -> Pose {
        Pose {
            position: start.position.lerp(target.position, t_position),
            euler: start.euler.lerp(target.euler, t_rotation),
        }
    }
}

/// Hermite smooth step `t²(3 − 2t)` on `t` clamped to [0, 1]
pub fn smooth_step(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Wrap an angle in degrees into [0, 360)
pub fn wrap_degrees(angle: f32) -> f32 {
    angle.rem_euclid(360.0)
}

pub fn euler_to_quat(euler: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    )
}

pub fn quat_to_euler(q: Quat) -> Vec3 {
    let (yaw, pitch, roll) = q.to_euler(EulerRot::YXZ);
    Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_step_fixed_points() {
        assert_eq!(smooth_step(0.0), 0.0);
        assert_eq!(smooth_step(1.0), 1.0);
        assert!((smooth_step(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_smooth_step_clamps_and_is_monotonic() {
        assert_eq!(smooth_step(-3.0), 0.0);
        assert_eq!(smooth_step(7.0), 1.0);

        let mut last = 0.0;
        for i in 0..=1000 {
            let v = smooth_step(i as f32 / 1000.0);
            assert!(v >= last, "smooth_step decreased at step {}", i);
            last = v;
        }
    }

    #[test]
    fn test_interpolate_uses_separate_parameters() {
        let a = Pose::new(Vec3::ZERO, Vec3::ZERO);
        let b = Pose::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 90.0, 0.0));
        let p = Pose::interpolate(&a, &b, 0.5, 1.0);
        assert_eq!(p.position, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(p.euler, Vec3::new(0.0, 90.0, 0.0));
    }

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(wrap_degrees(370.0), 10.0);
        assert_eq!(wrap_degrees(-90.0), 270.0);
    }

    #[test]
    fn test_quat_round_trip_for_small_angles() {
        let e = Vec3::new(10.0, 30.0, -5.0);
        let back = quat_to_euler(euler_to_quat(e));
        assert!((back - e).length() < 1e-3);
    }
}
