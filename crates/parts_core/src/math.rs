//! Orientation helpers on top of glam

use glam::{Mat3, Quat, Vec3};

/// Local forward axis
pub const FORWARD: Vec3 = Vec3::Z;
/// World up axis
pub const UP: Vec3 = Vec3::Y;

/// Rotation that points the forward axis along `dir`, keeping `up` as close
/// to vertical as possible. Returns identity for a zero direction.
pub fn look_rotation(dir: Vec3, up: Vec3) -> Quat {
    let forward = dir.normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }

    let right = up.cross(forward);
    if right.length_squared() < 1e-8 {
        // Looking straight along `up`
        return Quat::from_rotation_arc(FORWARD, forward);
    }
    let right = right.normalize();
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize()
}

/// Rotation about the world up axis by `degrees`
#[inline]
pub fn yaw_rotation(degrees: f32) -> Quat {
    Quat::from_rotation_y(degrees.to_radians())
}

/// Move `current` toward `target` by at most `max_delta`
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let dist = delta.length();
    if dist <= max_delta || dist <= f32::EPSILON {
        target
    } else {
        current + delta / dist * max_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_look_rotation() {
        let dir = Vec3::new(1.0, 0.0, 0.0);
        let rot = look_rotation(dir, UP);
        let f = rot * FORWARD;
        assert_abs_diff_eq!(f.x, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(f.z, 0.0, epsilon = 1e-5);
        let u = rot * UP;
        assert_abs_diff_eq!(u.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_look_rotation_vertical() {
        let rot = look_rotation(Vec3::Y, UP);
        let f = rot * FORWARD;
        assert_abs_diff_eq!(f.y, 1.0, epsilon = 1e-5);
        assert_eq!(look_rotation(Vec3::ZERO, UP), Quat::IDENTITY);
    }

    #[test]
    fn test_yaw() {
        let f = yaw_rotation(90.0) * FORWARD;
        assert_abs_diff_eq!(f.x, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(f.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_move_towards() {
        let p = move_towards(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 2.0);
        assert_abs_diff_eq!(p.x, 2.0, epsilon = 1e-6);
        let p = move_towards(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 2.0);
        assert_eq!(p, Vec3::new(1.0, 0.0, 0.0));
    }
}
