//! Rigid body state, the only data carried from one step to the next.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub position: Vec3,
    /// Unit quaternion, renormalised by every pose integration.
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Pose at the end of the previous step.
    pub previous_position: Vec3,
    pub previous_orientation: Quat,
}

impl RigidBody {
    /// A body at rest with identity orientation.
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY, Vec3::ZERO, Vec3::ZERO)
    }

    pub fn new(
        position: Vec3,
        orientation: Quat,
        linear_velocity: Vec3,
        angular_velocity: Vec3,
    ) -> Self {
        let orientation = orientation.normalize();
        Self {
            position,
            orientation,
            linear_velocity,
            angular_velocity,
            previous_position: position,
            previous_orientation: orientation,
        }
    }

    /// Rotate a body-frame offset into world orientation.
    #[inline]
    pub fn rotate(&self, local_offset: Vec3) -> Vec3 {
        self.orientation * local_offset
    }

    /// World velocity of a point at world-oriented offset `relative` from the centre.
    #[inline]
    pub fn point_velocity(&self, relative: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(relative)
    }

    /// Reject non-finite state and renormalise both orientations. Used on
    /// bodies that did not come from [`RigidBody::new`].
    pub fn normalized(mut self) -> Result<Self, &'static str> {
        let finite = self.position.is_finite()
            && self.previous_position.is_finite()
            && self.linear_velocity.is_finite()
            && self.angular_velocity.is_finite();
        if !finite {
            return Err("position and velocity must be finite");
        }
        for q in [&mut self.orientation, &mut self.previous_orientation] {
            let length = q.length();
            if !length.is_finite() || length < 1.0e-6 {
                return Err("orientation must be a finite, non-zero quaternion");
            }
            *q = *q / length;
        }
        Ok(self)
    }

    /// Inverse inertia tensor rotated into world space: `R * I^-1 * R^T`.
    pub fn world_inertia_inv(&self, inertia_inv_local: Mat3) -> Mat3 {
        let rot = Mat3::from_quat(self.orientation);
        rot * inertia_inv_local * rot.transpose()
    }
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_new_records_history() {
        let body = RigidBody::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_z(0.3),
            Vec3::X,
            Vec3::Y,
        );
        assert_eq!(body.previous_position, body.position);
        assert_eq!(body.previous_orientation, body.orientation);
    }

    #[test]
    fn test_body_new_normalizes_orientation() {
        let body = RigidBody::new(
            Vec3::ZERO,
            Quat::from_xyzw(0.0, 0.0, 0.0, 2.0),
            Vec3::ZERO,
            Vec3::ZERO,
        );
        assert!((body.orientation.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let mut body = RigidBody::at(Vec3::ZERO);
        body.orientation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let r = body.rotate(Vec3::X);
        // After 90deg Y rotation, X becomes -Z
        assert!(r.x.abs() < 1e-5);
        assert!((r.z + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_point_velocity_with_spin() {
        let mut body = RigidBody::at(Vec3::ZERO);
        body.linear_velocity = Vec3::new(1.0, 0.0, 0.0);
        body.angular_velocity = Vec3::new(0.0, 1.0, 0.0);
        // omega x r = (0, 1, 0) x (1, 0, 0) = (0, 0, -1)
        let v = body.point_velocity(Vec3::X);
        assert!((v - Vec3::new(1.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_world_inertia_identity_rotation() {
        let body = RigidBody::at(Vec3::ZERO);
        let local = Mat3::from_diagonal(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(body.world_inertia_inv(local), local);
    }

    #[test]
    fn test_normalized_fixes_orientation_scale() {
        let mut body = RigidBody::at(Vec3::new(1.0, 2.0, 3.0));
        body.orientation = Quat::from_xyzw(0.0, 0.0, 0.6, 0.8) * 3.0;
        let body = body.normalized().expect("finite body");
        assert!((body.orientation.length() - 1.0).abs() < 1e-6);
        assert!((body.orientation.z - 0.6).abs() < 1e-6);
        assert_eq!(body.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_normalized_rejects_bad_state() {
        let mut zero_rotation = RigidBody::at(Vec3::ZERO);
        zero_rotation.orientation = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);
        assert!(zero_rotation.normalized().is_err());

        let mut nan_velocity = RigidBody::at(Vec3::ZERO);
        nan_velocity.linear_velocity = Vec3::new(f32::NAN, 0.0, 0.0);
        assert!(nan_velocity.normalized().is_err());
    }
}
