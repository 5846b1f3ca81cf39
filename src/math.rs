//! Math types for Roomverb

pub use glam::{Quat, Vec3};

/// Position and orientation of a game object, room or portal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * (-Vec3::Z)
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.position.distance(other.position)
    }

    /// Returns true if `other` differs from this pose by more than `epsilon`,
    /// either in position or in any component of the facing vectors.
    pub fn differs_from(&self, other: &Self, epsilon: f32) -> bool {
        if self.position.distance_squared(other.position) > epsilon * epsilon {
            return true;
        }
        !self.forward().abs_diff_eq(other.forward(), epsilon)
            || !self.up().abs_diff_eq(other.up(), epsilon)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_moves_are_ignored() {
        let a = Pose::from_position(Vec3::new(1.0, 2.0, 3.0));
        let b = Pose::from_position(Vec3::new(1.0005, 2.0, 3.0));
        assert!(!a.differs_from(&b, 0.001));
        assert!(a.differs_from(&Pose::from_position(Vec3::new(1.1, 2.0, 3.0)), 0.001));
    }

    #[test]
    fn rotation_counts_as_movement() {
        let a = Pose::identity();
        let b = Pose::new(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        assert!(a.differs_from(&b, 0.001));
    }
}
