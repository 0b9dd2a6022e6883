//! Rigid-transform algebra relating sensor coordinate frames
//!
//! Sub-device poses are expressed relative to a reference sensor and are
//! composed on demand from calibration data, so the types here are plain
//! immutable values with pure composition and inversion.

use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// Row-major 3x3 rotation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix3(pub [f32; 9]);

impl Matrix3 {
    pub const IDENTITY: Matrix3 = Matrix3([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    /// Element at `(row, col)`.
    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.0[row * 3 + col]
    }

    pub fn transpose(&self) -> Matrix3 {
        let m = &self.0;
        Matrix3([m[0], m[3], m[6], m[1], m[4], m[7], m[2], m[5], m[8]])
    }

    pub fn mul_vec(&self, v: [f32; 3]) -> [f32; 3] {
        let m = &self.0;
        [
            m[0] * v[0] + m[1] * v[1] + m[2] * v[2],
            m[3] * v[0] + m[4] * v[1] + m[5] * v[2],
            m[6] * v[0] + m[7] * v[1] + m[8] * v[2],
        ]
    }
}

impl Mul for Matrix3 {
    type Output = Matrix3;

    fn mul(self, rhs: Matrix3) -> Matrix3 {
        let mut out = [0.0f32; 9];
        for row in 0..3 {
            for col in 0..3 {
                let mut acc = 0.0;
                for k in 0..3 {
                    acc += self.at(row, k) * rhs.at(k, col);
                }
                out[row * 3 + col] = acc;
            }
        }
        Matrix3(out)
    }
}

/// Rigid transform: rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub orientation: Matrix3,
    pub position: [f32; 3],
}

impl Pose {
    /// The reference sensor's pose: identity rotation, zero translation.
    pub const IDENTITY: Pose = Pose {
        orientation: Matrix3::IDENTITY,
        position: [0.0, 0.0, 0.0],
    };

    /// Compose two transforms: apply `rhs` first, then `self`.
    pub fn compose(&self, rhs: &Pose) -> Pose {
        let rotated = self.orientation.mul_vec(rhs.position);
        Pose {
            orientation: self.orientation * rhs.orientation,
            position: [
                rotated[0] + self.position[0],
                rotated[1] + self.position[1],
                rotated[2] + self.position[2],
            ],
        }
    }

    /// Standard rigid-transform inverse.
    pub fn inverse(&self) -> Pose {
        let rt = self.orientation.transpose();
        let p = rt.mul_vec(self.position);
        Pose {
            orientation: rt,
            position: [-p[0], -p[1], -p[2]],
        }
    }

    /// Map a point from this frame into the parent frame.
    pub fn transform(&self, point: [f32; 3]) -> [f32; 3] {
        let r = self.orientation.mul_vec(point);
        [
            r[0] + self.position[0],
            r[1] + self.position[1],
            r[2] + self.position[2],
        ]
    }
}

impl Mul for Pose {
    type Output = Pose;

    fn mul(self, rhs: Pose) -> Pose {
        self.compose(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-5;

    // 90 degrees about Z plus an offset, a deliberately non-trivial fixture.
    fn rot_z_90() -> Pose {
        Pose {
            orientation: Matrix3([0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
            position: [1.0, 2.0, 3.0],
        }
    }

    fn rot_x_90() -> Pose {
        Pose {
            orientation: Matrix3([1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0]),
            position: [-0.5, 0.25, 4.0],
        }
    }

    fn assert_pose_eq(a: &Pose, b: &Pose) {
        for i in 0..9 {
            assert!(
                (a.orientation.0[i] - b.orientation.0[i]).abs() < TOLERANCE,
                "rotation element {i}: {} vs {}",
                a.orientation.0[i],
                b.orientation.0[i]
            );
        }
        for i in 0..3 {
            assert!(
                (a.position[i] - b.position[i]).abs() < TOLERANCE,
                "translation element {i}: {} vs {}",
                a.position[i],
                b.position[i]
            );
        }
    }

    #[test]
    fn test_identity_is_neutral() {
        let p = rot_z_90();
        assert_pose_eq(&(Pose::IDENTITY * p), &p);
        assert_pose_eq(&(p * Pose::IDENTITY), &p);
    }

    #[test]
    fn test_composition_is_associative() {
        let a = rot_z_90();
        let b = rot_x_90();
        let c = Pose {
            orientation: Matrix3([0.0, 0.0, 1.0, 0.0, 1.0, 0.0, -1.0, 0.0, 0.0]),
            position: [2.0, -1.0, 0.5],
        };
        assert_pose_eq(&((a * b) * c), &(a * (b * c)));
    }

    #[test]
    fn test_inverse_round_trips() {
        let p = rot_z_90();
        assert_pose_eq(&(p * p.inverse()), &Pose::IDENTITY);
        assert_pose_eq(&(p.inverse() * p), &Pose::IDENTITY);
    }

    #[test]
    fn test_transform_rotates_then_translates() {
        let p = rot_z_90();
        let out = p.transform([1.0, 0.0, 0.0]);
        assert!((out[0] - 1.0).abs() < TOLERANCE);
        assert!((out[1] - 3.0).abs() < TOLERANCE);
        assert!((out[2] - 3.0).abs() < TOLERANCE);
    }
}
