//! # Localisation Equipment Communications Module
//!
//! Kinematic state reported by the robot's pose source.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A kinematics sample of the robot in the world (station) frame.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Default)]
pub struct Kinematics {
    /// Position of the robot body
    ///
    /// Units: meters
    pub position_m: [f64; 3],

    /// Attitude of the robot body as an `[x, y, z, w]` quaternion.
    pub attitude_q: [f64; 4],

    /// Linear velocity
    ///
    /// Units: meters/second
    pub lin_vel_ms: [f64; 3],

    /// Angular velocity
    ///
    /// Units: radians/second
    pub ang_vel_rads: [f64; 3],

    /// Linear acceleration
    ///
    /// Units: meters/second^2
    pub lin_acc_mss: [f64; 3],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Kinematics {
    /// Build a sample of a robot at rest at the given pose.
    pub fn at_rest(position_m: [f64; 3], attitude_q: [f64; 4]) -> Self {
        Self {
            position_m,
            attitude_q,
            ..Default::default()
        }
    }

    /// Returns true if linear velocity, linear acceleration and angular velocity norms are all
    /// at or below `threshold`.
    pub fn is_settled(&self, threshold: f64) -> bool {
        norm3(&self.lin_vel_ms) <= threshold
            && norm3(&self.lin_acc_mss) <= threshold
            && norm3(&self.ang_vel_rads) <= threshold
    }
}

fn norm3(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
