//! # Movement Equipment Communications Module

use serde::{Deserialize, Serialize};

/// Demand for the robot to move to a pose in the world frame.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub struct MoveDems {
    /// Target position
    ///
    /// Units: meters
    pub position_m: [f64; 3],

    /// Target attitude as an `[x, y, z, w]` quaternion
    pub attitude_q: [f64; 4],

    /// If true the actuator prints the robot position while moving
    pub verbose: bool,
}

/// Response from the actuator once a move has finished.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
pub enum MoveResponse {
    /// The robot reached the target and settled
    Settled,

    /// The robot did not settle before the actuator's timeout
    TimedOut,

    /// The actuator refused the demand
    Rejected,
}

impl MoveResponse {
    pub fn is_ok(&self) -> bool {
        matches!(self, MoveResponse::Settled)
    }
}
