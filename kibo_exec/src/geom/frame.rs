//! Reference frames (poses)

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt;

use comms_if::eqpt::{Kinematics, MoveDems};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::{fmt_vector, ControlValue, Quaternion};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// A pose: a position in metres and an orientation.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub position: Vector3<f64>,
    pub orientation: Quaternion,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Frame {
    pub fn new(position: Vector3<f64>, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Build a frame from raw `[x, y, z]` and `[x, y, z, w]` arrays.
    pub fn from_arrays(position_m: [f64; 3], attitude_q: [f64; 4]) -> Self {
        Self::new(Vector3::from(position_m), Quaternion::from_xyzw(attitude_q))
    }

    /// Zero position with the identity orientation.
    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), Quaternion::identity())
    }

    /// Compose this frame with `other`.
    ///
    /// Positions add and the orientation is `self.q * other.q`.
    pub fn absolute(&self, other: &Frame) -> Frame {
        Frame::new(
            self.position.absolute(&other.position),
            self.orientation.absolute(&other.orientation),
        )
    }

    /// This frame expressed relative to `origin`.
    ///
    /// Positions subtract and the orientation is `self.q * origin.q^-1`.
    pub fn relative(&self, origin: &Frame) -> Frame {
        Frame::new(
            self.position.relative(&origin.position),
            self.orientation.relative(&origin.orientation),
        )
    }

    /// Scale the frame, the position linearly and the orientation by the real power `q^rate`.
    pub fn gain(&self, rate: f64) -> Frame {
        Frame::new(self.position.gain(rate), self.orientation.gain(rate))
    }

    /// Same orientation, position moved by `delta`.
    pub fn translated(&self, delta: &Vector3<f64>) -> Frame {
        Frame::new(self.position + delta, self.orientation)
    }

    /// Build the move demand that drives the robot to this frame.
    pub fn to_move_dems(&self, verbose: bool) -> MoveDems {
        MoveDems {
            position_m: [self.position[0], self.position[1], self.position[2]],
            attitude_q: self.orientation.to_xyzw(),
            verbose,
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<&Kinematics> for Frame {
    fn from(kin: &Kinematics) -> Self {
        Frame::from_arrays(kin.position_m, kin.attitude_q)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame{{ position = {}, orientation = {} }}",
            fmt_vector(&self.position),
            self.orientation
        )
    }
}
