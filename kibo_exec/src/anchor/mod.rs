//! # Anchor module
//!
//! Anchors correct the difference between where the robot believes it is and where it really is.
//!
//! - The kinematic anchor repeatedly moves to a target and averages the poses reported once the
//!   robot has settled. The target expressed relative to that average is the correction.
//! - The marker anchor servos the robot so that the bottom-left corner of a fiducial marker lies
//!   at the centre of the navigation camera image, moving within the plane of the target.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod kinematic;
mod marker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::geom::Frame;
use comms_if::eqpt::{cam::Corner, MarkerObservation, MoveResponse};

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use kinematic::kinematic_anchor;
pub use marker::{marker_anchor, Plane, PIXELS_PER_METER};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the anchors
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Number of move and sample iterations of the kinematic anchor
    pub kinematic_iterations: usize,

    /// Maximum number of correction moves of the marker anchor
    pub marker_iterations: usize,

    /// If true moves are demanded in verbose mode
    pub verbose: bool,

    /// Norm below which the velocities and accelerations of a kinematics sample are considered
    /// settled.
    pub settle_threshold: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Rule used to pick one marker when several are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum MarkerSelect {
    /// The first marker in detection order
    First,

    /// The marker whose top-left corner is furthest left
    Leftmost,

    /// The marker whose top-left corner is furthest right
    Rightmost,
}

#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    #[error("Anchor iteration count must be at least 1")]
    ZeroIterations,

    #[error("Move to {0} failed: {1:?}")]
    MoveFailed(Frame, MoveResponse),

    #[error("Equipment error: {0}")]
    EqptError(Box<dyn std::error::Error + Send + Sync>),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for MarkerSelect {
    fn default() -> Self {
        MarkerSelect::First
    }
}

impl MarkerSelect {
    /// Pick a marker from those detected, `None` if there are none.
    ///
    /// Ties keep the earliest detection.
    pub fn select<'a>(&self, markers: &'a [MarkerObservation]) -> Option<&'a MarkerObservation> {
        let first = markers.first()?;
        let tl_x = |m: &MarkerObservation| m.corner(Corner::TopLeft)[0];

        let selected = match self {
            MarkerSelect::First => first,
            MarkerSelect::Leftmost => markers.iter().fold(first, |best, m| {
                if tl_x(m) < tl_x(best) {
                    m
                } else {
                    best
                }
            }),
            MarkerSelect::Rightmost => markers.iter().fold(first, |best, m| {
                if tl_x(m) > tl_x(best) {
                    m
                } else {
                    best
                }
            }),
        };

        Some(selected)
    }
}

impl AnchorError {
    pub(crate) fn eqpt<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AnchorError::EqptError(Box::new(e))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn marker_at(id: i32, x: f64) -> MarkerObservation {
        MarkerObservation::new(
            id,
            [[x, 10.0], [x + 10.0, 10.0], [x + 10.0, 20.0], [x, 20.0]],
        )
    }

    #[test]
    fn test_marker_select() {
        let markers = vec![marker_at(1, 300.0), marker_at(2, 50.0), marker_at(3, 800.0)];

        assert_eq!(MarkerSelect::First.select(&markers).unwrap().id, 1);
        assert_eq!(MarkerSelect::Leftmost.select(&markers).unwrap().id, 2);
        assert_eq!(MarkerSelect::Rightmost.select(&markers).unwrap().id, 3);

        assert!(MarkerSelect::Leftmost.select(&[]).is_none());
    }

    #[test]
    fn test_marker_select_ties() {
        let markers = vec![marker_at(4, 100.0), marker_at(5, 100.0)];

        assert_eq!(MarkerSelect::Leftmost.select(&markers).unwrap().id, 4);
        assert_eq!(MarkerSelect::Rightmost.select(&markers).unwrap().id, 4);
    }

    #[test]
    fn test_parse_params() {
        let params: Params = util::params::parse(
            "kinematic_iterations = 5\n\
            marker_iterations = 3\n\
            verbose = true\n\
            settle_threshold = 0.002\n",
        )
        .unwrap();

        assert_eq!(params.kinematic_iterations, 5);
        assert_eq!(params.marker_iterations, 3);
        assert!(params.verbose);
    }
}
