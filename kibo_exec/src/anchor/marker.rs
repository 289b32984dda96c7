//! Marker feedback anchor

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};

use super::{AnchorError, MarkerSelect, Params};
use crate::{
    eqpt_if::{MarkerDetector, Mover, NavCam, PoseSource},
    geom::{fmt_vector, Frame, Vector3},
};
use comms_if::eqpt::cam::Corner;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Image scale of the navigation camera at the survey stand-off distance.
pub const PIXELS_PER_METER: f64 = 567.0;

/// A normal component above this marks the dominant axis of the target plane.
const PLANE_AXIS_THRESHOLD: f64 = 0.5;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// World plane in which the robot moves to centre a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    /// Target faces along X, image x maps to -Y and image y to +Z
    YZ,

    /// Target faces along Y, image x maps to +X and image y to +Z
    ZX,

    /// Target faces along Z, image x maps to +Y and image y to +X
    XY,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Plane {
    /// Select the plane from the target's normal.
    ///
    /// Exactly one component must exceed the threshold and the other two must be below it,
    /// otherwise there is no plane and the anchor does not move.
    pub fn from_normal(normal: &Vector3<f64>) -> Option<Self> {
        let t = PLANE_AXIS_THRESHOLD;
        let (x, y, z) = (normal[0], normal[1], normal[2]);

        if x > t && y < t && z < t {
            Some(Plane::YZ)
        } else if x < t && y > t && z < t {
            Some(Plane::ZX)
        } else if x < t && y < t && z > t {
            Some(Plane::XY)
        } else {
            None
        }
    }

    /// World displacement for an image offset of `(dx_m, dy_m)` metres.
    pub fn displacement(&self, dx_m: f64, dy_m: f64) -> Vector3<f64> {
        match self {
            Plane::YZ => Vector3::new(0.0, -dx_m, dy_m),
            Plane::ZX => Vector3::new(dx_m, 0.0, dy_m),
            Plane::XY => Vector3::new(dy_m, dx_m, 0.0),
        }
    }

    /// Image offset `(dx_m, dy_m)` in metres which produces the given world displacement, the
    /// inverse of [`Plane::displacement`]. The component along the normal is ignored.
    pub fn image_offset(&self, displacement: &Vector3<f64>) -> [f64; 2] {
        let d = displacement;
        match self {
            Plane::YZ => [-d[1], d[2]],
            Plane::ZX => [d[0], d[2]],
            Plane::XY => [d[1], d[0]],
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Servo the robot so that the selected marker's bottom-left corner is at the image centre.
///
/// Each iteration captures the pose and an image, picks a marker with `select`, converts the
/// bottom-left corner's offset from the image centre into metres and moves by that offset in the
/// plane given by the position of `normal`, keeping the current orientation.
///
/// Returns the last commanded frame, or `None` if no marker was seen. In that case the iteration
/// that failed to see a marker does not move the robot.
pub fn marker_anchor<E>(
    eqpt: &mut E,
    normal: &Frame,
    select: MarkerSelect,
    params: &Params,
) -> Result<Option<Frame>, AnchorError>
where
    E: PoseSource + Mover + NavCam + MarkerDetector,
{
    if params.marker_iterations == 0 {
        return Err(AnchorError::ZeroIterations);
    }

    let plane = Plane::from_normal(&normal.position);
    if plane.is_none() {
        warn!(
            "Normal {} has no dominant axis, the marker anchor will not move",
            fmt_vector(&normal.position)
        );
    }

    let mut anchor_frame = None;

    for i in 0..params.marker_iterations {
        let current = Frame::from(&eqpt.kinematics().map_err(AnchorError::eqpt)?);
        let image = eqpt.capture().map_err(AnchorError::eqpt)?;

        let markers = eqpt.detect(&image.image);
        let marker = match select.select(&markers) {
            Some(m) => m,
            None => {
                warn!("No marker detected, no position correction");
                return Ok(None);
            }
        };
        debug!("Selected {} ({:?})", marker, select);

        let bottom_left = marker.corner(Corner::BottomLeft);
        let centre = image.centre_px();
        let dx_px = bottom_left[0] - centre[0];
        let dy_px = bottom_left[1] - centre[1];

        let dx_m = dx_px / PIXELS_PER_METER;
        let dy_m = dy_px / PIXELS_PER_METER;
        debug!(
            "Marker offset: ({:.2}, {:.2}) px = ({:.4}, {:.4}) m",
            dx_px, dy_px, dx_m, dy_m
        );

        let delta = match plane {
            Some(p) => p.displacement(dx_m, dy_m),
            None => Vector3::zeros(),
        };

        let frame = current.translated(&delta);
        info!(
            "Marker anchor iteration {}: moving by {} to {}",
            i + 1,
            fmt_vector(&delta),
            frame
        );

        let response = eqpt
            .move_to(&frame.to_move_dems(params.verbose))
            .map_err(AnchorError::eqpt)?;
        if !response.is_ok() {
            warn!("Marker anchor move to {} failed: {:?}", frame, response);
            return Err(AnchorError::MoveFailed(frame, response));
        }

        anchor_frame = Some(frame);
    }

    Ok(anchor_frame)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::Quaternion;
    use crate::sim_client::{SimClient, SimMarker, SimParams};
    use approx::assert_abs_diff_eq;
    use comms_if::eqpt::MoveResponse;

    fn params(n: usize) -> Params {
        Params {
            kinematic_iterations: 1,
            marker_iterations: n,
            verbose: true,
            settle_threshold: 0.002,
        }
    }

    fn normal(x: f64, y: f64, z: f64) -> Frame {
        Frame::new(Vector3::new(x, y, z), Quaternion::identity())
    }

    #[test]
    fn test_plane_selection() {
        assert_eq!(Plane::from_normal(&Vector3::new(1.0, 0.0, 0.0)), Some(Plane::YZ));
        assert_eq!(Plane::from_normal(&Vector3::new(0.0, 1.0, 0.0)), Some(Plane::ZX));
        assert_eq!(Plane::from_normal(&Vector3::new(0.0, 0.0, 1.0)), Some(Plane::XY));
        assert_eq!(Plane::from_normal(&Vector3::new(0.7, 0.7, 0.0)), None);
        assert_eq!(Plane::from_normal(&Vector3::new(0.5, 0.0, 0.0)), None);
        assert_eq!(Plane::from_normal(&Vector3::new(-1.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_plane_displacement() {
        assert_eq!(Plane::YZ.displacement(0.1, 0.2), Vector3::new(0.0, -0.1, 0.2));
        assert_eq!(Plane::ZX.displacement(0.1, 0.2), Vector3::new(0.1, 0.0, 0.2));
        assert_eq!(Plane::XY.displacement(0.1, 0.2), Vector3::new(0.2, 0.1, 0.0));

        for plane in [Plane::YZ, Plane::ZX, Plane::XY].iter() {
            let d = plane.displacement(0.3, -0.4);
            assert_eq!(plane.image_offset(&d), [0.3, -0.4]);
        }
    }

    #[test]
    fn test_no_marker_no_move() {
        let mut sim = SimClient::new(SimParams::default());
        sim.set_markers_hidden(true);

        let r = marker_anchor(&mut sim, &normal(0.0, 0.0, 1.0), MarkerSelect::First, &params(3));

        assert!(matches!(r, Ok(None)));
        assert!(sim.move_log().is_empty());
    }

    #[test]
    fn test_zero_iterations() {
        let mut sim = SimClient::new(SimParams::default());

        let r = marker_anchor(&mut sim, &normal(0.0, 0.0, 1.0), MarkerSelect::First, &params(0));
        assert!(matches!(r, Err(AnchorError::ZeroIterations)));
    }

    #[test]
    fn test_centres_marker() {
        // Robot at the origin, marker 0.1 m along +Y and 0.05 m along +X, target facing Z
        let mut sim_params = SimParams::default();
        sim_params.initial_position_m = [0.0, 0.0, 0.0];
        sim_params.markers = vec![SimMarker {
            id: 11,
            position_m: [0.05, 0.1, 0.8],
            normal: [0.0, 0.0, 1.0],
        }];
        let mut sim = SimClient::new(sim_params);

        let frame = marker_anchor(&mut sim, &normal(0.0, 0.0, 1.0), MarkerSelect::First, &params(2))
            .unwrap()
            .unwrap();

        assert_eq!(sim.move_log().len(), 2);

        // First move takes the full offset, the depth is untouched
        let first = sim.move_log()[0];
        assert_abs_diff_eq!(first.position_m[0], 0.05, epsilon = 1e-9);
        assert_abs_diff_eq!(first.position_m[1], 0.1, epsilon = 1e-9);
        assert_abs_diff_eq!(first.position_m[2], 0.0, epsilon = 1e-9);
        assert!(first.verbose);

        // Second move is already centred
        assert_abs_diff_eq!(frame.position[0], 0.05, epsilon = 1e-9);
        assert_abs_diff_eq!(frame.position[1], 0.1, epsilon = 1e-9);
        assert_eq!(frame.orientation, Quaternion::identity());
    }

    #[test]
    fn test_yz_plane_offset_sign() {
        // Target facing X: a marker to the robot's +Y appears to the left of the image centre
        let mut sim_params = SimParams::default();
        sim_params.initial_position_m = [10.0, -8.0, 4.6];
        sim_params.markers = vec![SimMarker {
            id: 3,
            position_m: [11.0, -7.9, 4.55],
            normal: [1.0, 0.0, 0.0],
        }];
        let mut sim = SimClient::new(sim_params);

        let image = sim.capture().unwrap();
        let markers = sim.detect(&image.image);
        assert_eq!(markers.len(), 1);

        let bl = markers[0].corner(Corner::BottomLeft);
        let centre = image.centre_px();
        assert_abs_diff_eq!(bl[0] - centre[0], -0.1 * PIXELS_PER_METER, epsilon = 1e-6);
        assert_abs_diff_eq!(bl[1] - centre[1], -0.05 * PIXELS_PER_METER, epsilon = 1e-6);

        let frame = marker_anchor(&mut sim, &normal(1.0, 0.0, 0.0), MarkerSelect::First, &params(1))
            .unwrap()
            .unwrap();
        assert_abs_diff_eq!(frame.position[0], 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(frame.position[1], -7.9, epsilon = 1e-9);
        assert_abs_diff_eq!(frame.position[2], 4.55, epsilon = 1e-9);
    }

    #[test]
    fn test_no_dominant_axis_keeps_position() {
        let mut sim_params = SimParams::default();
        sim_params.initial_position_m = [1.0, 2.0, 3.0];
        let mut sim = SimClient::new(sim_params);

        let frame = marker_anchor(&mut sim, &normal(0.7, 0.7, 0.0), MarkerSelect::First, &params(1))
            .unwrap()
            .unwrap();

        assert_eq!(frame.position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(sim.move_log().len(), 1);
    }

    #[test]
    fn test_move_failure() {
        let mut sim = SimClient::new(SimParams::default());
        sim.set_move_failure(Some(MoveResponse::Rejected));

        let r = marker_anchor(&mut sim, &normal(0.0, 0.0, 1.0), MarkerSelect::First, &params(3));
        assert!(matches!(
            r,
            Err(AnchorError::MoveFailed(_, MoveResponse::Rejected))
        ));
        assert_eq!(sim.move_log().len(), 1);
    }
}
