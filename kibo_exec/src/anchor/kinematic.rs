//! Kinematic averaging anchor

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Instant;

use log::{debug, info, warn};

use super::{AnchorError, Params};
use crate::{
    eqpt_if::{Mover, PoseSource},
    geom::{fmt_vector, Frame, Vector3},
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Estimate the correction needed to reach `target`.
///
/// Moves to `target` and samples the settled pose `params.kinematic_iterations` times. The
/// samples are accumulated with [`Frame::absolute`] and scaled by `1/N`, and the returned
/// correction is `target` relative to that average.
pub fn kinematic_anchor<E>(
    eqpt: &mut E,
    target: &Frame,
    params: &Params,
) -> Result<Frame, AnchorError>
where
    E: PoseSource + Mover,
{
    let n = params.kinematic_iterations;
    if n == 0 {
        return Err(AnchorError::ZeroIterations);
    }

    let start = Instant::now();
    let dems = target.to_move_dems(params.verbose);
    let mut sum = Frame::identity();

    for i in 0..n {
        let response = eqpt.move_to(&dems).map_err(AnchorError::eqpt)?;
        if !response.is_ok() {
            warn!("Kinematic anchor move to {} failed: {:?}", target, response);
            return Err(AnchorError::MoveFailed(*target, response));
        }

        let kin = eqpt.kinematics().map_err(AnchorError::eqpt)?;

        debug!(
            "Kinematic anchor sample {}/{}: v = {}, a = {}, w = {}",
            i + 1,
            n,
            fmt_vector(&Vector3::from(kin.lin_vel_ms)),
            fmt_vector(&Vector3::from(kin.lin_acc_mss)),
            fmt_vector(&Vector3::from(kin.ang_vel_rads))
        );
        if !kin.is_settled(params.settle_threshold) {
            warn!(
                "Kinematic anchor sample {} taken before the robot settled (threshold {})",
                i + 1,
                params.settle_threshold
            );
        }

        sum = sum.absolute(&Frame::from(&kin));
    }

    let average = sum.gain(1.0 / n as f64);
    let correction = target.relative(&average);

    info!(
        "Kinematic anchor: average {}, correction {} ({:.3} s)",
        average,
        correction,
        start.elapsed().as_secs_f64()
    );

    Ok(correction)
}
