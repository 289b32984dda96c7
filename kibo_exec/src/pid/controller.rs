//! # Generic PID controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use std::time::Instant;
use thiserror::Error;

// Internal
use super::PidGains;
use crate::geom::ControlValue;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Integral magnitudes below this are treated as zero when limiting the integral.
const INTEGRAL_ZERO_MAGNITUDE: f64 = 1e-9;

/// Smallest time step used for the derivative term.
const MIN_DT_S: f64 = 1e-9;

/// Bisection steps used to limit the magnitude of a non-linear value.
const LIMIT_BISECTION_STEPS: usize = 60;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller over any control value.
///
/// `update` is driven through `&mut self` from a single control thread.
#[derive(Debug, Clone)]
pub struct PidController<T: ControlValue> {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Derivative gain
    k_d: f64,

    /// Maximum magnitude of the integral accumulation
    integral_limit: f64,

    /// Target value, `None` until set
    setpoint: Option<T>,

    /// Error from the previous update
    last_error: T,

    /// The integral accumulation
    integral_sum: T,

    /// Instant of the previous update (or of the last reset)
    prev_time: Instant,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PidError {
    #[error("Setpoint not set for PID controller")]
    SetpointNotSet,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T: ControlValue> PidController<T> {
    /// Create a new controller with the given gains and integral limit.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, integral_limit: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            integral_limit,
            setpoint: None,
            last_error: T::identity(),
            integral_sum: T::identity(),
            prev_time: Instant::now(),
        }
    }

    /// Create a new controller whose integral term is not limited.
    pub fn new_unbounded(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self::new(k_p, k_i, k_d, f64::MAX)
    }

    /// Create a new controller from a set of gains.
    pub fn from_gains(gains: &PidGains) -> Self {
        Self::new(
            gains.k_p,
            gains.k_i,
            gains.k_d,
            gains.integral_limit.unwrap_or(f64::MAX),
        )
    }

    /// Set a new target value, resetting the controller state.
    pub fn set_setpoint(&mut self, setpoint: T) {
        self.setpoint = Some(setpoint);
        self.reset();
    }

    /// Get the current target value.
    pub fn setpoint(&self) -> Option<&T> {
        self.setpoint.as_ref()
    }

    /// True once a setpoint has been given.
    pub fn is_ready(&self) -> bool {
        self.setpoint.is_some()
    }

    /// Clear the integral and derivative memory and restart the clock. The setpoint is kept.
    pub fn reset(&mut self) {
        self.last_error = T::identity();
        self.integral_sum = T::identity();
        self.prev_time = Instant::now();
    }

    /// Get the controller output for the given process value.
    ///
    /// The time step is the time since the previous update, or since the setpoint was set for
    /// the first update.
    pub fn update(&mut self, process_value: &T) -> Result<T, PidError> {
        if self.setpoint.is_none() {
            return Err(PidError::SetpointNotSet);
        }

        let curr_time = Instant::now();
        let dt = curr_time.duration_since(self.prev_time).as_secs_f64();
        self.prev_time = curr_time;

        self.update_with_dt(process_value, dt)
    }

    /// Get the controller output for the given process value and an explicit time step in
    /// seconds. The internal clock is not touched.
    pub fn update_with_dt(&mut self, process_value: &T, dt: f64) -> Result<T, PidError> {
        let setpoint = self.setpoint.as_ref().ok_or(PidError::SetpointNotSet)?;

        let error = setpoint.relative(process_value);

        let proportional = error.gain(self.k_p);

        // Accumulate and limit the integral
        self.integral_sum = self.integral_sum.absolute(&error.gain(dt));

        let integral_mag = self.integral_sum.magnitude();
        if integral_mag > self.integral_limit {
            if integral_mag > INTEGRAL_ZERO_MAGNITUDE {
                self.integral_sum = limit_magnitude(&self.integral_sum, self.integral_limit);
            } else {
                self.integral_sum = T::identity();
            }
        }
        let integral = self.integral_sum.gain(self.k_i);

        let safe_dt = dt.max(MIN_DT_S);
        let derivative = error.relative(&self.last_error).gain(self.k_d / safe_dt);

        let output = proportional.absolute(&integral).absolute(&derivative);

        trace!(
            "PID update: dt = {:.4} s, error = {:?}, integral = {:?}, output = {:?}",
            dt,
            error,
            self.integral_sum,
            output
        );

        self.last_error = error;

        Ok(output)
    }

    /// Current integral accumulation.
    pub fn integral_sum(&self) -> &T {
        &self.integral_sum
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Scale `value` down with [`ControlValue::gain`] until its magnitude is within `limit`.
///
/// `gain(limit / magnitude)` is exact for vectors. For rotations the magnitude is not linear in the
/// rate, so the largest rate in `[0, limit / magnitude]` that respects the limit is found by
/// bisection.
fn limit_magnitude<T: ControlValue>(value: &T, limit: f64) -> T {
    let mut hi = limit / value.magnitude();

    let scaled = value.gain(hi);
    if scaled.magnitude() <= limit {
        return scaled;
    }

    // gain(0) is the identity, which always respects the limit
    let mut lo = 0.0;
    for _ in 0..LIMIT_BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if value.gain(mid).magnitude() <= limit {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    value.gain(lo)
}
