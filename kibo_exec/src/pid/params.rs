//! PID controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains for a single controller
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Maximum magnitude of the integral accumulation. If not given the integral is unbounded.
    #[serde(default)]
    pub integral_limit: Option<f64>,
}

/// Parameters for the pose hold controllers
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Position controller gains
    pub position: PidGains,

    /// Attitude controller gains
    pub attitude: PidGains,

    /// Number of control cycles the hold loop runs for
    pub hold_cycles: usize,

    /// Target period of one hold cycle
    ///
    /// Units: seconds
    pub cycle_period_s: f64,
}
