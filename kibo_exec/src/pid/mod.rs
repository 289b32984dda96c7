//! # PID control module
//!
//! A single PID controller which works on any [`ControlValue`](crate::geom::ControlValue). The
//! error, integral and derivative terms are all computed with the group operations of the value
//! type, so the same controller drives positions (plain vector arithmetic) and attitudes
//! (quaternion products and powers).
//!
//! The controller is either unset, in which case [`PidController::update`] fails, or ready once a
//! setpoint has been given. Changing the setpoint resets the integral and derivative memory.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controller;
pub mod params;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use controller::*;
pub use params::{Params, PidGains};
