//! # Communications interface crate.
//!
//! Provides the data exchanged between the flight software and the robot's
//! equipment (pose source, movement actuator, navigation camera, detectors
//! and classifiers).

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command and response definitions for equipment
pub mod eqpt;
