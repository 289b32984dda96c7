//! # Kibo library.
//!
//! Spatial algebra, control and visual pose correction for a free-flying robot inside a station
//! module. The library is shared between the executables in this crate and the benchmarks.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Geometry - vectors, quaternions and frames
pub mod geom;

/// PID control - a controller generic over the geometry value types
pub mod pid;

/// Anchors - correct the robot's pose from kinematics and fiducial markers
pub mod anchor;

/// Rectification - fronto-parallel images of printed targets
pub mod rectify;

/// Areas - the station areas and the per-area survey
pub mod area;

/// Equipment interfaces - traits for the robot's equipment
pub mod eqpt_if;

/// Simulation client - deterministic in-process equipment
pub mod sim_client;
