//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with the equipment.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod cam;
pub mod classifier;
pub mod loc;
pub mod mech;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use cam::{CamImage, MarkerObservation};
pub use classifier::ItemCount;
pub use loc::Kinematics;
pub use mech::{MoveDems, MoveResponse};
