//! # Equipment interfaces
//!
//! Traits describing the equipment the anchors and area surveys talk to. The anchors take a
//! single equipment object implementing the traits they need, so a real robot client and the
//! [`SimClient`](crate::sim_client::SimClient) are interchangeable.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use image::GrayImage;

use comms_if::eqpt::{CamImage, ItemCount, Kinematics, MarkerObservation, MoveDems, MoveResponse};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Source of the robot's current kinematic state.
pub trait PoseSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Get the current kinematics of the robot.
    fn kinematics(&mut self) -> Result<Kinematics, Self::Error>;
}

/// Actuator which moves the robot to a pose.
pub trait Mover {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Move to the demanded pose, blocking until the move has finished.
    fn move_to(&mut self, dems: &MoveDems) -> Result<MoveResponse, Self::Error>;
}

/// The navigation camera.
pub trait NavCam {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Acquire an (undistorted) image.
    fn capture(&mut self) -> Result<CamImage, Self::Error>;

    /// Persist an image under the given label.
    fn save(&mut self, image: &GrayImage, label: &str) -> Result<(), Self::Error>;
}

/// Fiducial marker detector.
pub trait MarkerDetector {
    /// Find all markers in the image, in detection order.
    fn detect(&self, image: &GrayImage) -> Vec<MarkerObservation>;
}

/// Classifier counting the items in a cropped target image.
pub trait ItemClassifier {
    fn classify(&self, image: &GrayImage) -> Vec<ItemCount>;
}
