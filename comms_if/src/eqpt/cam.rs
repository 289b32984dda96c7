//! # Camera Equipment Communications Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use chrono::{DateTime, Utc};
use image::GrayImage;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An image acquired by the navigation camera
#[derive(Debug, Clone)]
pub struct CamImage {
    /// UTC timestamp at which the frame was acquired
    pub timestamp: DateTime<Utc>,

    /// The greyscale image itself
    pub image: GrayImage,
}

/// A planar fiducial marker found in an image.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MarkerObservation {
    /// Identifier encoded in the marker
    pub id: i32,

    /// Pixel coordinates of the marker corners, in the order top-left, top-right, bottom-right,
    /// bottom-left.
    ///
    /// Units: pixels
    pub corners_px: [[f64; 2]; 4],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Corners of a marker observation, the discriminant is the index into `corners_px`.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Corner {
    TopLeft = 0,
    TopRight = 1,
    BottomRight = 2,
    BottomLeft = 3,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CamImage {
    /// Wrap an image acquired now.
    pub fn now(image: GrayImage) -> Self {
        Self {
            timestamp: Utc::now(),
            image,
        }
    }

    /// Centre of the image in pixels, `(width / 2, height / 2)`.
    pub fn centre_px(&self) -> [f64; 2] {
        [
            self.image.width() as f64 / 2.0,
            self.image.height() as f64 / 2.0,
        ]
    }
}

impl MarkerObservation {
    pub fn new(id: i32, corners_px: [[f64; 2]; 4]) -> Self {
        Self { id, corners_px }
    }

    /// Get the pixel coordinates of the given corner.
    pub fn corner(&self, corner: Corner) -> [f64; 2] {
        self.corners_px[corner as usize]
    }
}

impl fmt::Display for MarkerObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Marker {{ id={}, corners=[", self.id)?;
        for (i, c) in self.corners_px.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({:.2}, {:.2})", c[0], c[1])?;
        }
        write!(f, "] }}")
    }
}
