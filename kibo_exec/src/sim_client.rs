//! # Simulation Client
//!
//! The SimClient stands in for the robot's equipment when testing and developing the anchors and
//! area surveys. It is fully deterministic and provides:
//!
//! - Kinematics of a robot which settles exactly at each move demand, offset by a fixed bias.
//! - A navigation camera rendering the configured world-fixed markers (and the sheets they are
//!   printed on) onto a blank image.
//! - A marker detector which projects each marker into the image through the same plane mapping
//!   the marker anchor inverts.
//! - A classifier returning a fixed set of items.
//!
//! Moves can be made to fail and the markers can be hidden to exercise the failure paths.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;

use image::{GrayImage, Luma};
use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};
use log::{debug, trace};
use serde::Deserialize;

use crate::{
    anchor::{Plane, PIXELS_PER_METER},
    eqpt_if::{ItemClassifier, MarkerDetector, Mover, NavCam, PoseSource},
    geom::Vector3,
    rectify::A4_LANDSCAPE,
};
use comms_if::eqpt::{CamImage, ItemCount, Kinematics, MarkerObservation, MoveDems, MoveResponse};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Intensity of the rendered target sheets.
const SHEET_LUMA: u8 = 220;

/// Intensity of the rendered markers.
const MARKER_LUMA: u8 = 20;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulation
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {
    /// Starting position of the robot
    ///
    /// Units: meters
    pub initial_position_m: [f64; 3],

    /// Starting attitude of the robot as an `[x, y, z, w]` quaternion
    pub initial_attitude_q: [f64; 4],

    /// Offset between a demanded and the settled position
    ///
    /// Units: meters
    pub move_bias_m: [f64; 3],

    /// Width of the navigation camera image
    pub image_width_px: u32,

    /// Height of the navigation camera image
    pub image_height_px: u32,

    /// Intensity of the empty image
    pub background_luma: u8,

    /// Side length of the markers
    ///
    /// Units: meters
    pub marker_side_m: f64,

    /// World-fixed markers
    pub markers: Vec<SimMarker>,

    /// Items reported by the classifier
    #[serde(default)]
    pub items: Vec<ItemCount>,
}

/// A marker fixed in the world
#[derive(Debug, Clone, Deserialize)]
pub struct SimMarker {
    pub id: i32,

    /// Position of the marker's bottom-left corner
    ///
    /// Units: meters
    pub position_m: [f64; 3],

    /// Normal of the surface carrying the marker
    pub normal: [f64; 3],
}

pub struct SimClient {
    params: SimParams,
    kin: Kinematics,
    move_failure: Option<MoveResponse>,
    markers_hidden: bool,
    move_log: Vec<MoveDems>,
    saved_images: Vec<String>,
    save_dir: Option<PathBuf>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimClientError {
    #[error("Move demand contains non-finite values: {0:?}")]
    InvalidDemand(MoveDems),

    #[error("Could not save the image: {0}")]
    ImageSaveError(image::ImageError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            initial_position_m: [0.0; 3],
            initial_attitude_q: [0.0, 0.0, 0.0, 1.0],
            move_bias_m: [0.0; 3],
            image_width_px: 1280,
            image_height_px: 960,
            background_luma: 0,
            marker_side_m: 0.05,
            markers: vec![SimMarker {
                id: 1,
                position_m: [0.02, -0.03, 0.7],
                normal: [0.0, 0.0, 1.0],
            }],
            items: Vec::new(),
        }
    }
}

impl SimClient {
    /// Create a new simulation with the robot at rest at its initial pose.
    pub fn new(params: SimParams) -> Self {
        let kin = Kinematics::at_rest(params.initial_position_m, params.initial_attitude_q);

        Self {
            params,
            kin,
            move_failure: None,
            markers_hidden: false,
            move_log: Vec::new(),
            saved_images: Vec::new(),
            save_dir: None,
        }
    }

    /// Current kinematics of the simulated robot.
    pub fn current_kinematics(&self) -> Kinematics {
        self.kin
    }

    /// All move demands received so far, including failed ones.
    pub fn move_log(&self) -> &[MoveDems] {
        &self.move_log
    }

    /// Labels of all images saved so far.
    pub fn saved_images(&self) -> &[String] {
        &self.saved_images
    }

    /// Make every following move end with the given response, or succeed again with `None`.
    pub fn set_move_failure(&mut self, response: Option<MoveResponse>) {
        self.move_failure = response;
    }

    /// Hide all markers from the camera and detector.
    pub fn set_markers_hidden(&mut self, hidden: bool) {
        self.markers_hidden = hidden;
    }

    /// Also write saved images as files into this directory.
    pub fn set_save_dir(&mut self, dir: PathBuf) {
        self.save_dir = Some(dir);
    }

    /// Corners of all visible markers as seen from the current position.
    fn project_markers(&self) -> Vec<MarkerObservation> {
        if self.markers_hidden {
            return Vec::new();
        }

        let position = Vector3::from(self.kin.position_m);
        let centre = [
            self.params.image_width_px as f64 / 2.0,
            self.params.image_height_px as f64 / 2.0,
        ];
        let side_px = self.params.marker_side_m * PIXELS_PER_METER;

        self.params
            .markers
            .iter()
            .filter_map(|m| {
                let plane = Plane::from_normal(&Vector3::from(m.normal))?;
                let offset = plane.image_offset(&(Vector3::from(m.position_m) - position));

                let bl = [
                    centre[0] + offset[0] * PIXELS_PER_METER,
                    centre[1] + offset[1] * PIXELS_PER_METER,
                ];

                Some(MarkerObservation::new(
                    m.id,
                    [
                        [bl[0], bl[1] - side_px],
                        [bl[0] + side_px, bl[1] - side_px],
                        [bl[0] + side_px, bl[1]],
                        bl,
                    ],
                ))
            })
            .collect()
    }
}

impl PoseSource for SimClient {
    type Error = SimClientError;

    fn kinematics(&mut self) -> Result<Kinematics, Self::Error> {
        Ok(self.kin)
    }
}

impl Mover for SimClient {
    type Error = SimClientError;

    fn move_to(&mut self, dems: &MoveDems) -> Result<MoveResponse, Self::Error> {
        self.move_log.push(*dems);

        let finite = dems
            .position_m
            .iter()
            .chain(dems.attitude_q.iter())
            .all(|v| v.is_finite());
        if !finite {
            return Err(SimClientError::InvalidDemand(*dems));
        }

        if let Some(response) = self.move_failure {
            debug!("SimClient: move to {:?} failed with {:?}", dems.position_m, response);
            return Ok(response);
        }

        let bias = self.params.move_bias_m;
        let position_m = [
            dems.position_m[0] + bias[0],
            dems.position_m[1] + bias[1],
            dems.position_m[2] + bias[2],
        ];
        self.kin = Kinematics::at_rest(position_m, dems.attitude_q);

        if dems.verbose {
            debug!("SimClient: settled at {:?}", position_m);
        }

        Ok(MoveResponse::Settled)
    }
}

impl NavCam for SimClient {
    type Error = SimClientError;

    fn capture(&mut self) -> Result<CamImage, Self::Error> {
        let mut img = GrayImage::from_pixel(
            self.params.image_width_px,
            self.params.image_height_px,
            Luma([self.params.background_luma]),
        );

        // Sheets first so the markers are drawn on top of them
        let side_px = self.params.marker_side_m * PIXELS_PER_METER;
        let px_per_cm = side_px / A4_LANDSCAPE.marker_side_cm;
        let markers = self.project_markers();

        for m in markers.iter() {
            let tl = m.corners_px[0];
            let sheet = Rect::at(
                (tl[0] - A4_LANDSCAPE.marker_offset_cm[0] * px_per_cm).round() as i32,
                (tl[1] - A4_LANDSCAPE.marker_offset_cm[1] * px_per_cm).round() as i32,
            )
            .of_size(
                (A4_LANDSCAPE.width_cm * px_per_cm).round().max(1.0) as u32,
                (A4_LANDSCAPE.height_cm * px_per_cm).round().max(1.0) as u32,
            );
            draw_filled_rect_mut(&mut img, sheet, Luma([SHEET_LUMA]));
        }

        for m in markers.iter() {
            let tl = m.corners_px[0];
            let marker = Rect::at(tl[0].round() as i32, tl[1].round() as i32)
                .of_size(side_px.round().max(1.0) as u32, side_px.round().max(1.0) as u32);
            draw_filled_rect_mut(&mut img, marker, Luma([MARKER_LUMA]));
        }

        trace!("SimClient: captured image with {} markers", markers.len());

        Ok(CamImage::now(img))
    }

    fn save(&mut self, image: &GrayImage, label: &str) -> Result<(), Self::Error> {
        self.saved_images.push(label.to_string());

        if let Some(ref dir) = self.save_dir {
            image
                .save(dir.join(label))
                .map_err(SimClientError::ImageSaveError)?;
        }

        Ok(())
    }
}

impl MarkerDetector for SimClient {
    fn detect(&self, _image: &GrayImage) -> Vec<MarkerObservation> {
        self.project_markers()
    }
}

impl ItemClassifier for SimClient {
    fn classify(&self, _image: &GrayImage) -> Vec<ItemCount> {
        self.params.items.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::cam::Corner;

    #[test]
    fn test_move_bias() {
        let mut params = SimParams::default();
        params.move_bias_m = [0.1, 0.0, -0.1];
        let mut sim = SimClient::new(params);

        let dems = MoveDems {
            position_m: [1.0, 2.0, 3.0],
            attitude_q: [0.0, 0.0, 0.0, 1.0],
            verbose: false,
        };
        assert_eq!(sim.move_to(&dems).unwrap(), MoveResponse::Settled);

        let kin = sim.kinematics().unwrap();
        assert_eq!(kin.position_m, [1.1, 2.0, 2.9]);
        assert!(kin.is_settled(0.002));
    }

    #[test]
    fn test_invalid_demand() {
        let mut sim = SimClient::new(SimParams::default());

        let dems = MoveDems {
            position_m: [f64::NAN, 0.0, 0.0],
            attitude_q: [0.0, 0.0, 0.0, 1.0],
            verbose: false,
        };
        assert!(matches!(
            sim.move_to(&dems),
            Err(SimClientError::InvalidDemand(_))
        ));
        assert_eq!(sim.current_kinematics().position_m, [0.0; 3]);
    }

    #[test]
    fn test_capture_renders_marker() {
        let mut sim = SimClient::new(SimParams::default());

        let image = sim.capture().unwrap();
        assert_eq!(image.image.dimensions(), (1280, 960));

        let markers = sim.detect(&image.image);
        assert_eq!(markers.len(), 1);

        // Centre of the marker is dark, just outside it is the sheet
        let tl = markers[0].corner(Corner::TopLeft);
        let br = markers[0].corner(Corner::BottomRight);
        let mid = ((tl[0] + br[0]) / 2.0, (tl[1] + br[1]) / 2.0);
        assert_eq!(image.image.get_pixel(mid.0 as u32, mid.1 as u32)[0], MARKER_LUMA);
        assert_eq!(
            image.image.get_pixel(mid.0 as u32, (br[1] + 5.0) as u32)[0],
            SHEET_LUMA
        );
    }

    #[test]
    fn test_hidden_markers() {
        let mut sim = SimClient::new(SimParams::default());
        sim.set_markers_hidden(true);

        let image = sim.capture().unwrap();
        assert!(sim.detect(&image.image).is_empty());
        assert!(image.image.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_classify_and_save() {
        let mut params = SimParams::default();
        params.items = vec![ItemCount::new("coin", 3)];
        let mut sim = SimClient::new(params);

        let img = GrayImage::new(4, 4);
        assert_eq!(sim.classify(&img), vec![ItemCount::new("coin", 3)]);

        sim.save(&img, "crop.png").unwrap();
        assert_eq!(sim.saved_images(), &["crop.png".to_string()]);
    }
}
