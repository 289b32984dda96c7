//! # Area module
//!
//! The station areas visited by the robot. Each area has a survey pose, the normal of the surface
//! its target sheet is fixed to and the rule picking the area's marker when several are visible.
//! The table of areas is loaded once from `areas.toml` and passed by reference to whatever needs
//! it.
//!
//! [`survey_area`] runs the full pipeline for one area: move to the area, servo onto its marker,
//! rectify the target sheet, crop it and classify the items on it. The results are kept in an
//! [`AreaReport`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use image::GrayImage;
use log::{info, warn};
use serde::{Deserialize, Serialize};

// Internal
use crate::{
    anchor::{self, marker_anchor, AnchorError, MarkerSelect},
    eqpt_if::{ItemClassifier, MarkerDetector, Mover, NavCam, PoseSource},
    geom::Frame,
    rectify::{self, RasterSide, A4_LANDSCAPE, CROP_SIDE_PX},
};
use comms_if::eqpt::{ItemCount, MarkerObservation};
use util::params::{self, LoadError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Configuration of a single area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaConfig {
    /// Area number, starting from 1
    pub id: u32,

    /// Pose from which the area is surveyed
    pub frame: Frame,

    /// Normal of the target's surface, only the position is used
    pub normal: Frame,

    /// Rule picking the area's marker
    pub marker_select: MarkerSelect,
}

/// All areas of the station.
#[derive(Debug, Clone)]
pub struct AreaTable {
    /// Origin of the station
    pub world: Frame,

    /// Side of the rectified raster fixed to the nominal size
    pub raster_side: RasterSide,

    /// If true the debug image of each rectification is saved
    pub save_debug_images: bool,

    areas: Vec<AreaConfig>,
}

/// Everything found while surveying an area.
#[derive(Debug, Clone)]
pub struct AreaReport {
    pub area_id: u32,

    /// Frame the marker anchor finished at, `None` if no marker was seen
    pub location: Option<Frame>,

    /// `location` relative to the station's world frame
    pub world_location: Option<Frame>,

    /// The marker the target was rectified from
    pub marker: Option<MarkerObservation>,

    /// The rectified target sheet
    pub rectified: Option<GrayImage>,

    /// The region of the target given to the classifier
    pub crop: Option<GrayImage>,

    items: Vec<ItemCount>,
}

/// Serialisable summary of an [`AreaReport`], without the images.
#[derive(Debug, Clone, Serialize)]
pub struct AreaSummary {
    pub area_id: u32,
    pub location: Option<Frame>,
    pub world_location: Option<Frame>,
    pub marker_id: Option<i32>,
    pub rectified_size: Option<(u32, u32)>,
    pub items: Vec<ItemCount>,
}

/// A frame as written in the parameter files.
#[derive(Debug, Clone, Copy, Deserialize)]
struct FrameParams {
    position_m: [f64; 3],
    attitude_q: [f64; 4],
}

#[derive(Debug, Clone, Deserialize)]
struct AreaParams {
    id: u32,
    frame: FrameParams,
    normal: FrameParams,
    #[serde(default)]
    marker_select: MarkerSelect,
}

#[derive(Debug, Clone, Deserialize)]
struct AreaTableParams {
    world: FrameParams,
    #[serde(default)]
    raster_side: RasterSide,
    #[serde(default = "default_save_debug_images")]
    save_debug_images: bool,
    areas: Vec<AreaParams>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AreaError {
    #[error("Cannot load the area table: {0}")]
    LoadError(LoadError),

    #[error("The area table contains no areas")]
    NoAreas,

    #[error("Area {0} is defined more than once")]
    DuplicateArea(u32),

    #[error("Anchor failed: {0}")]
    AnchorError(AnchorError),

    #[error("Equipment error: {0}")]
    EqptError(Box<dyn std::error::Error + Send + Sync>),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl From<FrameParams> for Frame {
    fn from(p: FrameParams) -> Self {
        Frame::from_arrays(p.position_m, p.attitude_q)
    }
}

impl AreaTable {
    /// Load the table from a parameter file relative to the parameters directory.
    pub fn load(param_file_path: &str) -> Result<Self, AreaError> {
        let p: AreaTableParams = params::load(param_file_path).map_err(AreaError::LoadError)?;
        Self::from_params(p)
    }

    /// Parse the table from a TOML string.
    pub fn parse(table_str: &str) -> Result<Self, AreaError> {
        let p: AreaTableParams = params::parse(table_str).map_err(AreaError::LoadError)?;
        Self::from_params(p)
    }

    fn from_params(p: AreaTableParams) -> Result<Self, AreaError> {
        if p.areas.is_empty() {
            return Err(AreaError::NoAreas);
        }

        let mut areas: Vec<AreaConfig> = Vec::with_capacity(p.areas.len());
        for a in p.areas {
            if areas.iter().any(|b| b.id == a.id) {
                return Err(AreaError::DuplicateArea(a.id));
            }

            areas.push(AreaConfig {
                id: a.id,
                frame: a.frame.into(),
                normal: a.normal.into(),
                marker_select: a.marker_select,
            });
        }

        Ok(Self {
            world: p.world.into(),
            raster_side: p.raster_side,
            save_debug_images: p.save_debug_images,
            areas,
        })
    }

    /// Get an area by its id.
    pub fn get(&self, id: u32) -> Option<&AreaConfig> {
        self.areas.iter().find(|a| a.id == id)
    }

    /// Express a station frame relative to the world frame of the table.
    pub fn in_world(&self, frame: &Frame) -> Frame {
        frame.relative(&self.world)
    }

    /// All areas in the order they were configured.
    pub fn areas(&self) -> &[AreaConfig] {
        &self.areas
    }
}

impl AreaReport {
    pub fn new(area_id: u32) -> Self {
        Self {
            area_id,
            location: None,
            world_location: None,
            marker: None,
            rectified: None,
            crop: None,
            items: Vec::new(),
        }
    }

    pub fn items(&self) -> &[ItemCount] {
        &self.items
    }

    pub fn add_item(&mut self, item: ItemCount) {
        self.items.push(item);
    }

    /// Remove the first item equal to `item`, returning true if one was removed.
    pub fn remove_item(&mut self, item: &ItemCount) -> bool {
        match self.items.iter().position(|i| i == item) {
            Some(idx) => {
                self.items.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Total number of items with the given label.
    pub fn count_of(&self, label: &str) -> u32 {
        self.items
            .iter()
            .filter(|i| i.label == label)
            .map(|i| i.count)
            .sum()
    }

    pub fn summary(&self) -> AreaSummary {
        AreaSummary {
            area_id: self.area_id,
            location: self.location,
            world_location: self.world_location,
            marker_id: self.marker.as_ref().map(|m| m.id),
            rectified_size: self.rectified.as_ref().map(|r| r.dimensions()),
            items: self.items.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Survey a single area.
///
/// A missing marker is not an error: the report is returned with whatever was found up to that
/// point. Failed moves and equipment errors abort the survey.
pub fn survey_area<E>(
    eqpt: &mut E,
    table: &AreaTable,
    area: &AreaConfig,
    anchor_params: &anchor::Params,
) -> Result<AreaReport, AreaError>
where
    E: PoseSource + Mover + NavCam + MarkerDetector + ItemClassifier,
{
    let mut report = AreaReport::new(area.id);

    info!("Surveying area {} from {}", area.id, area.frame);

    let response = eqpt
        .move_to(&area.frame.to_move_dems(false))
        .map_err(|e| AreaError::EqptError(Box::new(e)))?;
    if !response.is_ok() {
        return Err(AreaError::AnchorError(AnchorError::MoveFailed(
            area.frame, response,
        )));
    }

    report.location = marker_anchor(eqpt, &area.normal, area.marker_select, anchor_params)
        .map_err(AreaError::AnchorError)?;
    let location = match report.location {
        Some(l) => l,
        None => {
            warn!("No marker found in area {}", area.id);
            return Ok(report);
        }
    };
    let world_location = table.in_world(&location);
    info!("Area {} anchored at {} in the world frame", area.id, world_location);
    report.world_location = Some(world_location);

    let image = eqpt
        .capture()
        .map_err(|e| AreaError::EqptError(Box::new(e)))?;
    save(eqpt, &image.image, &format!("area_{}.png", area.id))?;

    let markers = eqpt.detect(&image.image);
    let marker = match area.marker_select.select(&markers) {
        Some(m) => m.clone(),
        None => {
            warn!("Marker of area {} lost after anchoring", area.id);
            return Ok(report);
        }
    };

    let rectified = match rectify::rectify(&image.image, &marker, &A4_LANDSCAPE, table.raster_side)
    {
        Some(r) => r,
        None => {
            warn!("Could not rectify the target of area {}", area.id);
            report.marker = Some(marker);
            return Ok(report);
        }
    };

    if table.save_debug_images {
        let debug = rectify::debug_image(&image.image, &rectified);
        save(eqpt, &debug, &format!("area_{}_debug_corners.png", area.id))?;
    }

    let crop = rectify::crop(&rectified.image, CROP_SIDE_PX);
    save(eqpt, &crop, &format!("area_{}_crop.png", area.id))?;

    for item in eqpt.classify(&crop) {
        info!("Area {}: {} x {}", area.id, item.count, item.label);
        report.add_item(item);
    }

    report.marker = Some(marker);
    report.rectified = Some(rectified.image);
    report.crop = Some(crop);

    Ok(report)
}

fn save<E: NavCam>(eqpt: &mut E, image: &GrayImage, label: &str) -> Result<(), AreaError> {
    eqpt.save(image, label)
        .map_err(|e| AreaError::EqptError(Box::new(e)))
}

fn default_save_debug_images() -> bool {
    true
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim_client::{SimClient, SimMarker, SimParams};
    use crate::geom::Vector3;
    use comms_if::eqpt::MoveResponse;

    const TABLE: &str = r#"
        raster_side = "Short"

        [world]
        position_m = [9.815, -9.806, 4.293]
        attitude_q = [1.0, 0.0, 0.0, 0.0]

        [[areas]]
        id = 1
        frame = { position_m = [10.9, -10.0, 5.195], attitude_q = [0.0, 0.0, -0.707, 0.707] }
        normal = { position_m = [0.0, 1.0, 0.0], attitude_q = [0.0, 0.0, 0.0, 1.0] }

        [[areas]]
        id = 2
        marker_select = "Leftmost"
        frame = { position_m = [10.925, -8.875, 4.602], attitude_q = [0.0, 0.707, 0.0, 0.707] }
        normal = { position_m = [0.0, 0.0, 1.0], attitude_q = [0.0, 0.0, 0.0, 1.0] }
    "#;

    fn anchor_params() -> anchor::Params {
        anchor::Params {
            kinematic_iterations: 2,
            marker_iterations: 2,
            verbose: false,
            settle_threshold: 0.002,
        }
    }

    #[test]
    fn test_parse_table() {
        let table = AreaTable::parse(TABLE).unwrap();

        assert_eq!(table.areas().len(), 2);
        assert_eq!(table.raster_side, RasterSide::Short);
        assert!(table.save_debug_images);
        assert_eq!(table.world.position, Vector3::new(9.815, -9.806, 4.293));

        let a1 = table.get(1).unwrap();
        assert_eq!(a1.marker_select, MarkerSelect::First);
        assert_eq!(a1.normal.position, Vector3::new(0.0, 1.0, 0.0));

        let a2 = table.get(2).unwrap();
        assert_eq!(a2.marker_select, MarkerSelect::Leftmost);
        assert_eq!(a2.frame.orientation.to_xyzw(), [0.0, 0.707, 0.0, 0.707]);

        assert!(table.get(3).is_none());
    }

    #[test]
    fn test_in_world() {
        let table = AreaTable::parse(TABLE).unwrap();

        let origin = table.in_world(&table.world);
        assert!(origin.position.norm() < 1e-12);
        assert!(origin.orientation.vector_part().norm() < 1e-12);

        let area = table.get(1).unwrap();
        let local = table.in_world(&area.frame);
        let back = local.absolute(&table.world);
        assert!((back.position - area.frame.position).norm() < 1e-9);
        for (a, b) in back
            .orientation
            .to_xyzw()
            .iter()
            .zip(area.frame.orientation.to_xyzw().iter())
        {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_table_errors() {
        let empty = r#"
            areas = []
            [world]
            position_m = [0.0, 0.0, 0.0]
            attitude_q = [0.0, 0.0, 0.0, 1.0]
        "#;
        assert!(matches!(AreaTable::parse(empty), Err(AreaError::NoAreas)));

        let dup = format!(
            "{}\n{}",
            TABLE,
            r#"
            [[areas]]
            id = 2
            frame = { position_m = [0.0, 0.0, 0.0], attitude_q = [0.0, 0.0, 0.0, 1.0] }
            normal = { position_m = [0.0, 0.0, 1.0], attitude_q = [0.0, 0.0, 0.0, 1.0] }
            "#
        );
        assert!(matches!(
            AreaTable::parse(&dup),
            Err(AreaError::DuplicateArea(2))
        ));

        assert!(matches!(
            AreaTable::parse("not toml ="),
            Err(AreaError::LoadError(_))
        ));
    }

    #[test]
    fn test_report_items() {
        let mut report = AreaReport::new(3);
        report.add_item(ItemCount::new("coin", 2));
        report.add_item(ItemCount::new("key", 1));
        report.add_item(ItemCount::new("coin", 1));

        assert_eq!(report.count_of("coin"), 3);
        assert!(report.remove_item(&ItemCount::new("coin", 2)));
        assert!(!report.remove_item(&ItemCount::new("crystal", 1)));
        assert_eq!(report.count_of("coin"), 1);
        assert_eq!(report.items().len(), 2);

        let summary = report.summary();
        assert_eq!(summary.area_id, 3);
        assert!(summary.marker_id.is_none());
    }

    /// Simulation with two markers on the floor below area 2.
    fn area_2_sim() -> SimClient {
        let mut params = SimParams::default();
        params.initial_position_m = [10.0, -9.0, 4.5];
        params.markers = vec![
            SimMarker {
                id: 102,
                position_m: [10.95, -8.8, 3.76],
                normal: [0.0, 0.0, 1.0],
            },
            SimMarker {
                id: 101,
                position_m: [10.9, -8.95, 3.76],
                normal: [0.0, 0.0, 1.0],
            },
        ];
        params.items = vec![ItemCount::new("coin", 2)];
        SimClient::new(params)
    }

    #[test]
    fn test_survey_area() {
        let table = AreaTable::parse(TABLE).unwrap();
        let area = table.get(2).unwrap();
        let mut sim = area_2_sim();

        let report = survey_area(&mut sim, &table, area, &anchor_params()).unwrap();

        // Leftmost marker has the smallest image x, which in the XY plane is the smallest Y
        assert_eq!(report.marker.as_ref().unwrap().id, 101);

        let location = report.location.unwrap();
        assert!((location.position[0] - 10.9).abs() < 1e-9);
        assert!((location.position[1] - -8.95).abs() < 1e-9);

        let world_location = report.world_location.unwrap();
        assert_eq!(world_location, table.in_world(&location));
        assert!((world_location.position[0] - (10.9 - 9.815)).abs() < 1e-9);
        assert!((world_location.position[1] - (-8.95 + 9.806)).abs() < 1e-9);
        assert_eq!(report.summary().world_location, Some(world_location));

        assert_eq!(report.rectified.as_ref().unwrap().dimensions(), (317, 224));
        assert_eq!(report.crop.as_ref().unwrap().dimensions(), (224, 224));
        assert_eq!(report.count_of("coin"), 2);

        assert_eq!(
            sim.saved_images(),
            &[
                "area_2.png".to_string(),
                "area_2_debug_corners.png".to_string(),
                "area_2_crop.png".to_string()
            ]
        );

        // Survey move plus one move per anchor iteration
        assert_eq!(sim.move_log().len(), 3);
    }

    #[test]
    fn test_survey_without_marker() {
        let table = AreaTable::parse(TABLE).unwrap();
        let mut sim = area_2_sim();
        sim.set_markers_hidden(true);

        let report = survey_area(&mut sim, &table, table.get(2).unwrap(), &anchor_params()).unwrap();

        assert!(report.location.is_none());
        assert!(report.marker.is_none());
        assert!(report.items().is_empty());
        assert!(sim.saved_images().is_empty());
        assert_eq!(sim.move_log().len(), 1);
    }

    #[test]
    fn test_survey_move_failure() {
        let table = AreaTable::parse(TABLE).unwrap();
        let mut sim = area_2_sim();
        sim.set_move_failure(Some(MoveResponse::TimedOut));

        let r = survey_area(&mut sim, &table, table.get(2).unwrap(), &anchor_params());
        assert!(matches!(
            r,
            Err(AreaError::AnchorError(AnchorError::MoveFailed(
                _,
                MoveResponse::TimedOut
            )))
        ));
    }
}
