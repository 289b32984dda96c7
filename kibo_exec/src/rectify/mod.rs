//! # Rectification module
//!
//! Rectifies a printed rectangular target into a fronto-parallel raster using a single fiducial
//! marker printed at a known position on it.
//!
//! The marker's four detected corners give the homography from marker-local centimetres to image
//! pixels. The target's corners, expressed in the same marker-local frame, are pushed through it
//! to find where the target lies in the image, and the image is then warped so that those corners
//! land on the corners of a raster with the target's aspect ratio.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod homography;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use image::{imageops, GrayImage, Luma};
use imageproc::{
    drawing::{draw_hollow_circle_mut, draw_line_segment_mut},
    geometric_transformations::{warp_into, Interpolation, Projection},
};
use log::{debug, info, warn};
use serde::Deserialize;

// Internal
use comms_if::eqpt::{cam::Corner, MarkerObservation};
pub use homography::Homography;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Landscape A4 sheet carrying a 5 cm marker whose top-left corner is 22.1 cm right and 4.25 cm
/// down from the sheet's top-left corner.
pub const A4_LANDSCAPE: TargetGeometry = TargetGeometry {
    marker_side_cm: 5.0,
    width_cm: 29.7,
    height_cm: 21.0,
    marker_offset_cm: [22.1, 4.25],
    fixed_side_px: 224,
};

/// Side length of the square cut from the rectified target for classification.
///
/// Units: pixels
pub const CROP_SIDE_PX: u32 = 224;

/// Radius of the corner circles drawn on the debug image.
const DEBUG_CORNER_RADIUS_PX: i32 = 10;

/// Intensity of each corner (and the edge leaving it) on the debug image.
const DEBUG_CORNER_LUMA: [u8; 4] = [255, 200, 150, 100];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Physical layout of a rectangular target with a marker printed on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetGeometry {
    /// Side length of the square marker
    ///
    /// Units: centimeters
    pub marker_side_cm: f64,

    /// Width of the target
    ///
    /// Units: centimeters
    pub width_cm: f64,

    /// Height of the target
    ///
    /// Units: centimeters
    pub height_cm: f64,

    /// Position of the marker's top-left corner measured from the target's top-left corner
    ///
    /// Units: centimeters
    pub marker_offset_cm: [f64; 2],

    /// Length of the fixed side of the rectified raster
    ///
    /// Units: pixels
    pub fixed_side_px: u32,
}

/// A rectified target.
#[derive(Debug, Clone)]
pub struct Rectified {
    /// The fronto-parallel raster of the target
    pub image: GrayImage,

    /// Scale of the marker in the source image
    pub pixels_per_cm: f64,

    /// Corners of the target in the source image (top-left, top-right, bottom-right,
    /// bottom-left)
    ///
    /// Units: pixels
    pub target_corners_px: [[f64; 2]; 4],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which side of the rectified raster is fixed to `TargetGeometry::fixed_side_px`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RasterSide {
    /// The short side is fixed, the long side is scaled by the aspect ratio
    Short,

    /// The long side is fixed, the short side is scaled down by the aspect ratio
    Long,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RasterSide {
    fn default() -> Self {
        RasterSide::Short
    }
}

impl TargetGeometry {
    /// Ratio of the target's width to its height.
    pub fn aspect(&self) -> f64 {
        self.width_cm / self.height_cm
    }

    /// Corners of the target in marker-local centimetres (origin at the marker's top-left corner),
    /// in the order top-left, top-right, bottom-right, bottom-left.
    pub fn target_corners_cm(&self) -> [[f64; 2]; 4] {
        let [ox, oy] = self.marker_offset_cm;

        [
            [-ox, -oy],
            [self.width_cm - ox, -oy],
            [self.width_cm - ox, self.height_cm - oy],
            [-ox, self.height_cm - oy],
        ]
    }

    /// Corners of the marker in marker-local centimetres.
    pub fn marker_corners_cm(&self) -> [[f64; 2]; 4] {
        let s = self.marker_side_cm;

        [[0.0, 0.0], [s, 0.0], [s, s], [0.0, s]]
    }

    /// Size `(width, height)` of the rectified raster.
    pub fn raster_size(&self, side: RasterSide) -> (u32, u32) {
        let fixed = self.fixed_side_px;
        let landscape = self.width_cm >= self.height_cm;

        // Length of the side which is not fixed
        let other = match side {
            RasterSide::Short => (fixed as f64 * self.long_to_short()).round() as u32,
            RasterSide::Long => (fixed as f64 / self.long_to_short()).round() as u32,
        };

        match (side, landscape) {
            (RasterSide::Short, true) | (RasterSide::Long, false) => (other, fixed),
            (RasterSide::Short, false) | (RasterSide::Long, true) => (fixed, other),
        }
    }

    fn long_to_short(&self) -> f64 {
        self.width_cm.max(self.height_cm) / self.width_cm.min(self.height_cm)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Scale of the marker in the image, from the lengths of its top and left edges.
///
/// Returns `None` if the scale is zero or not finite.
pub fn pixels_per_cm(marker: &MarkerObservation, geom: &TargetGeometry) -> Option<f64> {
    let c0 = marker.corner(Corner::TopLeft);
    let c1 = marker.corner(Corner::TopRight);
    let c3 = marker.corner(Corner::BottomLeft);

    let width_px = (c1[0] - c0[0]).hypot(c1[1] - c0[1]);
    let height_px = (c3[0] - c0[0]).hypot(c3[1] - c0[1]);

    let ppcm = (width_px + height_px) / (2.0 * geom.marker_side_cm);

    if ppcm == 0.0 || !ppcm.is_finite() {
        None
    } else {
        Some(ppcm)
    }
}

/// Rectify the target carrying `marker` in `image`.
///
/// Returns `None` if the marker's geometry is degenerate.
pub fn rectify(
    image: &GrayImage,
    marker: &MarkerObservation,
    geom: &TargetGeometry,
    side: RasterSide,
) -> Option<Rectified> {
    let ppcm = match pixels_per_cm(marker, geom) {
        Some(p) => p,
        None => {
            warn!("Cannot compute the pixels per cm of {}", marker);
            return None;
        }
    };
    debug!("Marker scale: {:.3} px/cm", ppcm);

    // Marker-local cm to image pixels
    let marker_to_image = match Homography::from_correspondences(
        &geom.marker_corners_cm(),
        &marker.corners_px,
    ) {
        Some(h) => h,
        None => {
            warn!("Marker corners are degenerate, cannot rectify the target");
            return None;
        }
    };

    let target_corners_px = marker_to_image.project_quad(&geom.target_corners_cm())?;
    debug!("Target corners in image: {:?}", target_corners_px);

    let (width, height) = geom.raster_size(side);
    let raster_corners = raster_corners(width, height);

    let image_to_raster = Homography::from_correspondences(&target_corners_px, &raster_corners)?;
    let projection = Projection::from_matrix(image_to_raster.to_row_major_f32())?;

    let mut out = GrayImage::new(width, height);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Luma([0]),
        &mut out,
    );

    info!("Target rectified to {}x{} px", width, height);

    Some(Rectified {
        image: out,
        pixels_per_cm: ppcm,
        target_corners_px,
    })
}

/// Copy of the source image with the rectified target's corners and outline drawn on it.
pub fn debug_image(source: &GrayImage, rectified: &Rectified) -> GrayImage {
    let mut img = source.clone();
    let corners = &rectified.target_corners_px;

    for i in 0..4 {
        let luma = Luma([DEBUG_CORNER_LUMA[i]]);
        let start = corners[i];
        let end = corners[(i + 1) % 4];

        draw_hollow_circle_mut(
            &mut img,
            (start[0].round() as i32, start[1].round() as i32),
            DEBUG_CORNER_RADIUS_PX,
            luma,
        );
        draw_line_segment_mut(
            &mut img,
            (start[0].round() as f32, start[1].round() as f32),
            (end[0].round() as f32, end[1].round() as f32),
            luma,
        );
    }

    img
}

/// Cut a `side` x `side` square from the top-left of `image`.
///
/// The region shrinks to fit smaller images. If nothing fits the image is returned uncropped.
pub fn crop(image: &GrayImage, side: u32) -> GrayImage {
    let width = side.min(image.width());
    let height = side.min(image.height());

    if width < side || height < side {
        warn!(
            "Crop region ({}x{}) exceeds the image ({}x{}), cropping {}x{}",
            side,
            side,
            image.width(),
            image.height(),
            width,
            height
        );
    }

    if width == 0 || height == 0 {
        warn!("Crop region is empty, returning the uncropped image");
        return image.clone();
    }

    imageops::crop_imm(image, 0, 0, width, height).to_image()
}

/// Corners of a `width` x `height` raster in the order top-left, top-right, bottom-right,
/// bottom-left.
fn raster_corners(width: u32, height: u32) -> [[f64; 2]; 4] {
    let w = width as f64 - 1.0;
    let h = height as f64 - 1.0;

    [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]]
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// 100 px marker with its top-left at (x, y).
    fn square_marker(x: f64, y: f64) -> MarkerObservation {
        MarkerObservation::new(
            1,
            [
                [x, y],
                [x + 100.0, y],
                [x + 100.0, y + 100.0],
                [x, y + 100.0],
            ],
        )
    }

    #[test]
    fn test_pixels_per_cm() {
        assert_eq!(
            pixels_per_cm(&square_marker(400.0, 300.0), &A4_LANDSCAPE),
            Some(20.0)
        );

        let collapsed = MarkerObservation::new(1, [[50.0, 50.0]; 4]);
        assert_eq!(pixels_per_cm(&collapsed, &A4_LANDSCAPE), None);

        let nan = MarkerObservation::new(1, [[f64::NAN, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        assert_eq!(pixels_per_cm(&nan, &A4_LANDSCAPE), None);
    }

    #[test]
    fn test_raster_size() {
        assert_abs_diff_eq!(A4_LANDSCAPE.aspect(), 29.7 / 21.0, epsilon = 1e-12);
        assert_eq!(A4_LANDSCAPE.raster_size(RasterSide::Short), (317, 224));
        assert_eq!(A4_LANDSCAPE.raster_size(RasterSide::Long), (224, 158));

        let portrait = TargetGeometry {
            width_cm: 21.0,
            height_cm: 29.7,
            ..A4_LANDSCAPE
        };
        assert_eq!(portrait.raster_size(RasterSide::Short), (224, 317));
        assert_eq!(portrait.raster_size(RasterSide::Long), (158, 224));
    }

    #[test]
    fn test_target_corners() {
        let corners = A4_LANDSCAPE.target_corners_cm();

        assert_eq!(corners[0], [-22.1, -4.25]);
        assert_abs_diff_eq!(corners[1][0], 29.7 - 22.1, epsilon = 1e-12);
        assert_abs_diff_eq!(corners[2][1], 21.0 - 4.25, epsilon = 1e-12);
        assert_eq!(corners[3][0], -22.1);
    }

    #[test]
    fn test_degenerate_marker() {
        let img = GrayImage::new(640, 480);

        let collapsed = MarkerObservation::new(1, [[50.0, 50.0]; 4]);
        assert!(rectify(&img, &collapsed, &A4_LANDSCAPE, RasterSide::Short).is_none());

        // Non-zero scale but all corners on one line
        let line = MarkerObservation::new(
            1,
            [[0.0, 0.0], [100.0, 0.0], [200.0, 0.0], [300.0, 0.0]],
        );
        assert!(rectify(&img, &line, &A4_LANDSCAPE, RasterSide::Short).is_none());
    }

    #[test]
    fn test_rectify_scenario() {
        // Bright sheet on a black background, marker drawn at 20 px/cm
        let marker = square_marker(600.0, 300.0);
        let (x0, y0) = (600.0 - 22.1 * 20.0, 300.0 - 4.25 * 20.0);
        let (x1, y1) = (x0 + 29.7 * 20.0, y0 + 21.0 * 20.0);

        let img = GrayImage::from_fn(1280, 960, |x, y| {
            let (x, y) = (x as f64, y as f64);
            if x >= x0 && x < x1 && y >= y0 && y < y1 {
                Luma([200])
            } else {
                Luma([0])
            }
        });

        let short = rectify(&img, &marker, &A4_LANDSCAPE, RasterSide::Short).unwrap();
        assert_eq!(short.image.dimensions(), (317, 224));
        assert_abs_diff_eq!(short.pixels_per_cm, 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(short.target_corners_px[0][0], x0, epsilon = 1e-6);
        assert_abs_diff_eq!(short.target_corners_px[0][1], y0, epsilon = 1e-6);
        assert_abs_diff_eq!(short.target_corners_px[2][0], x1, epsilon = 1e-6);
        assert_abs_diff_eq!(short.target_corners_px[2][1], y1, epsilon = 1e-6);
        assert_eq!(short.image.get_pixel(158, 112)[0], 200);

        let long = rectify(&img, &marker, &A4_LANDSCAPE, RasterSide::Long).unwrap();
        assert_eq!(long.image.dimensions(), (224, 158));
        assert_eq!(long.image.get_pixel(112, 79)[0], 200);
    }

    #[test]
    fn test_debug_image() {
        let img = GrayImage::new(1280, 960);
        let marker = square_marker(600.0, 300.0);
        let rectified = rectify(&img, &marker, &A4_LANDSCAPE, RasterSide::Short).unwrap();

        let dbg = debug_image(&img, &rectified);
        assert_eq!(dbg.dimensions(), img.dimensions());

        // Midpoint of the top edge lies on the outline
        let c0 = rectified.target_corners_px[0];
        let c1 = rectified.target_corners_px[1];
        let mid = (((c0[0] + c1[0]) / 2.0).round() as u32, c0[1].round() as u32);
        assert_eq!(dbg.get_pixel(mid.0, mid.1)[0], DEBUG_CORNER_LUMA[0]);

        // Source is untouched
        assert!(img.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_crop() {
        let img = GrayImage::from_fn(317, 224, |x, _| Luma([(x % 256) as u8]));
        let cropped = crop(&img, CROP_SIDE_PX);
        assert_eq!(cropped.dimensions(), (224, 224));
        assert_eq!(cropped.get_pixel(100, 5)[0], 100);

        let small = GrayImage::new(224, 158);
        assert_eq!(crop(&small, CROP_SIDE_PX).dimensions(), (224, 158));

        let empty = GrayImage::new(0, 0);
        assert_eq!(crop(&empty, CROP_SIDE_PX).dimensions(), (0, 0));
    }
}
