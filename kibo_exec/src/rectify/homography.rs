//! Four point plane to plane homography

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Homogeneous scales smaller than this are treated as points at infinity.
const MIN_HOMOGENEOUS_SCALE: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A projective transform between two planes, normalised so that `h[(2, 2)] = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(Matrix3<f64>);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Homography {
    /// Solve the homography mapping each `src[i]` onto `dst[i]`.
    ///
    /// Returns `None` if the correspondences are degenerate (for instance three collinear
    /// points), in which case no unique transform exists.
    pub fn from_correspondences(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) -> Option<Self> {
        // With h22 fixed to 1 each correspondence gives two linear equations in the other eight
        // coefficients:
        //
        //   u = (h00 x + h01 y + h02) / (h20 x + h21 y + 1)
        //   v = (h10 x + h11 y + h12) / (h20 x + h21 y + 1)
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for i in 0..4 {
            let [x, y] = src[i];
            let [u, v] = dst[i];

            let r = 2 * i;
            a[(r, 0)] = x;
            a[(r, 1)] = y;
            a[(r, 2)] = 1.0;
            a[(r, 6)] = -u * x;
            a[(r, 7)] = -u * y;
            b[r] = u;

            a[(r + 1, 3)] = x;
            a[(r + 1, 4)] = y;
            a[(r + 1, 5)] = 1.0;
            a[(r + 1, 6)] = -v * x;
            a[(r + 1, 7)] = -v * y;
            b[r + 1] = v;
        }

        let lu = a.lu();
        if !lu.is_invertible() {
            return None;
        }
        let h = lu.solve(&b)?;

        if !h.iter().all(|c| c.is_finite()) {
            return None;
        }

        let m = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);

        // Collinear inputs can leave a tiny but non-zero pivot, so also reject singular results
        if m.determinant().abs() < f64::EPSILON {
            return None;
        }

        Some(Self(m))
    }

    /// Map a point through the homography, `None` if it maps to infinity.
    pub fn project(&self, p: [f64; 2]) -> Option<[f64; 2]> {
        let q = self.0 * Vector3::new(p[0], p[1], 1.0);

        if q[2].abs() < MIN_HOMOGENEOUS_SCALE {
            return None;
        }

        Some([q[0] / q[2], q[1] / q[2]])
    }

    /// Map each of the four points through the homography.
    pub fn project_quad(&self, points: &[[f64; 2]; 4]) -> Option<[[f64; 2]; 4]> {
        Some([
            self.project(points[0])?,
            self.project(points[1])?,
            self.project(points[2])?,
            self.project(points[3])?,
        ])
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    /// Row-major single precision coefficients, the layout used by the image warping routines.
    pub fn to_row_major_f32(&self) -> [f32; 9] {
        let m = &self.0;
        [
            m[(0, 0)] as f32,
            m[(0, 1)] as f32,
            m[(0, 2)] as f32,
            m[(1, 0)] as f32,
            m[(1, 1)] as f32,
            m[(1, 2)] as f32,
            m[(2, 0)] as f32,
            m[(2, 1)] as f32,
            m[(2, 2)] as f32,
        ]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_maps(h: &Homography, src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) {
        for (s, d) in src.iter().zip(dst.iter()) {
            let p = h.project(*s).unwrap();
            assert_abs_diff_eq!(p[0], d[0], epsilon = 1e-6);
            assert_abs_diff_eq!(p[1], d[1], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_scale_and_translate() {
        let src = [[0.0, 0.0], [5.0, 0.0], [5.0, 5.0], [0.0, 5.0]];
        let dst = [[400.0, 300.0], [500.0, 300.0], [500.0, 400.0], [400.0, 400.0]];

        let h = Homography::from_correspondences(&src, &dst).unwrap();
        assert_maps(&h, &src, &dst);

        // Points off the marker follow the same affine map
        let p = h.project([-22.1, -4.25]).unwrap();
        assert_abs_diff_eq!(p[0], 400.0 - 442.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p[1], 300.0 - 85.0, epsilon = 1e-6);
    }

    #[test]
    fn test_perspective() {
        let src = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let dst = [[10.0, 12.0], [95.0, 20.0], [80.0, 70.0], [15.0, 90.0]];

        let h = Homography::from_correspondences(&src, &dst).unwrap();
        assert_maps(&h, &src, &dst);
        assert_eq!(h.matrix()[(2, 2)], 1.0);

        // Inverse direction
        let inv = Homography::from_correspondences(&dst, &src).unwrap();
        for s in src.iter() {
            let p = inv.project(h.project(*s).unwrap()).unwrap();
            assert_abs_diff_eq!(p[0], s[0], epsilon = 1e-9);
            assert_abs_diff_eq!(p[1], s[1], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_degenerate() {
        let src = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0]];
        let dst = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        assert!(Homography::from_correspondences(&src, &dst).is_none());

        let same = [[4.0, 4.0]; 4];
        assert!(Homography::from_correspondences(&same, &dst).is_none());
    }

    #[test]
    fn test_row_major() {
        let src = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let dst = [[3.0, 7.0], [5.0, 7.0], [5.0, 9.0], [3.0, 9.0]];
        let h = Homography::from_correspondences(&src, &dst).unwrap();

        let m = h.to_row_major_f32();
        assert_abs_diff_eq!(m[0], 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(m[2], 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(m[4], 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(m[5], 7.0, epsilon = 1e-5);
        assert_abs_diff_eq!(m[8], 1.0, epsilon = 1e-5);
    }
}
