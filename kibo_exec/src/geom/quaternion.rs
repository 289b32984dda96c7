//! Quaternion value type with the group and Lie group operations used by the controllers
//!
//! Quaternions are stored as `nalgebra::Quaternion<f64>` but wrapped so that degenerate inputs
//! (zero norm, zero vector part) produce sentinel values instead of `NaN`s. Components are always
//! given and reported in `(x, y, z, w)` order, matching the kinematics boundary.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt;
use std::ops::Mul;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::{vector::normalize_or_zero, ControlValue};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// An immutable quaternion.
///
/// Unit quaternions represent rotations, non-unit ones turn up as intermediate values of the
/// controllers (for instance the scaled logarithm of an error).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quaternion(nalgebra::Quaternion<f64>);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Quaternion {
    /// Create a new quaternion from its components.
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self(nalgebra::Quaternion::new(w, x, y, z))
    }

    /// Create a quaternion from an `[x, y, z, w]` array.
    pub fn from_xyzw(q: [f64; 4]) -> Self {
        Self::new(q[0], q[1], q[2], q[3])
    }

    /// Create a quaternion from a real part and a vector part.
    pub fn from_parts(w: f64, v: &Vector3<f64>) -> Self {
        Self(nalgebra::Quaternion::from_parts(w, *v))
    }

    /// The identity rotation `(0, 0, 0, 1)`.
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// The zero quaternion, used as the result of degenerate operations.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Unit rotation of `angle` radians around `axis`.
    ///
    /// The axis is normalised first, a zero axis gives a pure real quaternion.
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Self {
        Self::from_scaled_axis_angle(1.0, axis, angle)
    }

    /// Rotation of `angle` radians around `axis` scaled by `radius`.
    pub fn from_scaled_axis_angle(radius: f64, axis: &Vector3<f64>, angle: f64) -> Self {
        let half = 0.5 * angle;
        let axis = normalize_or_zero(axis);

        Self::from_parts(radius * half.cos(), &(axis * (radius * half.sin())))
    }

    pub fn x(&self) -> f64 {
        self.0.i
    }

    pub fn y(&self) -> f64 {
        self.0.j
    }

    pub fn z(&self) -> f64 {
        self.0.k
    }

    pub fn w(&self) -> f64 {
        self.0.w
    }

    /// Components as an `[x, y, z, w]` array.
    pub fn to_xyzw(&self) -> [f64; 4] {
        [self.x(), self.y(), self.z(), self.w()]
    }

    pub fn real_part(&self) -> f64 {
        self.0.w
    }

    pub fn vector_part(&self) -> Vector3<f64> {
        self.0.imag()
    }

    /// Squared norm.
    pub fn quad(&self) -> f64 {
        self.0.norm_squared()
    }

    pub fn norm(&self) -> f64 {
        self.0.norm()
    }

    /// Multiply all four components by `s`.
    pub fn scale(&self, s: f64) -> Self {
        Self(self.0 * s)
    }

    pub fn conjugate(&self) -> Self {
        Self(self.0.conjugate())
    }

    /// Unit quaternion in the same direction, or the zero quaternion if the norm is zero.
    pub fn normalize(&self) -> Self {
        let norm = self.norm();

        if norm == 0.0 {
            Self::zero()
        } else {
            self.scale(1.0 / norm)
        }
    }

    /// Multiplicative inverse, or the zero quaternion if the norm is zero.
    pub fn inverse(&self) -> Self {
        let quad = self.quad();

        if quad == 0.0 {
            Self::zero()
        } else {
            self.conjugate().scale(1.0 / quad)
        }
    }

    /// Right division, `self * h^-1`.
    pub fn rdiv(&self, h: &Self) -> Self {
        *self * h.inverse()
    }

    /// Left division, `h^-1 * self`.
    pub fn ldiv(&self, h: &Self) -> Self {
        h.inverse() * *self
    }

    /// Conjugate `h` by this quaternion, `self * h * self^-1`.
    pub fn transform(&self, h: &Self) -> Self {
        *self * *h * self.inverse()
    }

    /// Rotate a vector by this quaternion.
    pub fn rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.transform(&Self::from_parts(0.0, v)).vector_part()
    }

    /// Logarithm `(theta * axis, ln|q|)`.
    ///
    /// A zero quaternion maps to the zero quaternion and a pure real quaternion maps to
    /// `(0, 0, 0, ln|w|)`.
    pub fn log(&self) -> Self {
        let q_norm = self.norm();
        if q_norm == 0.0 {
            return Self::zero();
        }

        let v = self.vector_part();
        if v.norm() == 0.0 {
            return Self::new(0.0, 0.0, 0.0, self.w().abs().ln());
        }

        // Rounding can push the ratio just outside of acos' domain
        let theta = (self.w() / q_norm).clamp(-1.0, 1.0).acos();

        Self::from_parts(q_norm.ln(), &(normalize_or_zero(&v) * theta))
    }

    /// Exponential, the inverse of [`Quaternion::log`].
    pub fn exp(&self) -> Self {
        let v = self.vector_part();
        let v_norm = v.norm();
        let e_w = self.w().exp();

        if v_norm == 0.0 {
            return Self::new(0.0, 0.0, 0.0, e_w);
        }

        Self::from_parts(e_w * v_norm.cos(), &(v * (e_w * v_norm.sin() / v_norm)))
    }

    /// Real power `exp(t * log(q))`.
    ///
    /// The zero quaternion stays zero for every exponent.
    pub fn power(&self, t: f64) -> Self {
        if self.quad() == 0.0 {
            return Self::zero();
        }

        self.log().scale(t).exp()
    }

    /// Convert into a unit `nalgebra` rotation, `None` for the zero quaternion.
    pub fn to_unit(&self) -> Option<nalgebra::UnitQuaternion<f64>> {
        nalgebra::UnitQuaternion::try_new(self.0, 0.0)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Quaternion {
    type Output = Quaternion;

    /// Hamilton product.
    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}

impl From<[f64; 4]> for Quaternion {
    fn from(q: [f64; 4]) -> Self {
        Self::from_xyzw(q)
    }
}

impl From<Quaternion> for [f64; 4] {
    fn from(q: Quaternion) -> Self {
        q.to_xyzw()
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Quaternion[x={:.3}, y={:.3}, z={:.3}, w={:.3}]",
            self.x(),
            self.y(),
            self.z(),
            self.w()
        )
    }
}

/// Quaternions as rotations: magnitude is the size of the vector part, gain is the real power,
/// absolute is left multiplication and relative is right division.
impl ControlValue for Quaternion {
    fn identity() -> Self {
        Quaternion::identity()
    }

    fn magnitude(&self) -> f64 {
        self.vector_part().norm()
    }

    fn gain(&self, rate: f64) -> Self {
        self.power(rate)
    }

    fn absolute(&self, target: &Self) -> Self {
        *self * *target
    }

    fn relative(&self, origin: &Self) -> Self {
        self.rdiv(origin)
    }
}
