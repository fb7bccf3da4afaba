//! Vector math for the orrery simulation.
//!
//! Pure functions over fixed-dimension f64 vectors: unit vectors,
//! projections, included angles, and the spherical
//! (azimuth/elevation/range) conversions used by sensors. Dimensionality
//! is a type, not a runtime value: everything is generic over [`Coord`],
//! implemented for [`DVec2`] and [`DVec3`].
//!
//! Degenerate geometry never divides by zero. Normalizing or projecting
//! onto a zero vector yields the zero vector, and the angle between
//! vectors is 0.0 when either input has zero length.

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

pub use glam::{DVec2, DVec3, dvec2, dvec3};

/// Angle convention for [`angle`], [`to_cartesian`], and [`to_polar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AngleUnit {
    /// Angles in degrees.
    #[default]
    Degrees,
    /// Angles in radians.
    Radians,
}

/// A fixed-dimension f64 vector usable by tracks, motion, and sensing.
///
/// Implemented for [`DVec2`] and [`DVec3`]; a two-dimensional simulation
/// and a three-dimensional one differ only in this type parameter.
pub trait Coord:
    Copy
    + PartialEq
    + fmt::Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + 'static
{
    /// The zero vector.
    const ZERO: Self;

    /// Euclidean length.
    fn length(self) -> f64;

    /// Euclidean distance to `other`.
    fn distance(self, other: Self) -> f64;

    /// Dot product with `other`.
    fn dot(self, other: Self) -> f64;

    /// Component-wise approximate equality within `eps`.
    fn abs_diff_eq(self, other: Self, eps: f64) -> bool;

    /// This vector in 3-space; two-dimensional vectors gain z = 0.
    fn to_vec3(self) -> DVec3;
}

impl Coord for DVec2 {
    const ZERO: Self = DVec2::ZERO;

    fn length(self) -> f64 {
        DVec2::length(self)
    }

    fn distance(self, other: Self) -> f64 {
        DVec2::distance(self, other)
    }

    fn dot(self, other: Self) -> f64 {
        DVec2::dot(self, other)
    }

    fn abs_diff_eq(self, other: Self, eps: f64) -> bool {
        DVec2::abs_diff_eq(self, other, eps)
    }

    fn to_vec3(self) -> DVec3 {
        self.extend(0.0)
    }
}

impl Coord for DVec3 {
    const ZERO: Self = DVec3::ZERO;

    fn length(self) -> f64 {
        DVec3::length(self)
    }

    fn distance(self, other: Self) -> f64 {
        DVec3::distance(self, other)
    }

    fn dot(self, other: Self) -> f64 {
        DVec3::dot(self, other)
    }

    fn abs_diff_eq(self, other: Self, eps: f64) -> bool {
        DVec3::abs_diff_eq(self, other, eps)
    }

    fn to_vec3(self) -> DVec3 {
        self
    }
}

/// Unit vector of `v`, or the zero vector when `v` has zero length.
pub fn unit<V: Coord>(v: V) -> V {
    let len = v.length();
    if len > 0.0 { v / len } else { V::ZERO }
}

/// Projection of `v` onto `onto`, or the zero vector when `onto` is zero.
pub fn proj<V: Coord>(v: V, onto: V) -> V {
    let axis = unit(onto);
    axis * v.dot(axis)
}

/// Included angle between `a` and `b`.
///
/// Returns 0.0 when either input has zero length. The cosine is clamped
/// to [-1, 1] so float rounding near parallel vectors cannot produce NaN.
pub fn angle<V: Coord>(a: V, b: V, unit_kind: AngleUnit) -> f64 {
    let (la, lb) = (a.length(), b.length());
    if la <= 0.0 || lb <= 0.0 {
        return 0.0;
    }
    let radians = (a.dot(b) / la / lb).clamp(-1.0, 1.0).acos();
    match unit_kind {
        AngleUnit::Degrees => radians.to_degrees(),
        AngleUnit::Radians => radians,
    }
}

/// An azimuth/elevation/range triple about some origin.
///
/// Azimuth is measured from +Y toward +X (compass convention), elevation
/// from the XY plane toward +Z.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Polar {
    /// Azimuth angle from +Y toward +X.
    pub azimuth: f64,
    /// Elevation angle above the XY plane.
    pub elevation: f64,
    /// Straight-line distance from the origin.
    pub range: f64,
}

impl Polar {
    /// Create a measurement from its components.
    pub fn new(azimuth: f64, elevation: f64, range: f64) -> Self {
        Self {
            azimuth,
            elevation,
            range,
        }
    }
}

/// Convert a spherical measurement about `center` into cartesian space.
pub fn to_cartesian(polar: Polar, center: DVec3, unit_kind: AngleUnit) -> DVec3 {
    let (az, el) = match unit_kind {
        AngleUnit::Degrees => (polar.azimuth.to_radians(), polar.elevation.to_radians()),
        AngleUnit::Radians => (polar.azimuth, polar.elevation),
    };
    let z = polar.range * el.sin();
    let flat = polar.range * el.cos();
    DVec3::new(flat * az.sin(), flat * az.cos(), z) + center
}

/// Convert a cartesian position into a spherical measurement about
/// `center`.
///
/// Azimuth in degrees is normalized to [0, 360); in radians it is the raw
/// `atan2` result. A zero-range input yields an all-zero measurement.
pub fn to_polar(v: DVec3, center: DVec3, unit_kind: AngleUnit) -> Polar {
    let rel = v - center;
    let range = rel.length();
    if range <= 0.0 {
        return Polar::default();
    }
    let azimuth = rel.x.atan2(rel.y);
    let elevation = rel.z.atan2(rel.truncate().length());
    match unit_kind {
        AngleUnit::Degrees => Polar::new(
            azimuth.to_degrees().rem_euclid(360.0),
            elevation.to_degrees(),
            range,
        ),
        AngleUnit::Radians => Polar::new(azimuth, elevation, range),
    }
}
