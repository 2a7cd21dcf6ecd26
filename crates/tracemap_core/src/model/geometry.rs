//! Vector geometry values and the derived trajectory shape.
//!
//! # Responsibility
//! - Define the 3D geometry payload carried by vector samples.
//! - Compute axis-aligned envelopes and their center points.
//! - Define the 4D `(x, y, z, t)` trajectory polyline.
//!
//! # Invariants
//! - Envelope computation fails on empty or non-finite coordinates instead
//!   of producing a degenerate box.
//! - `Trajectory` points are ordered ascending by `t`.
//!
//! # See also
//! - `model::raster` for the tile footprint that feeds the same envelope
//!   type.
//! - `trajectory` for the reduction of sample sets to trajectories.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result alias for envelope computations.
pub type GeometryResult<T> = Result<T, GeometryError>;

/// Reasons an envelope cannot be derived from a geometry value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// The geometry carries no coordinates.
    Empty,
    /// The geometry carries NaN or infinite ordinates.
    NonFinite,
}

impl Display for GeometryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "geometry has no coordinates"),
            Self::NonFinite => write!(f, "geometry has non-finite coordinates"),
        }
    }
}

impl Error for GeometryError {}

/// One position in 3D space, in the parent universe's reference system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// True when every ordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Geometry payload of a vector sample.
///
/// Serialized as a `type` tag plus a `coordinates` array, so stored values
/// stay readable in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates", rename_all = "snake_case")]
pub enum Geometry {
    Point(Point3),
    MultiPoint(Vec<Point3>),
    LineString(Vec<Point3>),
    /// Outer ring only; interior rings do not change the envelope.
    Polygon(Vec<Point3>),
}

impl Geometry {
    /// Convenience constructor for a single point.
    pub fn point(x: f64, y: f64, z: f64) -> Self {
        Self::Point(Point3::new(x, y, z))
    }

    /// Axis-aligned bounding box of the coordinates.
    pub fn envelope(&self) -> GeometryResult<Envelope> {
        let coordinates = match self {
            Self::Point(point) => std::slice::from_ref(point),
            Self::MultiPoint(points) | Self::LineString(points) | Self::Polygon(points) => {
                points.as_slice()
            }
        };
        Envelope::of_points(coordinates)
    }
}

/// Axis-aligned bounding box of a geometry or a raster footprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min: Point3,
    pub max: Point3,
}

impl Envelope {
    /// Smallest box containing every point.
    ///
    /// # Contract
    /// - Fails with `GeometryError::Empty` on an empty slice.
    /// - Fails with `GeometryError::NonFinite` if any ordinate is NaN or
    ///   infinite.
    pub fn of_points(points: &[Point3]) -> GeometryResult<Self> {
        let (first, rest) = points.split_first().ok_or(GeometryError::Empty)?;
        if points.iter().any(|point| !point.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        let mut envelope = Self { min: *first, max: *first };
        for point in rest {
            envelope.min.x = envelope.min.x.min(point.x);
            envelope.min.y = envelope.min.y.min(point.y);
            envelope.min.z = envelope.min.z.min(point.z);
            envelope.max.x = envelope.max.x.max(point.x);
            envelope.max.y = envelope.max.y.max(point.y);
            envelope.max.z = envelope.max.z.max(point.z);
        }
        Ok(envelope)
    }

    /// Midpoint of the box on each spatial axis.
    pub fn center(&self) -> Point3 {
        Point3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }
}

/// One vertex of a trajectory: a representative position plus its tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Tick in the parent universe's time unit.
    pub t: i64,
}

impl TrajectoryPoint {
    pub fn new(position: Point3, t: i64) -> Self {
        Self { x: position.x, y: position.y, z: position.z, t }
    }
}

/// Derived 4D polyline summarizing a parent's samples over time.
///
/// Owned by the trajectory materializer; catalog writes never touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn new(points: Vec<TrajectoryPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
