//! Raster tile values embedded in raster samples.
//!
//! # Responsibility
//! - Define the multi-band tile payload and its band metadata.
//! - Compute the planar footprint envelope used by trajectory assembly.
//!
//! # Invariants
//! - Band cell data is opaque here; only band count, pixel type and
//!   footprint participate in validation and materialization.
//! - Footprint ordinates must be finite.

use crate::model::geometry::{Envelope, GeometryResult, Point3};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Storage type of one raster band's cells.
///
/// Wire names keep the pixel-type codes the source datasets use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelType {
    #[serde(rename = "1BB")]
    Bit1,
    #[serde(rename = "8BUI")]
    UInt8,
    #[serde(rename = "16BSI")]
    Int16,
    #[serde(rename = "16BUI")]
    UInt16,
    #[serde(rename = "32BSI")]
    Int32,
    #[serde(rename = "32BUI")]
    UInt32,
    #[serde(rename = "32BF")]
    Float32,
    #[serde(rename = "64BF")]
    Float64,
}

impl PixelType {
    /// Wire code of the pixel type, e.g. `8BUI`.
    pub fn code(self) -> &'static str {
        match self {
            Self::Bit1 => "1BB",
            Self::UInt8 => "8BUI",
            Self::Int16 => "16BSI",
            Self::UInt16 => "16BUI",
            Self::Int32 => "32BSI",
            Self::UInt32 => "32BUI",
            Self::Float32 => "32BF",
            Self::Float64 => "64BF",
        }
    }

    /// True for the one-bit mask type required of pure-extent tiles.
    pub fn is_single_bit(self) -> bool {
        self == Self::Bit1
    }
}

impl Display for PixelType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One band of a raster tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterBand {
    /// Storage type of the band's cells.
    pub pixel_type: PixelType,
    /// Cell value marking "no data", when the band has one.
    pub nodata: Option<f64>,
    /// Packed cells, row-major. Opaque to the core.
    #[serde(default)]
    pub data: Vec<u8>,
}

impl RasterBand {
    pub fn new(pixel_type: PixelType) -> Self {
        Self { pixel_type, nodata: None, data: Vec::new() }
    }

    /// One-bit mask band, the shape used by pure-extent tiles.
    pub fn mask() -> Self {
        Self::new(PixelType::Bit1)
    }
}

/// Embedded multi-band tile carried by a raster sample.
///
/// `origin` anchors the tile in world coordinates; `scale_x`/`scale_y` are
/// the world size of one cell and carry the axis direction in their sign
/// (north-up imagery has a negative `scale_y`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterTile {
    pub origin: Point3,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Cell columns.
    pub width: u32,
    /// Cell rows.
    pub height: u32,
    pub bands: Vec<RasterBand>,
}

impl RasterTile {
    pub fn new(
        origin: Point3,
        scale_x: f64,
        scale_y: f64,
        width: u32,
        height: u32,
        bands: Vec<RasterBand>,
    ) -> Self {
        Self { origin, scale_x, scale_y, width, height, bands }
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Planar footprint of the tile, flat at the origin's `z`.
    pub fn footprint(&self) -> GeometryResult<Envelope> {
        let far = Point3::new(
            self.origin.x + self.scale_x * f64::from(self.width),
            self.origin.y + self.scale_y * f64::from(self.height),
            self.origin.z,
        );
        Envelope::of_points(&[self.origin, far])
    }
}
