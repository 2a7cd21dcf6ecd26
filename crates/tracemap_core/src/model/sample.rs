//! Sample records and their parent discriminator.
//!
//! # Responsibility
//! - Define one observation row with its nullable payload halves.
//! - Classify payload kind by field presence, without judging validity.
//!
//! # Invariants
//! - Which field combinations may commit is decided by the constraint
//!   engine, not here; drafts may be deliberately malformed so rejections
//!   can be exercised.
//! - A committed row belongs to exactly one parent.
//!
//! # See also
//! - `constraint` for the rules a row must pass before commit.

use crate::model::coverage::CoverageId;
use crate::model::geometry::Geometry;
use crate::model::raster::RasterTile;
use crate::model::thing::ThingId;
use crate::model::PropertyMap;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a sample.
pub type SampleId = Uuid;

/// Parent a sample attaches to: a coverage or a spatial thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "uuid", rename_all = "snake_case")]
pub enum ParentRef {
    Coverage(CoverageId),
    Thing(ThingId),
}

impl ParentRef {
    pub fn uuid(self) -> Uuid {
        match self {
            Self::Coverage(id) | Self::Thing(id) => id,
        }
    }

    /// Short label for log lines.
    pub fn kind_name(self) -> &'static str {
        match self {
            Self::Coverage(_) => "coverage",
            Self::Thing(_) => "thing",
        }
    }
}

impl Display for ParentRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coverage(id) => write!(f, "coverage {id}"),
            Self::Thing(id) => write!(f, "spatial thing {id}"),
        }
    }
}

/// Payload representation of a committed sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Vector,
    Raster,
}

impl Display for PayloadKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vector => write!(f, "vector"),
            Self::Raster => write!(f, "raster"),
        }
    }
}

/// One observation of a parent at a timestamp.
///
/// Carries either a vector payload (`geometry` + `properties`) or a raster
/// payload (`tile` + `attributes`); all four fields are optional so that
/// invalid drafts can exist long enough to be rejected with a reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub uuid: SampleId,
    pub parent: ParentRef,
    /// Tick in the parent universe's time unit.
    pub timestamp: i64,
    /// Vector payload: the observed shape.
    pub geometry: Option<Geometry>,
    /// Vector payload: signal values keyed by name.
    pub properties: Option<PropertyMap>,
    /// Raster payload: the embedded multi-band tile.
    pub tile: Option<RasterTile>,
    /// Raster payload: one signal name per band, in band order.
    pub attributes: Option<Vec<String>>,
}

impl Sample {
    /// Empty draft; payload fields start unset.
    pub fn new(parent: ParentRef, timestamp: i64) -> Self {
        Self::with_id(Uuid::new_v4(), parent, timestamp)
    }

    /// Empty draft with a caller-provided identity.
    pub fn with_id(uuid: SampleId, parent: ParentRef, timestamp: i64) -> Self {
        Self {
            uuid,
            parent,
            timestamp,
            geometry: None,
            properties: None,
            tile: None,
            attributes: None,
        }
    }

    /// Vector sample draft.
    pub fn vector(
        parent: ParentRef,
        timestamp: i64,
        geometry: Geometry,
        properties: PropertyMap,
    ) -> Self {
        let mut sample = Self::new(parent, timestamp);
        sample.geometry = Some(geometry);
        sample.properties = Some(properties);
        sample
    }

    /// Raster sample draft with per-band attribute names.
    pub fn raster(
        parent: ParentRef,
        timestamp: i64,
        tile: RasterTile,
        attributes: Vec<String>,
    ) -> Self {
        let mut sample = Self::new(parent, timestamp);
        sample.tile = Some(tile);
        sample.attributes = Some(attributes);
        sample
    }

    /// Pure-extent raster draft: a mask tile with no attribute names.
    pub fn extent(parent: ParentRef, timestamp: i64, tile: RasterTile) -> Self {
        let mut sample = Self::new(parent, timestamp);
        sample.tile = Some(tile);
        sample
    }

    /// Payload classification by field presence.
    ///
    /// `None` when the draft is malformed (both or neither payload set);
    /// such rows never pass validation.
    pub fn payload_kind(&self) -> Option<PayloadKind> {
        match (self.geometry.is_some(), self.tile.is_some()) {
            (true, false) => Some(PayloadKind::Vector),
            (false, true) => Some(PayloadKind::Raster),
            _ => None,
        }
    }
}
