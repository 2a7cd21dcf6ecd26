//! Sample integrity rules.
//!
//! # Responsibility
//! - Decide whether a candidate sample may commit, given its parent's live
//!   sibling set.
//! - Produce one deterministic, human-readable rejection reason.
//!
//! # Invariants
//! - Pure function of candidate plus siblings; no storage access.
//! - Rules run in a fixed order and the first failure wins: payload
//!   exclusivity, raster band/attribute agreement, extent tile shape,
//!   vector properties, timestamp uniqueness, parent kind consistency.
//! - `siblings` must exclude the row being updated.
//!
//! # See also
//! - `service::sample_service`, the only caller on the write path.

use crate::model::raster::{PixelType, RasterTile};
use crate::model::sample::{PayloadKind, Sample};
use crate::model::PropertyMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejection reasons, ordered as the rules are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Geometry and tile are both set.
    PayloadBothPresent,
    /// Neither geometry nor tile is set.
    PayloadNeitherPresent,
    /// Attribute list disagrees with the tile's band count, or the tile
    /// has no bands at all.
    AttributeCountMismatch { band_count: usize, attribute_count: usize },
    /// Attribute-less tile is not a single-band one-bit mask.
    ExtentTileShapeInvalid { band_count: usize, pixel_type: PixelType },
    /// Vector sample lacks a non-empty property map.
    VectorPropertiesRequired,
    /// Parent already holds a live sample at this tick.
    DuplicateTimestamp { timestamp: i64 },
    /// Candidate kind differs from the kind the parent already holds.
    MixedPayloadKindForParent { existing: PayloadKind, candidate: PayloadKind },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PayloadBothPresent => {
                write!(f, "sample carries both a vector and a raster payload")
            }
            Self::PayloadNeitherPresent => {
                write!(f, "sample carries neither a vector nor a raster payload")
            }
            Self::AttributeCountMismatch { band_count, attribute_count } => write!(
                f,
                "raster tile needs one attribute per band, got {band_count} band(s) and {attribute_count} attribute(s)"
            ),
            Self::ExtentTileShapeInvalid { band_count, pixel_type } => write!(
                f,
                "extent tile must be a single-band 1BB mask, got {band_count} band(s) of type {pixel_type}"
            ),
            Self::VectorPropertiesRequired => {
                write!(f, "vector sample requires a non-empty property map")
            }
            Self::DuplicateTimestamp { timestamp } => {
                write!(f, "parent already has a sample at timestamp {timestamp}")
            }
            Self::MixedPayloadKindForParent { existing, candidate } => write!(
                f,
                "parent holds {existing} samples and cannot take a {candidate} sample"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Validates one candidate against its parent's live sibling set.
///
/// # Contract
/// - Returns the candidate's payload kind on success.
/// - Checks rules in the documented order; the first failure is returned.
/// - `siblings` is the parent's live set, minus the candidate's own row
///   when this is an update.
pub fn validate_sample(
    candidate: &Sample,
    siblings: &[Sample],
) -> Result<PayloadKind, ValidationError> {
    let kind = match (&candidate.geometry, &candidate.tile) {
        (Some(_), Some(_)) => return Err(ValidationError::PayloadBothPresent),
        (None, None) => return Err(ValidationError::PayloadNeitherPresent),
        (Some(_), None) => {
            check_vector_properties(candidate.properties.as_ref())?;
            PayloadKind::Vector
        }
        (None, Some(tile)) => {
            check_raster_shape(tile, candidate.attributes.as_deref())?;
            PayloadKind::Raster
        }
    };

    if siblings.iter().any(|sibling| sibling.timestamp == candidate.timestamp) {
        return Err(ValidationError::DuplicateTimestamp { timestamp: candidate.timestamp });
    }

    if let Some(existing) = siblings.iter().find_map(Sample::payload_kind) {
        if existing != kind {
            return Err(ValidationError::MixedPayloadKindForParent { existing, candidate: kind });
        }
    }

    Ok(kind)
}

/// Band/attribute agreement, then extent mask shape for attribute-less
/// tiles.
fn check_raster_shape(
    tile: &RasterTile,
    attributes: Option<&[String]>,
) -> Result<(), ValidationError> {
    let band_count = tile.band_count();
    let attribute_count = attributes.map_or(0, <[String]>::len);

    if band_count == 0 || (attribute_count > 0 && attribute_count != band_count) {
        return Err(ValidationError::AttributeCountMismatch { band_count, attribute_count });
    }

    if attribute_count == 0 {
        // No named signals: the tile stands for a pure spatial extent.
        let pixel_type = tile.bands[0].pixel_type;
        if band_count != 1 || !pixel_type.is_single_bit() {
            return Err(ValidationError::ExtentTileShapeInvalid { band_count, pixel_type });
        }
    }

    Ok(())
}

fn check_vector_properties(properties: Option<&PropertyMap>) -> Result<(), ValidationError> {
    match properties {
        Some(map) if !map.is_empty() => Ok(()),
        _ => Err(ValidationError::VectorPropertiesRequired),
    }
}
