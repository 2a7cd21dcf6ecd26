//! Trajectory assembly from live sample sets.
//!
//! # Responsibility
//! - Reduce a parent's live samples to its 4D trajectory polyline.
//! - Surface envelope failures so the triggering write can be rolled back.
//!
//! # Invariants
//! - Output depends only on the sample set: points are ordered ascending
//!   by timestamp, never by insertion order.
//! - A failure for any one sample fails the whole computation; no partial
//!   trajectory is produced.
//! - Cost is linear in the number of live samples, plus the sort.
//!
//! # See also
//! - `service::sample_service` for when this runs and how failures roll
//!   back the triggering write.

use crate::model::geometry::{GeometryError, Trajectory, TrajectoryPoint};
use crate::model::sample::{Sample, SampleId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result alias for trajectory assembly.
pub type MaterializeResult<T> = Result<T, MaterializeError>;

/// Reasons a trajectory cannot be derived from committed samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeError {
    /// Envelope computation failed for one sample's payload.
    Envelope { sample: SampleId, source: GeometryError },
    /// A row carries no payload at all; only possible for rows written
    /// outside the sample write path.
    PayloadMissing { sample: SampleId },
}

impl Display for MaterializeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Envelope { sample, source } => {
                write!(f, "cannot derive a trajectory point for sample {sample}: {source}")
            }
            Self::PayloadMissing { sample } => {
                write!(f, "sample {sample} has no payload to derive a trajectory point from")
            }
        }
    }
}

impl Error for MaterializeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Envelope { source, .. } => Some(source),
            Self::PayloadMissing { .. } => None,
        }
    }
}

/// Builds the trajectory polyline for one parent's live samples.
///
/// # Contract
/// - `samples` is one parent's full live set, in any order.
/// - Returns `Ok(None)` for an empty set: the parent's trajectory becomes
///   absent, not an empty polyline.
/// - Each point is the bounding-box center of one sample's payload, with
///   the sample's tick as the fourth ordinate; points are sorted ascending
///   by tick.
pub fn build_trajectory(samples: &[Sample]) -> MaterializeResult<Option<Trajectory>> {
    if samples.is_empty() {
        return Ok(None);
    }

    let mut ordered: Vec<&Sample> = samples.iter().collect();
    ordered.sort_by_key(|sample| sample.timestamp);

    let mut points = Vec::with_capacity(ordered.len());
    for sample in ordered {
        points.push(representative_point(sample)?);
    }
    Ok(Some(Trajectory::new(points)))
}

/// One sample's 4D trajectory vertex: payload envelope center plus tick.
fn representative_point(sample: &Sample) -> MaterializeResult<TrajectoryPoint> {
    let envelope = if let Some(geometry) = &sample.geometry {
        geometry.envelope()
    } else if let Some(tile) = &sample.tile {
        tile.footprint()
    } else {
        return Err(MaterializeError::PayloadMissing { sample: sample.uuid });
    };

    let envelope =
        envelope.map_err(|source| MaterializeError::Envelope { sample: sample.uuid, source })?;
    Ok(TrajectoryPoint::new(envelope.center(), sample.timestamp))
}
