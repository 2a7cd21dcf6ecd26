//! Coverage and relationship records.
//!
//! # Responsibility
//! - Define the named observation series samples can attach to.
//! - Define the typed link between a coverage and a spatial thing.
//!
//! # Invariants
//! - `trajectory` is derived state owned by the materializer; catalog
//!   updates never persist it.
//! - A relationship requires both endpoints to exist and follows their
//!   deletion.

use crate::model::geometry::Trajectory;
use crate::model::thing::ThingId;
use crate::model::universe::UniverseId;
use crate::model::PropertyMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a coverage.
pub type CoverageId = Uuid;

/// Stable identifier of a relationship.
pub type RelationshipId = Uuid;

/// A named series of observations over a region of a universe, e.g. one
/// sensor's output or one survey campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub uuid: CoverageId,
    pub universe: UniverseId,
    pub name: String,
    pub description: String,
    pub links: Vec<String>,
    /// Free-form descriptive map; sample-level signals live in the samples
    /// themselves.
    pub metadata: PropertyMap,
    /// Derived 4D polyline over this coverage's live samples; absent while
    /// it has none.
    pub trajectory: Option<Trajectory>,
}

impl Coverage {
    /// New coverage with a generated identity.
    pub fn new(universe: UniverseId) -> Self {
        Self::with_id(Uuid::new_v4(), universe)
    }

    /// New coverage with a caller-provided identity, for import paths.
    pub fn with_id(uuid: CoverageId, universe: UniverseId) -> Self {
        Self {
            uuid,
            universe,
            name: String::new(),
            description: String::new(),
            links: Vec::new(),
            metadata: PropertyMap::new(),
            trajectory: None,
        }
    }
}

/// An association between a coverage and a spatial thing, carrying its own
/// property map (e.g. a confidence score for "this coverage describes that
/// thing").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub uuid: RelationshipId,
    pub coverage: CoverageId,
    pub thing: ThingId,
    pub properties: PropertyMap,
}

impl Relationship {
    /// New relationship with a generated identity.
    pub fn new(coverage: CoverageId, thing: ThingId) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            coverage,
            thing,
            properties: PropertyMap::new(),
        }
    }
}
