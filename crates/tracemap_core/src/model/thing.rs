//! Spatial thing records.
//!
//! # Responsibility
//! - Define the identified-phenomenon record samples can attach to.
//!
//! # Invariants
//! - `trajectory` is derived state owned by the materializer; catalog
//!   updates never persist it.

use crate::model::geometry::Trajectory;
use crate::model::universe::UniverseId;
use crate::model::PropertyMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a spatial thing.
pub type ThingId = Uuid;

/// An identified phenomenon with spatial extent, e.g. a vehicle or a
/// storm cell, tracked within one universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialThing {
    pub uuid: ThingId,
    pub universe: UniverseId,
    pub name: String,
    pub description: String,
    pub links: Vec<String>,
    pub properties: PropertyMap,
    /// Derived 4D polyline over this thing's live samples; absent while it
    /// has none.
    pub trajectory: Option<Trajectory>,
}

impl SpatialThing {
    /// New thing with a generated identity.
    pub fn new(universe: UniverseId) -> Self {
        Self::with_id(Uuid::new_v4(), universe)
    }

    /// New thing with a caller-provided identity, for import paths.
    pub fn with_id(uuid: ThingId, universe: UniverseId) -> Self {
        Self {
            uuid,
            universe,
            name: String::new(),
            description: String::new(),
            links: Vec::new(),
            properties: PropertyMap::new(),
            trajectory: None,
        }
    }
}
