//! Universe and time-unit records.
//!
//! # Responsibility
//! - Define the partition record that scopes every other entity.
//! - Define the lookup record naming a universe's tick semantics.
//!
//! # Invariants
//! - `uuid` identity is immutable once created.
//! - `time_unit` names a registered `TimeUnit`; sample timestamps are
//!   ticks in that unit.

use crate::model::PropertyMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a universe.
pub type UniverseId = Uuid;

/// Named unit of the integer timeline a universe runs on.
///
/// Universes reference time units by name; a referenced unit can never be
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeUnit {
    /// Unique unit name, e.g. `seconds` or `frames`.
    pub name: String,
    pub description: String,
    /// External documentation URLs.
    pub links: Vec<String>,
}

impl TimeUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: String::new(), links: Vec::new() }
    }
}

/// A bounded world that partitions space and time for its entities.
///
/// May describe the real world or a simulated one. The optional epoch
/// relates its tick zero to wall-clock time; the optional `srid` names the
/// spatial reference system of its coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub uuid: UniverseId,
    /// Name of the `TimeUnit` defining tick semantics for this universe.
    pub time_unit: String,
    /// Wall-clock instant of tick zero, in epoch milliseconds, when known.
    pub epoch_ms: Option<i64>,
    /// Spatial reference system identifier, when georeferenced.
    pub srid: Option<i64>,
    pub name: String,
    pub description: String,
    pub links: Vec<String>,
    pub properties: PropertyMap,
}

impl Universe {
    /// New universe with a generated identity.
    pub fn new(time_unit: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), time_unit)
    }

    /// New universe with a caller-provided identity, for import paths.
    pub fn with_id(uuid: UniverseId, time_unit: impl Into<String>) -> Self {
        Self {
            uuid,
            time_unit: time_unit.into(),
            epoch_ms: None,
            srid: None,
            name: String::new(),
            description: String::new(),
            links: Vec::new(),
            properties: PropertyMap::new(),
        }
    }
}
