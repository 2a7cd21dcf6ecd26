//! Core domain logic for TraceMap, a spatiotemporal coverage store.
//! This crate is the single source of truth for sample integrity rules
//! and derived trajectory state.

pub mod constraint;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod trajectory;

pub use constraint::{validate_sample, ValidationError};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::coverage::{Coverage, CoverageId, Relationship, RelationshipId};
pub use model::geometry::{
    Envelope, Geometry, GeometryError, GeometryResult, Point3, Trajectory, TrajectoryPoint,
};
pub use model::raster::{PixelType, RasterBand, RasterTile};
pub use model::sample::{ParentRef, PayloadKind, Sample, SampleId};
pub use model::thing::{SpatialThing, ThingId};
pub use model::universe::{TimeUnit, Universe, UniverseId};
pub use model::PropertyMap;
pub use repo::coverage_repo::{CoverageRepository, SqliteCoverageRepository};
pub use repo::sample_repo::{SampleRepository, SqliteSampleRepository};
pub use repo::thing_repo::{SqliteThingRepository, ThingRepository};
pub use repo::universe_repo::{SqliteUniverseRepository, UniverseRepository};
pub use repo::{DeletePolicy, RepoError, RepoResult};
pub use service::sample_service::{SampleOperation, SampleService, WriteError, WriteResult};
pub use trajectory::{build_trajectory, MaterializeError, MaterializeResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
