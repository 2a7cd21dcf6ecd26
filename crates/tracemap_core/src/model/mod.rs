//! Domain records for the spatiotemporal catalog.
//!
//! # Responsibility
//! - Define the typed records stored by the repositories: universes and
//!   their time units, spatial things, coverages, relationships and
//!   samples, plus the geometry and raster payload values.
//! - Keep records as plain data: identity, fields, constructors.
//!
//! # Invariants
//! - Identities are `Uuid`s and never reused.
//! - Derived trajectory fields are written only by the materializer.

pub mod coverage;
pub mod geometry;
pub mod raster;
pub mod sample;
pub mod thing;
pub mod universe;

/// Open-ended JSON object carried by most records as `properties`.
pub type PropertyMap = serde_json::Map<String, serde_json::Value>;
