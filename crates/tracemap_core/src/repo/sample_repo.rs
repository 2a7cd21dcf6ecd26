//! Sample row storage.
//!
//! # Responsibility
//! - Provide read APIs over committed `samples` rows.
//! - Provide crate-internal row mutation and trajectory write helpers for
//!   the sample write path.
//!
//! # Invariants
//! - Row mutation helpers are `pub(crate)`: library callers cannot write
//!   sample rows or trajectory columns except through
//!   `service::sample_service`.
//! - `list_samples` returns rows ordered by `timestamp ASC, uuid ASC`.
//! - A persisted row references exactly one parent; anything else is
//!   rejected as invalid data.

use crate::model::geometry::Trajectory;
use crate::model::sample::{ParentRef, Sample, SampleId};
use crate::repo::{
    decode_json_opt, encode_json, ensure_connection_ready, parse_uuid, RepoError, RepoResult,
    TableSpec,
};
use rusqlite::{params, Connection, Row};

const SAMPLE_SELECT_SQL: &str = "SELECT
    uuid,
    coverage_uuid,
    thing_uuid,
    timestamp,
    geometry,
    properties,
    tile,
    attributes
FROM samples";

/// Repository interface for sample read operations.
pub trait SampleRepository {
    /// Gets one sample by id.
    fn get_sample(&self, id: SampleId) -> RepoResult<Option<Sample>>;
    /// Lists one parent's live samples ordered by timestamp.
    fn list_samples(&self, parent: ParentRef) -> RepoResult<Vec<Sample>>;
    /// Counts one parent's live samples.
    fn count_samples(&self, parent: ParentRef) -> RepoResult<u64>;
}

/// SQLite-backed sample repository.
pub struct SqliteSampleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSampleRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    ///
    /// Also checks the parent trajectory columns, since the write helpers
    /// in this module maintain them.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                TableSpec {
                    table: "samples",
                    columns: &[
                        "uuid",
                        "coverage_uuid",
                        "thing_uuid",
                        "timestamp",
                        "geometry",
                        "properties",
                        "tile",
                        "attributes",
                    ],
                },
                TableSpec {
                    table: "coverages",
                    columns: &["uuid", "trajectory"],
                },
                TableSpec {
                    table: "spatial_things",
                    columns: &["uuid", "trajectory"],
                },
            ],
        )?;
        Ok(Self { conn })
    }
}

impl SampleRepository for SqliteSampleRepository<'_> {
    fn get_sample(&self, id: SampleId) -> RepoResult<Option<Sample>> {
        load_sample(self.conn, id)
    }

    fn list_samples(&self, parent: ParentRef) -> RepoResult<Vec<Sample>> {
        load_live_samples(self.conn, parent)
    }

    fn count_samples(&self, parent: ParentRef) -> RepoResult<u64> {
        let (column, value) = parent_filter(parent);
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM samples WHERE {column} = ?1;"),
            [value],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

pub(crate) fn load_sample(conn: &Connection, id: SampleId) -> RepoResult<Option<Sample>> {
    let mut stmt = conn.prepare(&format!("{SAMPLE_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_sample_row(row)?));
    }
    Ok(None)
}

pub(crate) fn load_live_samples(conn: &Connection, parent: ParentRef) -> RepoResult<Vec<Sample>> {
    let (column, value) = parent_filter(parent);
    let mut stmt = conn.prepare(&format!(
        "{SAMPLE_SELECT_SQL}
         WHERE {column} = ?1
         ORDER BY timestamp ASC, uuid ASC;"
    ))?;
    let mut rows = stmt.query([value])?;
    let mut samples = Vec::new();
    while let Some(row) = rows.next()? {
        samples.push(parse_sample_row(row)?);
    }
    Ok(samples)
}

pub(crate) fn insert_sample_row(conn: &Connection, sample: &Sample) -> RepoResult<()> {
    let (coverage_uuid, thing_uuid) = parent_columns(sample.parent);
    conn.execute(
        "INSERT INTO samples (
            uuid,
            coverage_uuid,
            thing_uuid,
            timestamp,
            geometry,
            properties,
            tile,
            attributes
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        params![
            sample.uuid.to_string(),
            coverage_uuid,
            thing_uuid,
            sample.timestamp,
            encode_payload(sample.geometry.as_ref(), "samples.geometry")?,
            encode_payload(sample.properties.as_ref(), "samples.properties")?,
            encode_payload(sample.tile.as_ref(), "samples.tile")?,
            encode_payload(sample.attributes.as_ref(), "samples.attributes")?,
        ],
    )?;
    Ok(())
}

pub(crate) fn update_sample_row(conn: &Connection, sample: &Sample) -> RepoResult<()> {
    let (coverage_uuid, thing_uuid) = parent_columns(sample.parent);
    let changed = conn.execute(
        "UPDATE samples
         SET
            coverage_uuid = ?2,
            thing_uuid = ?3,
            timestamp = ?4,
            geometry = ?5,
            properties = ?6,
            tile = ?7,
            attributes = ?8,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        params![
            sample.uuid.to_string(),
            coverage_uuid,
            thing_uuid,
            sample.timestamp,
            encode_payload(sample.geometry.as_ref(), "samples.geometry")?,
            encode_payload(sample.properties.as_ref(), "samples.properties")?,
            encode_payload(sample.tile.as_ref(), "samples.tile")?,
            encode_payload(sample.attributes.as_ref(), "samples.attributes")?,
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::SampleNotFound(sample.uuid));
    }

    Ok(())
}

pub(crate) fn delete_sample_row(conn: &Connection, id: SampleId) -> RepoResult<()> {
    let changed = conn.execute("DELETE FROM samples WHERE uuid = ?1;", [id.to_string()])?;
    if changed == 0 {
        return Err(RepoError::SampleNotFound(id));
    }
    Ok(())
}

pub(crate) fn parent_exists(conn: &Connection, parent: ParentRef) -> RepoResult<bool> {
    let sql = match parent {
        ParentRef::Coverage(_) => "SELECT EXISTS(SELECT 1 FROM coverages WHERE uuid = ?1);",
        ParentRef::Thing(_) => "SELECT EXISTS(SELECT 1 FROM spatial_things WHERE uuid = ?1);",
    };
    let exists: i64 = conn.query_row(sql, [parent.uuid().to_string()], |row| row.get(0))?;
    Ok(exists == 1)
}

/// Stores one parent's derived trajectory; `None` clears it.
pub(crate) fn write_parent_trajectory(
    conn: &Connection,
    parent: ParentRef,
    trajectory: Option<&Trajectory>,
) -> RepoResult<()> {
    let trajectory_text = match trajectory {
        Some(trajectory) => Some(encode_json(trajectory, "trajectory")?),
        None => None,
    };

    let (sql, missing) = match parent {
        ParentRef::Coverage(id) => (
            "UPDATE coverages
             SET trajectory = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            RepoError::CoverageNotFound(id),
        ),
        ParentRef::Thing(id) => (
            "UPDATE spatial_things
             SET trajectory = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            RepoError::ThingNotFound(id),
        ),
    };

    let changed = conn.execute(sql, params![parent.uuid().to_string(), trajectory_text])?;
    if changed == 0 {
        return Err(missing);
    }

    Ok(())
}

fn parent_filter(parent: ParentRef) -> (&'static str, String) {
    match parent {
        ParentRef::Coverage(id) => ("coverage_uuid", id.to_string()),
        ParentRef::Thing(id) => ("thing_uuid", id.to_string()),
    }
}

fn parent_columns(parent: ParentRef) -> (Option<String>, Option<String>) {
    match parent {
        ParentRef::Coverage(id) => (Some(id.to_string()), None),
        ParentRef::Thing(id) => (None, Some(id.to_string())),
    }
}

fn encode_payload<T: serde::Serialize>(
    value: Option<&T>,
    column: &'static str,
) -> RepoResult<Option<String>> {
    match value {
        Some(value) => Ok(Some(encode_json(value, column)?)),
        None => Ok(None),
    }
}

fn parse_sample_row(row: &Row<'_>) -> RepoResult<Sample> {
    let uuid_text: String = row.get("uuid")?;
    let coverage_text: Option<String> = row.get("coverage_uuid")?;
    let thing_text: Option<String> = row.get("thing_uuid")?;

    let parent = match (coverage_text, thing_text) {
        (Some(coverage), None) => {
            ParentRef::Coverage(parse_uuid(&coverage, "samples.coverage_uuid")?)
        }
        (None, Some(thing)) => ParentRef::Thing(parse_uuid(&thing, "samples.thing_uuid")?),
        _ => {
            return Err(RepoError::InvalidData(format!(
                "sample `{uuid_text}` must reference exactly one parent"
            )));
        }
    };

    let geometry_text: Option<String> = row.get("geometry")?;
    let properties_text: Option<String> = row.get("properties")?;
    let tile_text: Option<String> = row.get("tile")?;
    let attributes_text: Option<String> = row.get("attributes")?;

    Ok(Sample {
        uuid: parse_uuid(&uuid_text, "samples.uuid")?,
        parent,
        timestamp: row.get("timestamp")?,
        geometry: decode_json_opt(geometry_text, "samples.geometry")?,
        properties: decode_json_opt(properties_text, "samples.properties")?,
        tile: decode_json_opt(tile_text, "samples.tile")?,
        attributes: decode_json_opt(attributes_text, "samples.attributes")?,
    })
}
