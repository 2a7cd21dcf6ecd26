//! Spatial thing repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `spatial_things`.
//!
//! # Invariants
//! - Catalog writes never touch the `trajectory` column; it is written
//!   only by the sample write path.
//! - Deleting a thing cascades to its samples and relationships.

use crate::model::thing::{SpatialThing, ThingId};
use crate::model::universe::UniverseId;
use crate::repo::universe_repo::universe_exists;
use crate::repo::{
    decode_json, decode_json_opt, encode_json, ensure_connection_ready, parse_uuid, RepoError,
    RepoResult, TableSpec,
};
use rusqlite::{params, Connection, Row};

const THING_SELECT_SQL: &str = "SELECT
    uuid,
    universe_uuid,
    name,
    description,
    links,
    properties,
    trajectory
FROM spatial_things";

/// Repository interface for spatial thing operations.
pub trait ThingRepository {
    /// Creates one spatial thing and returns its stable id.
    fn create_thing(&self, thing: &SpatialThing) -> RepoResult<ThingId>;
    /// Gets one spatial thing by id.
    fn get_thing(&self, id: ThingId) -> RepoResult<Option<SpatialThing>>;
    /// Lists one universe's spatial things in creation order.
    fn list_things(&self, universe: UniverseId) -> RepoResult<Vec<SpatialThing>>;
    /// Replaces one thing's descriptive fields. Derived trajectory state
    /// is left untouched.
    fn update_thing(&self, thing: &SpatialThing) -> RepoResult<()>;
    /// Deletes one spatial thing and everything attached to it.
    fn delete_thing(&self, id: ThingId) -> RepoResult<()>;
}

/// SQLite-backed spatial thing repository.
pub struct SqliteThingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteThingRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[TableSpec {
                table: "spatial_things",
                columns: &[
                    "uuid",
                    "universe_uuid",
                    "name",
                    "description",
                    "links",
                    "properties",
                    "trajectory",
                ],
            }],
        )?;
        Ok(Self { conn })
    }
}

impl ThingRepository for SqliteThingRepository<'_> {
    fn create_thing(&self, thing: &SpatialThing) -> RepoResult<ThingId> {
        if !universe_exists(self.conn, thing.universe)? {
            return Err(RepoError::UniverseNotFound(thing.universe));
        }

        self.conn.execute(
            "INSERT INTO spatial_things (
                uuid,
                universe_uuid,
                name,
                description,
                links,
                properties
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                thing.uuid.to_string(),
                thing.universe.to_string(),
                thing.name.as_str(),
                thing.description.as_str(),
                encode_json(&thing.links, "spatial_things.links")?,
                encode_json(&thing.properties, "spatial_things.properties")?,
            ],
        )?;

        Ok(thing.uuid)
    }

    fn get_thing(&self, id: ThingId) -> RepoResult<Option<SpatialThing>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{THING_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_thing_row(row)?));
        }
        Ok(None)
    }

    fn list_things(&self, universe: UniverseId) -> RepoResult<Vec<SpatialThing>> {
        let mut stmt = self.conn.prepare(&format!(
            "{THING_SELECT_SQL}
             WHERE universe_uuid = ?1
             ORDER BY created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([universe.to_string()])?;
        let mut things = Vec::new();
        while let Some(row) = rows.next()? {
            things.push(parse_thing_row(row)?);
        }
        Ok(things)
    }

    fn update_thing(&self, thing: &SpatialThing) -> RepoResult<()> {
        if !universe_exists(self.conn, thing.universe)? {
            return Err(RepoError::UniverseNotFound(thing.universe));
        }

        let changed = self.conn.execute(
            "UPDATE spatial_things
             SET
                universe_uuid = ?2,
                name = ?3,
                description = ?4,
                links = ?5,
                properties = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                thing.uuid.to_string(),
                thing.universe.to_string(),
                thing.name.as_str(),
                thing.description.as_str(),
                encode_json(&thing.links, "spatial_things.links")?,
                encode_json(&thing.properties, "spatial_things.properties")?,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::ThingNotFound(thing.uuid));
        }

        Ok(())
    }

    fn delete_thing(&self, id: ThingId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM spatial_things WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::ThingNotFound(id));
        }
        Ok(())
    }
}

fn parse_thing_row(row: &Row<'_>) -> RepoResult<SpatialThing> {
    let uuid_text: String = row.get("uuid")?;
    let universe_text: String = row.get("universe_uuid")?;
    let links_text: String = row.get("links")?;
    let properties_text: String = row.get("properties")?;
    let trajectory_text: Option<String> = row.get("trajectory")?;

    Ok(SpatialThing {
        uuid: parse_uuid(&uuid_text, "spatial_things.uuid")?,
        universe: parse_uuid(&universe_text, "spatial_things.universe_uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        links: decode_json(&links_text, "spatial_things.links")?,
        properties: decode_json(&properties_text, "spatial_things.properties")?,
        trajectory: decode_json_opt(trajectory_text, "spatial_things.trajectory")?,
    })
}
