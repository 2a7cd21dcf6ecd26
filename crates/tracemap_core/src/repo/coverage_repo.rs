//! Coverage and relationship repository contracts and SQLite
//! implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `coverages` and `relationships`.
//!
//! # Invariants
//! - Catalog writes never touch the `trajectory` column; it is written
//!   only by the sample write path.
//! - Relationships require both endpoints at creation and follow their
//!   deletion through FK cascade.

use crate::model::coverage::{Coverage, CoverageId, Relationship, RelationshipId};
use crate::model::thing::ThingId;
use crate::model::universe::UniverseId;
use crate::repo::universe_repo::universe_exists;
use crate::repo::{
    decode_json, decode_json_opt, encode_json, ensure_connection_ready, parse_uuid, RepoError,
    RepoResult, TableSpec,
};
use rusqlite::{params, Connection, Row};

const COVERAGE_SELECT_SQL: &str = "SELECT
    uuid,
    universe_uuid,
    name,
    description,
    links,
    metadata,
    trajectory
FROM coverages";

const RELATIONSHIP_SELECT_SQL: &str = "SELECT
    uuid,
    coverage_uuid,
    thing_uuid,
    properties
FROM relationships";

/// Repository interface for coverage and relationship operations.
pub trait CoverageRepository {
    /// Creates one coverage and returns its stable id.
    fn create_coverage(&self, coverage: &Coverage) -> RepoResult<CoverageId>;
    /// Gets one coverage by id.
    fn get_coverage(&self, id: CoverageId) -> RepoResult<Option<Coverage>>;
    /// Lists one universe's coverages in creation order.
    fn list_coverages(&self, universe: UniverseId) -> RepoResult<Vec<Coverage>>;
    /// Replaces one coverage's descriptive fields. Derived trajectory
    /// state is left untouched.
    fn update_coverage(&self, coverage: &Coverage) -> RepoResult<()>;
    /// Deletes one coverage and everything attached to it.
    fn delete_coverage(&self, id: CoverageId) -> RepoResult<()>;
    /// Links one coverage to one spatial thing.
    fn create_relationship(&self, relationship: &Relationship) -> RepoResult<RelationshipId>;
    /// Gets one relationship by id.
    fn get_relationship(&self, id: RelationshipId) -> RepoResult<Option<Relationship>>;
    /// Replaces one relationship's property map.
    fn update_relationship(&self, relationship: &Relationship) -> RepoResult<()>;
    /// Removes one relationship; both endpoints stay.
    fn delete_relationship(&self, id: RelationshipId) -> RepoResult<()>;
    /// Lists relationships attached to one coverage.
    fn list_relationships_for_coverage(
        &self,
        coverage: CoverageId,
    ) -> RepoResult<Vec<Relationship>>;
    /// Lists relationships attached to one spatial thing.
    fn list_relationships_for_thing(&self, thing: ThingId) -> RepoResult<Vec<Relationship>>;
}

/// SQLite-backed coverage repository.
pub struct SqliteCoverageRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCoverageRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                TableSpec {
                    table: "coverages",
                    columns: &[
                        "uuid",
                        "universe_uuid",
                        "name",
                        "description",
                        "links",
                        "metadata",
                        "trajectory",
                    ],
                },
                TableSpec {
                    table: "relationships",
                    columns: &["uuid", "coverage_uuid", "thing_uuid", "properties"],
                },
            ],
        )?;
        Ok(Self { conn })
    }
}

impl CoverageRepository for SqliteCoverageRepository<'_> {
    fn create_coverage(&self, coverage: &Coverage) -> RepoResult<CoverageId> {
        if !universe_exists(self.conn, coverage.universe)? {
            return Err(RepoError::UniverseNotFound(coverage.universe));
        }

        self.conn.execute(
            "INSERT INTO coverages (
                uuid,
                universe_uuid,
                name,
                description,
                links,
                metadata
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                coverage.uuid.to_string(),
                coverage.universe.to_string(),
                coverage.name.as_str(),
                coverage.description.as_str(),
                encode_json(&coverage.links, "coverages.links")?,
                encode_json(&coverage.metadata, "coverages.metadata")?,
            ],
        )?;

        Ok(coverage.uuid)
    }

    fn get_coverage(&self, id: CoverageId) -> RepoResult<Option<Coverage>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COVERAGE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_coverage_row(row)?));
        }
        Ok(None)
    }

    fn list_coverages(&self, universe: UniverseId) -> RepoResult<Vec<Coverage>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COVERAGE_SELECT_SQL}
             WHERE universe_uuid = ?1
             ORDER BY created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([universe.to_string()])?;
        let mut coverages = Vec::new();
        while let Some(row) = rows.next()? {
            coverages.push(parse_coverage_row(row)?);
        }
        Ok(coverages)
    }

    fn update_coverage(&self, coverage: &Coverage) -> RepoResult<()> {
        if !universe_exists(self.conn, coverage.universe)? {
            return Err(RepoError::UniverseNotFound(coverage.universe));
        }

        let changed = self.conn.execute(
            "UPDATE coverages
             SET
                universe_uuid = ?2,
                name = ?3,
                description = ?4,
                links = ?5,
                metadata = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                coverage.uuid.to_string(),
                coverage.universe.to_string(),
                coverage.name.as_str(),
                coverage.description.as_str(),
                encode_json(&coverage.links, "coverages.links")?,
                encode_json(&coverage.metadata, "coverages.metadata")?,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::CoverageNotFound(coverage.uuid));
        }

        Ok(())
    }

    fn delete_coverage(&self, id: CoverageId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM coverages WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::CoverageNotFound(id));
        }
        Ok(())
    }

    fn create_relationship(&self, relationship: &Relationship) -> RepoResult<RelationshipId> {
        if self.get_coverage(relationship.coverage)?.is_none() {
            return Err(RepoError::CoverageNotFound(relationship.coverage));
        }
        if !thing_exists(self.conn, relationship.thing)? {
            return Err(RepoError::ThingNotFound(relationship.thing));
        }

        self.conn.execute(
            "INSERT INTO relationships (
                uuid,
                coverage_uuid,
                thing_uuid,
                properties
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                relationship.uuid.to_string(),
                relationship.coverage.to_string(),
                relationship.thing.to_string(),
                encode_json(&relationship.properties, "relationships.properties")?,
            ],
        )?;

        Ok(relationship.uuid)
    }

    fn get_relationship(&self, id: RelationshipId) -> RepoResult<Option<Relationship>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RELATIONSHIP_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_relationship_row(row)?));
        }
        Ok(None)
    }

    fn update_relationship(&self, relationship: &Relationship) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE relationships
             SET
                properties = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                relationship.uuid.to_string(),
                encode_json(&relationship.properties, "relationships.properties")?,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::RelationshipNotFound(relationship.uuid));
        }

        Ok(())
    }

    fn delete_relationship(&self, id: RelationshipId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM relationships WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::RelationshipNotFound(id));
        }
        Ok(())
    }

    fn list_relationships_for_coverage(
        &self,
        coverage: CoverageId,
    ) -> RepoResult<Vec<Relationship>> {
        list_relationships_by(self.conn, "coverage_uuid", coverage.to_string())
    }

    fn list_relationships_for_thing(&self, thing: ThingId) -> RepoResult<Vec<Relationship>> {
        list_relationships_by(self.conn, "thing_uuid", thing.to_string())
    }
}

fn list_relationships_by(
    conn: &Connection,
    column: &'static str,
    value: String,
) -> RepoResult<Vec<Relationship>> {
    let mut stmt = conn.prepare(&format!(
        "{RELATIONSHIP_SELECT_SQL}
         WHERE {column} = ?1
         ORDER BY created_at ASC, uuid ASC;"
    ))?;
    let mut rows = stmt.query([value])?;
    let mut relationships = Vec::new();
    while let Some(row) = rows.next()? {
        relationships.push(parse_relationship_row(row)?);
    }
    Ok(relationships)
}

fn parse_coverage_row(row: &Row<'_>) -> RepoResult<Coverage> {
    let uuid_text: String = row.get("uuid")?;
    let universe_text: String = row.get("universe_uuid")?;
    let links_text: String = row.get("links")?;
    let metadata_text: String = row.get("metadata")?;
    let trajectory_text: Option<String> = row.get("trajectory")?;

    Ok(Coverage {
        uuid: parse_uuid(&uuid_text, "coverages.uuid")?,
        universe: parse_uuid(&universe_text, "coverages.universe_uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        links: decode_json(&links_text, "coverages.links")?,
        metadata: decode_json(&metadata_text, "coverages.metadata")?,
        trajectory: decode_json_opt(trajectory_text, "coverages.trajectory")?,
    })
}

fn parse_relationship_row(row: &Row<'_>) -> RepoResult<Relationship> {
    let uuid_text: String = row.get("uuid")?;
    let coverage_text: String = row.get("coverage_uuid")?;
    let thing_text: String = row.get("thing_uuid")?;
    let properties_text: String = row.get("properties")?;

    Ok(Relationship {
        uuid: parse_uuid(&uuid_text, "relationships.uuid")?,
        coverage: parse_uuid(&coverage_text, "relationships.coverage_uuid")?,
        thing: parse_uuid(&thing_text, "relationships.thing_uuid")?,
        properties: decode_json(&properties_text, "relationships.properties")?,
    })
}

pub(crate) fn thing_exists(conn: &Connection, id: ThingId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM spatial_things WHERE uuid = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
