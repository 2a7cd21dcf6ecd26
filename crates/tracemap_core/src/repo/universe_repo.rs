//! Universe and time-unit repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `time_units` and `universes`.
//! - Enforce the protected time-unit reference and the universe delete
//!   policy.
//!
//! # Invariants
//! - A time unit referenced by any universe can never be deleted.
//! - Restrict-policy deletes fail while the universe has dependents;
//!   cascade-policy deletes remove dependents through FK cascade in one
//!   transaction.

use crate::model::universe::{TimeUnit, Universe, UniverseId};
use crate::repo::{
    decode_json, encode_json, ensure_connection_ready, parse_uuid, DeletePolicy, RepoError,
    RepoResult, TableSpec,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const UNIVERSE_SELECT_SQL: &str = "SELECT
    uuid,
    time_unit,
    epoch_ms,
    srid,
    name,
    description,
    links,
    properties
FROM universes";

/// Repository interface for universe and time-unit operations.
pub trait UniverseRepository {
    /// Registers one time unit.
    fn create_time_unit(&self, unit: &TimeUnit) -> RepoResult<()>;
    /// Gets one time unit by name.
    fn get_time_unit(&self, name: &str) -> RepoResult<Option<TimeUnit>>;
    /// Lists all time units sorted by name.
    fn list_time_units(&self) -> RepoResult<Vec<TimeUnit>>;
    /// Deletes one unreferenced time unit.
    fn delete_time_unit(&self, name: &str) -> RepoResult<()>;
    /// Creates one universe and returns its stable id.
    fn create_universe(&self, universe: &Universe) -> RepoResult<UniverseId>;
    /// Gets one universe by id.
    fn get_universe(&self, id: UniverseId) -> RepoResult<Option<Universe>>;
    /// Lists all universes in creation order.
    fn list_universes(&self) -> RepoResult<Vec<Universe>>;
    /// Replaces one universe's descriptive fields.
    fn update_universe(&self, universe: &Universe) -> RepoResult<()>;
    /// Deletes one universe under the given dependent policy.
    fn delete_universe(&self, id: UniverseId, policy: DeletePolicy) -> RepoResult<()>;
}

/// SQLite-backed universe repository.
pub struct SqliteUniverseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUniverseRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                TableSpec {
                    table: "time_units",
                    columns: &["name", "description", "links"],
                },
                TableSpec {
                    table: "universes",
                    columns: &[
                        "uuid",
                        "time_unit",
                        "epoch_ms",
                        "srid",
                        "name",
                        "description",
                        "links",
                        "properties",
                    ],
                },
            ],
        )?;
        Ok(Self { conn })
    }
}

impl UniverseRepository for SqliteUniverseRepository<'_> {
    fn create_time_unit(&self, unit: &TimeUnit) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO time_units (name, description, links) VALUES (?1, ?2, ?3);",
            params![
                unit.name.as_str(),
                unit.description.as_str(),
                encode_json(&unit.links, "time_units.links")?,
            ],
        )?;
        Ok(())
    }

    fn get_time_unit(&self, name: &str) -> RepoResult<Option<TimeUnit>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, description, links
             FROM time_units
             WHERE name = ?1;",
        )?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_time_unit_row(row)?));
        }
        Ok(None)
    }

    fn list_time_units(&self) -> RepoResult<Vec<TimeUnit>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, description, links
             FROM time_units
             ORDER BY name ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut units = Vec::new();
        while let Some(row) = rows.next()? {
            units.push(parse_time_unit_row(row)?);
        }
        Ok(units)
    }

    fn delete_time_unit(&self, name: &str) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let referencing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM universes WHERE time_unit = ?1;",
            [name],
            |row| row.get(0),
        )?;
        if referencing > 0 {
            return Err(RepoError::TimeUnitInUse {
                name: name.to_string(),
                universes: referencing as u64,
            });
        }

        let changed = tx.execute("DELETE FROM time_units WHERE name = ?1;", [name])?;
        if changed == 0 {
            return Err(RepoError::TimeUnitNotFound(name.to_string()));
        }

        tx.commit()?;
        Ok(())
    }

    fn create_universe(&self, universe: &Universe) -> RepoResult<UniverseId> {
        if !time_unit_exists(self.conn, &universe.time_unit)? {
            return Err(RepoError::TimeUnitNotFound(universe.time_unit.clone()));
        }

        self.conn.execute(
            "INSERT INTO universes (
                uuid,
                time_unit,
                epoch_ms,
                srid,
                name,
                description,
                links,
                properties
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                universe.uuid.to_string(),
                universe.time_unit.as_str(),
                universe.epoch_ms,
                universe.srid,
                universe.name.as_str(),
                universe.description.as_str(),
                encode_json(&universe.links, "universes.links")?,
                encode_json(&universe.properties, "universes.properties")?,
            ],
        )?;

        Ok(universe.uuid)
    }

    fn get_universe(&self, id: UniverseId) -> RepoResult<Option<Universe>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{UNIVERSE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_universe_row(row)?));
        }
        Ok(None)
    }

    fn list_universes(&self) -> RepoResult<Vec<Universe>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{UNIVERSE_SELECT_SQL} ORDER BY created_at ASC, uuid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut universes = Vec::new();
        while let Some(row) = rows.next()? {
            universes.push(parse_universe_row(row)?);
        }
        Ok(universes)
    }

    fn update_universe(&self, universe: &Universe) -> RepoResult<()> {
        if !time_unit_exists(self.conn, &universe.time_unit)? {
            return Err(RepoError::TimeUnitNotFound(universe.time_unit.clone()));
        }

        let changed = self.conn.execute(
            "UPDATE universes
             SET
                time_unit = ?2,
                epoch_ms = ?3,
                srid = ?4,
                name = ?5,
                description = ?6,
                links = ?7,
                properties = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                universe.uuid.to_string(),
                universe.time_unit.as_str(),
                universe.epoch_ms,
                universe.srid,
                universe.name.as_str(),
                universe.description.as_str(),
                encode_json(&universe.links, "universes.links")?,
                encode_json(&universe.properties, "universes.properties")?,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::UniverseNotFound(universe.uuid));
        }

        Ok(())
    }

    fn delete_universe(&self, id: UniverseId, policy: DeletePolicy) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        if policy == DeletePolicy::Restrict {
            let things = count_dependents(&tx, "spatial_things", id)?;
            let coverages = count_dependents(&tx, "coverages", id)?;
            if things > 0 || coverages > 0 {
                return Err(RepoError::UniverseHasDependents {
                    universe: id,
                    things,
                    coverages,
                });
            }
        }

        let changed = tx.execute("DELETE FROM universes WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::UniverseNotFound(id));
        }

        tx.commit()?;
        Ok(())
    }
}

fn parse_time_unit_row(row: &Row<'_>) -> RepoResult<TimeUnit> {
    let links_text: String = row.get("links")?;
    Ok(TimeUnit {
        name: row.get("name")?,
        description: row.get("description")?,
        links: decode_json(&links_text, "time_units.links")?,
    })
}

fn parse_universe_row(row: &Row<'_>) -> RepoResult<Universe> {
    let uuid_text: String = row.get("uuid")?;
    let links_text: String = row.get("links")?;
    let properties_text: String = row.get("properties")?;

    Ok(Universe {
        uuid: parse_uuid(&uuid_text, "universes.uuid")?,
        time_unit: row.get("time_unit")?,
        epoch_ms: row.get("epoch_ms")?,
        srid: row.get("srid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        links: decode_json(&links_text, "universes.links")?,
        properties: decode_json(&properties_text, "universes.properties")?,
    })
}

pub(crate) fn time_unit_exists(conn: &Connection, name: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM time_units WHERE name = ?1);",
        [name],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn count_dependents(conn: &Connection, table: &str, universe: UniverseId) -> RepoResult<u64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE universe_uuid = ?1;"),
        [universe.to_string()],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

pub(crate) fn universe_exists(conn: &Connection, id: UniverseId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM universes WHERE uuid = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
