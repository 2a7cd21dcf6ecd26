//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per aggregate.
//! - Isolate SQLite query details from service orchestration.
//! - Share the repository error type and schema readiness checks.
//!
//! # Invariants
//! - Repositories refuse unmigrated connections instead of failing later
//!   with opaque SQL errors.
//! - Repository APIs return semantic errors (`UniverseNotFound`,
//!   `SampleNotFound`, ...) in addition to DB transport errors.
//! - Sample row writes and trajectory columns are crate-internal; the only
//!   external write surface is `service::sample_service`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod coverage_repo;
pub mod sample_repo;
pub mod thing_repo;
pub mod universe_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for catalog and sample persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Target universe does not exist.
    UniverseNotFound(Uuid),
    /// Target spatial thing does not exist.
    ThingNotFound(Uuid),
    /// Target coverage does not exist.
    CoverageNotFound(Uuid),
    /// Target relationship does not exist.
    RelationshipNotFound(Uuid),
    /// Target sample does not exist.
    SampleNotFound(Uuid),
    /// Referenced time unit is not registered.
    TimeUnitNotFound(String),
    /// Time unit is still referenced by at least one universe.
    TimeUnitInUse { name: String, universes: u64 },
    /// Restrict-policy universe delete with dependents still present.
    UniverseHasDependents {
        universe: Uuid,
        things: u64,
        coverages: u64,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UniverseNotFound(id) => write!(f, "universe not found: {id}"),
            Self::ThingNotFound(id) => write!(f, "spatial thing not found: {id}"),
            Self::CoverageNotFound(id) => write!(f, "coverage not found: {id}"),
            Self::RelationshipNotFound(id) => write!(f, "relationship not found: {id}"),
            Self::SampleNotFound(id) => write!(f, "sample not found: {id}"),
            Self::TimeUnitNotFound(name) => write!(f, "time unit not found: {name}"),
            Self::TimeUnitInUse { name, universes } => write!(
                f,
                "time unit `{name}` is referenced by {universes} universe(s) and cannot be deleted"
            ),
            Self::UniverseHasDependents {
                universe,
                things,
                coverages,
            } => write!(
                f,
                "universe {universe} still has {things} thing(s) and {coverages} coverage(s)"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "repository requires column `{column}` in table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Dependent handling when deleting a universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Reject the delete while dependents exist.
    Restrict,
    /// Delete dependents along with the universe.
    Cascade,
}

/// Expected columns per table, used by repository readiness checks.
pub(crate) struct TableSpec {
    pub table: &'static str,
    pub columns: &'static [&'static str],
}

/// Verifies the connection is migrated and the given tables/columns exist.
pub(crate) fn ensure_connection_ready(conn: &Connection, specs: &[TableSpec]) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for spec in specs {
        if !table_exists(conn, spec.table)? {
            return Err(RepoError::MissingRequiredTable(spec.table));
        }
        for column in spec.columns {
            if !table_has_column(conn, spec.table, column)? {
                return Err(RepoError::MissingRequiredColumn {
                    table: spec.table,
                    column,
                });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn encode_json<T: serde::Serialize>(
    value: &T,
    column: &'static str,
) -> RepoResult<String> {
    serde_json::to_string(value)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode {column}: {err}")))
}

pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    text: &str,
    column: &'static str,
) -> RepoResult<T> {
    serde_json::from_str(text)
        .map_err(|err| RepoError::InvalidData(format!("invalid JSON in {column}: {err}")))
}

/// Decodes a nullable JSON text column; `NULL` maps to `None`.
pub(crate) fn decode_json_opt<T: serde::de::DeserializeOwned>(
    text: Option<String>,
    column: &'static str,
) -> RepoResult<Option<T>> {
    match text {
        Some(text) => Ok(Some(decode_json(&text, column)?)),
        None => Ok(None),
    }
}
