//! Sample write-path orchestration.
//!
//! # Responsibility
//! - Sequence validate, commit and rematerialize as one atomic unit per
//!   mutation.
//! - Keep parent trajectories exactly consistent with live sample sets.
//!
//! # Invariants
//! - Every mutation runs inside one immediate transaction; partial effects
//!   are never observable, not even between commit and rematerialization.
//! - Constraint rules see the parent's live set minus the row being
//!   updated.
//! - Every affected parent is rematerialized exactly once per operation.
//! - Write lock contention surfaces as `WriteError::Conflict`; callers
//!   retry the whole operation.
//!
//! # See also
//! - `constraint` for the rule set and its ordering.
//! - `trajectory` for the derivation that runs before commit.

use crate::constraint::{validate_sample, ValidationError};
use crate::db::DbError;
use crate::model::geometry::Trajectory;
use crate::model::sample::{ParentRef, Sample, SampleId};
use crate::repo::sample_repo::{
    delete_sample_row, insert_sample_row, load_live_samples, load_sample, parent_exists,
    update_sample_row, write_parent_trajectory, SqliteSampleRepository,
};
use crate::repo::RepoError;
use crate::trajectory::{build_trajectory, MaterializeError};
use log::{info, warn};
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type WriteResult<T> = Result<T, WriteError>;

/// Errors surfaced by the sample write path.
#[derive(Debug)]
pub enum WriteError {
    /// Candidate rejected by an integrity rule; the reason names the rule
    /// outcome verbatim.
    Validation(ValidationError),
    /// Trajectory derivation failed; the triggering write was rolled back.
    Materialization(MaterializeError),
    /// Lost the write lock race; retry the whole operation.
    Conflict,
    /// Target parent does not exist.
    ParentNotFound(ParentRef),
    /// Target sample does not exist.
    SampleNotFound(SampleId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Materialization(err) => write!(f, "{err}"),
            Self::Conflict => write!(f, "write lock is held by another writer; retry"),
            Self::ParentNotFound(parent) => write!(f, "parent not found: {parent}"),
            Self::SampleNotFound(id) => write!(f, "sample not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent sample state: {details}"),
        }
    }
}

impl Error for WriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Materialization(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for WriteError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<MaterializeError> for WriteError {
    fn from(value: MaterializeError) -> Self {
        Self::Materialization(value)
    }
}

impl From<RepoError> for WriteError {
    fn from(value: RepoError) -> Self {
        if is_lock_contention(&value) {
            return Self::Conflict;
        }
        match value {
            RepoError::SampleNotFound(id) => Self::SampleNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for WriteError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(RepoError::from(value))
    }
}

fn is_lock_contention(error: &RepoError) -> bool {
    matches!(
        error,
        RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(code, _)))
            if matches!(code.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// One orchestrated mutation of the sample table.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOperation {
    /// Insert a new sample row.
    Create(Sample),
    /// Replace an existing row, addressed by `sample.uuid`. May move the
    /// row to a different parent.
    Update(Sample),
    /// Remove a row.
    Delete(SampleId),
}

/// Write-path orchestrator over one migrated connection.
///
/// The only supported write surface for sample rows and parent
/// trajectories.
#[derive(Debug)]
pub struct SampleService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SampleService<'conn> {
    /// Constructs the service from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> WriteResult<Self> {
        let _ = SqliteSampleRepository::try_new(conn)?;
        Ok(Self { conn })
    }

    /// Applies one operation as a single atomic unit.
    ///
    /// # Contract
    /// - Create/Update return the committed row read back from storage;
    ///   Delete returns `None`.
    /// - On any error the transaction rolls back and nothing changed.
    ///
    /// # Side effects
    /// - Emits `sample_write` logging events with op, status and duration.
    pub fn apply(&self, operation: SampleOperation) -> WriteResult<Option<Sample>> {
        let started_at = Instant::now();
        let (op_name, target) = match &operation {
            SampleOperation::Create(sample) => ("create", sample.uuid),
            SampleOperation::Update(sample) => ("update", sample.uuid),
            SampleOperation::Delete(id) => ("delete", *id),
        };

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let outcome = match operation {
            SampleOperation::Create(sample) => create_in_tx(&tx, sample).map(Some),
            SampleOperation::Update(sample) => update_in_tx(&tx, sample).map(Some),
            SampleOperation::Delete(id) => delete_in_tx(&tx, id).map(|()| None),
        };

        match outcome {
            Ok(committed) => {
                tx.commit()?;
                info!(
                    "event=sample_write module=service op={op_name} sample={target} status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(committed)
            }
            Err(err) => {
                warn!(
                    "event=sample_write module=service op={op_name} sample={target} status=rejected duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    /// Creates one sample; returns the committed row.
    pub fn create_sample(&self, sample: &Sample) -> WriteResult<Sample> {
        self.apply(SampleOperation::Create(sample.clone()))?
            .ok_or(WriteError::InconsistentState("create returned no committed row"))
    }

    /// Replaces one sample; returns the committed row.
    pub fn update_sample(&self, sample: &Sample) -> WriteResult<Sample> {
        self.apply(SampleOperation::Update(sample.clone()))?
            .ok_or(WriteError::InconsistentState("update returned no committed row"))
    }

    /// Deletes one sample.
    pub fn delete_sample(&self, id: SampleId) -> WriteResult<()> {
        self.apply(SampleOperation::Delete(id)).map(|_| ())
    }

    /// Creates a batch of samples as one atomic unit.
    ///
    /// # Contract
    /// - Candidates are validated in order, each against the live set as
    ///   it grows inside the transaction.
    /// - Each affected parent is rematerialized exactly once, after all
    ///   rows are inserted.
    /// - All-or-nothing: the first rejection rolls the whole batch back.
    ///
    /// # Side effects
    /// - Emits one `sample_write` logging event for the whole batch.
    pub fn create_samples(&self, samples: &[Sample]) -> WriteResult<usize> {
        let started_at = Instant::now();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        match batch_create_in_tx(&tx, samples) {
            Ok(parents) => {
                tx.commit()?;
                info!(
                    "event=sample_write module=service op=batch_create count={} parents={} status=ok duration_ms={}",
                    samples.len(),
                    parents,
                    started_at.elapsed().as_millis()
                );
                Ok(samples.len())
            }
            Err(err) => {
                warn!(
                    "event=sample_write module=service op=batch_create count={} status=rejected duration_ms={} error={err}",
                    samples.len(),
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }
}

fn create_in_tx(tx: &Transaction<'_>, sample: Sample) -> WriteResult<Sample> {
    if !parent_exists(tx, sample.parent)? {
        return Err(WriteError::ParentNotFound(sample.parent));
    }

    let siblings = load_live_samples(tx, sample.parent)?;
    validate_sample(&sample, &siblings)?;

    insert_sample_row(tx, &sample)?;
    rematerialize_in_tx(tx, sample.parent)?;
    read_back(tx, sample.uuid, "created sample missing in read-back")
}

fn update_in_tx(tx: &Transaction<'_>, sample: Sample) -> WriteResult<Sample> {
    let previous =
        load_sample(tx, sample.uuid)?.ok_or(WriteError::SampleNotFound(sample.uuid))?;
    if !parent_exists(tx, sample.parent)? {
        return Err(WriteError::ParentNotFound(sample.parent));
    }

    let siblings: Vec<Sample> = load_live_samples(tx, sample.parent)?
        .into_iter()
        .filter(|row| row.uuid != sample.uuid)
        .collect();
    validate_sample(&sample, &siblings)?;

    update_sample_row(tx, &sample)?;
    rematerialize_in_tx(tx, sample.parent)?;
    if previous.parent != sample.parent {
        rematerialize_in_tx(tx, previous.parent)?;
    }
    read_back(tx, sample.uuid, "updated sample missing in read-back")
}

fn delete_in_tx(tx: &Transaction<'_>, id: SampleId) -> WriteResult<()> {
    let previous = load_sample(tx, id)?.ok_or(WriteError::SampleNotFound(id))?;
    delete_sample_row(tx, id)?;
    rematerialize_in_tx(tx, previous.parent)?;
    Ok(())
}

fn batch_create_in_tx(tx: &Transaction<'_>, samples: &[Sample]) -> WriteResult<usize> {
    let mut affected: Vec<ParentRef> = Vec::new();
    for sample in samples {
        if !parent_exists(tx, sample.parent)? {
            return Err(WriteError::ParentNotFound(sample.parent));
        }
        let siblings = load_live_samples(tx, sample.parent)?;
        validate_sample(sample, &siblings)?;
        insert_sample_row(tx, sample)?;
        if !affected.contains(&sample.parent) {
            affected.push(sample.parent);
        }
    }

    for parent in &affected {
        rematerialize_in_tx(tx, *parent)?;
    }
    Ok(affected.len())
}

/// Recomputes and stores one parent's trajectory from its live rows.
fn rematerialize_in_tx(
    tx: &Transaction<'_>,
    parent: ParentRef,
) -> WriteResult<Option<Trajectory>> {
    let live = load_live_samples(tx, parent)?;
    let trajectory = build_trajectory(&live)?;
    write_parent_trajectory(tx, parent, trajectory.as_ref())?;
    Ok(trajectory)
}

fn read_back(tx: &Transaction<'_>, id: SampleId, details: &'static str) -> WriteResult<Sample> {
    load_sample(tx, id)?.ok_or(WriteError::InconsistentState(details))
}
