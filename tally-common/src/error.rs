//! Common error types for Civic Tally

use thiserror::Error;

/// Common result type for tally operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the tally service
///
/// Variants fall into four groups: validation (caller's fault, nothing was
/// written), conflict (terminal, never retried), transient storage contention
/// (retried internally, surfaced only once the retry budget is spent) and
/// infrastructure failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Vote target does not exist or has an unknown type
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Vote value outside {+1, -1}
    #[error("Invalid vote value: {0}")]
    InvalidVoteValue(i64),

    /// Candidate is not registered for the election
    #[error("Invalid candidate '{candidate_id}' for election '{sg_id}'")]
    InvalidCandidate { sg_id: String, candidate_id: String },

    /// Voter already holds a ballot in this election
    #[error("Voter '{voter_id}' already voted in election '{sg_id}'")]
    AlreadyVoted { voter_id: String, sg_id: String },

    /// Election exists but no longer accepts ballots
    #[error("Election closed: {0}")]
    ElectionClosed(String),

    /// Submission flagged by the abuse guard under a blocking policy
    #[error("Submission rejected as suspected abuse: {0}")]
    SuspectedAbuse(String),

    /// Submission contains disallowed content
    #[error("Content rejected: {0}")]
    ContentRejected(String),

    /// Lock contention persisted past the retry budget
    #[error("Storage contention on {operation}: gave up after {attempts} attempts ({elapsed_ms} ms)")]
    StorageContention {
        operation: String,
        attempts: u32,
        elapsed_ms: u128,
    },

    /// External dependency failed (toxicity scoring, submission log)
    #[error("External service error: {0}")]
    External(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for SQLite busy/locked errors that a retry can clear
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => {
                // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_BUSY_SNAPSHOT (517)
                let busy_code = matches!(db_err.code().as_deref(), Some("5") | Some("6") | Some("517"));
                busy_code || db_err.message().contains("database is locked")
            }
            Error::Database(sqlx::Error::PoolTimedOut) => true,
            _ => false,
        }
    }

    /// True for errors caused by the request itself (no mutation was attempted)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::InvalidTarget(_)
                | Error::InvalidVoteValue(_)
                | Error::InvalidCandidate { .. }
                | Error::NotFound(_)
                | Error::ContentRejected(_)
        )
    }
}
