//! sqlx repositories for the ledger tables
//!
//! Functions take any sqlx executor so the same query serves a pooled read
//! and a statement inside a ledger transaction. Counter columns are only ever
//! changed with in-statement arithmetic (`count = count + ?`), never by writing
//! back a value read earlier.

pub mod ballots;
pub mod elections;
pub mod submissions;
pub mod targets;
pub mod votes;

pub use submissions::SqliteSubmissionLog;
