//! Election ballots, tallies and percentage reconciliation

pub mod ballot;
pub mod reconciler;
pub mod stats;

pub use ballot::{BallotBox, CandidateSpec, ElectionSpec};
pub use reconciler::TallyReconciler;
pub use stats::{percentages, round_one_decimal, CandidateTally, ElectionStats, ParticipationPolicy};
