//! Community voting: transition engine, target ledger and guarded submissions

pub mod board;
pub mod ledger;
pub mod transition;

pub use board::{CommunityBoard, NewComment, NewPost, SubmittedContent};
pub use ledger::TargetLedger;
pub use transition::{decide, CounterDelta, RecordEffect, VoteChoice, VoteTransition};
