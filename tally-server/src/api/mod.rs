//! HTTP API handlers for the tally service

pub mod community;
pub mod elections;
pub mod guard;
pub mod health;
pub mod identity;

pub use community::{create_comment, create_post, get_target, submit_vote};
pub use elections::{close_election, get_stats, register_election, submit_ballot};
pub use guard::{check_abuse, check_moderation};
pub use health::health_routes;
pub use identity::{VoterId, VOTER_ID_HEADER};
