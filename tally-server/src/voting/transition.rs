//! Vote transition engine
//!
//! Decides how a new vote interacts with the voter's current vote on the same
//! target. Pure: it never touches storage, it only names the record effect and
//! the counter delta the ledger must apply.
//!
//! | current | new  | transition      | record effect  | Δup | Δdown |
//! |---------|------|-----------------|----------------|-----|-------|
//! | none    | up   | `Cast(Up)`      | create(up)     | +1  |  0    |
//! | none    | down | `Cast(Down)`    | create(down)   |  0  | +1    |
//! | up      | up   | `Cancel(Up)`    | delete         | −1  |  0    |
//! | down    | down | `Cancel(Down)`  | delete         |  0  | −1    |
//! | up      | down | `Switch{Up→Down}` | update(down) | −1  | +1    |
//! | down    | up   | `Switch{Down→Up}` | update(up)   | +1  | −1    |

use serde::{Deserialize, Serialize};
use tally_common::Error;

/// A cast vote. "No vote" is represented by absence (`Option::None`), never
/// by a variant, so it cannot be submitted as a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Up,
    Down,
}

impl VoteChoice {
    /// Stored representation: +1 / −1
    pub fn value(self) -> i64 {
        match self {
            VoteChoice::Up => 1,
            VoteChoice::Down => -1,
        }
    }
}

impl TryFrom<i64> for VoteChoice {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteChoice::Up),
            -1 => Ok(VoteChoice::Down),
            other => Err(Error::InvalidVoteValue(other)),
        }
    }
}

/// Outcome of applying a new vote on top of the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// No prior vote; record the new one
    Cast(VoteChoice),
    /// Same value re-selected; withdraw it
    Cancel(VoteChoice),
    /// Opposite value selected; flip the record
    Switch { from: VoteChoice, to: VoteChoice },
}

/// What happens to the stored vote record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordEffect {
    Create(VoteChoice),
    Update(VoteChoice),
    Delete,
}

/// Signed adjustment to a target's up/down counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterDelta {
    pub up: i64,
    pub down: i64,
}

impl CounterDelta {
    /// Net change to `upvotes - downvotes`
    pub fn net(self) -> i64 {
        self.up - self.down
    }
}

/// Decide the transition for `new` given the voter's `current` vote
pub fn decide(current: Option<VoteChoice>, new: VoteChoice) -> VoteTransition {
    match current {
        None => VoteTransition::Cast(new),
        Some(prev) if prev == new => VoteTransition::Cancel(prev),
        Some(prev) => VoteTransition::Switch { from: prev, to: new },
    }
}

impl VoteTransition {
    pub fn record_effect(self) -> RecordEffect {
        match self {
            VoteTransition::Cast(choice) => RecordEffect::Create(choice),
            VoteTransition::Cancel(_) => RecordEffect::Delete,
            VoteTransition::Switch { to, .. } => RecordEffect::Update(to),
        }
    }

    pub fn delta(self) -> CounterDelta {
        match self {
            VoteTransition::Cast(choice) => counter(choice, 1),
            VoteTransition::Cancel(choice) => counter(choice, -1),
            VoteTransition::Switch { from, to } => {
                let removed = counter(from, -1);
                let added = counter(to, 1);
                CounterDelta {
                    up: removed.up + added.up,
                    down: removed.down + added.down,
                }
            }
        }
    }

    /// The voter's vote after the transition
    pub fn resulting_vote(self) -> Option<VoteChoice> {
        match self {
            VoteTransition::Cast(choice) => Some(choice),
            VoteTransition::Cancel(_) => None,
            VoteTransition::Switch { to, .. } => Some(to),
        }
    }
}

fn counter(choice: VoteChoice, amount: i64) -> CounterDelta {
    match choice {
        VoteChoice::Up => CounterDelta { up: amount, down: 0 },
        VoteChoice::Down => CounterDelta { up: 0, down: amount },
    }
}
