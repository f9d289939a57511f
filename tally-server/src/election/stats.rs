//! Pure election statistics: percentage shares and participation

use serde::Serialize;

/// Round to one decimal place
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage share of each count, rounded to one decimal
///
/// All zeros when the total is zero. Shares sum to 100 within rounding error
/// (at most 0.05 per candidate).
pub fn percentages(counts: &[i64]) -> Vec<f64> {
    let total: i64 = counts.iter().sum();
    if total <= 0 {
        return vec![0.0; counts.len()];
    }
    counts
        .iter()
        .map(|&count| round_one_decimal(count as f64 / total as f64 * 100.0))
        .collect()
}

/// Maps total ballots to a 0–100 participation figure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipationPolicy {
    /// Ballots at which participation reads 100
    pub full_turnout_votes: u64,
}

impl ParticipationPolicy {
    pub fn new(full_turnout_votes: u64) -> Self {
        Self { full_turnout_votes }
    }

    /// Monotone in `total_votes`, saturating at 100
    pub fn participation(&self, total_votes: i64) -> f64 {
        if total_votes <= 0 {
            return 0.0;
        }
        if self.full_turnout_votes == 0 {
            return 100.0;
        }
        let share = total_votes as f64 / self.full_turnout_votes as f64 * 100.0;
        round_one_decimal(share.min(100.0))
    }
}

impl Default for ParticipationPolicy {
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTally {
    pub candidate_id: String,
    pub name: String,
    pub vote_count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionStats {
    pub sg_id: String,
    pub active: bool,
    pub participation: f64,
    pub total_votes: i64,
    pub votes: Vec<CandidateTally>,
}

impl ElectionStats {
    /// Assemble stats from tallies as stored (percentages as last reconciled)
    pub fn from_stored(sg_id: &str, active: bool, votes: Vec<CandidateTally>, policy: ParticipationPolicy) -> Self {
        let total_votes = votes.iter().map(|v| v.vote_count).sum();
        Self {
            sg_id: sg_id.to_string(),
            active,
            participation: policy.participation(total_votes),
            total_votes,
            votes,
        }
    }

    /// Assemble stats with percentages recomputed from the counts
    pub fn from_counts(sg_id: &str, active: bool, mut votes: Vec<CandidateTally>, policy: ParticipationPolicy) -> Self {
        let counts: Vec<i64> = votes.iter().map(|v| v.vote_count).collect();
        for (tally, pct) in votes.iter_mut().zip(percentages(&counts)) {
            tally.percentage = pct;
        }
        Self::from_stored(sg_id, active, votes, policy)
    }
}
