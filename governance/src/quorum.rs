//! Quorum evaluation — pure arithmetic over the eligible snapshot and the
//! vote ledger.
//!
//! Two rules, one per proposal kind:
//! - **OwnershipChange**: unanimity by head count. A single reject fails
//!   fast; approval requires every eligible voter on record with Approve.
//! - **MaintenanceExpenditure**: strict weighted majority. Approve (or
//!   reject) weight must exceed half the total eligible weight.
//!
//! All weights are fixed-point basis points; comparisons are integer
//! comparisons, never floating equality.

use crate::ledger::{VoteDecision, VoteLedger};
use crate::proposal::{EligibleVoter, ProposalKind, ProposalStatus};
use covote_types::Weight;
use serde::{Deserialize, Serialize};

/// What the current votes mathematically decide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuorumDecision {
    /// Not yet decided; more votes (or the deadline) will settle it.
    Pending,
    Approved,
    Rejected,
}

/// A point-in-time tally of a proposal's votes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub decision: QuorumDecision,
    /// Summed weight of eligible voters currently approving.
    pub approved: Weight,
    /// Summed weight of eligible voters currently rejecting.
    pub rejected: Weight,
    /// Summed weight of eligible voters yet to vote.
    pub undecided: Weight,
}

/// Evaluate the quorum rule for `kind` against the current ledger.
pub fn evaluate(eligible: &[EligibleVoter], ledger: &VoteLedger, kind: ProposalKind) -> Tally {
    let mut approved = Weight::ZERO;
    let mut rejected = Weight::ZERO;
    let mut approvals = 0usize;
    let mut rejections = 0usize;

    for voter in eligible {
        match ledger.decision_of(&voter.voter) {
            Some(VoteDecision::Approve) => {
                approved = approved + voter.weight;
                approvals += 1;
            }
            Some(VoteDecision::Reject) => {
                rejected = rejected + voter.weight;
                rejections += 1;
            }
            None => {}
        }
    }

    let total: Weight = eligible.iter().map(|v| v.weight).sum();
    let undecided = total.saturating_sub(approved).saturating_sub(rejected);

    let decision = match kind {
        ProposalKind::OwnershipChange => {
            if rejections > 0 {
                QuorumDecision::Rejected
            } else if !eligible.is_empty() && approvals == eligible.len() {
                QuorumDecision::Approved
            } else {
                QuorumDecision::Pending
            }
        }
        ProposalKind::MaintenanceExpenditure => {
            if approved.exceeds_half_of(total) {
                QuorumDecision::Approved
            } else if rejected.exceeds_half_of(total) {
                QuorumDecision::Rejected
            } else {
                QuorumDecision::Pending
            }
        }
    };

    Tally {
        decision,
        approved,
        rejected,
        undecided,
    }
}

/// Resolve a tally once the deadline has elapsed.
///
/// Anything not already mathematically approved fails safe to `Rejected`,
/// including the exact 50/50 weighted tie and incomplete unanimity. A
/// proposal nobody voted on at all becomes `Expired` when
/// `expire_when_no_votes` is set.
pub fn resolve_at_deadline(
    tally: &Tally,
    votes_cast: usize,
    expire_when_no_votes: bool,
) -> ProposalStatus {
    match tally.decision {
        QuorumDecision::Approved => ProposalStatus::Approved,
        QuorumDecision::Rejected => ProposalStatus::Rejected,
        QuorumDecision::Pending => {
            if votes_cast == 0 && expire_when_no_votes {
                ProposalStatus::Expired
            } else {
                ProposalStatus::Rejected
            }
        }
    }
}
