//! Governance proposals and their lifecycle data.

use crate::error::GovernanceError;
use covote_store::OwnerShare;
use covote_types::{AssetId, FundAmount, ProposalId, Timestamp, UserId, Weight};
use serde::{Deserialize, Serialize};

/// The lifecycle status of a proposal.
///
/// Transitions only move forward: `Pending` is the sole non-terminal state,
/// and every other status is a sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Created, accepting votes.
    Pending,
    /// Quorum approved and the effect was applied.
    Approved,
    /// Voted down, deadline elapsed without quorum, or the governed state
    /// changed under the proposal before it could be applied.
    Rejected,
    /// Withdrawn by the proposer before finalization.
    Cancelled,
    /// Deadline elapsed with no votes cast at all.
    Expired,
    /// Approved by vote, but the effect could not be executed
    /// (e.g. insufficient funds). Distinct from `Rejected` so the audit
    /// trail separates vote outcome from execution outcome.
    Unfulfilled,
}

impl ProposalStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }
}

/// The closed set of decision kinds the engine adjudicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalKind {
    /// Redistribute the asset's ownership percentages. Requires unanimity.
    OwnershipChange,
    /// Authorize a debit from the shared maintenance fund. Requires a
    /// strict weighted majority.
    MaintenanceExpenditure,
}

/// What a proposal changes. Immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalPayload {
    OwnershipChange {
        /// The proposed replacement ownership table. Must sum to exactly
        /// 10_000 basis points with every share positive.
        splits: Vec<OwnerShare>,
    },
    MaintenanceExpenditure {
        amount: FundAmount,
        /// Invoice or work-order reference carried into the audit trail.
        reference: String,
    },
}

impl ProposalPayload {
    pub fn kind(&self) -> ProposalKind {
        match self {
            Self::OwnershipChange { .. } => ProposalKind::OwnershipChange,
            Self::MaintenanceExpenditure { .. } => ProposalKind::MaintenanceExpenditure,
        }
    }

    /// Kind-specific payload validation, run at creation and re-run
    /// defensively at apply time.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        match self {
            Self::OwnershipChange { splits } => validate_splits(splits),
            Self::MaintenanceExpenditure { amount, .. } => {
                if amount.is_zero() {
                    return Err(GovernanceError::ZeroAmount);
                }
                Ok(())
            }
        }
    }
}

/// Validate a proposed ownership table: non-empty, all shares positive,
/// summing to exactly 100.00%.
pub fn validate_splits(splits: &[OwnerShare]) -> Result<(), GovernanceError> {
    if splits.is_empty() {
        return Err(GovernanceError::EmptySplits);
    }
    for share in splits {
        if share.weight.is_zero() {
            return Err(GovernanceError::ZeroSplit(share.owner.clone()));
        }
    }
    let total: Weight = splits.iter().map(|s| s.weight).sum();
    if total != Weight::FULL {
        return Err(GovernanceError::SplitsNotFull {
            total_bps: total.bps(),
        });
    }
    Ok(())
}

/// A co-owner permitted to vote, with the voting weight snapshotted from
/// the ownership table at proposal-creation time.
///
/// Snapshotting keeps quorum arithmetic deterministic even while the
/// ownership table itself is mid-change under a concurrent proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleVoter {
    pub voter: UserId,
    pub weight: Weight,
}

/// A request for collective action on one governed asset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub asset_id: AssetId,
    pub proposer: UserId,
    pub payload: ProposalPayload,
    /// Free-text rationale supplied by the proposer.
    pub reason: String,
    /// Who may vote, snapshotted at creation.
    pub eligible: Vec<EligibleVoter>,
    /// Version of the governed state (ownership table or fund) captured at
    /// creation. The ownership effect re-checks it at apply time to detect
    /// a table that changed under the proposal.
    pub base_version: u64,
    pub created_at: Timestamp,
    pub deadline: Timestamp,
    pub status: ProposalStatus,
    pub finalized_at: Option<Timestamp>,
}

impl Proposal {
    pub fn kind(&self) -> ProposalKind {
        self.payload.kind()
    }

    /// Total voting weight of the eligible snapshot.
    pub fn total_eligible_weight(&self) -> Weight {
        self.eligible.iter().map(|v| v.weight).sum()
    }

    /// The snapshotted weight of one voter, `None` if not eligible.
    pub fn eligible_weight_of(&self, voter: &UserId) -> Option<Weight> {
        self.eligible
            .iter()
            .find(|v| &v.voter == voter)
            .map(|v| v.weight)
    }
}
