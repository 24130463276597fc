//! Effect application — the atomic domain mutation an approved proposal
//! triggers.
//!
//! Runs only inside the engine's per-asset critical section. Every applied
//! effect pairs the domain write with a history append; if the append fails
//! after the write, the write is compensated so the pair stays atomic. A
//! durable backend would instead commit both in one write transaction via
//! the `covote-store` transaction seam.

use std::sync::Arc;

use crate::error::GovernanceError;
use crate::proposal::{validate_splits, Proposal, ProposalPayload};
use covote_store::{
    FundStore, HistoryChange, HistoryRecord, HistoryStore, OwnerShare, OwnershipStore, StoreError,
};
use covote_types::{FundAmount, Timestamp};

/// Attempts before giving up on a contended fund debit. External credits
/// may bump the fund version between the balance read and the debit.
const DEBIT_ATTEMPTS: u32 = 3;

/// How applying an approved proposal turned out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EffectOutcome {
    /// Domain state mutated, history written.
    Applied,
    /// The governed state changed since the proposal was created; nothing
    /// was mutated. The engine forces the proposal to `Rejected`.
    StaleState { expected: u64, actual: u64 },
    /// The fund cannot cover the approved amount; nothing was debited.
    /// The engine finalizes the proposal as `Unfulfilled`.
    Unfulfilled {
        requested: FundAmount,
        available: FundAmount,
    },
}

/// Applies kind-specific effects for approved proposals.
pub struct EffectApplier {
    ownership: Arc<dyn OwnershipStore + Send + Sync>,
    funds: Arc<dyn FundStore + Send + Sync>,
    history: Arc<dyn HistoryStore + Send + Sync>,
}

impl EffectApplier {
    pub fn new(
        ownership: Arc<dyn OwnershipStore + Send + Sync>,
        funds: Arc<dyn FundStore + Send + Sync>,
        history: Arc<dyn HistoryStore + Send + Sync>,
    ) -> Self {
        Self {
            ownership,
            funds,
            history,
        }
    }

    /// Apply the proposal's effect. Must only be called for proposals whose
    /// quorum outcome is approval, under the proposal's asset lock.
    ///
    /// An `Err` means infrastructure failure with no effect committed; the
    /// engine leaves the proposal pending so finalization retries whole.
    pub fn apply(
        &self,
        proposal: &Proposal,
        now: Timestamp,
    ) -> Result<EffectOutcome, GovernanceError> {
        match &proposal.payload {
            ProposalPayload::OwnershipChange { splits } => {
                self.apply_ownership_change(proposal, splits, now)
            }
            ProposalPayload::MaintenanceExpenditure { amount, reference } => {
                self.apply_expenditure(proposal, *amount, reference, now)
            }
        }
    }

    fn apply_ownership_change(
        &self,
        proposal: &Proposal,
        splits: &[OwnerShare],
        now: Timestamp,
    ) -> Result<EffectOutcome, GovernanceError> {
        // Already validated at creation; re-checked before mutating.
        validate_splits(splits)?;

        let current = self.ownership.ownership_of(&proposal.asset_id)?;
        if current.version != proposal.base_version {
            tracing::warn!(
                proposal = %proposal.id,
                asset = %proposal.asset_id,
                expected = proposal.base_version,
                actual = current.version,
                "ownership table changed since proposal creation"
            );
            return Ok(EffectOutcome::StaleState {
                expected: proposal.base_version,
                actual: current.version,
            });
        }

        let new_version =
            match self
                .ownership
                .replace_ownership(&proposal.asset_id, splits, current.version)
            {
                Ok(v) => v,
                Err(StoreError::VersionConflict { expected, actual }) => {
                    return Ok(EffectOutcome::StaleState { expected, actual });
                }
                Err(e) => return Err(e.into()),
            };

        let record = HistoryRecord {
            asset_id: proposal.asset_id.clone(),
            proposal_id: proposal.id,
            change: HistoryChange::OwnershipReplaced {
                before: current.splits.clone(),
                after: splits.to_vec(),
            },
            applied_at: now,
            applied_by: proposal.proposer.clone(),
        };
        if let Err(e) = self.history.append_history(&record) {
            // Compensate the table write so effect + history stay atomic.
            if let Err(restore_err) =
                self.ownership
                    .replace_ownership(&proposal.asset_id, &current.splits, new_version)
            {
                tracing::error!(
                    proposal = %proposal.id,
                    asset = %proposal.asset_id,
                    %restore_err,
                    "failed to restore ownership table after history append failure"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            proposal = %proposal.id,
            asset = %proposal.asset_id,
            version = new_version,
            "ownership table replaced"
        );
        Ok(EffectOutcome::Applied)
    }

    fn apply_expenditure(
        &self,
        proposal: &Proposal,
        amount: FundAmount,
        reference: &str,
        now: Timestamp,
    ) -> Result<EffectOutcome, GovernanceError> {
        for _ in 0..DEBIT_ATTEMPTS {
            let balance = match self.funds.balance_of(&proposal.asset_id) {
                Ok(b) => b,
                Err(StoreError::NotFound(_)) => {
                    return self.record_unfulfilled(proposal, amount, FundAmount::ZERO, reference, now)
                }
                Err(e) => return Err(e.into()),
            };

            if balance.amount < amount {
                return self.record_unfulfilled(proposal, amount, balance.amount, reference, now);
            }

            match self.funds.debit(&proposal.asset_id, amount, balance.version) {
                Ok(_) => {
                    let record = HistoryRecord {
                        asset_id: proposal.asset_id.clone(),
                        proposal_id: proposal.id,
                        change: HistoryChange::FundDebited {
                            amount,
                            balance_before: balance.amount,
                            balance_after: balance.amount.saturating_sub(amount),
                            reference: reference.to_string(),
                        },
                        applied_at: now,
                        applied_by: proposal.proposer.clone(),
                    };
                    if let Err(e) = self.history.append_history(&record) {
                        if let Err(restore_err) = self.funds.credit(&proposal.asset_id, amount) {
                            tracing::error!(
                                proposal = %proposal.id,
                                asset = %proposal.asset_id,
                                %restore_err,
                                "failed to re-credit fund after history append failure"
                            );
                        }
                        return Err(e.into());
                    }
                    tracing::info!(
                        proposal = %proposal.id,
                        asset = %proposal.asset_id,
                        %amount,
                        "maintenance fund debited"
                    );
                    return Ok(EffectOutcome::Applied);
                }
                // A concurrent credit bumped the version or lowered the
                // balance; re-read and retry.
                Err(StoreError::VersionConflict { .. }) | Err(StoreError::Rejected(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(GovernanceError::Store(StoreError::Backend(
            "fund debit contended after repeated attempts".to_string(),
        )))
    }

    fn record_unfulfilled(
        &self,
        proposal: &Proposal,
        requested: FundAmount,
        available: FundAmount,
        reference: &str,
        now: Timestamp,
    ) -> Result<EffectOutcome, GovernanceError> {
        self.history.append_history(&HistoryRecord {
            asset_id: proposal.asset_id.clone(),
            proposal_id: proposal.id,
            change: HistoryChange::ExpenditureUnfulfilled {
                requested,
                available,
                reference: reference.to_string(),
            },
            applied_at: now,
            applied_by: proposal.proposer.clone(),
        })?;
        tracing::warn!(
            proposal = %proposal.id,
            asset = %proposal.asset_id,
            %requested,
            %available,
            "approved expenditure unfulfilled: insufficient funds"
        );
        Ok(EffectOutcome::Unfulfilled {
            requested,
            available,
        })
    }
}
