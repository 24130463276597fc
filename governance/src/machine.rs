//! Per-proposal state machine.
//!
//! A [`ProposalMachine`] couples one proposal with its vote ledger and is
//! the unit of persistence: the pair is encoded as a single bincode blob,
//! so a vote upsert and a status transition always commit together and can
//! never be observed torn after a restart.
//!
//! The machine itself is not synchronized; the engine wraps each open
//! machine in its own mutex, which is what makes the Pending→terminal
//! check-and-transition an exclusive compare-and-set.

use crate::error::GovernanceError;
use crate::ledger::{Vote, VoteDecision, VoteLedger};
use crate::proposal::{EligibleVoter, Proposal, ProposalPayload, ProposalStatus};
use crate::quorum::{self, Tally};
use covote_types::{AssetId, ProposalId, Timestamp, UserId, Weight};
use serde::{Deserialize, Serialize};

/// One proposal plus its votes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProposalMachine {
    pub proposal: Proposal,
    pub ledger: VoteLedger,
}

impl ProposalMachine {
    /// Create a new pending proposal after validating the payload, the
    /// deadline, and the eligible-voter snapshot.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: ProposalId,
        asset_id: AssetId,
        proposer: UserId,
        payload: ProposalPayload,
        reason: String,
        eligible: Vec<EligibleVoter>,
        base_version: u64,
        created_at: Timestamp,
        deadline: Timestamp,
    ) -> Result<Self, GovernanceError> {
        payload.validate()?;
        if deadline <= created_at {
            return Err(GovernanceError::DeadlineNotAfterCreation);
        }
        if eligible.is_empty() {
            return Err(GovernanceError::NoEligibleVoters);
        }
        let total: Weight = eligible.iter().map(|v| v.weight).sum();
        if total != Weight::FULL {
            return Err(GovernanceError::EligibleWeightNotFull {
                total_bps: total.bps(),
            });
        }
        if !eligible.iter().any(|v| v.voter == proposer) {
            return Err(GovernanceError::NotEligible(proposer));
        }

        Ok(Self {
            proposal: Proposal {
                id,
                asset_id,
                proposer,
                payload,
                reason,
                eligible,
                base_version,
                created_at,
                deadline,
                status: ProposalStatus::Pending,
                finalized_at: None,
            },
            ledger: VoteLedger::new(),
        })
    }

    /// Record (or replace) a vote and re-evaluate quorum.
    ///
    /// Fails if the proposal is no longer pending, the voting window has
    /// closed, or the voter is not in the eligible snapshot.
    pub fn cast_vote(
        &mut self,
        voter: UserId,
        decision: VoteDecision,
        comment: Option<String>,
        now: Timestamp,
    ) -> Result<Tally, GovernanceError> {
        if self.proposal.status.is_terminal() {
            return Err(GovernanceError::ProposalFinalized(self.proposal.id));
        }
        if self.proposal.deadline.is_reached(now) {
            return Err(GovernanceError::VotingClosed);
        }
        if self.proposal.eligible_weight_of(&voter).is_none() {
            return Err(GovernanceError::NotEligible(voter));
        }

        self.ledger.upsert(Vote {
            voter,
            decision,
            comment,
            cast_at: now,
        });
        Ok(self.tally())
    }

    /// Withdraw the proposal. Proposer-only, pending-only; when
    /// `require_no_votes` is set, only while no vote is on record.
    pub fn cancel(
        &mut self,
        by: &UserId,
        require_no_votes: bool,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        if self.proposal.status.is_terminal() {
            return Err(GovernanceError::ProposalFinalized(self.proposal.id));
        }
        if by != &self.proposal.proposer {
            return Err(GovernanceError::NotProposer);
        }
        if require_no_votes && !self.ledger.is_empty() {
            return Err(GovernanceError::InvalidTransition(
                "proposal already has votes on record".to_string(),
            ));
        }
        self.complete_finalize(ProposalStatus::Cancelled, now);
        Ok(())
    }

    /// The current quorum tally.
    pub fn tally(&self) -> Tally {
        quorum::evaluate(&self.proposal.eligible, &self.ledger, self.proposal.kind())
    }

    /// Whether the voting deadline has elapsed.
    pub fn deadline_reached(&self, now: Timestamp) -> bool {
        self.proposal.deadline.is_reached(now)
    }

    /// The terminal status the deadline resolves this proposal to.
    pub fn deadline_outcome(&self, expire_when_no_votes: bool) -> ProposalStatus {
        quorum::resolve_at_deadline(&self.tally(), self.ledger.len(), expire_when_no_votes)
    }

    /// Commit the terminal transition. Caller must hold the machine's lock
    /// and have verified the status is still `Pending`.
    pub fn complete_finalize(&mut self, status: ProposalStatus, now: Timestamp) {
        debug_assert!(self.proposal.status.is_pending());
        debug_assert!(status.is_terminal());
        self.proposal.status = status;
        self.proposal.finalized_at = Some(now);
    }

    /// Encode the machine as its persistence blob.
    pub fn encode(&self) -> Result<Vec<u8>, GovernanceError> {
        bincode::serialize(self).map_err(|e| GovernanceError::Serialization(e.to_string()))
    }

    /// Decode a machine from its persistence blob.
    pub fn decode(data: &[u8]) -> Result<Self, GovernanceError> {
        bincode::deserialize(data).map_err(|e| GovernanceError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quorum::QuorumDecision;
    use covote_store::OwnerShare;
    use covote_types::FundAmount;

    fn user(name: &str) -> UserId {
        UserId::new(format!("usr_{name}"))
    }

    fn eligible_pair() -> Vec<EligibleVoter> {
        vec![
            EligibleVoter {
                voter: user("a"),
                weight: Weight::from_bps(5_000),
            },
            EligibleVoter {
                voter: user("b"),
                weight: Weight::from_bps(5_000),
            },
        ]
    }

    fn expenditure_machine() -> ProposalMachine {
        ProposalMachine::create(
            ProposalId::new(1),
            AssetId::new("veh_1"),
            user("a"),
            ProposalPayload::MaintenanceExpenditure {
                amount: FundAmount::new(100_000),
                reference: "inv-17".to_string(),
            },
            "brake service".to_string(),
            eligible_pair(),
            1,
            Timestamp::new(100),
            Timestamp::new(1_000),
        )
        .unwrap()
    }

    #[test]
    fn create_rejects_bad_deadline() {
        let err = ProposalMachine::create(
            ProposalId::new(1),
            AssetId::new("veh_1"),
            user("a"),
            ProposalPayload::MaintenanceExpenditure {
                amount: FundAmount::new(1),
                reference: String::new(),
            },
            String::new(),
            eligible_pair(),
            1,
            Timestamp::new(100),
            Timestamp::new(100),
        )
        .unwrap_err();
        assert!(matches!(err, GovernanceError::DeadlineNotAfterCreation));
    }

    #[test]
    fn create_rejects_non_owner_proposer() {
        let err = ProposalMachine::create(
            ProposalId::new(1),
            AssetId::new("veh_1"),
            user("outsider"),
            ProposalPayload::MaintenanceExpenditure {
                amount: FundAmount::new(1),
                reference: String::new(),
            },
            String::new(),
            eligible_pair(),
            1,
            Timestamp::new(100),
            Timestamp::new(1_000),
        )
        .unwrap_err();
        assert!(matches!(err, GovernanceError::NotEligible(_)));
    }

    #[test]
    fn create_rejects_partial_snapshot() {
        let err = ProposalMachine::create(
            ProposalId::new(1),
            AssetId::new("veh_1"),
            user("a"),
            ProposalPayload::MaintenanceExpenditure {
                amount: FundAmount::new(1),
                reference: String::new(),
            },
            String::new(),
            vec![EligibleVoter {
                voter: user("a"),
                weight: Weight::from_bps(6_000),
            }],
            1,
            Timestamp::new(100),
            Timestamp::new(1_000),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::EligibleWeightNotFull { total_bps: 6_000 }
        ));
    }

    #[test]
    fn vote_after_deadline_is_closed() {
        let mut machine = expenditure_machine();
        let err = machine
            .cast_vote(user("a"), VoteDecision::Approve, None, Timestamp::new(1_000))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::VotingClosed));
    }

    #[test]
    fn vote_on_finalized_proposal_rejected() {
        let mut machine = expenditure_machine();
        machine.complete_finalize(ProposalStatus::Rejected, Timestamp::new(500));
        let err = machine
            .cast_vote(user("a"), VoteDecision::Approve, None, Timestamp::new(600))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::ProposalFinalized(_)));
    }

    #[test]
    fn ineligible_voter_rejected() {
        let mut machine = expenditure_machine();
        let err = machine
            .cast_vote(user("x"), VoteDecision::Approve, None, Timestamp::new(200))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::NotEligible(_)));
    }

    #[test]
    fn recast_counts_latest_decision_only() {
        let mut machine = expenditure_machine();
        machine
            .cast_vote(user("a"), VoteDecision::Reject, None, Timestamp::new(200))
            .unwrap();
        let tally = machine
            .cast_vote(user("a"), VoteDecision::Approve, None, Timestamp::new(300))
            .unwrap();
        assert_eq!(tally.approved, Weight::from_bps(5_000));
        assert_eq!(tally.rejected, Weight::ZERO);
    }

    #[test]
    fn cancel_only_by_proposer() {
        let mut machine = expenditure_machine();
        assert!(matches!(
            machine.cancel(&user("b"), true, Timestamp::new(200)),
            Err(GovernanceError::NotProposer)
        ));
        machine.cancel(&user("a"), true, Timestamp::new(200)).unwrap();
        assert_eq!(machine.proposal.status, ProposalStatus::Cancelled);
        assert_eq!(machine.proposal.finalized_at, Some(Timestamp::new(200)));
    }

    #[test]
    fn cancel_blocked_after_votes_under_default_policy() {
        let mut machine = expenditure_machine();
        machine
            .cast_vote(user("b"), VoteDecision::Approve, None, Timestamp::new(200))
            .unwrap();
        assert!(matches!(
            machine.cancel(&user("a"), true, Timestamp::new(300)),
            Err(GovernanceError::InvalidTransition(_))
        ));
        // Relaxed policy allows it.
        machine.cancel(&user("a"), false, Timestamp::new(300)).unwrap();
    }

    #[test]
    fn ownership_machine_splits_validated_at_creation() {
        let err = ProposalMachine::create(
            ProposalId::new(2),
            AssetId::new("veh_1"),
            user("a"),
            ProposalPayload::OwnershipChange {
                splits: vec![OwnerShare::new(user("a"), Weight::from_bps(9_999))],
            },
            String::new(),
            eligible_pair(),
            1,
            Timestamp::new(100),
            Timestamp::new(1_000),
        )
        .unwrap_err();
        assert!(matches!(err, GovernanceError::SplitsNotFull { .. }));
    }

    #[test]
    fn blob_roundtrip_preserves_votes_and_status() {
        let mut machine = expenditure_machine();
        machine
            .cast_vote(user("a"), VoteDecision::Approve, Some("ok".into()), Timestamp::new(200))
            .unwrap();

        let blob = machine.encode().unwrap();
        let restored = ProposalMachine::decode(&blob).unwrap();
        assert_eq!(restored.proposal.id, machine.proposal.id);
        assert_eq!(restored.ledger.len(), 1);
        assert_eq!(
            restored.ledger.decision_of(&user("a")),
            Some(VoteDecision::Approve)
        );
        assert_eq!(restored.tally().decision, QuorumDecision::Pending);
    }
}
