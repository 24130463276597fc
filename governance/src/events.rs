//! Outbound governance events.
//!
//! The engine emits events into an explicit mpsc channel after the owning
//! critical section commits; the notification collaborator consumes the
//! receiver and owns delivery/retry. There is no process-wide subscriber
//! list: whoever constructs the engine decides who listens.

use crate::proposal::{ProposalKind, ProposalStatus};
use covote_types::{AssetId, FundAmount, ProposalId, Timestamp, UserId};
use tokio::sync::mpsc;

/// Why a proposal reached its terminal status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinalizeReason {
    /// The votes mathematically decided the outcome before the deadline.
    QuorumReached,
    /// The expiration sweeper resolved the proposal at its deadline.
    DeadlineElapsed,
    /// The ownership table changed under the proposal; the proposer should
    /// resubmit against the current table.
    StaleOwnership,
    /// Withdrawn by the proposer.
    Withdrawn,
}

/// Events emitted by the governance engine after state commits.
#[derive(Clone, Debug)]
pub enum GovernanceEvent {
    ProposalCreated {
        proposal_id: ProposalId,
        asset_id: AssetId,
        proposer: UserId,
        kind: ProposalKind,
        deadline: Timestamp,
    },
    VoteCast {
        proposal_id: ProposalId,
        asset_id: AssetId,
        voter: UserId,
    },
    ProposalFinalized {
        proposal_id: ProposalId,
        asset_id: AssetId,
        status: ProposalStatus,
        reason: FinalizeReason,
    },
    /// The approved effect mutated domain state and wrote history.
    EffectApplied {
        proposal_id: ProposalId,
        asset_id: AssetId,
    },
    /// An approved expenditure could not be executed.
    EffectUnfulfilled {
        proposal_id: ProposalId,
        asset_id: AssetId,
        requested: FundAmount,
        available: FundAmount,
    },
}

/// Sending half of the engine's event channel.
///
/// Emission is fire-and-forget: a dropped receiver means nobody is
/// listening, which is fine (e.g. in tests).
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<GovernanceEvent>,
}

impl EventSender {
    /// Create the channel; hand the receiver to the notification
    /// collaborator.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<GovernanceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: GovernanceEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("governance event dropped: no receiver");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_emission_order() {
        let (sender, mut rx) = EventSender::channel();
        sender.emit(GovernanceEvent::VoteCast {
            proposal_id: ProposalId::new(1),
            asset_id: AssetId::new("veh_1"),
            voter: UserId::new("usr_a"),
        });
        sender.emit(GovernanceEvent::EffectApplied {
            proposal_id: ProposalId::new(1),
            asset_id: AssetId::new("veh_1"),
        });

        assert!(matches!(
            rx.try_recv().unwrap(),
            GovernanceEvent::VoteCast { .. }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            GovernanceEvent::EffectApplied { .. }
        ));
    }

    #[test]
    fn emit_without_receiver_is_a_no_op() {
        let (sender, rx) = EventSender::channel();
        drop(rx);
        sender.emit(GovernanceEvent::EffectApplied {
            proposal_id: ProposalId::new(1),
            asset_id: AssetId::new("veh_1"),
        });
    }
}
