//! Property-based tests for quorum arithmetic and vote-ledger semantics.

use std::collections::HashMap;

use proptest::prelude::*;

use covote_governance::quorum;
use covote_governance::{
    EligibleVoter, ProposalKind, QuorumDecision, Vote, VoteDecision, VoteLedger,
};
use covote_types::{Timestamp, UserId, Weight};

/// Eligible snapshots are generated by cutting the 10_000 bps interval, so
/// every snapshot has all-positive weights summing to exactly 100.00%,
/// the same invariant the engine enforces at proposal creation.
fn arb_eligible() -> impl Strategy<Value = Vec<EligibleVoter>> {
    prop::collection::btree_set(1u32..10_000, 0..5).prop_map(|cuts| {
        let mut bounds: Vec<u32> = vec![0];
        bounds.extend(cuts);
        bounds.push(10_000);
        bounds
            .windows(2)
            .enumerate()
            .map(|(i, w)| EligibleVoter {
                voter: UserId::new(format!("usr_v{i}")),
                weight: Weight::from_bps(w[1] - w[0]),
            })
            .collect()
    })
}

/// An arbitrary sequence of casts: (voter index, approve?).
fn arb_casts() -> impl Strategy<Value = Vec<(prop::sample::Index, bool)>> {
    prop::collection::vec((any::<prop::sample::Index>(), any::<bool>()), 0..24)
}

fn apply_casts(
    eligible: &[EligibleVoter],
    casts: &[(prop::sample::Index, bool)],
) -> (VoteLedger, HashMap<usize, bool>) {
    let mut ledger = VoteLedger::new();
    let mut latest = HashMap::new();
    for (at, (index, approve)) in casts.iter().enumerate() {
        let i = index.index(eligible.len());
        latest.insert(i, *approve);
        ledger.upsert(Vote {
            voter: eligible[i].voter.clone(),
            decision: if *approve {
                VoteDecision::Approve
            } else {
                VoteDecision::Reject
            },
            comment: None,
            cast_at: Timestamp::new(at as u64),
        });
    }
    (ledger, latest)
}

proptest! {
    /// Approved + rejected + undecided weight always equals the full
    /// eligible weight, for either kind.
    #[test]
    fn tally_conserves_total_weight(
        eligible in arb_eligible(),
        casts in arb_casts(),
    ) {
        let (ledger, _) = apply_casts(&eligible, &casts);
        for kind in [ProposalKind::OwnershipChange, ProposalKind::MaintenanceExpenditure] {
            let tally = quorum::evaluate(&eligible, &ledger, kind);
            let recombined = tally.approved
                .checked_add(tally.rejected)
                .and_then(|w| w.checked_add(tally.undecided));
            prop_assert_eq!(recombined, Some(Weight::FULL));
        }
    }

    /// The ledger holds exactly the latest decision per voter, regardless
    /// of how many times each voter re-cast.
    #[test]
    fn ledger_is_last_write_wins(
        eligible in arb_eligible(),
        casts in arb_casts(),
    ) {
        let (ledger, latest) = apply_casts(&eligible, &casts);
        prop_assert_eq!(ledger.len(), latest.len());
        for (i, approve) in &latest {
            let expected = if *approve { VoteDecision::Approve } else { VoteDecision::Reject };
            prop_assert_eq!(ledger.decision_of(&eligible[*i].voter), Some(expected));
        }
    }

    /// Unanimity: approved iff every eligible voter's latest decision is
    /// Approve; any reject on record forces Rejected.
    #[test]
    fn unanimity_matches_head_count(
        eligible in arb_eligible(),
        casts in arb_casts(),
    ) {
        let (ledger, latest) = apply_casts(&eligible, &casts);
        let tally = quorum::evaluate(&eligible, &ledger, ProposalKind::OwnershipChange);

        let any_reject = latest.values().any(|approve| !approve);
        let all_approved = latest.len() == eligible.len()
            && latest.values().all(|approve| *approve);

        let expected = if any_reject {
            QuorumDecision::Rejected
        } else if all_approved {
            QuorumDecision::Approved
        } else {
            QuorumDecision::Pending
        };
        prop_assert_eq!(tally.decision, expected);
    }

    /// Weighted majority is strict: the decision flips only past half of
    /// the total weight, computed here independently of the tally.
    #[test]
    fn weighted_majority_is_strict(
        eligible in arb_eligible(),
        casts in arb_casts(),
    ) {
        let (ledger, latest) = apply_casts(&eligible, &casts);
        let tally = quorum::evaluate(&eligible, &ledger, ProposalKind::MaintenanceExpenditure);

        let approve_bps: u64 = latest
            .iter()
            .filter(|(_, approve)| **approve)
            .map(|(i, _)| u64::from(eligible[*i].weight.bps()))
            .sum();
        let reject_bps: u64 = latest
            .iter()
            .filter(|(_, approve)| !**approve)
            .map(|(i, _)| u64::from(eligible[*i].weight.bps()))
            .sum();

        let expected = if approve_bps * 2 > 10_000 {
            QuorumDecision::Approved
        } else if reject_bps * 2 > 10_000 {
            QuorumDecision::Rejected
        } else {
            QuorumDecision::Pending
        };
        prop_assert_eq!(tally.decision, expected);
        prop_assert_eq!(u64::from(tally.approved.bps()), approve_bps);
        prop_assert_eq!(u64::from(tally.rejected.bps()), reject_bps);
    }
}
