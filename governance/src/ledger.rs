//! Per-proposal vote ledger.
//!
//! Keeps the latest vote per eligible voter. Re-casting before finalization
//! replaces the prior decision (last-write-wins); the ledger freezes
//! implicitly once the proposal leaves `Pending`, because the state machine
//! stops accepting casts.

use covote_types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A voter's decision on a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteDecision {
    Approve,
    Reject,
}

/// One voter's recorded vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: UserId,
    pub decision: VoteDecision,
    pub comment: Option<String>,
    pub cast_at: Timestamp,
}

/// Whether an upsert recorded a first vote or replaced an earlier one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastOutcome {
    /// First vote from this voter.
    Recorded,
    /// Replaced the voter's earlier decision.
    Replaced(VoteDecision),
}

/// Latest vote per voter for a single proposal.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VoteLedger {
    votes: HashMap<UserId, Vote>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vote, replacing any earlier vote by the same voter.
    pub fn upsert(&mut self, vote: Vote) -> CastOutcome {
        match self.votes.insert(vote.voter.clone(), vote) {
            None => CastOutcome::Recorded,
            Some(prior) => CastOutcome::Replaced(prior.decision),
        }
    }

    /// The voter's current vote, if any.
    pub fn get(&self, voter: &UserId) -> Option<&Vote> {
        self.votes.get(voter)
    }

    /// The voter's current decision, if any.
    pub fn decision_of(&self, voter: &UserId) -> Option<VoteDecision> {
        self.votes.get(voter).map(|v| v.decision)
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }
}
