//! Quorum-weighted governance for shared-asset co-ownership.
//!
//! A fixed set of co-owners reaches binding decisions on one governed
//! asset: redistributing ownership percentages (unanimity) or authorizing
//! a shared-fund expenditure (strict weighted majority). The engine
//! guarantees exactly-once effect application, no double-voting, race-free
//! finalization between the vote path and the expiration sweeper, and an
//! append-only audit trail.
//!
//! Key principle: quorum arithmetic runs over a per-proposal snapshot of
//! the ownership table, in fixed-point basis points, so a concurrent
//! ownership change can never make a tally non-deterministic.

pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod logging;
pub mod machine;
pub mod proposal;
pub mod quorum;
pub mod sweeper;

pub use config::GovernanceConfig;
pub use effects::{EffectApplier, EffectOutcome};
pub use engine::{
    EngineStores, GovernanceEngine, ProposalSummary, ProposalView, SweepStats, VoteReceipt,
    VoterStatus,
};
pub use error::GovernanceError;
pub use events::{EventSender, FinalizeReason, GovernanceEvent};
pub use ledger::{CastOutcome, Vote, VoteDecision, VoteLedger};
pub use machine::ProposalMachine;
pub use proposal::{
    EligibleVoter, Proposal, ProposalKind, ProposalPayload, ProposalStatus,
};
pub use quorum::{QuorumDecision, Tally};
pub use sweeper::ExpirationSweeper;
