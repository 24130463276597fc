use covote_store::StoreError;
use covote_types::{ProposalId, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("user {0} is not eligible to vote on this proposal")]
    NotEligible(UserId),

    #[error("proposal {0} has already been finalized")]
    ProposalFinalized(ProposalId),

    #[error("voting window has closed for this proposal")]
    VotingClosed,

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("only the proposer can cancel a proposal")]
    NotProposer,

    #[error("proposed ownership splits are empty")]
    EmptySplits,

    #[error("proposed split for {0} is zero")]
    ZeroSplit(UserId),

    #[error("proposed splits sum to {total_bps} basis points, expected 10000")]
    SplitsNotFull { total_bps: u32 },

    #[error("eligible voter weights sum to {total_bps} basis points, expected 10000")]
    EligibleWeightNotFull { total_bps: u32 },

    #[error("asset has no eligible voters")]
    NoEligibleVoters,

    #[error("expenditure amount must be positive")]
    ZeroAmount,

    #[error("proposal deadline must be after its creation time")]
    DeadlineNotAfterCreation,

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
