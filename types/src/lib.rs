//! Fundamental types for the covote governance engine.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: asset/user/proposal identifiers, ownership weights, fund
//! amounts, and timestamps.

pub mod amount;
pub mod ids;
pub mod time;
pub mod weight;

pub use amount::FundAmount;
pub use ids::{AssetId, ProposalId, UserId};
pub use time::Timestamp;
pub use weight::Weight;
