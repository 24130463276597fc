//! Append-only audit history storage.
//!
//! History records are written once, as a side effect of an applied (or
//! unfulfillable) governance decision, and never mutated. The trait
//! deliberately has no update or delete operations.

use crate::ownership::OwnerShare;
use crate::StoreError;
use covote_types::{AssetId, FundAmount, ProposalId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// What an applied governance decision changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryChange {
    /// The asset's ownership table was replaced.
    OwnershipReplaced {
        before: Vec<OwnerShare>,
        after: Vec<OwnerShare>,
    },
    /// The shared fund was debited for an approved expenditure.
    FundDebited {
        amount: FundAmount,
        balance_before: FundAmount,
        balance_after: FundAmount,
        reference: String,
    },
    /// An approved expenditure could not be executed.
    ExpenditureUnfulfilled {
        requested: FundAmount,
        available: FundAmount,
        reference: String,
    },
}

/// One immutable audit entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub asset_id: AssetId,
    pub proposal_id: ProposalId,
    pub change: HistoryChange,
    pub applied_at: Timestamp,
    /// The proposer on whose behalf the engine applied the decision.
    pub applied_by: UserId,
}

/// Persistent append-only storage for governance history.
pub trait HistoryStore {
    /// Append a record. Records are never rewritten.
    fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError>;

    /// All records for an asset, in append order.
    fn history_for(&self, asset: &AssetId) -> Result<Vec<HistoryRecord>, StoreError>;
}
