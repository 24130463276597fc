//! Shared maintenance fund storage trait.

use crate::StoreError;
use covote_types::{AssetId, FundAmount};
use serde::{Deserialize, Serialize};

/// A versioned fund balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundBalance {
    pub version: u64,
    pub amount: FundAmount,
}

/// Persistent storage for per-asset shared funds.
pub trait FundStore {
    /// Get the current balance and version for an asset's fund.
    fn balance_of(&self, asset: &AssetId) -> Result<FundBalance, StoreError>;

    /// Debit the fund, guarded by the expected version.
    ///
    /// Returns the new version on success. Fails with `VersionConflict` if
    /// the stored version no longer matches, or `Rejected` if the debit
    /// would take the balance below zero.
    fn debit(
        &self,
        asset: &AssetId,
        amount: FundAmount,
        expected_version: u64,
    ) -> Result<u64, StoreError>;

    /// Credit the fund (contribution top-ups from the payments side).
    fn credit(&self, asset: &AssetId, amount: FundAmount) -> Result<u64, StoreError>;
}
