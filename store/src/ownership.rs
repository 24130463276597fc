//! Ownership table storage trait.

use crate::StoreError;
use covote_types::{AssetId, UserId, Weight};
use serde::{Deserialize, Serialize};

/// One co-owner's share of an asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerShare {
    pub owner: UserId,
    pub weight: Weight,
}

impl OwnerShare {
    pub fn new(owner: UserId, weight: Weight) -> Self {
        Self { owner, weight }
    }
}

/// A versioned snapshot of an asset's ownership table.
///
/// The version increments on every replacement; it is the token for the
/// optimistic concurrency check at effect-application time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipSnapshot {
    pub version: u64,
    pub splits: Vec<OwnerShare>,
}

impl OwnershipSnapshot {
    /// Sum of all shares, saturating at `u32::MAX` bps.
    pub fn total_weight(&self) -> Weight {
        self.splits.iter().map(|s| s.weight).sum()
    }

    /// Look up one owner's share.
    pub fn weight_of(&self, owner: &UserId) -> Option<Weight> {
        self.splits
            .iter()
            .find(|s| &s.owner == owner)
            .map(|s| s.weight)
    }
}

/// Persistent storage for per-asset ownership tables.
pub trait OwnershipStore {
    /// Get the current ownership snapshot for an asset.
    fn ownership_of(&self, asset: &AssetId) -> Result<OwnershipSnapshot, StoreError>;

    /// Replace the ownership table, guarded by the expected version.
    ///
    /// Returns the new version on success, `VersionConflict` if the stored
    /// version no longer matches `expected_version`.
    fn replace_ownership(
        &self,
        asset: &AssetId,
        splits: &[OwnerShare],
        expected_version: u64,
    ) -> Result<u64, StoreError>;

    /// Seed or overwrite the ownership table unconditionally (asset
    /// onboarding; not used by the governance engine itself).
    fn put_ownership(&self, asset: &AssetId, splits: &[OwnerShare]) -> Result<u64, StoreError>;
}
