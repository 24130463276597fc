//! Proposal storage trait.
//!
//! Proposals are stored as opaque blobs: the governance engine owns the
//! encoding (one bincode snapshot per proposal, votes included, so a vote
//! upsert and a status transition always land in the same write).

use crate::StoreError;
use covote_types::{AssetId, ProposalId};

/// Persistent storage for proposal snapshots.
pub trait ProposalStore {
    /// Upsert a proposal blob. `open` maintains the open-proposal index:
    /// finalized proposals are written with `open = false` and drop out of
    /// [`ProposalStore::list_open_proposals`].
    fn put_proposal(
        &self,
        id: ProposalId,
        asset: &AssetId,
        data: &[u8],
        open: bool,
    ) -> Result<(), StoreError>;

    /// Get a proposal blob by id.
    fn get_proposal(&self, id: ProposalId) -> Result<Vec<u8>, StoreError>;

    /// Ids of all proposals still open (pending), for startup rehydration.
    fn list_open_proposals(&self) -> Result<Vec<ProposalId>, StoreError>;

    /// Ids of all proposals ever created for an asset, open and closed,
    /// in ascending id order.
    fn proposals_for_asset(&self, asset: &AssetId) -> Result<Vec<ProposalId>, StoreError>;
}
