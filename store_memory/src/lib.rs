//! In-memory storage backend for the covote governance engine.
//!
//! Implements every trait from `covote-store` over plain hash maps behind a
//! single mutex, so writes that touch several logical stores are observed
//! atomically. This is the reference backend for tests and for embedding
//! the engine without a durable store; the surrounding platform supplies
//! its own backend in production.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use covote_store::{
    FundBalance, FundStore, HistoryRecord, HistoryStore, MetaStore, OwnerShare,
    OwnershipSnapshot, OwnershipStore, ProposalStore, StoreError,
};
use covote_types::{AssetId, FundAmount, ProposalId};

struct ProposalRow {
    asset: AssetId,
    data: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    proposals: HashMap<u64, ProposalRow>,
    open_proposals: BTreeSet<u64>,
    asset_proposals: HashMap<AssetId, Vec<ProposalId>>,
    ownership: HashMap<AssetId, OwnershipSnapshot>,
    funds: HashMap<AssetId, FundBalance>,
    history: HashMap<AssetId, Vec<HistoryRecord>>,
    meta: HashMap<String, Vec<u8>>,
}

/// Thread-safe in-memory store implementing the whole trait family.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ProposalStore for MemoryStore {
    fn put_proposal(
        &self,
        id: ProposalId,
        asset: &AssetId,
        data: &[u8],
        open: bool,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.proposals.contains_key(&id.raw()) {
            inner
                .asset_proposals
                .entry(asset.clone())
                .or_default()
                .push(id);
        }
        inner.proposals.insert(
            id.raw(),
            ProposalRow {
                asset: asset.clone(),
                data: data.to_vec(),
            },
        );
        if open {
            inner.open_proposals.insert(id.raw());
        } else {
            inner.open_proposals.remove(&id.raw());
        }
        Ok(())
    }

    fn get_proposal(&self, id: ProposalId) -> Result<Vec<u8>, StoreError> {
        self.lock()
            .proposals
            .get(&id.raw())
            .map(|row| row.data.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list_open_proposals(&self) -> Result<Vec<ProposalId>, StoreError> {
        Ok(self
            .lock()
            .open_proposals
            .iter()
            .map(|raw| ProposalId::new(*raw))
            .collect())
    }

    fn proposals_for_asset(&self, asset: &AssetId) -> Result<Vec<ProposalId>, StoreError> {
        Ok(self
            .lock()
            .asset_proposals
            .get(asset)
            .cloned()
            .unwrap_or_default())
    }
}

impl OwnershipStore for MemoryStore {
    fn ownership_of(&self, asset: &AssetId) -> Result<OwnershipSnapshot, StoreError> {
        self.lock()
            .ownership
            .get(asset)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(asset.to_string()))
    }

    fn replace_ownership(
        &self,
        asset: &AssetId,
        splits: &[OwnerShare],
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let snapshot = inner
            .ownership
            .get_mut(asset)
            .ok_or_else(|| StoreError::NotFound(asset.to_string()))?;
        if snapshot.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: snapshot.version,
            });
        }
        snapshot.version += 1;
        snapshot.splits = splits.to_vec();
        Ok(snapshot.version)
    }

    fn put_ownership(&self, asset: &AssetId, splits: &[OwnerShare]) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let entry = inner
            .ownership
            .entry(asset.clone())
            .or_insert_with(|| OwnershipSnapshot {
                version: 0,
                splits: Vec::new(),
            });
        entry.version += 1;
        entry.splits = splits.to_vec();
        Ok(entry.version)
    }
}

impl FundStore for MemoryStore {
    fn balance_of(&self, asset: &AssetId) -> Result<FundBalance, StoreError> {
        self.lock()
            .funds
            .get(asset)
            .copied()
            .ok_or_else(|| StoreError::NotFound(asset.to_string()))
    }

    fn debit(
        &self,
        asset: &AssetId,
        amount: FundAmount,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let balance = inner
            .funds
            .get_mut(asset)
            .ok_or_else(|| StoreError::NotFound(asset.to_string()))?;
        if balance.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: balance.version,
            });
        }
        let remaining = balance.amount.checked_sub(amount).ok_or_else(|| {
            StoreError::Rejected(format!(
                "debit {} exceeds balance {}",
                amount, balance.amount
            ))
        })?;
        balance.version += 1;
        balance.amount = remaining;
        Ok(balance.version)
    }

    fn credit(&self, asset: &AssetId, amount: FundAmount) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let balance = inner.funds.entry(asset.clone()).or_insert(FundBalance {
            version: 0,
            amount: FundAmount::ZERO,
        });
        balance.amount = balance
            .amount
            .checked_add(amount)
            .ok_or_else(|| StoreError::Rejected("fund balance overflow".to_string()))?;
        balance.version += 1;
        Ok(balance.version)
    }
}

impl HistoryStore for MemoryStore {
    fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        self.lock()
            .history
            .entry(record.asset_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn history_for(&self, asset: &AssetId) -> Result<Vec<HistoryRecord>, StoreError> {
        Ok(self.lock().history.get(asset).cloned().unwrap_or_default())
    }
}

impl MetaStore for MemoryStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.lock().meta.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock().meta.get(key).cloned())
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        self.lock().meta.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covote_types::{UserId, Weight};

    fn asset() -> AssetId {
        AssetId::new("veh_test1")
    }

    fn share(name: &str, bps: u32) -> OwnerShare {
        OwnerShare::new(UserId::new(format!("usr_{name}")), Weight::from_bps(bps))
    }

    #[test]
    fn ownership_replace_bumps_version() {
        let store = MemoryStore::new();
        let v1 = store
            .put_ownership(&asset(), &[share("a", 5_000), share("b", 5_000)])
            .unwrap();
        let v2 = store
            .replace_ownership(&asset(), &[share("a", 10_000)], v1)
            .unwrap();
        assert_eq!(v2, v1 + 1);
        let snapshot = store.ownership_of(&asset()).unwrap();
        assert_eq!(snapshot.version, v2);
        assert_eq!(snapshot.splits.len(), 1);
    }

    #[test]
    fn ownership_replace_detects_stale_version() {
        let store = MemoryStore::new();
        let v1 = store.put_ownership(&asset(), &[share("a", 10_000)]).unwrap();
        store
            .replace_ownership(&asset(), &[share("b", 10_000)], v1)
            .unwrap();
        let err = store
            .replace_ownership(&asset(), &[share("c", 10_000)], v1)
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[test]
    fn fund_debit_checks_version_and_balance() {
        let store = MemoryStore::new();
        let v = store.credit(&asset(), FundAmount::new(1_000)).unwrap();

        let err = store
            .debit(&asset(), FundAmount::new(2_000), v)
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));

        store.debit(&asset(), FundAmount::new(400), v).unwrap();
        assert_eq!(store.balance_of(&asset()).unwrap().amount, FundAmount::new(600));

        let err = store.debit(&asset(), FundAmount::new(100), v).unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[test]
    fn open_proposal_index_tracks_flag() {
        let store = MemoryStore::new();
        let id = ProposalId::new(1);
        store.put_proposal(id, &asset(), b"blob", true).unwrap();
        assert_eq!(store.list_open_proposals().unwrap(), vec![id]);

        store.put_proposal(id, &asset(), b"blob2", false).unwrap();
        assert!(store.list_open_proposals().unwrap().is_empty());
        assert_eq!(store.get_proposal(id).unwrap(), b"blob2");
        assert_eq!(store.proposals_for_asset(&asset()).unwrap(), vec![id]);
    }

    #[test]
    fn history_is_append_ordered() {
        use covote_store::HistoryChange;
        use covote_types::Timestamp;

        let store = MemoryStore::new();
        for i in 0..3u64 {
            store
                .append_history(&HistoryRecord {
                    asset_id: asset(),
                    proposal_id: ProposalId::new(i),
                    change: HistoryChange::ExpenditureUnfulfilled {
                        requested: FundAmount::new(100),
                        available: FundAmount::ZERO,
                        reference: format!("inv-{i}"),
                    },
                    applied_at: Timestamp::new(i),
                    applied_by: UserId::new("usr_sys"),
                })
                .unwrap();
        }
        let records = store.history_for(&asset()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].proposal_id, ProposalId::new(0));
        assert_eq!(records[2].proposal_id, ProposalId::new(2));
    }
}
