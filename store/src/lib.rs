//! Abstract storage traits for the covote governance engine.
//!
//! Every storage backend (the in-memory reference backend, or a durable
//! SQL/KV backend owned by the surrounding platform) implements these
//! traits. The governance engine depends only on the traits.

pub mod error;
pub mod fund;
pub mod history;
pub mod meta;
pub mod ownership;
pub mod proposal;

pub use error::StoreError;
pub use fund::{FundBalance, FundStore};
pub use history::{HistoryChange, HistoryRecord, HistoryStore};
pub use meta::MetaStore;
pub use ownership::{OwnerShare, OwnershipSnapshot, OwnershipStore};
pub use proposal::ProposalStore;

/// Opaque transaction handle for atomic multi-store operations.
/// Implementations can downcast to their specific transaction type.
pub trait ReadTxn {}
/// Writable transaction handle (extends ReadTxn).
pub trait WriteTxn: ReadTxn {}
