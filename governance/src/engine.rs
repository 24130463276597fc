//! Governance engine façade — coordinates proposal creation, vote casting,
//! finalization, expiration sweeps, and queries.
//!
//! Concurrency model:
//! - every open proposal is one `Arc<Mutex<ProposalMachine>>` cell in the
//!   arena; vote-cast re-checks and finalization run under the cell lock,
//!   which makes the Pending→terminal transition an exclusive
//!   compare-and-set (losers observe a terminal status and no-op);
//! - effect application additionally holds a per-asset lock, so two
//!   proposals for the same asset never interleave their domain mutations;
//! - lock order is always proposal cell → asset lock, and no store call
//!   inside a critical section blocks on anything but the backend itself;
//! - outbound events are emitted after the locks release.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::config::GovernanceConfig;
use crate::effects::{EffectApplier, EffectOutcome};
use crate::error::GovernanceError;
use crate::events::{EventSender, FinalizeReason, GovernanceEvent};
use crate::ledger::VoteDecision;
use crate::machine::ProposalMachine;
use crate::proposal::{EligibleVoter, ProposalKind, ProposalPayload, ProposalStatus};
use crate::quorum::{QuorumDecision, Tally};
use covote_store::{
    FundStore, HistoryRecord, HistoryStore, MetaStore, OwnerShare, OwnershipStore, ProposalStore,
    StoreError,
};
use covote_types::{AssetId, FundAmount, ProposalId, Timestamp, UserId, Weight};

/// Meta-store key holding the next proposal id.
const META_NEXT_PROPOSAL_ID: &str = "next_proposal_id";

/// The storage handles the engine operates over.
#[derive(Clone)]
pub struct EngineStores {
    pub proposals: Arc<dyn ProposalStore + Send + Sync>,
    pub ownership: Arc<dyn OwnershipStore + Send + Sync>,
    pub funds: Arc<dyn FundStore + Send + Sync>,
    pub history: Arc<dyn HistoryStore + Send + Sync>,
    pub meta: Arc<dyn MetaStore + Send + Sync>,
}

impl EngineStores {
    /// Build the handle set from a single backend implementing the whole
    /// trait family (e.g. `covote-store-memory`).
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: ProposalStore + OwnershipStore + FundStore + HistoryStore + MetaStore + Send + Sync + 'static,
    {
        Self {
            proposals: backend.clone(),
            ownership: backend.clone(),
            funds: backend.clone(),
            history: backend.clone(),
            meta: backend,
        }
    }
}

/// Result of a vote cast: the fresh tally and the proposal status after any
/// finalization the vote triggered.
#[derive(Clone, Copy, Debug)]
pub struct VoteReceipt {
    pub tally: Tally,
    pub status: ProposalStatus,
}

/// One eligible voter's status within a proposal view.
#[derive(Clone, Debug, serde::Serialize)]
pub struct VoterStatus {
    pub voter: UserId,
    pub weight: Weight,
    pub decision: Option<VoteDecision>,
    pub cast_at: Option<Timestamp>,
    pub comment: Option<String>,
}

/// Full view of one proposal, including the live tally.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ProposalView {
    pub id: ProposalId,
    pub asset_id: AssetId,
    pub proposer: UserId,
    pub kind: ProposalKind,
    pub payload: ProposalPayload,
    pub reason: String,
    pub status: ProposalStatus,
    pub created_at: Timestamp,
    pub deadline: Timestamp,
    pub finalized_at: Option<Timestamp>,
    pub tally: Tally,
    pub voters: Vec<VoterStatus>,
}

/// Listing entry for a proposal.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ProposalSummary {
    pub id: ProposalId,
    pub asset_id: AssetId,
    pub kind: ProposalKind,
    pub proposer: UserId,
    pub status: ProposalStatus,
    pub created_at: Timestamp,
    pub deadline: Timestamp,
}

/// Counters from one expiration sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Proposals whose deadline had elapsed.
    pub due: usize,
    /// Successfully finalized this sweep.
    pub finalized: usize,
    /// Hit an infrastructure error; left pending for the next sweep.
    pub failed: usize,
}

/// The governance engine.
pub struct GovernanceEngine {
    config: GovernanceConfig,
    stores: EngineStores,
    effects: EffectApplier,
    events: EventSender,
    /// Arena of open proposals. Each cell has its own lock so unrelated
    /// proposals stay fully concurrent.
    open: RwLock<HashMap<ProposalId, Arc<Mutex<ProposalMachine>>>>,
    /// Per-asset locks serializing effect application.
    asset_locks: Mutex<HashMap<AssetId, Arc<Mutex<()>>>>,
    /// Next proposal id; persisted before use so restarts never reuse one.
    next_id: Mutex<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl GovernanceEngine {
    /// Open the engine over the given stores, rehydrating open proposals
    /// and the id counter (crash/restart recovery).
    pub fn open(
        config: GovernanceConfig,
        stores: EngineStores,
        events: EventSender,
    ) -> Result<Self, GovernanceError> {
        let next_id = match stores.meta.get_meta(META_NEXT_PROPOSAL_ID)? {
            Some(bytes) => u64::from_le_bytes(bytes.as_slice().try_into().map_err(|_| {
                GovernanceError::Serialization("next_proposal_id meta entry malformed".to_string())
            })?),
            None => 1,
        };

        let mut open = HashMap::new();
        for id in stores.proposals.list_open_proposals()? {
            let blob = stores.proposals.get_proposal(id)?;
            let machine = ProposalMachine::decode(&blob)?;
            open.insert(id, Arc::new(Mutex::new(machine)));
        }
        if !open.is_empty() {
            tracing::info!(count = open.len(), "rehydrated open proposals");
        }

        let effects = EffectApplier::new(
            stores.ownership.clone(),
            stores.funds.clone(),
            stores.history.clone(),
        );

        Ok(Self {
            config,
            stores,
            effects,
            events,
            open: RwLock::new(open),
            asset_locks: Mutex::new(HashMap::new()),
            next_id: Mutex::new(next_id),
        })
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    // ── Proposal creation ────────────────────────────────────────────────

    /// Propose replacing the asset's ownership table. Requires unanimity.
    pub fn create_ownership_change(
        &self,
        asset: AssetId,
        proposer: UserId,
        splits: Vec<OwnerShare>,
        reason: String,
        now: Timestamp,
    ) -> Result<ProposalId, GovernanceError> {
        let snapshot = self.stores.ownership.ownership_of(&asset)?;
        let eligible = eligible_from_splits(&snapshot.splits);
        self.create(
            asset,
            proposer,
            ProposalPayload::OwnershipChange { splits },
            reason,
            eligible,
            snapshot.version,
            now,
        )
    }

    /// Propose a debit from the shared maintenance fund. Requires a strict
    /// weighted majority.
    pub fn create_maintenance_expenditure(
        &self,
        asset: AssetId,
        proposer: UserId,
        amount: FundAmount,
        reference: String,
        reason: String,
        now: Timestamp,
    ) -> Result<ProposalId, GovernanceError> {
        let snapshot = self.stores.ownership.ownership_of(&asset)?;
        let eligible = eligible_from_splits(&snapshot.splits);
        let base_version = match self.stores.funds.balance_of(&asset) {
            Ok(balance) => balance.version,
            Err(StoreError::NotFound(_)) => 0,
            Err(e) => return Err(e.into()),
        };
        self.create(
            asset,
            proposer,
            ProposalPayload::MaintenanceExpenditure { amount, reference },
            reason,
            eligible,
            base_version,
            now,
        )
    }

    fn create(
        &self,
        asset: AssetId,
        proposer: UserId,
        payload: ProposalPayload,
        reason: String,
        eligible: Vec<EligibleVoter>,
        base_version: u64,
        now: Timestamp,
    ) -> Result<ProposalId, GovernanceError> {
        // Validate before burning an id on a malformed request.
        payload.validate()?;

        let id = self.allocate_id()?;
        let machine = ProposalMachine::create(
            id,
            asset.clone(),
            proposer.clone(),
            payload,
            reason,
            eligible,
            base_version,
            now,
            now.plus_secs(self.config.voting_window_secs),
        )?;

        let kind = machine.proposal.kind();
        let deadline = machine.proposal.deadline;
        let blob = machine.encode()?;
        self.stores.proposals.put_proposal(id, &asset, &blob, true)?;
        self.open_arena_mut().insert(id, Arc::new(Mutex::new(machine)));

        tracing::info!(proposal = %id, asset = %asset, ?kind, %deadline, "proposal created");
        self.events.emit(GovernanceEvent::ProposalCreated {
            proposal_id: id,
            asset_id: asset,
            proposer,
            kind,
            deadline,
        });
        Ok(id)
    }

    fn allocate_id(&self) -> Result<ProposalId, GovernanceError> {
        let mut next = lock(&self.next_id);
        let id = ProposalId::new(*next);
        self.stores
            .meta
            .put_meta(META_NEXT_PROPOSAL_ID, &(*next + 1).to_le_bytes())?;
        *next += 1;
        Ok(id)
    }

    // ── Voting ───────────────────────────────────────────────────────────

    /// Cast (or replace) a vote. May trigger early finalization when the
    /// new tally mathematically decides the proposal.
    pub fn cast_vote(
        &self,
        proposal_id: ProposalId,
        voter: UserId,
        decision: VoteDecision,
        comment: Option<String>,
        now: Timestamp,
    ) -> Result<VoteReceipt, GovernanceError> {
        let cell = self.open_cell(proposal_id)?;
        let mut events = Vec::new();

        let result = {
            let mut machine = lock(&cell);
            self.cast_vote_locked(&mut machine, proposal_id, voter, decision, comment, now, &mut events)
        };

        if let Ok(receipt) = &result {
            if receipt.status.is_terminal() {
                self.open_arena_mut().remove(&proposal_id);
            }
        }
        for event in events {
            self.events.emit(event);
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn cast_vote_locked(
        &self,
        machine: &mut ProposalMachine,
        proposal_id: ProposalId,
        voter: UserId,
        decision: VoteDecision,
        comment: Option<String>,
        now: Timestamp,
        events: &mut Vec<GovernanceEvent>,
    ) -> Result<VoteReceipt, GovernanceError> {
        let tally = machine.cast_vote(voter.clone(), decision, comment, now)?;

        // The vote is committed before any finalization decision.
        let blob = machine.encode()?;
        self.stores
            .proposals
            .put_proposal(proposal_id, &machine.proposal.asset_id, &blob, true)?;
        tracing::debug!(proposal = %proposal_id, voter = %voter, ?decision, "vote recorded");
        events.push(GovernanceEvent::VoteCast {
            proposal_id,
            asset_id: machine.proposal.asset_id.clone(),
            voter,
        });

        let status = match tally.decision {
            QuorumDecision::Pending => machine.proposal.status,
            QuorumDecision::Approved => self.finalize_locked(
                machine,
                ProposalStatus::Approved,
                FinalizeReason::QuorumReached,
                now,
                events,
            )?,
            QuorumDecision::Rejected => self.finalize_locked(
                machine,
                ProposalStatus::Rejected,
                FinalizeReason::QuorumReached,
                now,
                events,
            )?,
        };

        Ok(VoteReceipt { tally, status })
    }

    // ── Cancellation ─────────────────────────────────────────────────────

    /// Withdraw a pending proposal. Proposer-only; under the default policy
    /// only while no vote is on record.
    pub fn cancel(
        &self,
        proposal_id: ProposalId,
        by: UserId,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let cell = self.open_cell(proposal_id)?;
        let asset_id = {
            let mut machine = lock(&cell);
            machine.cancel(&by, self.config.cancel_requires_no_votes, now)?;
            let blob = machine.encode()?;
            self.stores
                .proposals
                .put_proposal(proposal_id, &machine.proposal.asset_id, &blob, false)?;
            machine.proposal.asset_id.clone()
        };

        self.open_arena_mut().remove(&proposal_id);
        tracing::info!(proposal = %proposal_id, by = %by, "proposal cancelled");
        self.events.emit(GovernanceEvent::ProposalFinalized {
            proposal_id,
            asset_id,
            status: ProposalStatus::Cancelled,
            reason: FinalizeReason::Withdrawn,
        });
        Ok(())
    }

    // ── Finalization ─────────────────────────────────────────────────────

    /// Commit a terminal transition, applying the effect when the vote
    /// outcome is approval. Caller holds the cell lock.
    ///
    /// Exactly-once: if the proposal is already terminal this is a no-op
    /// returning the existing status; the concurrent caller that won the
    /// Pending check did the work.
    fn finalize_locked(
        &self,
        machine: &mut ProposalMachine,
        target: ProposalStatus,
        reason: FinalizeReason,
        now: Timestamp,
        events: &mut Vec<GovernanceEvent>,
    ) -> Result<ProposalStatus, GovernanceError> {
        if machine.proposal.status.is_terminal() {
            tracing::debug!(proposal = %machine.proposal.id, "finalize raced; already terminal");
            return Ok(machine.proposal.status);
        }

        let proposal_id = machine.proposal.id;
        let asset_id = machine.proposal.asset_id.clone();
        let mut final_status = target;
        let mut final_reason = reason;

        if target == ProposalStatus::Approved {
            let asset_lock = self.asset_lock(&asset_id);
            let _asset_guard = lock(&asset_lock);

            // An Err here leaves the proposal pending: the whole
            // finalization is retried (next vote re-check or sweep) rather
            // than left half-applied.
            match self.effects.apply(&machine.proposal, now)? {
                EffectOutcome::Applied => {
                    events.push(GovernanceEvent::EffectApplied {
                        proposal_id,
                        asset_id: asset_id.clone(),
                    });
                }
                EffectOutcome::StaleState { .. } => {
                    final_status = ProposalStatus::Rejected;
                    final_reason = FinalizeReason::StaleOwnership;
                }
                EffectOutcome::Unfulfilled {
                    requested,
                    available,
                } => {
                    final_status = ProposalStatus::Unfulfilled;
                    events.push(GovernanceEvent::EffectUnfulfilled {
                        proposal_id,
                        asset_id: asset_id.clone(),
                        requested,
                        available,
                    });
                }
            }
        }

        machine.complete_finalize(final_status, now);
        // A durable backend commits this blob and the effect in one write
        // transaction; the in-memory backend cannot fail here.
        let blob = machine.encode()?;
        self.stores
            .proposals
            .put_proposal(proposal_id, &asset_id, &blob, false)?;

        tracing::info!(
            proposal = %proposal_id,
            asset = %asset_id,
            status = ?final_status,
            reason = ?final_reason,
            "proposal finalized"
        );
        events.push(GovernanceEvent::ProposalFinalized {
            proposal_id,
            asset_id,
            status: final_status,
            reason: final_reason,
        });
        Ok(final_status)
    }

    // ── Expiration sweep ─────────────────────────────────────────────────

    /// Finalize every open proposal whose deadline has elapsed. Safe to
    /// call concurrently with vote casting; already-finalized proposals
    /// are no-ops. Per-proposal infrastructure errors are logged and left
    /// for the next sweep.
    pub fn sweep_once(&self, now: Timestamp) -> SweepStats {
        let cells: Vec<(ProposalId, Arc<Mutex<ProposalMachine>>)> = self
            .open_arena()
            .iter()
            .map(|(id, cell)| (*id, cell.clone()))
            .collect();

        let mut stats = SweepStats::default();
        let mut finalized_ids = Vec::new();
        let mut events = Vec::new();

        for (id, cell) in cells {
            let mut machine = lock(&cell);
            if machine.proposal.status.is_terminal() || !machine.deadline_reached(now) {
                continue;
            }
            stats.due += 1;

            let target = machine.deadline_outcome(self.config.expire_when_no_votes);
            match self.finalize_locked(
                &mut machine,
                target,
                FinalizeReason::DeadlineElapsed,
                now,
                &mut events,
            ) {
                Ok(_) => {
                    stats.finalized += 1;
                    finalized_ids.push(id);
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(proposal = %id, error = %e, "sweep finalization failed");
                }
            }
        }

        if !finalized_ids.is_empty() {
            let mut open = self.open_arena_mut();
            for id in &finalized_ids {
                open.remove(id);
            }
        }
        for event in events {
            self.events.emit(event);
        }

        if stats.due > 0 {
            tracing::debug!(
                due = stats.due,
                finalized = stats.finalized,
                failed = stats.failed,
                "expiration sweep complete"
            );
        }
        stats
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Full view of one proposal, open or closed.
    pub fn proposal_view(&self, proposal_id: ProposalId) -> Result<ProposalView, GovernanceError> {
        let machine = self.load_machine(proposal_id)?;
        Ok(view_of(&machine))
    }

    /// Summaries of all proposals for an asset, optionally filtered by
    /// status, in creation order.
    pub fn list_proposals(
        &self,
        asset: &AssetId,
        status_filter: Option<ProposalStatus>,
    ) -> Result<Vec<ProposalSummary>, GovernanceError> {
        let ids = self.stores.proposals.proposals_for_asset(asset)?;
        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            let machine = self.load_machine(id)?;
            if let Some(filter) = status_filter {
                if machine.proposal.status != filter {
                    continue;
                }
            }
            summaries.push(ProposalSummary {
                id: machine.proposal.id,
                asset_id: machine.proposal.asset_id.clone(),
                kind: machine.proposal.kind(),
                proposer: machine.proposal.proposer.clone(),
                status: machine.proposal.status,
                created_at: machine.proposal.created_at,
                deadline: machine.proposal.deadline,
            });
        }
        Ok(summaries)
    }

    /// The asset's governance audit trail, in append order.
    pub fn history_for(&self, asset: &AssetId) -> Result<Vec<HistoryRecord>, GovernanceError> {
        self.stores.history.history_for(asset).map_err(Into::into)
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn open_arena(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<ProposalId, Arc<Mutex<ProposalMachine>>>> {
        match self.open.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn open_arena_mut(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<ProposalId, Arc<Mutex<ProposalMachine>>>> {
        match self.open.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn open_cell(
        &self,
        proposal_id: ProposalId,
    ) -> Result<Arc<Mutex<ProposalMachine>>, GovernanceError> {
        if let Some(cell) = self.open_arena().get(&proposal_id) {
            return Ok(cell.clone());
        }
        // Not in the arena: either finalized (blob exists) or unknown.
        match self.stores.proposals.get_proposal(proposal_id) {
            Ok(_) => Err(GovernanceError::ProposalFinalized(proposal_id)),
            Err(StoreError::NotFound(_)) => Err(GovernanceError::ProposalNotFound(proposal_id)),
            Err(e) => Err(e.into()),
        }
    }

    fn load_machine(&self, proposal_id: ProposalId) -> Result<ProposalMachine, GovernanceError> {
        if let Some(cell) = self.open_arena().get(&proposal_id) {
            return Ok(lock(cell).clone());
        }
        match self.stores.proposals.get_proposal(proposal_id) {
            Ok(blob) => ProposalMachine::decode(&blob),
            Err(StoreError::NotFound(_)) => Err(GovernanceError::ProposalNotFound(proposal_id)),
            Err(e) => Err(e.into()),
        }
    }

    fn asset_lock(&self, asset: &AssetId) -> Arc<Mutex<()>> {
        lock(&self.asset_locks)
            .entry(asset.clone())
            .or_default()
            .clone()
    }
}

fn eligible_from_splits(splits: &[OwnerShare]) -> Vec<EligibleVoter> {
    splits
        .iter()
        .map(|share| EligibleVoter {
            voter: share.owner.clone(),
            weight: share.weight,
        })
        .collect()
}

fn view_of(machine: &ProposalMachine) -> ProposalView {
    let tally = machine.tally();
    let voters = machine
        .proposal
        .eligible
        .iter()
        .map(|ev| {
            let vote = machine.ledger.get(&ev.voter);
            VoterStatus {
                voter: ev.voter.clone(),
                weight: ev.weight,
                decision: vote.map(|v| v.decision),
                cast_at: vote.map(|v| v.cast_at),
                comment: vote.and_then(|v| v.comment.clone()),
            }
        })
        .collect();

    ProposalView {
        id: machine.proposal.id,
        asset_id: machine.proposal.asset_id.clone(),
        proposer: machine.proposal.proposer.clone(),
        kind: machine.proposal.kind(),
        payload: machine.proposal.payload.clone(),
        reason: machine.proposal.reason.clone(),
        status: machine.proposal.status,
        created_at: machine.proposal.created_at,
        deadline: machine.proposal.deadline,
        finalized_at: machine.proposal.finalized_at,
        tally,
        voters,
    }
}
