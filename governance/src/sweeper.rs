//! Expiration sweeper — background task finalizing proposals whose
//! deadline has elapsed.
//!
//! Runs on a fixed interval. Each sweep calls the same finalization path
//! used by vote-triggered early decisions, so racing the two paths on one
//! proposal resolves to exactly one finalization (the loser no-ops).

use std::sync::Arc;
use std::time::Duration;

use crate::engine::GovernanceEngine;
use covote_types::Timestamp;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

/// Periodically sweeps expired proposals until shutdown.
pub struct ExpirationSweeper {
    engine: Arc<GovernanceEngine>,
    interval: Duration,
}

impl ExpirationSweeper {
    pub fn new(engine: Arc<GovernanceEngine>) -> Self {
        let interval = Duration::from_secs(engine.config().sweep_interval_secs);
        Self { engine, interval }
    }

    /// Override the sweep interval (tests).
    pub fn with_interval(engine: Arc<GovernanceEngine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Run until the shutdown signal fires. Spawn with `tokio::spawn`.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so a fresh engine
        // doesn't sweep before anything can be due.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let stats = self.engine.sweep_once(Timestamp::now());
                    if stats.failed > 0 {
                        tracing::warn!(
                            failed = stats.failed,
                            "sweep left proposals pending after errors"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("expiration sweeper shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::GovernanceConfig;
    use crate::engine::EngineStores;
    use crate::events::EventSender;
    use covote_store::{OwnerShare, OwnershipStore};
    use covote_store_memory::MemoryStore;
    use covote_types::{AssetId, FundAmount, UserId, Weight};

    fn engine_with_one_owner() -> Arc<GovernanceEngine> {
        let backend = Arc::new(MemoryStore::new());
        backend
            .put_ownership(
                &AssetId::new("veh_1"),
                &[OwnerShare::new(UserId::new("usr_a"), Weight::FULL)],
            )
            .unwrap();
        let (events, _rx) = EventSender::channel();
        Arc::new(
            GovernanceEngine::open(
                GovernanceConfig {
                    voting_window_secs: 10,
                    ..GovernanceConfig::default()
                },
                EngineStores::from_backend(backend),
                events,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn sweeper_stops_on_shutdown() {
        let engine = engine_with_one_owner();
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(
            ExpirationSweeper::with_interval(engine, Duration::from_millis(10)).run(rx),
        );
        tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn sweeper_finalizes_due_proposals() {
        let engine = engine_with_one_owner();
        engine
            .create_maintenance_expenditure(
                AssetId::new("veh_1"),
                UserId::new("usr_a"),
                FundAmount::new(100),
                "inv-1".to_string(),
                "oil change".to_string(),
                Timestamp::new(0),
            )
            .unwrap();

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(
            ExpirationSweeper::with_interval(engine.clone(), Duration::from_millis(5)).run(rx),
        );
        // Real wall-clock time is far past the second-granularity deadline.
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();

        let listed = engine
            .list_proposals(&AssetId::new("veh_1"), None)
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].status.is_terminal());
    }
}
