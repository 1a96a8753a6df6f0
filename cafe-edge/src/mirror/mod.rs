//! Broadcast mirror
//!
//! Republishes every table event of the [`TableOrderManager`] to the
//! observers on the message bus, and hands full snapshots to observers that
//! connect, ask for one, or may have missed events.
//!
//! ```text
//! TableOrderManager ──broadcast──▶ Mirror::run ──▶ MessageBus (TableSync)
//!                                     ▲   │
//!        observer Handshake ──────────┘   ├─ interval ──▶ resync(Periodic)
//!        observer RequestSync ────────────┘  lagged   ──▶ resync(Lagged)
//! ```
//!
//! # Cache
//!
//! The mirror keeps a [`MirrorView`] of what it has told observers. It is
//! rebuilt from [`TableOrderManager::snapshot`] on every snapshot it sends and
//! is never consulted to decide whether an operation is legal.
//!
//! # Sequencing
//!
//! Each published event takes the next sequence number. A snapshot carries
//! the sequence of the last event published before it. A snapshot taken while
//! an event is still queued for the run loop already contains that event; the
//! observer applies it again when it arrives, which is harmless because every
//! event carries the full order.
//!
//! # Failures
//!
//! Publishing never fails the caller. A [`BroadcastError`] is logged and
//! dropped, the next periodic resync corrects whatever observers missed.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use shared::message::{BusMessage, EventType, MirrorPayload, RequestSyncPayload, SnapshotReason};
use shared::order::{MirrorView, TableEvent};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::message::MessageBus;
use crate::orders::{OrderResult, OrderStorage, OrderStore, TableOrderManager};

/// Default interval between full resyncs
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Interval between periodic full resyncs
    pub resync_interval: Duration,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            resync_interval: DEFAULT_RESYNC_INTERVAL,
        }
    }
}

/// Mirror delivery failure. Logged, never returned to a table operation.
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("no observers connected")]
    NoObservers,

    #[error("failed to encode mirror payload: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct Mirror<S: OrderStore = OrderStorage> {
    manager: Arc<TableOrderManager<S>>,
    bus: MessageBus,
    cache: Mutex<MirrorView>,
    config: MirrorConfig,
}

impl<S: OrderStore> std::fmt::Debug for Mirror<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror")
            .field("config", &self.config)
            .field("last_sequence", &self.last_sequence())
            .finish_non_exhaustive()
    }
}

impl<S: OrderStore> Mirror<S> {
    pub fn new(manager: Arc<TableOrderManager<S>>, bus: MessageBus, config: MirrorConfig) -> Self {
        Self {
            manager,
            bus,
            cache: Mutex::new(MirrorView::new()),
            config,
        }
    }

    /// Copy of the cache
    pub fn view(&self) -> MirrorView {
        self.cache.lock().clone()
    }

    pub fn last_sequence(&self) -> u64 {
        self.cache.lock().last_sequence()
    }

    /// Fan one event out to every observer, the one that caused it included.
    /// Returns its sequence number.
    pub fn publish(&self, event: TableEvent) -> u64 {
        let mut cache = self.cache.lock();
        let sequence = cache.last_sequence() + 1;
        let payload = MirrorPayload::Event { sequence, event };
        cache.apply_payload(&payload);

        // sent under the cache lock so observers see sequences in order
        absorb(self.send(&payload, None), sequence);
        sequence
    }

    /// Re-pull the authoritative state and broadcast it to everyone
    pub fn resync(&self, reason: SnapshotReason) -> OrderResult<()> {
        let mut cache = self.cache.lock();
        let payload = self.refresh(&mut cache, reason)?;
        tracing::debug!(reason = %reason, tables = cache.len(), sequence = payload.sequence(), "Mirror resync");
        absorb(self.send(&payload, None), payload.sequence());
        Ok(())
    }

    /// Initialize a newly connected observer with the full state
    pub fn on_observer_connect(&self, client_id: &str) -> OrderResult<()> {
        self.unicast_snapshot(client_id, SnapshotReason::Connect)
    }

    /// Observer asked for a snapshot (it noticed a gap, or just reconnected)
    pub fn on_sync_request(&self, client_id: &str, request: &RequestSyncPayload) -> OrderResult<()> {
        tracing::debug!(client_id = %client_id, last_sequence = request.last_sequence, "Observer requested snapshot");
        self.unicast_snapshot(client_id, SnapshotReason::Requested)
    }

    fn unicast_snapshot(&self, client_id: &str, reason: SnapshotReason) -> OrderResult<()> {
        let mut cache = self.cache.lock();
        let payload = self.refresh(&mut cache, reason)?;
        tracing::info!(client_id = %client_id, reason = %reason, tables = cache.len(), "Sending snapshot to observer");
        absorb(self.send(&payload, Some(client_id)), payload.sequence());
        Ok(())
    }

    /// Rebuild the cache from the manager and build the matching snapshot
    fn refresh(&self, cache: &mut MirrorView, reason: SnapshotReason) -> OrderResult<MirrorPayload> {
        let orders = self.manager.snapshot()?;
        let payload = MirrorPayload::Snapshot {
            sequence: cache.last_sequence(),
            reason,
            orders: orders.into_values().collect(),
        };
        cache.apply_payload(&payload);
        Ok(payload)
    }

    fn send(&self, payload: &MirrorPayload, target: Option<&str>) -> Result<usize, BroadcastError> {
        let mut msg = BusMessage::table_sync(payload)?;
        if let Some(target) = target {
            msg = msg.with_target(target);
        }
        self.bus.publish(msg).map_err(|_| BroadcastError::NoObservers)
    }

    fn handle_client_message(&self, msg: BusMessage) {
        let Some(client_id) = msg.source.as_deref() else {
            tracing::debug!(event_type = %msg.event_type, "Dropping client message without source");
            return;
        };

        let result = match msg.event_type {
            EventType::Handshake => self.on_observer_connect(client_id),
            EventType::RequestSync => {
                let request = msg.parse_payload::<RequestSyncPayload>().unwrap_or_default();
                self.on_sync_request(client_id, &request)
            }
            _ => return,
        };
        if let Err(e) = result {
            tracing::warn!(client_id = %client_id, error = %e, "Failed to send snapshot to observer");
        }
    }

    /// Mirror loop, runs until `shutdown` fires or the manager goes away
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut events = self.manager.subscribe();
        let mut requests = self.bus.subscribe_to_clients();
        let mut resync_interval = tokio::time::interval(self.config.resync_interval);
        resync_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.resync_interval.as_secs(),
            "Mirror started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Mirror shutting down");
                    break;
                }

                event = events.recv() => match event {
                    Ok(event) => {
                        self.publish(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Mirror lagged behind table events, resyncing");
                        if let Err(e) = self.resync(SnapshotReason::Lagged) {
                            tracing::error!(error = %e, "Lagged resync failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Table event channel closed, mirror stopping");
                        break;
                    }
                },

                request = requests.recv() => match request {
                    Ok(msg) => self.handle_client_message(msg),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Mirror lagged behind observer requests");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },

                // first tick fires at once and seeds the cache
                _ = resync_interval.tick() => {
                    if let Err(e) = self.resync(SnapshotReason::Periodic) {
                        tracing::error!(error = %e, "Periodic resync failed");
                    }
                }
            }
        }
    }
}

fn absorb(result: Result<usize, BroadcastError>, sequence: u64) {
    match result {
        Ok(receivers) => tracing::trace!(sequence, receivers, "Mirror payload sent"),
        Err(BroadcastError::NoObservers) => tracing::trace!(sequence, "No observers connected"),
        Err(e) => tracing::warn!(sequence, error = %e, "Mirror publish failed"),
    }
}
