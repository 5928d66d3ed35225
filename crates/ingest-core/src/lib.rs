//! Core ingest plumbing shared by Pitwall telemetry sources

use std::sync::Arc;

use model::{ConnectionState, TelemetrySnapshot};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("socket: {0}")]
    Socket(#[from] std::io::Error),
    #[error("{0}")]
    Msg(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Holds the current snapshot. The receive loop is the single writer and
/// publishes whole replacements; readers clone the `Arc` and keep a
/// consistent record even while the next one is being built.
#[derive(Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<TelemetrySnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current snapshot and returns the shared handle.
    pub fn publish(&self, snapshot: TelemetrySnapshot) -> Arc<TelemetrySnapshot> {
        let shared = Arc::new(snapshot);
        *self.current.write() = shared.clone();
        shared
    }

    pub fn current(&self) -> Arc<TelemetrySnapshot> {
        self.current.read().clone()
    }
}

pub type ConnectionRx = crossbeam_channel::Receiver<ConnectionState>;

/// Two-state liveness machine for the inbound feed. Only the receive loop
/// transitions it; anyone may poll `state()` or drain the event channel.
pub struct ConnectionMonitor {
    state: Mutex<ConnectionState>,
    events: crossbeam_channel::Sender<ConnectionState>,
}

impl ConnectionMonitor {
    /// Returns the monitor and the receiving end of its transition events.
    pub fn channel() -> (Self, ConnectionRx) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let monitor = Self {
            state: Mutex::new(ConnectionState::Disconnected),
            events: tx,
        };
        (monitor, rx)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Any received datagram marks the feed live.
    pub fn on_receive(&self) {
        self.transition(ConnectionState::Connected);
    }

    /// A full receive window elapsed with no datagram.
    pub fn on_timeout(&self) {
        self.transition(ConnectionState::Disconnected);
    }

    fn transition(&self, next: ConnectionState) {
        let mut state = self.state.lock();
        if *state != next {
            *state = next;
            let _ = self.events.send(next);
        }
    }
}

pub type SnapshotTx = crossbeam_channel::Sender<Arc<TelemetrySnapshot>>;
pub type SnapshotRx = crossbeam_channel::Receiver<Arc<TelemetrySnapshot>>;

pub fn channel() -> (SnapshotTx, SnapshotRx) {
    crossbeam_channel::unbounded()
}

/// Trait for any live source feeding the snapshot store.
#[async_trait::async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Runs until `stop` flips true, with at most one receive-timeout of
    /// shutdown latency.
    async fn run(&self, tx: SnapshotTx, stop: watch::Receiver<bool>) -> Result<(), IngestError>;
}
