//! Assetto Corsa remote-telemetry UDP source.
//!
//! Owns the inbound socket, decodes each datagram, folds derived metrics
//! into a fresh snapshot and publishes it whole. The receive loop is the
//! only blocking piece of the system and the only writer of shared state.

pub mod codec;
pub mod metrics;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use model::TelemetrySnapshot;
use pitwall_ingest_core::{
    ConnectionMonitor, IngestError, SnapshotStore, SnapshotTx, TelemetrySource,
};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use codec::{CarUpdate, DecodedPacket, HandshakeInfo};
use metrics::DerivedMetrics;

const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub struct AcConfig {
    /// Local address the feed binds to, e.g. "127.0.0.1:9996".
    pub bind_addr: String,
    /// One quiet window of this length flips the feed to Disconnected.
    pub recv_timeout: Duration,
    pub recv_buffer: usize,
}

impl Default for AcConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9996".into(),
            recv_timeout: Duration::from_secs(1),
            recv_buffer: 4096,
        }
    }
}

pub struct AcSource {
    cfg: AcConfig,
    socket: UdpSocket,
    store: Arc<SnapshotStore>,
    monitor: Arc<ConnectionMonitor>,
}

impl AcSource {
    /// Binds the inbound socket; a bind failure is fatal to the source.
    pub async fn bind(
        cfg: AcConfig,
        store: Arc<SnapshotStore>,
        monitor: Arc<ConnectionMonitor>,
    ) -> Result<Self, IngestError> {
        let socket = UdpSocket::bind(&cfg.bind_addr)
            .await
            .with_context(|| format!("bind {}", cfg.bind_addr))?;
        Ok(Self {
            cfg,
            socket,
            store,
            monitor,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    fn ingest(&self, datagram: &[u8], tx: &SnapshotTx) {
        match codec::decode(datagram) {
            Ok(DecodedPacket::Update(update)) => {
                let derived = metrics::derive(&update);
                let published = self.store.publish(self.merge_update(&update, &derived));
                let _ = tx.send(published);
            }
            Ok(DecodedPacket::Handshake(handshake)) => {
                info!(
                    car = %handshake.car_name,
                    driver = %handshake.driver_name,
                    "handshake received"
                );
                let published = self.store.publish(self.merge_handshake(&handshake));
                let _ = tx.send(published);
            }
            // recognized but carry nothing we consume
            Ok(DecodedPacket::Spot) | Ok(DecodedPacket::Dismiss) => {}
            Err(err) => debug!("discarding packet: {err}"),
        }
    }

    /// Builds the replacement snapshot for an update packet. Fields outside
    /// the wire layout (electronics, tire wear, names) carry over untouched.
    fn merge_update(&self, update: &CarUpdate, derived: &DerivedMetrics) -> TelemetrySnapshot {
        let mut next = (*self.store.current()).clone();

        next.speed_kmh = update.speed_kmh;
        next.speed_mph = update.speed_mph;
        next.rpm = update.rpm;
        next.max_rpm = update.max_rpm;
        next.gear = update.gear;
        next.g_force_lateral = update.g_force_lateral;
        next.g_force_longitudinal = update.g_force_longitudinal;
        next.g_force_vertical = update.g_force_vertical;
        next.lap_time_s = update.lap_time_s;
        next.last_lap_s = update.last_lap_s;
        next.best_lap_s = update.best_lap_s;
        next.lap_count = update.lap_count;
        next.fuel_l = update.fuel_l;
        next.velocity = update.velocity;
        next.acceleration = update.acceleration;
        next.wheel_angular_speed = update.wheel_angular_speed;
        next.wheel_slip = update.wheel_slip;
        next.wheel_load = update.wheel_load;
        next.tire_pressure = update.tire_pressure;
        next.tire_temperature_core = update.tire_temperature_core;
        next.suspension_travel = update.suspension_travel;

        next.wheel_lock = derived.wheel_lock;
        next.abs_active = derived.abs_active;
        next.tire_pressure_delta = derived.tire_pressure_delta;
        next.shift_advice = derived.shift_advice;
        next.g_force_total = derived.g_force_total;

        next
    }

    /// Handshakes update the session identity and nothing else.
    fn merge_handshake(&self, handshake: &HandshakeInfo) -> TelemetrySnapshot {
        let mut next = (*self.store.current()).clone();
        next.car_name = handshake.car_name.clone();
        next.driver_name = handshake.driver_name.clone();
        next
    }
}

#[async_trait::async_trait]
impl TelemetrySource for AcSource {
    async fn run(&self, tx: SnapshotTx, mut stop: watch::Receiver<bool>) -> Result<(), IngestError> {
        let mut buf = vec![0u8; self.cfg.recv_buffer];
        info!(addr = %self.cfg.bind_addr, "telemetry feed listening");

        while !*stop.borrow() {
            tokio::select! {
                _ = stop.changed() => break,
                recv = tokio::time::timeout(self.cfg.recv_timeout, self.socket.recv_from(&mut buf)) => {
                    match recv {
                        Ok(Ok((len, _peer))) => {
                            self.monitor.on_receive();
                            self.ingest(&buf[..len], &tx);
                        }
                        Ok(Err(err)) => {
                            warn!("telemetry receive failed: {err}");
                            tokio::time::sleep(RECV_ERROR_BACKOFF).await;
                        }
                        // a quiet window is steady state, not an error
                        Err(_elapsed) => self.monitor.on_timeout(),
                    }
                }
            }
        }

        info!("telemetry feed stopped");
        Ok(())
    }
}
