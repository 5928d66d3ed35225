//! Outbound control channel to the simulation.
//!
//! `ControlSession` is pure transport: it validates a command name against
//! the injected registry, encodes it, fires the datagram and records what
//! was sent. Clamping, toggles and related-command policy live one layer
//! up in [`VehicleCommands`].

pub mod policy;
pub mod registry;

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tracing::debug;

pub use policy::VehicleCommands;
pub use registry::{decode_command, encode_command, CommandRegistry, CommandSpec, CommandValue, ValueRange};

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("send: {0}")]
    Send(#[from] std::io::Error),
}

/// Last value sent for a command, with the moment it went out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommandRecord {
    pub value: CommandValue,
    pub sent_at: Instant,
}

#[derive(Clone, Debug)]
pub struct ControlConfig {
    /// Where the simulation listens for commands, e.g. "127.0.0.1:9997".
    pub target_addr: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            target_addr: "127.0.0.1:9997".into(),
        }
    }
}

pub struct ControlSession {
    socket: UdpSocket,
    registry: CommandRegistry,
    history: Mutex<HashMap<String, CommandRecord>>,
}

impl ControlSession {
    /// Binds an ephemeral local port and fixes the target. Socket setup
    /// failures are fatal to the session; nothing is retried here.
    pub async fn connect(
        cfg: ControlConfig,
        registry: CommandRegistry,
    ) -> Result<Self, ControlError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&cfg.target_addr).await?;
        Ok(Self {
            socket,
            registry,
            history: Mutex::new(HashMap::new()),
        })
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Fire-and-forget send. The history record is written only after the
    /// datagram actually left.
    pub async fn send(&self, command: &str, value: CommandValue) -> Result<(), ControlError> {
        let spec = self
            .registry
            .lookup(command)
            .ok_or_else(|| ControlError::UnknownCommand(command.to_string()))?;

        let packet = registry::encode_command(spec.code, value);
        self.socket.send(&packet).await?;
        debug!(command, ?value, "control command sent");

        self.history.lock().insert(
            command.to_string(),
            CommandRecord {
                value,
                sent_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Last successfully sent value for `command`, if any.
    pub fn last(&self, command: &str) -> Option<CommandRecord> {
        self.history.lock().get(command).copied()
    }
}
