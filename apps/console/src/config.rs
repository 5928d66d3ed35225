//! JSON configuration with serde defaults; missing keys fall back to the
//! builtin values, unknown keys are ignored.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use pitwall_control::ControlConfig;
use pitwall_ingest_ac::AcConfig;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub telemetry: TelemetryCfg,
    pub control: ControlCfg,
    pub logging: LoggingCfg,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryCfg {
    pub host: String,
    pub port: u16,
    pub timeout_s: f64,
    pub buffer_size: usize,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9996,
            timeout_s: 1.0,
            buffer_size: 4096,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlCfg {
    pub host: String,
    pub port: u16,
    pub enabled: bool,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9997,
            enabled: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingCfg {
    pub enabled: bool,
    pub directory: String,
}

impl Default for LoggingCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: "logs".into(),
        }
    }
}

impl DashboardConfig {
    /// Loads `path`, writing the defaults there first if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let cfg = Self::default();
            cfg.save(path)?;
            return Ok(cfg);
        }
        let raw =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("create config dir {}", dir.display()))?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("write {}", path.display()))
    }

    pub fn ac_config(&self) -> AcConfig {
        AcConfig {
            bind_addr: format!("{}:{}", self.telemetry.host, self.telemetry.port),
            recv_timeout: Duration::from_secs_f64(self.telemetry.timeout_s),
            recv_buffer: self.telemetry.buffer_size,
        }
    }

    pub fn control_config(&self) -> ControlConfig {
        ControlConfig {
            target_addr: format!("{}:{}", self.control.host, self.control.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_standard_ports() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.ac_config().bind_addr, "127.0.0.1:9996");
        assert_eq!(cfg.ac_config().recv_timeout, Duration::from_secs(1));
        assert_eq!(cfg.control_config().target_addr, "127.0.0.1:9997");
        assert!(!cfg.logging.enabled);
    }

    #[test]
    fn partial_file_is_merged_over_defaults() {
        let cfg: DashboardConfig =
            serde_json::from_str(r#"{"telemetry": {"port": 7000}, "logging": {"enabled": true}}"#)
                .unwrap();
        assert_eq!(cfg.telemetry.port, 7000);
        assert_eq!(cfg.telemetry.host, "127.0.0.1");
        assert_eq!(cfg.telemetry.timeout_s, 1.0);
        assert!(cfg.logging.enabled);
        assert_eq!(cfg.control.port, 9997);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = std::env::temp_dir().join(format!("pitwall-cfg-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("pitwall.json");

        let cfg = DashboardConfig::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.telemetry.port, 9996);

        let again = DashboardConfig::load(&path).unwrap();
        assert_eq!(again.telemetry.port, 9996);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
