//! Host configuration: one YAML file mapping onto the tuning knobs the
//! member crates expose. Every field has a default, so a partial file (or no
//! file at all) still yields a usable setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cursor_orchestrator::CursorConfig;
use improve_loop::ImproveConfig;
use sandbox_bridge::SandboxConfig;

/// Top-level configuration document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent: AgentSection,
    pub improve: ImproveSection,
    pub credentials: CredentialsSection,
}

impl Config {
    /// Load configuration from an explicit path, or from the platform config
    /// directory (`pagepilot/config.yaml`) when none is given. A missing file
    /// is not an error; defaults apply with a warning.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let config_dir =
                    dirs::config_dir().context("could not determine config directory")?;
                config_dir.join("pagepilot").join("config.yaml")
            }
        };

        if path.exists() {
            info!("loading configuration from {}", path.display());
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let config: Config = serde_yaml::from_str(&content)
                .with_context(|| format!("failed to parse config file {}", path.display()))?;
            Ok(config)
        } else {
            warn!("config file not found, using defaults: {}", path.display());
            Ok(Config::default())
        }
    }
}

/// Timing for the sandbox session and the virtual cursor.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// Pause between a document mutation and the scan that reports on it.
    pub settle_ms: u64,
    /// Pointer flight time toward a target.
    pub travel_ms: u64,
    /// How long the pressed state lingers after a dispatch.
    pub hold_ms: u64,
    /// Keystroke cadence inside the sandbox.
    pub per_char_ms: u64,
    /// Grace period before a stale inventory is re-used.
    pub rescan_wait_ms: u64,
    /// Inventories a plan step may consume before it is skipped.
    pub rescan_limit: u32,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            settle_ms: 400,
            travel_ms: 300,
            hold_ms: 120,
            per_char_ms: 60,
            rescan_wait_ms: 250,
            rescan_limit: 3,
        }
    }
}

impl AgentSection {
    pub fn sandbox_config(&self) -> SandboxConfig {
        SandboxConfig {
            settle: Duration::from_millis(self.settle_ms),
            typing: action_executor::TypingTempo::from_millis(self.per_char_ms),
            ..SandboxConfig::default()
        }
    }

    pub fn cursor_config(&self, max_actions: Option<u32>) -> CursorConfig {
        CursorConfig {
            travel: Duration::from_millis(self.travel_ms),
            hold: Duration::from_millis(self.hold_ms),
            rescan_wait: Duration::from_millis(self.rescan_wait_ms),
            rescan_limit: self.rescan_limit,
            max_actions,
        }
    }
}

/// Timing and temperament for the autonomous improvement loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ImproveSection {
    /// Pause on the source view during a review pass.
    pub dwell_ms: u64,
    /// Keystroke cadence in the host prompt field.
    pub per_char_ms: u64,
    /// Interval between credential re-checks while blocked.
    pub poll_ms: u64,
    /// Chance a cycle opens with a source-view review.
    pub review_probability: f64,
}

impl Default for ImproveSection {
    fn default() -> Self {
        Self {
            dwell_ms: 1200,
            per_char_ms: 45,
            poll_ms: 1500,
            review_probability: 0.5,
        }
    }
}

impl ImproveSection {
    pub fn improve_config(&self, max_cycles: Option<u32>) -> ImproveConfig {
        ImproveConfig {
            dwell: Duration::from_millis(self.dwell_ms),
            per_char: Duration::from_millis(self.per_char_ms),
            poll_interval: Duration::from_millis(self.poll_ms),
            review_probability: self.review_probability,
            max_cycles,
        }
    }
}

/// Where the improvement loop looks for API keys.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsSection {
    /// YAML map of service name to key. Re-read on every lookup.
    pub file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_mirror_the_crate_constants() {
        let config = Config::default();
        assert_eq!(
            config.agent.sandbox_config().settle,
            Duration::from_millis(400)
        );
        assert_eq!(
            config.agent.cursor_config(None).travel,
            Duration::from_millis(300)
        );
        assert_eq!(
            config.improve.improve_config(None).poll_interval,
            Duration::from_millis(1500)
        );
        assert!(config.credentials.file.is_none());
    }

    #[test]
    fn partial_yaml_keeps_the_other_defaults() {
        let yaml = "agent:\n  settle_ms: 50\nimprove:\n  review_probability: 0.0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.agent.settle_ms, 50);
        assert_eq!(config.agent.travel_ms, 300);
        assert_eq!(config.improve.review_probability, 0.0);
        assert_eq!(config.improve.dwell_ms, 1200);
    }

    #[tokio::test]
    async fn load_reads_an_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "agent:\n  rescan_limit: 9").unwrap();
        let config = Config::load(Some(file.path())).await.unwrap();
        assert_eq!(config.agent.rescan_limit, 9);
        assert_eq!(config.agent.hold_ms, 120);
    }

    #[tokio::test]
    async fn load_falls_back_to_defaults_when_the_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.yaml")))
            .await
            .unwrap();
        assert_eq!(config.agent.settle_ms, 400);
    }

    #[tokio::test]
    async fn load_rejects_malformed_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "agent: [not, a, map]").unwrap();
        assert!(Config::load(Some(file.path())).await.is_err());
    }

    // XDG_CONFIG_HOME only steers dirs::config_dir on Linux.
    #[cfg(target_os = "linux")]
    #[tokio::test]
    #[serial_test::serial]
    async fn load_finds_the_platform_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("XDG_CONFIG_HOME", dir.path());
        let app_dir = dir.path().join("pagepilot");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("config.yaml"), "agent:\n  settle_ms: 77\n").unwrap();

        let config = Config::load(None).await.unwrap();
        std::env::remove_var("XDG_CONFIG_HOME");
        assert_eq!(config.agent.settle_ms, 77);
    }
}
