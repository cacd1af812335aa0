use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crewview_paths::{ClaudePaths, CrewviewPaths};
use crewview_teams::{DataRoots, WatchPolicy};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

/// Server configuration.
///
/// Read from the `[server]` section of `~/.crewview/config.toml`. CLI flags
/// are applied on top by the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP + WebSocket listen address.
    /// Default: `127.0.0.1:3001`
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Base directory written by agent processes.
    /// Default: `~/.claude`
    #[serde(default = "default_claude_dir")]
    pub claude_dir: PathBuf,

    /// Overrides `<claude_dir>/teams`.
    #[serde(default)]
    pub teams_dir: Option<PathBuf>,

    /// Overrides `<claude_dir>/tasks`.
    #[serde(default)]
    pub tasks_dir: Option<PathBuf>,

    /// Overrides `<claude_dir>/projects`.
    #[serde(default)]
    pub projects_dir: Option<PathBuf>,

    /// Directory of agent `.output` logs.
    /// Default: `$TMPDIR/claude`
    #[serde(default = "ClaudePaths::default_outputs_dir")]
    pub outputs_dir: PathBuf,

    /// Where archive records are written.
    /// Default: `~/.crewview/archive`
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,

    /// Messages queued per WebSocket observer before it is dropped as stalled.
    /// Default: 256
    #[serde(default = "default_observer_buffer")]
    pub observer_buffer: usize,

    #[serde(default)]
    pub watch: WatchConfig,
}

/// The `[server.watch]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub use_polling: bool,

    /// Default: 1000
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Quiet period per path before an event is acted on.
    /// Default: 500
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Default: 2
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl ServerConfig {
    /// Validate configuration values.
    ///
    /// Called after loading config to catch misconfiguration early.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.observer_buffer == 0 {
            return Err(ServerError::ConfigInvalid(
                "observer_buffer must be > 0".to_string(),
            ));
        }
        if self.watch.use_polling && self.watch.poll_interval_ms == 0 {
            return Err(ServerError::ConfigInvalid(
                "watch.poll_interval_ms must be > 0 when use_polling is set".to_string(),
            ));
        }
        if self.watch.max_depth == 0 {
            return Err(ServerError::ConfigInvalid(
                "watch.max_depth must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Every directory the engine reads and writes.
    pub fn roots(&self) -> DataRoots {
        let claude = ClaudePaths::from_dir(self.claude_dir.clone());
        let mut roots =
            DataRoots::from_claude(&claude, self.outputs_dir.clone(), self.archive_dir.clone());
        if let Some(dir) = &self.teams_dir {
            roots.teams = dir.clone();
        }
        if let Some(dir) = &self.tasks_dir {
            roots.tasks = dir.clone();
        }
        if let Some(dir) = &self.projects_dir {
            roots.projects = dir.clone();
        }
        roots
    }

    pub fn watch_policy(&self) -> WatchPolicy {
        WatchPolicy {
            use_polling: self.watch.use_polling,
            poll_interval: Duration::from_millis(self.watch.poll_interval_ms),
            settle: Duration::from_millis(self.watch.settle_ms),
            max_depth: self.watch.max_depth,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            claude_dir: default_claude_dir(),
            teams_dir: None,
            tasks_dir: None,
            projects_dir: None,
            outputs_dir: ClaudePaths::default_outputs_dir(),
            archive_dir: default_archive_dir(),
            observer_buffer: default_observer_buffer(),
            watch: WatchConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            use_polling: false,
            poll_interval_ms: default_poll_interval_ms(),
            settle_ms: default_settle_ms(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3001))
}

fn crewview_paths() -> CrewviewPaths {
    CrewviewPaths::resolve().unwrap_or_else(|e| {
        tracing::warn!(
            event = "server.config.home_dir_fallback",
            error = %e,
            fallback = "/tmp/.crewview",
        );
        CrewviewPaths::from_dir(PathBuf::from("/tmp/.crewview"))
    })
}

fn default_claude_dir() -> PathBuf {
    ClaudePaths::resolve()
        .unwrap_or_else(|e| {
            tracing::warn!(
                event = "server.config.claude_dir_fallback",
                error = %e,
                fallback = "/tmp/.claude",
            );
            ClaudePaths::from_dir(PathBuf::from("/tmp/.claude"))
        })
        .claude_dir()
        .to_path_buf()
}

fn default_archive_dir() -> PathBuf {
    crewview_paths().archive_dir()
}

fn default_observer_buffer() -> usize {
    256
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_settle_ms() -> u64 {
    500
}

fn default_max_depth() -> usize {
    2
}

/// Wrapper for deserializing the `[server]` section of the config file.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    server: ServerConfig,
}

/// Load configuration from an explicit file.
///
/// Falls back to defaults if the file doesn't exist, can't be read, or
/// doesn't parse. Only validation failures are errors.
pub fn load_config_from(path: &Path) -> Result<ServerConfig, ServerError> {
    let config = match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
            Ok(file) => file.server,
            Err(e) => {
                tracing::warn!(
                    event = "server.config.parse_failed",
                    path = %path.display(),
                    error = %e,
                );
                ServerConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ServerConfig::default(),
        Err(e) => {
            tracing::warn!(
                event = "server.config.read_failed",
                path = %path.display(),
                error = %e,
            );
            ServerConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from `~/.crewview/config.toml`.
pub fn load_server_config() -> Result<ServerConfig, ServerError> {
    load_config_from(&crewview_paths().user_config())
}
