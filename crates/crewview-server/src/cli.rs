use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::ServerConfig;

/// Live dashboard backend for agent teams.
#[derive(Debug, Parser)]
#[command(name = "crewview", version, about)]
pub struct Args {
    /// Config file to read instead of ~/.crewview/config.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:3001
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    /// Directory holding teams/, tasks/ and projects/
    #[arg(long, value_name = "DIR")]
    pub claude_dir: Option<PathBuf>,

    /// Where archive records are written
    #[arg(long, value_name = "DIR")]
    pub archive_dir: Option<PathBuf>,

    /// Directory of agent .output logs
    #[arg(long, value_name = "DIR")]
    pub outputs_dir: Option<PathBuf>,

    /// Poll the filesystem instead of using native notifications
    #[arg(long)]
    pub poll: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    /// Apply flags on top of file configuration.
    pub fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        if let Some(addr) = self.bind {
            config.bind_addr = addr;
        }
        if let Some(dir) = &self.claude_dir {
            config.claude_dir = dir.clone();
        }
        if let Some(dir) = &self.archive_dir {
            config.archive_dir = dir.clone();
        }
        if let Some(dir) = &self.outputs_dir {
            config.outputs_dir = dir.clone();
        }
        if self.poll {
            config.watch.use_polling = true;
        }
        config
    }
}
