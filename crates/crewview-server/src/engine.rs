//! The synchronisation pipeline.
//!
//! A single consumer loop takes [`ChangeEvent`]s off the watcher channel and,
//! for each one, updates lifecycle bookkeeping, archives removed teams,
//! re-reads the full state and broadcasts it. Tests drive
//! [`SyncEngine::handle_change`] directly.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use crewview_paths::{NameKind, validate_name};
use crewview_teams::{
    ChangeEvent, ChangeKind, DataRoots, LifecycleTracker, Team, TeamStats, WatchTree, archive,
    compute_stats, outputs, scanner,
};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::hub::BroadcastHub;
use crate::messages::WireMessage;

/// Reply body of the health endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub observers: usize,
    pub teams: usize,
    pub version: &'static str,
}

/// What the engine last read, kept for archiving teams that are already gone.
#[derive(Debug, Default)]
struct SnapshotCache {
    /// Team list as of the last synchronisation.
    current: Vec<Team>,
    /// Teams a synchronisation stopped seeing whose config removal has not
    /// been handled yet, as last read.
    departed: HashMap<String, Team>,
}

impl SnapshotCache {
    fn replace(&mut self, teams: &[Team]) {
        let previous = std::mem::replace(&mut self.current, teams.to_vec());
        for team in previous {
            if !teams.iter().any(|t| t.name == team.name) {
                self.departed.insert(team.name.clone(), team);
            }
        }
        for team in teams {
            self.departed.remove(&team.name);
        }
    }

    /// Last known state of a team being archived. Consumes a departed entry.
    fn take(&mut self, name: &str) -> Option<Team> {
        self.departed
            .remove(name)
            .or_else(|| self.current.iter().find(|t| t.name == name).cloned())
    }
}

/// Engine state. One instance per server; tests build isolated ones.
pub struct SyncEngine {
    roots: DataRoots,
    hub: Arc<BroadcastHub>,
    lifecycle: Mutex<LifecycleTracker>,
    snapshots: RwLock<SnapshotCache>,
    started_at: Instant,
}

impl SyncEngine {
    pub fn new(roots: DataRoots, hub: Arc<BroadcastHub>) -> Self {
        Self {
            roots,
            hub,
            lifecycle: Mutex::new(LifecycleTracker::new()),
            snapshots: RwLock::new(SnapshotCache::default()),
            started_at: Instant::now(),
        }
    }

    pub fn roots(&self) -> &DataRoots {
        &self.roots
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Re-read every active team and remember the result.
    pub async fn resync(&self) -> (Vec<Team>, TeamStats) {
        let teams = scanner::get_active_teams(&self.roots).await;
        let stats = compute_stats(&teams);
        self.snapshots.write().await.replace(&teams);
        (teams, stats)
    }

    /// Full snapshot for a newly connected observer.
    pub async fn initial_data(&self) -> WireMessage {
        let (teams, stats) = self.resync().await;
        let (team_history, agent_outputs) = tokio::join!(
            scanner::get_team_history(&self.roots),
            outputs::get_agent_outputs(&self.roots)
        );
        WireMessage::InitialData {
            data: teams,
            stats,
            team_history,
            agent_outputs,
        }
    }

    pub async fn health(&self) -> Health {
        Health {
            status: "ok",
            uptime_secs: self.started_at.elapsed().as_secs(),
            observers: self.hub.observer_count().await,
            teams: self.snapshots.read().await.current.len(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Lifecycle record of a team, if one is being tracked.
    pub async fn lifecycle_of(&self, team: &str) -> Option<crewview_teams::LifecycleRecord> {
        self.lifecycle.lock().await.get(team).copied()
    }

    /// React to one settled filesystem change. Returns what was broadcast.
    pub async fn handle_change(&self, change: ChangeEvent) -> Option<WireMessage> {
        debug!(
            event = "server.engine.change_received",
            tree = ?change.tree,
            kind = ?change.kind,
            path = %change.path.display()
        );

        match change.tree {
            WatchTree::Outputs => {
                if change.kind == ChangeKind::Removed {
                    return None;
                }
                let outputs = outputs::get_agent_outputs(&self.roots).await;
                let message = WireMessage::AgentOutputsUpdate { outputs };
                self.hub.broadcast(&message).await;
                Some(message)
            }
            WatchTree::Teams | WatchTree::Tasks => {
                let team = change.team_name(&self.roots)?;
                if let Err(e) = validate_name(&team, NameKind::Identifier) {
                    debug!(event = "server.engine.change_ignored", error = %e);
                    return None;
                }

                let now = Utc::now();
                if change.is_team_config(&self.roots) {
                    match change.kind {
                        ChangeKind::Added => {
                            self.lifecycle.lock().await.observe_created(&team, now);
                            info!(event = "server.engine.team_created", team = %team);
                        }
                        ChangeKind::Modified => {
                            self.lifecycle.lock().await.touch(&team, now);
                        }
                        ChangeKind::Removed => {
                            self.archive_removed(&team).await;
                            let record = self.lifecycle.lock().await.remove(&team);
                            info!(
                                event = "server.engine.team_deleted",
                                team = %team,
                                active_secs = record.map(|r| r.active_for(now).num_seconds())
                            );
                        }
                    }
                } else {
                    self.lifecycle.lock().await.touch(&team, now);
                }

                let (data, stats) = self.resync().await;
                let message = match change.tree {
                    WatchTree::Tasks => WireMessage::TaskUpdate { data, stats },
                    _ => WireMessage::TeamsUpdate { data, stats },
                };
                self.hub.broadcast(&message).await;
                Some(message)
            }
        }
    }

    /// Archive a team whose config just disappeared.
    ///
    /// Prefers a live read; falls back to the last state any synchronisation
    /// saw, even if later ones no longer list the team.
    async fn archive_removed(&self, team: &str) -> Option<PathBuf> {
        let live = match scanner::read_team(&self.roots, team).await {
            Ok(found) => found,
            Err(e) => {
                warn!(event = "server.engine.archive_read_failed", team = team, error = %e);
                None
            }
        };
        let cached = self.snapshots.write().await.take(team);
        let snapshot = live.or(cached);
        let Some(snapshot) = snapshot else {
            warn!(event = "server.engine.archive_skipped", team = team, reason = "no snapshot");
            return None;
        };

        match archive::write_archive(&self.roots, &snapshot, Utc::now()).await {
            Ok(path) => Some(path),
            Err(e) => {
                error!(event = "server.engine.archive_failed", team = team, error = %e);
                None
            }
        }
    }

    /// Process changes in arrival order until the channel closes or shutdown.
    pub async fn run(
        self: Arc<Self>,
        mut changes: mpsc::UnboundedReceiver<ChangeEvent>,
        shutdown: CancellationToken,
    ) {
        info!(event = "server.engine.loop_started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                received = changes.recv() => match received {
                    Some(change) => {
                        self.handle_change(change).await;
                    }
                    None => {
                        info!(event = "server.engine.changes_closed");
                        break;
                    }
                },
            }
        }
        info!(event = "server.engine.loop_stopped");
    }
}
