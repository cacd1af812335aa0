//! File watcher for the teams, tasks and agent-output trees.
//!
//! Raw notify events are classified into typed [`ChangeEvent`]s, settled per
//! path, and delivered on a tokio channel. Consumers can also construct
//! `ChangeEvent`s directly to simulate activity without real filesystem timing.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::TeamsError;
use crate::roots::{CONFIG_FILE, DataRoots, OUTPUT_EXTENSION};
use crate::settle::Settler;

/// Which watched tree an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchTree {
    Teams,
    Tasks,
    Outputs,
}

impl WatchTree {
    pub fn root(self, roots: &DataRoots) -> &Path {
        match self {
            WatchTree::Teams => &roots.teams,
            WatchTree::Tasks => &roots.tasks,
            WatchTree::Outputs => &roots.outputs,
        }
    }

    fn wants(self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str());
        match self {
            WatchTree::Teams | WatchTree::Tasks => ext == Some("json"),
            WatchTree::Outputs => ext == Some(OUTPUT_EXTENSION),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// A settled change to one file in a watched tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub tree: WatchTree,
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl ChangeEvent {
    fn relative<'a>(&'a self, roots: &'a DataRoots) -> Option<&'a Path> {
        self.path.strip_prefix(self.tree.root(roots)).ok()
    }

    /// The team a teams- or tasks-tree event belongs to.
    pub fn team_name(&self, roots: &DataRoots) -> Option<String> {
        if self.tree == WatchTree::Outputs {
            return None;
        }
        match self.relative(roots)?.components().next()? {
            Component::Normal(name) => name.to_str().map(str::to_string),
            _ => None,
        }
    }

    /// Whether this is `<teams>/<team>/config.json`.
    pub fn is_team_config(&self, roots: &DataRoots) -> bool {
        if self.tree != WatchTree::Teams {
            return false;
        }
        let Some(relative) = self.relative(roots) else {
            return false;
        };
        let parts: Vec<_> = relative.components().collect();
        parts.len() == 2 && parts[1].as_os_str() == CONFIG_FILE
    }
}

/// How the trees are watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPolicy {
    /// Poll the filesystem instead of using native notifications.
    pub use_polling: bool,
    pub poll_interval: Duration,
    /// Quiet period before an event on a path is released.
    pub settle: Duration,
    /// Subdirectory levels below a root that are still reported.
    pub max_depth: usize,
}

impl Default for WatchPolicy {
    fn default() -> Self {
        Self {
            use_polling: false,
            poll_interval: Duration::from_millis(1000),
            settle: Duration::from_millis(500),
            max_depth: 2,
        }
    }
}

fn all_paths(kind: ChangeKind, event: &Event) -> Vec<(ChangeKind, &Path)> {
    event.paths.iter().map(|p| (kind, p.as_path())).collect()
}

fn kinds_for(event: &Event) -> Vec<(ChangeKind, &Path)> {
    let all = |kind| all_paths(kind, event);
    match event.kind {
        EventKind::Create(_) => all(ChangeKind::Added),
        EventKind::Remove(_) => all(ChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => all(ChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => all(ChangeKind::Added),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::new();
            if let Some(from) = event.paths.first() {
                out.push((ChangeKind::Removed, from.as_path()));
            }
            if let Some(to) = event.paths.get(1) {
                out.push((ChangeKind::Added, to.as_path()));
            }
            out
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let kind = if p.exists() {
                    ChangeKind::Added
                } else {
                    ChangeKind::Removed
                };
                (kind, p.as_path())
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => all(ChangeKind::Modified),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

/// Turn one raw notify event into the changes we care about.
///
/// Drops events deeper than `max_depth` directories below `root` and files
/// the tree does not track. Removal of a whole team directory is reported as
/// removal of its config.
pub fn classify(tree: WatchTree, root: &Path, max_depth: usize, event: &Event) -> Vec<ChangeEvent> {
    let mut changes = Vec::new();

    for (kind, path) in kinds_for(event) {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let depth = relative.components().count();
        if depth == 0 || depth - 1 > max_depth {
            continue;
        }

        if tree == WatchTree::Teams && kind == ChangeKind::Removed && depth == 1 {
            changes.push(ChangeEvent {
                tree,
                kind,
                path: path.join(CONFIG_FILE),
            });
            continue;
        }

        if tree.wants(path) {
            changes.push(ChangeEvent {
                tree,
                kind,
                path: path.to_path_buf(),
            });
        }
    }

    changes
}

enum Backend {
    Native(RecommendedWatcher),
    Poll(PollWatcher),
}

impl Backend {
    fn create(
        policy: &WatchPolicy,
        tree: WatchTree,
        root: PathBuf,
        tx: mpsc::UnboundedSender<ChangeEvent>,
    ) -> Result<Self, notify::Error> {
        let max_depth = policy.max_depth;
        let handler_root = root.clone();
        let handler = move |result: notify::Result<Event>| match result {
            Ok(event) => {
                for change in classify(tree, &handler_root, max_depth, &event) {
                    // Receiver gone means the watcher is shutting down.
                    let _ = tx.send(change);
                }
            }
            Err(e) => {
                tracing::warn!(
                    event = "teams.watcher.event_error",
                    tree = ?tree,
                    error = %e
                );
            }
        };

        let mut backend = if policy.use_polling {
            let config = notify::Config::default().with_poll_interval(policy.poll_interval);
            Backend::Poll(PollWatcher::new(handler, config)?)
        } else {
            Backend::Native(notify::recommended_watcher(handler)?)
        };
        match &mut backend {
            Backend::Native(w) => w.watch(&root, RecursiveMode::Recursive)?,
            Backend::Poll(w) => w.watch(&root, RecursiveMode::Recursive)?,
        }
        Ok(backend)
    }
}

/// Watches the three data trees and emits settled [`ChangeEvent`]s.
pub struct TeamWatcher {
    /// Underlying notify watchers. Must be kept alive.
    _backends: Vec<Backend>,
    settle_task: JoinHandle<()>,
    watched: Vec<WatchTree>,
}

impl TeamWatcher {
    /// Start watching. Must be called from within a tokio runtime.
    ///
    /// A tree whose root is missing or cannot be watched is logged and
    /// skipped; the others keep working. Fails only if no tree is watchable.
    pub fn start(
        roots: &DataRoots,
        policy: &WatchPolicy,
        out: mpsc::UnboundedSender<ChangeEvent>,
    ) -> Result<Self, TeamsError> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut backends = Vec::new();
        let mut watched = Vec::new();
        let mut last_error = None;

        for tree in [WatchTree::Teams, WatchTree::Tasks, WatchTree::Outputs] {
            let root = tree.root(roots).to_path_buf();
            if !root.is_dir() {
                tracing::warn!(
                    event = "teams.watcher.root_missing",
                    tree = ?tree,
                    path = %root.display()
                );
                continue;
            }
            match Backend::create(policy, tree, root.clone(), raw_tx.clone()) {
                Ok(backend) => {
                    tracing::info!(
                        event = "teams.watcher.watching",
                        tree = ?tree,
                        path = %root.display(),
                        polling = policy.use_polling
                    );
                    backends.push(backend);
                    watched.push(tree);
                }
                Err(e) => {
                    tracing::warn!(
                        event = "teams.watcher.watch_failed",
                        tree = ?tree,
                        path = %root.display(),
                        error = %e
                    );
                    last_error = Some(e);
                }
            }
        }

        if backends.is_empty() {
            return Err(match last_error {
                Some(e) => e.into(),
                None => TeamsError::Watch(notify::Error::generic("no watchable directories")),
            });
        }

        let settle_task = tokio::spawn(settle_loop(raw_rx, out, policy.settle));
        Ok(Self {
            _backends: backends,
            settle_task,
            watched,
        })
    }

    pub fn watched_trees(&self) -> &[WatchTree] {
        &self.watched
    }
}

impl Drop for TeamWatcher {
    fn drop(&mut self) {
        self.settle_task.abort();
    }
}

async fn wait_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

async fn settle_loop(
    mut raw: mpsc::UnboundedReceiver<ChangeEvent>,
    out: mpsc::UnboundedSender<ChangeEvent>,
    window: Duration,
) {
    let mut settler = Settler::new(window);

    loop {
        tokio::select! {
            received = raw.recv() => match received {
                Some(change) => settler.record(change, std::time::Instant::now()),
                None => break,
            },
            _ = wait_until(settler.next_deadline()) => {}
        }

        for change in settler.drain_ready(std::time::Instant::now()) {
            tracing::debug!(
                event = "teams.watcher.change_settled",
                tree = ?change.tree,
                kind = ?change.kind,
                path = %change.path.display()
            );
            if out.send(change).is_err() {
                return;
            }
        }
    }

    // Sources are gone; release whatever is still waiting.
    for change in settler.drain_ready(std::time::Instant::now() + window) {
        let _ = out.send(change);
    }
}
