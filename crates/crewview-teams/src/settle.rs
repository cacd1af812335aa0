//! Per-path coalescing of raw filesystem notifications.
//!
//! A path's event is released only after it has been quiet for the settle
//! window, which absorbs editors and agents that write a file in stages.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::watcher::{ChangeEvent, ChangeKind, WatchTree};

#[derive(Debug)]
struct Pending {
    tree: WatchTree,
    kind: ChangeKind,
    last_event: Instant,
}

#[derive(Debug)]
pub struct Settler {
    window: Duration,
    pending: HashMap<PathBuf, Pending>,
}

/// Fold a new event kind into the one already waiting for that path.
/// `None` means the two cancel out.
fn merge(previous: ChangeKind, next: ChangeKind) -> Option<ChangeKind> {
    use ChangeKind::*;
    match (previous, next) {
        (Added, Modified) => Some(Added),
        (Added, Removed) => None,
        (Removed, Added) | (Removed, Modified) => Some(Modified),
        (_, next) => Some(next),
    }
}

impl Settler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn record(&mut self, event: ChangeEvent, now: Instant) {
        let ChangeEvent { tree, kind, path } = event;
        match self.pending.remove(&path) {
            Some(previous) => {
                if let Some(kind) = merge(previous.kind, kind) {
                    self.pending.insert(
                        path,
                        Pending {
                            tree,
                            kind,
                            last_event: now,
                        },
                    );
                }
            }
            None => {
                self.pending.insert(
                    path,
                    Pending {
                        tree,
                        kind,
                        last_event: now,
                    },
                );
            }
        }
    }

    /// Release every event that has been quiet for the full window.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<ChangeEvent> {
        let ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, p)| now.duration_since(p.last_event) >= self.window)
            .map(|(path, _)| path.clone())
            .collect();

        let mut events: Vec<(Instant, ChangeEvent)> = ready
            .into_iter()
            .filter_map(|path| {
                let p = self.pending.remove(&path)?;
                Some((
                    p.last_event,
                    ChangeEvent {
                        tree: p.tree,
                        kind: p.kind,
                        path,
                    },
                ))
            })
            .collect();
        events.sort_by_key(|(at, _)| *at);
        events.into_iter().map(|(_, e)| e).collect()
    }

    /// When the earliest pending event becomes ready.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .values()
            .map(|p| p.last_event + self.window)
            .min()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    fn event(kind: ChangeKind, path: &str) -> ChangeEvent {
        ChangeEvent {
            tree: WatchTree::Teams,
            kind,
            path: PathBuf::from(path),
        }
    }

    #[test]
    fn test_holds_until_quiet() {
        let t0 = Instant::now();
        let mut settler = Settler::new(WINDOW);
        settler.record(event(ChangeKind::Modified, "/t/a/config.json"), t0);

        assert!(settler.drain_ready(t0 + Duration::from_millis(100)).is_empty());
        assert_eq!(settler.next_deadline(), Some(t0 + WINDOW));

        let ready = settler.drain_ready(t0 + WINDOW);
        assert_eq!(ready.len(), 1);
        assert!(settler.is_empty());
    }

    #[test]
    fn test_staged_writes_collapse_to_add() {
        let t0 = Instant::now();
        let mut settler = Settler::new(WINDOW);
        settler.record(event(ChangeKind::Added, "/t/a/config.json"), t0);
        settler.record(
            event(ChangeKind::Modified, "/t/a/config.json"),
            t0 + Duration::from_millis(300),
        );

        // The second write restarts the window.
        assert!(settler.drain_ready(t0 + WINDOW).is_empty());
        let ready = settler.drain_ready(t0 + Duration::from_millis(800));
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].kind, ChangeKind::Added);
    }

    #[test]
    fn test_add_then_remove_cancels() {
        let t0 = Instant::now();
        let mut settler = Settler::new(WINDOW);
        settler.record(event(ChangeKind::Added, "/t/tmp.json"), t0);
        settler.record(event(ChangeKind::Removed, "/t/tmp.json"), t0);
        assert!(settler.is_empty());
    }

    #[test]
    fn test_modify_then_remove_is_remove() {
        let t0 = Instant::now();
        let mut settler = Settler::new(WINDOW);
        settler.record(event(ChangeKind::Modified, "/t/a/config.json"), t0);
        settler.record(event(ChangeKind::Removed, "/t/a/config.json"), t0);
        let ready = settler.drain_ready(t0 + WINDOW);
        assert_eq!(ready[0].kind, ChangeKind::Removed);
    }

    #[test]
    fn test_atomic_replace_is_modify() {
        let t0 = Instant::now();
        let mut settler = Settler::new(WINDOW);
        settler.record(event(ChangeKind::Removed, "/t/a/config.json"), t0);
        settler.record(event(ChangeKind::Added, "/t/a/config.json"), t0);
        let ready = settler.drain_ready(t0 + WINDOW);
        assert_eq!(ready[0].kind, ChangeKind::Modified);
    }

    #[test]
    fn test_release_order_follows_last_event() {
        let t0 = Instant::now();
        let mut settler = Settler::new(WINDOW);
        settler.record(event(ChangeKind::Modified, "/t/b.json"), t0 + Duration::from_millis(10));
        settler.record(event(ChangeKind::Modified, "/t/a.json"), t0);
        let ready = settler.drain_ready(t0 + Duration::from_secs(1));
        assert_eq!(ready[0].path, PathBuf::from("/t/a.json"));
        assert_eq!(ready[1].path, PathBuf::from("/t/b.json"));
    }
}
