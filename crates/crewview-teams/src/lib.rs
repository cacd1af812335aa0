//! Agent team state for crewview.
//!
//! Reads team configs from `<claude>/teams/`, task files from
//! `<claude>/tasks/` and agent output logs, computes aggregate stats,
//! tracks team lifetimes and archives teams that disappear. The
//! [`TeamWatcher`] turns filesystem activity into typed [`ChangeEvent`]s.

pub mod archive;
pub mod errors;
pub mod inbox;
pub mod lifecycle;
pub mod outputs;
pub mod parser;
pub mod projects;
pub mod roots;
pub mod scanner;
pub mod settle;
pub mod stats;
pub mod types;
pub mod watcher;

pub use errors::TeamsError;
pub use lifecycle::{LifecycleRecord, LifecycleTracker};
pub use roots::DataRoots;
pub use stats::compute_stats;
pub use types::*;
pub use watcher::{ChangeEvent, ChangeKind, TeamWatcher, WatchPolicy, WatchTree};
