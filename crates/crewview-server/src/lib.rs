pub mod api;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod hub;
pub mod logging;
pub mod messages;
pub mod server;
pub mod ws;

// Primary re-exports
pub use config::{ServerConfig, WatchConfig, load_config_from, load_server_config};
pub use engine::{Health, SyncEngine};
pub use errors::ServerError;
pub use hub::BroadcastHub;
pub use logging::init_logging;
pub use messages::WireMessage;
pub use server::{run_server, serve};
