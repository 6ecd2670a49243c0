pub mod config;
pub mod core;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use core::*;
pub use state::AppState;
pub use telemetry::{MemorySink, RelayEvent, RelayEventSink, TracingSink};
