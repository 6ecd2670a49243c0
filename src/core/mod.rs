pub mod adapter;
pub mod base;
pub mod realtime;
pub mod relay;
pub mod telephony;

// Re-export commonly used types for convenience
pub use adapter::{AdapterEvent, AdapterState, ConnectTarget, ConnectionAdapter, WireMessage};
pub use base::{Leg, RelayError, RelayResult};
pub use relay::{
    ControlMessage, EventClass, EventClassifier, LogEventTypes, RelayEngine, RelaySettings,
    Session, SessionPhase, relay_call,
};
