//! Bidirectional relay between a telephony media stream and a realtime
//! voice backend.
//!
//! - `control`: parse raw frames from either leg into [`ControlMessage`]s
//! - `classifier`: decide what to do with a realtime event
//! - `session`: per-call state
//! - `settings`: shared, read-only relay settings
//! - `engine`: the per-call loop tying it together

pub mod classifier;
pub mod control;
pub mod engine;
pub mod session;
pub mod settings;

pub use classifier::{DEFAULT_LOG_EVENT_TYPES, EventClass, EventClassifier, LogEventTypes};
pub use control::ControlMessage;
pub use engine::{RelayEngine, relay_call};
pub use session::{RelayStats, Session, SessionPhase};
pub use settings::{DEFAULT_CLOSE_GRACE, RelaySettings};
