//! Keystroke Flux - On-device keystroke-dynamics session engine
//!
//! Flux turns the raw callbacks of a custom keyboard (key down/up, characters,
//! word boundaries, backspaces, touch pressure) into one summary record per
//! typing session: typing speed, inter-key interval statistics, pause
//! statistics and error-correction counts.
//!
//! ## Modules
//!
//! - **Timers**: interval timers and the slot registry that enforces one
//!   pending timer per slot
//! - **Session**: counters, aggregation and the usability gate behind each
//!   typing session
//! - **Input**: the keyboard-facing lifecycle that starts and ends sessions
//!   and hands accepted records to an output sink
//! - **Replay**: drives the engine from recorded keyboard.event.v1 streams

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod counters;
pub mod error;
pub mod gate;
pub mod input;
pub mod metrics;
pub mod pipeline;
pub mod registry;
pub mod schema;
pub mod session;
pub mod sink;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, GateConfig, OverlapPolicy};
pub use error::EngineError;
pub use gate::{GateRejection, UsabilityGate};
pub use input::{EngineContext, InputSession};
pub use metrics::{IntervalTimer, Metric, MetricKind};
pub use pipeline::{replay_events, replay_to_json, ReplayReport, SessionReplayer};
pub use registry::{CtcSlot, TimerRegistry};
pub use session::{SessionReport, TypingSession};
pub use sink::{ChannelSink, EmittedRecord, JsonLinesSink, MemorySink, NullSink, OutputSink};
pub use types::{SessionOutcome, UserIdentity, UserTypingData};

// Schema exports
pub use schema::{EventAdapter, KeyboardEvent, TimedEvent, SCHEMA_VERSION};

/// Engine version reported by the CLI and FFI
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "keystroke-flux";
