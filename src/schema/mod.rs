//! keyboard.event.v1 schema
//!
//! Recorded keyboard callbacks, used to replay typing sessions offline and
//! to drive the engine through the CLI and FFI surfaces.

mod adapter;
mod event;

pub use adapter::*;
pub use event::*;
