//! Radio Delay: a live audio delay line.
//!
//! Captured audio is played back a configurable number of seconds later. The
//! delay is owned by a control hub and changed live from the keyboard or two
//! push-buttons; an audio engine thread and a display worker thread each
//! follow the hub's broadcasts.

pub mod audio;
pub mod config;
pub mod control;
pub mod delay;
pub mod display;
mod lock;
pub mod runtime;
pub mod telemetry;
pub mod terminal_restore;

pub(crate) use lock::lock_or_recover;
pub use runtime::{Runtime, RuntimePlan};
pub use telemetry::init_tracing;
