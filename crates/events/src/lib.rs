//! Progress events for end-to-end verification passes
//!
//! The scheduler publishes what it is doing on an [`EventBus`]; the CLI
//! listens to render a per-suite summary once a run finishes.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;
