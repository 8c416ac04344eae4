//! Orchestration layer: wires a dataset and a transport together into one
//! running clone, owns its configuration, and drives bootstrap and the
//! online/offline lifecycle.

#![forbid(unsafe_code)]

mod config;
mod engine;
mod error;
mod logging;

pub use config::{CloneConfig, ConstraintConfig};
pub use engine::{CloneEngine, EngineState};
pub use error::EngineError;
pub use logging::init_logging;
