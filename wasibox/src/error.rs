//! Embedder-facing errors of the run loop.

use thiserror::Error;

/// Failure to load, instantiate or run a guest module. Guest-level exit
/// codes (including cancellation) are not errors; they are returned as
/// values by the run loop.
#[derive(Debug, Error)]
pub enum RunError {
    /// The module bytes could not be read.
    #[error("failed to read wasm module: {0}")]
    Load(#[from] std::io::Error),
    /// The module failed to validate, compile or link.
    #[error("failed to instantiate wasm module: {0}")]
    Instantiate(String),
    /// The module has no usable `_start` entry point.
    #[error("module has no _start entry point: {0}")]
    MissingStart(String),
    /// The guest trapped or raised a host error that is not an exit code.
    #[error("guest trapped: {0}")]
    Trap(String),
}
