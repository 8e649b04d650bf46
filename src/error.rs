//! Errors raised by the engine.

use std::io;

/// Result type alias using [`NeatError`].
pub type Result<T> = std::result::Result<T, NeatError>;

/// Everything that can go wrong while running an evolution.
///
/// Settings, tracker and persistence errors abort a run. Phenome and decode
/// errors only ever affect a single organism, which is then scored with
/// minimal fitness.
#[derive(Debug, thiserror::Error)]
pub enum NeatError {
    /// The settings can not describe a runnable experiment.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The innovation tracker thread is gone.
    #[error("innovation tracker is no longer running")]
    TrackerClosed,

    /// The population ran out of species.
    #[error("population has no species left")]
    Extinct,

    /// An organism was evaluated before it was decoded.
    #[error("organism {0} has no phenome")]
    MissingPhenome(u64),

    /// The phenome did not produce any output.
    #[error("phenome produced no outputs")]
    EmptyOutputs,

    /// The phenome produced NaN or infinite outputs.
    #[error("phenome produced undefined outputs")]
    UndefinedOutputs,

    /// The number of inputs does not match the phenome.
    #[error("expected {expected} inputs, got {actual}")]
    InputMismatch { expected: usize, actual: usize },

    /// The genome could not be turned into a phenome.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Archive read/write failure.
    #[error("archive I/O error: {0}")]
    Io(#[from] io::Error),

    /// Archive contents could not be (de)serialized.
    #[error("archive format error: {0}")]
    Json(#[from] serde_json::Error),
}
