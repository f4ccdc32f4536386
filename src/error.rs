// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for candle-padkit.

/// Errors that can occur while reshaping padded batches.
///
/// Contract violations of the active-row scatterer are not represented
/// here: they panic, see [`TensorHelper::example_level_pad`](crate::TensorHelper::example_level_pad).
#[derive(Debug, thiserror::Error)]
pub enum PadError {
    /// Tensor operation error (wraps candle).
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Configuration parsing error.
    #[error("config error: {0}")]
    Config(String),

    /// A tensor name was requested that is not in the tensor dict.
    #[error("missing tensor: {0}")]
    MissingKey(String),

    /// Caller-supplied tensors have incompatible shapes.
    #[error("shape error: {0}")]
    Shape(String),
}

/// Result type alias for candle-padkit operations.
pub type Result<T> = std::result::Result<T, PadError>;
