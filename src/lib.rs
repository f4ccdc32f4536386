// SPDX-License-Identifier: MIT OR Apache-2.0

//! # candle-padkit
//!
//! Padding bookkeeping for batched, iterative text generation, built on
//! [candle](https://github.com/huggingface/candle).
//!
//! A multi-turn generation loop keeps a rolling context per example and
//! grows it every round with new fragments (responses, tool observations).
//! Rows have different lengths, some examples finish early, and the model
//! expects a single padding side. This crate provides the tensor-level
//! operations that keep such a batch consistent:
//!
//! - moving padding to one side with a stable reordering,
//! - deriving attention masks and position ids from pad tokens,
//! - trimming a batch to the width its longest row needs,
//! - concatenating fragments into one context,
//! - scattering results computed on active rows back into the full batch,
//! - padding and stacking ragged sequences.
//!
//! Tokenization, inference and the choice of which examples are active
//! stay with the caller.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod helper;

pub use config::{PaddingSide, TensorConfig};
pub use error::{PadError, Result};
pub use helper::{ATTENTION_MASK_KEY, DEFAULT_TENSOR_PAD_VALUE, TensorDict, TensorHelper};
