// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch padding operations for an iterative generation loop.
//!
//! [`TensorHelper`] wraps an immutable [`TensorConfig`] and exposes the
//! operations the loop calls each round, grouped by concern:
//!
//! - **Trimming** ([`cut_to_effective_len`](TensorHelper::cut_to_effective_len))
//!   shrinks a batch to the widest row's real-token count.
//! - **Pad-side conversion** ([`convert_pad_structure`](TensorHelper::convert_pad_structure))
//!   moves every row's padding to one side with a stable reordering.
//! - **Masks and positions** ([`create_attention_mask`](TensorHelper::create_attention_mask),
//!   [`create_position_ids`](TensorHelper::create_position_ids)).
//! - **Concatenation** ([`concatenate_with_padding`](TensorHelper::concatenate_with_padding)).
//! - **Active-row scattering** ([`example_level_pad`](TensorHelper::example_level_pad),
//!   [`example_level_pad_tensor`](TensorHelper::example_level_pad_tensor)).
//! - **Ragged stacking** ([`pad_and_stack`](TensorHelper::pad_and_stack)).
//!
//! Every operation is a pure function of its inputs: new tensors are
//! returned, nothing is mutated, and the helper can be shared across
//! threads.

mod convert;
mod masks;
mod scatter;
mod stack;
mod trim;

use std::collections::HashMap;

use candle_core::{DType, Device, Shape, Tensor};

use crate::config::TensorConfig;
use crate::error::{PadError, Result};

pub use scatter::DEFAULT_TENSOR_PAD_VALUE;
pub use trim::ATTENTION_MASK_KEY;

/// Named tensors sharing one batch layout (`input_ids`, `attention_mask`, ...).
pub type TensorDict = HashMap<String, Tensor>;

/// Padding helper bound to one [`TensorConfig`].
///
/// # Example
///
/// ```
/// use candle_core::{Device, Tensor};
/// use candle_padkit::{PaddingSide, TensorConfig, TensorHelper};
///
/// let helper = TensorHelper::new(TensorConfig::new(0));
/// let ids = Tensor::new(&[[5u32, 6, 0, 0], [7, 0, 0, 0]], &Device::Cpu).unwrap();
///
/// let (left, _perm) = helper.convert_pad_structure(&ids, PaddingSide::Left).unwrap();
/// assert_eq!(
///     left.to_vec2::<u32>().unwrap(),
///     vec![vec![0, 0, 5, 6], vec![0, 0, 0, 7]]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct TensorHelper {
    config: TensorConfig,
}

impl TensorHelper {
    /// Create a helper for the given configuration.
    pub const fn new(config: TensorConfig) -> Self {
        Self { config }
    }

    /// The configuration this helper was built with.
    pub const fn config(&self) -> &TensorConfig {
        &self.config
    }

    /// The pad token id as a float, for building pad-filled blocks.
    fn pad_value(&self) -> f64 {
        f64::from(self.config.pad_token_id)
    }

    /// `U8` tensors cannot hold a pad token above 255; the cast would
    /// saturate to a different id.
    fn check_pad_fits(&self, dtype: DType) -> Result<()> {
        if dtype == DType::U8 && self.config.pad_token_id > u32::from(u8::MAX) {
            return Err(PadError::Config(format!(
                "pad token {} does not fit U8 tensors",
                self.config.pad_token_id
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Build a tensor of `shape` filled with `value`, in `dtype` on `device`.
///
/// The fill is materialised on the CPU in `F64` and then cast, since not
/// every accelerator backend supports `F64` or every integer dtype for
/// `Tensor::full`.
fn filled(value: f64, shape: impl Into<Shape>, dtype: DType, device: &Device) -> Result<Tensor> {
    let block = Tensor::full(value, shape, &Device::Cpu)?
        .to_dtype(dtype)?
        .contiguous()?
        .to_device(device)?;
    Ok(block)
}

/// Convert a row/column index into the `u32` index dtype candle gathers with.
fn index_u32(idx: usize) -> Result<u32> {
    u32::try_from(idx).map_err(|_| PadError::Shape(format!("index {idx} overflows u32")))
}

/// Require a rank-2 `[batch, seq]` tensor and return its dims.
fn batch_dims(tensor: &Tensor, what: &str) -> Result<(usize, usize)> {
    if tensor.rank() != 2 {
        return Err(PadError::Shape(format!(
            "{what} must be [batch, seq], got shape {:?}",
            tensor.dims()
        )));
    }
    Ok(tensor.dims2()?)
}
