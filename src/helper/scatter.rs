// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scattering active-only results back into a full batch.
//!
//! After inference restricted to the active rows, the dense sub-batch is
//! expanded to the full batch size: the i-th `true` in the active mask
//! receives the i-th active row, every inactive row is filled with padding.
//! The expansion is one `index_select` over the active rows plus a single
//! trailing pad row.

use candle_core::Tensor;

use super::{TensorHelper, filled, index_u32};
use crate::error::{PadError, Result};

/// Fill value historically used for non-token tensors (scores, rewards).
///
/// Callers whose tensors treat `0.0` as a meaningful value should pass a
/// distinct sentinel to
/// [`example_level_pad_tensor`](TensorHelper::example_level_pad_tensor).
pub const DEFAULT_TENSOR_PAD_VALUE: f64 = 0.0;

impl TensorHelper {
    /// Expand active-only responses and their decoded strings to the full batch.
    ///
    /// Inactive rows are filled with `pad_token_id` and get an empty string.
    ///
    /// # Shapes
    ///
    /// - `responses`: `[n_active, seq]`
    /// - `active_mask`: `[batch]`
    /// - returns: `[batch, seq]` and `batch` strings
    ///
    /// # Panics
    ///
    /// Panics if the number of `true` entries in `active_mask` differs from
    /// the row count of `responses` or from `responses_str.len()`. This is a
    /// caller bug, not a recoverable condition.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Shape`] if `responses` is a scalar,
    /// [`PadError::Config`] if `responses` are `U8` and the pad token exceeds
    /// 255, or [`PadError::Tensor`] on tensor failures.
    pub fn example_level_pad(
        &self,
        responses: &Tensor,
        responses_str: &[String],
        active_mask: &[bool],
    ) -> Result<(Tensor, Vec<String>)> {
        let n_active = count_active(active_mask);
        assert_eq!(
            n_active,
            responses_str.len(),
            "active mask selects {n_active} rows but {} response strings were given",
            responses_str.len()
        );
        self.check_pad_fits(responses.dtype())?;
        let padded = scatter_rows(responses, active_mask, self.pad_value())?;

        let mut active_strs = responses_str.iter();
        let padded_str = active_mask
            .iter()
            .map(|&is_active| {
                if is_active {
                    active_strs.next().cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .collect();

        Ok((padded, padded_str))
    }

    /// Expand an active-only tensor to the full batch, filling inactive rows
    /// with `pad_value`.
    ///
    /// Trailing dimensions are preserved, so per-token scores `[n, seq]` and
    /// per-example scalars `[n]` both work.
    ///
    /// # Shapes
    ///
    /// - `x`: `[n_active, ...]`
    /// - `active_mask`: `[batch]`
    /// - returns: `[batch, ...]`
    ///
    /// # Panics
    ///
    /// Panics if the number of `true` entries in `active_mask` differs from
    /// the row count of `x`.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Shape`] if `x` is a scalar, or
    /// [`PadError::Tensor`] on tensor failures.
    pub fn example_level_pad_tensor(
        &self,
        x: &Tensor,
        active_mask: &[bool],
        pad_value: f64,
    ) -> Result<Tensor> {
        scatter_rows(x, active_mask, pad_value)
    }
}

fn count_active(active_mask: &[bool]) -> usize {
    active_mask.iter().filter(|&&a| a).count()
}

/// Place the rows of `x` at the `true` positions of `active_mask`.
fn scatter_rows(x: &Tensor, active_mask: &[bool], pad_value: f64) -> Result<Tensor> {
    let Some((&n_rows, rest)) = x.dims().split_first() else {
        return Err(PadError::Shape(
            "active-only tensor must have a batch dimension".into(),
        ));
    };
    let n_active = count_active(active_mask);
    assert_eq!(
        n_active, n_rows,
        "active mask selects {n_active} rows but the active-only tensor has {n_rows}"
    );

    let mut row_shape = Vec::with_capacity(x.rank());
    row_shape.push(1);
    row_shape.extend_from_slice(rest);
    let pad_row = filled(pad_value, row_shape, x.dtype(), x.device())?;

    // Source rows 0..n_active are the active ones, row n_active is padding.
    let source = if n_active == 0 {
        pad_row
    } else {
        Tensor::cat(&[x, &pad_row], 0)?
    };
    let pad_index = index_u32(n_active)?;
    let mut next = 0;
    let mut indices = Vec::with_capacity(active_mask.len());
    for &is_active in active_mask {
        if is_active {
            indices.push(index_u32(next)?);
            next += 1;
        } else {
            indices.push(pad_index);
        }
    }
    tracing::debug!(
        batch = active_mask.len(),
        active = n_active,
        "scattering active rows"
    );

    if indices.is_empty() {
        let mut empty_shape = Vec::with_capacity(x.rank());
        empty_shape.push(0);
        empty_shape.extend_from_slice(rest);
        return Ok(Tensor::zeros(empty_shape, x.dtype(), x.device())?);
    }
    let indices = Tensor::from_vec(indices, active_mask.len(), x.device())?;
    Ok(source.index_select(&indices, 0)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
