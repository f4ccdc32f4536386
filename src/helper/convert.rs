// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pad-side conversion and padded concatenation.
//!
//! Conversion is a per-row stable partition: pad positions move to the
//! requested side while real tokens keep their relative order. The
//! permutation is computed on the host because candle's device `arg_sort`
//! makes no stability guarantee, then applied with `gather` on the
//! tensor's own device.

use candle_core::Tensor;

use super::{TensorHelper, batch_dims, index_u32};
use crate::config::PaddingSide;
use crate::error::{PadError, Result};

impl TensorHelper {
    /// Move every row's padding to `side`, returning the reordered ids and
    /// the permutation used.
    ///
    /// `permutation[r][c]` is the source column of `reordered[r][c]`; pass it
    /// to [`apply_permutation`](Self::apply_permutation) to keep companion
    /// tensors (masks, logits, auxiliary ids) aligned token-for-token.
    ///
    /// # Shapes
    ///
    /// - `ids`: `[batch, seq]`
    /// - returns: (`[batch, seq]` same dtype as `ids`, `[batch, seq]` `U32`)
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Shape`] if `ids` is not rank 2, or
    /// [`PadError::Tensor`] if the comparison or gather fails.
    pub fn convert_pad_structure(&self, ids: &Tensor, side: PaddingSide) -> Result<(Tensor, Tensor)> {
        let (batch, seq) = batch_dims(ids, "input ids")?;
        let real: Vec<Vec<u8>> = if ids.elem_count() == 0 {
            vec![Vec::new(); batch]
        } else {
            self.real_token_mask(ids)?.to_vec2::<u8>()?
        };

        let mut flat = Vec::with_capacity(batch * seq);
        for row in &real {
            let mut cols: Vec<usize> = (0..seq).collect();
            // Stable: ties keep their original column order.
            match side {
                PaddingSide::Left => cols.sort_by_key(|&c| row.get(c).copied().unwrap_or(0) != 0),
                PaddingSide::Right => cols.sort_by_key(|&c| row.get(c).copied().unwrap_or(0) == 0),
            }
            for c in cols {
                flat.push(index_u32(c)?);
            }
        }

        let permutation = Tensor::from_vec(flat, (batch, seq), ids.device())?;
        if ids.elem_count() == 0 {
            return Ok((ids.clone(), permutation));
        }
        let reordered = ids.contiguous()?.gather(&permutation, 1)?;
        Ok((reordered, permutation))
    }

    /// Reorder a companion tensor with a permutation returned by
    /// [`convert_pad_structure`](Self::convert_pad_structure).
    ///
    /// # Shapes
    ///
    /// - `tensor`: `[batch, seq]`
    /// - `permutation`: `[batch, seq]`
    /// - returns: `[batch, seq]`
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Shape`] if the two shapes differ, or
    /// [`PadError::Tensor`] if the gather fails.
    pub fn apply_permutation(&self, tensor: &Tensor, permutation: &Tensor) -> Result<Tensor> {
        let dims = batch_dims(tensor, "companion tensor")?;
        let perm_dims = batch_dims(permutation, "permutation")?;
        if dims != perm_dims {
            return Err(PadError::Shape(format!(
                "companion tensor {dims:?} does not match permutation {perm_dims:?}"
            )));
        }
        Ok(tensor.contiguous()?.gather(permutation, 1)?)
    }

    /// Concatenate fragments along the sequence dimension and move all
    /// padding of the result to `side`.
    ///
    /// Fragments must already be row-aligned (same batch size, same
    /// example order). The result is `sum(widths)` columns wide with a
    /// single pad region.
    ///
    /// # Shapes
    ///
    /// - `tensors[i]`: `[batch, seq_i]`
    /// - returns: `[batch, sum(seq_i)]`
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Shape`] if `tensors` is empty or a fragment is
    /// not rank 2, or [`PadError::Tensor`] if the batch sizes differ.
    pub fn concatenate_with_padding(&self, tensors: &[Tensor], side: PaddingSide) -> Result<Tensor> {
        if tensors.is_empty() {
            return Err(PadError::Shape("nothing to concatenate".into()));
        }
        for t in tensors {
            batch_dims(t, "concatenation fragment")?;
        }
        let concatenated = Tensor::cat(tensors, 1)?;
        let (padded, _) = self.convert_pad_structure(&concatenated, side)?;
        tracing::debug!(
            fragments = tensors.len(),
            width = padded.dim(1)?,
            %side,
            "concatenated with padding"
        );
        Ok(padded)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
