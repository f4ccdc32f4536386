// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attention masks and position ids derived from padded token ids.

use candle_core::{DType, Tensor};

use super::{TensorHelper, batch_dims, filled, index_u32};
use crate::error::Result;

impl TensorHelper {
    /// Attention mask for a padded batch: 1 where `ids != pad_token_id`, else 0.
    ///
    /// The mask has the same dtype as `ids`, so it can be gathered with the
    /// same permutation and concatenated alongside them.
    ///
    /// # Shapes
    ///
    /// - `ids`: `[batch, seq]`
    /// - returns: `[batch, seq]`
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Shape`](crate::PadError::Shape) if `ids` is not
    /// rank 2, [`PadError::Config`](crate::PadError::Config) if `ids` are
    /// `U8` and the pad token exceeds 255, or
    /// [`PadError::Tensor`](crate::PadError::Tensor) if the comparison fails.
    pub fn create_attention_mask(&self, ids: &Tensor) -> Result<Tensor> {
        batch_dims(ids, "input ids")?;
        if ids.elem_count() == 0 {
            return Ok(ids.clone());
        }
        Ok(self.real_token_mask(ids)?.to_dtype(ids.dtype())?)
    }

    /// Position ids from an attention mask: the running count of real
    /// tokens minus one, forced to 0 on pad columns.
    ///
    /// The first real token of every row gets position 0 regardless of how
    /// much padding precedes it. Counted in one left-to-right pass per row
    /// on the host, linear in `seq`.
    ///
    /// # Shapes
    ///
    /// - `attention_mask`: `[batch, seq]`
    /// - returns: `[batch, seq]`, same dtype as the mask, except `U8` masks
    ///   which yield `U32` positions
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Shape`](crate::PadError::Shape) if the mask is
    /// not rank 2 or wider than `u32::MAX`, or
    /// [`PadError::Tensor`](crate::PadError::Tensor) on tensor failures.
    pub fn create_position_ids(&self, attention_mask: &Tensor) -> Result<Tensor> {
        let (batch, seq) = batch_dims(attention_mask, "attention mask")?;
        let dtype = position_dtype(attention_mask.dtype());
        if attention_mask.elem_count() == 0 {
            return Ok(Tensor::zeros((batch, seq), dtype, attention_mask.device())?);
        }
        index_u32(seq)?;

        let zeros = filled(
            0.0,
            attention_mask.dims(),
            attention_mask.dtype(),
            attention_mask.device(),
        )?;
        let real = attention_mask.ne(&zeros)?.to_vec2::<u8>()?;
        let mut flat = Vec::with_capacity(batch * seq);
        for row in &real {
            let mut seen = 0u32;
            for &m in row {
                if m == 0 {
                    flat.push(0);
                } else {
                    flat.push(seen);
                    seen += 1;
                }
            }
        }
        let positions = Tensor::from_vec(flat, (batch, seq), attention_mask.device())?;
        Ok(positions.to_dtype(dtype)?)
    }

    /// Attention mask and position ids for `ids` in one call.
    ///
    /// # Errors
    ///
    /// See [`create_attention_mask`](Self::create_attention_mask) and
    /// [`create_position_ids`](Self::create_position_ids).
    pub fn mask_and_positions(&self, ids: &Tensor) -> Result<(Tensor, Tensor)> {
        let mask = self.create_attention_mask(ids)?;
        let positions = self.create_position_ids(&mask)?;
        Ok((mask, positions))
    }

    /// `U8` tensor with 1 at real tokens, 0 at pad tokens.
    pub(super) fn real_token_mask(&self, ids: &Tensor) -> Result<Tensor> {
        self.check_pad_fits(ids.dtype())?;
        let pad = filled(self.pad_value(), ids.dims(), ids.dtype(), ids.device())?;
        Ok(ids.ne(&pad)?)
    }
}

/// Dtype positions are returned in: `U8` cannot count past 255.
fn position_dtype(mask_dtype: DType) -> DType {
    if mask_dtype == DType::U8 { DType::U32 } else { mask_dtype }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
