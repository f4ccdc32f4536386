// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trimming a batch to its effective length.

use candle_core::DType;

use super::{TensorDict, TensorHelper, filled};
use crate::config::PaddingSide;
use crate::error::{PadError, Result};

/// Key of the attention mask inside a [`TensorDict`].
pub const ATTENTION_MASK_KEY: &str = "attention_mask";

impl TensorHelper {
    /// Narrow the tensors named in `keys` to the batch's effective length.
    ///
    /// The effective length is the largest real-token count of any row in
    /// `tensors["attention_mask"]`, so no row loses a real token. With
    /// [`PaddingSide::Left`] the last `effective_len` columns are kept, with
    /// [`PaddingSide::Right`] the first ones. Keys not listed are copied
    /// through unchanged; the input dict is not modified.
    ///
    /// An all-pad (or empty) batch has effective length 0 and produces
    /// zero-width tensors.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::MissingKey`] if the attention mask or a listed
    /// key is absent, [`PadError::Shape`] if a listed tensor is narrower
    /// than the effective length, or [`PadError::Tensor`] on tensor
    /// failures.
    pub fn cut_to_effective_len(
        &self,
        tensors: &TensorDict,
        keys: &[&str],
        side: PaddingSide,
    ) -> Result<TensorDict> {
        let mask = tensors
            .get(ATTENTION_MASK_KEY)
            .ok_or_else(|| PadError::MissingKey(ATTENTION_MASK_KEY.into()))?;
        let effective_len = longest_real_row(mask)?;
        tracing::debug!(effective_len, %side, keys = keys.len(), "cutting to effective length");

        let mut result = tensors.clone();
        for &key in keys {
            let tensor = tensors
                .get(key)
                .ok_or_else(|| PadError::MissingKey(key.into()))?;
            let width = tensor.dim(1)?;
            if width < effective_len {
                return Err(PadError::Shape(format!(
                    "'{key}' has width {width}, narrower than effective length {effective_len}"
                )));
            }
            let start = if side.is_left() { width - effective_len } else { 0 };
            result.insert(key.to_owned(), tensor.narrow(1, start, effective_len)?);
        }
        Ok(result)
    }
}

/// Max over rows of the number of non-zero mask entries.
fn longest_real_row(mask: &candle_core::Tensor) -> Result<usize> {
    if mask.dim(0)? == 0 || mask.dim(1)? == 0 {
        return Ok(0);
    }
    let zeros = filled(0.0, mask.dims(), mask.dtype(), mask.device())?;
    let real = mask.ne(&zeros)?.to_dtype(DType::U32)?;
    let longest = real.sum(1)?.max(0)?.to_scalar::<u32>()?;
    usize::try_from(longest)
        .map_err(|_| PadError::Shape(format!("effective length {longest} overflows usize")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use candle_core::{Device, Tensor};

    use super::*;
    use crate::config::TensorConfig;

    fn helper() -> TensorHelper {
        TensorHelper::new(TensorConfig::new(0))
    }

    fn dict(ids: &Tensor) -> TensorDict {
        let h = helper();
        let (mask, pos) = h.mask_and_positions(ids).unwrap();
        let mut d = TensorDict::new();
        d.insert("input_ids".into(), ids.clone());
        d.insert(ATTENTION_MASK_KEY.into(), mask);
        d.insert("position_ids".into(), pos);
        d
    }

    const ALL_KEYS: [&str; 3] = ["input_ids", "attention_mask", "position_ids"];

    #[test]
    fn cut_left_keeps_rightmost_columns() {
        let ids = Tensor::new(&[[0u32, 0, 0, 1, 2], [0, 0, 3, 4, 5]], &Device::Cpu).unwrap();
        let out = helper()
            .cut_to_effective_len(&dict(&ids), &ALL_KEYS, PaddingSide::Left)
            .unwrap();
        assert_eq!(
            out["input_ids"].to_vec2::<u32>().unwrap(),
            vec![vec![0, 1, 2], vec![3, 4, 5]]
        );
        assert_eq!(
            out["position_ids"].to_vec2::<u32>().unwrap(),
            vec![vec![0, 0, 1], vec![0, 1, 2]]
        );
    }

    #[test]
    fn cut_right_keeps_leftmost_columns() {
        let ids = Tensor::new(&[[1u32, 2, 0, 0], [3, 0, 0, 0]], &Device::Cpu).unwrap();
        let out = helper()
            .cut_to_effective_len(&dict(&ids), &ALL_KEYS, PaddingSide::Right)
            .unwrap();
        assert_eq!(
            out["input_ids"].to_vec2::<u32>().unwrap(),
            vec![vec![1, 2], vec![3, 0]]
        );
        assert_eq!(
            out["attention_mask"].to_vec2::<u32>().unwrap(),
            vec![vec![1, 1], vec![1, 0]]
        );
    }

    #[test]
    fn unlisted_keys_pass_through() {
        let ids = Tensor::new(&[[0u32, 0, 1]], &Device::Cpu).unwrap();
        let input = dict(&ids);
        let out = helper()
            .cut_to_effective_len(&input, &["input_ids"], PaddingSide::Left)
            .unwrap();
        assert_eq!(out["input_ids"].dims(), &[1, 1]);
        assert_eq!(out["position_ids"].dims(), &[1, 3]);
        // Input untouched.
        assert_eq!(input["input_ids"].dims(), &[1, 3]);
    }

    #[test]
    fn all_pad_batch_is_zero_width() {
        let ids = Tensor::new(&[[0u32, 0], [0, 0]], &Device::Cpu).unwrap();
        let out = helper()
            .cut_to_effective_len(&dict(&ids), &ALL_KEYS, PaddingSide::Left)
            .unwrap();
        assert_eq!(out["input_ids"].dims(), &[2, 0]);
        assert_eq!(out["attention_mask"].dims(), &[2, 0]);
    }

    #[test]
    fn missing_keys_error() {
        let ids = Tensor::new(&[[1u32]], &Device::Cpu).unwrap();
        let mut d = dict(&ids);
        assert!(matches!(
            helper().cut_to_effective_len(&d, &["responses"], PaddingSide::Left),
            Err(PadError::MissingKey(k)) if k == "responses"
        ));
        d.remove(ATTENTION_MASK_KEY);
        assert!(matches!(
            helper().cut_to_effective_len(&d, &["input_ids"], PaddingSide::Left),
            Err(PadError::MissingKey(_))
        ));
    }

    #[test]
    fn narrow_companion_errors() {
        let ids = Tensor::new(&[[1u32, 2, 3]], &Device::Cpu).unwrap();
        let mut d = dict(&ids);
        d.insert("short".into(), Tensor::new(&[[1u32]], &Device::Cpu).unwrap());
        assert!(matches!(
            helper().cut_to_effective_len(&d, &["short"], PaddingSide::Left),
            Err(PadError::Shape(_))
        ));
    }
}
