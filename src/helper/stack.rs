// SPDX-License-Identifier: MIT OR Apache-2.0

//! Padding ragged 1-D sequences into one rectangular batch.

use candle_core::Tensor;

use super::{TensorHelper, filled};
use crate::config::PaddingSide;
use crate::error::{PadError, Result};

impl TensorHelper {
    /// Pad each sequence to the longest one and stack them into a batch.
    ///
    /// Sequences are padded on `side` with `pad_value` (the configured
    /// `pad_token_id` when `None`). Row order follows input order and no
    /// sequence is ever truncated.
    ///
    /// # Shapes
    ///
    /// - `sequences[i]`: `[len_i]`
    /// - returns: `[n, max(len_i)]`
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Shape`] if `sequences` is empty or an element is
    /// not rank 1, [`PadError::Config`] if the default pad token does not
    /// fit `U8` sequences, or [`PadError::Tensor`] if dtypes or devices
    /// differ.
    pub fn pad_and_stack(
        &self,
        sequences: &[Tensor],
        side: PaddingSide,
        pad_value: Option<f64>,
    ) -> Result<Tensor> {
        let lengths = sequences
            .iter()
            .map(|t| {
                t.dims1().map_err(|_| {
                    PadError::Shape(format!("expected a 1-D sequence, got shape {:?}", t.dims()))
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        let max_length = lengths
            .iter()
            .copied()
            .max()
            .ok_or_else(|| PadError::Shape("no sequences to stack".into()))?;
        let pad_value = match pad_value {
            Some(v) => v,
            None => {
                for seq in sequences {
                    self.check_pad_fits(seq.dtype())?;
                }
                self.pad_value()
            }
        };

        let mut padded = Vec::with_capacity(sequences.len());
        for (seq, len) in sequences.iter().zip(lengths) {
            let pad_len = max_length - len;
            if pad_len == 0 {
                padded.push(seq.clone());
                continue;
            }
            let padding = filled(pad_value, pad_len, seq.dtype(), seq.device())?;
            if len == 0 {
                padded.push(padding);
                continue;
            }
            let row = match side {
                PaddingSide::Left => Tensor::cat(&[&padding, seq], 0)?,
                PaddingSide::Right => Tensor::cat(&[seq, &padding], 0)?,
            };
            padded.push(row);
        }
        tracing::trace!(rows = padded.len(), max_length, %side, "stacking padded sequences");

        Ok(Tensor::stack(&padded, 0)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use candle_core::{DType, Device};

    use super::*;
    use crate::config::TensorConfig;

    fn helper() -> TensorHelper {
        TensorHelper::new(TensorConfig::new(7))
    }

    fn ragged() -> Vec<Tensor> {
        vec![
            Tensor::new(&[1u32, 2, 3], &Device::Cpu).unwrap(),
            Tensor::new(&[4u32, 5], &Device::Cpu).unwrap(),
        ]
    }

    #[test]
    fn pad_right_with_value() {
        let out = helper()
            .pad_and_stack(&ragged(), PaddingSide::Right, Some(0.0))
            .unwrap();
        assert_eq!(
            out.to_vec2::<u32>().unwrap(),
            vec![vec![1, 2, 3], vec![4, 5, 0]]
        );
    }

    #[test]
    fn pad_left_with_value() {
        let out = helper()
            .pad_and_stack(&ragged(), PaddingSide::Left, Some(0.0))
            .unwrap();
        assert_eq!(
            out.to_vec2::<u32>().unwrap(),
            vec![vec![1, 2, 3], vec![0, 4, 5]]
        );
    }

    #[test]
    fn defaults_to_pad_token() {
        let out = helper()
            .pad_and_stack(&ragged(), PaddingSide::Left, None)
            .unwrap();
        assert_eq!(
            out.to_vec2::<u32>().unwrap(),
            vec![vec![1, 2, 3], vec![7, 4, 5]]
        );
    }

    #[test]
    fn float_sequences_and_empty_rows() {
        let seqs = vec![
            Tensor::zeros(0, DType::F32, &Device::Cpu).unwrap(),
            Tensor::new(&[0.5f32, 1.5], &Device::Cpu).unwrap(),
        ];
        let out = helper()
            .pad_and_stack(&seqs, PaddingSide::Right, Some(-1.0))
            .unwrap();
        assert_eq!(
            out.to_vec2::<f32>().unwrap(),
            vec![vec![-1.0, -1.0], vec![0.5, 1.5]]
        );
    }

    #[test]
    fn u8_sequences_reject_wide_default_pad() {
        let h = TensorHelper::new(TensorConfig::new(256));
        let seqs = vec![
            Tensor::new(&[1u8, 2], &Device::Cpu).unwrap(),
            Tensor::new(&[3u8], &Device::Cpu).unwrap(),
        ];
        assert!(matches!(
            h.pad_and_stack(&seqs, PaddingSide::Right, None),
            Err(PadError::Config(_))
        ));
        let out = h.pad_and_stack(&seqs, PaddingSide::Right, Some(0.0)).unwrap();
        assert_eq!(out.to_vec2::<u8>().unwrap(), vec![vec![1, 2], vec![3, 0]]);
    }

    #[test]
    fn invalid_inputs_error() {
        assert!(matches!(
            helper().pad_and_stack(&[], PaddingSide::Left, None),
            Err(PadError::Shape(_))
        ));
        let matrix = Tensor::new(&[[1u32, 2]], &Device::Cpu).unwrap();
        assert!(matches!(
            helper().pad_and_stack(&[matrix], PaddingSide::Left, None),
            Err(PadError::Shape(_))
        ));
    }
}
