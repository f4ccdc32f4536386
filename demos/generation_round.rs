// SPDX-License-Identifier: MIT OR Apache-2.0

//! One round of a multi-turn generation loop, printed step by step.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example generation_round
//! ```
//!
//! **What it does:**
//!
//! 1. Initialises a tracing subscriber (prints structured logs to stderr).
//! 2. Scatters responses generated for the active examples back into the
//!    full batch.
//! 3. Appends them to the left-padded prompts, derives mask and positions,
//!    and trims the rolling context to its effective length.

use candle_core::{Device, Tensor};
use candle_padkit::{ATTENTION_MASK_KEY, PaddingSide, TensorConfig, TensorDict, TensorHelper};

fn main() -> candle_padkit::Result<()> {
    // 1. Initialise tracing subscriber so debug events are visible.
    tracing_subscriber::fmt::init();

    let device = Device::Cpu;
    let helper = TensorHelper::new(TensorConfig::new(0).with_max_prompt_length(16));

    // 2. Example 1 already finished; 0 and 2 produced ragged responses.
    let prompts = Tensor::new(&[[0u32, 0, 11, 12], [0, 21, 22, 23], [31, 32, 33, 34]], &device)?;
    let active = [true, false, true];
    let spans = [
        Tensor::new(&[101u32, 102, 103], &device)?,
        Tensor::new(&[301u32], &device)?,
    ];
    let active_responses = helper.pad_and_stack(&spans, PaddingSide::Right, None)?;
    let texts = ["first answer".to_owned(), "third answer".to_owned()];
    let (responses, response_strs) = helper.example_level_pad(&active_responses, &texts, &active)?;
    println!("responses:\n{responses}");
    println!("response strings: {response_strs:?}");

    // 3. Rolling context: prompt + responses, left-padded, then trimmed.
    let context = helper.concatenate_with_padding(&[prompts, responses], PaddingSide::Left)?;
    let (mask, positions) = helper.mask_and_positions(&context)?;

    let mut tensors = TensorDict::new();
    tensors.insert("input_ids".to_owned(), context);
    tensors.insert(ATTENTION_MASK_KEY.to_owned(), mask);
    tensors.insert("position_ids".to_owned(), positions);
    let keys = ["input_ids", ATTENTION_MASK_KEY, "position_ids"];
    let trimmed = helper.cut_to_effective_len(&tensors, &keys, PaddingSide::Left)?;

    for key in keys {
        if let Some(t) = trimmed.get(key) {
            println!("{key}:\n{t}");
        }
    }
    Ok(())
}
