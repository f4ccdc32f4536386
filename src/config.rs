// SPDX-License-Identifier: MIT OR Apache-2.0

//! Padding configuration and JSON parsing.
//!
//! [`TensorConfig`] holds the pad token id shared by every tensor the
//! [`TensorHelper`](crate::TensorHelper) touches, plus three length bounds
//! that the surrounding generation loop uses when budgeting its context.
//! The bounds are carried for callers only; nothing in this crate enforces
//! them.
//!
//! # Usage
//!
//! ```
//! use candle_padkit::TensorConfig;
//!
//! let config_str = r#"{"pad_token_id": 151643, "max_prompt_length": 4096,
//!     "max_obs_length": 500, "max_start_length": 2048}"#;
//! let json: serde_json::Value = serde_json::from_str(config_str).unwrap();
//! let config = TensorConfig::from_json(&json).unwrap();
//! assert_eq!(config.pad_token_id, 151_643);
//! assert_eq!(config.max_obs_length, 500);
//! ```

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{PadError, Result};

// ---------------------------------------------------------------------------
// PaddingSide
// ---------------------------------------------------------------------------

/// Side of a row on which pad tokens are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaddingSide {
    /// Pad tokens precede the real tokens (`[pad, pad, a, b]`).
    Left,
    /// Pad tokens follow the real tokens (`[a, b, pad, pad]`).
    Right,
}

impl PaddingSide {
    /// `Left` when `pad_to_left` is true, `Right` otherwise.
    pub const fn from_pad_to_left(pad_to_left: bool) -> Self {
        if pad_to_left { Self::Left } else { Self::Right }
    }

    /// Whether this is [`PaddingSide::Left`].
    pub const fn is_left(self) -> bool {
        matches!(self, Self::Left)
    }
}

impl fmt::Display for PaddingSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Parse `"left"` / `"right"` (case-insensitive).
impl FromStr for PaddingSide {
    type Err = PadError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(PadError::Config(format!(
                "unknown padding side '{other}' (expected 'left' or 'right')"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// TensorConfig
// ---------------------------------------------------------------------------

/// Immutable padding configuration shared by one generation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorConfig {
    /// Token id used to fill unused positions of every batch.
    pub pad_token_id: u32,
    /// Upper bound on the prompt width the caller keeps in its rolling context.
    pub max_prompt_length: usize,
    /// Upper bound on the width of one observation fragment.
    pub max_obs_length: usize,
    /// Upper bound on the width of the initial prompt.
    pub max_start_length: usize,
}

impl TensorConfig {
    /// Create a config with the given pad token and all bounds set to 0.
    pub const fn new(pad_token_id: u32) -> Self {
        Self {
            pad_token_id,
            max_prompt_length: 0,
            max_obs_length: 0,
            max_start_length: 0,
        }
    }

    /// Set `max_prompt_length`.
    #[must_use]
    pub const fn with_max_prompt_length(mut self, len: usize) -> Self {
        self.max_prompt_length = len;
        self
    }

    /// Set `max_obs_length`.
    #[must_use]
    pub const fn with_max_obs_length(mut self, len: usize) -> Self {
        self.max_obs_length = len;
        self
    }

    /// Set `max_start_length`.
    #[must_use]
    pub const fn with_max_start_length(mut self, len: usize) -> Self {
        self.max_start_length = len;
        self
    }

    /// Parse a config from a JSON object.
    ///
    /// `pad_token_id` is required. Tokenizer configs exported from
    /// `HuggingFace` often leave it `null`; in that case `eos_token_id` is
    /// used instead (the first entry when it is a list). The three length
    /// bounds are optional and default to 0.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Config`] if neither `pad_token_id` nor
    /// `eos_token_id` holds a valid `u32`, or a length bound is not a
    /// non-negative integer.
    pub fn from_json(config: &Value) -> Result<Self> {
        let pad_token_id = match get_optional_u32(config, "pad_token_id")? {
            Some(id) => id,
            None => eos_fallback(config)?,
        };

        Ok(Self {
            pad_token_id,
            max_prompt_length: get_usize_or(config, "max_prompt_length", 0)?,
            max_obs_length: get_usize_or(config, "max_obs_length", 0)?,
            max_start_length: get_usize_or(config, "max_start_length", 0)?,
        })
    }
}

// ---------------------------------------------------------------------------
// JSON extraction helpers
// ---------------------------------------------------------------------------

/// Extract an optional `u32` field; `null` and absent both yield `None`.
fn get_optional_u32(config: &Value, key: &str) -> Result<Option<u32>> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => value_to_u32(v, key).map(Some),
    }
}

/// Convert a JSON number into a `u32` token id.
fn value_to_u32(v: &Value, key: &str) -> Result<u32> {
    let val = v
        .as_u64()
        .ok_or_else(|| PadError::Config(format!("field '{key}' is not a token id: {v}")))?;
    u32::try_from(val)
        .map_err(|_| PadError::Config(format!("field '{key}' value {val} overflows u32")))
}

/// `eos_token_id` as a pad token, accepting a scalar or a non-empty list.
fn eos_fallback(config: &Value) -> Result<u32> {
    match config.get("eos_token_id") {
        Some(Value::Array(ids)) => ids
            .first()
            .ok_or_else(|| PadError::Config("'eos_token_id' is an empty list".into()))
            .and_then(|v| value_to_u32(v, "eos_token_id")),
        Some(v) if !v.is_null() => value_to_u32(v, "eos_token_id"),
        _ => Err(PadError::Config(
            "missing 'pad_token_id' and no 'eos_token_id' to fall back on".into(),
        )),
    }
}

/// Extract an optional `usize` field, returning a default if absent.
fn get_usize_or(config: &Value, key: &str, default: usize) -> Result<usize> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => {
            let val = v
                .as_u64()
                .ok_or_else(|| PadError::Config(format!("field '{key}' is not a length: {v}")))?;
            usize::try_from(val)
                .map_err(|_| PadError::Config(format!("field '{key}' value {val} overflows usize")))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let json = serde_json::json!({
            "pad_token_id": 0,
            "max_prompt_length": 4096,
            "max_obs_length": 500,
            "max_start_length": 2048,
        });
        let config = TensorConfig::from_json(&json).unwrap();
        assert_eq!(
            config,
            TensorConfig::new(0)
                .with_max_prompt_length(4096)
                .with_max_obs_length(500)
                .with_max_start_length(2048)
        );
    }

    #[test]
    fn bounds_default_to_zero() {
        let json = serde_json::json!({ "pad_token_id": 7 });
        let config = TensorConfig::from_json(&json).unwrap();
        assert_eq!(config, TensorConfig::new(7));
    }

    #[test]
    fn null_pad_falls_back_to_eos() {
        let json = serde_json::json!({ "pad_token_id": null, "eos_token_id": 2 });
        assert_eq!(TensorConfig::from_json(&json).unwrap().pad_token_id, 2);

        let json = serde_json::json!({ "eos_token_id": [128_001, 128_009] });
        assert_eq!(TensorConfig::from_json(&json).unwrap().pad_token_id, 128_001);
    }

    #[test]
    fn missing_pad_and_eos_errors() {
        let json = serde_json::json!({ "max_prompt_length": 10 });
        assert!(matches!(
            TensorConfig::from_json(&json),
            Err(PadError::Config(_))
        ));
    }

    #[test]
    fn invalid_values_error() {
        let negative = serde_json::json!({ "pad_token_id": -1 });
        assert!(TensorConfig::from_json(&negative).is_err());

        let too_big = serde_json::json!({ "pad_token_id": 5_000_000_000_u64 });
        assert!(TensorConfig::from_json(&too_big).is_err());

        let bad_len = serde_json::json!({ "pad_token_id": 0, "max_obs_length": "long" });
        assert!(TensorConfig::from_json(&bad_len).is_err());

        let empty_eos = serde_json::json!({ "eos_token_id": [] });
        assert!(TensorConfig::from_json(&empty_eos).is_err());
    }

    #[test]
    fn padding_side_string_roundtrip() {
        for side in [PaddingSide::Left, PaddingSide::Right] {
            let parsed: PaddingSide = side.to_string().parse().unwrap();
            assert_eq!(parsed, side);
        }
        assert_eq!("LEFT".parse::<PaddingSide>().unwrap(), PaddingSide::Left);
        assert!("middle".parse::<PaddingSide>().is_err());
    }

    #[test]
    fn padding_side_from_bool() {
        assert_eq!(PaddingSide::from_pad_to_left(true), PaddingSide::Left);
        assert_eq!(PaddingSide::from_pad_to_left(false), PaddingSide::Right);
        assert!(PaddingSide::Left.is_left());
        assert!(!PaddingSide::Right.is_left());
    }
}
