//! Error types for charge decoding and the JSON entry points.

use thiserror::Error;

/// Errors that can occur while decoding a charge.
///
/// Encoding never fails: values without a textual form resolve to an absent
/// result instead. Unmatched closing parentheses are not errors either, they
/// only make the decoder stop early (see [`Parsed::end`](crate::Parsed::end)).
#[derive(Error, Debug)]
pub enum ChargeError {
    /// A token with a numeric prefix that is not a valid number.
    #[error("malformed number at offset {offset}: {token:?}")]
    MalformedNumber { offset: usize, token: String },

    /// A `0n`-prefixed token with non-decimal digits.
    #[error("malformed bigint at offset {offset}: {token:?}")]
    MalformedBigInt { offset: usize, token: String },

    /// Percent-decoding produced bytes that are not valid UTF-8.
    #[error("invalid percent-encoded text at offset {offset}: {token:?}")]
    InvalidEncoding { offset: usize, token: String },

    /// Input nested deeper than the parser allows.
    #[error("charge nested deeper than {max_depth} levels at offset {offset}")]
    TooDeep { offset: usize, max_depth: usize },

    /// An extension handler rejected its input.
    #[error("extension {name:?} failed at offset {offset}: {message}")]
    Extension {
        name: String,
        offset: usize,
        message: String,
    },

    /// The input of a JSON entry point was not valid JSON, or the output
    /// could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout churi-core.
pub type Result<T> = std::result::Result<T, ChargeError>;
