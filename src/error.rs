use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HuffError>;

#[derive(Debug, Error)]
pub enum HuffError {
    /// Nothing to build a tree from.
    #[error("input is empty: no symbols to encode")]
    EmptyInput,

    #[error("malformed code{}: {reason}", for_symbol(.symbol))]
    MalformedCode { symbol: Option<u8>, reason: String },

    /// The bit stream ended while the decoder was between the root and a leaf.
    #[error("bit stream truncated: ended mid-code after {consumed} of {total} bits")]
    TruncatedStream { consumed: usize, total: usize },

    #[error("invalid code table: {0}")]
    InvalidTable(String),

    #[error("code table is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn for_symbol(symbol: &Option<u8>) -> String {
    symbol.map(|s| format!(" for symbol {s}")).unwrap_or_default()
}

impl HuffError {
    pub(crate) fn malformed(symbol: Option<u8>, reason: impl Into<String>) -> Self {
        HuffError::MalformedCode {
            symbol,
            reason: reason.into(),
        }
    }
}
