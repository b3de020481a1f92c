//! Errors for the ZTAuth* core data model (`Oid` parsing, header decoding).

use thiserror::Error;

/// Errors raised while constructing or validating core data-model values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An OID string was not 64 lowercase hex characters.
    #[error("invalid OID: expected 64 hex chars, got {len} ({input:?})")]
    InvalidOid {
        /// Length of the offending input.
        len: usize,
        /// The offending input, truncated for display.
        input: String,
    },

    /// A `codeTypeID` value did not match any known object kind
    /// (`spec.md` §4.1: "An unknown `codeTypeID` is a fatal decode error
    /// reported as corruption").
    #[error("unknown codeTypeID: {0}")]
    UnknownCodeTypeId(u16),
}
