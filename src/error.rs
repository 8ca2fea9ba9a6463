//! The crate's public error type.
//!
//! Grounded in the teacher crate's `HllError`, split so that decoding
//! failures (bad schema version, bad representation tag, truncated/corrupt
//! word data) carry their own variants via [`crate::words::CodecError`]
//! instead of being conflated into the teacher's single `Version(u8)` case,
//! which fires for both "I don't understand this schema version" and "I
//! don't understand this representation tag".

use thiserror::Error;

use crate::settings::SettingsError;
use crate::words::CodecError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HllError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("buffer too short to hold a storage header ({0} bytes, need at least 3)")]
    TruncatedHeader(usize),
}
