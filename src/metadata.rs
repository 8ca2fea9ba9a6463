//! The HLL metadata frame: the three-byte header every serialized estimator
//! begins with (schema version, representation tag, register width, log2m,
//! sparse-enabled flag, explicit-cutoff mode).
//!
//! Grounded in the Python reference's `HLLMetadata`/`SchemaVersionOne`
//! (`python_hll/serialization.py`), reorganized out of the teacher crate's
//! inline byte-packing in `lib.rs`/`settings.rs` into one place that owns
//! the frame layout end to end.

use crate::words::CodecError;

pub(crate) const SCHEMA_VERSION: u8 = 1;
pub(crate) const HEADER_BYTE_COUNT: usize = 3;

/// Sentinel stored in the low 6 bits of byte 2 when Explicit is disabled.
const EXPLICIT_OFF: u8 = 0;
/// Sentinel stored in the low 6 bits of byte 2 when the explicit threshold
/// is auto-computed rather than a fixed power of two.
const EXPLICIT_AUTO: u8 = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RepresentationTag {
    Empty = 1,
    Explicit = 2,
    Sparse = 3,
    Full = 4,
}

impl RepresentationTag {
    pub(crate) fn from_ordinal(ordinal: u8) -> Result<Self, CodecError> {
        match ordinal {
            1 => Ok(Self::Empty),
            2 => Ok(Self::Explicit),
            3 => Ok(Self::Sparse),
            4 => Ok(Self::Full),
            other => Err(CodecError::InvalidTypeOrdinal(other)),
        }
    }
}

/// Byte 0: schema version (high nibble) | representation tag (low nibble).
pub(crate) fn pack_version_byte(tag: RepresentationTag) -> u8 {
    (SCHEMA_VERSION << 4) | (tag as u8)
}

pub(crate) fn unpack_version_byte(b: u8) -> Result<(u8, RepresentationTag), CodecError> {
    let version = b >> 4;
    let tag = RepresentationTag::from_ordinal(b & 0x0F)?;
    Ok((version, tag))
}

/// Byte 1: `regwidth - 1` (high 3 bits) | `log2m` (low 5 bits).
pub(crate) fn pack_parameters_byte(regwidth: u32, log2m: u32) -> u8 {
    (((regwidth - 1) << 5) | log2m) as u8
}

pub(crate) fn unpack_parameters_byte(b: u8) -> (u32, u32) {
    let regwidth = (b >> 5) as u32 + 1;
    let log2m = (b & 0x1F) as u32;
    (regwidth, log2m)
}

/// Byte 2: bit 7 padding (always 0) | bit 6 sparse-enabled | low 6 bits
/// explicit-cutoff field (0 = off, 63 = auto, n in 1..=31 => expthresh mode
/// `n`, i.e. a cutoff of `2^(n-1)`). This field is the `expthresh`
/// constructor parameter itself, not the cutoff it expands to — the two
/// coincide numerically (mode `n` <-> field value `n`), so no log2 step is
/// needed going either direction.
pub(crate) fn pack_cutoff_byte(expthresh: i32, sparse_enabled: bool) -> u8 {
    let cutoff_field = if expthresh == -1 {
        EXPLICIT_AUTO
    } else if expthresh == 0 {
        EXPLICIT_OFF
    } else {
        expthresh as u8
    };

    let sparse_bit = if sparse_enabled { 1 << 6 } else { 0 };
    sparse_bit | cutoff_field
}

/// Returns `(sparse_enabled, expthresh)` where `expthresh` is `-1` for
/// auto, `0` for disabled, or the explicit-cutoff mode `1..=31` otherwise.
pub(crate) fn unpack_cutoff_byte(b: u8) -> (bool, i32) {
    let sparse_enabled = (b >> 6) & 1 == 1;
    let cutoff_field = b & 0x3F;

    let expthresh = if cutoff_field == EXPLICIT_OFF {
        0
    } else if cutoff_field == EXPLICIT_AUTO {
        -1
    } else {
        cutoff_field as i32
    };

    (sparse_enabled, expthresh)
}
