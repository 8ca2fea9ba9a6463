//! Validated, immutable estimator parameters and the constants derived
//! from them.
//!
//! Grounded in the teacher crate's `settings.rs`, with the byte-packing
//! moved out to [`crate::metadata`] and three changes to align with the
//! documented storage spec rather than the teacher's own drift from it:
//!   - `log2m`'s upper bound is 30, not 31 (the teacher validates against
//!     the wrong constant; the storage spec is explicit that 30 is the
//!     ceiling since the top bit of the parameters byte's low 5 bits,
//!     combined with its other fields, only leaves room for 30).
//!   - `expthresh` is the spec's promotion-threshold *mode* (`-1` auto,
//!     `0` off, `1..=18` meaning `2^(n-1)`), enforced unconditionally
//!     rather than commented out.
//!   - A dedicated `value_mask` is carried (`(1 << regwidth) - 1`) instead
//!     of reusing `m_bits_mask` for register-value masking: the two masks
//!     mean different things, and the teacher's sparse path only gets away
//!     with conflating them because callers always pass already
//!     range-capped values.

use thiserror::Error;

use crate::bits::bits_to_bytes_round_up;
use crate::constants::{alpha_m_squared, large_estimator_cutoff, small_estimator_cutoff, two_to_l};

pub const MIN_LOG2M: u32 = 4;
pub const MAX_LOG2M: u32 = 30;
pub const MIN_REGWIDTH: u32 = 1;
pub const MAX_REGWIDTH: u32 = 8;
pub const MIN_EXPTHRESH: i32 = -1;
pub const MAX_EXPTHRESH: i32 = 18;
pub const MAX_EXPLICIT_THRESHOLD: u32 = 1u32 << (MAX_EXPTHRESH - 1) as u32;

/// Sentinel `expthresh` value meaning "auto-calculate the explicit
/// threshold from the representation's in-memory size" (recommended over
/// a fixed cutoff).
const AUTO_EXPTHRESH: i32 = -1;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("log2m must be between {MIN_LOG2M} and {MAX_LOG2M} (was {0})")]
    Log2m(u32),
    #[error("regwidth must be between {MIN_REGWIDTH} and {MAX_REGWIDTH} (was {0})")]
    RegWidth(u32),
    #[error("expthresh must be between {MIN_EXPTHRESH} and {MAX_EXPTHRESH} (was {0})")]
    Threshold(i32),
    #[error("log2m and regwidth must match to combine two estimators")]
    MisMatch,
}

/// Named-field alternative to [`Settings::new`]'s positional arguments.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub log2m: u32,
    pub regwidth: u32,
    pub expthresh: i32,
    pub sparse_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log2m: 11,
            regwidth: 5,
            expthresh: -1,
            sparse_enabled: true,
        }
    }
}

/// Validated estimator parameters, plus every constant derived from them
/// that the hot path (`add_raw`/`cardinality`) needs without recomputing.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Settings {
    pub(crate) log2m: u32,
    pub(crate) regwidth: u32,
    pub(crate) expthresh: i32,
    pub(crate) sparse_threshold: Option<i32>,

    pub(crate) value_mask: u64,
    pub(crate) pw_max_mask: u64,
    pub(crate) m_bits_mask: u64,
    pub(crate) alpha_msquared: f64,
    pub(crate) small_estimator_cutoff: f64,
    pub(crate) large_estimator_cutoff: f64,
    pub(crate) two_to_l: f64,
}

impl Settings {
    pub fn new(
        log2m: u32,
        regwidth: u32,
        expthresh: i32,
        sparse_enabled: bool,
    ) -> Result<Self, SettingsError> {
        Self::validate_params(log2m, regwidth, expthresh)?;

        let sparse_threshold = sparse_enabled.then(|| Self::calculate_sparse_threshold(log2m, regwidth));
        let two_to_l = two_to_l(log2m, regwidth);

        Ok(Self {
            log2m,
            regwidth,
            expthresh,
            sparse_threshold,
            value_mask: (1u64 << regwidth) - 1,
            pw_max_mask: Self::pw_max_mask(regwidth),
            m_bits_mask: (1u64 << log2m) - 1,
            alpha_msquared: alpha_m_squared(log2m),
            small_estimator_cutoff: small_estimator_cutoff(1u64 << log2m),
            large_estimator_cutoff: large_estimator_cutoff(two_to_l),
            two_to_l,
        })
    }

    pub fn with_config(config: Config) -> Result<Self, SettingsError> {
        Self::new(config.log2m, config.regwidth, config.expthresh, config.sparse_enabled)
    }

    /// `Settings::new` with `expthresh` pinned to auto (`-1`), the
    /// recommended setting for callers with no reason to fix a literal
    /// explicit-promotion cutoff.
    pub fn auto(log2m: u32, regwidth: u32, sparse_enabled: bool) -> Result<Self, SettingsError> {
        Self::new(log2m, regwidth, AUTO_EXPTHRESH, sparse_enabled)
    }

    fn validate_params(log2m: u32, regwidth: u32, expthresh: i32) -> Result<(), SettingsError> {
        if !(MIN_LOG2M..=MAX_LOG2M).contains(&log2m) {
            return Err(SettingsError::Log2m(log2m));
        }
        if !(MIN_REGWIDTH..=MAX_REGWIDTH).contains(&regwidth) {
            return Err(SettingsError::RegWidth(regwidth));
        }
        if !(MIN_EXPTHRESH..=MAX_EXPTHRESH).contains(&expthresh) {
            return Err(SettingsError::Threshold(expthresh));
        }
        Ok(())
    }

    pub fn settings_check(&self, other: &Self) -> Result<(), SettingsError> {
        if self.log2m == other.log2m && self.regwidth == other.regwidth {
            Ok(())
        } else {
            Err(SettingsError::MisMatch)
        }
    }

    pub fn log2m(&self) -> u32 {
        self.log2m
    }

    pub fn regwidth(&self) -> u32 {
        self.regwidth
    }

    pub fn sparse_enabled(&self) -> bool {
        self.sparse_threshold.is_some()
    }

    pub(crate) fn m(&self) -> u64 {
        1u64 << self.log2m
    }

    /// The cardinality at which Explicit promotes. `0` means Explicit is
    /// disabled entirely.
    pub(crate) fn explicit_threshold(&self) -> u32 {
        match self.expthresh {
            AUTO_EXPTHRESH => Self::calculate_explicit_threshold(self.log2m, self.regwidth),
            0 => 0,
            n => 1u32 << (n - 1),
        }
    }

    /// Size-based auto threshold: the point at which an Explicit set's
    /// in-memory footprint (8 bytes/value) would exceed the Full
    /// representation's footprint, capped at `MAX_EXPLICIT_THRESHOLD`.
    fn calculate_explicit_threshold(log2m: u32, regwidth: u32) -> u32 {
        let m = 1u64 << log2m;
        let full_representation_bits = regwidth as u64 * m;
        let full_representation_bytes = bits_to_bytes_round_up(full_representation_bits);
        let num_longs = full_representation_bytes / 8;

        num_longs.min(MAX_EXPLICIT_THRESHOLD as u64) as u32
    }

    /// The nonzero-register count at which Sparse promotes to Full: the
    /// largest power of two below the point where Sparse's packed
    /// short-words would cost as much as the Full representation.
    fn calculate_sparse_threshold(log2m: u32, regwidth: u32) -> i32 {
        let m = (1u64 << log2m) as f64;
        let short_word_length = (log2m + regwidth) as f64;
        let reg_bits = m * regwidth as f64;

        let largest_pow2_below_cutoff = (reg_bits / short_word_length).log2() as u32;
        1i32 << largest_pow2_below_cutoff
    }

    /// A mask that, OR-ed into a substream value before taking its
    /// least-significant set bit, caps the returned rank so `rank + 1`
    /// never exceeds what `regwidth` bits can hold.
    fn pw_max_mask(regwidth: u32) -> u64 {
        let shift = (((1u64 << regwidth) - 1) - 1) % 64;
        !((1u64 << shift) - 1)
    }
}
