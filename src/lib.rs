//! A HyperLogLog cardinality estimator wire-compatible with the storage v1
//! schema shared by the PostgreSQL, Java and JavaScript implementations.
//!
//! The estimator is a single [`Hll`] value that moves through four
//! representations as more values are added — `Empty`, `Explicit`,
//! `Sparse`, `Full` — promoting automatically and never regressing except
//! through [`Hll::clear`]. See [`Settings`] for the parameters that control
//! when each promotion happens.

use explicit::ExplicitStorage;
use full::FullRegisters;
use sparse::SparseRegisters;
use words::CodecError;

mod bits;
mod constants;
mod error;
mod explicit;
mod full;
mod metadata;
mod registers;
mod settings;
mod sparse;
mod words;

pub use error::HllError;
pub use settings::{
    Config, Settings, SettingsError, MAX_EXPLICIT_THRESHOLD, MAX_EXPTHRESH, MAX_LOG2M,
    MAX_REGWIDTH, MIN_EXPTHRESH, MIN_LOG2M, MIN_REGWIDTH,
};
pub use words::CodecError as WordCodecError;

/// Add-on interface implemented by the probabilistic (register-backed)
/// representations: Sparse and Full.
trait Registers {
    fn log2m(&self) -> u32;
    fn pw_max_mask(&self) -> u64;
    fn m_bits_mask(&self) -> u64;

    /// Sets the register at `reg_num` to `value` iff `value` is greater
    /// than the register's current value.
    fn set_if_greater(&mut self, reg_num: u32, value: u8);

    /// Computes the "indicator function" (`Z` in the HLL paper) along with
    /// the number of registers whose value is zero (`V` in the paper). Both
    /// feed the cardinality estimator's correction formulas.
    fn indicator(&self) -> (f64, u32);

    /// Derives the register index and rank from a raw hash value and
    /// applies them via [`Registers::set_if_greater`].
    fn set(&mut self, value: u64) {
        // p(w): position of the least significant set bit (one-indexed).
        // By contract p(w) <= 2^regwidth - 1 (the max register value).
        //
        // By construction of pw_max_mask, lsb(pw_max_mask) = 2^regwidth - 2,
        // so lsb(any_long | pw_max_mask) <= 2^regwidth - 2, so
        // 1 + lsb(any_long | pw_max_mask) <= 2^regwidth - 1.
        let substream_value = value >> self.log2m();
        if substream_value == 0 {
            // p(0x0) is undefined in the paper; 0 is the registers' initial
            // value, so ignoring it here is equivalent to never having set
            // it. The probability of this is 1/(2^(2^regwidth)).
            return;
        }

        let p_w = (1 + (substream_value | self.pw_max_mask()).trailing_zeros()) as u8;
        let i = value & self.m_bits_mask();

        // safe: m_bits_mask is one bit narrower than log2m's range, which
        // tops out at 30, so i always fits in a u32.
        self.set_if_greater(i as u32, p_w);
    }
}

/// The storage backing a single representation's bytes.
pub trait Storage {
    fn bytes_size(&self) -> usize;
    fn to_bytes(&self, buf: &mut [u8]);
    fn from_bytes(settings: &Settings, buf: &[u8]) -> Self;
    fn clear(&mut self);
}

/// A HyperLogLog estimator. Each variant is a distinct representation;
/// `add_raw`/`union` promote through them as needed.
#[derive(Clone, Debug, PartialEq)]
pub enum Hll {
    Empty(Settings),
    Explicit(ExplicitStorage),
    Sparse(SparseRegisters),
    Full(FullRegisters),
}

impl Hll {
    pub fn new(settings: Settings) -> Self {
        Hll::Empty(settings)
    }

    pub fn with_config(config: Config) -> Result<Self, SettingsError> {
        Ok(Hll::new(Settings::with_config(config)?))
    }

    /// `union(true, other)` under another name, for callers who always want
    /// the strict check and find the bare boolean easy to misread at the
    /// call site.
    pub fn union_checked(&mut self, other: &Self) -> Result<(), HllError> {
        self.union(true, other)
    }

    /// Folds one already-hashed 64-bit value into the estimator, promoting
    /// the representation first if needed. `value == 0` is a legitimate
    /// distinct input (an Explicit set still records it); only the
    /// probabilistic representations treat a zero substream as a no-op,
    /// inside [`Registers::set`].
    pub fn add_raw(&mut self, value: u64) {
        if let Hll::Empty(settings) = self {
            if settings.explicit_threshold() > 0 {
                log::trace!("empty -> explicit");
                *self = Hll::Explicit(ExplicitStorage::with_settings(settings));
            } else if settings.sparse_threshold.is_some() {
                log::trace!("empty -> sparse");
                *self = Hll::Sparse(SparseRegisters::with_settings(settings));
            } else {
                log::trace!("empty -> full");
                *self = Hll::Full(FullRegisters::with_settings(settings));
            }
        }

        match self {
            Hll::Explicit(explicit_registers) => {
                explicit_registers.set(value);
                if explicit_registers.is_full() {
                    log::debug!(
                        "explicit set exceeded threshold of {} entries, promoting",
                        explicit_registers.settings.explicit_threshold()
                    );
                    *self = explicit_registers.as_registers();
                }
            }
            Hll::Sparse(sparse_registers) => {
                sparse_registers.set(value);

                if sparse_registers.is_full() {
                    log::debug!("sparse registers exceeded threshold, promoting to full");
                    *self = Hll::Full(sparse_registers.to_full(None));
                }
            }
            Hll::Full(full_registers) => {
                full_registers.set(value);
            }
            Hll::Empty(_) => unreachable!("promoted out of Empty above"),
        }
    }

    /// Merges `other` into `self` in place. If `strict`, mismatched
    /// `(log2m, regwidth)` settings are rejected rather than silently
    /// producing a meaningless estimate.
    pub fn union(&mut self, strict: bool, other: &Self) -> Result<(), HllError> {
        if strict {
            self.settings_check(other)?;
        }

        match self {
            Hll::Empty(settings) => {
                *self = match &other {
                    Hll::Explicit(explicit_storage) => {
                        if explicit_storage.len() as u32 > settings.explicit_threshold() {
                            let mut promoted = if settings.sparse_enabled() {
                                Hll::Sparse(SparseRegisters::with_settings(settings))
                            } else {
                                Hll::Full(FullRegisters::with_settings(settings))
                            };
                            for value in explicit_storage.iter() {
                                promoted.add_raw(value);
                            }
                            promoted
                        } else {
                            Hll::Explicit(explicit_storage.clone())
                        }
                    }
                    Hll::Sparse(sparse_registers) => match settings.sparse_threshold {
                        Some(sparse_threshold) => {
                            if sparse_threshold < sparse_registers.len() as i32 {
                                Hll::Full(sparse_registers.to_full(Some(settings)))
                            } else {
                                Hll::Sparse(sparse_registers.clone())
                            }
                        }
                        None => Hll::Full(sparse_registers.to_full(Some(settings))),
                    },
                    _ => other.clone(),
                };
            }
            Hll::Explicit(lhs) => match other {
                Hll::Empty(_settings) => {}
                Hll::Explicit(rhs) => {
                    lhs.union_explicit(rhs);
                }
                Hll::Sparse(_sparse_registers) => {
                    let mut new_storage = lhs.as_registers();
                    new_storage.union(strict, other)?;
                    *self = new_storage;
                }
                Hll::Full(_full_registers) => {
                    let mut new_storage = lhs.as_registers();
                    new_storage.union(strict, other)?;
                    *self = new_storage;
                }
            },
            Hll::Sparse(sparse_registers) => match other {
                Hll::Empty(_settings) => {}
                Hll::Explicit(explicit_storage) => {
                    sparse_registers.union_explicit(explicit_storage);
                }
                Hll::Sparse(rhs_sparse_registers) => {
                    sparse_registers.union_sparse(rhs_sparse_registers);
                }
                Hll::Full(full_registers) => {
                    let mut new_storage = sparse_registers.to_full(None);
                    new_storage.union_dense(full_registers);
                    *self = Hll::Full(new_storage);
                }
            },
            Hll::Full(full_registers) => match other {
                Hll::Empty(_settings) => {}
                Hll::Explicit(explicit_storage) => {
                    full_registers.union_explicit(explicit_storage);
                }
                Hll::Sparse(sparse_registers) => {
                    full_registers.union_sparse(sparse_registers);
                }
                Hll::Full(rhs_full_registers) => {
                    full_registers.union_dense(rhs_full_registers);
                }
            },
        }

        if self.is_full() {
            log::debug!("post-union representation exceeded its threshold, promoting");
            self.upgrade();
        }

        Ok(())
    }

    /// The estimated number of distinct values added so far.
    pub fn cardinality(&self) -> u64 {
        let (sum, num_of_zeros) = match self {
            Hll::Empty(_) => return 0,
            Hll::Explicit(explicit_storage) => return explicit_storage.len(),
            Hll::Sparse(sparse_registers) => sparse_registers.indicator(),
            Hll::Full(full_registers) => full_registers.indicator(),
        };

        let settings = self.settings();
        let estimator = settings.alpha_msquared / sum;

        if (num_of_zeros != 0) && (estimator < settings.small_estimator_cutoff) {
            // The "small range correction" formula from the HyperLogLog
            // algorithm. Only appropriate if both the estimator is smaller
            // than (5/2) * m and there are still registers that have the
            // zero value.
            let num_of_zeros = num_of_zeros as f64;
            let m = settings.m() as f64;
            let small_estimator = m * (m / num_of_zeros).ln();
            return small_estimator.ceil() as u64;
        }

        if estimator <= settings.large_estimator_cutoff {
            return estimator.ceil() as u64;
        }

        if estimator >= settings.two_to_l {
            // ln's argument would be <= 0 here (exactly 0 at the boundary,
            // negative past it); the hash space is exhausted and no finite
            // correction applies.
            return 0;
        }

        // The "large range correction" formula from the HyperLogLog
        // algorithm, adapted for 64-bit hashes. Only appropriate for
        // estimators whose value exceeds the calculated cutoff.
        let large_estimator = -1.0 * settings.two_to_l * (1.0 - (estimator / settings.two_to_l)).ln();
        large_estimator.ceil() as u64
    }

    fn is_full(&self) -> bool {
        match self {
            Hll::Empty(_) => false,
            Hll::Explicit(explicit_storage) => explicit_storage.is_full(),
            Hll::Sparse(sparse_registers) => sparse_registers.is_full(),
            Hll::Full(_) => false,
        }
    }

    fn upgrade(&mut self) {
        match self {
            Hll::Empty(_) => {}
            Hll::Explicit(explicit_storage) => {
                *self = explicit_storage.as_registers();
            }
            Hll::Sparse(sparse_registers) => {
                *self = Hll::Full(sparse_registers.to_full(None));
            }
            Hll::Full(_) => {}
        }
    }

    pub fn settings_check(&self, other: &Self) -> Result<(), SettingsError> {
        self.settings().settings_check(other.settings())
    }

    pub fn settings(&self) -> &Settings {
        match self {
            Hll::Empty(settings) => settings,
            Hll::Explicit(explicit_storage) => &explicit_storage.settings,
            Hll::Sparse(sparse_registers) => &sparse_registers.settings,
            Hll::Full(full_registers) => &full_registers.settings,
        }
    }

    pub fn clone_with_settings(&self, settings: &Settings) -> Self {
        match self {
            Hll::Empty(_) => Hll::Empty(*settings),
            Hll::Explicit(explicit_storage) => Hll::Explicit(explicit_storage.clone_with_settings(settings)),
            Hll::Sparse(sparse_registers) => Hll::Sparse(sparse_registers.clone_with_settings(settings)),
            Hll::Full(full_registers) => Hll::Full(full_registers.clone_with_settings(settings)),
        }
    }

    fn representation_tag(&self) -> metadata::RepresentationTag {
        match self {
            Hll::Empty(_) => metadata::RepresentationTag::Empty,
            Hll::Explicit(_) => metadata::RepresentationTag::Explicit,
            Hll::Sparse(_) => metadata::RepresentationTag::Sparse,
            Hll::Full(_) => metadata::RepresentationTag::Full,
        }
    }

    /// Serializes to the storage v1 wire format: a 3-byte header followed
    /// by a representation-specific payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let (settings, size) = match self {
            Hll::Empty(settings) => (settings, 0),
            Hll::Explicit(explicit_storage) => (&explicit_storage.settings, explicit_storage.bytes_size()),
            Hll::Sparse(sparse_registers) => (&sparse_registers.settings, sparse_registers.bytes_size()),
            Hll::Full(full_registers) => (&full_registers.settings, full_registers.bytes_size()),
        };

        let mut res = vec![0u8; metadata::HEADER_BYTE_COUNT + size];

        res[0] = metadata::pack_version_byte(self.representation_tag());
        res[1] = metadata::pack_parameters_byte(settings.regwidth, settings.log2m);
        res[2] = metadata::pack_cutoff_byte(settings.expthresh, settings.sparse_enabled());

        match self {
            Hll::Empty(_) => {}
            Hll::Explicit(explicit_storage) => explicit_storage.to_bytes(&mut res[metadata::HEADER_BYTE_COUNT..]),
            Hll::Sparse(sparse_registers) => sparse_registers.to_bytes(&mut res[metadata::HEADER_BYTE_COUNT..]),
            Hll::Full(full_registers) => full_registers.to_bytes(&mut res[metadata::HEADER_BYTE_COUNT..]),
        }

        res
    }

    /// Parses the storage v1 wire format produced by [`Hll::to_bytes`].
    pub fn from_bytes(buf: &[u8]) -> Result<Self, HllError> {
        if buf.len() < metadata::HEADER_BYTE_COUNT {
            return Err(HllError::TruncatedHeader(buf.len()));
        }

        let (version, tag) = metadata::unpack_version_byte(buf[0])?;
        if version != metadata::SCHEMA_VERSION {
            return Err(CodecError::UnknownSchemaVersion(version).into());
        }

        let (regwidth, log2m) = metadata::unpack_parameters_byte(buf[1]);
        let (sparse_enabled, explicit_threshold) = metadata::unpack_cutoff_byte(buf[2]);

        let settings = Settings::new(log2m, regwidth, explicit_threshold, sparse_enabled)?;
        let payload = &buf[metadata::HEADER_BYTE_COUNT..];

        let storage = match tag {
            metadata::RepresentationTag::Empty => Self::Empty(settings),
            metadata::RepresentationTag::Explicit => Self::Explicit(ExplicitStorage::from_bytes(&settings, payload)),
            metadata::RepresentationTag::Sparse => Self::Sparse(SparseRegisters::from_bytes(&settings, payload)),
            metadata::RepresentationTag::Full => Self::Full(FullRegisters::from_bytes(&settings, payload)),
        };

        Ok(storage)
    }

    /// Resets back to empty without losing the representation's shape
    /// (the settings are preserved, but the tag itself is not — the next
    /// `add_raw` re-derives whichever representation the settings call for
    /// first, same as a freshly constructed `Hll::new`).
    pub fn clear(&mut self) {
        match self {
            Hll::Empty(_) => {}
            Hll::Explicit(explicit_storage) => explicit_storage.clear(),
            Hll::Sparse(sparse_registers) => sparse_registers.clear(),
            Hll::Full(full_registers) => full_registers.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(sparse: bool) -> Settings {
        Settings::new(10, 4, -1, sparse).unwrap()
    }

    #[test]
    fn empty_hll_has_zero_cardinality() {
        let hll = Hll::new(settings(true));
        assert_eq!(hll.cardinality(), 0);
    }

    #[test]
    fn adding_raw_zero_is_a_real_distinct_value_for_explicit() {
        // Explicit stores the raw value outright, so a hash of 0 is just
        // another exact entry and must promote Empty -> Explicit like any
        // other first insert.
        let mut hll = Hll::new(settings(true));
        hll.add_raw(0);
        assert!(matches!(hll, Hll::Explicit(_)));
        assert_eq!(hll.cardinality(), 1);
    }

    #[test]
    fn adding_raw_zero_is_a_no_op_for_probabilistic_representations() {
        // With Explicit disabled, Empty promotes straight to Sparse/Full,
        // but a substream of 0 never sets a register.
        let settings = Settings::new(10, 4, 0, false).unwrap();
        let mut hll = Hll::new(settings);
        hll.add_raw(0);
        assert!(matches!(hll, Hll::Full(_)));
        assert_eq!(hll.cardinality(), 0);
    }

    #[test]
    fn single_value_has_cardinality_one() {
        let mut hll = Hll::new(settings(true));
        hll.add_raw(123456789);
        assert_eq!(hll.cardinality(), 1);
    }

    #[test]
    fn explicit_promotes_to_probabilistic_past_threshold() {
        let settings = Settings::new(10, 4, 2, true).unwrap(); // threshold = 2^(2-1) = 2
        let mut hll = Hll::new(settings);
        hll.add_raw(1);
        assert!(matches!(hll, Hll::Explicit(_)));
        hll.add_raw(2);
        hll.add_raw(3);
        assert!(!matches!(hll, Hll::Explicit(_)));
    }

    #[test]
    fn sparse_promotes_to_full_past_threshold() {
        let settings = Settings::new(4, 5, 0, true).unwrap();
        let mut hll = Hll::new(settings);
        let threshold = settings.sparse_threshold.unwrap() as u64;

        // each value sets substream bit 0 (nonzero substream) with a
        // distinct register index in its low log2m bits, so every add_raw
        // lands on a fresh sparse entry.
        for i in 0..=threshold {
            hll.add_raw((1u64 << settings.log2m()) | i);
        }

        assert!(matches!(hll, Hll::Full(_)));
    }

    #[test]
    fn union_of_disjoint_sets_sums_cardinality() {
        let settings = settings(true);
        let mut a = Hll::new(settings);
        let mut b = Hll::new(settings);
        a.add_raw(1);
        b.add_raw(2);
        b.add_raw(3);

        a.union(true, &b).unwrap();
        assert_eq!(a.cardinality(), 3);
    }

    #[test]
    fn union_rejects_mismatched_settings_when_strict() {
        let mut a = Hll::new(Settings::new(10, 4, -1, true).unwrap());
        let b = Hll::new(Settings::new(11, 4, -1, true).unwrap());
        assert!(a.union(true, &b).is_err());
    }

    #[test]
    fn cardinality_returns_zero_when_large_range_correction_argument_is_non_positive() {
        // tiny m with every register saturated at the maximum rank pushes
        // the raw estimator past two_to_l, where ln's argument is <= 0.
        let settings = Settings::new(4, 3, 0, false).unwrap();
        let mut full = FullRegisters::with_settings(&settings);
        for i in 0..settings.m() {
            full.set_reg(i, 7);
        }

        let hll = Hll::Full(full);
        assert_eq!(hll.cardinality(), 0);
    }

    #[test]
    fn to_bytes_from_bytes_roundtrips_full_representation() {
        let settings = Settings::new(4, 5, 0, false).unwrap();
        let mut hll = Hll::new(settings);
        for i in 1..100u64 {
            hll.add_raw(i);
        }

        let bytes = hll.to_bytes();
        let restored = Hll::from_bytes(&bytes).unwrap();
        assert_eq!(restored.cardinality(), hll.cardinality());
        assert_eq!(restored.settings(), hll.settings());
    }

    #[test]
    fn clear_resets_cardinality_but_not_settings() {
        let mut hll = Hll::new(settings(true));
        hll.add_raw(1);
        hll.add_raw(2);
        hll.clear();
        assert_eq!(hll.cardinality(), 0);
        assert_eq!(hll.settings(), &settings(true));
    }

    #[test]
    fn from_bytes_rejects_unknown_schema_version() {
        // version nibble 2 (unsupported), tag nibble 1 (Empty, a valid tag).
        let bytes = vec![0x21, 0x0a, 0x00];
        let err = Hll::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, HllError::Codec(CodecError::UnknownSchemaVersion(2))));
    }

    #[test]
    fn from_bytes_rejects_truncated_header() {
        let err = Hll::from_bytes(&[0x12]).unwrap_err();
        assert!(matches!(err, HllError::TruncatedHeader(1)));
    }
}
