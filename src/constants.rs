//! Closed-form constants used by the cardinality estimator: the `alpha * m^2`
//! multiplier, the small/large-range correction cutoffs, and `2^L`.
//!
//! Pulled out of `settings.rs` so each formula documented in spec.md §3/§4.2
//! can be tested in isolation against the numbers the spec's algorithm
//! description expects, independent of `Settings` construction/validation.

/// `alpha * m^2`, the constant in the "raw" HyperLogLog estimator. The three
/// small-`m` special cases come from the original Flajolet et al. paper;
/// above that, the asymptotic `0.7213 / (1 + 1.079/m)` formula is used.
pub(crate) fn alpha_m_squared(log2m: u32) -> f64 {
    let m = (1u64 << log2m) as f64;

    match log2m {
        4 => 0.673 * m * m,
        5 => 0.697 * m * m,
        6 => 0.709 * m * m,
        _ => (0.7213 / (1.0 + 1.079 / m)) * m * m,
    }
}

/// The small-range correction applies only while the raw estimator is below
/// `5m/2` (and at least one register is still zero).
pub(crate) fn small_estimator_cutoff(m: u64) -> f64 {
    (m as f64 * 5.0) / 2.0
}

/// The large-range correction applies once the raw estimator exceeds
/// `2^L / 30`.
pub(crate) fn large_estimator_cutoff(two_to_l: f64) -> f64 {
    two_to_l / 30.0
}

/// `2^L` where `L = log2m + (2^regwidth - 2)` is the effective hash-space
/// exponent for the large-range correction. `2^regwidth - 1` is the maximum
/// register value; since rank computation adds 1, only
/// `(2^regwidth - 1) - 1` substream bits are ever inspected, hence the `- 2`.
pub(crate) fn two_to_l(log2m: u32, regwidth: u32) -> f64 {
    let max_register_value = (1u32 << regwidth) - 1;
    let pw_bits = max_register_value - 1;
    let total_bits = pw_bits + log2m;

    2_f64.powf(total_bits.into())
}
