//! Merton model closed forms.
//!
//! Equity is a European call on firm assets V struck at the face value of
//! debt D with maturity T:
//!
//! E = V Φ(d1) − e^{−r T} D Φ(d2)
//!
//! d1 = (ln(V/D) + (r + σ²/2) T) / (σ √T),  d2 = d1 − σ √T
//!
//! and the distance to default replaces r by the asset drift μ:
//!
//! DD = (ln(V/D) + (μ − σ²/2) T) / (σ √T),  PD = Φ(−DD)

use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;

/// Standard normal cumulative distribution function.
///
/// Accurate to about 1e-11 absolute, the precision of statrs' `erfc`.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// The d1 and d2 terms for asset value `v`, debt `d`, rate `r`, asset
/// volatility `sigma` and horizon `t`.
pub fn d1_d2(v: f64, d: f64, r: f64, sigma: f64, t: f64) -> (f64, f64) {
    let vol_t = sigma * t.sqrt();
    let d1 = ((v / d).ln() + (r + 0.5 * sigma * sigma) * t) / vol_t;
    (d1, d1 - vol_t)
}

/// Equity value implied by asset value and asset volatility.
pub fn equity_value(v: f64, d: f64, r: f64, sigma: f64, t: f64) -> f64 {
    let (d1, d2) = d1_d2(v, d, r, sigma, t);
    v * norm_cdf(d1) - (-r * t).exp() * d * norm_cdf(d2)
}

/// Equity volatility implied by asset value and asset volatility,
/// σ_E = V Φ(d1) σ_V / E.
pub fn equity_volatility(v: f64, d: f64, r: f64, sigma: f64, t: f64) -> f64 {
    let (d1, _) = d1_d2(v, d, r, sigma, t);
    v * norm_cdf(d1) * sigma / equity_value(v, d, r, sigma, t)
}

/// Distance to default with asset drift `mu`.
pub fn distance_to_default(v: f64, d: f64, mu: f64, sigma: f64, t: f64) -> f64 {
    ((v / d).ln() + (mu - 0.5 * sigma * sigma) * t) / (sigma * t.sqrt())
}

/// Probability of default for a distance to default.
pub fn default_probability(dd: f64) -> f64 {
    norm_cdf(-dd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.5)]
    #[case(1.0, 0.841_344_746_068_542_9)]
    #[case(-1.96, 0.024_997_895_148_220_435)]
    #[case(3.0, 0.998_650_101_968_369_9)]
    fn test_norm_cdf(#[case] x: f64, #[case] expected: f64) {
        assert_abs_diff_eq!(norm_cdf(x), expected, epsilon = 1e-10);
    }

    #[test]
    fn test_equity_value_matches_black_scholes_call() {
        // S = 100, K = 100, r = 5%, σ = 20%, T = 1 → 10.4506
        let e = equity_value(100.0, 100.0, 0.05, 0.2, 1.0);
        assert_abs_diff_eq!(e, 10.450_583_572_185_565, epsilon = 1e-9);
    }

    #[test]
    fn test_low_volatility_limit_is_intrinsic_value() {
        let e = equity_value(150.0, 50.0, 0.02, 0.005, 1.0);
        assert_relative_eq!(e, 150.0 - 50.0 * (-0.02_f64).exp(), max_relative = 1e-12);
    }

    #[test]
    fn test_dd_and_pd() {
        let dd = distance_to_default(120.0, 100.0, 0.05, 0.25, 1.0);
        let expected = ((1.2_f64).ln() + 0.05 - 0.5 * 0.0625) / 0.25;
        assert_relative_eq!(dd, expected, max_relative = 1e-14);
        assert_relative_eq!(default_probability(dd), 1.0 - norm_cdf(dd), max_relative = 1e-10);
    }
}
