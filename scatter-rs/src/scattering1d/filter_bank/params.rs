//! Centre frequencies, bandwidths and critical subsampling of a Morlet
//! filterbank.

use core::f64::consts::{FRAC_1_SQRT_2, PI};

/// Bandwidth of the coarsest low-pass and band-pass filters at `2^0`.
pub const SIGMA0: f64 = 0.1;

/// Number of bandwidths above the centre frequency kept below Nyquist when
/// choosing the critical subsampling of a filter.
pub const ALPHA: f64 = 5.0;

/// Overlap ratio between neighbouring wavelets at their crossing point.
pub const R_PSI: f64 = FRAC_1_SQRT_2;

/// Relative amplitude at which a filter is considered to have decayed.
pub const CRITERION_AMPLITUDE: f64 = 1e-3;

/// Parameters of one band-pass filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandParams {
    /// Centre frequency in cycles per sample.
    pub xi: f64,
    /// Gaussian bandwidth in cycles per sample.
    pub sigma: f64,
    /// Log2 of the largest subsampling the filter output tolerates.
    pub j: u32,
    /// Bandwidth of the mother wavelet divided by this filter's bandwidth.
    pub dilation: f64,
}

/// Largest centre frequency that keeps the mother wavelet below Nyquist.
pub fn compute_xi_max(q: u32) -> f64 {
    (1.0 / (1.0 + 2f64.powf(3.0 / q as f64))).max(0.35)
}

/// Bandwidth such that neighbouring wavelets `2^(1/q)` apart cross at `r`.
pub fn compute_sigma_psi(xi: f64, q: u32, r: f64) -> f64 {
    let factor = 2f64.powf(-1.0 / q as f64);
    let term1 = (1.0 - factor) / (1.0 + factor);
    let term2 = 1.0 / (2.0 * (1.0 / r).ln()).sqrt();
    xi * term1 * term2
}

/// Log2 of the critical subsampling factor of a filter.
pub fn max_dyadic_subsampling(xi: f64, sigma: f64) -> u32 {
    let upper = (xi + ALPHA * sigma).min(0.5);
    let j = (-upper.log2()).floor() as i64 - 1;
    j.max(0) as u32
}

/// Number of samples after which a Gaussian of bandwidth `sigma` has decayed
/// below [`CRITERION_AMPLITUDE`], counted on both sides of its centre.
pub fn time_support(sigma: f64) -> usize {
    let half = (2.0 * (1.0 / CRITERION_AMPLITUDE).ln()).sqrt() / (2.0 * PI * sigma);
    2 * half.ceil() as usize + 1
}

/// Geometric then linear centre frequencies for a bank with `q` wavelets
/// per octave whose smallest bandwidth is `sigma_min`.
///
/// Filters are spaced `2^(1/q)` apart while their bandwidth stays above
/// `sigma_min`; the remaining low frequencies are covered by `q - 1`
/// linearly spaced filters of bandwidth `sigma_min`.
pub fn compute_params_filterbank(sigma_min: f64, q: u32) -> Vec<BandParams> {
    let xi_max = compute_xi_max(q);
    let sigma_max = compute_sigma_psi(xi_max, q, R_PSI);
    let mut bands = Vec::new();
    if sigma_max <= sigma_min {
        bands.push(BandParams {
            xi: xi_max,
            sigma: sigma_max,
            j: max_dyadic_subsampling(xi_max, sigma_max),
            dilation: 1.0,
        });
        return bands;
    }

    let mut n = 0;
    loop {
        let xi = xi_max * 2f64.powf(-(n as f64) / q as f64);
        let sigma = sigma_max * 2f64.powf(-(n as f64) / q as f64);
        if sigma <= sigma_min {
            break;
        }
        bands.push(BandParams {
            xi,
            sigma,
            j: max_dyadic_subsampling(xi, sigma),
            dilation: sigma_max / sigma,
        });
        n += 1;
    }

    if let Some(last) = bands.last().copied() {
        let step = last.xi / q as f64;
        for m in 1..q {
            let xi = last.xi - m as f64 * step;
            bands.push(BandParams {
                xi,
                sigma: sigma_min,
                j: max_dyadic_subsampling(xi, sigma_min),
                dilation: sigma_max / sigma_min,
            });
        }
    }
    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn xi_max_is_clamped() {
        assert_abs_diff_eq!(compute_xi_max(1), 0.35, epsilon = 1e-12);
        assert_abs_diff_eq!(compute_xi_max(8), 1.0 / (1.0 + 2f64.powf(0.375)), epsilon = 1e-12);
    }

    #[test]
    fn first_band_reaches_nyquist() {
        let bands = compute_params_filterbank(SIGMA0 / 2f64.powi(6), 8);
        assert_eq!(bands[0].j, 0);
        assert_abs_diff_eq!(bands[0].dilation, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn scales_and_dilations_are_monotone() {
        for q in [1u32, 2, 8, 16] {
            let bands = compute_params_filterbank(SIGMA0 / 2f64.powi(7), q);
            assert!(bands.len() >= q as usize);
            for w in bands.windows(2) {
                assert!(w[1].xi < w[0].xi, "centre frequencies decrease");
                assert!(w[1].j >= w[0].j, "scale index is non-decreasing");
                assert!(w[1].dilation >= w[0].dilation);
            }
        }
    }

    #[test]
    fn octave_bank_with_q1_has_one_filter_per_octave() {
        // sigma_max = 0.35 * (1/3) * 1.201 ~ 0.1401, sigma_min = 0.1 / 16
        let bands = compute_params_filterbank(SIGMA0 / 16.0, 1);
        assert_eq!(bands.len(), 5);
        assert_abs_diff_eq!(bands[4].dilation, 16.0, epsilon = 1e-9);
    }

    #[test]
    fn support_shrinks_with_bandwidth() {
        assert!(time_support(0.01) > time_support(0.1));
        assert_eq!(time_support(0.1) % 2, 1);
    }
}
