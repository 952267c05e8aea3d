//! Fourier-domain samples of periodized Gaussians and analytic Morlets.

/// Sum of Gaussians of bandwidth `sigma` centred at `xi + p` for every
/// integer period `p` that contributes, sampled on the `n`-point DFT grid.
fn gauss_periodized(n: usize, xi: f64, sigma: f64) -> Vec<f64> {
    let periods = (xi.abs() + 8.0 * sigma).ceil() as i64 + 1;
    let denom = 2.0 * sigma * sigma;
    (0..n)
        .map(|k| {
            let w = k as f64 / n as f64;
            (-periods..=periods)
                .map(|p| {
                    let d = w + p as f64 - xi;
                    (-d * d / denom).exp()
                })
                .sum()
        })
        .collect()
}

/// Low-pass Gaussian with unit DC response.
pub fn gauss_1d(n: usize, sigma: f64) -> Vec<f64> {
    let mut phi = gauss_periodized(n, 0.0, sigma);
    let dc = phi[0];
    if dc > 0.0 {
        phi.iter_mut().for_each(|v| *v /= dc);
    }
    phi
}

/// Analytic Morlet wavelet with zero DC response and unit peak.
///
/// The low-frequency Gaussian correction removes the DC component, then
/// every bin above Nyquist is zeroed so the filter passes positive
/// frequencies only.
pub fn morlet_1d(n: usize, xi: f64, sigma: f64) -> Vec<f64> {
    let band = gauss_periodized(n, xi, sigma);
    let low = gauss_periodized(n, 0.0, sigma);
    let kappa = if low[0] > 0.0 { band[0] / low[0] } else { 0.0 };
    let mut psi: Vec<f64> = band
        .iter()
        .zip(&low)
        .map(|(b, l)| b - kappa * l)
        .collect();
    psi.iter_mut().skip(n / 2 + 1).for_each(|v| *v = 0.0);

    let peak = psi.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if peak > 0.0 {
        psi.iter_mut().for_each(|v| *v /= peak);
    }
    psi
}

/// Periodized mean over `2^k` blocks: the filter seen by a signal that has
/// already been subsampled by `2^k`.
pub fn periodize_filter_fourier(h: &[f64], k: u32) -> Vec<f64> {
    let factor = 1usize << k;
    let m = h.len() / factor;
    let mut out = vec![0.0; m];
    for block in h.chunks_exact(m) {
        out.iter_mut().zip(block).for_each(|(o, v)| *o += v);
    }
    out.iter_mut().for_each(|o| *o /= factor as f64);
    out
}

/// Fourier reflection `h[(n - k) % n]`, i.e. time reversal of the filter.
pub fn reflect_fourier(h: &[f64]) -> Vec<f64> {
    let n = h.len();
    (0..n).map(|k| h[(n - k) % n]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn morlet_is_analytic_with_zero_mean() {
        let psi = morlet_1d(256, 0.2, 0.02);
        assert_abs_diff_eq!(psi[0], 0.0, epsilon = 1e-12);
        assert!(psi[129..].iter().all(|&v| v == 0.0));
        let peak = psi.iter().fold(0.0f64, |a, v| a.max(*v));
        assert_abs_diff_eq!(peak, 1.0, epsilon = 1e-12);
        let argmax = psi
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        // 0.2 cycles per sample on a 256-point grid
        assert_eq!(argmax, Some(51));
    }

    #[test]
    fn gaussian_is_symmetric_low_pass() {
        let phi = gauss_1d(128, 0.05);
        assert_abs_diff_eq!(phi[0], 1.0, epsilon = 1e-12);
        for k in 1..64 {
            assert_abs_diff_eq!(phi[k], phi[128 - k], epsilon = 1e-12);
        }
        assert!(phi[64] < 1e-6);
    }

    #[test]
    fn periodization_preserves_dc() {
        let phi = gauss_1d(64, 0.1);
        let level2 = periodize_filter_fourier(&phi, 2);
        assert_eq!(level2.len(), 16);
        let expected = (0..4).map(|b| phi[b * 16]).sum::<f64>() / 4.0;
        assert_abs_diff_eq!(level2[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn reflection_maps_positive_bins_to_negative() {
        let psi = morlet_1d(32, 0.25, 0.03);
        let dn = reflect_fourier(&psi);
        assert_eq!(dn[0], psi[0]);
        assert_eq!(dn[32 - 8], psi[8]);
        assert!(dn[1..16].iter().all(|&v| v == 0.0));
    }
}
