//! Wavelet-modulus cascade along time: S0, first-order moduli, S1 and S2.

use ndarray::{Array1, Array2, Axis};
use scatter_rs_core::backend::Backend;
use scatter_rs_core::num_complex::Complex64;
use tracing::trace;

use super::config::TimeScales;
use super::filter_bank::{Filter, TimeFilterBank};
use super::map_branches;
use super::path::{PathFamily, PathMeta};
use crate::kernel::ExecInvariantViolation;

pub(crate) type ExecResult<T> = Result<T, ExecInvariantViolation>;

/// Output of one path for one signal, `(rows, time)`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BranchOutput {
    pub meta: PathMeta,
    pub data: Array2<f64>,
}

impl BranchOutput {
    pub(crate) fn row(meta: PathMeta, row: Vec<f64>) -> Self {
        Self {
            meta,
            data: Array1::from(row).insert_axis(Axis(0)),
        }
    }
}

/// First-order modulus `|x * psi1[n1]|` at resolution `2^-k1`.
#[derive(Debug, Clone)]
pub(crate) struct FirstOrder {
    pub n1: usize,
    pub j1: u32,
    pub k1: u32,
    pub u1: Vec<f64>,
    pub u1_hat: Vec<Complex64>,
}

pub(crate) fn level(filter: &Filter, k: u32) -> ExecResult<&[f64]> {
    filter.fourier(k).ok_or(ExecInvariantViolation::InvalidState {
        reason: "filter was not built down to the requested subsampling level",
    })
}

/// Borrowed view of everything the time cascade needs.
#[derive(Clone, Copy)]
pub(crate) struct TimeCascade<'a> {
    pub backend: &'a dyn Backend,
    pub bank: &'a TimeFilterBank,
    pub scales: &'a TimeScales,
}

impl<'a> TimeCascade<'a> {
    /// Reflect-pad `x` to the filter grid and transform it.
    pub fn pad_fourier(&self, x: &[f64]) -> ExecResult<Vec<Complex64>> {
        if x.len() != self.scales.n {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "x",
                expected: self.scales.n,
                got: x.len(),
            });
        }
        let padded = self
            .backend
            .pad(x, self.scales.pad_left, self.scales.pad_right)?;
        Ok(self.backend.rfft(&padded)?)
    }

    /// `|ifft(subsample(x_hat * h, k))|`.
    pub fn modulus_band(&self, x_hat: &[Complex64], h: &[f64], k: u32) -> ExecResult<Vec<f64>> {
        let mut y = x_hat.to_vec();
        self.backend.multiply(&mut y, h)?;
        let mut y = self.backend.subsample_fourier(&y, k)?;
        self.backend.ifft(&mut y)?;
        Ok(self.backend.modulus(&y))
    }

    /// Low-pass a spectrum at resolution `2^-k_prev` and subsample the
    /// remainder. Returns the padded output and its total log2 stride.
    pub fn lowpass(&self, u_hat: &[Complex64], k_prev: u32) -> ExecResult<(Vec<f64>, u32)> {
        let k_avg = self.scales.k_avg(k_prev);
        let mut y = u_hat.to_vec();
        self.backend.multiply(&mut y, level(self.bank.phi(), k_prev)?)?;
        let y = self.backend.subsample_fourier(&y, k_avg)?;
        Ok((self.backend.irfft(&y)?, k_prev + k_avg))
    }

    /// [`Self::lowpass`] of a modulus, with roundoff below zero clamped.
    pub fn lowpass_modulus(
        &self,
        u_hat: &[Complex64],
        k_prev: u32,
    ) -> ExecResult<(Vec<f64>, u32)> {
        let (mut y, stride) = self.lowpass(u_hat, k_prev)?;
        y.iter_mut().for_each(|v| *v = v.max(0.0));
        Ok((y, stride))
    }

    /// Crop a padded sequence at stride `2^k` back to the signal extent.
    pub fn unpad(&self, x: &[f64], k: u32) -> ExecResult<Vec<f64>> {
        let (start, end) = self.scales.unpad_bounds(k);
        Ok(self.backend.unpad(x, start, end)?)
    }

    /// S0: the signal low-passed in time, or the signal itself without
    /// averaging.
    pub fn zeroth_order(&self, x: &[f64], x_hat: &[Complex64]) -> ExecResult<BranchOutput> {
        if !self.scales.average {
            return Ok(BranchOutput::row(PathMeta::new(PathFamily::S0, 0), x.to_vec()));
        }
        let (s0, stride) = self.lowpass(x_hat, 0)?;
        let s0 = self.unpad(&s0, stride)?;
        Ok(BranchOutput::row(PathMeta::new(PathFamily::S0, stride), s0))
    }

    /// First-order moduli for every `psi1`, each at its own resolution.
    pub fn first_order(&self, x_hat: &[Complex64]) -> ExecResult<Vec<FirstOrder>> {
        self.bank
            .psi1()
            .iter()
            .enumerate()
            .map(|(n1, psi)| {
                let j1 = psi.j();
                let k1 = self.scales.k1(j1);
                let u1 = self.modulus_band(x_hat, level(psi, 0)?, k1)?;
                let u1_hat = self.backend.rfft(&u1)?;
                Ok(FirstOrder {
                    n1,
                    j1,
                    k1,
                    u1,
                    u1_hat,
                })
            })
            .collect()
    }

    /// S1 for one first-order path.
    pub fn s1(&self, first: &FirstOrder) -> ExecResult<BranchOutput> {
        let meta = |stride| PathMeta::new(PathFamily::S1, stride).with_first(first.n1, first.j1);
        if !self.scales.average {
            let s1 = self.unpad(&first.u1, first.k1)?;
            return Ok(BranchOutput::row(meta(first.k1), s1));
        }
        let (s1, stride) = self.lowpass_modulus(&first.u1_hat, first.k1)?;
        let s1 = self.unpad(&s1, stride)?;
        Ok(BranchOutput::row(meta(stride), s1))
    }

    /// S2 for every pair with `j2 > j1`, ordered by `n1` then `n2`.
    pub fn second_order(&self, first: &[FirstOrder]) -> ExecResult<Vec<BranchOutput>> {
        let pairs: Vec<(&FirstOrder, usize)> = first
            .iter()
            .flat_map(|f| {
                self.bank
                    .psi2()
                    .iter()
                    .enumerate()
                    .filter(move |(_, psi2)| psi2.j() > f.j1)
                    .map(move |(n2, _)| (f, n2))
            })
            .collect();
        map_branches(&pairs, |&(f, n2)| self.s2(f, n2))
    }

    fn s2(&self, f: &FirstOrder, n2: usize) -> ExecResult<BranchOutput> {
        let psi2 = &self.bank.psi2()[n2];
        let j2 = psi2.j();
        let k2 = self.scales.k2(j2, f.k1);
        trace!(n1 = f.n1, n2, k1 = f.k1, k2, "second-order path");
        let u2 = self.modulus_band(&f.u1_hat, level(psi2, f.k1)?, k2)?;
        let meta = |stride| {
            PathMeta::new(PathFamily::S2, stride)
                .with_first(f.n1, f.j1)
                .with_second(n2, j2)
        };
        let k_prev = f.k1 + k2;
        if self.scales.average {
            let u2_hat = self.backend.rfft(&u2)?;
            let (s2, stride) = self.lowpass_modulus(&u2_hat, k_prev)?;
            Ok(BranchOutput::row(meta(stride), self.unpad(&s2, stride)?))
        } else {
            Ok(BranchOutput::row(meta(k_prev), self.unpad(&u2, k_prev)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::KernelLifecycle;
    use crate::scattering1d::config::ScatteringConfig;
    use crate::scattering1d::filter_bank::TimeFilterBankConfig;
    use approx::assert_abs_diff_eq;
    use rand::Rng;
    use scatter_rs_core::backend::RustFftBackend;

    fn fixture(config: ScatteringConfig) -> (TimeScales, TimeFilterBank) {
        let scales = config.time_scales().expect("valid config");
        let bank = TimeFilterBank::try_new(TimeFilterBankConfig {
            n_pad: scales.n_pad,
            j: scales.j,
            q: scales.q,
            log2_t: scales.log2_t,
        })
        .expect("filterbank");
        (scales, bank)
    }

    #[test]
    fn constant_signal_has_constant_s0_and_vanishing_s1() {
        let (scales, bank) = fixture(ScatteringConfig::new(256));
        let backend = RustFftBackend::new();
        let cascade = TimeCascade {
            backend: &backend,
            bank: &bank,
            scales: &scales,
        };
        let x = vec![2.5; 256];
        let x_hat = cascade.pad_fourier(&x).expect("pad");
        let s0 = cascade.zeroth_order(&x, &x_hat).expect("s0");
        assert_eq!(s0.meta.stride_t, scales.log2_t);
        s0.data
            .iter()
            .for_each(|v| assert_abs_diff_eq!(*v, 2.5, epsilon = 1e-9));

        let first = cascade.first_order(&x_hat).expect("first order");
        assert_eq!(first.len(), bank.psi1().len());
        for f in &first {
            let s1 = cascade.s1(f).expect("s1");
            assert!(s1.data.iter().all(|v| *v >= 0.0 && *v < 1e-6));
        }
    }

    #[test]
    fn tone_excites_matching_first_order_path() {
        let (scales, bank) = fixture(ScatteringConfig::new(512));
        let backend = RustFftBackend::new();
        let cascade = TimeCascade {
            backend: &backend,
            bank: &bank,
            scales: &scales,
        };
        let target = &bank.psi1()[10];
        let x: Vec<f64> = (0..512)
            .map(|t| (2.0 * core::f64::consts::PI * target.xi() * t as f64).cos())
            .collect();
        let x_hat = cascade.pad_fourier(&x).expect("pad");
        let energies: Vec<f64> = cascade
            .first_order(&x_hat)
            .expect("first order")
            .iter()
            .map(|f| cascade.s1(f).expect("s1").data.sum())
            .collect();
        let loudest = energies
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(loudest, Some(10));
    }

    #[test]
    fn unaveraged_paths_keep_their_own_resolution() {
        let (scales, bank) = fixture(ScatteringConfig {
            average: false,
            ..ScatteringConfig::new(256)
        });
        let backend = RustFftBackend::new();
        let cascade = TimeCascade {
            backend: &backend,
            bank: &bank,
            scales: &scales,
        };
        let mut rng = rand::rng();
        let x: Vec<f64> = (0..256).map(|_| rng.random_range(-1.0..1.0)).collect();
        let x_hat = cascade.pad_fourier(&x).expect("pad");
        let s0 = cascade.zeroth_order(&x, &x_hat).expect("s0");
        assert_eq!(s0.data.row(0).to_vec(), x);

        let first = cascade.first_order(&x_hat).expect("first order");
        for f in &first {
            let s1 = cascade.s1(f).expect("s1");
            assert_eq!(s1.meta.stride_t, f.k1);
            assert_eq!(s1.data.ncols(), scales.out_len(f.k1));
        }
        let second = cascade.second_order(&first).expect("second order");
        for s2 in &second {
            assert!(s2.meta.j2 > s2.meta.j1);
            assert!(s2.data.iter().all(|v| *v >= 0.0));
        }
        let order: Vec<(usize, usize)> = second
            .iter()
            .filter_map(|s2| Some((s2.meta.n1?, s2.meta.n2?)))
            .collect();
        assert_eq!(order.len(), second.len());
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn wrong_length_is_reported() {
        let (scales, bank) = fixture(ScatteringConfig::new(64));
        let backend = RustFftBackend::new();
        let cascade = TimeCascade {
            backend: &backend,
            bank: &bank,
            scales: &scales,
        };
        assert_eq!(
            cascade.pad_fourier(&[0.0; 63]).expect_err("short input"),
            ExecInvariantViolation::LengthMismatch {
                arg: "x",
                expected: 64,
                got: 63,
            }
        );
    }
}
