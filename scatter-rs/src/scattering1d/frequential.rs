//! Joint scattering across the log-frequency axis of the first-order
//! scalogram.
//!
//! For each second-order wavelet the admissible first-order rows are
//! stacked into a `(frequency, time)` grid at a common temporal resolution,
//! zero-padded along frequency, and convolved along frequency with the
//! frequential filterbank.

use ndarray::{s, Array2, ArrayView1};
use scatter_rs_core::backend::Backend;
use scatter_rs_core::num_complex::Complex64;
use tracing::trace;

use super::cascade::{level, BranchOutput, ExecResult, FirstOrder, TimeCascade};
use super::config::{FrequencyScales, TimeScales};
use super::filter_bank::{FrequencyFilterBank, Spin, TimeFilterBank};
use super::map_branches;
use super::path::{PathFamily, PathInfo, PathMeta};
use crate::kernel::ExecInvariantViolation;

/// Indices of the frequential wavelets kept for a branch of `n_fr` rows.
pub(crate) fn retained(
    bank: &FrequencyFilterBank,
    fr: &FrequencyScales,
    n_fr: usize,
) -> Vec<usize> {
    bank.psi_up()
        .iter()
        .enumerate()
        .filter(|(_, psi)| fr.keeps(psi.dilation(), n_fr))
        .map(|(i, _)| i)
        .collect()
}

fn family(spin: Spin) -> PathFamily {
    match spin {
        Spin::Up => PathFamily::PsiTPsiFUp,
        Spin::Down => PathFamily::PsiTPsiFDown,
    }
}

fn rows_to_array(rows: Vec<Vec<f64>>) -> ExecResult<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat).map_err(|_| {
        ExecInvariantViolation::InvalidState {
            reason: "joint rows do not share a common temporal length",
        }
    })
}

/// Keep the leading `rows` rows.
fn crop_rows(z: Array2<f64>, rows: usize) -> ExecResult<Array2<f64>> {
    if rows > z.nrows() {
        return Err(ExecInvariantViolation::InvalidState {
            reason: "frequential extent exceeds the padded grid",
        });
    }
    Ok(z.slice_move(s![..rows, ..]))
}

/// Every joint path in emission order, with its `(rows, time)` shape.
pub(crate) fn plan(
    time: &TimeScales,
    fr: &FrequencyScales,
    time_bank: &TimeFilterBank,
    bank: &FrequencyFilterBank,
    out_3d: bool,
) -> Vec<PathInfo> {
    let k_t = time.k_averaged();
    let avg_len = time.out_len(k_t);
    let phi_rows = |n_fr: usize| fr.averaged_rows(n_fr, out_3d);
    let psi_rows = |n_fr: usize| if fr.average_fr { phi_rows(n_fr) } else { n_fr };
    let stride_fr = if fr.average_fr { fr.log2_f } else { 0 };

    let mut out = vec![PathInfo {
        meta: PathMeta::new(PathFamily::PhiTPhiF, k_t).with_stride_fr(fr.log2_f),
        shape: vec![phi_rows(fr.n_fr_max), avg_len],
    }];
    for n1_fr in retained(bank, fr, fr.n_fr_max) {
        out.push(PathInfo {
            meta: PathMeta::new(PathFamily::PhiTPsiF, k_t)
                .with_frequential(n1_fr, bank.psi_up()[n1_fr].j())
                .with_stride_fr(stride_fr),
            shape: vec![psi_rows(fr.n_fr_max), avg_len],
        });
    }

    let mut spun: [Vec<PathInfo>; 2] = [Vec::new(), Vec::new()];
    for (n2, psi2) in time_bank.psi2().iter().enumerate() {
        let n_fr = fr.n_frs[n2];
        if n_fr == 0 {
            continue;
        }
        let j2 = psi2.j();
        let (stride_t, len) = if time.average {
            (k_t, avg_len)
        } else {
            let target = time.k_joint(j2);
            (target, time.out_len(target))
        };
        out.push(PathInfo {
            meta: PathMeta::new(PathFamily::PsiTPhiF, stride_t)
                .with_second(n2, j2)
                .with_stride_fr(fr.log2_f),
            shape: vec![phi_rows(n_fr), len],
        });
        for n1_fr in retained(bank, fr, n_fr) {
            for (slot, spin) in [Spin::Up, Spin::Down].into_iter().enumerate() {
                spun[slot].push(PathInfo {
                    meta: PathMeta::new(family(spin), stride_t)
                        .with_second(n2, j2)
                        .with_frequential(n1_fr, bank.psi(spin)[n1_fr].j())
                        .with_stride_fr(stride_fr),
                    shape: vec![psi_rows(n_fr), len],
                });
            }
        }
    }
    let [up, dn] = spun;
    out.extend(up);
    out.extend(dn);
    out
}

/// Joint outputs of one second-order wavelet.
struct PsiTBranch {
    phi_f: BranchOutput,
    up: Vec<BranchOutput>,
    dn: Vec<BranchOutput>,
}

/// Borrowed view of everything the frequential stage needs.
#[derive(Clone, Copy)]
pub(crate) struct FrequentialStage<'a> {
    pub time: TimeCascade<'a>,
    pub bank: &'a FrequencyFilterBank,
    pub scales: &'a FrequencyScales,
    pub out_3d: bool,
}

impl<'a> FrequentialStage<'a> {
    fn backend(&self) -> &'a dyn Backend {
        self.time.backend
    }

    /// Joint coefficients for one signal, in emission order.
    pub fn run(&self, first: &[FirstOrder]) -> ExecResult<Vec<BranchOutput>> {
        if first.len() != self.scales.n_fr_max {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "first-order path count differs from the frequential extent",
            });
        }
        let mut out = self.phi_t(first)?;

        let branches: Vec<(usize, usize)> = self
            .scales
            .n_frs
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, n_fr)| n_fr > 0)
            .collect();
        let computed = map_branches(&branches, |&(n2, n_fr)| self.psi_t(first, n2, n_fr))?;

        let mut up = Vec::new();
        let mut dn = Vec::new();
        for branch in computed {
            out.push(branch.phi_f);
            up.extend(branch.up);
            dn.extend(branch.dn);
        }
        out.extend(up);
        out.extend(dn);
        Ok(out)
    }

    /// `phi_t * phi_f` and `phi_t * psi_f` over all first-order rows.
    fn phi_t(&self, first: &[FirstOrder]) -> ExecResult<Vec<BranchOutput>> {
        let mut rows = Vec::with_capacity(first.len());
        let mut k_t = 0;
        for f in first {
            let (row, stride) = self.time.lowpass_modulus(&f.u1_hat, f.k1)?;
            rows.push(self.time.unpad(&row, stride)?);
            k_t = stride;
        }
        let grid_hat = self.stack_fourier(rows.into_iter().map(|row| {
            row.into_iter()
                .map(|v| Complex64::new(v, 0.0))
                .collect::<Vec<_>>()
        }))?;
        let log2_f = self.scales.log2_f;

        let mut out = Vec::new();
        let phi_f = self.lowpass_frequency(&grid_hat, self.scales.n_fr_max)?;
        out.push(BranchOutput {
            meta: PathMeta::new(PathFamily::PhiTPhiF, k_t).with_stride_fr(log2_f),
            data: phi_f,
        });
        for n1_fr in retained(self.bank, self.scales, self.scales.n_fr_max) {
            let psi_fr = &self.bank.psi_up()[n1_fr];
            let z = self.convolve_modulus(&grid_hat, level(psi_fr, 0)?, 0)?;
            let (z, stride_fr) = self.finish_frequency(z, self.scales.n_fr_max)?;
            out.push(BranchOutput {
                meta: PathMeta::new(PathFamily::PhiTPsiF, k_t)
                    .with_frequential(n1_fr, psi_fr.j())
                    .with_stride_fr(stride_fr),
                data: z,
            });
        }
        Ok(out)
    }

    /// `psi_t * phi_f` and `psi_t * psi_f_up/dn` for one second-order wavelet.
    fn psi_t(&self, first: &[FirstOrder], n2: usize, n_fr: usize) -> ExecResult<PsiTBranch> {
        let psi2 = &self.time.bank.psi2()[n2];
        let j2 = psi2.j();
        let target = self.time.scales.k_joint(j2);
        trace!(n2, j2, n_fr, target, "joint branch");

        let rows = first[..n_fr]
            .iter()
            .map(|f| {
                let mut y = f.u1_hat.clone();
                self.backend().multiply(&mut y, level(psi2, f.k1)?)?;
                let mut y = self
                    .backend()
                    .subsample_fourier(&y, target.saturating_sub(f.k1))?;
                self.backend().ifft(&mut y)?;
                Ok(y)
            })
            .collect::<ExecResult<Vec<_>>>()?;
        let grid_hat = self.stack_fourier(rows.into_iter())?;
        let log2_f = self.scales.log2_f;

        let z = self.lowpass_frequency(&grid_hat, n_fr)?;
        let (z, stride_t) = self.finish_time(z, target)?;
        let phi_f = BranchOutput {
            meta: PathMeta::new(PathFamily::PsiTPhiF, stride_t)
                .with_second(n2, j2)
                .with_stride_fr(log2_f),
            data: z,
        };

        let mut up = Vec::new();
        let mut dn = Vec::new();
        for n1_fr in retained(self.bank, self.scales, n_fr) {
            for spin in [Spin::Up, Spin::Down] {
                let psi_fr = &self.bank.psi(spin)[n1_fr];
                let z = self.convolve_modulus(&grid_hat, level(psi_fr, 0)?, 0)?;
                let (z, stride_fr) = self.finish_frequency(z, n_fr)?;
                let (z, stride_t) = self.finish_time(z, target)?;
                let branch = BranchOutput {
                    meta: PathMeta::new(family(spin), stride_t)
                        .with_second(n2, j2)
                        .with_frequential(n1_fr, psi_fr.j())
                        .with_stride_fr(stride_fr),
                    data: z,
                };
                match spin {
                    Spin::Up => up.push(branch),
                    Spin::Down => dn.push(branch),
                }
            }
        }
        Ok(PsiTBranch { phi_f, up, dn })
    }

    /// Zero-pad rows to the frequential grid and transform every column.
    fn stack_fourier<I>(&self, rows: I) -> ExecResult<Array2<Complex64>>
    where
        I: Iterator<Item = Vec<Complex64>>,
    {
        let rows: Vec<Vec<Complex64>> = rows.collect();
        let n_cols = rows.first().map_or(0, Vec::len);
        if rows.len() > self.scales.n_fr_pad || rows.iter().any(|r| r.len() != n_cols) {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "joint rows do not fit the padded frequential grid",
            });
        }
        let mut grid = Array2::<Complex64>::zeros((self.scales.n_fr_pad, n_cols));
        for (mut dst, src) in grid.rows_mut().into_iter().zip(&rows) {
            dst.assign(&ArrayView1::from(src.as_slice()));
        }
        for mut col in grid.columns_mut() {
            let mut buf = col.to_vec();
            self.backend().fft(&mut buf)?;
            col.assign(&ArrayView1::from(buf.as_slice()));
        }
        Ok(grid)
    }

    /// `phi_f` branch of `n_fr` rows, cropped to the rows that cover it.
    fn lowpass_frequency(
        &self,
        grid_hat: &Array2<Complex64>,
        n_fr: usize,
    ) -> ExecResult<Array2<f64>> {
        let z = self.convolve_modulus(grid_hat, level(self.bank.phi(), 0)?, self.scales.log2_f)?;
        crop_rows(z, self.scales.averaged_rows(n_fr, self.out_3d))
    }

    /// `|ifft(subsample(grid_hat * h, k))|` along frequency.
    fn convolve_modulus(
        &self,
        grid_hat: &Array2<Complex64>,
        h: &[f64],
        k: u32,
    ) -> ExecResult<Array2<f64>> {
        let mut out = Array2::<f64>::zeros((grid_hat.nrows() >> k, grid_hat.ncols()));
        for (col, mut dst) in grid_hat.columns().into_iter().zip(out.columns_mut()) {
            let mut y = col.to_vec();
            self.backend().multiply(&mut y, h)?;
            let mut y = self.backend().subsample_fourier(&y, k)?;
            self.backend().ifft(&mut y)?;
            let m = self.backend().modulus(&y);
            dst.assign(&ArrayView1::from(m.as_slice()));
        }
        Ok(out)
    }

    /// Low-pass along frequency and subsample by `2^F`, or crop to the
    /// `n_fr` valid rows.
    fn finish_frequency(
        &self,
        z: Array2<f64>,
        n_fr: usize,
    ) -> ExecResult<(Array2<f64>, u32)> {
        if !self.scales.average_fr {
            return Ok((crop_rows(z, n_fr)?, 0));
        }
        let log2_f = self.scales.log2_f;
        let phi = level(self.bank.phi(), 0)?;
        let mut out = Array2::<f64>::zeros((z.nrows() >> log2_f, z.ncols()));
        for (col, mut dst) in z.columns().into_iter().zip(out.columns_mut()) {
            let mut y = self.backend().rfft(&col.to_vec())?;
            self.backend().multiply(&mut y, phi)?;
            let y = self.backend().subsample_fourier(&y, log2_f)?;
            let mut y = self.backend().irfft(&y)?;
            y.iter_mut().for_each(|v| *v = v.max(0.0));
            dst.assign(&ArrayView1::from(y.as_slice()));
        }
        let rows = self.scales.averaged_rows(n_fr, self.out_3d);
        Ok((crop_rows(out, rows)?, log2_f))
    }

    /// Low-pass every row in time when averaging, then unpad.
    fn finish_time(&self, z: Array2<f64>, k_prev: u32) -> ExecResult<(Array2<f64>, u32)> {
        let mut stride = k_prev;
        let rows = z
            .rows()
            .into_iter()
            .map(|row| {
                let row = row.to_vec();
                if self.time.scales.average {
                    let row_hat = self.backend().rfft(&row)?;
                    let (y, s) = self.time.lowpass_modulus(&row_hat, k_prev)?;
                    stride = s;
                    self.time.unpad(&y, s)
                } else {
                    self.time.unpad(&row, k_prev)
                }
            })
            .collect::<ExecResult<Vec<_>>>()?;
        Ok((rows_to_array(rows)?, stride))
    }
}
