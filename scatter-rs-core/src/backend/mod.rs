//! Numeric capability interface consumed by the scattering core.
//!
//! A backend supplies the handful of array primitives the scattering cascade
//! needs: forward/inverse FFT, complex modulus, Fourier-domain subsampling
//! (strided decimation), multiplication by a real Fourier filter, reflect
//! padding, and concatenation. Everything else is expressed in terms of
//! these calls.

mod registry;
mod rustfft_backend;

use core::fmt;

use ndarray::{ArrayD, ArrayViewD, Axis};
use num_traits::Zero;

use crate::num_complex::Complex64;
use crate::{Error, Result};

pub use registry::*;
pub use rustfft_backend::*;

/// One primitive of the numeric contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Forward complex FFT.
    Fft,
    /// Normalized inverse complex FFT.
    Ifft,
    /// Elementwise complex modulus.
    Modulus,
    /// Elementwise product with a real Fourier-domain filter.
    Multiply,
    /// Fourier-domain periodization, i.e. decimation in time.
    Subsample,
    /// Reflect padding and unpadding.
    Pad,
    /// Concatenation and stacking of dense arrays.
    Concatenate,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 7] = [
        Capability::Fft,
        Capability::Ifft,
        Capability::Modulus,
        Capability::Multiply,
        Capability::Subsample,
        Capability::Pad,
        Capability::Concatenate,
    ];

    /// Short human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Capability::Fft => "fft",
            Capability::Ifft => "ifft",
            Capability::Modulus => "modulus",
            Capability::Multiply => "multiply",
            Capability::Subsample => "subsample",
            Capability::Pad => "pad",
            Capability::Concatenate => "concatenate",
        }
    }
}

/// Numeric backend used by every scattering stage.
///
/// Only [`Backend::fft`] and [`Backend::ifft`] are required; the remaining
/// primitives have portable default implementations that a backend may
/// override with a faster one.
pub trait Backend: fmt::Debug + Send + Sync {
    /// Registered name of this backend.
    fn name(&self) -> &'static str;

    /// Capabilities this backend implements.
    fn capabilities(&self) -> &'static [Capability];

    /// In-place forward DFT, unnormalized.
    fn fft(&self, x: &mut [Complex64]) -> Result<()>;

    /// In-place inverse DFT, normalized by `1 / len`.
    fn ifft(&self, x: &mut [Complex64]) -> Result<()>;

    /// Forward DFT of a real sequence, returned as the full complex spectrum.
    fn rfft(&self, x: &[f64]) -> Result<Vec<Complex64>> {
        let mut buf = x.iter().map(|&v| Complex64::new(v, 0.0)).collect::<Vec<_>>();
        self.fft(&mut buf)?;
        Ok(buf)
    }

    /// Inverse DFT keeping only the real part.
    fn irfft(&self, x: &[Complex64]) -> Result<Vec<f64>> {
        let mut buf = x.to_vec();
        self.ifft(&mut buf)?;
        Ok(buf.into_iter().map(|c| c.re).collect())
    }

    /// Elementwise complex modulus.
    fn modulus(&self, x: &[Complex64]) -> Vec<f64> {
        x.iter().map(|c| c.norm()).collect()
    }

    /// Multiply a spectrum by a real Fourier-domain filter of the same length.
    fn multiply(&self, x: &mut [Complex64], filter: &[f64]) -> Result<()> {
        if x.len() != filter.len() {
            return Err(Error::Shape {
                reason: format!(
                    "spectrum has {} bins but filter has {}",
                    x.len(),
                    filter.len()
                ),
            });
        }
        x.iter_mut().zip(filter).for_each(|(v, &h)| *v *= h);
        Ok(())
    }

    /// Periodize a spectrum over `2^k` blocks, averaging them.
    ///
    /// This is the Fourier-domain counterpart of keeping every `2^k`-th
    /// sample in time.
    fn subsample_fourier(&self, x: &[Complex64], k: u32) -> Result<Vec<Complex64>> {
        let factor = 1usize << k;
        if x.is_empty() || x.len() % factor != 0 {
            return Err(Error::InvalidArg {
                arg: "k",
                reason: format!("length {} is not divisible by 2^{k}", x.len()),
            });
        }
        if k == 0 {
            return Ok(x.to_vec());
        }
        let m = x.len() / factor;
        let scale = 1.0 / factor as f64;
        let mut out = vec![Complex64::zero(); m];
        for block in x.chunks_exact(m) {
            out.iter_mut().zip(block).for_each(|(o, v)| *o += *v);
        }
        out.iter_mut().for_each(|o| *o *= scale);
        Ok(out)
    }

    /// Reflect-pad a real sequence (edge sample not repeated).
    fn pad(&self, x: &[f64], pad_left: usize, pad_right: usize) -> Result<Vec<f64>> {
        if x.len() < 2 {
            return Err(Error::InvalidArg {
                arg: "x",
                reason: "reflect padding needs at least two samples".into(),
            });
        }
        let n = x.len() as isize;
        let period = 2 * (n - 1);
        let total = x.len() + pad_left + pad_right;
        let out = (0..total)
            .map(|i| {
                let mut m = (i as isize - pad_left as isize).rem_euclid(period);
                if m >= n {
                    m = period - m;
                }
                x[m as usize]
            })
            .collect();
        Ok(out)
    }

    /// Slice `[start, end)` out of a padded sequence.
    fn unpad(&self, x: &[f64], start: usize, end: usize) -> Result<Vec<f64>> {
        if start >= end || end > x.len() {
            return Err(Error::InvalidArg {
                arg: "end",
                reason: format!("cannot unpad [{start}, {end}) from length {}", x.len()),
            });
        }
        Ok(x[start..end].to_vec())
    }

    /// Concatenate arrays along an existing axis.
    fn concatenate(&self, parts: &[ArrayViewD<'_, f64>], axis: usize) -> Result<ArrayD<f64>> {
        if parts.is_empty() {
            return Err(Error::InvalidArg {
                arg: "parts",
                reason: "nothing to concatenate".into(),
            });
        }
        ndarray::concatenate(Axis(axis), parts).map_err(|e| Error::Shape {
            reason: e.to_string(),
        })
    }

    /// Stack equally shaped arrays along a new leading axis.
    fn stack(&self, parts: &[ArrayViewD<'_, f64>]) -> Result<ArrayD<f64>> {
        if parts.is_empty() {
            return Err(Error::InvalidArg {
                arg: "parts",
                reason: "nothing to stack".into(),
            });
        }
        ndarray::stack(Axis(0), parts).map_err(|e| Error::Shape {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, IxDyn};

    #[test]
    fn reflect_pad_matches_numpy() {
        let backend = RustFftBackend::new();
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = backend.pad(&x, 2, 3).expect("pad");
        assert_eq!(y, vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn reflect_pad_wraps_more_than_once() {
        let backend = RustFftBackend::new();
        let x = [0.0, 1.0];
        let y = backend.pad(&x, 3, 3).expect("pad");
        assert_eq!(y, vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn pad_rejects_single_sample() {
        let backend = RustFftBackend::new();
        assert!(backend.pad(&[1.0], 1, 1).is_err());
    }

    #[test]
    fn subsample_fourier_matches_time_decimation() {
        let backend = RustFftBackend::new();
        let x: Vec<f64> = (0..16).map(|i| (i as f64 * 0.7).sin() + 0.1 * i as f64).collect();
        let x_hat = backend.rfft(&x).expect("rfft");
        let sub_hat = backend.subsample_fourier(&x_hat, 2).expect("subsample");
        let y = backend.irfft(&sub_hat).expect("irfft");
        let expected: Vec<f64> = x.iter().copied().step_by(4).collect();
        assert_eq!(y.len(), expected.len());
        y.iter()
            .zip(expected.iter())
            .for_each(|(a, b)| assert_abs_diff_eq!(*a, *b, epsilon = 1e-12));
    }

    #[test]
    fn subsample_fourier_rejects_indivisible_length() {
        let backend = RustFftBackend::new();
        let x = vec![Complex64::new(1.0, 0.0); 6];
        assert!(backend.subsample_fourier(&x, 2).is_err());
    }

    #[test]
    fn multiply_checks_lengths() {
        let backend = RustFftBackend::new();
        let mut x = vec![Complex64::new(1.0, 1.0); 4];
        assert!(backend.multiply(&mut x, &[1.0; 3]).is_err());
        backend
            .multiply(&mut x, &[0.0, 1.0, 2.0, 3.0])
            .expect("multiply");
        assert_eq!(x[3], Complex64::new(3.0, 3.0));
    }

    #[test]
    fn stack_and_concatenate() {
        let backend = RustFftBackend::new();
        let a = array![[1.0, 2.0]].into_dyn();
        let b = array![[3.0, 4.0]].into_dyn();
        let stacked = backend.stack(&[a.view(), b.view()]).expect("stack");
        assert_eq!(stacked.shape(), &[2, 1, 2]);
        let joined = backend
            .concatenate(&[a.view(), b.view()], 0)
            .expect("concatenate");
        assert_eq!(joined.shape(), &[2, 2]);

        let c = ArrayD::<f64>::zeros(IxDyn(&[1, 3]));
        assert!(backend.stack(&[a.view(), c.view()]).is_err());
    }
}
