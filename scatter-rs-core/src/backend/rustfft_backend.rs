use std::sync::{Arc, Mutex};

use num_traits::Zero;
use rustfft::{Fft, FftPlanner};

use super::{Backend, Capability};
use crate::num_complex::Complex64;
use crate::{Error, Result};

/// Backend over [`rustfft`], caching plans across calls.
pub struct RustFftBackend {
    planner: Mutex<FftPlanner<f64>>,
}

impl RustFftBackend {
    /// Registered name.
    pub const NAME: &'static str = "rustfft";

    /// Create a backend with an empty plan cache.
    pub fn new() -> Self {
        Self {
            planner: Mutex::new(FftPlanner::new()),
        }
    }

    fn plan(&self, len: usize, inverse: bool) -> Result<Arc<dyn Fft<f64>>> {
        let mut planner = self.planner.lock().map_err(|_| Error::InvalidArg {
            arg: "planner",
            reason: "fft planner lock poisoned".into(),
        })?;
        Ok(if inverse {
            planner.plan_fft_inverse(len)
        } else {
            planner.plan_fft_forward(len)
        })
    }

    fn process(&self, x: &mut [Complex64], inverse: bool) -> Result<()> {
        if x.is_empty() {
            return Err(Error::InvalidArg {
                arg: "x",
                reason: "cannot transform an empty buffer".into(),
            });
        }
        let fft = self.plan(x.len(), inverse)?;
        let mut scratch = vec![Complex64::zero(); fft.get_inplace_scratch_len()];
        fft.process_with_scratch(x, &mut scratch);
        Ok(())
    }
}

impl Default for RustFftBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for RustFftBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RustFftBackend").finish_non_exhaustive()
    }
}

impl Backend for RustFftBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> &'static [Capability] {
        &Capability::ALL
    }

    fn fft(&self, x: &mut [Complex64]) -> Result<()> {
        self.process(x, false)
    }

    fn ifft(&self, x: &mut [Complex64]) -> Result<()> {
        self.process(x, true)?;
        let scale = 1.0 / x.len() as f64;
        x.iter_mut().for_each(|v| *v *= scale);
        Ok(())
    }
}
