use std::sync::Arc;

use scatter_rs_core::backend::{Backend, BackendRegistry, Capability};
use tracing::debug;

use super::cascade::TimeCascade;
use super::config::{ensure_grouping, FrequencyScales, JtfsConfig, OutType, TimeScales};
use super::filter_bank::{
    FrequencyFilterBank, FrequencyFilterBankConfig, TimeFilterBank, TimeFilterBankConfig,
};
use super::frequential::{self, FrequentialStage};
use super::output::{flatten_info, Assembler, ScatteringOutput};
use super::path::{PathFamily, PathInfo, PathMeta};
use super::run_signals;
use super::traits::Scatter1D;
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};

/// Joint time-frequency scattering.
///
/// Filterbanks are built once at construction and shared read-only by every
/// call. The output layout and 3-D grouping may be changed afterwards
/// without rebuilding them.
#[derive(Debug, Clone)]
pub struct TimeFrequencyScattering1D {
    time: TimeScales,
    frequency: FrequencyScales,
    time_bank: Arc<TimeFilterBank>,
    frequency_bank: Arc<FrequencyFilterBank>,
    backend: Arc<dyn Backend>,
    out_type: OutType,
    out_3d: bool,
}

impl KernelLifecycle for TimeFrequencyScattering1D {
    type Config = JtfsConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        Self::with_registry(config, &BackendRegistry::builtin())
    }
}

impl TimeFrequencyScattering1D {
    /// Construct against a caller-supplied backend registry.
    pub fn with_registry(
        config: JtfsConfig,
        registry: &BackendRegistry,
    ) -> Result<Self, ConfigError> {
        let time = config.time_scales()?;
        let backend = registry.resolve(config.backend, &Capability::ALL)?;
        let time_bank = TimeFilterBank::try_new(TimeFilterBankConfig {
            n_pad: time.n_pad,
            j: time.j,
            q: time.q,
            log2_t: time.log2_t,
        })?;
        let psi1_j: Vec<u32> = time_bank.psi1().iter().map(|p| p.j()).collect();
        let psi2_j: Vec<u32> = time_bank.psi2().iter().map(|p| p.j()).collect();
        let frequency = config.frequency_scales(&psi1_j, &psi2_j)?;
        let frequency_bank = FrequencyFilterBank::try_new(FrequencyFilterBankConfig {
            n_fr_pad: frequency.n_fr_pad,
            j_fr: frequency.j_fr,
            q_fr: frequency.q_fr,
            log2_f: frequency.log2_f,
        })?;
        debug!(
            n = time.n,
            j = time.j,
            log2_t = time.log2_t,
            j_pad = time.j_pad,
            n_fr_max = frequency.n_fr_max,
            n_fr_pad = frequency.n_fr_pad,
            j_fr = frequency.j_fr,
            log2_f = frequency.log2_f,
            backend = backend.name(),
            "configured joint time-frequency scattering"
        );
        Ok(Self {
            time,
            frequency,
            time_bank: Arc::new(time_bank),
            frequency_bank: Arc::new(frequency_bank),
            backend,
            out_type: config.out_type,
            out_3d: config.out_3d,
        })
    }

    /// Temporal filterbank.
    pub fn time_filters(&self) -> &TimeFilterBank {
        &self.time_bank
    }

    /// Frequential filterbank.
    pub fn frequency_filters(&self) -> &FrequencyFilterBank {
        &self.frequency_bank
    }

    /// Validated temporal scales and padding.
    pub fn time_scales(&self) -> &TimeScales {
        &self.time
    }

    /// Validated frequential scales and padding.
    pub fn frequency_scales(&self) -> &FrequencyScales {
        &self.frequency
    }

    /// Admissible first-order rows per second-order wavelet.
    pub fn n_frs(&self) -> &[usize] {
        &self.frequency.n_frs
    }

    /// Log2 of the padded signal length.
    pub fn j_pad(&self) -> u32 {
        self.time.j_pad
    }

    /// Whether joint coefficients keep their frequency rows as an axis.
    pub fn out_3d(&self) -> bool {
        self.out_3d
    }

    /// Toggle 3-D grouping; requires frequency averaging.
    pub fn set_out_3d(&mut self, out_3d: bool) -> Result<(), ConfigError> {
        ensure_grouping(out_3d, self.frequency.average_fr)?;
        self.out_3d = out_3d;
        Ok(())
    }

    fn plan(&self) -> Vec<PathInfo> {
        let t = &self.time;
        let s0_stride = if t.average { t.k_averaged() } else { 0 };
        let mut out = vec![PathInfo {
            meta: PathMeta::new(PathFamily::S0, s0_stride),
            shape: vec![1, t.out_len(s0_stride)],
        }];
        for (n1, psi1) in self.time_bank.psi1().iter().enumerate() {
            let j1 = psi1.j();
            let k1 = t.k1(j1);
            let stride = if t.average { k1 + t.k_avg(k1) } else { k1 };
            out.push(PathInfo {
                meta: PathMeta::new(PathFamily::S1, stride).with_first(n1, j1),
                shape: vec![1, t.out_len(stride)],
            });
        }
        out.extend(frequential::plan(
            t,
            &self.frequency,
            &self.time_bank,
            &self.frequency_bank,
            self.out_3d,
        ));
        out
    }
}

impl Scatter1D for TimeFrequencyScattering1D {
    fn shape(&self) -> usize {
        self.time.n
    }

    fn out_type(&self) -> OutType {
        self.out_type
    }

    fn set_out_type(&mut self, out_type: OutType) -> Result<(), ConfigError> {
        ensure_grouping(self.out_3d, self.frequency.average_fr)?;
        self.out_type = out_type;
        Ok(())
    }

    fn meta(&self) -> Vec<PathInfo> {
        flatten_info(self.plan(), self.out_3d)
    }

    fn run_rows(&self, rows: &[&[f64]]) -> Result<ScatteringOutput, ExecInvariantViolation> {
        if rows.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "batch" }.into());
        }
        debug!(
            batch = rows.len(),
            out_type = %self.out_type,
            out_3d = self.out_3d,
            "joint time-frequency scattering forward pass"
        );
        let time = TimeCascade {
            backend: self.backend.as_ref(),
            bank: &self.time_bank,
            scales: &self.time,
        };
        let stage = FrequentialStage {
            time,
            bank: &self.frequency_bank,
            scales: &self.frequency,
            out_3d: self.out_3d,
        };
        let paths = run_signals(rows, |x| {
            let x_hat = time.pad_fourier(x)?;
            let mut out = vec![time.zeroth_order(x, &x_hat)?];
            let first = time.first_order(&x_hat)?;
            for f in &first {
                out.push(time.s1(f)?);
            }
            out.extend(stage.run(&first)?);
            Ok(out)
        })?;
        Assembler {
            backend: self.backend.as_ref(),
            out_type: self.out_type,
            out_3d: self.out_3d,
        }
        .assemble(paths)
    }
}
