use std::sync::Arc;

use scatter_rs_core::backend::{Backend, BackendRegistry, Capability};
use tracing::debug;

use super::cascade::TimeCascade;
use super::config::{OutType, ScatteringConfig, TimeScales};
use super::filter_bank::{TimeFilterBank, TimeFilterBankConfig};
use super::output::{flatten_info, Assembler, ScatteringOutput};
use super::path::{PathFamily, PathInfo, PathMeta};
use super::run_signals;
use super::traits::Scatter1D;
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};

/// Time scattering: S0, S1 and, with `max_order = 2`, S2.
#[derive(Debug, Clone)]
pub struct Scattering1D {
    scales: TimeScales,
    max_order: u8,
    out_type: OutType,
    bank: Arc<TimeFilterBank>,
    backend: Arc<dyn Backend>,
}

impl KernelLifecycle for Scattering1D {
    type Config = ScatteringConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        Self::with_registry(config, &BackendRegistry::builtin())
    }
}

impl Scattering1D {
    /// Construct against a caller-supplied backend registry.
    pub fn with_registry(
        config: ScatteringConfig,
        registry: &BackendRegistry,
    ) -> Result<Self, ConfigError> {
        let scales = config.time_scales()?;
        let backend = registry.resolve(config.backend, &Capability::ALL)?;
        let bank = TimeFilterBank::try_new(TimeFilterBankConfig {
            n_pad: scales.n_pad,
            j: scales.j,
            q: scales.q,
            log2_t: scales.log2_t,
        })?;
        debug!(
            n = scales.n,
            j = scales.j,
            log2_t = scales.log2_t,
            j_pad = scales.j_pad,
            max_order = config.max_order,
            backend = backend.name(),
            "configured time scattering"
        );
        Ok(Self {
            scales,
            max_order: config.max_order,
            out_type: config.out_type,
            bank: Arc::new(bank),
            backend,
        })
    }

    /// Temporal filterbank.
    pub fn filters(&self) -> &TimeFilterBank {
        &self.bank
    }

    /// Validated temporal scales and padding.
    pub fn scales(&self) -> &TimeScales {
        &self.scales
    }

    /// Highest scattering order computed.
    pub fn max_order(&self) -> u8 {
        self.max_order
    }

    fn plan(&self) -> Vec<PathInfo> {
        let s = &self.scales;
        let mut out = Vec::new();
        let s0_stride = if s.average { s.k_averaged() } else { 0 };
        out.push(PathInfo {
            meta: PathMeta::new(PathFamily::S0, s0_stride),
            shape: vec![1, s.out_len(s0_stride)],
        });
        for (n1, psi1) in self.bank.psi1().iter().enumerate() {
            let j1 = psi1.j();
            let k1 = s.k1(j1);
            let stride = if s.average { k1 + s.k_avg(k1) } else { k1 };
            out.push(PathInfo {
                meta: PathMeta::new(PathFamily::S1, stride).with_first(n1, j1),
                shape: vec![1, s.out_len(stride)],
            });
        }
        if self.max_order < 2 {
            return out;
        }
        for (n1, psi1) in self.bank.psi1().iter().enumerate() {
            let j1 = psi1.j();
            let k1 = s.k1(j1);
            for (n2, psi2) in self.bank.psi2().iter().enumerate() {
                let j2 = psi2.j();
                if j2 <= j1 {
                    continue;
                }
                let k_prev = k1 + s.k2(j2, k1);
                let stride = if s.average {
                    k_prev + s.k_avg(k_prev)
                } else {
                    k_prev
                };
                out.push(PathInfo {
                    meta: PathMeta::new(PathFamily::S2, stride)
                        .with_first(n1, j1)
                        .with_second(n2, j2),
                    shape: vec![1, s.out_len(stride)],
                });
            }
        }
        out
    }
}

impl Scatter1D for Scattering1D {
    fn shape(&self) -> usize {
        self.scales.n
    }

    fn out_type(&self) -> OutType {
        self.out_type
    }

    fn set_out_type(&mut self, out_type: OutType) -> Result<(), ConfigError> {
        self.out_type = out_type;
        Ok(())
    }

    fn meta(&self) -> Vec<PathInfo> {
        flatten_info(self.plan(), false)
    }

    fn run_rows(&self, rows: &[&[f64]]) -> Result<ScatteringOutput, ExecInvariantViolation> {
        if rows.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "batch" }.into());
        }
        debug!(
            batch = rows.len(),
            out_type = %self.out_type,
            "time scattering forward pass"
        );
        let cascade = TimeCascade {
            backend: self.backend.as_ref(),
            bank: &self.bank,
            scales: &self.scales,
        };
        let paths = run_signals(rows, |x| {
            let x_hat = cascade.pad_fourier(x)?;
            let mut out = vec![cascade.zeroth_order(x, &x_hat)?];
            let first = cascade.first_order(&x_hat)?;
            for f in &first {
                out.push(cascade.s1(f)?);
            }
            if self.max_order >= 2 {
                out.extend(cascade.second_order(&first)?);
            }
            Ok(out)
        })?;
        Assembler {
            backend: self.backend.as_ref(),
            out_type: self.out_type,
            out_3d: false,
        }
        .assemble(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::Rng;

    fn noise(n: usize) -> Vec<f64> {
        let mut rng = rand::rng();
        (0..n).map(|_| rng.random_range(-1.0..1.0)).collect()
    }

    #[test]
    fn list_matches_meta_table() {
        let sc = Scattering1D::try_new(ScatteringConfig::new(256)).expect("valid config");
        let ScatteringOutput::List(list) = sc.run(&noise(256)).expect("run") else {
            panic!("expected list output");
        };
        let meta = sc.meta();
        assert_eq!(list.len(), meta.len());
        for (c, info) in list.iter().zip(&meta) {
            assert_eq!(c.meta, info.meta);
            assert_eq!(&c.coef.shape()[1..], info.shape.as_slice());
        }
        assert!(list.iter().any(|c| c.meta.family == PathFamily::S2));
    }

    #[test]
    fn first_order_only_and_array_layout() {
        let mut sc = Scattering1D::try_new(ScatteringConfig {
            max_order: 1,
            out_type: OutType::Array,
            ..ScatteringConfig::new(256)
        })
        .expect("valid config");
        let batch =
            Array2::from_shape_fn((3, 256), |(b, t)| ((b + 1) as f64 * t as f64 * 0.05).sin());
        let ScatteringOutput::Array(array) = sc.run_batch(&batch).expect("run") else {
            panic!("expected array output");
        };
        assert_eq!(array.shape()[0], 1 + sc.filters().psi1().len());
        assert_eq!(array.shape()[1], 3);

        sc.set_out_type(OutType::DictList).expect("layout change");
        let ScatteringOutput::DictList(map) = sc.run_batch(&batch).expect("run") else {
            panic!("expected dict:list output");
        };
        assert_eq!(
            map.keys().copied().collect::<Vec<_>>(),
            vec![PathFamily::S0, PathFamily::S1]
        );
    }

    #[test]
    fn unaveraged_array_is_a_shape_mismatch() {
        let sc = Scattering1D::try_new(ScatteringConfig {
            average: false,
            out_type: OutType::Array,
            ..ScatteringConfig::new(128)
        })
        .expect("valid config");
        let err = sc.run(&noise(128)).expect_err("ragged S1 lengths");
        assert!(matches!(err, ExecInvariantViolation::ShapeMismatch { .. }));
    }

    #[test]
    fn invalid_order_and_backend_are_config_errors() {
        let err = Scattering1D::try_new(ScatteringConfig {
            max_order: 3,
            ..ScatteringConfig::new(256)
        })
        .expect_err("order 3");
        assert!(matches!(err, ConfigError::InvalidArgument { arg: "max_order", .. }));

        let err = Scattering1D::try_new(ScatteringConfig {
            backend: "torch",
            ..ScatteringConfig::new(256)
        })
        .expect_err("unknown backend");
        assert!(matches!(err, ConfigError::Backend(_)));
    }
}
