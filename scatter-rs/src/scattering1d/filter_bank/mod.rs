//! Time and frequency Morlet filterbanks.
//!
//! Filters are real-valued Fourier-domain samples on the padded grid. Each
//! filter keeps its periodized copy at every subsampling level the cascade
//! will visit, so convolution at resolution `2^-k` is a single pointwise
//! product.

mod morlet;
mod params;

use tracing::debug;

pub use morlet::{gauss_1d, morlet_1d, periodize_filter_fourier, reflect_fourier};
pub use params::*;

use crate::kernel::{ensure_positive, ConfigError, KernelLifecycle};

/// Axis a filter convolves along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Temporal axis.
    Time,
    /// Log-frequency axis of the first-order scalogram.
    Frequency,
}

/// Low-pass or band-pass response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// Gaussian averaging filter `phi`.
    LowPass,
    /// Analytic Morlet wavelet `psi`.
    BandPass,
}

/// Direction of a frequential band-pass filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Spin {
    /// Positive frequential frequencies.
    Up,
    /// Negative frequential frequencies.
    Down,
}

/// One immutable filter with its Fourier samples at every subsampling level.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    domain: Domain,
    kind: FilterKind,
    spin: Option<Spin>,
    j: u32,
    xi: f64,
    sigma: f64,
    dilation: f64,
    support: usize,
    levels: Vec<Vec<f64>>,
}

impl Filter {
    fn new(
        domain: Domain,
        kind: FilterKind,
        spin: Option<Spin>,
        band: BandParams,
        full: Vec<f64>,
        max_level: u32,
    ) -> Self {
        let levels = (0..=max_level)
            .map(|k| periodize_filter_fourier(&full, k))
            .collect();
        Self {
            domain,
            kind,
            spin,
            j: band.j,
            xi: band.xi,
            sigma: band.sigma,
            dilation: band.dilation,
            support: time_support(band.sigma),
            levels,
        }
    }

    fn reflected(&self) -> Self {
        Self {
            spin: Some(Spin::Down),
            levels: self.levels.iter().map(|h| reflect_fourier(h)).collect(),
            ..self.clone()
        }
    }

    /// Axis the filter convolves along.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Low-pass or band-pass.
    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Direction, for frequential band-pass filters only.
    pub fn spin(&self) -> Option<Spin> {
        self.spin
    }

    /// Log2 of the critical subsampling of the filter output.
    pub fn j(&self) -> u32 {
        self.j
    }

    /// Centre frequency in cycles per sample.
    pub fn xi(&self) -> f64 {
        self.xi
    }

    /// Gaussian bandwidth in cycles per sample.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Bandwidth of the mother wavelet over this filter's bandwidth.
    pub fn dilation(&self) -> f64 {
        self.dilation
    }

    /// Effective support in samples.
    pub fn support(&self) -> usize {
        self.support
    }

    /// Length of the full-resolution Fourier grid.
    pub fn len(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// True when the filter holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deepest stored subsampling level.
    pub fn max_level(&self) -> u32 {
        self.levels.len().saturating_sub(1) as u32
    }

    /// Fourier samples seen by a signal subsampled by `2^level`.
    pub fn fourier(&self, level: u32) -> Option<&[f64]> {
        self.levels.get(level as usize).map(Vec::as_slice)
    }
}

/// Parameters of the temporal filterbank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFilterBankConfig {
    /// Padded signal length; a power of two.
    pub n_pad: usize,
    /// Log2 of the largest wavelet scale.
    pub j: u32,
    /// Wavelets per octave for first and second order.
    pub q: (u32, u32),
    /// Log2 of the averaging scale.
    pub log2_t: u32,
}

/// `phi_t`, the first-order wavelets `psi1` and the second-order wavelets
/// `psi2`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeFilterBank {
    phi: Filter,
    psi1: Vec<Filter>,
    psi2: Vec<Filter>,
    n_pad: usize,
}

impl KernelLifecycle for TimeFilterBank {
    type Config = TimeFilterBankConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        let TimeFilterBankConfig {
            n_pad,
            j,
            q,
            log2_t,
        } = config;
        ensure_positive("Q1", q.0)?;
        ensure_positive("Q2", q.1)?;
        if !n_pad.is_power_of_two() || n_pad < 2 {
            return Err(ConfigError::InvalidArgument {
                arg: "n_pad",
                reason: "padded length must be a power of two",
            });
        }
        let j_pad = n_pad.trailing_zeros();
        if log2_t > j_pad {
            return Err(ConfigError::ScaleTooLarge {
                arg: "T",
                requested: log2_t,
                max: j_pad,
            });
        }
        let max_level = log2_t;
        let sigma_min = SIGMA0 / 2f64.powi(j as i32);
        let sigma_low = SIGMA0 / 2f64.powi(log2_t as i32);

        let phi = Filter::new(
            Domain::Time,
            FilterKind::LowPass,
            None,
            BandParams {
                xi: 0.0,
                sigma: sigma_low,
                j: log2_t,
                dilation: 1.0,
            },
            gauss_1d(n_pad, sigma_low),
            max_level,
        );
        let build = |q: u32| -> Vec<Filter> {
            compute_params_filterbank(sigma_min, q)
                .into_iter()
                .map(|band| {
                    Filter::new(
                        Domain::Time,
                        FilterKind::BandPass,
                        None,
                        band,
                        morlet_1d(n_pad, band.xi, band.sigma),
                        max_level,
                    )
                })
                .collect()
        };
        let psi1 = build(q.0);
        let psi2 = build(q.1);
        debug!(
            n_pad,
            j,
            q1 = q.0,
            q2 = q.1,
            log2_t,
            n_psi1 = psi1.len(),
            n_psi2 = psi2.len(),
            "built time filterbank"
        );
        Ok(Self {
            phi,
            psi1,
            psi2,
            n_pad,
        })
    }
}

impl TimeFilterBank {
    /// Low-pass averaging filter.
    pub fn phi(&self) -> &Filter {
        &self.phi
    }

    /// First-order wavelets, highest centre frequency first.
    pub fn psi1(&self) -> &[Filter] {
        &self.psi1
    }

    /// Second-order wavelets, highest centre frequency first.
    pub fn psi2(&self) -> &[Filter] {
        &self.psi2
    }

    /// Padded length the filters are sampled on.
    pub fn n_pad(&self) -> usize {
        self.n_pad
    }
}

/// Parameters of the frequential filterbank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyFilterBankConfig {
    /// Padded length of the frequency axis; a power of two.
    pub n_fr_pad: usize,
    /// Log2 of the largest frequential wavelet scale.
    pub j_fr: u32,
    /// Frequential wavelets per octave.
    pub q_fr: u32,
    /// Log2 of the frequential averaging scale.
    pub log2_f: u32,
}

/// `phi_f` and the frequential wavelets in both directions.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyFilterBank {
    phi: Filter,
    psi_up: Vec<Filter>,
    psi_dn: Vec<Filter>,
    n_fr_pad: usize,
}

impl KernelLifecycle for FrequencyFilterBank {
    type Config = FrequencyFilterBankConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        let FrequencyFilterBankConfig {
            n_fr_pad,
            j_fr,
            q_fr,
            log2_f,
        } = config;
        ensure_positive("Q_fr", q_fr)?;
        if !n_fr_pad.is_power_of_two() {
            return Err(ConfigError::InvalidArgument {
                arg: "n_fr_pad",
                reason: "padded frequency length must be a power of two",
            });
        }
        let max = n_fr_pad.trailing_zeros();
        if j_fr > max {
            return Err(ConfigError::ScaleTooLarge {
                arg: "J_fr",
                requested: j_fr,
                max,
            });
        }
        if log2_f > max {
            return Err(ConfigError::ScaleTooLarge {
                arg: "F",
                requested: log2_f,
                max,
            });
        }
        let sigma_low = SIGMA0 / 2f64.powi(log2_f as i32);
        let sigma_min = SIGMA0 / 2f64.powi(j_fr as i32);

        let phi = Filter::new(
            Domain::Frequency,
            FilterKind::LowPass,
            None,
            BandParams {
                xi: 0.0,
                sigma: sigma_low,
                j: log2_f,
                dilation: 1.0,
            },
            gauss_1d(n_fr_pad, sigma_low),
            0,
        );
        let psi_up: Vec<Filter> = compute_params_filterbank(sigma_min, q_fr)
            .into_iter()
            .map(|band| {
                Filter::new(
                    Domain::Frequency,
                    FilterKind::BandPass,
                    Some(Spin::Up),
                    band,
                    morlet_1d(n_fr_pad, band.xi, band.sigma),
                    0,
                )
            })
            .collect();
        let psi_dn = psi_up.iter().map(Filter::reflected).collect();
        debug!(
            n_fr_pad,
            j_fr,
            q_fr,
            log2_f,
            n_psi_fr = psi_up.len(),
            "built frequential filterbank"
        );
        Ok(Self {
            phi,
            psi_up,
            psi_dn,
            n_fr_pad,
        })
    }
}

impl FrequencyFilterBank {
    /// Frequential low-pass filter.
    pub fn phi(&self) -> &Filter {
        &self.phi
    }

    /// Wavelets keeping positive frequential frequencies.
    pub fn psi_up(&self) -> &[Filter] {
        &self.psi_up
    }

    /// Reflections of [`Self::psi_up`].
    pub fn psi_dn(&self) -> &[Filter] {
        &self.psi_dn
    }

    /// Wavelets of one direction.
    pub fn psi(&self, spin: Spin) -> &[Filter] {
        match spin {
            Spin::Up => &self.psi_up,
            Spin::Down => &self.psi_dn,
        }
    }

    /// Padded frequency length the filters are sampled on.
    pub fn n_fr_pad(&self) -> usize {
        self.n_fr_pad
    }
}
