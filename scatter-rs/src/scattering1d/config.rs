//! Transform configuration and the scales derived from it.

use core::fmt;
use core::str::FromStr;

use super::filter_bank::{time_support, SIGMA0};
use crate::kernel::{ceil_log2, ensure_positive, ensure_scale_fits, floor_log2, ConfigError};

/// Name of the backend used when none is requested.
pub const DEFAULT_BACKEND: &str = "rustfft";

/// Packaging of the coefficient set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutType {
    /// Ordered list of coefficient records.
    #[default]
    List,
    /// One dense array with paths along the leading axis.
    Array,
    /// Lists keyed by path family.
    DictList,
    /// Dense arrays keyed by path family.
    DictArray,
}

impl OutType {
    /// Every layout, in canonical order.
    pub const ALL: [OutType; 4] = [
        OutType::List,
        OutType::Array,
        OutType::DictList,
        OutType::DictArray,
    ];

    /// Name the layout is requested by.
    pub fn label(&self) -> &'static str {
        match self {
            OutType::List => "list",
            OutType::Array => "array",
            OutType::DictList => "dict:list",
            OutType::DictArray => "dict:array",
        }
    }

    /// True for the family-keyed layouts.
    pub fn is_dict(&self) -> bool {
        matches!(self, OutType::DictList | OutType::DictArray)
    }

    /// True for the dense-array layouts.
    pub fn is_array(&self) -> bool {
        matches!(self, OutType::Array | OutType::DictArray)
    }
}

impl fmt::Display for OutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OutType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutType::ALL
            .into_iter()
            .find(|t| t.label() == s)
            .ok_or_else(|| ConfigError::UnknownOutType { name: s.to_string() })
    }
}

/// Handling of frequential wavelets wider than the available rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrequencyBoundary {
    /// Drop wavelets whose dilation exceeds the number of rows of the branch.
    #[default]
    Prune,
    /// Keep every wavelet and convolve over the zero-padded axis.
    ZeroPad,
}

/// Configuration of plain time scattering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScatteringConfig {
    /// Signal length.
    pub shape: usize,
    /// Log2 of the largest wavelet scale; `floor(log2 N) - 2` when unset.
    pub j: Option<u32>,
    /// Wavelets per octave for first and second order.
    pub q: (u32, u32),
    /// Log2 of the averaging scale; `J` when unset.
    pub t: Option<u32>,
    /// Low-pass every order in time.
    pub average: bool,
    /// Subsample `2^oversampling` times less than critical.
    pub oversampling: u32,
    /// Cap on padding, in octaves above `ceil(log2 N)`.
    pub max_pad_factor: u32,
    /// 1 for S0 and S1 only, 2 to add S2.
    pub max_order: u8,
    /// Output layout.
    pub out_type: OutType,
    /// Backend name resolved through the registry.
    pub backend: &'static str,
}

impl ScatteringConfig {
    /// Defaults for a signal of `shape` samples.
    pub fn new(shape: usize) -> Self {
        Self {
            shape,
            j: None,
            q: (8, 1),
            t: None,
            average: true,
            oversampling: 0,
            max_pad_factor: 2,
            max_order: 2,
            out_type: OutType::List,
            backend: DEFAULT_BACKEND,
        }
    }

    /// Validate the temporal part of the configuration.
    pub fn time_scales(&self) -> Result<TimeScales, ConfigError> {
        if !(1..=2).contains(&self.max_order) {
            return Err(ConfigError::InvalidArgument {
                arg: "max_order",
                reason: "must be 1 or 2",
            });
        }
        TimeScales::resolve(
            self.shape,
            self.j,
            self.q,
            self.t,
            self.average,
            self.oversampling,
            self.max_pad_factor,
        )
    }
}

/// Configuration of joint time-frequency scattering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JtfsConfig {
    /// Signal length.
    pub shape: usize,
    /// Log2 of the largest temporal wavelet scale; `floor(log2 N) - 2` when unset.
    pub j: Option<u32>,
    /// Temporal wavelets per octave for first and second order.
    pub q: (u32, u32),
    /// Log2 of the temporal averaging scale; `J` when unset.
    pub t: Option<u32>,
    /// Low-pass joint outputs in time.
    pub average: bool,
    /// Subsample `2^oversampling` times less than critical in time.
    pub oversampling: u32,
    /// Cap on temporal padding, in octaves above `ceil(log2 N)`.
    pub max_pad_factor: u32,
    /// Log2 of the largest frequential wavelet scale; derived from the
    /// number of first-order wavelets when unset.
    pub j_fr: Option<u32>,
    /// Frequential wavelets per octave.
    pub q_fr: u32,
    /// Log2 of the frequential averaging scale; `J_fr` when unset.
    pub f: Option<u32>,
    /// Low-pass psi_f outputs along frequency.
    pub average_fr: bool,
    /// Octaves of zero padding along frequency above `ceil(log2 N_fr_max)`.
    pub pad_factor_fr: u32,
    /// Handling of frequential wavelets wider than a branch.
    pub frequency_boundary: FrequencyBoundary,
    /// Output layout.
    pub out_type: OutType,
    /// Keep the frequency rows of joint coefficients as an explicit axis.
    pub out_3d: bool,
    /// Backend name resolved through the registry.
    pub backend: &'static str,
}

impl JtfsConfig {
    /// Defaults for a signal of `shape` samples.
    pub fn new(shape: usize) -> Self {
        Self {
            shape,
            j: None,
            q: (8, 2),
            t: None,
            average: true,
            oversampling: 0,
            max_pad_factor: 2,
            j_fr: None,
            q_fr: 2,
            f: None,
            average_fr: false,
            pad_factor_fr: 1,
            frequency_boundary: FrequencyBoundary::Prune,
            out_type: OutType::List,
            out_3d: false,
            backend: DEFAULT_BACKEND,
        }
    }

    /// Validate the temporal part of the configuration.
    pub fn time_scales(&self) -> Result<TimeScales, ConfigError> {
        ensure_grouping(self.out_3d, self.average_fr)?;
        TimeScales::resolve(
            self.shape,
            self.j,
            self.q,
            self.t,
            self.average,
            self.oversampling,
            self.max_pad_factor,
        )
    }

    /// Validate the frequential part given the temporal wavelet scales.
    pub fn frequency_scales(
        &self,
        psi1_j: &[u32],
        psi2_j: &[u32],
    ) -> Result<FrequencyScales, ConfigError> {
        ensure_positive("Q_fr", self.q_fr)?;
        let n_fr_max = psi1_j.len();
        if n_fr_max == 0 {
            return Err(ConfigError::EmptyInput { arg: "psi1" });
        }
        let n_frs = psi2_j
            .iter()
            .map(|&j2| psi1_j.iter().filter(|&&j1| j1 < j2).count())
            .collect::<Vec<_>>();
        if n_frs.iter().all(|&n_fr| n_fr == 0) {
            return Err(ConfigError::InvalidArgument {
                arg: "J",
                reason: "no second-order wavelet has first-order rows to scatter along frequency",
            });
        }
        let log2_fr_pad = ceil_log2(n_fr_max)
            .checked_add(self.pad_factor_fr)
            .ok_or(ConfigError::InvalidArgument {
                arg: "pad_factor_fr",
                reason: "padding exponent overflows",
            })?;
        let n_fr_pad = padded_len("pad_factor_fr", log2_fr_pad)?;
        let j_fr = self
            .j_fr
            .unwrap_or_else(|| ceil_log2(n_fr_max).saturating_sub(2).max(1));
        ensure_positive("J_fr", j_fr)?;
        ensure_scale_fits("J_fr", j_fr, n_fr_pad)?;
        let log2_f = self.f.unwrap_or(j_fr);
        ensure_scale_fits("F", log2_f, n_fr_pad)?;
        Ok(FrequencyScales {
            n_frs,
            n_fr_max,
            j_fr,
            q_fr: self.q_fr,
            log2_f,
            average_fr: self.average_fr,
            n_fr_pad,
            boundary: self.frequency_boundary,
        })
    }
}

fn padded_len(arg: &'static str, log2: u32) -> Result<usize, ConfigError> {
    1usize.checked_shl(log2).ok_or(ConfigError::InvalidArgument {
        arg,
        reason: "padded length overflows usize",
    })
}

/// 3-D grouping needs a common frequency extent, which only frequency
/// averaging provides.
pub(crate) fn ensure_grouping(out_3d: bool, average_fr: bool) -> Result<(), ConfigError> {
    if out_3d && !average_fr {
        return Err(ConfigError::Conflict {
            reason: "out_3D requires average_fr",
        });
    }
    Ok(())
}

/// Validated temporal scales and padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeScales {
    /// Signal length.
    pub n: usize,
    /// Log2 of the largest wavelet scale.
    pub j: u32,
    /// Wavelets per octave for first and second order.
    pub q: (u32, u32),
    /// Log2 of the averaging scale.
    pub log2_t: u32,
    /// Whether outputs are low-passed in time.
    pub average: bool,
    /// Octaves of subsampling withheld.
    pub oversampling: u32,
    /// Log2 of the padded length.
    pub j_pad: u32,
    /// Padded length.
    pub n_pad: usize,
    /// Samples reflected in front of the signal.
    pub pad_left: usize,
    /// Samples reflected after the signal.
    pub pad_right: usize,
}

impl TimeScales {
    fn resolve(
        shape: usize,
        j: Option<u32>,
        q: (u32, u32),
        t: Option<u32>,
        average: bool,
        oversampling: u32,
        max_pad_factor: u32,
    ) -> Result<Self, ConfigError> {
        if shape < 2 {
            return Err(ConfigError::SignalTooShort { len: shape, min: 2 });
        }
        ensure_positive("Q1", q.0)?;
        ensure_positive("Q2", q.1)?;
        let log2_n = floor_log2(shape);
        let j = match j {
            Some(j) => j,
            None if log2_n >= 3 => log2_n - 2,
            None => return Err(ConfigError::SignalTooShort { len: shape, min: 8 }),
        };
        ensure_positive("J", j)?;
        ensure_scale_fits("J", j, shape)?;
        let log2_t = ensure_scale_fits("T", t.unwrap_or(j), shape)?;

        let sigma_low = SIGMA0 / 2f64.powi(log2_t as i32);
        let sigma_min = SIGMA0 / 2f64.powi(j as i32);
        let min_to_pad = time_support(sigma_low.min(sigma_min)) / 2;
        let ceil_n = ceil_log2(shape);
        let overflow = ConfigError::InvalidArgument {
            arg: "max_pad_factor",
            reason: "padding exponent overflows",
        };
        let pad_cap = ceil_n.checked_add(max_pad_factor).ok_or(overflow.clone())?;
        let padded = min_to_pad
            .checked_mul(2)
            .and_then(|p| p.checked_add(shape))
            .ok_or(overflow)?;
        let j_pad = ceil_log2(padded).min(pad_cap).max(ceil_n);
        let n_pad = padded_len("max_pad_factor", j_pad)?;
        let pad_left = (n_pad - shape) / 2;
        let pad_right = n_pad - shape - pad_left;

        let scales = Self {
            n: shape,
            j,
            q,
            log2_t,
            average,
            oversampling,
            j_pad,
            n_pad,
            pad_left,
            pad_right,
        };
        if scales.out_len(log2_t) == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "T",
                reason: "averaging would subsample the signal to zero samples",
            });
        }
        Ok(scales)
    }

    /// Log2 subsampling of a first-order modulus.
    pub fn k1(&self, j1: u32) -> u32 {
        j1.min(self.log2_t).saturating_sub(self.oversampling)
    }

    /// Additional log2 subsampling of a second-order modulus.
    pub fn k2(&self, j2: u32, k1: u32) -> u32 {
        j2.min(self.log2_t)
            .saturating_sub(k1 + self.oversampling)
    }

    /// Common total log2 subsampling of the rows of a joint branch.
    pub fn k_joint(&self, j2: u32) -> u32 {
        j2.min(self.log2_t).saturating_sub(self.oversampling)
    }

    /// Log2 subsampling applied by the averaging filter after `k_prev`.
    pub fn k_avg(&self, k_prev: u32) -> u32 {
        self.log2_t.saturating_sub(k_prev + self.oversampling)
    }

    /// Total log2 subsampling of averaged outputs.
    pub fn k_averaged(&self) -> u32 {
        self.log2_t.saturating_sub(self.oversampling)
    }

    /// Bounds of the signal within the padded grid at subsampling `2^k`.
    pub fn unpad_bounds(&self, k: u32) -> (usize, usize) {
        let step = 1usize << k;
        let start = self.pad_left.div_ceil(step);
        let end = (self.pad_left + self.n).div_ceil(step);
        (start, end)
    }

    /// Unpadded output length at subsampling `2^k`.
    pub fn out_len(&self, k: u32) -> usize {
        let (start, end) = self.unpad_bounds(k);
        end.saturating_sub(start)
    }
}

/// Validated frequential scales and padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyScales {
    /// Admissible first-order rows per second-order wavelet.
    pub n_frs: Vec<usize>,
    /// Number of first-order wavelets.
    pub n_fr_max: usize,
    /// Log2 of the largest frequential wavelet scale.
    pub j_fr: u32,
    /// Frequential wavelets per octave.
    pub q_fr: u32,
    /// Log2 of the frequential averaging scale.
    pub log2_f: u32,
    /// Whether psi_f outputs are low-passed along frequency.
    pub average_fr: bool,
    /// Padded frequency length.
    pub n_fr_pad: usize,
    /// Handling of wavelets wider than a branch.
    pub boundary: FrequencyBoundary,
}

impl FrequencyScales {
    /// Rows left after low-passing a branch of `n_fr` rows along frequency
    /// and subsampling by `2^F`.
    ///
    /// Rows past the real extent only hold padding and are dropped. With 3-D
    /// grouping every branch keeps the extent of the widest one so the joint
    /// coefficients stack.
    pub fn averaged_rows(&self, n_fr: usize, out_3d: bool) -> usize {
        let extent = if out_3d { self.n_fr_max } else { n_fr };
        extent.div_ceil(1usize << self.log2_f)
    }

    /// Whether a frequential wavelet of `dilation` is kept for a branch of
    /// `n_fr` rows.
    pub fn keeps(&self, dilation: f64, n_fr: usize) -> bool {
        match self.boundary {
            FrequencyBoundary::Prune => dilation <= n_fr as f64,
            FrequencyBoundary::ZeroPad => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_type_parses_every_label() {
        for t in OutType::ALL {
            assert_eq!(t.label().parse::<OutType>().expect("known label"), t);
        }
        assert_eq!(
            "dict".parse::<OutType>().expect_err("unknown label"),
            ConfigError::UnknownOutType {
                name: "dict".into()
            }
        );
    }

    #[test]
    fn default_scales_and_padding() {
        let scales = JtfsConfig::new(512).time_scales().expect("valid");
        assert_eq!(scales.j, 7);
        assert_eq!(scales.log2_t, 7);
        assert_eq!(scales.n_pad, 2048);
        assert_eq!(scales.pad_left + scales.pad_right + 512, 2048);
        assert_eq!(scales.unpad_bounds(0), (768, 1280));
        assert_eq!(scales.out_len(7), 4);
    }

    #[test]
    fn subsampling_policy() {
        let scales = TimeScales {
            oversampling: 1,
            ..JtfsConfig::new(1024).time_scales().expect("valid")
        };
        assert_eq!(scales.log2_t, 8);
        assert_eq!(scales.k1(3), 2);
        assert_eq!(scales.k1(0), 0);
        assert_eq!(scales.k2(5, 2), 2);
        assert_eq!(scales.k2(1, 0), 0);
        assert_eq!(scales.k_joint(9), 7);
        assert_eq!(scales.k_avg(2), 5);
        assert_eq!(scales.k_averaged(), 7);
    }

    #[test]
    fn length_one_is_rejected() {
        assert_eq!(
            JtfsConfig::new(1).time_scales().expect_err("too short"),
            ConfigError::SignalTooShort { len: 1, min: 2 }
        );
        assert_eq!(
            ScatteringConfig::new(4).time_scales().expect_err("no default J"),
            ConfigError::SignalTooShort { len: 4, min: 8 }
        );
    }

    #[test]
    fn oversized_scales_are_rejected() {
        let err = JtfsConfig {
            j: Some(10),
            ..JtfsConfig::new(512)
        }
        .time_scales()
        .expect_err("2^10 > 512");
        assert!(matches!(err, ConfigError::ScaleTooLarge { arg: "J", .. }));

        let err = JtfsConfig {
            t: Some(10),
            ..JtfsConfig::new(512)
        }
        .time_scales()
        .expect_err("2^10 > 512");
        assert!(matches!(err, ConfigError::ScaleTooLarge { arg: "T", .. }));
    }

    #[test]
    fn grouping_requires_frequency_averaging() {
        let err = JtfsConfig {
            out_3d: true,
            ..JtfsConfig::new(512)
        }
        .time_scales()
        .expect_err("out_3D without average_fr");
        assert_eq!(
            err,
            ConfigError::Conflict {
                reason: "out_3D requires average_fr"
            }
        );
    }

    #[test]
    fn frequency_rows_per_second_order_wavelet() {
        let config = JtfsConfig::new(512);
        let psi1_j = [0, 0, 1, 1, 2, 3];
        let psi2_j = [0, 1, 2, 4];
        let fr = config
            .frequency_scales(&psi1_j, &psi2_j)
            .expect("valid frequency scales");
        assert_eq!(fr.n_frs, vec![0, 2, 4, 6]);
        assert_eq!(fr.n_fr_pad, 16);
        assert_eq!(fr.j_fr, 1);
        assert_eq!(fr.averaged_rows(4, false), 2);
        assert_eq!(fr.averaged_rows(1, false), 1);
        assert_eq!(fr.averaged_rows(1, true), 3);
        assert!(fr.keeps(2.0, 2));
        assert!(!fr.keeps(4.0, 2));
    }

    #[test]
    fn default_frequential_scales_at_512() {
        let config = JtfsConfig::new(512);
        let psi1_j: Vec<u32> = [(0, 10), (1, 8), (2, 8), (3, 8), (4, 7), (5, 4), (6, 1)]
            .into_iter()
            .flat_map(|(j, count)| std::iter::repeat(j).take(count))
            .collect();
        let psi2_j = [0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6];
        let fr = config
            .frequency_scales(&psi1_j, &psi2_j)
            .expect("valid frequency scales");
        assert_eq!(fr.n_fr_max, 46);
        assert_eq!(fr.n_frs, vec![0, 0, 0, 0, 10, 10, 18, 18, 26, 26, 34, 34, 41, 41, 45]);
        assert_eq!(fr.n_fr_pad, 128);
        assert_eq!((fr.j_fr, fr.log2_f, fr.q_fr), (4, 4, 2));
        assert_eq!(fr.averaged_rows(46, false), 3);
        assert_eq!(fr.averaged_rows(10, false), 1);
        assert_eq!(fr.averaged_rows(10, true), 3);
    }

    #[test]
    fn frequential_transform_needs_second_order_rows() {
        let config = JtfsConfig::new(512);
        let err = config
            .frequency_scales(&[0, 0, 0], &[0, 0, 0])
            .expect_err("every j2 is at the first-order floor");
        assert!(matches!(err, ConfigError::InvalidArgument { arg: "J", .. }));
    }

    #[test]
    fn oversized_padding_factors_are_rejected() {
        let err = JtfsConfig {
            pad_factor_fr: u32::MAX,
            ..JtfsConfig::new(512)
        }
        .frequency_scales(&[0, 0, 1], &[0, 2])
        .expect_err("pad exponent overflows");
        assert!(matches!(
            err,
            ConfigError::InvalidArgument {
                arg: "pad_factor_fr",
                ..
            }
        ));

        let err = JtfsConfig {
            pad_factor_fr: 200,
            ..JtfsConfig::new(512)
        }
        .frequency_scales(&[0, 0, 1], &[0, 2])
        .expect_err("padded length overflows");
        assert!(matches!(
            err,
            ConfigError::InvalidArgument {
                arg: "pad_factor_fr",
                ..
            }
        ));

        let err = JtfsConfig {
            max_pad_factor: u32::MAX,
            ..JtfsConfig::new(512)
        }
        .time_scales()
        .expect_err("pad cap overflows");
        assert!(matches!(
            err,
            ConfigError::InvalidArgument {
                arg: "max_pad_factor",
                ..
            }
        ));
    }
}
