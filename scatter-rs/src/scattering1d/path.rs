//! Path identifiers and coefficient records.

use core::fmt;
use core::str::FromStr;

use ndarray::ArrayD;

use super::filter_bank::Spin;
use crate::kernel::ConfigError;

/// Family a coefficient belongs to. The declaration order is the fixed
/// output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathFamily {
    /// Zeroth order: the signal low-passed in time.
    S0,
    /// First-order time scattering.
    S1,
    /// Second-order time scattering, emitted by plain time scattering only.
    S2,
    /// Low-pass in time and along frequency.
    PhiTPhiF,
    /// Low-pass in time, band-pass along frequency.
    PhiTPsiF,
    /// Band-pass in time, low-pass along frequency.
    PsiTPhiF,
    /// Band-pass in time and along positive frequential frequencies.
    PsiTPsiFUp,
    /// Band-pass in time and along negative frequential frequencies.
    PsiTPsiFDown,
}

impl PathFamily {
    /// Families emitted by joint time-frequency scattering, in output order.
    pub const JOINT_TIME_FREQUENCY: [PathFamily; 7] = [
        PathFamily::S0,
        PathFamily::S1,
        PathFamily::PhiTPhiF,
        PathFamily::PhiTPsiF,
        PathFamily::PsiTPhiF,
        PathFamily::PsiTPsiFUp,
        PathFamily::PsiTPsiFDown,
    ];

    /// Families emitted by plain time scattering, in output order.
    pub const TIME: [PathFamily; 3] = [PathFamily::S0, PathFamily::S1, PathFamily::S2];

    /// Stable human readable label used as the dictionary key.
    pub fn label(&self) -> &'static str {
        match self {
            PathFamily::S0 => "S0",
            PathFamily::S1 => "S1",
            PathFamily::S2 => "S2",
            PathFamily::PhiTPhiF => "phi_t * phi_f",
            PathFamily::PhiTPsiF => "phi_t * psi_f",
            PathFamily::PsiTPhiF => "psi_t * phi_f",
            PathFamily::PsiTPsiFUp => "psi_t * psi_f_up",
            PathFamily::PsiTPsiFDown => "psi_t * psi_f_dn",
        }
    }

    /// True for the four joint families.
    pub fn is_joint(&self) -> bool {
        !matches!(self, PathFamily::S0 | PathFamily::S1 | PathFamily::S2)
    }

    /// Frequential direction of the band-pass joint families.
    pub fn spin(&self) -> Option<Spin> {
        match self {
            PathFamily::PsiTPsiFUp | PathFamily::PhiTPsiF => Some(Spin::Up),
            PathFamily::PsiTPsiFDown => Some(Spin::Down),
            _ => None,
        }
    }

    /// Whether the output of this family is non-negative by construction.
    ///
    /// Only S0 is not: it is a low-pass of the raw signal.
    pub fn is_modulus(&self) -> bool {
        !matches!(self, PathFamily::S0)
    }
}

impl fmt::Display for PathFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PathFamily {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PathFamily::JOINT_TIME_FREQUENCY
            .into_iter()
            .chain([PathFamily::S2])
            .find(|f| f.label() == s)
            .ok_or(ConfigError::InvalidArgument {
                arg: "family",
                reason: "unknown path family label",
            })
    }
}

/// Identifier and stride metadata of one emitted path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathMeta {
    /// Family, including the frequential direction.
    pub family: PathFamily,
    /// Index into the first-order wavelets.
    pub n1: Option<usize>,
    /// Index into the second-order wavelets.
    pub n2: Option<usize>,
    /// Index into the frequential wavelets.
    pub n1_fr: Option<usize>,
    /// Frequency row, when joint coefficients are flattened.
    pub row: Option<usize>,
    /// Scale of the first-order wavelet.
    pub j1: Option<u32>,
    /// Scale of the second-order wavelet.
    pub j2: Option<u32>,
    /// Scale of the frequential wavelet.
    pub j_fr: Option<u32>,
    /// Log2 temporal subsampling.
    pub stride_t: u32,
    /// Log2 frequential subsampling, joint families only.
    pub stride_fr: Option<u32>,
}

impl PathMeta {
    pub(crate) fn new(family: PathFamily, stride_t: u32) -> Self {
        Self {
            family,
            n1: None,
            n2: None,
            n1_fr: None,
            row: None,
            j1: None,
            j2: None,
            j_fr: None,
            stride_t,
            stride_fr: None,
        }
    }

    pub(crate) fn with_first(mut self, n1: usize, j1: u32) -> Self {
        self.n1 = Some(n1);
        self.j1 = Some(j1);
        self
    }

    pub(crate) fn with_second(mut self, n2: usize, j2: u32) -> Self {
        self.n2 = Some(n2);
        self.j2 = Some(j2);
        self
    }

    pub(crate) fn with_frequential(mut self, n1_fr: usize, j_fr: u32) -> Self {
        self.n1_fr = Some(n1_fr);
        self.j_fr = Some(j_fr);
        self
    }

    pub(crate) fn with_stride_fr(mut self, stride_fr: u32) -> Self {
        self.stride_fr = Some(stride_fr);
        self
    }

    pub(crate) fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}

/// One emitted coefficient: its path and the tensor, batch axis first.
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficient {
    /// Path identifier and stride metadata.
    pub meta: PathMeta,
    /// `(batch, time)`, or `(batch, freq, time)` for grouped joint paths.
    pub coef: ArrayD<f64>,
}

/// Path metadata with the per-signal shape of its tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    /// Path identifier and stride metadata.
    pub meta: PathMeta,
    /// Tensor shape without the batch axis.
    pub shape: Vec<usize>,
}
