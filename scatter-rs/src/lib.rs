//! Wavelet scattering and joint time-frequency scattering of 1D signals.
//!
//! ```no_run
//! use scatter_rs::kernel::KernelLifecycle;
//! use scatter_rs::scattering1d::{JtfsConfig, Scatter1D, TimeFrequencyScattering1D};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let jtfs = TimeFrequencyScattering1D::try_new(JtfsConfig::new(512))?;
//! let x = vec![0.0; 512];
//! let out = jtfs.run(&x)?;
//! println!("{} paths", out.path_count());
//! # Ok(())
//! # }
//! ```

/// Constructor validation, errors and input adapters
pub mod kernel;

/// Scattering transforms
pub mod scattering1d;

pub use scatter_rs_core::backend;
pub use scatter_rs_core::num_complex;
