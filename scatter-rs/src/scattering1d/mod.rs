//! One-dimensional scattering transforms.
//!
//! [`Scattering1D`] computes S0, S1 and optionally S2 along time.
//! [`TimeFrequencyScattering1D`] adds the joint families obtained by
//! scattering the first-order scalogram along log-frequency.

mod cascade;
mod config;
pub mod filter_bank;
mod frequential;
mod jtfs;
mod output;
mod path;
mod scattering;
mod traits;

pub use config::*;
pub use jtfs::TimeFrequencyScattering1D;
pub use output::ScatteringOutput;
pub use path::*;
pub use scattering::Scattering1D;
pub use traits::Scatter1D;

use cascade::{BranchOutput, ExecResult};
use output::{batch_paths, BatchedPath};

/// Evaluate independent branches, in parallel with the `parallel` feature.
/// Results keep the input order either way.
pub(crate) fn map_branches<T, R, F>(items: &[T], f: F) -> ExecResult<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> ExecResult<R> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        items.par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        items.iter().map(f).collect()
    }
}

/// Run `per_signal` over every row and stack the results along the batch
/// axis.
pub(crate) fn run_signals<F>(rows: &[&[f64]], per_signal: F) -> ExecResult<Vec<BatchedPath>>
where
    F: Fn(&[f64]) -> ExecResult<Vec<BranchOutput>> + Sync + Send,
{
    let outputs = map_branches(rows, |x| per_signal(x))?;
    batch_paths(outputs)
}
