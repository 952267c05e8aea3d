use super::config::OutType;
use super::output::ScatteringOutput;
use super::path::PathInfo;
use crate::kernel::{ConfigError, ExecInvariantViolation, Read1D, ReadBatch};

/// Trait-first capability shared by the 1D scattering frontends.
///
/// Implementors only provide [`Scatter1D::run_rows`]; the adapters for
/// single signals and batches are derived from it.
pub trait Scatter1D {
    /// Configured signal length.
    fn shape(&self) -> usize;

    /// Current output layout.
    fn out_type(&self) -> OutType;

    /// Change the output layout without rebuilding filters.
    fn set_out_type(&mut self, out_type: OutType) -> Result<(), ConfigError>;

    /// Every emitted path in output order, with its per-signal shape.
    fn meta(&self) -> Vec<PathInfo>;

    /// Transform a batch of equal-length signals.
    fn run_rows(&self, rows: &[&[f64]]) -> Result<ScatteringOutput, ExecInvariantViolation>;

    /// Transform one signal; tensors carry a batch axis of length one.
    fn run<I>(&self, input: &I) -> Result<ScatteringOutput, ExecInvariantViolation>
    where
        I: Read1D<f64> + ?Sized,
    {
        let x = input.read_slice()?;
        self.run_rows(&[x])
    }

    /// Transform a batch given as rows of a 2D buffer or a list of signals.
    fn run_batch<B>(&self, input: &B) -> Result<ScatteringOutput, ExecInvariantViolation>
    where
        B: ReadBatch<f64> + ?Sized,
    {
        let rows = input.read_rows()?;
        self.run_rows(&rows)
    }
}
