//! Shared trait-first kernel substrate.
//!
//! Constructor validation, the error taxonomy, and the input adapters that
//! let every transform accept slices, vectors, and `ndarray` buffers alike.

mod errors;
mod io;
mod lifecycle;

pub use errors::*;
pub use io::*;
pub use lifecycle::KernelLifecycle;
pub(crate) use lifecycle::{ceil_log2, ensure_positive, ensure_scale_fits, floor_log2};
