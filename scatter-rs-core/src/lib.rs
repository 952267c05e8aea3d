//! Numeric backend contract for `scatter-rs`.
//!
//! The scattering kernels never call an FFT library directly. They are
//! written against [`backend::Backend`], and a concrete implementation is
//! resolved once at configuration time through [`backend::BackendRegistry`].

#![deny(missing_docs)]

pub mod backend;
mod error;

pub use error::*;

/// Complex number types shared with the FFT implementation.
pub use rustfft::num_complex;

/// Result alias for backend operations.
pub type Result<T> = core::result::Result<T, Error>;
