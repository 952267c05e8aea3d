use core::{error, fmt};

use crate::backend::Capability;

/// Errors raised by numeric backends and the backend registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Argument passed into a backend routine was invalid.
    InvalidArg {
        /// The invalid arg
        arg: &'static str,
        /// Explaining why arg is invalid.
        reason: String,
    },
    /// Operand lengths or shapes did not line up.
    Shape {
        /// Explaining which operands disagree.
        reason: String,
    },
    /// A backend was resolved for work it cannot perform.
    MissingCapability {
        /// Registered backend name.
        backend: &'static str,
        /// First capability found missing.
        capability: Capability,
    },
    /// No backend is registered under the requested name.
    UnknownBackend {
        /// Requested name.
        name: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArg { arg, reason } => write!(f, "Invalid argument `{arg}`: {reason}"),
            Error::Shape { reason } => write!(f, "Shape error: {reason}"),
            Error::MissingCapability {
                backend,
                capability,
            } => write!(
                f,
                "Backend `{backend}` does not provide the `{}` capability.",
                capability.label()
            ),
            Error::UnknownBackend { name } => write!(f, "No backend registered as `{name}`."),
        }
    }
}

impl error::Error for Error {}
