use core::fmt;

use scatter_rs_core::Error as BackendError;

/// Validation errors raised at transform construction or when the output
/// layout is changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required input or configuration field is empty.
    EmptyInput {
        /// Name of the argument that is empty.
        arg: &'static str,
    },
    /// A configuration argument value is invalid.
    InvalidArgument {
        /// Name of the argument.
        arg: &'static str,
        /// Human readable reason.
        reason: &'static str,
    },
    /// A scale exceeds what the signal (or frequency axis) length supports.
    ScaleTooLarge {
        /// Name of the scale argument.
        arg: &'static str,
        /// Requested log2 scale.
        requested: u32,
        /// Largest admissible log2 scale.
        max: u32,
    },
    /// Signal length is below the minimum supported by the filterbank.
    SignalTooShort {
        /// Configured signal length.
        len: usize,
        /// Minimum supported length.
        min: usize,
    },
    /// Two or more options cannot be combined.
    Conflict {
        /// Human readable reason.
        reason: &'static str,
    },
    /// Output layout name was not recognised.
    UnknownOutType {
        /// The rejected name.
        name: String,
    },
    /// A contiguous 1D slice view could not be obtained.
    NonContiguous {
        /// Name of the argument that is non-contiguous.
        arg: &'static str,
    },
    /// Input lengths did not match the required shape.
    LengthMismatch {
        /// Name of the argument.
        arg: &'static str,
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },
    /// The requested backend could not be resolved.
    Backend(BackendError),
}

impl From<BackendError> for ConfigError {
    fn from(value: BackendError) -> Self {
        Self::Backend(value)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyInput { arg } => write!(f, "Input `{arg}` was empty."),
            ConfigError::InvalidArgument { arg, reason } => {
                write!(f, "Invalid argument `{arg}`: {reason}")
            }
            ConfigError::ScaleTooLarge {
                arg,
                requested,
                max,
            } => write!(
                f,
                "Scale `{arg}` = {requested} exceeds the supported maximum {max}."
            ),
            ConfigError::SignalTooShort { len, min } => write!(
                f,
                "Signal length {len} is too short; at least {min} samples are required."
            ),
            ConfigError::Conflict { reason } => write!(f, "Conflicting arguments: {reason}"),
            ConfigError::UnknownOutType { name } => write!(
                f,
                "Unknown out_type `{name}`; expected one of list, array, dict:list, dict:array."
            ),
            ConfigError::NonContiguous { arg } => {
                write!(f, "Argument `{arg}` is not contiguous in memory.")
            }
            ConfigError::LengthMismatch { arg, expected, got } => {
                write!(
                    f,
                    "Length mismatch on `{arg}`. Expected {expected}, got {got}."
                )
            }
            ConfigError::Backend(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

/// Runtime failures of a transform call. A failed call returns no
/// coefficients at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecInvariantViolation {
    /// An execution precondition was violated.
    InvalidState {
        /// Human readable reason.
        reason: &'static str,
    },
    /// Input length mismatched the configured signal length.
    LengthMismatch {
        /// Name of the argument.
        arg: &'static str,
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },
    /// A dense-array layout was requested over non-uniform coefficient shapes.
    ShapeMismatch {
        /// Label of the family or group being packed.
        what: &'static str,
        /// Shape of the first coefficient in the group.
        expected: Vec<usize>,
        /// First shape that disagreed.
        got: Vec<usize>,
    },
    /// Failure reported by the numeric backend, passed through unchanged.
    Backend(BackendError),
    /// Adapter binding/configuration failure.
    Config(ConfigError),
}

impl From<ConfigError> for ExecInvariantViolation {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<BackendError> for ExecInvariantViolation {
    fn from(value: BackendError) -> Self {
        Self::Backend(value)
    }
}

impl fmt::Display for ExecInvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecInvariantViolation::InvalidState { reason } => {
                write!(f, "Execution invariant violation: {reason}")
            }
            ExecInvariantViolation::LengthMismatch { arg, expected, got } => {
                write!(
                    f,
                    "Execution length mismatch on `{arg}`. Expected {expected}, got {got}."
                )
            }
            ExecInvariantViolation::ShapeMismatch {
                what,
                expected,
                got,
            } => write!(
                f,
                "Cannot pack `{what}` into one array: shape {got:?} differs from {expected:?}."
            ),
            ExecInvariantViolation::Backend(err) => write!(f, "Backend failure: {err}"),
            ExecInvariantViolation::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ExecInvariantViolation {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecInvariantViolation::Backend(err) => Some(err),
            ExecInvariantViolation::Config(err) => Some(err),
            _ => None,
        }
    }
}
