use super::ConfigError;

/// Constructor validation lifecycle shared by filterbanks and transforms.
///
/// Everything that can be checked without looking at a signal is checked in
/// `try_new`; a successfully constructed value never fails on configuration
/// grounds later.
pub trait KernelLifecycle: Sized {
    /// Kernel config type.
    type Config;

    /// Construct a validated kernel from config.
    fn try_new(config: Self::Config) -> Result<Self, ConfigError>;
}

/// Floor of `log2(len)`, with `len == 0` mapped to zero.
pub(crate) fn floor_log2(len: usize) -> u32 {
    if len == 0 {
        0
    } else {
        usize::BITS - 1 - len.leading_zeros()
    }
}

/// Ceiling of `log2(len)`, with `len <= 1` mapped to zero.
pub(crate) fn ceil_log2(len: usize) -> u32 {
    if len <= 1 {
        0
    } else {
        floor_log2(len - 1) + 1
    }
}

/// Reject a zero count argument such as a number of wavelets per octave.
pub(crate) fn ensure_positive(arg: &'static str, value: u32) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidArgument {
            arg,
            reason: "must be at least 1",
        });
    }
    Ok(value)
}

/// Reject a dyadic scale `2^scale` that exceeds `len` samples.
pub(crate) fn ensure_scale_fits(
    arg: &'static str,
    scale: u32,
    len: usize,
) -> Result<u32, ConfigError> {
    let max = floor_log2(len);
    if len == 0 || scale > max {
        return Err(ConfigError::ScaleTooLarge {
            arg,
            requested: scale,
            max,
        });
    }
    Ok(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct OctaveConfig {
        len: usize,
        octaves: u32,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct OctaveGrid {
        octaves: u32,
    }

    impl KernelLifecycle for OctaveGrid {
        type Config = OctaveConfig;

        fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
            let octaves = ensure_positive("J", config.octaves)?;
            ensure_scale_fits("J", octaves, config.len)?;
            Ok(Self { octaves })
        }
    }

    #[test]
    fn lifecycle_constructor_accepts_valid_config() {
        let grid = OctaveGrid::try_new(OctaveConfig {
            len: 512,
            octaves: 9,
        })
        .expect("valid config");
        assert_eq!(grid.octaves, 9);
    }

    #[test]
    fn lifecycle_constructor_rejects_oversized_scale() {
        let err = OctaveGrid::try_new(OctaveConfig {
            len: 512,
            octaves: 10,
        })
        .expect_err("2^10 > 512");
        assert_eq!(
            err,
            ConfigError::ScaleTooLarge {
                arg: "J",
                requested: 10,
                max: 9,
            }
        );
        let err = OctaveGrid::try_new(OctaveConfig { len: 8, octaves: 0 }).expect_err("zero");
        assert!(matches!(err, ConfigError::InvalidArgument { arg: "J", .. }));
    }

    #[test]
    fn integer_logs() {
        assert_eq!(floor_log2(1), 0);
        assert_eq!(floor_log2(511), 8);
        assert_eq!(floor_log2(512), 9);
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(46), 6);
        assert_eq!(ceil_log2(64), 6);
        assert_eq!(ceil_log2(65), 7);
    }
}
