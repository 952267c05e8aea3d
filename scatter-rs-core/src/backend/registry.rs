use std::sync::Arc;

use super::{Backend, Capability, RustFftBackend};
use crate::{Error, Result};

/// Static description of a constructible backend.
#[derive(Debug, Clone, Copy)]
pub struct BackendEntry {
    /// Name the backend is requested by.
    pub name: &'static str,
    /// Capability set the backend provides.
    pub capabilities: &'static [Capability],
    /// Constructor.
    pub construct: fn() -> Arc<dyn Backend>,
}

impl BackendEntry {
    /// First capability of `required` this entry lacks, if any.
    pub fn missing(&self, required: &[Capability]) -> Option<Capability> {
        required
            .iter()
            .copied()
            .find(|cap| !self.capabilities.contains(cap))
    }
}

fn construct_rustfft() -> Arc<dyn Backend> {
    Arc::new(RustFftBackend::new())
}

const BUILTIN: [BackendEntry; 1] = [BackendEntry {
    name: RustFftBackend::NAME,
    capabilities: &Capability::ALL,
    construct: construct_rustfft,
}];

/// Name-to-constructor mapping, resolved once when a transform is configured.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    entries: Vec<BackendEntry>,
}

impl BackendRegistry {
    /// Registry holding the backends compiled into this crate.
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN.to_vec(),
        }
    }

    /// Add `entry`, replacing any entry registered under the same name.
    pub fn register(&mut self, entry: BackendEntry) {
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Registered backend names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    /// Look up `name` and construct it, validating the capability set first.
    pub fn resolve(&self, name: &str, required: &[Capability]) -> Result<Arc<dyn Backend>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::UnknownBackend {
                name: name.to_string(),
            })?;
        if let Some(capability) = entry.missing(required) {
            return Err(Error::MissingCapability {
                backend: entry.name,
                capability,
            });
        }
        Ok((entry.construct)())
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn construct_partial() -> Arc<dyn Backend> {
        Arc::new(RustFftBackend::new())
    }

    #[test]
    fn builtin_resolves_rustfft() {
        let registry = BackendRegistry::builtin();
        let backend = registry
            .resolve("rustfft", &Capability::ALL)
            .expect("builtin backend");
        assert_eq!(backend.name(), "rustfft");
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["rustfft"]);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = BackendRegistry::builtin()
            .resolve("cupy", &Capability::ALL)
            .expect_err("unknown backend");
        assert_eq!(
            err,
            Error::UnknownBackend {
                name: "cupy".into()
            }
        );
    }

    #[test]
    fn missing_capability_is_a_validation_error() {
        let mut registry = BackendRegistry::builtin();
        registry.register(BackendEntry {
            name: "fft-only",
            capabilities: &[Capability::Fft, Capability::Ifft],
            construct: construct_partial,
        });
        let err = registry
            .resolve("fft-only", &Capability::ALL)
            .expect_err("capability check");
        assert_eq!(
            err,
            Error::MissingCapability {
                backend: "fft-only",
                capability: Capability::Modulus,
            }
        );
        assert!(registry
            .resolve("fft-only", &[Capability::Fft])
            .is_ok());
    }

    #[test]
    fn register_replaces_same_name() {
        let mut registry = BackendRegistry::builtin();
        registry.register(BackendEntry {
            name: "rustfft",
            capabilities: &[Capability::Fft],
            construct: construct_partial,
        });
        assert_eq!(registry.names().count(), 1);
        assert!(registry.resolve("rustfft", &Capability::ALL).is_err());
    }
}
