//! Compiled-in backend registry
//!
//! The registry is the single source of truth for which drivers exist in
//! this build: the same descriptor list backs device-string validation,
//! sink construction and device enumeration, so the set of prefixes that
//! parse can never drift from the set of backends that dispatch.
//!
//! Membership is fixed at compile time by target and cargo-feature
//! selection; the process-wide default registry is populated once, on
//! first use.

use once_cell::sync::Lazy;

use crate::sink::SinkDescriptor;

/// Ordered, read-only set of backend descriptors
///
/// Order is priority order for enumeration: sound-server daemons first,
/// then direct-hardware backends, with the universal pseudo-sinks last.
pub struct Registry {
    entries: Vec<SinkDescriptor>,
}

impl Registry {
    /// The backend set selected for the current target and features
    pub fn platform() -> Self {
        let mut entries = Vec::new();

        #[cfg(all(target_os = "linux", feature = "pulse"))]
        entries.push(crate::sinks::pulse::DESCRIPTOR);

        #[cfg(all(target_os = "linux", feature = "alsa"))]
        entries.push(crate::sinks::alsa::DESCRIPTOR);

        #[cfg(all(target_os = "macos", feature = "coreaudio"))]
        entries.push(crate::sinks::coreaudio::DESCRIPTOR);

        // universal pseudo-sinks, present in every build
        entries.push(crate::sinks::profiler::DESCRIPTOR);
        entries.push(crate::sinks::null::DESCRIPTOR);

        Self { entries }
    }

    /// Build a registry from an explicit descriptor list
    ///
    /// For embedders (and tests) that want a backend set other than the
    /// platform default. Order is enumeration priority order.
    pub fn from_descriptors(entries: Vec<SinkDescriptor>) -> Self {
        Self { entries }
    }

    /// Descriptors in priority order
    pub fn entries(&self) -> &[SinkDescriptor] {
        &self.entries
    }

    /// Look up a backend by driver id, case-insensitive exact match
    pub fn find(&self, driver: &str) -> Option<&SinkDescriptor> {
        if driver.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| entry.driver.eq_ignore_ascii_case(driver))
    }

    /// Whether `candidate` names a compiled-in driver
    pub fn is_driver(&self, candidate: &str) -> bool {
        self.find(candidate).is_some()
    }
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::platform);

/// The process-wide default registry
pub fn global() -> &'static Registry {
    &GLOBAL
}
