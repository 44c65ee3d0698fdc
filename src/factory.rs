//! Sink resolution and device enumeration
//!
//! The factory turns a `"[DRIVER:]path"` device string into a live,
//! initialized [`Sink`], and walks the registry to aggregate available
//! output devices. Both entry points surface only presence or absence;
//! failure detail stays in the log layer.

use tracing::debug;

use crate::registry::{self, Registry};
use crate::sink::Sink;
use crate::types::{AudioFormat, SinkInfo};

/// Deinitializes and destroys a constructed sink unless it is disarmed
///
/// Covers every exit path of `try_sink`, including a panic inside the
/// backend's initialize, so no partially-initialized instance can leak.
struct Rollback(Option<Box<dyn Sink>>);

impl Rollback {
    fn arm(sink: Box<dyn Sink>) -> Self {
        Self(Some(sink))
    }

    fn initialize(&mut self, format: &mut AudioFormat, device: &str) -> crate::error::Result<()> {
        match self.0.as_deref_mut() {
            Some(sink) => sink.initialize(format, device),
            None => Err(crate::error::SinkError::Other(
                "sink already released".to_string(),
            )),
        }
    }

    fn disarm(mut self) -> Option<Box<dyn Sink>> {
        self.0.take()
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        if let Some(mut sink) = self.0.take() {
            sink.deinitialize();
        }
    }
}

impl Registry {
    /// Split a device string into (driver id, device path)
    ///
    /// The prefix before the first `:` selects a backend only if its
    /// uppercased form exactly matches a registered driver. An
    /// unrecognized prefix is not an error: the whole string is returned
    /// as the device path with an empty driver. Infallible.
    pub fn parse_device<'a>(&self, device: &'a str) -> (String, &'a str) {
        match device.find(':') {
            Some(pos) if pos > 0 => {
                let candidate = device[..pos].to_ascii_uppercase();
                if self.is_driver(&candidate) {
                    (candidate, &device[pos + 1..])
                } else {
                    (String::new(), device)
                }
            }
            _ => (String::new(), device),
        }
    }

    /// Attempt to bring up one backend for the given device path
    ///
    /// Constructs the backend matching `driver`, then initializes it. On
    /// failure the instance is deinitialized and destroyed before this
    /// returns; on success `format` holds the negotiated configuration
    /// and ownership of the handle transfers to the caller.
    pub fn try_sink(
        &self,
        driver: &str,
        device: &str,
        format: &mut AudioFormat,
    ) -> Option<Box<dyn Sink>> {
        let entry = self.find(driver)?;

        let mut guard = Rollback::arm((entry.construct)());
        match guard.initialize(format, device) {
            Ok(()) => guard.disarm(),
            Err(err) => {
                debug!("{} sink rejected device {:?}: {}", entry.name, device, err);
                None
            }
        }
    }

    /// Resolve a `"[DRIVER:]path"` device string into a live sink
    ///
    /// Exactly one attempt against the named backend; there is no
    /// fallback chain. On success `desired` is overwritten with the
    /// negotiated format; on failure it is left untouched and `None` is
    /// returned.
    pub fn create(&self, device: &str, desired: &mut AudioFormat) -> Option<Box<dyn Sink>> {
        let (driver, path) = self.parse_device(device);

        // negotiate on a working copy so a failed attempt cannot leak a
        // half-rewritten format back to the caller
        let mut working = desired.clone();
        let sink = self.try_sink(&driver, path, &mut working)?;
        *desired = working;
        Some(sink)
    }

    /// Aggregate available output devices across all registered backends
    ///
    /// Backends are queried in registry priority order; empty
    /// contributions are omitted. When an exclusive sound-server daemon
    /// reports at least one device, enumeration stops there and the
    /// direct-hardware backends behind it are never queried. Never fails.
    pub fn enumerate(&self, force: bool) -> Vec<SinkInfo> {
        let mut list = Vec::new();

        for entry in self.entries() {
            let mut devices = Vec::new();
            (entry.enumerate)(&mut devices, force);
            if devices.is_empty() {
                continue;
            }

            let owns_hardware = entry.exclusive_daemon;
            list.push(SinkInfo {
                sink_name: entry.name.to_string(),
                devices,
            });

            // the sound server holds the hardware; probing ALSA/OSS-style
            // backends behind it would only double-report or wake devices
            if owns_hardware {
                break;
            }
        }

        list
    }
}

/// Resolve a device string against the platform registry
///
/// See [`Registry::create`].
pub fn create(device: &str, desired: &mut AudioFormat) -> Option<Box<dyn Sink>> {
    registry::global().create(device, desired)
}

/// Enumerate devices across the platform registry
///
/// See [`Registry::enumerate`].
pub fn enumerate(force: bool) -> Vec<SinkInfo> {
    registry::global().enumerate(force)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use crate::error::{Result, SinkError};
    use crate::registry::Registry;
    use crate::sink::{Sink, SinkDescriptor};
    use crate::sinks::{null, profiler};
    use crate::types::{
        AudioFormat, ChannelLayout, DeviceInfo, DeviceType, PassthroughMode, SampleEncoding,
    };

    fn device(id: &str) -> DeviceInfo {
        DeviceInfo {
            id: id.to_string(),
            name: id.to_string(),
            device_type: DeviceType::Pcm,
            is_default: false,
            supported_sample_rates: vec![48000],
            max_channels: 2,
        }
    }

    /// Stub backend that accepts anything; used where construction must
    /// succeed but the test only cares about parsing or registry order.
    struct StubSink;

    impl Sink for StubSink {
        fn initialize(&mut self, _format: &mut AudioFormat, _device: &str) -> Result<()> {
            Ok(())
        }
        fn deinitialize(&mut self) {}
        fn name(&self) -> &'static str {
            "Stub"
        }
    }

    fn stub_construct() -> Box<dyn Sink> {
        Box::new(StubSink)
    }

    fn enumerate_none(_list: &mut Vec<DeviceInfo>, _force: bool) {}

    fn stub_descriptor(driver: &'static str) -> SinkDescriptor {
        SinkDescriptor {
            driver,
            name: driver,
            construct: stub_construct,
            enumerate: enumerate_none,
            exclusive_daemon: false,
        }
    }

    #[test]
    fn test_parse_recognized_prefix() {
        let registry = Registry::from_descriptors(vec![stub_descriptor("ALSA")]);
        let (driver, rest) = registry.parse_device("ALSA:hw:0,0");
        assert_eq!(driver, "ALSA");
        assert_eq!(rest, "hw:0,0");
    }

    #[test]
    fn test_parse_prefix_is_case_insensitive() {
        let registry = Registry::from_descriptors(vec![stub_descriptor("ALSA")]);
        let (driver, rest) = registry.parse_device("alsa:surround51:1");
        assert_eq!(driver, "ALSA");
        assert_eq!(rest, "surround51:1");
    }

    #[test]
    fn test_parse_unknown_prefix_is_device_path() {
        let registry = Registry::from_descriptors(vec![stub_descriptor("ALSA")]);
        let (driver, rest) = registry.parse_device("bogus:foo");
        assert_eq!(driver, "");
        assert_eq!(rest, "bogus:foo");
    }

    #[test]
    fn test_parse_without_separator() {
        let registry = Registry::from_descriptors(vec![stub_descriptor("ALSA")]);
        let (driver, rest) = registry.parse_device("plainpath");
        assert_eq!(driver, "");
        assert_eq!(rest, "plainpath");
    }

    #[test]
    fn test_parse_separator_at_start() {
        let registry = Registry::from_descriptors(vec![stub_descriptor("ALSA")]);
        let (driver, rest) = registry.parse_device(":foo");
        assert_eq!(driver, "");
        assert_eq!(rest, ":foo");
    }

    #[test]
    fn test_create_null_preserves_format() {
        let registry = Registry::from_descriptors(vec![null::DESCRIPTOR]);
        let mut format = AudioFormat {
            sample_rate: 44100,
            channels: ChannelLayout::Surround51,
            encoding: SampleEncoding::S16,
            passthrough: PassthroughMode::Pcm,
        };
        let requested = format.clone();

        let sink = registry.create("NULL:anything", &mut format);
        assert!(sink.is_some(), "NULL sink must never reject");
        assert_eq!(format, requested, "discard sink must not touch the format");
    }

    #[test]
    fn test_create_profiler_forces_float() {
        let registry = Registry::from_descriptors(vec![profiler::DESCRIPTOR]);
        let mut format = AudioFormat {
            sample_rate: 96000,
            channels: ChannelLayout::Stereo,
            encoding: SampleEncoding::S16,
            passthrough: PassthroughMode::Raw,
        };

        let sink = registry.create("PROFILER:", &mut format);
        assert!(sink.is_some());
        assert_eq!(format.encoding, SampleEncoding::F32);
        assert_eq!(format.passthrough, PassthroughMode::Pcm);
        assert_eq!(format.sample_rate, 96000);
    }

    static NEVER_CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

    struct NeverSink;

    impl Sink for NeverSink {
        fn initialize(&mut self, _format: &mut AudioFormat, _device: &str) -> Result<()> {
            Ok(())
        }
        fn deinitialize(&mut self) {}
        fn name(&self) -> &'static str {
            "Never"
        }
    }

    fn never_construct() -> Box<dyn Sink> {
        NEVER_CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
        Box::new(NeverSink)
    }

    #[test]
    fn test_unknown_driver_constructs_nothing() {
        let registry = Registry::from_descriptors(vec![SinkDescriptor {
            driver: "MOCK",
            name: "Mock",
            construct: never_construct,
            enumerate: enumerate_none,
            exclusive_daemon: false,
        }]);

        let mut format = AudioFormat::default();
        assert!(registry.create("OTHER:dev", &mut format).is_none());
        assert!(registry.try_sink("OTHER", "dev", &mut format).is_none());
        assert!(registry.try_sink("", "dev", &mut format).is_none());
        assert_eq!(NEVER_CONSTRUCTED.load(Ordering::SeqCst), 0);
    }

    static FAILING_CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);
    static FAILING_DEINITIALIZED: AtomicUsize = AtomicUsize::new(0);
    static FAILING_DROPPED: AtomicUsize = AtomicUsize::new(0);

    /// Mock backend whose initialize scribbles on the format and fails.
    struct FailingSink;

    impl Sink for FailingSink {
        fn initialize(&mut self, format: &mut AudioFormat, _device: &str) -> Result<()> {
            // a real backend may have partially negotiated before failing
            format.sample_rate = 11025;
            format.encoding = SampleEncoding::U8;
            Err(SinkError::InitializationFailed("no such device".to_string()))
        }
        fn deinitialize(&mut self) {
            FAILING_DEINITIALIZED.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &'static str {
            "Failing"
        }
    }

    impl Drop for FailingSink {
        fn drop(&mut self) {
            FAILING_DROPPED.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn failing_construct() -> Box<dyn Sink> {
        FAILING_CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
        Box::new(FailingSink)
    }

    #[test]
    fn test_initialize_failure_rolls_back() {
        let registry = Registry::from_descriptors(vec![SinkDescriptor {
            driver: "FAIL",
            name: "Failing",
            construct: failing_construct,
            enumerate: enumerate_none,
            exclusive_daemon: false,
        }]);

        let mut format = AudioFormat::stereo(48000);
        let requested = format.clone();

        let sink = registry.create("FAIL:whatever", &mut format);
        assert!(sink.is_none());
        assert_eq!(FAILING_CONSTRUCTED.load(Ordering::SeqCst), 1);
        assert_eq!(
            FAILING_DEINITIALIZED.load(Ordering::SeqCst),
            1,
            "deinitialize must run exactly once on the failure path"
        );
        assert_eq!(
            FAILING_DROPPED.load(Ordering::SeqCst),
            1,
            "the instance must be destroyed exactly once"
        );
        assert_eq!(
            format, requested,
            "a failed negotiation must not reach the caller's format"
        );
    }

    fn enumerate_daemon(list: &mut Vec<DeviceInfo>, _force: bool) {
        list.push(device("daemon-0"));
        list.push(device("daemon-1"));
    }

    static HARDWARE_ENUM_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn enumerate_hardware(list: &mut Vec<DeviceInfo>, _force: bool) {
        HARDWARE_ENUM_CALLS.fetch_add(1, Ordering::SeqCst);
        list.push(device("hw:0,0"));
        list.push(device("hw:0,1"));
        list.push(device("hw:1,0"));
    }

    fn daemon_descriptor() -> SinkDescriptor {
        SinkDescriptor {
            driver: "PULSE",
            name: "PulseAudio",
            construct: stub_construct,
            enumerate: enumerate_daemon,
            exclusive_daemon: true,
        }
    }

    fn hardware_descriptor() -> SinkDescriptor {
        SinkDescriptor {
            driver: "ALSA",
            name: "ALSA",
            construct: stub_construct,
            enumerate: enumerate_hardware,
            exclusive_daemon: false,
        }
    }

    #[test]
    fn test_enumerate_short_circuits_behind_daemon() {
        let registry =
            Registry::from_descriptors(vec![daemon_descriptor(), hardware_descriptor()]);

        let list = registry.enumerate(true);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].sink_name, "PulseAudio");
        assert_eq!(list[0].devices.len(), 2);
        assert_eq!(
            HARDWARE_ENUM_CALLS.load(Ordering::SeqCst),
            0,
            "direct-hardware backend must not be queried behind the daemon"
        );
    }

    fn enumerate_empty(_list: &mut Vec<DeviceInfo>, _force: bool) {}

    #[test]
    fn test_enumerate_all_empty_yields_empty_list() {
        let quiet = SinkDescriptor {
            driver: "QUIET",
            name: "Quiet",
            construct: stub_construct,
            enumerate: enumerate_empty,
            exclusive_daemon: false,
        };
        let registry = Registry::from_descriptors(vec![quiet, null::DESCRIPTOR]);

        let list = registry.enumerate(false);
        assert!(list.is_empty());
    }

    #[test]
    fn test_enumerate_empty_daemon_does_not_short_circuit() {
        let silent_daemon = SinkDescriptor {
            driver: "PULSE",
            name: "PulseAudio",
            construct: stub_construct,
            enumerate: enumerate_empty,
            exclusive_daemon: true,
        };

        let hw_a = SinkDescriptor {
            driver: "HWA",
            name: "HardwareA",
            construct: stub_construct,
            enumerate: enumerate_daemon, // reuse: contributes two devices
            exclusive_daemon: false,
        };
        let hw_b = SinkDescriptor {
            driver: "HWB",
            name: "HardwareB",
            construct: stub_construct,
            enumerate: enumerate_daemon,
            exclusive_daemon: false,
        };

        let registry = Registry::from_descriptors(vec![silent_daemon, hw_a, hw_b]);
        let list = registry.enumerate(false);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].sink_name, "HardwareA");
        assert_eq!(list[1].sink_name, "HardwareB");
    }

    static FORCE_SEEN: AtomicBool = AtomicBool::new(false);

    fn enumerate_records_force(list: &mut Vec<DeviceInfo>, force: bool) {
        FORCE_SEEN.store(force, Ordering::SeqCst);
        list.push(device("probe"));
    }

    #[test]
    fn test_enumerate_passes_force_through() {
        let probe = SinkDescriptor {
            driver: "PROBE",
            name: "Probe",
            construct: stub_construct,
            enumerate: enumerate_records_force,
            exclusive_daemon: false,
        };
        let registry = Registry::from_descriptors(vec![probe]);

        registry.enumerate(true);
        assert!(FORCE_SEEN.load(Ordering::SeqCst));
        registry.enumerate(false);
        assert!(!FORCE_SEEN.load(Ordering::SeqCst));
    }

    #[test]
    fn test_global_create_resolves_null() {
        let mut format = AudioFormat::default();
        let sink = super::create("NULL:", &mut format);
        assert!(sink.is_some());
    }

    #[test]
    fn test_global_create_without_driver_fails() {
        // no fallback chain: an undirected request never resolves
        let mut format = AudioFormat::default();
        assert!(super::create("plainpath", &mut format).is_none());
        assert_eq!(format, AudioFormat::default());
    }
}
