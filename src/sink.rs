//! Sink capability contract
//!
//! This trait defines the boundary the factory consumes. Implementations
//! handle device open, format negotiation and teardown for one native
//! audio API.
//!
//! # Important
//!
//! This file must NOT contain any platform-specific imports (alsa,
//! libpulse-binding, coreaudio-sys, etc.). All platform-specific code
//! goes in the implementation files under `sinks/`.

use crate::error::Result;
use crate::types::{AudioFormat, DeviceInfo};

/// A live audio output backend instance, bound to one device
///
/// A sink is owned exclusively: first by the factory while it attempts
/// initialization, then by the caller once `create` returns it. A sink
/// that failed to initialize never leaves the factory.
///
/// # Example
///
/// ```ignore
/// let mut format = AudioFormat::stereo(48000);
/// if let Some(sink) = resound::create("ALSA:hw:0,0", &mut format) {
///     // `format` now holds the negotiated hardware configuration
/// }
/// ```
pub trait Sink: Send {
    /// Open the backend for `device` and negotiate `format`
    ///
    /// On success the backend may have rewritten `format` to what the
    /// hardware actually supports. On failure `format` is unspecified;
    /// the factory shields the caller from it.
    fn initialize(&mut self, format: &mut AudioFormat, device: &str) -> Result<()>;

    /// Release the device
    ///
    /// Called at most once after an initialize attempt, whether that
    /// attempt succeeded or failed.
    fn deinitialize(&mut self);

    /// Backend display name (e.g. "PulseAudio", "ALSA")
    fn name(&self) -> &'static str;
}

/// Constructor for a backend instance
pub type ConstructFn = fn() -> Box<dyn Sink>;

/// Static device enumeration call
///
/// Fills the list with the backend's current devices. Never fails; an
/// unavailable backend leaves the list empty. `force` instructs the
/// backend to bypass any device-list cache it keeps internally.
pub type EnumerateFn = fn(&mut Vec<DeviceInfo>, bool);

/// One compiled-in backend, as registered in the [`Registry`]
///
/// [`Registry`]: crate::registry::Registry
#[derive(Debug, Clone, Copy)]
pub struct SinkDescriptor {
    /// Driver id matched against device-string prefixes, stored uppercase
    pub driver: &'static str,
    /// Display name used in enumeration results
    pub name: &'static str,
    pub construct: ConstructFn,
    pub enumerate: EnumerateFn,
    /// Sound-server daemon that owns the hardware exclusively; if it
    /// reports any device, enumeration stops before the direct-hardware
    /// backends behind it
    pub exclusive_daemon: bool,
}
