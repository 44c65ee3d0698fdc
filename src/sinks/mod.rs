//! Backend implementations
//!
//! `null` and `profiler` are built into every configuration. The native
//! backends are opt-in per platform via cargo features.

pub mod null;
pub mod profiler;

#[cfg(all(target_os = "linux", feature = "pulse"))]
pub mod pulse;

#[cfg(all(target_os = "linux", feature = "alsa"))]
pub mod alsa;

#[cfg(all(target_os = "macos", feature = "coreaudio"))]
pub mod coreaudio;
