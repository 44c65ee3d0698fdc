//! Shared audio types used by all backends
//!
//! This module contains platform-agnostic types for sink resolution and
//! device listing. NO platform-specific imports allowed here.

use serde::{Deserialize, Serialize};

/// Sample encoding of the audio written to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleEncoding {
    /// Unsigned 8-bit
    U8,
    /// Signed 16-bit, native endian
    S16,
    /// Signed 32-bit, native endian
    S32,
    /// 32-bit float, native endian
    F32,
}

impl SampleEncoding {
    /// Size of one sample in bytes
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S32 | Self::F32 => 4,
        }
    }
}

/// Speaker layout of the audio written to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelLayout {
    Mono,
    Stereo,
    Quad,
    Surround51,
    Surround71,
}

impl ChannelLayout {
    /// Number of interleaved channels in this layout
    pub fn count(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Quad => 4,
            Self::Surround51 => 6,
            Self::Surround71 => 8,
        }
    }
}

/// Passthrough (compressed bitstream) configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassthroughMode {
    /// Decoded PCM output (default)
    Pcm,
    /// Raw encoded bitstream handed through to the device
    Raw,
}

impl Default for PassthroughMode {
    fn default() -> Self {
        Self::Pcm
    }
}

/// Desired or negotiated output configuration
///
/// Passed by mutable reference into sink initialization. A backend may
/// rewrite any field to what the hardware actually supports; the factory
/// makes the rewritten value visible to the caller only when
/// initialization succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: ChannelLayout,
    pub encoding: SampleEncoding,
    pub passthrough: PassthroughMode,
}

impl AudioFormat {
    /// Float stereo PCM at the given rate
    pub fn stereo(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: ChannelLayout::Stereo,
            encoding: SampleEncoding::F32,
            passthrough: PassthroughMode::Pcm,
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::stereo(48000)
    }
}

/// Rough capability hint for an output endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    /// Plain PCM endpoint (analog out, USB DAC, ...)
    Pcm,
    /// HDMI endpoint, may accept encoded bitstreams
    Hdmi,
    /// S/PDIF endpoint, may accept IEC 61937 frames
    Spdif,
}

/// Information about one audio output device
///
/// All fields are payload owned by the backend that produced them; the
/// factory never interprets the id beyond handing it back to the same
/// backend as a device path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Backend-specific device identifier
    pub id: String,
    /// Human-readable device name
    pub name: String,
    /// Capability hint
    pub device_type: DeviceType,
    /// Whether this is the backend's default device
    pub is_default: bool,
    /// Supported sample rates, if the backend reports them
    pub supported_sample_rates: Vec<u32>,
    /// Maximum number of channels
    pub max_channels: u16,
}

impl DeviceInfo {
    /// Check if a sample rate is reported as supported by this device
    pub fn supports_sample_rate(&self, rate: u32) -> bool {
        self.supported_sample_rates.contains(&rate)
    }
}

/// One backend's contribution to a device enumeration pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkInfo {
    /// Backend display name (e.g. "PulseAudio", "ALSA")
    pub sink_name: String,
    /// Devices the backend reported, in backend order
    pub devices: Vec<DeviceInfo>,
}
