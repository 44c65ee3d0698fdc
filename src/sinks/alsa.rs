//! ALSA direct-hardware backend
//!
//! Opens PCM playback devices through the `alsa` crate and negotiates
//! the hardware configuration with hw-params. Device discovery goes
//! through the PCM name hints, so plugins (dmix, plughw, ...) show up
//! alongside raw `hw:` devices.
//!
//! This file is only compiled on Linux with the `alsa` feature.

use alsa::device_name::HintIter;
use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use tracing::{debug, warn};

use crate::error::{Result, SinkError};
use crate::sink::{Sink, SinkDescriptor};
use crate::types::{AudioFormat, ChannelLayout, DeviceInfo, DeviceType, PassthroughMode,
                   SampleEncoding};

pub const DESCRIPTOR: SinkDescriptor = SinkDescriptor {
    driver: "ALSA",
    name: "ALSA",
    construct: construct,
    enumerate: enumerate_devices,
    exclusive_daemon: false,
};

pub struct AlsaSink {
    pcm: Option<PCM>,
}

impl AlsaSink {
    pub fn new() -> Self {
        Self { pcm: None }
    }
}

impl Default for AlsaSink {
    fn default() -> Self {
        Self::new()
    }
}

fn pcm_format(encoding: SampleEncoding) -> Format {
    match encoding {
        SampleEncoding::U8 => Format::U8,
        SampleEncoding::S16 => Format::s16(),
        SampleEncoding::S32 => Format::s32(),
        SampleEncoding::F32 => Format::float(),
    }
}

impl Sink for AlsaSink {
    fn initialize(&mut self, format: &mut AudioFormat, device: &str) -> Result<()> {
        if format.passthrough == PassthroughMode::Raw {
            return Err(SinkError::NotSupported(
                "raw passthrough on ALSA".to_string(),
            ));
        }

        let name = if device.is_empty() { "default" } else { device };
        let pcm = PCM::new(name, Direction::Playback, false)
            .map_err(|e| SinkError::DeviceNotFound(format!("{}: {}", name, e)))?;

        {
            let hwp = HwParams::any(&pcm).map_err(|e| {
                SinkError::InitializationFailed(format!("hw-params query: {}", e))
            })?;

            hwp.set_access(Access::RWInterleaved).map_err(|e| {
                SinkError::UnsupportedFormat(format!("interleaved access: {}", e))
            })?;

            // negotiate encoding, falling back to S16 which every device speaks
            if hwp.set_format(pcm_format(format.encoding)).is_err() {
                hwp.set_format(Format::s16()).map_err(|e| {
                    SinkError::UnsupportedFormat(format!("sample format: {}", e))
                })?;
                format.encoding = SampleEncoding::S16;
            }

            if hwp.set_channels(u32::from(format.channels.count())).is_err() {
                hwp.set_channels(2).map_err(|e| {
                    SinkError::UnsupportedFormat(format!("channel count: {}", e))
                })?;
                format.channels = ChannelLayout::Stereo;
            }

            let rate = hwp
                .set_rate_near(format.sample_rate, ValueOr::Nearest)
                .map_err(|e| SinkError::UnsupportedFormat(format!("sample rate: {}", e)))?;
            format.sample_rate = rate;

            pcm.hw_params(&hwp)
                .map_err(|e| SinkError::InitializationFailed(format!("hw-params: {}", e)))?;
        }

        debug!(
            "ALSA sink open on {:?}: {} Hz {:?} {:?}",
            name, format.sample_rate, format.channels, format.encoding
        );
        self.pcm = Some(pcm);
        Ok(())
    }

    fn deinitialize(&mut self) {
        if let Some(pcm) = self.pcm.take() {
            if let Err(e) = pcm.drain() {
                debug!("ALSA drain on close: {}", e);
            }
        }
    }

    fn name(&self) -> &'static str {
        "ALSA"
    }
}

fn construct() -> Box<dyn Sink> {
    Box::new(AlsaSink::new())
}

fn device_type_for(name: &str) -> DeviceType {
    let lower = name.to_ascii_lowercase();
    if lower.contains("hdmi") {
        DeviceType::Hdmi
    } else if lower.contains("iec958") || lower.contains("spdif") {
        DeviceType::Spdif
    } else {
        DeviceType::Pcm
    }
}

/// Walk the PCM name hints for playback-capable devices.
///
/// ALSA has no daemon and no cache on our side, so `force` is moot.
pub fn enumerate_devices(list: &mut Vec<DeviceInfo>, _force: bool) {
    let hints = match HintIter::new(None, c"pcm") {
        Ok(hints) => hints,
        Err(e) => {
            warn!("ALSA device hints unavailable: {}", e);
            return;
        }
    };

    for hint in hints {
        let Some(name) = hint.name else { continue };
        // hints with an explicit capture direction are not outputs
        if hint.direction == Some(Direction::Capture) {
            continue;
        }

        let label = hint
            .desc
            .as_deref()
            .and_then(|d| d.lines().next())
            .unwrap_or(&name)
            .to_string();

        list.push(DeviceInfo {
            device_type: device_type_for(&name),
            is_default: name == "default",
            name: label,
            supported_sample_rates: Vec::new(),
            max_channels: 2,
            id: name,
        });
    }
}
