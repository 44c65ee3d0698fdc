//! Diagnostic pass-through sink
//!
//! Behaves like a device that always opens: it pins the format to float
//! PCM, records when it was opened and logs the negotiated configuration
//! and session length. Lets the enclosing pipeline be exercised and
//! timed without touching real hardware.

use std::time::Instant;

use tracing::info;

use crate::error::Result;
use crate::sink::{Sink, SinkDescriptor};
use crate::types::{AudioFormat, DeviceInfo, PassthroughMode, SampleEncoding};

pub const DESCRIPTOR: SinkDescriptor = SinkDescriptor {
    driver: "PROFILER",
    name: "PROFILER",
    construct: construct,
    enumerate: enumerate_devices,
    exclusive_daemon: false,
};

pub struct ProfilerSink {
    opened: Option<Instant>,
}

impl ProfilerSink {
    pub fn new() -> Self {
        Self { opened: None }
    }
}

impl Default for ProfilerSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ProfilerSink {
    fn initialize(&mut self, format: &mut AudioFormat, device: &str) -> Result<()> {
        // profile the pipeline's decoded float path, not a bitstream
        format.encoding = SampleEncoding::F32;
        format.passthrough = PassthroughMode::Pcm;

        self.opened = Some(Instant::now());
        info!(
            "profiler sink open, device {:?}, {} Hz {:?} {:?}",
            device, format.sample_rate, format.channels, format.encoding
        );
        Ok(())
    }

    fn deinitialize(&mut self) {
        if let Some(opened) = self.opened.take() {
            info!("profiler sink closed after {:?}", opened.elapsed());
        }
    }

    fn name(&self) -> &'static str {
        "PROFILER"
    }
}

fn construct() -> Box<dyn Sink> {
    Box::new(ProfilerSink::new())
}

/// Diagnostic only; never shows up in device listings.
fn enumerate_devices(_list: &mut Vec<DeviceInfo>, _force: bool) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelLayout;

    #[test]
    fn test_profiler_pins_float_pcm() {
        let mut sink = ProfilerSink::new();
        let mut format = AudioFormat {
            sample_rate: 44100,
            channels: ChannelLayout::Stereo,
            encoding: SampleEncoding::S16,
            passthrough: PassthroughMode::Raw,
        };

        assert!(sink.initialize(&mut format, "").is_ok());
        assert_eq!(format.encoding, SampleEncoding::F32);
        assert_eq!(format.passthrough, PassthroughMode::Pcm);
        assert_eq!(format.sample_rate, 44100);
        sink.deinitialize();
    }
}
