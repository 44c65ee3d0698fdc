//! Discard sink
//!
//! Accepts any device path and any format, and throws the audio away.
//! Useful as a guaranteed-available output when no hardware backend can
//! be brought up, and as a fixture in tests of the enclosing pipeline.

use crate::error::Result;
use crate::sink::{Sink, SinkDescriptor};
use crate::types::{AudioFormat, DeviceInfo};

pub const DESCRIPTOR: SinkDescriptor = SinkDescriptor {
    driver: "NULL",
    name: "NULL",
    construct: construct,
    enumerate: enumerate_devices,
    exclusive_daemon: false,
};

/// Sink that accepts everything and outputs nothing
#[derive(Default)]
pub struct NullSink;

impl NullSink {
    pub fn new() -> Self {
        Self
    }
}

impl Sink for NullSink {
    fn initialize(&mut self, _format: &mut AudioFormat, _device: &str) -> Result<()> {
        // the requested format is accepted verbatim
        Ok(())
    }

    fn deinitialize(&mut self) {}

    fn name(&self) -> &'static str {
        "NULL"
    }
}

fn construct() -> Box<dyn Sink> {
    Box::new(NullSink::new())
}

/// The discard sink is not a real endpoint; it contributes no devices.
fn enumerate_devices(_list: &mut Vec<DeviceInfo>, _force: bool) {}
