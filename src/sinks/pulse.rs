//! PulseAudio sound-server backend
//!
//! Playback goes through the simple API (`libpulse-simple-binding`),
//! device discovery through context introspection on a standard
//! mainloop. Registered as an exclusive daemon: when Pulse is running it
//! owns the hardware, so enumeration stops here and the direct-hardware
//! backends behind it are never probed.
//!
//! This file is only compiled on Linux with the `pulse` feature.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use libpulse_binding::callbacks::ListResult;
use libpulse_binding::context::{Context, FlagSet, State};
use libpulse_binding::mainloop::standard::{IterateResult, Mainloop};
use libpulse_binding::sample::{Format, Spec};
use libpulse_binding::stream::Direction;
use libpulse_simple_binding::Simple;
use tracing::{debug, warn};

use crate::error::{Result, SinkError};
use crate::sink::{Sink, SinkDescriptor};
use crate::types::{AudioFormat, DeviceInfo, DeviceType, PassthroughMode, SampleEncoding};

const APP_NAME: &str = "resound";

pub const DESCRIPTOR: SinkDescriptor = SinkDescriptor {
    driver: "PULSE",
    name: "PulseAudio",
    construct: construct,
    enumerate: enumerate_devices,
    exclusive_daemon: true,
};

pub struct PulseSink {
    stream: Option<Simple>,
}

impl PulseSink {
    pub fn new() -> Self {
        Self { stream: None }
    }
}

impl Default for PulseSink {
    fn default() -> Self {
        Self::new()
    }
}

fn sample_format(encoding: SampleEncoding) -> Format {
    match encoding {
        SampleEncoding::U8 => Format::U8,
        SampleEncoding::S16 => Format::S16NE,
        SampleEncoding::S32 => Format::S32NE,
        SampleEncoding::F32 => Format::FLOAT32NE,
    }
}

impl Sink for PulseSink {
    fn initialize(&mut self, format: &mut AudioFormat, device: &str) -> Result<()> {
        if format.passthrough == PassthroughMode::Raw {
            return Err(SinkError::NotSupported(
                "raw passthrough on PulseAudio".to_string(),
            ));
        }

        let spec = Spec {
            format: sample_format(format.encoding),
            channels: format.channels.count() as u8,
            rate: format.sample_rate,
        };
        if !spec.is_valid() {
            return Err(SinkError::UnsupportedFormat(format!(
                "{} Hz, {} channels",
                spec.rate, spec.channels
            )));
        }

        let dev = if device.is_empty() { None } else { Some(device) };
        let stream = Simple::new(
            None,
            APP_NAME,
            Direction::Playback,
            dev,
            "playback",
            &spec,
            None,
            None,
        )
        .map_err(|e| SinkError::InitializationFailed(format!("pulse connect: {}", e)))?;

        debug!(
            "Pulse sink open on {:?}: {} Hz {:?}",
            device, format.sample_rate, format.channels
        );
        self.stream = Some(stream);
        Ok(())
    }

    fn deinitialize(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.drain() {
                debug!("pulse drain on close: {}", e);
            }
        }
    }

    fn name(&self) -> &'static str {
        "PulseAudio"
    }
}

fn construct() -> Box<dyn Sink> {
    Box::new(PulseSink::new())
}

/// Query the daemon for its sinks.
///
/// No daemon (or a failed handshake) is not an error: the list stays
/// empty and enumeration falls through to the hardware backends.
pub fn enumerate_devices(list: &mut Vec<DeviceInfo>, _force: bool) {
    if let Err(e) = enumerate_inner(list) {
        debug!("PulseAudio not available for enumeration: {}", e);
        list.clear();
    }
}

fn enumerate_inner(list: &mut Vec<DeviceInfo>) -> Result<()> {
    let mut mainloop = Mainloop::new()
        .ok_or_else(|| SinkError::EnumerationFailed("mainloop allocation".to_string()))?;
    let mut context = Context::new(&mainloop, APP_NAME)
        .ok_or_else(|| SinkError::EnumerationFailed("context allocation".to_string()))?;

    context
        .connect(None, FlagSet::NOFLAGS, None)
        .map_err(|e| SinkError::EnumerationFailed(format!("connect: {}", e)))?;

    // pump the mainloop until the server handshake settles
    loop {
        match mainloop.iterate(true) {
            IterateResult::Success(_) => {}
            IterateResult::Quit(_) | IterateResult::Err(_) => {
                return Err(SinkError::EnumerationFailed("mainloop quit".to_string()));
            }
        }
        match context.get_state() {
            State::Ready => break,
            State::Failed | State::Terminated => {
                return Err(SinkError::EnumerationFailed(
                    "context failed or terminated".to_string(),
                ));
            }
            _ => {}
        }
    }

    let found: Rc<RefCell<Vec<DeviceInfo>>> = Rc::new(RefCell::new(Vec::new()));
    let done = Rc::new(Cell::new(false));

    {
        let introspector = context.introspect();
        let found_cb = Rc::clone(&found);
        let done_cb = Rc::clone(&done);
        let op = introspector.get_sink_info_list(move |result| match result {
            ListResult::Item(sink) => {
                let id = sink
                    .name
                    .as_ref()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| sink.index.to_string());
                let label = sink
                    .description
                    .as_ref()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| id.clone());
                found_cb.borrow_mut().push(DeviceInfo {
                    id,
                    name: label,
                    device_type: DeviceType::Pcm,
                    is_default: false,
                    supported_sample_rates: vec![sink.sample_spec.rate],
                    max_channels: u16::from(sink.sample_spec.channels),
                });
            }
            ListResult::End | ListResult::Error => done_cb.set(true),
        });

        while !done.get() {
            match mainloop.iterate(true) {
                IterateResult::Success(_) => {}
                IterateResult::Quit(_) | IterateResult::Err(_) => {
                    warn!("pulse mainloop ended during sink listing");
                    break;
                }
            }
        }
        drop(op);
    }
    context.disconnect();

    list.append(&mut found.borrow_mut());
    Ok(())
}
