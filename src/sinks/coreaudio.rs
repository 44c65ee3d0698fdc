//! CoreAudio HAL backend for macOS
//!
//! Uses coreaudio-sys for direct HAL access to:
//! - Enumerate output devices and their sample rate capabilities
//! - Open a HAL AudioUnit bound to a specific device
//!
//! Device paths are decimal `AudioObjectID`s as produced by enumeration;
//! an empty path means the system default output device.
//!
//! This file is only compiled on macOS with the `coreaudio` feature.

use std::ffi::c_void;
use std::mem;
use std::ptr;

use core_foundation::base::TCFType;
use core_foundation::string::{CFString, CFStringRef};
use coreaudio_sys::*;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, SinkError};
use crate::sink::{Sink, SinkDescriptor};
use crate::types::{AudioFormat, DeviceInfo, DeviceType, PassthroughMode, SampleEncoding};

pub const DESCRIPTOR: SinkDescriptor = SinkDescriptor {
    driver: "COREAUDIO",
    name: "CoreAudio",
    construct: construct,
    enumerate: enumerate_devices,
    exclusive_daemon: false,
};

const STANDARD_RATES: [u32; 8] = [
    44100, 48000, 88200, 96000, 176400, 192000, 352800, 384000,
];

fn address(selector: AudioObjectPropertySelector, scope: AudioObjectPropertyScope)
    -> AudioObjectPropertyAddress
{
    AudioObjectPropertyAddress {
        mSelector: selector,
        mScope: scope,
        mElement: kAudioObjectPropertyElementMain,
    }
}

/// Read a fixed-size property value from a HAL object.
fn read_scalar<T>(object: AudioObjectID, addr: &AudioObjectPropertyAddress) -> Result<T> {
    unsafe {
        let mut value = mem::MaybeUninit::<T>::zeroed();
        let mut size = mem::size_of::<T>() as u32;
        let status = AudioObjectGetPropertyData(
            object,
            addr,
            0,
            ptr::null(),
            &mut size,
            value.as_mut_ptr() as *mut c_void,
        );
        if status != 0 {
            return Err(SinkError::SystemError {
                code: status,
                message: "AudioObjectGetPropertyData".to_string(),
            });
        }
        Ok(value.assume_init())
    }
}

/// Read a variable-length property as raw bytes.
fn read_bytes(object: AudioObjectID, addr: &AudioObjectPropertyAddress) -> Result<Vec<u8>> {
    unsafe {
        let mut size: u32 = 0;
        let status = AudioObjectGetPropertyDataSize(object, addr, 0, ptr::null(), &mut size);
        if status != 0 {
            return Err(SinkError::SystemError {
                code: status,
                message: "AudioObjectGetPropertyDataSize".to_string(),
            });
        }

        let mut buffer = vec![0u8; size as usize];
        let status = AudioObjectGetPropertyData(
            object,
            addr,
            0,
            ptr::null(),
            &mut size,
            buffer.as_mut_ptr() as *mut c_void,
        );
        if status != 0 {
            return Err(SinkError::SystemError {
                code: status,
                message: "AudioObjectGetPropertyData".to_string(),
            });
        }
        buffer.truncate(size as usize);
        Ok(buffer)
    }
}

fn default_output_device() -> Result<AudioObjectID> {
    let addr = address(
        kAudioHardwarePropertyDefaultOutputDevice,
        kAudioObjectPropertyScopeGlobal,
    );
    let id: AudioObjectID = read_scalar(kAudioObjectSystemObject, &addr)?;
    if id == kAudioObjectUnknown {
        return Err(SinkError::DeviceNotFound(
            "no default output device".to_string(),
        ));
    }
    Ok(id)
}

fn all_output_devices() -> Result<Vec<AudioObjectID>> {
    let addr = address(kAudioHardwarePropertyDevices, kAudioObjectPropertyScopeGlobal);
    let raw = read_bytes(kAudioObjectSystemObject, &addr)
        .map_err(|e| SinkError::EnumerationFailed(e.to_string()))?;

    let count = raw.len() / mem::size_of::<AudioObjectID>();
    let ids = unsafe {
        std::slice::from_raw_parts(raw.as_ptr() as *const AudioObjectID, count)
    };
    Ok(ids
        .iter()
        .copied()
        .filter(|&id| output_channel_count(id) > 0)
        .collect())
}

/// Number of output channels across the device's output streams.
fn output_channel_count(device_id: AudioObjectID) -> u32 {
    let addr = address(
        kAudioDevicePropertyStreamConfiguration,
        kAudioDevicePropertyScopeOutput,
    );
    let raw = match read_bytes(device_id, &addr) {
        Ok(raw) if raw.len() >= mem::size_of::<AudioBufferList>() => raw,
        _ => return 0,
    };

    unsafe {
        let list = raw.as_ptr() as *const AudioBufferList;
        let buffers = std::slice::from_raw_parts(
            (*list).mBuffers.as_ptr(),
            (*list).mNumberBuffers as usize,
        );
        buffers.iter().map(|b| b.mNumberChannels).sum()
    }
}

fn device_name(device_id: AudioObjectID) -> Result<String> {
    let addr = address(kAudioObjectPropertyName, kAudioObjectPropertyScopeGlobal);
    let cf_name: CFStringRef = read_scalar(device_id, &addr)?;
    if cf_name.is_null() {
        return Err(SinkError::Other("device has no name".to_string()));
    }
    let name: CFString = unsafe { CFString::wrap_under_get_rule(cf_name) };
    Ok(name.to_string())
}

fn nominal_sample_rate(device_id: AudioObjectID) -> Result<u32> {
    let addr = address(
        kAudioDevicePropertyNominalSampleRate,
        kAudioObjectPropertyScopeGlobal,
    );
    let rate: f64 = read_scalar(device_id, &addr)?;
    Ok(rate as u32)
}

/// Standard rates covered by the device's available nominal rate ranges.
fn supported_sample_rates(device_id: AudioObjectID) -> Vec<u32> {
    let addr = address(
        kAudioDevicePropertyAvailableNominalSampleRates,
        kAudioObjectPropertyScopeGlobal,
    );
    let raw = match read_bytes(device_id, &addr) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };

    let count = raw.len() / mem::size_of::<AudioValueRange>();
    let ranges = unsafe {
        std::slice::from_raw_parts(raw.as_ptr() as *const AudioValueRange, count)
    };

    let mut rates: Vec<u32> = STANDARD_RATES
        .iter()
        .copied()
        .filter(|&rate| {
            let rate = rate as f64;
            ranges.iter().any(|r| rate >= r.mMinimum && rate <= r.mMaximum)
        })
        .collect();
    rates.sort_unstable();
    rates.dedup();
    rates
}

fn build_device_info(device_id: AudioObjectID, default_id: Option<AudioObjectID>) -> DeviceInfo {
    let name = device_name(device_id).unwrap_or_else(|_| "Unknown".to_string());
    DeviceInfo {
        id: device_id.to_string(),
        name,
        device_type: DeviceType::Pcm,
        is_default: Some(device_id) == default_id,
        supported_sample_rates: supported_sample_rates(device_id),
        max_channels: output_channel_count(device_id).min(u32::from(u16::MAX)) as u16,
    }
}

// Device listing is cached per process; `force` rebuilds it.
static DEVICE_CACHE: Lazy<Mutex<Option<Vec<DeviceInfo>>>> = Lazy::new(|| Mutex::new(None));

pub fn enumerate_devices(list: &mut Vec<DeviceInfo>, force: bool) {
    let mut cache = DEVICE_CACHE.lock();

    if force {
        *cache = None;
    }
    if cache.is_none() {
        match all_output_devices() {
            Ok(ids) => {
                let default_id = default_output_device().ok();
                let infos = ids
                    .into_iter()
                    .map(|id| build_device_info(id, default_id))
                    .collect();
                *cache = Some(infos);
            }
            Err(e) => {
                warn!("CoreAudio device listing failed: {}", e);
                return;
            }
        }
    }

    if let Some(infos) = cache.as_ref() {
        list.extend(infos.iter().cloned());
    }
}

type SysAudioUnit = coreaudio_sys::AudioUnit;

pub struct CoreAudioSink {
    audio_unit: Option<SysAudioUnit>,
}

// The AudioUnit handle is only touched by whichever thread owns the sink.
unsafe impl Send for CoreAudioSink {}

impl CoreAudioSink {
    pub fn new() -> Self {
        Self { audio_unit: None }
    }
}

impl Default for CoreAudioSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for CoreAudioSink {
    fn initialize(&mut self, format: &mut AudioFormat, device: &str) -> Result<()> {
        if format.passthrough == PassthroughMode::Raw {
            return Err(SinkError::NotSupported(
                "raw passthrough on CoreAudio".to_string(),
            ));
        }

        let device_id = if device.is_empty() {
            default_output_device()?
        } else {
            device
                .parse::<AudioObjectID>()
                .map_err(|_| SinkError::DeviceNotFound(device.to_string()))?
        };

        unsafe {
            // HALOutput rather than DefaultOutput so a specific device can
            // be selected
            let desc = AudioComponentDescription {
                componentType: kAudioUnitType_Output,
                componentSubType: kAudioUnitSubType_HALOutput,
                componentManufacturer: kAudioUnitManufacturer_Apple,
                componentFlags: 0,
                componentFlagsMask: 0,
            };

            let component = AudioComponentFindNext(ptr::null_mut(), &desc);
            if component.is_null() {
                return Err(SinkError::InitializationFailed(
                    "no HAL output component".to_string(),
                ));
            }

            let mut audio_unit: SysAudioUnit = ptr::null_mut();
            let status = AudioComponentInstanceNew(component, &mut audio_unit);
            if status != 0 {
                return Err(SinkError::SystemError {
                    code: status,
                    message: "AudioComponentInstanceNew".to_string(),
                });
            }

            let status = AudioUnitSetProperty(
                audio_unit,
                kAudioOutputUnitProperty_CurrentDevice,
                kAudioUnitScope_Global,
                0,
                &device_id as *const _ as *const c_void,
                mem::size_of::<AudioObjectID>() as u32,
            );
            if status != 0 {
                AudioComponentInstanceDispose(audio_unit);
                return Err(SinkError::DeviceNotFound(format!(
                    "device {}: error {}",
                    device_id, status
                )));
            }

            // CoreAudio's canonical client format is packed native float;
            // the rate follows the device's current nominal rate
            let hardware_rate = nominal_sample_rate(device_id).unwrap_or(format.sample_rate);
            let channels = u32::from(format.channels.count());
            let asbd = AudioStreamBasicDescription {
                mSampleRate: hardware_rate as f64,
                mFormatID: kAudioFormatLinearPCM,
                mFormatFlags: kAudioFormatFlagsNativeFloatPacked,
                mBytesPerPacket: 4 * channels,
                mFramesPerPacket: 1,
                mBytesPerFrame: 4 * channels,
                mChannelsPerFrame: channels,
                mBitsPerChannel: 32,
                mReserved: 0,
            };

            let status = AudioUnitSetProperty(
                audio_unit,
                kAudioUnitProperty_StreamFormat,
                kAudioUnitScope_Input,
                0,
                &asbd as *const _ as *const c_void,
                mem::size_of::<AudioStreamBasicDescription>() as u32,
            );
            if status != 0 {
                AudioComponentInstanceDispose(audio_unit);
                return Err(SinkError::UnsupportedFormat(format!(
                    "stream format: error {}",
                    status
                )));
            }

            let status = AudioUnitInitialize(audio_unit);
            if status != 0 {
                AudioComponentInstanceDispose(audio_unit);
                return Err(SinkError::SystemError {
                    code: status,
                    message: "AudioUnitInitialize".to_string(),
                });
            }

            format.sample_rate = hardware_rate;
            format.encoding = SampleEncoding::F32;
            debug!(
                "CoreAudio sink open on device {}: {} Hz, {} channels",
                device_id, hardware_rate, channels
            );
            self.audio_unit = Some(audio_unit);
        }

        Ok(())
    }

    fn deinitialize(&mut self) {
        if let Some(audio_unit) = self.audio_unit.take() {
            unsafe {
                AudioUnitUninitialize(audio_unit);
                AudioComponentInstanceDispose(audio_unit);
            }
        }
    }

    fn name(&self) -> &'static str {
        "CoreAudio"
    }
}

fn construct() -> Box<dyn Sink> {
    Box::new(CoreAudioSink::new())
}
