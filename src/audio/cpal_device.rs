//! Duplex capture/playback via CPAL, exposed as a blocking block device.
//!
//! CPAL delivers and requests samples on its own callback threads. The capture
//! callback regroups samples into blocks and queues them; the playback callback
//! drains a bounded queue that `write_block` fills, so both engine-side calls
//! block for roughly one block period in steady state.

use super::device::{AudioDevice, DeviceError};
use super::dispatch::{BlockDispatcher, BlockSample, PlaybackFeeder};
use crate::config::{SampleWidth, StreamFormat};
use crate::lock_or_recover;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig, SupportedStreamConfigRange};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Captured blocks allowed to queue up before new ones are dropped.
const CAPTURE_QUEUE_BLOCKS: usize = 16;

/// Playback blocks queued beyond the priming run.
const PLAYBACK_SLACK_BLOCKS: usize = 2;

/// Lower bound for how long a single read or write may wait.
const MIN_IO_TIMEOUT: Duration = Duration::from_secs(1);

/// Names of the audio devices the default host exposes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeviceListing {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// List capture and playback device names so the CLI can expose a selector.
pub fn list_devices() -> Result<DeviceListing> {
    let host = cpal::default_host();
    let mut listing = DeviceListing::default();
    for device in host.input_devices().context("no input devices available")? {
        if let Ok(name) = device.name() {
            listing.inputs.push(name);
        }
    }
    for device in host
        .output_devices()
        .context("no output devices available")?
    {
        if let Ok(name) = device.name() {
            listing.outputs.push(name);
        }
    }
    Ok(listing)
}

/// Audio device backed by the default CPAL host.
pub struct CpalDevice {
    format: StreamFormat,
    input_name: Option<String>,
    output_name: Option<String>,
    playback_queue_blocks: usize,
    io_timeout: Duration,
    session: Option<DuplexSession>,
}

struct DuplexSession {
    input: cpal::Stream,
    output: cpal::Stream,
    captured: Receiver<Vec<u8>>,
    playback: Sender<Vec<u8>>,
    underflow: Arc<AtomicBool>,
    fault: Arc<Mutex<Option<String>>>,
    dropped: Arc<AtomicUsize>,
}

impl DuplexSession {
    fn take_fault(&self) -> Option<String> {
        lock_or_recover(&self.fault, "audio stream fault").take()
    }
}

impl CpalDevice {
    /// Create a closed device. `prime_blocks` sizes the playback queue so a
    /// full priming run never blocks.
    pub fn new(
        format: StreamFormat,
        input_name: Option<String>,
        output_name: Option<String>,
        prime_blocks: usize,
    ) -> Self {
        let period = Duration::from_secs_f64(format.block_period_secs());
        Self {
            format,
            input_name,
            output_name,
            playback_queue_blocks: prime_blocks.max(1) + PLAYBACK_SLACK_BLOCKS,
            io_timeout: (period * 8).max(MIN_IO_TIMEOUT),
            session: None,
        }
    }

    fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            channels: self.format.channels,
            sample_rate: SampleRate(self.format.sample_rate),
            buffer_size: BufferSize::Default,
        }
    }

    fn build_session<T>(
        &self,
        input: &cpal::Device,
        output: &cpal::Device,
    ) -> Result<DuplexSession, DeviceError>
    where
        T: BlockSample + cpal::SizedSample + Send + 'static,
    {
        let config = self.stream_config();
        let (capture_tx, captured) = bounded::<Vec<u8>>(CAPTURE_QUEUE_BLOCKS);
        let (playback, playback_rx) = bounded::<Vec<u8>>(self.playback_queue_blocks);
        let underflow = Arc::new(AtomicBool::new(false));
        let fault = Arc::new(Mutex::new(None));
        let dropped = Arc::new(AtomicUsize::new(0));

        let mut dispatcher =
            BlockDispatcher::new(self.format.block_bytes(), capture_tx, dropped.clone());
        let input_fault = fault.clone();
        let input_stream = input
            .build_input_stream(
                &config,
                move |data: &[T], _: &cpal::InputCallbackInfo| dispatcher.push(data),
                move |err| {
                    warn!(error = %err, "audio input stream error");
                    *lock_or_recover(&input_fault, "audio input fault") = Some(err.to_string());
                },
                None,
            )
            .map_err(|err| DeviceError::Build(format!("input: {err}")))?;

        let mut feeder = PlaybackFeeder::new(playback_rx, underflow.clone());
        let output_fault = fault.clone();
        let output_stream = output
            .build_output_stream(
                &config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| feeder.fill(data),
                move |err| {
                    warn!(error = %err, "audio output stream error");
                    *lock_or_recover(&output_fault, "audio output fault") = Some(err.to_string());
                },
                None,
            )
            .map_err(|err| DeviceError::Build(format!("output: {err}")))?;

        input_stream
            .play()
            .map_err(|err| DeviceError::Play(format!("input: {err}")))?;
        output_stream
            .play()
            .map_err(|err| DeviceError::Play(format!("output: {err}")))?;

        Ok(DuplexSession {
            input: input_stream,
            output: output_stream,
            captured,
            playback,
            underflow,
            fault,
            dropped,
        })
    }
}

impl AudioDevice for CpalDevice {
    fn open(&mut self) -> Result<(), DeviceError> {
        self.close();
        let host = cpal::default_host();
        let input = resolve_input(&host, self.input_name.as_deref())?;
        let output = resolve_output(&host, self.output_name.as_deref())?;

        let wanted = sample_format_for(self.format.width);
        let input_ranges: Vec<SupportedStreamConfigRange> = input
            .supported_input_configs()
            .map_err(|err| DeviceError::Open(format!("input configs: {err}")))?
            .collect();
        ensure_supported(&input_ranges, &self.format, wanted, "input")?;
        let output_ranges: Vec<SupportedStreamConfigRange> = output
            .supported_output_configs()
            .map_err(|err| DeviceError::Open(format!("output configs: {err}")))?
            .collect();
        ensure_supported(&output_ranges, &self.format, wanted, "output")?;

        let session = match self.format.width {
            SampleWidth::U8 => self.build_session::<u8>(&input, &output)?,
            SampleWidth::I16 => self.build_session::<i16>(&input, &output)?,
            SampleWidth::F32 => self.build_session::<f32>(&input, &output)?,
        };
        debug!(
            format = self.format.width.label(),
            sample_rate = self.format.sample_rate,
            channels = self.format.channels,
            chunk = self.format.chunk_frames,
            "audio device opened"
        );
        self.session = Some(session);
        Ok(())
    }

    fn close(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if let Err(err) = session.input.pause() {
            debug!(error = %err, "failed to pause input stream");
        }
        if let Err(err) = session.output.pause() {
            debug!(error = %err, "failed to pause output stream");
        }
        let dropped = session.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            debug!(dropped, "capture blocks dropped while device was open");
        }
    }

    fn read_block(&mut self, block: &mut [u8]) -> Result<(), DeviceError> {
        let session = self.session.as_ref().ok_or(DeviceError::NotOpen)?;
        if let Some(reason) = session.take_fault() {
            return Err(DeviceError::Disconnected(reason));
        }
        match session.captured.recv_timeout(self.io_timeout) {
            Ok(data) => {
                let copied = block.len().min(data.len());
                block[..copied].copy_from_slice(&data[..copied]);
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => Err(DeviceError::CaptureTimeout(self.io_timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(DeviceError::Disconnected(
                "capture callback went away".to_string(),
            )),
        }
    }

    fn write_block(&mut self, block: &[u8]) -> Result<(), DeviceError> {
        let session = self.session.as_ref().ok_or(DeviceError::NotOpen)?;
        if session.underflow.swap(false, Ordering::AcqRel) {
            return Err(DeviceError::Underflow);
        }
        match session.playback.send_timeout(block.to_vec(), self.io_timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(DeviceError::Disconnected(
                "playback stopped consuming blocks".to_string(),
            )),
            Err(SendTimeoutError::Disconnected(_)) => Err(DeviceError::Disconnected(
                "playback callback went away".to_string(),
            )),
        }
    }

    fn describe(&self) -> String {
        format!(
            "input '{}' / output '{}' ({} Hz, {} ch, {})",
            self.input_name.as_deref().unwrap_or("default"),
            self.output_name.as_deref().unwrap_or("default"),
            self.format.sample_rate,
            self.format.channels,
            self.format.width.label()
        )
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        self.close();
    }
}

fn sample_format_for(width: SampleWidth) -> SampleFormat {
    match width {
        SampleWidth::U8 => SampleFormat::U8,
        SampleWidth::I16 => SampleFormat::I16,
        SampleWidth::F32 => SampleFormat::F32,
    }
}

fn resolve_input(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, DeviceError> {
    match name {
        Some(name) => host
            .input_devices()
            .map_err(|err| DeviceError::Open(format!("no input devices available: {err}")))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| DeviceError::Open(format!("input device '{name}' not found"))),
        None => host.default_input_device().ok_or_else(|| {
            DeviceError::Open(format!(
                "no default input device available. {}",
                audio_permission_hint()
            ))
        }),
    }
}

fn resolve_output(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, DeviceError> {
    match name {
        Some(name) => host
            .output_devices()
            .map_err(|err| DeviceError::Open(format!("no output devices available: {err}")))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| DeviceError::Open(format!("output device '{name}' not found"))),
        None => host
            .default_output_device()
            .ok_or_else(|| DeviceError::Open("no default output device available".to_string())),
    }
}

fn ensure_supported(
    ranges: &[SupportedStreamConfigRange],
    format: &StreamFormat,
    wanted: SampleFormat,
    direction: &str,
) -> Result<(), DeviceError> {
    let supported = ranges.iter().any(|range| {
        range.sample_format() == wanted
            && range.channels() == format.channels
            && range.min_sample_rate().0 <= format.sample_rate
            && format.sample_rate <= range.max_sample_rate().0
    });
    if supported {
        Ok(())
    } else {
        Err(DeviceError::UnsupportedFormat(format!(
            "{direction} cannot run {} Hz, {} channel(s), {wanted:?}",
            format.sample_rate, format.channels
        )))
    }
}

fn audio_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check ALSA/PipeWire/PulseAudio permissions and that the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS audio permissions."
    }
}
