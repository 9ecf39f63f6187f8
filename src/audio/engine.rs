//! The capture/playback pump driving the delay ring.

use super::device::{AudioDevice, DeviceError};
use super::ring::{BufferGeometry, DelayRing};
use crate::config::{AppConfig, StreamFormat};
use crate::control::{drain_pending, AudioEvent, ControlMessage, Endpoint, Pending};
use anyhow::{Context, Result};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Reopen attempts per fault before the device is declared lost.
const MAX_REOPEN_ATTEMPTS: u32 = 3;

/// Fixed parameters the engine needs from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub format: StreamFormat,
    pub geometry: BufferGeometry,
    pub prime_blocks: usize,
    pub initial_delay: f64,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            format: config.stream_format(),
            geometry: config.buffer_geometry(),
            prime_blocks: config.primelen,
            initial_delay: config.delay,
        }
    }
}

/// Counters reported when the engine stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    pub cycles: u64,
    pub underflows: u64,
    pub recoveries: u64,
    pub retargets: u64,
}

/// What the run loop does after applying pending control messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFlow {
    Continue,
    Stop,
}

/// Owns the device and the ring. Single-threaded; the ring is never shared.
pub struct AudioEngine<D: AudioDevice> {
    device: D,
    ring: DelayRing,
    silence: Vec<u8>,
    prime_blocks: usize,
    stats: EngineStats,
}

impl<D: AudioDevice> AudioEngine<D> {
    /// Open the device, allocate the ring and prime the output with silence.
    pub fn start(mut device: D, settings: &EngineSettings) -> Result<Self, DeviceError> {
        device.open()?;
        let silence = settings.format.silence_block();
        let ring = DelayRing::new(settings.geometry, &silence, settings.initial_delay);
        let mut engine = Self {
            device,
            ring,
            silence,
            prime_blocks: settings.prime_blocks,
            stats: EngineStats::default(),
        };
        if let Err(err) = engine.prime() {
            engine.device.close();
            return Err(err);
        }
        info!(
            device = %engine.device.describe(),
            buffer_blocks = engine.ring.len(),
            write_index = engine.ring.write_index(),
            read_index = engine.ring.read_index(),
            "audio engine started"
        );
        Ok(engine)
    }

    pub fn ring(&self) -> &DelayRing {
        &self.ring
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    fn prime(&mut self) -> Result<(), DeviceError> {
        for _ in 0..self.prime_blocks {
            self.device.write_block(&self.silence)?;
        }
        Ok(())
    }

    /// One capture/play/advance step. Transient device faults are masked by
    /// reopening; only a device that cannot be reopened is reported.
    pub fn cycle(&mut self) -> Result<(), DeviceError> {
        if let Err(err) = self.device.read_block(self.ring.write_slot()) {
            if !err.is_transient() {
                return Err(err);
            }
            warn!(error = %err, "capture fault, substituting silence");
            self.ring.write_slot().copy_from_slice(&self.silence);
            self.recover(&err)?;
        }

        match self.device.write_block(self.ring.read_slot()) {
            Ok(()) => {}
            Err(err) if err.is_transient() => {
                if err == DeviceError::Underflow {
                    self.stats.underflows += 1;
                }
                self.recover(&err)?;
            }
            Err(err) => return Err(err),
        }

        self.ring.advance();
        self.stats.cycles += 1;
        Ok(())
    }

    fn recover(&mut self, cause: &DeviceError) -> Result<(), DeviceError> {
        self.stats.recoveries += 1;
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.device.close();
            match self.reopen() {
                Ok(()) => {
                    debug!(cause = %cause, attempt, "audio device reopened");
                    return Ok(());
                }
                Err(err) if err.is_transient() && attempt < MAX_REOPEN_ATTEMPTS => {
                    warn!(error = %err, attempt, "audio device reopen hit a transient fault");
                }
                Err(err) => {
                    self.device.close();
                    return Err(err);
                }
            }
        }
    }

    fn reopen(&mut self) -> Result<(), DeviceError> {
        self.device.open()?;
        self.prime()
    }

    /// Apply a drained batch of control messages. Quit wins over any delay
    /// change queued alongside it.
    pub fn apply(&mut self, pending: Pending) -> EngineFlow {
        if pending.quit {
            return EngineFlow::Stop;
        }
        if let Some(seconds) = pending.latest_delay {
            self.ring.retarget(seconds);
            self.stats.retargets += 1;
            debug!(
                seconds,
                write_index = self.ring.write_index(),
                read_index = self.ring.read_index(),
                "delay retargeted"
            );
        }
        EngineFlow::Continue
    }

    /// Pump until told to quit or the device is lost. The device is closed
    /// either way.
    pub fn run(
        mut self,
        control: &Endpoint<AudioEvent, ControlMessage>,
    ) -> Result<EngineStats, DeviceError> {
        loop {
            if let Err(err) = self.cycle() {
                self.device.close();
                return Err(err);
            }
            if self.apply(drain_pending(control.receiver())) == EngineFlow::Stop {
                break;
            }
        }
        self.device.close();
        info!(
            cycles = self.stats.cycles,
            underflows = self.stats.underflows,
            recoveries = self.stats.recoveries,
            "audio engine stopped"
        );
        Ok(self.stats)
    }
}

/// Run the engine on its own thread. The device is built on that thread, since
/// backend stream handles may not be sendable. The hub side of `control`
/// receives `Ready` once output is primed, or `Failed` if startup or a later
/// recovery fails.
pub fn spawn_audio_engine<D, F>(
    make_device: F,
    settings: EngineSettings,
    control: Endpoint<AudioEvent, ControlMessage>,
) -> Result<JoinHandle<Result<EngineStats, DeviceError>>>
where
    D: AudioDevice + 'static,
    F: FnOnce() -> D + Send + 'static,
{
    thread::Builder::new()
        .name("audio-engine".to_string())
        .spawn(move || {
            let engine = match AudioEngine::start(make_device(), &settings) {
                Ok(engine) => engine,
                Err(err) => {
                    error!(error = %err, "audio engine failed to start");
                    control.send(AudioEvent::Failed(err.to_string()));
                    return Err(err);
                }
            };
            let geometry = engine.ring().geometry();
            control.send(AudioEvent::Ready {
                buffer_blocks: geometry.len_blocks(),
                blocks_per_second: geometry.blocks_per_second(),
            });
            let outcome = engine.run(&control);
            if let Err(err) = &outcome {
                error!(error = %err, "audio device lost");
                control.send(AudioEvent::Failed(err.to_string()));
            }
            outcome
        })
        .context("failed to spawn audio engine thread")
}
