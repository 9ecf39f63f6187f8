//! Wiring: spawn the workers in order and hand control to the hub.

use crate::audio::{spawn_audio_engine, AudioDevice, CpalDevice, EngineSettings};
use crate::config::AppConfig;
use crate::control::{
    link, AudioEvent, ControlHub, ControlMessage, Endpoint, KeyCommand, PanelEvent,
    ShutdownReport, StatusLine, WorkerHandles,
};
use crate::delay::DelayValue;
use crate::display::{
    buttons_from_config, display_from_config, spawn_display_worker, ButtonPanel, DisplaySettings,
    DisplayWorker, StatusDisplay,
};
use anyhow::{bail, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::info;

/// How long startup waits for the audio engine to open and prime the device.
pub const AUDIO_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the runtime needs that came from configuration.
#[derive(Debug, Clone)]
pub struct RuntimePlan {
    pub engine: EngineSettings,
    pub display: DisplaySettings,
    pub delay: DelayValue,
    pub increment: f64,
}

impl RuntimePlan {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            engine: EngineSettings::from_config(config),
            display: DisplaySettings::from_config(config),
            delay: DelayValue::new(config.delay, config.delay_limits()),
            increment: config.increment,
        }
    }
}

/// Running workers plus the hub-side ends of their links.
pub struct Runtime {
    plan: RuntimePlan,
    audio: Endpoint<ControlMessage, AudioEvent>,
    display: Endpoint<ControlMessage, PanelEvent>,
    workers: WorkerHandles,
}

impl Runtime {
    /// Start on the real audio device.
    pub fn start(config: &AppConfig) -> Result<Self> {
        let plan = RuntimePlan::from_config(config);
        let format = plan.engine.format;
        let input = config.input_device.clone();
        let output = config.output_device.clone();
        let prime = config.primelen;
        let buttons = buttons_from_config(config);
        let display = display_from_config(config)?;
        Self::start_with(
            plan,
            move || CpalDevice::new(format, input, output, prime),
            buttons,
            display,
        )
    }

    /// Start the audio engine, wait for it to report in, then start the
    /// display worker. Nothing else runs if the device cannot be opened.
    pub fn start_with<D, F>(
        plan: RuntimePlan,
        make_device: F,
        buttons: Box<dyn ButtonPanel + Send>,
        panel: Box<dyn StatusDisplay + Send>,
    ) -> Result<Self>
    where
        D: AudioDevice + 'static,
        F: FnOnce() -> D + Send + 'static,
    {
        let (audio, audio_worker) = link();
        let audio_thread = spawn_audio_engine(make_device, plan.engine.clone(), audio_worker)?;
        if let Err(err) = await_audio_ready(&audio) {
            // An engine stuck in startup is left detached. Dropping `audio`
            // on return disconnects its control channel, which it drains as
            // Quit once the device call returns.
            audio.send(ControlMessage::Quit);
            return Err(err);
        }

        let (display, display_side) = link();
        let worker = DisplayWorker::new(plan.display, buttons, panel, display_side, Instant::now());
        let display_thread = match spawn_display_worker(worker) {
            Ok(handle) => handle,
            Err(err) => {
                audio.send(ControlMessage::Quit);
                let _ = audio_thread.join();
                return Err(err);
            }
        };

        info!(delay = plan.delay.seconds(), "radio delay running");
        Ok(Self {
            plan,
            audio,
            display,
            workers: WorkerHandles {
                audio: audio_thread,
                display: display_thread,
            },
        })
    }

    /// Run the hub until shutdown and join both workers.
    pub fn run<W: Write>(
        self,
        keys: Receiver<KeyCommand>,
        status: StatusLine<W>,
        signalled: impl Fn() -> bool,
    ) -> ShutdownReport {
        let hub = ControlHub::new(
            self.plan.delay,
            self.plan.increment,
            self.audio,
            self.display,
            status,
        );
        hub.run(keys, self.workers, signalled)
    }
}

fn await_audio_ready(audio: &Endpoint<ControlMessage, AudioEvent>) -> Result<()> {
    match audio.recv_timeout(AUDIO_READY_TIMEOUT) {
        Ok(AudioEvent::Ready {
            buffer_blocks,
            blocks_per_second,
        }) => {
            info!(buffer_blocks, blocks_per_second, "audio engine ready");
            Ok(())
        }
        Ok(AudioEvent::Failed(reason)) => bail!("audio device failed to start: {reason}"),
        Err(RecvTimeoutError::Timeout) => bail!(
            "audio device did not start within {}s",
            AUDIO_READY_TIMEOUT.as_secs()
        ),
        Err(RecvTimeoutError::Disconnected) => bail!("audio engine exited during startup"),
    }
}
