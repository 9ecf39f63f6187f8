//! Display worker: polls the panel buttons and keeps the delay readout current.

mod buttons;
mod panel;

pub use buttons::{ButtonPanel, ButtonState, NoButtons, SysfsButtons};
pub use panel::{render_delay, FileDisplay, StatusDisplay, TracingDisplay, DISPLAY_HEADER};

use crate::config::AppConfig;
use crate::control::{drain_pending, ControlMessage, Endpoint, PanelEvent};
use anyhow::{Context, Result};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySettings {
    pub increment: f64,
    pub poll_interval: Duration,
    pub inactivity_timeout: Duration,
    pub initial_delay: f64,
}

impl DisplaySettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            increment: config.increment,
            poll_interval: config.display_poll_interval(),
            inactivity_timeout: config.display_timeout(),
            initial_delay: config.delay,
        }
    }
}

/// Pick the button source from configuration.
pub fn buttons_from_config(config: &AppConfig) -> Box<dyn ButtonPanel + Send> {
    match (config.more_button_gpio, config.less_button_gpio) {
        (Some(more), Some(less)) => Box::new(SysfsButtons::new(&config.gpio_root, more, less)),
        _ => Box::new(NoButtons),
    }
}

/// Pick the readout target from configuration.
pub fn display_from_config(config: &AppConfig) -> Result<Box<dyn StatusDisplay + Send>> {
    match &config.display_file {
        Some(path) => Ok(Box::new(FileDisplay::create(path)?)),
        None => Ok(Box::new(TracingDisplay)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerFlow {
    Continue,
    Stop,
}

pub struct DisplayWorker {
    settings: DisplaySettings,
    buttons: Box<dyn ButtonPanel + Send>,
    display: Box<dyn StatusDisplay + Send>,
    hub: Endpoint<PanelEvent, ControlMessage>,
    last_activity: Instant,
    blanked: bool,
    quit_sent: bool,
}

impl DisplayWorker {
    /// Build the worker and show the initial delay.
    pub fn new(
        settings: DisplaySettings,
        buttons: Box<dyn ButtonPanel + Send>,
        mut display: Box<dyn StatusDisplay + Send>,
        hub: Endpoint<PanelEvent, ControlMessage>,
        now: Instant,
    ) -> Self {
        display.show_delay(settings.initial_delay);
        Self {
            settings,
            buttons,
            display,
            hub,
            last_activity: now,
            blanked: false,
            quit_sent: false,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.blanked
    }

    /// One poll: hub messages first, then buttons, then the inactivity check.
    pub fn tick(&mut self, now: Instant) -> WorkerFlow {
        let pending = drain_pending(self.hub.receiver());
        if pending.quit {
            self.blank();
            return WorkerFlow::Stop;
        }
        if let Some(seconds) = pending.latest_delay {
            self.display.show_delay(seconds);
            self.blanked = false;
            self.last_activity = now;
        }

        if !self.quit_sent {
            let state = self.buttons.sample();
            let event = if state.both() {
                self.quit_sent = true;
                Some(PanelEvent::Quit)
            } else if state.more {
                Some(PanelEvent::Delta(self.settings.increment))
            } else if state.less {
                Some(PanelEvent::Delta(-self.settings.increment))
            } else {
                None
            };
            if let Some(event) = event {
                self.last_activity = now;
                if !self.hub.send(event) {
                    debug!("control hub gone, display worker stopping");
                    self.blank();
                    return WorkerFlow::Stop;
                }
            }
        }

        if now.saturating_duration_since(self.last_activity) >= self.settings.inactivity_timeout {
            self.blank();
        }
        WorkerFlow::Continue
    }

    fn blank(&mut self) {
        if !self.blanked {
            self.display.blank();
            self.blanked = true;
        }
    }

    pub fn run(mut self) {
        info!(
            poll_ms = self.settings.poll_interval.as_millis() as u64,
            "display worker started"
        );
        while self.tick(Instant::now()) == WorkerFlow::Continue {
            thread::sleep(self.settings.poll_interval);
        }
        info!("display worker stopped");
    }
}

pub fn spawn_display_worker(worker: DisplayWorker) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("display".to_string())
        .spawn(move || worker.run())
        .context("failed to spawn display worker thread")
}
