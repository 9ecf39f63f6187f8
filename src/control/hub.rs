use super::keys::KeyCommand;
use super::status::StatusLine;
use super::{AudioEvent, ControlMessage, Endpoint, PanelEvent};
use crate::audio::{DeviceError, EngineStats};
use crate::delay::DelayValue;
use crossbeam_channel::{never, select, Receiver};
use std::io::Write;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long the hub waits for input before re-checking for a termination
/// signal.
const HUB_IDLE_TIMEOUT: Duration = Duration::from_millis(10);

/// Why the program is shutting down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownCause {
    /// `q` or Ctrl-C on the terminal.
    Keyboard,
    /// Both panel buttons held.
    PanelButtons,
    /// SIGTERM, SIGINT or SIGHUP.
    Signal,
    /// The audio engine lost its device or exited.
    AudioFailure(String),
}

/// Final outcome handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownReport {
    pub cause: ShutdownCause,
    pub final_delay: f64,
    /// `None` when the engine thread failed or panicked.
    pub engine: Option<EngineStats>,
}

/// Worker threads the hub joins once it has broadcast `Quit`.
pub struct WorkerHandles {
    pub audio: JoinHandle<Result<EngineStats, DeviceError>>,
    pub display: JoinHandle<()>,
}

impl WorkerHandles {
    fn join(self) -> Option<EngineStats> {
        let stats = match self.audio.join() {
            Ok(Ok(stats)) => Some(stats),
            Ok(Err(err)) => {
                warn!(error = %err, "audio engine ended with an error");
                None
            }
            Err(_) => {
                error!("audio engine thread panicked");
                None
            }
        };
        if self.display.join().is_err() {
            error!("display worker thread panicked");
        }
        stats
    }
}

/// Owns the delay value and fans every change out to both workers.
pub struct ControlHub<W: Write> {
    delay: DelayValue,
    increment: f64,
    audio: Endpoint<ControlMessage, AudioEvent>,
    display: Endpoint<ControlMessage, PanelEvent>,
    status: StatusLine<W>,
    shutdown: Option<ShutdownCause>,
}

impl<W: Write> ControlHub<W> {
    pub fn new(
        delay: DelayValue,
        increment: f64,
        audio: Endpoint<ControlMessage, AudioEvent>,
        display: Endpoint<ControlMessage, PanelEvent>,
        status: StatusLine<W>,
    ) -> Self {
        Self {
            delay,
            increment,
            audio,
            display,
            status,
            shutdown: None,
        }
    }

    pub fn delay(&self) -> f64 {
        self.delay.seconds()
    }

    pub fn shutdown_cause(&self) -> Option<&ShutdownCause> {
        self.shutdown.as_ref()
    }

    pub fn on_key(&mut self, key: KeyCommand) {
        match key.delta(self.increment) {
            Some(delta) => self.change_delay(delta),
            None => self.request_shutdown(ShutdownCause::Keyboard),
        }
    }

    pub fn on_panel_event(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::Delta(delta) => self.change_delay(delta),
            PanelEvent::Quit => self.request_shutdown(ShutdownCause::PanelButtons),
        }
    }

    pub fn on_audio_event(&mut self, event: AudioEvent) {
        match event {
            AudioEvent::Ready {
                buffer_blocks,
                blocks_per_second,
            } => debug!(buffer_blocks, blocks_per_second, "audio engine ready"),
            AudioEvent::Failed(reason) => {
                error!(%reason, "audio engine failed");
                self.request_shutdown(ShutdownCause::AudioFailure(reason));
            }
        }
    }

    fn change_delay(&mut self, delta: f64) {
        if self.shutdown.is_some() {
            return;
        }
        let seconds = self.delay.adjust(delta);
        debug!(delta, seconds, "delay changed");
        // Both workers hear about it even when clamping left the value as is.
        self.broadcast(ControlMessage::SetDelay(seconds));
        self.show_status();
    }

    /// Broadcast `Quit` to both workers. Only the first request counts.
    pub fn request_shutdown(&mut self, cause: ShutdownCause) {
        if self.shutdown.is_some() {
            return;
        }
        info!(?cause, delay = self.delay.seconds(), "shutting down");
        self.broadcast(ControlMessage::Quit);
        if let Err(err) = self.status.farewell() {
            debug!(error = %err, "failed to write farewell");
        }
        self.shutdown = Some(cause);
    }

    fn broadcast(&self, message: ControlMessage) {
        if !self.audio.send(message) {
            debug!(?message, "audio engine no longer listening");
        }
        if !self.display.send(message) {
            debug!(?message, "display worker no longer listening");
        }
    }

    pub fn show_status(&mut self) {
        if let Err(err) = self.status.render(self.delay.seconds()) {
            debug!(error = %err, "failed to refresh status line");
        }
    }

    /// Multiplex keys, panel events and audio events until a shutdown is
    /// requested, then join both workers. `signalled` is polled between
    /// events so an external termination request is noticed promptly.
    pub fn run(
        mut self,
        keys: Receiver<KeyCommand>,
        workers: WorkerHandles,
        signalled: impl Fn() -> bool,
    ) -> ShutdownReport {
        let panel = self.display.receiver().clone();
        let audio = self.audio.receiver().clone();
        let closed_keys = never();
        let closed_panel = never();
        let mut keys_open = true;
        let mut panel_open = true;

        self.show_status();
        while self.shutdown.is_none() {
            if signalled() {
                self.request_shutdown(ShutdownCause::Signal);
                break;
            }
            let keys_rx = if keys_open { &keys } else { &closed_keys };
            let panel_rx = if panel_open { &panel } else { &closed_panel };
            select! {
                recv(keys_rx) -> key => match key {
                    Ok(key) => self.on_key(key),
                    Err(_) => {
                        debug!("keyboard input closed");
                        keys_open = false;
                    }
                },
                recv(panel_rx) -> event => match event {
                    Ok(event) => self.on_panel_event(event),
                    Err(_) => {
                        warn!("display worker exited early");
                        panel_open = false;
                    }
                },
                recv(audio) -> event => match event {
                    Ok(event) => self.on_audio_event(event),
                    Err(_) => self.request_shutdown(ShutdownCause::AudioFailure(
                        "audio engine exited".to_string(),
                    )),
                },
                default(HUB_IDLE_TIMEOUT) => {}
            }
        }

        let engine = workers.join();
        let cause = self.shutdown.take().unwrap_or(ShutdownCause::Signal);
        ShutdownReport {
            cause,
            final_delay: self.delay.seconds(),
            engine,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::link;
    use crate::delay::DelayLimits;
    use crossbeam_channel::unbounded;
    use std::thread;

    type TestHub = ControlHub<Vec<u8>>;

    struct Peers {
        audio: Endpoint<AudioEvent, ControlMessage>,
        display: Endpoint<PanelEvent, ControlMessage>,
    }

    fn hub_at(initial: f64) -> (TestHub, Peers) {
        let (hub_audio, audio) = link();
        let (hub_display, display) = link();
        let delay = DelayValue::new(initial, DelayLimits::new(0.5, 299.5));
        let hub = ControlHub::new(
            delay,
            0.5,
            hub_audio,
            hub_display,
            StatusLine::new(Vec::new(), false),
        );
        (hub, Peers { audio, display })
    }

    fn received(endpoint: &Endpoint<impl Sized, ControlMessage>) -> Vec<ControlMessage> {
        std::iter::from_fn(|| endpoint.try_recv().ok()).collect()
    }

    #[test]
    fn key_increase_broadcasts_to_both_workers() {
        let (mut hub, peers) = hub_at(5.0);
        hub.on_key(KeyCommand::Increase);
        assert_eq!(hub.delay(), 5.5);
        assert_eq!(received(&peers.audio), vec![ControlMessage::SetDelay(5.5)]);
        assert_eq!(received(&peers.display), vec![ControlMessage::SetDelay(5.5)]);
    }

    #[test]
    fn panel_delta_clamps_at_minimum_and_still_broadcasts() {
        let (mut hub, peers) = hub_at(0.5);
        hub.on_panel_event(PanelEvent::Delta(-0.5));
        assert_eq!(hub.delay(), 0.5);
        assert_eq!(received(&peers.audio), vec![ControlMessage::SetDelay(0.5)]);
        assert_eq!(received(&peers.display), vec![ControlMessage::SetDelay(0.5)]);
    }

    #[test]
    fn clamps_at_maximum() {
        let (mut hub, _peers) = hub_at(299.5);
        hub.on_key(KeyCommand::Increase);
        assert_eq!(hub.delay(), 299.5);
    }

    #[test]
    fn quit_is_broadcast_once() {
        let (mut hub, peers) = hub_at(5.0);
        hub.on_key(KeyCommand::Quit);
        hub.on_panel_event(PanelEvent::Quit);
        hub.on_key(KeyCommand::Increase);
        assert_eq!(hub.shutdown_cause(), Some(&ShutdownCause::Keyboard));
        assert_eq!(received(&peers.audio), vec![ControlMessage::Quit]);
        assert_eq!(received(&peers.display), vec![ControlMessage::Quit]);
        assert_eq!(hub.delay(), 5.0);
    }

    #[test]
    fn audio_failure_triggers_shutdown() {
        let (mut hub, peers) = hub_at(5.0);
        hub.on_audio_event(AudioEvent::Failed("unplugged".to_string()));
        assert_eq!(
            hub.shutdown_cause(),
            Some(&ShutdownCause::AudioFailure("unplugged".to_string()))
        );
        assert_eq!(received(&peers.display), vec![ControlMessage::Quit]);
    }

    #[test]
    fn status_shows_current_delay() {
        let (mut hub, _peers) = hub_at(5.0);
        hub.on_key(KeyCommand::Decrease);
        hub.request_shutdown(ShutdownCause::Keyboard);
        let text = String::from_utf8(hub.status.into_inner()).expect("utf8");
        assert!(text.contains("Delay (seconds): 4.5"));
        assert!(text.ends_with("Bailing out!\r\n"));
    }

    /// Stand-in workers that record what they saw and stop on `Quit`.
    fn spawn_echo_workers(peers: Peers) -> (WorkerHandles, Receiver<ControlMessage>) {
        let (seen_tx, seen_rx) = unbounded();
        let Peers { audio, display } = peers;
        let audio_seen = seen_tx.clone();
        let audio = thread::spawn(move || {
            while let Ok(message) = audio.receiver().recv() {
                let _ = audio_seen.send(message);
                if message == ControlMessage::Quit {
                    break;
                }
            }
            Ok(EngineStats::default())
        });
        let display = thread::spawn(move || {
            let _ = display.send(PanelEvent::Delta(1.0));
            while let Ok(message) = display.receiver().recv() {
                if message == ControlMessage::Quit {
                    break;
                }
            }
        });
        (WorkerHandles { audio, display }, seen_rx)
    }

    #[test]
    fn run_routes_events_until_quit() {
        let (hub, peers) = hub_at(5.0);
        let (keys_tx, keys_rx) = unbounded();
        let (workers, seen) = spawn_echo_workers(peers);

        keys_tx.send(KeyCommand::Increase).expect("send key");
        let runner = thread::spawn(move || hub.run(keys_rx, workers, || false));

        // The panel's +1.0 and the key's +0.5 arrive in either order.
        let mut delays = Vec::new();
        while delays.len() < 2 {
            match seen.recv_timeout(Duration::from_secs(5)).expect("audio message") {
                ControlMessage::SetDelay(seconds) => delays.push(seconds),
                ControlMessage::Quit => panic!("quit before both deltas"),
            }
        }
        assert_eq!(delays.last().copied(), Some(6.5));

        keys_tx.send(KeyCommand::Quit).expect("send quit");
        let report = runner.join().expect("hub thread");
        assert_eq!(report.cause, ShutdownCause::Keyboard);
        assert_eq!(report.final_delay, 6.5);
        assert_eq!(report.engine, Some(EngineStats::default()));
    }

    #[test]
    fn run_stops_on_signal() {
        let (hub, peers) = hub_at(5.0);
        let (_keys_tx, keys_rx) = unbounded();
        let (workers, _seen) = spawn_echo_workers(peers);
        let report = hub.run(keys_rx, workers, || true);
        assert_eq!(report.cause, ShutdownCause::Signal);
    }

    #[test]
    fn run_survives_closed_keyboard() {
        let (hub, peers) = hub_at(5.0);
        let (keys_tx, keys_rx) = unbounded::<KeyCommand>();
        drop(keys_tx);
        let audio_peer = Endpoint {
            sender: peers.audio.sender.clone(),
            receiver: peers.audio.receiver.clone(),
        };
        let (workers, _seen) = spawn_echo_workers(peers);
        let runner = thread::spawn(move || hub.run(keys_rx, workers, || false));
        audio_peer.send(AudioEvent::Failed("gone".to_string()));
        let report = runner.join().expect("hub thread");
        assert_eq!(
            report.cause,
            ShutdownCause::AudioFailure("gone".to_string())
        );
    }
}
