//! Messages and links between the control hub and its two workers.
//!
//! The hub is the only writer of the delay. It talks to each worker over one
//! [`Endpoint`] pair; the workers never talk to each other.

mod hub;
mod keys;
mod status;

pub use hub::{ControlHub, ShutdownCause, ShutdownReport, WorkerHandles};
pub use keys::KeyCommand;
pub use status::{StatusLine, DELAY_PROMPT};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Hub to worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMessage {
    /// New absolute delay in seconds, already clamped.
    SetDelay(f64),
    Quit,
}

/// Display worker to hub.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelEvent {
    /// Signed change requested by a held button.
    Delta(f64),
    /// Both buttons held at once.
    Quit,
}

/// Audio engine to hub.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    /// Device open, ring allocated, output primed.
    Ready {
        buffer_blocks: usize,
        blocks_per_second: f64,
    },
    /// The device is gone and could not be reopened.
    Failed(String),
}

/// One side of a bidirectional link.
#[derive(Debug)]
pub struct Endpoint<Out, In> {
    sender: Sender<Out>,
    receiver: Receiver<In>,
}

/// Create a connected pair of endpoints.
pub fn link<A, B>() -> (Endpoint<A, B>, Endpoint<B, A>) {
    let (a_tx, a_rx) = unbounded();
    let (b_tx, b_rx) = unbounded();
    (
        Endpoint {
            sender: a_tx,
            receiver: b_rx,
        },
        Endpoint {
            sender: b_tx,
            receiver: a_rx,
        },
    )
}

impl<Out, In> Endpoint<Out, In> {
    /// Send without blocking. Returns false once the peer has gone away.
    pub fn send(&self, message: Out) -> bool {
        self.sender.send(message).is_ok()
    }

    pub fn try_recv(&self) -> Result<In, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<In, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn receiver(&self) -> &Receiver<In> {
        &self.receiver
    }
}

/// What a worker found when it drained its inbox.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Pending {
    /// Most recent `SetDelay`; earlier ones are superseded.
    pub latest_delay: Option<f64>,
    pub quit: bool,
}

/// Drain everything queued without blocking. `Quit` ends the drain at once so
/// nothing queued behind it is processed; a vanished hub counts as `Quit`.
pub fn drain_pending(receiver: &Receiver<ControlMessage>) -> Pending {
    let mut pending = Pending::default();
    loop {
        match receiver.try_recv() {
            Ok(ControlMessage::SetDelay(seconds)) => pending.latest_delay = Some(seconds),
            Ok(ControlMessage::Quit) | Err(TryRecvError::Disconnected) => {
                pending.quit = true;
                break;
            }
            Err(TryRecvError::Empty) => break,
        }
    }
    pending
}
