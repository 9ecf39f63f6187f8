//! Channel plumbing between the CPAL callbacks and the blocking block device.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

/// Sample types carried inside byte blocks, encoded little-endian.
pub(super) trait BlockSample: Copy {
    const WIDTH: usize;
    const SILENCE: Self;

    fn append_bytes(self, out: &mut Vec<u8>);
    fn from_block_bytes(bytes: &[u8]) -> Self;
}

impl BlockSample for u8 {
    const WIDTH: usize = 1;
    const SILENCE: Self = 0x80;

    fn append_bytes(self, out: &mut Vec<u8>) {
        out.push(self);
    }

    fn from_block_bytes(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl BlockSample for i16 {
    const WIDTH: usize = 2;
    const SILENCE: Self = 0;

    fn append_bytes(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn from_block_bytes(bytes: &[u8]) -> Self {
        i16::from_le_bytes([bytes[0], bytes[1]])
    }
}

impl BlockSample for f32 {
    const WIDTH: usize = 4;
    const SILENCE: Self = 0.0;

    fn append_bytes(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn from_block_bytes(bytes: &[u8]) -> Self {
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Regroups whatever the capture callback delivers into fixed-size blocks.
/// Blocks that do not fit in the channel are dropped and counted; capture
/// overflow is never an error.
pub(super) struct BlockDispatcher {
    block_bytes: usize,
    pending: Vec<u8>,
    sender: Sender<Vec<u8>>,
    dropped: Arc<AtomicUsize>,
}

impl BlockDispatcher {
    pub(super) fn new(block_bytes: usize, sender: Sender<Vec<u8>>, dropped: Arc<AtomicUsize>) -> Self {
        Self {
            block_bytes: block_bytes.max(1),
            pending: Vec::with_capacity(block_bytes * 2),
            sender,
            dropped,
        }
    }

    pub(super) fn push<T: BlockSample>(&mut self, data: &[T]) {
        for sample in data.iter().copied() {
            sample.append_bytes(&mut self.pending);
        }

        while self.pending.len() >= self.block_bytes {
            let block: Vec<u8> = self.pending.drain(..self.block_bytes).collect();
            if let Err(err) = self.sender.try_send(block) {
                match err {
                    TrySendError::Full(_) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    TrySendError::Disconnected(_) => break,
                }
            }
        }
    }
}

/// Feeds queued blocks to the playback callback. Running dry raises the shared
/// underflow flag, but only once at least one block has been played since the
/// stream opened, so a stream waiting for its priming blocks is not flagged.
pub(super) struct PlaybackFeeder {
    receiver: Receiver<Vec<u8>>,
    current: Vec<u8>,
    offset: usize,
    armed: bool,
    underflow: Arc<AtomicBool>,
}

impl PlaybackFeeder {
    pub(super) fn new(receiver: Receiver<Vec<u8>>, underflow: Arc<AtomicBool>) -> Self {
        Self {
            receiver,
            current: Vec::new(),
            offset: 0,
            armed: false,
            underflow,
        }
    }

    pub(super) fn fill<T: BlockSample>(&mut self, out: &mut [T]) {
        for index in 0..out.len() {
            if self.offset + T::WIDTH > self.current.len() {
                match self.receiver.try_recv() {
                    Ok(block) => {
                        self.current = block;
                        self.offset = 0;
                        self.armed = true;
                    }
                    Err(_) => {
                        if self.armed {
                            self.underflow.store(true, Ordering::Release);
                        }
                        out[index..].fill(T::SILENCE);
                        return;
                    }
                }
            }
            out[index] = T::from_block_bytes(&self.current[self.offset..self.offset + T::WIDTH]);
            self.offset += T::WIDTH;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn dispatcher_emits_whole_blocks() {
        let (tx, rx) = bounded(8);
        let dropped = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = BlockDispatcher::new(4, tx, dropped.clone());

        dispatcher.push(&[1i16, 2, 3]);
        let block = rx.try_recv().expect("one full block");
        assert_eq!(block, vec![1, 0, 2, 0]);
        assert!(rx.try_recv().is_err());

        dispatcher.push(&[4i16]);
        assert_eq!(rx.try_recv().expect("second block"), vec![3, 0, 4, 0]);
        assert_eq!(dropped.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn dispatcher_counts_dropped_blocks_when_full() {
        let (tx, _rx) = bounded(1);
        let dropped = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = BlockDispatcher::new(2, tx, dropped.clone());
        dispatcher.push(&[1u8, 2, 3, 4, 5, 6]);
        assert_eq!(dropped.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn feeder_plays_queued_blocks_in_order() {
        let (tx, rx) = bounded(4);
        let underflow = Arc::new(AtomicBool::new(false));
        let mut feeder = PlaybackFeeder::new(rx, underflow.clone());
        tx.send(1.5f32.to_le_bytes().to_vec()).expect("queue block");
        tx.send((-0.25f32).to_le_bytes().to_vec()).expect("queue block");

        let mut out = [9.0f32; 2];
        feeder.fill(&mut out);
        assert_eq!(out, [1.5, -0.25]);
        assert!(!underflow.load(Ordering::Acquire));
    }

    #[test]
    fn feeder_does_not_flag_underflow_before_first_block() {
        let (_tx, rx) = bounded::<Vec<u8>>(4);
        let underflow = Arc::new(AtomicBool::new(false));
        let mut feeder = PlaybackFeeder::new(rx, underflow.clone());

        let mut out = [0u8; 3];
        feeder.fill(&mut out);
        assert_eq!(out, [0x80; 3]);
        assert!(!underflow.load(Ordering::Acquire));
    }

    #[test]
    fn feeder_flags_underflow_after_running_dry() {
        let (tx, rx) = bounded(4);
        let underflow = Arc::new(AtomicBool::new(false));
        let mut feeder = PlaybackFeeder::new(rx, underflow.clone());
        tx.send(vec![7u8, 0]).expect("queue block");

        let mut out = [1i16; 3];
        feeder.fill(&mut out);
        assert_eq!(out, [7, 0, 0]);
        assert!(underflow.load(Ordering::Acquire));
    }
}
