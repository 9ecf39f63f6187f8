//! Blocking block-oriented audio device seam.

use std::time::Duration;

/// Faults reported by an [`AudioDevice`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// Playback ran dry since the previous write.
    #[error("playback underflow")]
    Underflow,

    /// No captured block arrived in time.
    #[error("capture timed out after {0:?}")]
    CaptureTimeout(Duration),

    /// The backend reported the stream as gone.
    #[error("audio stream disconnected: {0}")]
    Disconnected(String),

    /// The device could not be found or opened.
    #[error("failed to open audio device: {0}")]
    Open(String),

    /// The device cannot run the requested sample encoding.
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Building an input or output stream failed.
    #[error("failed to build audio stream: {0}")]
    Build(String),

    /// Starting a stream failed.
    #[error("failed to start audio stream: {0}")]
    Play(String),

    /// Read or write on a device that is not open.
    #[error("audio device is not open")]
    NotOpen,
}

impl DeviceError {
    /// Faults the engine masks by reopening the device and re-priming output.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DeviceError::Underflow | DeviceError::CaptureTimeout(_) | DeviceError::Disconnected(_)
        )
    }
}

/// Simultaneous capture/playback device moving whole blocks.
///
/// `read_block` blocks until one block has been captured; `write_block` blocks
/// while the playback queue is full. Both are the audio engine's only blocking
/// calls, so together they set its cadence.
pub trait AudioDevice {
    fn open(&mut self) -> Result<(), DeviceError>;

    /// Stop and release the streams. Closing a closed device is a no-op.
    fn close(&mut self);

    fn read_block(&mut self, block: &mut [u8]) -> Result<(), DeviceError>;

    fn write_block(&mut self, block: &[u8]) -> Result<(), DeviceError>;

    fn describe(&self) -> String {
        "audio device".to_string()
    }
}
