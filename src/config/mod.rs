//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::Parser;
use std::path::PathBuf;

pub use defaults::{
    DEFAULT_BUFFER_SECS, DEFAULT_CHANNELS, DEFAULT_CHUNK_FRAMES, DEFAULT_DELAY_SECS,
    DEFAULT_DISPLAY_POLL_MS, DEFAULT_DISPLAY_TIMEOUT_SECS, DEFAULT_GPIO_ROOT,
    DEFAULT_INCREMENT_SECS, DEFAULT_PRIME_BLOCKS, DEFAULT_SAMPLE_RATE, DEFAULT_SAMPLE_WIDTH,
};

/// CLI options for Radio Delay. Everything is fixed at startup; the only live
/// setting is the delay itself, which the control hub owns.
#[derive(Debug, Parser, Clone)]
#[command(about = "Radio Delay: live audio delay line", author, version)]
pub struct AppConfig {
    /// Initial delay (seconds)
    #[arg(long, default_value_t = DEFAULT_DELAY_SECS)]
    pub delay: f64,

    /// Capture and playback sample rate (Hz)
    #[arg(long = "sample-rate", alias = "sample_rate", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Frames per audio block
    #[arg(long, default_value_t = DEFAULT_CHUNK_FRAMES)]
    pub chunk: u32,

    /// Bytes per sample (1 = unsigned 8-bit, 2 = signed 16-bit, 4 = 32-bit float)
    #[arg(long, default_value_t = DEFAULT_SAMPLE_WIDTH)]
    pub width: u16,

    /// Number of interleaved channels
    #[arg(long, default_value_t = DEFAULT_CHANNELS)]
    pub channels: u16,

    /// Ring buffer capacity (seconds)
    #[arg(long, default_value_t = DEFAULT_BUFFER_SECS)]
    pub bffsz: f64,

    /// Silence blocks written to the output after every device (re)open
    #[arg(long, default_value_t = DEFAULT_PRIME_BLOCKS)]
    pub primelen: usize,

    /// Delay change per key or button press (seconds); also the minimum delay
    #[arg(long, default_value_t = DEFAULT_INCREMENT_SECS)]
    pub increment: f64,

    /// Margin kept between the maximum delay and the buffer capacity (seconds);
    /// defaults to one increment
    #[arg(long)]
    pub headroom: Option<f64>,

    /// Preferred audio input device name
    #[arg(long = "input-device")]
    pub input_device: Option<String>,

    /// Preferred audio output device name
    #[arg(long = "output-device")]
    pub output_device: Option<String>,

    /// Print detected audio devices and exit
    #[arg(long = "list-devices", default_value_t = false)]
    pub list_devices: bool,

    /// GPIO number of the "more delay" push-button (sysfs numbering)
    #[arg(long = "more-button-gpio")]
    pub more_button_gpio: Option<u32>,

    /// GPIO number of the "less delay" push-button (sysfs numbering)
    #[arg(long = "less-button-gpio")]
    pub less_button_gpio: Option<u32>,

    /// Root of the sysfs GPIO tree
    #[arg(long = "gpio-root", default_value = DEFAULT_GPIO_ROOT)]
    pub gpio_root: PathBuf,

    /// Mirror the display panel into this file instead of the trace log
    #[arg(long = "display-file")]
    pub display_file: Option<PathBuf>,

    /// Button and display poll interval (milliseconds)
    #[arg(long = "display-poll-ms", default_value_t = DEFAULT_DISPLAY_POLL_MS)]
    pub display_poll_ms: u64,

    /// Blank the display after this much input inactivity (seconds)
    #[arg(long = "display-timeout-secs", default_value_t = DEFAULT_DISPLAY_TIMEOUT_SECS)]
    pub display_timeout_secs: u64,

    /// Enable file logging (JSON trace)
    #[arg(long = "logs", env = "RADIO_DELAY_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs)
    #[arg(long = "no-logs", env = "RADIO_DELAY_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,
}

/// Sample encoding negotiated with the audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    U8,
    I16,
    F32,
}

impl SampleWidth {
    pub fn from_bytes(width: u16) -> Option<Self> {
        match width {
            1 => Some(SampleWidth::U8),
            2 => Some(SampleWidth::I16),
            4 => Some(SampleWidth::F32),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            SampleWidth::U8 => 1,
            SampleWidth::I16 => 2,
            SampleWidth::F32 => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SampleWidth::U8 => "u8",
            SampleWidth::I16 => "i16",
            SampleWidth::F32 => "f32",
        }
    }
}

/// Device-facing stream parameters derived from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub chunk_frames: u32,
    pub channels: u16,
    pub width: SampleWidth,
}

impl StreamFormat {
    /// Size in bytes of one block (`chunk` frames of interleaved samples).
    pub fn block_bytes(&self) -> usize {
        self.chunk_frames as usize * usize::from(self.channels) * self.width.bytes()
    }

    /// Samples (not frames) in one block.
    pub fn block_samples(&self) -> usize {
        self.chunk_frames as usize * usize::from(self.channels)
    }

    /// Wall-clock duration of one block.
    pub fn block_period_secs(&self) -> f64 {
        f64::from(self.chunk_frames) / f64::from(self.sample_rate)
    }

    /// One block of the encoding's equilibrium value. Unsigned 8-bit silence
    /// sits at 0x80, everything else at zero.
    pub fn silence_block(&self) -> Vec<u8> {
        let fill = match self.width {
            SampleWidth::U8 => 0x80,
            SampleWidth::I16 | SampleWidth::F32 => 0x00,
        };
        vec![fill; self.block_bytes()]
    }
}
