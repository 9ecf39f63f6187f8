use super::defaults::{
    MAX_BUFFER_SECS, MAX_CHANNELS, MAX_CHUNK_FRAMES, MAX_DISPLAY_POLL_MS,
    MAX_DISPLAY_TIMEOUT_SECS, MAX_PRIME_BLOCKS, MAX_SAMPLE_RATE, MIN_CHUNK_FRAMES,
    MIN_DISPLAY_POLL_MS, MIN_SAMPLE_RATE,
};
use super::{AppConfig, SampleWidth, StreamFormat};
use crate::audio::BufferGeometry;
use crate::delay::DelayLimits;
use anyhow::{anyhow, bail, Result};
use clap::Parser;
use std::time::Duration;

/// Upper bound on the ring buffer allocation.
const MAX_RING_BYTES: usize = 2 * 1024 * 1024 * 1024;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values before any device is touched.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            bail!(
                "--sample-rate must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE} Hz, got {}",
                self.sample_rate
            );
        }
        if !(MIN_CHUNK_FRAMES..=MAX_CHUNK_FRAMES).contains(&self.chunk) {
            bail!(
                "--chunk must be between {MIN_CHUNK_FRAMES} and {MAX_CHUNK_FRAMES} frames, got {}",
                self.chunk
            );
        }
        if SampleWidth::from_bytes(self.width).is_none() {
            bail!("--width must be 1, 2 or 4 bytes, got {}", self.width);
        }
        if !(1..=MAX_CHANNELS).contains(&self.channels) {
            bail!(
                "--channels must be between 1 and {MAX_CHANNELS}, got {}",
                self.channels
            );
        }
        if !self.bffsz.is_finite() || self.bffsz <= 0.0 || self.bffsz > MAX_BUFFER_SECS {
            bail!(
                "--bffsz must be greater than 0 and at most {MAX_BUFFER_SECS} seconds, got {}",
                self.bffsz
            );
        }
        if self.primelen > MAX_PRIME_BLOCKS {
            bail!(
                "--primelen must be at most {MAX_PRIME_BLOCKS} blocks, got {}",
                self.primelen
            );
        }
        if !self.increment.is_finite() || self.increment <= 0.0 {
            bail!("--increment must be a positive number of seconds, got {}", self.increment);
        }
        let headroom = self.headroom_secs();
        if !headroom.is_finite() || headroom < 0.0 {
            bail!("--headroom must not be negative, got {headroom}");
        }

        let geometry = self.buffer_geometry();
        if geometry.len_blocks() < 2 {
            bail!(
                "--bffsz {} holds fewer than two blocks at {} Hz / {} frames",
                self.bffsz,
                self.sample_rate,
                self.chunk
            );
        }
        // A margin shorter than one block lets the read cursor land on the slot being written.
        if headroom * geometry.blocks_per_second() + 1e-9 < 1.0 {
            bail!(
                "--headroom must cover at least one block ({:.4} s at this rate/chunk), got {headroom}",
                1.0 / geometry.blocks_per_second()
            );
        }
        let ring_bytes = geometry
            .len_blocks()
            .checked_mul(self.stream_format().block_bytes())
            .ok_or_else(|| anyhow!("ring buffer size overflows"))?;
        if ring_bytes > MAX_RING_BYTES {
            bail!(
                "ring buffer would need {ring_bytes} bytes (max {MAX_RING_BYTES}); lower --bffsz, --channels or --width"
            );
        }

        let limits = self.delay_limits();
        if limits.min() > limits.max() {
            bail!(
                "--increment ({}) and --headroom ({headroom}) leave no valid delay range within --bffsz ({})",
                self.increment,
                self.bffsz
            );
        }
        if !self.delay.is_finite() || !limits.contains(self.delay) {
            bail!(
                "--delay must be between {} and {} seconds, got {}",
                limits.min(),
                limits.max(),
                self.delay
            );
        }

        if !(MIN_DISPLAY_POLL_MS..=MAX_DISPLAY_POLL_MS).contains(&self.display_poll_ms) {
            bail!(
                "--display-poll-ms must be between {MIN_DISPLAY_POLL_MS} and {MAX_DISPLAY_POLL_MS}, got {}",
                self.display_poll_ms
            );
        }
        if !(1..=MAX_DISPLAY_TIMEOUT_SECS).contains(&self.display_timeout_secs) {
            bail!(
                "--display-timeout-secs must be between 1 and {MAX_DISPLAY_TIMEOUT_SECS}, got {}",
                self.display_timeout_secs
            );
        }
        if self.more_button_gpio.is_some() != self.less_button_gpio.is_some() {
            bail!("--more-button-gpio and --less-button-gpio must be given together");
        }
        if self.more_button_gpio.is_some() && self.more_button_gpio == self.less_button_gpio {
            bail!("--more-button-gpio and --less-button-gpio must be different pins");
        }

        Ok(())
    }

    /// Snapshot the device-facing stream parameters.
    pub fn stream_format(&self) -> StreamFormat {
        StreamFormat {
            sample_rate: self.sample_rate,
            chunk_frames: self.chunk,
            channels: self.channels,
            width: SampleWidth::from_bytes(self.width).unwrap_or(SampleWidth::I16),
        }
    }

    pub fn buffer_geometry(&self) -> BufferGeometry {
        BufferGeometry::new(self.sample_rate, self.chunk, self.bffsz)
    }

    /// Upper clamp margin; one increment unless `--headroom` overrides it.
    pub fn headroom_secs(&self) -> f64 {
        self.headroom.unwrap_or(self.increment)
    }

    pub fn delay_limits(&self) -> DelayLimits {
        DelayLimits::new(self.increment, self.bffsz - self.headroom_secs())
    }

    pub fn display_poll_interval(&self) -> Duration {
        Duration::from_millis(self.display_poll_ms)
    }

    pub fn display_timeout(&self) -> Duration {
        Duration::from_secs(self.display_timeout_secs)
    }
}
