pub const DEFAULT_DELAY_SECS: f64 = 5.0;
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_CHUNK_FRAMES: u32 = 2048;
pub const DEFAULT_SAMPLE_WIDTH: u16 = 2;
pub const DEFAULT_CHANNELS: u16 = 2;
pub const DEFAULT_BUFFER_SECS: f64 = 300.0;
pub const DEFAULT_PRIME_BLOCKS: usize = 5;
pub const DEFAULT_INCREMENT_SECS: f64 = 0.5;

pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";
pub const DEFAULT_DISPLAY_POLL_MS: u64 = 200;
pub const DEFAULT_DISPLAY_TIMEOUT_SECS: u64 = 600;

pub(super) const MIN_SAMPLE_RATE: u32 = 8_000;
pub(super) const MAX_SAMPLE_RATE: u32 = 192_000;
pub(super) const MIN_CHUNK_FRAMES: u32 = 16;
pub(super) const MAX_CHUNK_FRAMES: u32 = 65_536;
pub(super) const MAX_CHANNELS: u16 = 8;
pub(super) const MAX_BUFFER_SECS: f64 = 3_600.0;
pub(super) const MAX_PRIME_BLOCKS: usize = 64;
pub(super) const MIN_DISPLAY_POLL_MS: u64 = 10;
pub(super) const MAX_DISPLAY_POLL_MS: u64 = 5_000;
pub(super) const MAX_DISPLAY_TIMEOUT_SECS: u64 = 86_400;
