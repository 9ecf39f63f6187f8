//! Audio delay pipeline.
//!
//! Every captured block is written into a pre-allocated ring and the block a
//! configurable distance behind it is played back. The device is driven
//! through CPAL, wrapped so reads and writes block for about one block period,
//! which paces the engine loop.

mod cpal_device;
mod device;
mod dispatch;
mod engine;
mod ring;

pub use cpal_device::{list_devices, CpalDevice, DeviceListing};
pub use device::{AudioDevice, DeviceError};
pub use engine::{spawn_audio_engine, AudioEngine, EngineFlow, EngineSettings, EngineStats};
pub use ring::{BufferGeometry, DelayRing};
