//! Delay readout targets.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const DISPLAY_HEADER: &str = "Current delay:";

/// The two lines shown on the panel.
pub fn render_delay(seconds: f64) -> [String; 2] {
    [DISPLAY_HEADER.to_string(), format!("{seconds:4.1}s")]
}

/// Somewhere to show the current delay. Failures are logged, never fatal.
pub trait StatusDisplay {
    fn show_delay(&mut self, seconds: f64);
    fn blank(&mut self);
}

/// Headless display: every render goes to the trace log.
#[derive(Debug, Default)]
pub struct TracingDisplay;

impl StatusDisplay for TracingDisplay {
    fn show_delay(&mut self, seconds: f64) {
        let [header, value] = render_delay(seconds);
        info!(%header, %value, "display updated");
    }

    fn blank(&mut self) {
        debug!("display blanked");
    }
}

/// Writes the rendered lines to a file an external panel driver can watch.
/// Blanking truncates the file.
#[derive(Debug)]
pub struct FileDisplay {
    path: PathBuf,
}

impl FileDisplay {
    /// Create or truncate `path` so a stale reading never lingers.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::write(&path, b"")
            .with_context(|| format!("failed to create display file {}", path.display()))?;
        Ok(Self { path })
    }

    fn write(&self, contents: &str) {
        if let Err(err) = fs::write(&self.path, contents) {
            warn!(path = %self.path.display(), error = %err, "display write failed");
        }
    }
}

impl StatusDisplay for FileDisplay {
    fn show_delay(&mut self, seconds: f64) {
        let [header, value] = render_delay(seconds);
        self.write(&format!("{header}\n{value}\n"));
    }

    fn blank(&mut self) {
        self.write("");
    }
}
