use crate::config::AppConfig;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

pub const TRACE_LOG_ENV: &str = "RADIO_DELAY_TRACE_LOG";

pub fn tracing_log_path() -> PathBuf {
    env::var(TRACE_LOG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("radio_delay_trace.jsonl"))
}

pub fn tracing_enabled(config: &AppConfig) -> bool {
    config.logs && !config.no_logs
}

/// Install the JSON file subscriber. The terminal is in raw mode and owned by
/// the status line, so nothing is ever logged there.
pub fn init_tracing(config: &AppConfig) {
    if !tracing_enabled(config) {
        return;
    }

    let _ = TRACING_INIT.get_or_init(|| {
        let path = tracing_log_path();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(_) => return,
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_thread_names(true)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn logging_needs_logs_without_no_logs() {
        let off = AppConfig::parse_from(["radio-delay"]);
        assert!(!tracing_enabled(&off));
        let on = AppConfig::parse_from(["radio-delay", "--logs"]);
        assert!(tracing_enabled(&on));
        let vetoed = AppConfig::parse_from(["radio-delay", "--logs", "--no-logs"]);
        assert!(!tracing_enabled(&vetoed));
    }
}
