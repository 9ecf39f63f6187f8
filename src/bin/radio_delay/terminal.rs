use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Set by the SIGTERM/SIGINT/SIGHUP handler; the control hub polls it.
static TERMINATION_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Only touches an atomic, which is async-signal-safe.
extern "C" fn handle_termination(_: libc::c_int) {
    TERMINATION_REQUESTED.store(true, Ordering::SeqCst);
}

pub(crate) fn install_termination_handler() -> Result<()> {
    for signal in [libc::SIGTERM, libc::SIGINT, libc::SIGHUP] {
        unsafe {
            // SAFETY: handle_termination only flips an atomic flag.
            let handler = handle_termination as *const () as libc::sighandler_t;
            if libc::signal(signal, handler) == libc::SIG_ERR {
                debug!(signal, "failed to install termination handler");
                return Err(anyhow!("failed to install handler for signal {signal}"));
            }
        }
    }
    Ok(())
}

pub(crate) fn termination_requested() -> bool {
    TERMINATION_REQUESTED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    // One test owns the process-wide flag so parallel tests cannot race on it.
    #[test]
    fn termination_handler_sets_flag() {
        TERMINATION_REQUESTED.store(false, Ordering::SeqCst);
        handle_termination(0);
        assert!(termination_requested());
        TERMINATION_REQUESTED.store(false, Ordering::SeqCst);

        install_termination_handler().expect("install termination handler");
        unsafe {
            // SAFETY: raising SIGHUP in-process is used for test validation only.
            libc::raise(libc::SIGHUP);
        }
        for _ in 0..20 {
            if TERMINATION_REQUESTED.swap(false, Ordering::SeqCst) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("SIGHUP was not received");
    }
}
