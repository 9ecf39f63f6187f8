use crossbeam_channel::Sender;
use radio_delay::control::KeyCommand;
use std::io::{self, Read};
use std::thread;
use tracing::debug;

/// Forward recognised key bytes from stdin. The thread ends on EOF, on a read
/// error, or once nobody is listening.
pub(crate) fn spawn_input_thread(tx: Sender<KeyCommand>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("keyboard".to_string())
        .spawn(move || {
            let mut stdin = io::stdin();
            let mut buf = [0u8; 64];
            loop {
                let n = match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(err) => {
                        debug!(error = %err, "stdin read error");
                        break;
                    }
                };
                for key in keys_in(&buf[..n]) {
                    if tx.send(key).is_err() {
                        return;
                    }
                }
            }
        })
}

fn keys_in(bytes: &[u8]) -> impl Iterator<Item = KeyCommand> + '_ {
    bytes.iter().copied().filter_map(KeyCommand::from_byte)
}
