/// Single-key commands read from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Increase,
    Decrease,
    Quit,
}

impl KeyCommand {
    /// Map one input byte; anything unrecognised is ignored.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b']' => Some(KeyCommand::Increase),
            b'[' => Some(KeyCommand::Decrease),
            // Ctrl-C arrives as a plain byte while the terminal is in raw mode.
            b'q' | 0x03 => Some(KeyCommand::Quit),
            _ => None,
        }
    }

    /// Signed step for delay keys, `None` for quit.
    pub fn delta(self, increment: f64) -> Option<f64> {
        match self {
            KeyCommand::Increase => Some(increment),
            KeyCommand::Decrease => Some(-increment),
            KeyCommand::Quit => None,
        }
    }
}
