use crossterm::{
    cursor::MoveTo,
    queue,
    terminal::{Clear, ClearType},
};
use std::io::{self, IsTerminal, Write};

pub const DELAY_PROMPT: &str = "Use \"[\" and \"]\" to change delay. Press \"q\" to quit.";

/// Human-readable delay readout. Lines end in `\r\n` so they render correctly
/// while the terminal is in raw mode.
pub struct StatusLine<W: Write> {
    out: W,
    clear_screen: bool,
}

impl StatusLine<io::Stdout> {
    /// Stdout, clearing the screen on each refresh only when it is a terminal.
    pub fn stdout() -> Self {
        let out = io::stdout();
        let clear_screen = out.is_terminal();
        Self { out, clear_screen }
    }
}

impl<W: Write> StatusLine<W> {
    pub fn new(out: W, clear_screen: bool) -> Self {
        Self { out, clear_screen }
    }

    pub fn render(&mut self, seconds: f64) -> io::Result<()> {
        if self.clear_screen {
            queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        write!(self.out, "Delay (seconds): {seconds:.1}\r\n{DELAY_PROMPT}\r\n")?;
        self.out.flush()
    }

    pub fn farewell(&mut self) -> io::Result<()> {
        write!(self.out, "Bailing out!\r\n")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_reports_delay_with_prompt() {
        let mut status = StatusLine::new(Vec::new(), false);
        status.render(6.5).expect("render");
        let text = String::from_utf8(status.into_inner()).expect("utf8");
        assert_eq!(
            text,
            "Delay (seconds): 6.5\r\nUse \"[\" and \"]\" to change delay. Press \"q\" to quit.\r\n"
        );
    }

    #[test]
    fn render_clears_screen_when_requested() {
        let mut status = StatusLine::new(Vec::new(), true);
        status.render(5.0).expect("render");
        let bytes = status.into_inner();
        assert_eq!(bytes.first(), Some(&0x1b));
        assert!(String::from_utf8_lossy(&bytes).contains("Delay (seconds): 5.0"));
    }

    #[test]
    fn farewell_line() {
        let mut status = StatusLine::new(Vec::new(), false);
        status.farewell().expect("farewell");
        assert_eq!(status.into_inner(), b"Bailing out!\r\n");
    }
}
