//! Push-button sampling.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Instantaneous state of the two delay buttons.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState {
    pub more: bool,
    pub less: bool,
}

impl ButtonState {
    pub fn both(self) -> bool {
        self.more && self.less
    }
}

pub trait ButtonPanel {
    fn sample(&mut self) -> ButtonState;
}

/// No physical buttons wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoButtons;

impl ButtonPanel for NoButtons {
    fn sample(&mut self) -> ButtonState {
        ButtonState::default()
    }
}

/// One GPIO input exported through sysfs.
#[derive(Debug)]
struct GpioPin {
    value_path: PathBuf,
    read_failed: bool,
}

impl GpioPin {
    fn new(root: &Path, number: u32) -> Self {
        Self {
            value_path: root.join(format!("gpio{number}")).join("value"),
            read_failed: false,
        }
    }

    /// Inputs are pulled up, so a pressed button reads `0`. Unreadable pins
    /// count as released.
    fn pressed(&mut self) -> bool {
        match fs::read_to_string(&self.value_path) {
            Ok(raw) => {
                self.read_failed = false;
                raw.trim() == "0"
            }
            Err(err) => {
                if !self.read_failed {
                    warn!(path = %self.value_path.display(), error = %err, "cannot read button");
                    self.read_failed = true;
                }
                false
            }
        }
    }
}

/// Buttons read from `<root>/gpio<N>/value`.
#[derive(Debug)]
pub struct SysfsButtons {
    more: GpioPin,
    less: GpioPin,
}

impl SysfsButtons {
    pub fn new(root: impl AsRef<Path>, more_gpio: u32, less_gpio: u32) -> Self {
        let root = root.as_ref();
        Self {
            more: GpioPin::new(root, more_gpio),
            less: GpioPin::new(root, less_gpio),
        }
    }
}

impl ButtonPanel for SysfsButtons {
    fn sample(&mut self) -> ButtonState {
        ButtonState {
            more: self.more.pressed(),
            less: self.less.pressed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn gpio_tree(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or(0);
        let root = env::temp_dir().join(format!(
            "radio_delay_gpio_{tag}_{}_{nanos}",
            std::process::id()
        ));
        for pin in [14, 4] {
            fs::create_dir_all(root.join(format!("gpio{pin}"))).expect("create pin dir");
        }
        root
    }

    fn set_pin(root: &Path, pin: u32, value: &str) {
        fs::write(root.join(format!("gpio{pin}")).join("value"), value).expect("write pin");
    }

    #[test]
    fn sysfs_pins_are_active_low() {
        let root = gpio_tree("active_low");
        set_pin(&root, 14, "0\n");
        set_pin(&root, 4, "1\n");
        let mut buttons = SysfsButtons::new(&root, 14, 4);
        assert_eq!(
            buttons.sample(),
            ButtonState {
                more: true,
                less: false
            }
        );

        set_pin(&root, 14, "1\n");
        set_pin(&root, 4, "0\n");
        assert_eq!(
            buttons.sample(),
            ButtonState {
                more: false,
                less: true
            }
        );
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_pin_reads_released() {
        let root = gpio_tree("missing");
        set_pin(&root, 4, "0");
        let mut buttons = SysfsButtons::new(&root, 99, 4);
        let state = buttons.sample();
        assert!(!state.more);
        assert!(state.less);
        assert!(!state.both());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn no_buttons_never_pressed() {
        assert_eq!(NoButtons.sample(), ButtonState::default());
    }
}
