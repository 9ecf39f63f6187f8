use anyhow::Result;
use radio_delay::audio::{list_devices, DeviceListing};

/// Comma-separated stand-in for the real device list, used by CLI tests.
const TEST_DEVICES_ENV: &str = "RADIO_DELAY_TEST_DEVICES";

fn parse_device_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

pub(crate) fn print_devices() -> Result<()> {
    let listing = match std::env::var(TEST_DEVICES_ENV) {
        Ok(raw) => {
            let names = parse_device_list(&raw);
            DeviceListing {
                inputs: names.clone(),
                outputs: names,
            }
        }
        Err(_) => list_devices().unwrap_or_else(|err| {
            eprintln!("Failed to list audio devices: {err:#}");
            DeviceListing::default()
        }),
    };

    print_section("input", &listing.inputs);
    print_section("output", &listing.outputs);
    Ok(())
}

fn print_section(kind: &str, names: &[String]) {
    if names.is_empty() {
        println!("No audio {kind} devices detected.");
    } else {
        println!("Available audio {kind} devices:");
        for name in names {
            println!("  - {name}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_list() {
        assert_eq!(
            parse_device_list(" USB Codec , ,hw:1 "),
            vec!["USB Codec".to_string(), "hw:1".to_string()]
        );
        assert!(parse_device_list("").is_empty());
    }
}
