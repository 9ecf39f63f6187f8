use super::{AppConfig, SampleWidth};
use approx::assert_relative_eq;
use clap::Parser;

fn parse(args: &[&str]) -> AppConfig {
    let mut argv = vec!["test-app"];
    argv.extend_from_slice(args);
    AppConfig::parse_from(argv)
}

#[test]
fn defaults_validate() {
    let mut cfg = parse(&[]);
    assert!(cfg.validate().is_ok());
    assert_relative_eq!(cfg.delay, 5.0);
    assert_eq!(cfg.sample_rate, 44_100);
    assert_eq!(cfg.chunk, 2048);
    assert_eq!(cfg.primelen, 5);
}

#[test]
fn accepts_underscore_sample_rate_alias() {
    let cfg = parse(&["--sample_rate", "48000"]);
    assert_eq!(cfg.sample_rate, 48_000);
}

#[test]
fn rejects_sample_rate_out_of_bounds() {
    let mut cfg = parse(&["--sample-rate", "4000"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--sample-rate", "384000"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_unsupported_width() {
    let mut cfg = parse(&["--width", "3"]);
    let err = cfg.validate().expect_err("width 3 must be rejected");
    assert!(err.to_string().contains("--width"));
}

#[test]
fn maps_widths_to_sample_encodings() {
    assert_eq!(SampleWidth::from_bytes(1), Some(SampleWidth::U8));
    assert_eq!(SampleWidth::from_bytes(2), Some(SampleWidth::I16));
    assert_eq!(SampleWidth::from_bytes(4), Some(SampleWidth::F32));
    assert_eq!(SampleWidth::from_bytes(8), None);
}

#[test]
fn rejects_zero_channels() {
    let mut cfg = parse(&["--channels", "0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_delay_below_increment() {
    let mut cfg = parse(&["--delay", "0.25"]);
    let err = cfg.validate().expect_err("delay below increment");
    assert!(err.to_string().contains("--delay"));
}

#[test]
fn rejects_delay_inside_headroom() {
    let mut cfg = parse(&["--delay", "299.75"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--delay", "299.5"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_headroom_shorter_than_one_block() {
    // One block at 44.1 kHz / 2048 frames lasts ~46 ms.
    let mut cfg = parse(&["--headroom", "0.01", "--delay", "5"]);
    let err = cfg.validate().expect_err("headroom below one block");
    assert!(err.to_string().contains("--headroom"));

    let mut cfg = parse(&["--headroom", "0.05"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_empty_delay_range() {
    let mut cfg = parse(&["--bffsz", "1", "--increment", "0.75", "--headroom", "0.5", "--delay", "0.75"]);
    let err = cfg.validate().expect_err("empty clamp range");
    assert!(err.to_string().contains("no valid delay range"));
}

#[test]
fn rejects_buffer_without_room_for_two_blocks() {
    let mut cfg = parse(&[
        "--bffsz", "0.05", "--increment", "0.01", "--headroom", "0.04", "--delay", "0.01",
    ]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_excessive_prime_length() {
    let mut cfg = parse(&["--primelen", "65"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--primelen", "0"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_unpaired_button_pins() {
    let mut cfg = parse(&["--more-button-gpio", "14"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--more-button-gpio", "14", "--less-button-gpio", "14"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--more-button-gpio", "14", "--less-button-gpio", "4"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_display_settings_out_of_bounds() {
    let mut cfg = parse(&["--display-poll-ms", "5"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--display-timeout-secs", "0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn derives_stream_format_from_flags() {
    let cfg = parse(&["--width", "1", "--channels", "1", "--chunk", "256"]);
    let format = cfg.stream_format();
    assert_eq!(format.width, SampleWidth::U8);
    assert_eq!(format.block_bytes(), 256);
    assert_eq!(format.block_samples(), 256);
    assert!(format.silence_block().iter().all(|byte| *byte == 0x80));
}

#[test]
fn signed_silence_is_zeroed() {
    let cfg = parse(&[]);
    let format = cfg.stream_format();
    assert_eq!(format.block_bytes(), 2048 * 2 * 2);
    assert!(format.silence_block().iter().all(|byte| *byte == 0));
    assert_relative_eq!(format.block_period_secs(), 2048.0 / 44_100.0);
}

#[test]
fn delay_limits_follow_increment_and_headroom() {
    let cfg = parse(&["--bffsz", "120", "--increment", "1", "--headroom", "2"]);
    let limits = cfg.delay_limits();
    assert_relative_eq!(limits.min(), 1.0);
    assert_relative_eq!(limits.max(), 118.0);
}

#[test]
fn headroom_defaults_to_increment() {
    let mut cfg = parse(&["--increment", "1"]);
    assert!(cfg.validate().is_ok());
    assert_relative_eq!(cfg.headroom_secs(), 1.0);
    assert_relative_eq!(cfg.delay_limits().max(), 299.0);

    let mut delay = crate::delay::DelayValue::new(cfg.delay, cfg.delay_limits());
    for _ in 0..400 {
        delay.adjust(cfg.increment);
    }
    assert_relative_eq!(delay.seconds(), 299.0);
}

#[test]
fn increment_shorter_than_a_block_needs_explicit_headroom() {
    let mut cfg = parse(&["--increment", "0.02", "--delay", "5"]);
    let err = cfg.validate().expect_err("derived headroom below one block");
    assert!(err.to_string().contains("--headroom"));

    let mut cfg = parse(&["--increment", "0.02", "--headroom", "0.1", "--delay", "5"]);
    assert!(cfg.validate().is_ok());
}
