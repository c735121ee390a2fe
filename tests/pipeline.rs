//! End-to-end pipeline tests: serial lines through frame assembly and
//! normalization, the way the supervisor loop drives them.

use mqtt_bridge_smartshunt::frame::{FrameAssembler, RawFrame, split_line};
use mqtt_bridge_smartshunt::telemetry::{Value, normalize};

/// Drive lines through the malformed-line filter and the assembler,
/// collecting every completed frame. Mirrors the streaming loop.
fn feed_lines(assembler: &mut FrameAssembler, lines: &[&str]) -> Vec<RawFrame> {
    let mut frames = Vec::new();
    for line in lines {
        let Some((key, value)) = split_line(line) else {
            continue;
        };
        if let Some(frame) = assembler.feed(key, value) {
            frames.push(frame);
        }
    }
    frames
}

#[test]
fn full_poll_cycle_produces_scaled_frame() {
    let mut assembler = FrameAssembler::new();
    let frames = feed_lines(
        &mut assembler,
        &["V\t12560", "I\t-450", "P\t-6", "SOC\t845", "H18\t834"],
    );

    assert_eq!(frames.len(), 1);
    let telemetry = normalize(&frames[0]);

    assert_eq!(telemetry.get("v"), Some(&Value::Float(12.56)));
    assert_eq!(telemetry.get("a"), Some(&Value::Float(-0.45)));
    assert_eq!(telemetry.get("w"), Some(&Value::Int(-6)));
    assert_eq!(telemetry.get("soc"), Some(&Value::Float(84.5)));
    assert_eq!(telemetry.get("h_totalchg"), Some(&Value::Float(8.34)));
    assert_eq!(telemetry.len(), 5);
}

#[test]
fn malformed_lines_leave_the_frame_unaffected() {
    let mut clean = FrameAssembler::new();
    let expected = feed_lines(&mut clean, &["V\t12560", "SOC\t845", "H18\t834"]);

    let mut noisy = FrameAssembler::new();
    let actual = feed_lines(
        &mut noisy,
        &["V\t12560", "", "garbage with no separator", "SOC\t845", "H18\t834"],
    );

    assert_eq!(actual, expected);
}

#[test]
fn checksum_lines_are_dropped_wherever_they_appear() {
    let mut assembler = FrameAssembler::new();
    let frames = feed_lines(
        &mut assembler,
        &["Checksum\tx", "V\t12560", "Checksum\ty", "H18\t834", "Checksum\tz"],
    );

    assert_eq!(frames.len(), 1);
    assert!(!frames[0].contains_key("Checksum"));
    assert!(assembler.current().is_empty());
}

#[test]
fn duplicate_register_before_boundary_takes_last_value() {
    let mut assembler = FrameAssembler::new();
    let frames = feed_lines(&mut assembler, &["V\t100", "V\t200", "H18\t1"]);

    let telemetry = normalize(&frames[0]);
    assert_eq!(telemetry.get("v"), Some(&Value::Float(0.2)));
}

#[test]
fn last_charge_duration_floors_to_whole_minutes() {
    let mut assembler = FrameAssembler::new();
    let frames = feed_lines(&mut assembler, &["H9\t125", "H18\t834"]);

    let telemetry = normalize(&frames[0]);
    assert_eq!(telemetry.get("h_lastchg"), Some(&Value::Int(2)));
}

#[test]
fn reconnect_discards_partially_accumulated_frame() {
    // Partial accumulation, then a simulated serial error: the supervisor
    // drops the assembler and starts a fresh one after reopening.
    let mut before_error = FrameAssembler::new();
    feed_lines(&mut before_error, &["V\t99999", "I\t12345"]);
    assert_eq!(before_error.current().len(), 2);
    drop(before_error);

    let mut after_reopen = FrameAssembler::new();
    assert!(after_reopen.current().is_empty());

    let frames = feed_lines(&mut after_reopen, &["SOC\t845", "H18\t834"]);
    assert_eq!(frames.len(), 1);
    assert!(!frames[0].contains_key("V"));
    assert!(!frames[0].contains_key("I"));

    let telemetry = normalize(&frames[0]);
    assert_eq!(telemetry.get("v"), None);
    assert_eq!(telemetry.get("soc"), Some(&Value::Float(84.5)));
}

#[test]
fn consecutive_cycles_do_not_merge() {
    let mut assembler = FrameAssembler::new();
    let frames = feed_lines(
        &mut assembler,
        &["V\t12000", "H18\t100", "SOC\t500", "H18\t101"],
    );

    assert_eq!(frames.len(), 2);
    assert!(frames[0].contains_key("V"));
    assert!(!frames[1].contains_key("V"));
    assert!(frames[1].contains_key("SOC"));
}

#[test]
fn payload_contains_only_observed_fields() {
    let mut assembler = FrameAssembler::new();
    let frames = feed_lines(
        &mut assembler,
        &["PID\t0xA389", "V\t12560", "Alarm\tOFF", "H18\t834"],
    );

    let payload = normalize(&frames[0]).to_json().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    let object = json.as_object().unwrap();

    assert_eq!(object.len(), 3);
    assert_eq!(object["v"], serde_json::json!(12.56));
    assert_eq!(object["alarm"], serde_json::json!("OFF"));
    assert_eq!(object["h_totalchg"], serde_json::json!(8.34));
    // Unknown registers never reach the payload.
    assert!(!object.contains_key("PID"));
}
