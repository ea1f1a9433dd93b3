//! Integration tests for the `booking` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise the slots,
//! validate and chat subcommands through the actual binary, including stdin
//! scripts, ledger files and configuration errors.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: path to a fixture file.
fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Helper: the binary with configuration overrides cleared.
fn booking() -> Command {
    let mut cmd = Command::cargo_bin("booking").unwrap();
    for key in [
        "CALENDAR_ID",
        "BOOKING_TIMEZONE",
        "ADMIN_CHAT_ID",
        "BOOKING_HORIZON_DAYS",
        "BOOKING_SLOT_MINUTES",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

/// Helper: run `slots` and parse the JSON it prints.
fn slots(extra: &[&str]) -> Vec<serde_json::Value> {
    let busy = fixture("busy.json");
    let mut args = vec!["slots", "--busy", busy.as_str(), "--from", "2026-03-01"];
    args.extend_from_slice(extra);

    let output = booking().args(&args).output().unwrap();
    assert!(output.status.success(), "slots failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("slots prints a JSON array")
}

/// Answers that walk an English conversation up to the slot list.
const INTAKE: &str = "Audi A4\n2015\n1hgcm82633a004352\n+48123456789\nBrakes squeal\n";

// ─────────────────────────────────────────────────────────────────────────────
// slots
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn slots_skip_busy_time_and_are_capped() {
    let list = slots(&["--days", "1"]);

    assert_eq!(list.len(), 10, "default cap");
    assert_eq!(list[0]["id"], "2026-03-02T08:00:00+01:00");
    assert_eq!(list[0]["label"], "02.03 08:00");
    assert_eq!(list[0]["end"], "2026-03-02T08:30:00+01:00");
    assert_eq!(list[1]["label"], "02.03 08:30");
    assert_eq!(list[2]["label"], "02.03 09:30", "09:00 is busy");
}

#[test]
fn slots_with_config_file() {
    let config = fixture("hourly.json");
    let list = slots(&["--config", config.as_str()]);

    let labels: Vec<&str> = list.iter().map(|s| s["label"].as_str().unwrap()).collect();
    assert_eq!(labels, vec!["02.03 08:00", "02.03 10:00", "02.03 11:00"]);
}

#[test]
fn slots_env_override() {
    let busy = fixture("busy.json");
    let output = booking()
        .args(["slots", "--busy", busy.as_str(), "--from", "2026-03-01"])
        .env("BOOKING_SLOT_MINUTES", "120")
        .output()
        .unwrap();
    let list: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();

    // 08:00-10:00 overlaps the 09:00 busy block.
    assert_eq!(list[0]["label"], "02.03 10:00");
    assert_eq!(list[0]["end"], "2026-03-02T12:00:00+01:00");
}

#[test]
fn slots_over_a_weekend_start_on_monday() {
    // Friday 2026-03-06 as "today": Saturday and Sunday have no slots.
    let busy = fixture("busy.json");
    let output = booking()
        .args(["slots", "--busy", busy.as_str(), "--from", "2026-03-06", "--days", "3"])
        .output()
        .unwrap();
    let list: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(list[0]["label"], "09.03 08:00");
}

#[test]
fn slots_rejects_oversized_horizon() {
    let busy = fixture("busy.json");
    booking()
        .args(["slots", "--busy", busy.as_str(), "--days", "4294967295"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--days must be at most 366"));

    booking()
        .args(["slots", "--busy", busy.as_str()])
        .env("BOOKING_HORIZON_DAYS", "4294967295")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid schedule configuration"));
}

#[test]
fn slots_missing_busy_file_fails() {
    booking()
        .args(["slots", "--busy", "/nonexistent/busy.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn slots_invalid_config_fails() {
    let busy = fixture("busy.json");
    let config = fixture("bad_hours.json");
    booking()
        .args(["slots", "--busy", busy.as_str(), "--config", config.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid schedule configuration"));
}

// ─────────────────────────────────────────────────────────────────────────────
// validate
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn validate_normalizes_vin() {
    booking()
        .args(["validate", "vin", "1hgcm82633a004352"])
        .assert()
        .success()
        .stdout("1HGCM82633A004352\n");
}

#[test]
fn validate_vehicle_and_phone() {
    booking()
        .args(["validate", "vehicle", "  Škoda   Octavia "])
        .assert()
        .success()
        .stdout("Škoda Octavia\n");

    booking()
        .args(["validate", "phone", "+48123456789"])
        .assert()
        .success()
        .stdout("+48123456789\n");
}

#[test]
fn validate_rejects_old_year() {
    booking()
        .args(["validate", "year", "1985"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid year"))
        .stderr(predicate::str::contains("1990"));
}

#[test]
fn validate_rejects_single_token_vehicle() {
    booking()
        .args(["validate", "vehicle", "Audi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("make and model"));
}

#[test]
fn validate_unknown_field_is_a_usage_error() {
    booking()
        .args(["validate", "colour", "red"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// ─────────────────────────────────────────────────────────────────────────────
// chat
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn chat_books_by_option_number() {
    let busy = fixture("busy.json");
    booking()
        .args(["chat", "--busy", busy.as_str(), "--locale", "en", "--from", "2026-03-01"])
        .write_stdin(format!("{INTAKE}3\n"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Enter the vehicle make and model"))
        .stdout(predicate::str::contains("  3. 02.03 09:30"))
        .stdout(predicate::str::contains(
            "✅ Your appointment is confirmed for 02.03 09:30. Thank you!",
        ))
        .stdout(predicate::str::contains(
            "1\t2026-03-01 12:00\tAudi A4\t2015\t1HGCM82633A004352\t+48123456789\tBrakes squeal\t2026-03-02 09:30\tNowe",
        ));
}

#[test]
fn chat_reprompts_on_invalid_input() {
    booking()
        .args(["chat", "--locale", "en", "--from", "2026-03-01"])
        .write_stdin("Audi\nAudi A4\n89\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "❌ Enter make and model separated by space",
        ))
        .stdout(predicate::str::contains("Enter the year of manufacture:"))
        .stdout(predicate::str::contains("❌ Enter a valid year"));
}

#[test]
fn chat_unknown_choice_relists_options() {
    let busy = fixture("busy.json");
    let output = booking()
        .args(["chat", "--busy", busy.as_str(), "--locale", "en", "--from", "2026-03-01"])
        .write_stdin(format!("{INTAKE}42\n"))
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(stdout.contains("❌ Please pick a time from the list."));
    assert_eq!(stdout.matches("  1. 02.03 08:00").count(), 2);
}

#[test]
fn chat_locale_from_config() {
    let config = fixture("hourly.json");
    booking()
        .args(["chat", "--config", config.as_str(), "--from", "2026-03-01"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Enter the vehicle make and model"));
}

#[test]
fn chat_polish_reset() {
    booking()
        .args(["chat", "--locale", "pl", "--from", "2026-03-01"])
        .write_stdin("Audi A4\nod nowa\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Podaj rok produkcji:"))
        .stdout(predicate::str::contains("🔁 Dane wyczyszczone. Zaczynamy od nowa."));
}

#[test]
fn chat_appends_to_ledger_file() {
    let busy = fixture("busy.json");
    let ledger = std::env::temp_dir().join("booking-cli-test-ledger.tsv");
    let ledger_path = ledger.to_str().unwrap();
    let _ = std::fs::remove_file(&ledger);

    for _ in 0..2 {
        booking()
            .args([
                "chat",
                "--busy",
                busy.as_str(),
                "--ledger",
                ledger_path,
                "--locale",
                "en",
                "--from",
                "2026-03-01",
            ])
            .write_stdin(format!("{INTAKE}1\n"))
            .assert()
            .success()
            .stdout(predicate::str::contains("confirmed for 02.03 08:00"))
            .stdout(predicate::str::contains("Nowe").not());
    }

    let content = std::fs::read_to_string(&ledger).expect("ledger file must exist");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3, "header plus two bookings");
    assert!(lines[0].starts_with("#\tCreated\tVehicle"));
    assert!(lines[1].starts_with("1\t"));
    assert!(lines[2].starts_with("2\t"));
    assert!(lines[2].ends_with("\t2026-03-02 08:00\tNowe"));

    let _ = std::fs::remove_file(&ledger);
}

#[test]
fn chat_rejects_unknown_locale() {
    booking()
        .args(["chat", "--locale", "de"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown locale"));
}
