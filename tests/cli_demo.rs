//! CLI integration tests for the demo, bench, and config error paths.

use std::process::Command;

fn summary_value<'a>(stdout: &'a str, key: &str) -> &'a str {
    let prefix = format!("{key}=");
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .unwrap_or_else(|| panic!("{key} line missing"))
        .trim()
}

#[test]
fn demo_cli_bakes_one_cake_per_capacity_unit() {
    let bin = env!("CARGO_BIN_EXE_cat_cakes");
    // Original cast with short naps so the demo finishes quickly.
    let output = Command::new(bin)
        .args(["--cats", "Fluffy:3:5,Choo-Choo:2:5,Chonko:4:5"])
        .output()
        .expect("failed to run demo binary");

    assert!(
        output.status.success(),
        "demo exited with non-zero status: {:?}",
        output.status
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DEMO SUMMARY"), "demo summary missing from output");
    assert_eq!(summary_value(&stdout, "cakes_baked"), "9");
    assert_eq!(summary_value(&stdout, "cakes_expected"), "9");
    assert_eq!(summary_value(&stdout, "cats_exploded"), "3");
    assert_eq!(summary_value(&stdout, "orders_unfulfilled"), "0");
    assert_eq!(summary_value(&stdout, "log_entries_dropped"), "0");

    // Every event record is printed before the summary.
    let records = stdout.matches("Event: ").count();
    assert_eq!(summary_value(&stdout, "log_entries_printed"), records.to_string());
    assert_eq!(stdout.matches("ate too many cakes and exploded!").count(), 3);
    assert!(stdout.contains("Event: Total Cakes Baked: 9"));
}

#[test]
fn demo_cli_timeout_policy() {
    let bin = env!("CARGO_BIN_EXE_cat_cakes");
    let output = Command::new(bin)
        .args([
            "--cats",
            "Solo:2:1",
            "--flush-policy",
            "timeout",
            "--flush-timeout-ms",
            "10",
        ])
        .output()
        .expect("failed to run demo binary");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(summary_value(&stdout, "cakes_baked"), "2");
    assert!(stdout.contains("Name:  Solo"));
}

#[test]
fn bench_cli_prints_csv_row() {
    let bin = env!("CARGO_BIN_EXE_cat_cakes");
    let output = Command::new(bin)
        .args(["bench", "--cats", "3", "--capacity", "10", "--validate"])
        .output()
        .expect("failed to run bench");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    let header = lines.next().expect("csv header");
    assert!(header.starts_with("cats,capacity,total_orders"));
    let row: Vec<&str> = lines.next().expect("csv row").split(',').collect();
    assert_eq!(row[0], "3");
    assert_eq!(row[2], "30");
    // Validation reports nothing for a clean run.
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("# violation"));
}

#[test]
fn malformed_cat_spec_exits_with_error() {
    let bin = env!("CARGO_BIN_EXE_cat_cakes");
    let output = Command::new(bin)
        .args(["--cats", "Fluffy:3"])
        .output()
        .expect("failed to run demo binary");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid cat spec"));
}
