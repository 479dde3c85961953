use std::fs;
use std::path::Path;

use chatbot_bench::apdex::ApdexRating;
use chatbot_bench::config::CombineConfig;
use chatbot_bench::report::{ApdexSummary, collect_records, combine, write_workbook};
use chatbot_bench::results::{ExchangeOutcome, ResultRecord};
use serde_json::json;

fn write_user_file(dir: &Path, user_id: u32, first_response_times: &[i64]) {
    let records: Vec<serde_json::Value> = first_response_times
        .iter()
        .map(|ms| {
            json!({
                "user": format!("User {user_id}"),
                "message": "What is SarawakID?",
                "response": "SarawakID is a digital identity.",
                "fullResponseTime": ms + 2_000,
                "firstResponseTime": ms,
                "apdexRating": "Satisfactory",
                "cpuUsagePercent": "12.00%",
                "memoryUsageRSS": "0.90%",
            })
        })
        .collect();
    let path = dir.join(format!("user-{user_id}.json"));
    fs::write(path, serde_json::to_string_pretty(&records).unwrap()).expect("write user file");
}

#[test]
fn merging_two_files_concatenates_all_records() {
    let dir = tempfile::tempdir().expect("create tempdir");
    write_user_file(dir.path(), 1, &[1_000, 2_000, 3_000]);
    write_user_file(dir.path(), 2, &[4_000, 5_000]);

    let records = collect_records(dir.path()).expect("collect records");
    assert_eq!(records.len(), 5);

    let summary = ApdexSummary::from_records(&records);
    assert_eq!(summary.total(), 5);
    assert_eq!(summary.satisfactory, 5);
    assert_eq!(summary.score(), 1.0);
}

#[test]
fn reference_distribution_summary() {
    let dir = tempfile::tempdir().expect("create tempdir");
    write_user_file(dir.path(), 1, &[5_000, 21_000]);
    write_user_file(dir.path(), 2, &[28_000, -1]);

    let records = collect_records(dir.path()).expect("collect records");
    let summary = ApdexSummary::from_records(&records);
    assert_eq!(summary.satisfactory, 1);
    assert_eq!(summary.tolerable, 1);
    assert_eq!(summary.frustrated, 1);
    assert_eq!(summary.unknown, 1);
    assert_eq!(summary.score(), 0.375);
}

#[test]
fn missing_directory_is_fatal() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let missing = dir.path().join("does-not-exist");
    assert!(collect_records(&missing).is_err());
}

#[test]
fn empty_directory_is_fatal() {
    let dir = tempfile::tempdir().expect("create tempdir");
    assert!(collect_records(dir.path()).is_err());
}

#[test]
fn non_json_files_are_ignored() {
    let dir = tempfile::tempdir().expect("create tempdir");
    fs::write(dir.path().join("notes.txt"), "not a result file").unwrap();
    write_user_file(dir.path(), 1, &[1_000]);

    let records = collect_records(dir.path()).expect("collect records");
    assert_eq!(records.len(), 1);
}

#[test]
fn only_non_json_files_is_still_fatal() {
    let dir = tempfile::tempdir().expect("create tempdir");
    fs::write(dir.path().join("notes.txt"), "not a result file").unwrap();
    assert!(collect_records(dir.path()).is_err());
}

#[test]
fn driver_stamp_and_recompute_agree_on_timeout_records() {
    // A record written by the driver for a timed-out exchange must still
    // classify as Unknown after the aggregator re-reads and recomputes it.
    let dir = tempfile::tempdir().expect("create tempdir");
    let stamped = ResultRecord::from_outcome(
        "User 7",
        "Check the gas bill 056-G2299 and seb bill 201166495100.",
        ExchangeOutcome::NoResponse {
            timeout_ms: 30_000,
            memory_rss: "0.75%".to_string(),
        },
    );
    assert_eq!(stamped.apdex_rating, ApdexRating::Unknown);

    let path = dir.path().join("user-7.json");
    fs::write(&path, serde_json::to_string_pretty(&vec![stamped]).unwrap()).unwrap();

    let records = collect_records(dir.path()).expect("collect records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].rating(), ApdexRating::Unknown);
    assert_eq!(records[0].full_response_ms(), Some(30_000));
    assert_eq!(records[0].first_response_ms(), Some(-1));
}

#[test]
fn heterogeneous_records_classify_as_unknown() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let rows = json!([
        {
            "user": "User 1",
            "message": "q",
            "response": "a",
            "fullResponseTime": "slow",
            "firstResponseTime": null,
        },
        {
            "user": "User 1",
        }
    ]);
    fs::write(dir.path().join("user-1.json"), rows.to_string()).unwrap();

    let records = collect_records(dir.path()).expect("collect records");
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.rating(), ApdexRating::Unknown);
        assert_eq!(record.full_response_ms(), None);
        assert_eq!(record.first_response_ms(), None);
    }
}

#[test]
fn combine_writes_the_workbook() {
    let dir = tempfile::tempdir().expect("create tempdir");
    write_user_file(dir.path(), 1, &[5_000, 21_000, 28_000]);

    let output = dir.path().join("combined.xlsx");
    let config = CombineConfig {
        results_dir: dir.path().to_path_buf(),
        output: output.clone(),
    };
    combine(&config).expect("combine results");

    let metadata = fs::metadata(&output).expect("workbook exists");
    assert!(metadata.len() > 0);
}

#[test]
fn workbook_accepts_degraded_rows() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let rows = json!([
        {
            "user": "User 1",
            "message": "q",
            "response": "a",
            "fullResponseTime": "not-a-number",
            "firstResponseTime": -1,
            "cpuUsagePercent": null,
            "memoryUsageRSS": "0.50%",
        }
    ]);
    fs::write(dir.path().join("user-1.json"), rows.to_string()).unwrap();

    let records = collect_records(dir.path()).expect("collect records");
    let summary = ApdexSummary::from_records(&records);
    let output = dir.path().join("degraded.xlsx");
    write_workbook(&output, &records, &summary).expect("write workbook");
    assert!(output.exists());
    assert_eq!(summary.unknown, 1);
}
