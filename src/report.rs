use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rust_xlsxwriter::Workbook;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::apdex::{self, ApdexRating};
use crate::config::CombineConfig;

pub const RAW_SHEET: &str = "All Responses";
pub const SUMMARY_SHEET: &str = "Apdex Summary";

const RAW_HEADER: [&str; 8] = [
    "User",
    "User Message",
    "Bot Response",
    "Full Response Time (ms)",
    "First Response Time (ms)",
    "CPU Usage (%)",
    "Memory Usage (RSS %)",
    "Apdex Rating",
];

/// Result row as read back from disk. Latency fields stay raw JSON values so
/// rows from degraded exchanges (or foreign tooling) survive the merge;
/// anything absent or non-numeric renders as an empty cell and classifies as
/// Unknown.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRecord {
    pub user: String,
    pub message: String,
    pub response: String,
    pub full_response_time: Value,
    pub first_response_time: Value,
    pub cpu_usage_percent: Value,
    #[serde(rename = "memoryUsageRSS")]
    pub memory_usage_rss: Value,
}

impl RawRecord {
    pub fn full_response_ms(&self) -> Option<i64> {
        as_ms(&self.full_response_time)
    }

    pub fn first_response_ms(&self) -> Option<i64> {
        as_ms(&self.first_response_time)
    }

    /// Rating recomputed from the raw first-response value; any stamp the
    /// driver wrote is not trusted.
    pub fn rating(&self) -> ApdexRating {
        apdex::classify_raw(self.first_response_ms())
    }
}

fn as_ms(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|float| float as i64))
}

fn text_or_empty(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Read every `.json` file in the results directory and concatenate their
/// records in directory-listing order. Fails when the directory is missing
/// or holds no result files; there is no partial report.
pub fn collect_records(dir: &Path) -> Result<Vec<RawRecord>> {
    if !dir.is_dir() {
        bail!("Results directory {} not found", dir.display());
    }

    let mut records = Vec::new();
    let mut files = 0usize;
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read results directory {}", dir.display()))?
    {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut parsed: Vec<RawRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        files += 1;
        records.append(&mut parsed);
    }

    if files == 0 {
        bail!("No user result files found in {}", dir.display());
    }
    Ok(records)
}

/// Per-category counts over a merged result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApdexSummary {
    pub satisfactory: usize,
    pub tolerable: usize,
    pub frustrated: usize,
    pub unknown: usize,
}

impl ApdexSummary {
    pub fn from_records(records: &[RawRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.add(record.rating());
        }
        summary
    }

    pub fn add(&mut self, rating: ApdexRating) {
        match rating {
            ApdexRating::Satisfactory => self.satisfactory += 1,
            ApdexRating::Tolerable => self.tolerable += 1,
            ApdexRating::Frustrated => self.frustrated += 1,
            ApdexRating::Unknown => self.unknown += 1,
        }
    }

    pub fn count(&self, rating: ApdexRating) -> usize {
        match rating {
            ApdexRating::Satisfactory => self.satisfactory,
            ApdexRating::Tolerable => self.tolerable,
            ApdexRating::Frustrated => self.frustrated,
            ApdexRating::Unknown => self.unknown,
        }
    }

    pub fn total(&self) -> usize {
        self.satisfactory + self.tolerable + self.frustrated + self.unknown
    }

    /// One-decimal percentage of the total, e.g. `25.0%`.
    pub fn percentage(&self, rating: ApdexRating) -> String {
        let total = self.total();
        if total == 0 {
            return "0.0%".to_string();
        }
        format!("{:.1}%", self.count(rating) as f64 / total as f64 * 100.0)
    }

    /// Apdex score: satisfactory responses weighted fully, tolerable at
    /// half, rounded to three decimals. Always within `[0, 1]`.
    pub fn score(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let raw = (self.satisfactory as f64 + 0.5 * self.tolerable as f64) / total as f64;
        (raw * 1000.0).round() / 1000.0
    }
}

/// Write the two-sheet workbook: raw rows plus the Apdex summary.
pub fn write_workbook(path: &Path, records: &[RawRecord], summary: &ApdexSummary) -> Result<()> {
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name(RAW_SHEET)?;
    for (col, title) in RAW_HEADER.iter().enumerate() {
        sheet.write(0, col as u16, *title)?;
    }
    for (index, record) in records.iter().enumerate() {
        let row = (index + 1) as u32;
        sheet.write(row, 0, record.user.as_str())?;
        sheet.write(row, 1, record.message.as_str())?;
        sheet.write(row, 2, record.response.as_str())?;
        if let Some(ms) = record.full_response_ms() {
            sheet.write(row, 3, ms as f64)?;
        }
        if let Some(ms) = record.first_response_ms() {
            sheet.write(row, 4, ms as f64)?;
        }
        sheet.write(row, 5, text_or_empty(&record.cpu_usage_percent))?;
        sheet.write(row, 6, text_or_empty(&record.memory_usage_rss))?;
        sheet.write(row, 7, record.rating().label())?;
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name(SUMMARY_SHEET)?;
    sheet.write(0, 0, "APDEX Category")?;
    sheet.write(0, 1, "Count")?;
    sheet.write(0, 2, "Percentage")?;
    for (index, rating) in ApdexRating::ALL.iter().enumerate() {
        let row = (index + 1) as u32;
        sheet.write(row, 0, rating.label())?;
        sheet.write(row, 1, summary.count(*rating) as f64)?;
        sheet.write(row, 2, summary.percentage(*rating))?;
    }
    sheet.write(5, 0, "Total Responses")?;
    sheet.write(5, 1, summary.total() as f64)?;
    sheet.write(5, 2, "100%")?;
    sheet.write(7, 0, "Apdex Score")?;
    sheet.write(7, 1, summary.score())?;

    workbook
        .save(path)
        .with_context(|| format!("Failed to write workbook {}", path.display()))?;
    Ok(())
}

/// Merge all per-user result files into the workbook and print the digest.
pub fn combine(config: &CombineConfig) -> Result<()> {
    let records = collect_records(&config.results_dir)?;
    let summary = ApdexSummary::from_records(&records);
    write_workbook(&config.output, &records, &summary)?;
    info!(
        records = records.len(),
        output = %config.output.display(),
        "Combined workbook written"
    );
    print_digest(&summary);
    Ok(())
}

/// Console rendering of the summary sheet.
pub fn print_digest(summary: &ApdexSummary) {
    println!(
        "\nAPDEX category summary (per response), generated {}:",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    for rating in ApdexRating::ALL {
        println!(
            "  {}: {} ({})",
            rating.label(),
            summary.count(rating),
            summary.percentage(rating)
        );
    }
    println!("  Total responses: {}", summary.total());
    println!("  Apdex score: {:.3}", summary.score());
}
