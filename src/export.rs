// JSON and CSV export of the entry collection

use crate::models::Entry;
use chrono::{Local, NaiveDate, TimeZone};
use eyre::{Context, Result, eyre};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

pub const CSV_HEADER: &str = "Date,Type,Company,Position,Status,Contact Method,URL,Notes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(eyre!("Unknown export format: {} (expected json or csv)", other)),
        }
    }
}

/// Pretty-printed JSON array of entries
pub fn to_json(entries: &[Entry]) -> Result<String> {
    serde_json::to_string_pretty(entries).context("Failed to serialize entries")
}

/// CSV with dates rendered in the local timezone
pub fn to_csv(entries: &[Entry]) -> String {
    to_csv_in(entries, &Local)
}

/// CSV with dates rendered in `tz` as `M/D/YYYY`
///
/// Notes are always quoted. Other columns are quoted only when they would
/// otherwise break the row.
pub fn to_csv_in<Tz: TimeZone>(entries: &[Entry], tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(CSV_HEADER.to_string());

    for entry in entries {
        let date = entry.created_at.with_timezone(tz).format("%-m/%-d/%Y").to_string();
        let row = [
            date,
            entry.entry_type.to_string(),
            field(&entry.company),
            field(entry.position.as_deref().unwrap_or_default()),
            entry.status.to_string(),
            field(entry.contact_method.as_deref().unwrap_or_default()),
            field(entry.url.as_deref().unwrap_or_default()),
            quote(entry.notes.as_deref().unwrap_or_default()),
        ];
        lines.push(row.join(","));
    }

    lines.join("\n")
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        quote(value)
    } else {
        value.to_string()
    }
}

/// `freelancer-tracker-<YYYY-MM-DD>.<ext>`
pub fn file_name(format: ExportFormat, date: NaiveDate) -> String {
    format!("freelancer-tracker-{}.{}", date.format("%Y-%m-%d"), format.extension())
}

/// Write an export file into `dir`, returning its path
pub fn write_to(dir: &Path, format: ExportFormat, entries: &[Entry], date: NaiveDate) -> Result<PathBuf> {
    let content = match format {
        ExportFormat::Json => to_json(entries)?,
        ExportFormat::Csv => to_csv(entries),
    };

    fs::create_dir_all(dir).context("Failed to create export directory")?;
    let path = dir.join(file_name(format, date));
    fs::write(&path, content).with_context(|| format!("Failed to write export file {:?}", path))?;

    info!(path = ?path, count = entries.len(), format = format.extension(), "Exported entries");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryStatus, EntryType, NewEntry};
    use chrono::Utc;
    use tempfile::TempDir;

    fn entry(id: &str, notes: Option<&str>) -> Entry {
        let ts = Utc.with_ymd_and_hms(2024, 2, 9, 15, 0, 0).unwrap();
        NewEntry {
            position: Some("Designer".to_string()),
            contact_method: Some("email".to_string()),
            url: Some("https://example.com/jobs/1".to_string()),
            notes: notes.map(str::to_string),
            status: EntryStatus::Applied,
            ..NewEntry::new(EntryType::Job, "Acme")
        }
        .into_entry(id.to_string(), ts)
    }

    #[test]
    fn test_csv_layout() {
        let csv = to_csv_in(&[entry("a", Some("first")), entry("b", None)], &Utc);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "2/9/2024,job,Acme,Designer,applied,email,https://example.com/jobs/1,\"first\""
        );
        assert!(lines[2].ends_with(",\"\""));
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn test_csv_doubles_quotes_in_notes() {
        let csv = to_csv_in(&[entry("a", Some("He said \"ok\""))], &Utc);
        assert!(csv.ends_with(r#","He said ""ok""""#));
    }

    #[test]
    fn test_csv_quotes_company_with_comma() {
        let mut e = entry("a", None);
        e.company = "Acme, Inc.".to_string();
        let csv = to_csv_in(&[e], &Utc);
        assert!(csv.contains(",\"Acme, Inc.\","));
    }

    #[test]
    fn test_csv_empty_collection_is_header_only() {
        assert_eq!(to_csv_in(&[], &Utc), CSV_HEADER);
    }

    #[test]
    fn test_json_round_trip() {
        let entries = vec![entry("a", Some("x")), entry("b", None)];
        let json = to_json(&entries).unwrap();
        assert!(json.starts_with("[\n"));

        let parsed: Vec<Entry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        assert_eq!(file_name(ExportFormat::Json, date), "freelancer-tracker-2024-07-04.json");
        assert_eq!(file_name(ExportFormat::Csv, date), "freelancer-tracker-2024-07-04.csv");
    }

    #[test]
    fn test_write_to() {
        let temp = TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        let path = write_to(&temp.path().join("out"), ExportFormat::Json, &[entry("a", None)], date).unwrap();

        assert!(path.ends_with("freelancer-tracker-2024-07-04.json"));
        let parsed: Vec<Entry> = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
