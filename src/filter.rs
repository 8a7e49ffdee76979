// Filter selection applied to the entry list

use crate::models::{Entry, EntryStatus, EntryType};
use eyre::{Result, eyre};
use std::fmt;
use std::str::FromStr;

/// Filter dimension named by `Store::set_filter`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey {
    Type,
    Status,
    TimeRange,
}

impl FromStr for FilterKey {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "type" => Ok(FilterKey::Type),
            "status" => Ok(FilterKey::Status),
            "timeRange" | "time_range" => Ok(FilterKey::TimeRange),
            other => Err(eyre!("Unknown filter key: {}", other)),
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKey::Type => write!(f, "type"),
            FilterKey::Status => write!(f, "status"),
            FilterKey::TimeRange => write!(f, "timeRange"),
        }
    }
}

/// Window used by calendar and analytics views
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeRange {
    #[default]
    Week,
    Month,
}

impl FromStr for TimeRange {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            other => Err(eyre!("Invalid time range: {} (expected week or month)", other)),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRange::Week => write!(f, "week"),
            TimeRange::Month => write!(f, "month"),
        }
    }
}

/// Active filter selection; `None` means "all"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub entry_type: Option<EntryType>,
    pub status: Option<EntryStatus>,
    pub time_range: TimeRange,
}

impl FilterState {
    /// Set one dimension from its text form (`all` clears type/status)
    pub fn set(&mut self, key: FilterKey, value: &str) -> Result<()> {
        match key {
            FilterKey::Type => self.entry_type = parse_or_all(value)?,
            FilterKey::Status => self.status = parse_or_all(value)?,
            FilterKey::TimeRange => self.time_range = value.parse()?,
        }
        Ok(())
    }

    /// Type and status only; `time_range` is left to the views
    pub fn matches(&self, entry: &Entry) -> bool {
        self.entry_type.is_none_or(|t| entry.entry_type == t) && self.status.is_none_or(|s| entry.status == s)
    }
}

fn parse_or_all<T: FromStr<Err = eyre::Report>>(value: &str) -> Result<Option<T>> {
    if value == "all" {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let filters = FilterState::default();
        assert_eq!(filters.entry_type, None);
        assert_eq!(filters.status, None);
        assert_eq!(filters.time_range, TimeRange::Week);
    }

    #[test]
    fn test_set_and_reset() {
        let mut filters = FilterState::default();
        filters.set(FilterKey::Type, "lead").unwrap();
        filters.set(FilterKey::Status, "interview").unwrap();
        filters.set(FilterKey::TimeRange, "month").unwrap();

        assert_eq!(filters.entry_type, Some(EntryType::Lead));
        assert_eq!(filters.status, Some(EntryStatus::Interview));
        assert_eq!(filters.time_range, TimeRange::Month);

        filters.set(FilterKey::Type, "all").unwrap();
        assert_eq!(filters.entry_type, None);
    }

    #[test]
    fn test_invalid_values_leave_state_alone() {
        let mut filters = FilterState::default();
        assert!(filters.set(FilterKey::Status, "ghosted").is_err());
        assert!(filters.set(FilterKey::TimeRange, "all").is_err());
        assert_eq!(filters, FilterState::default());
    }

    #[test]
    fn test_filter_key_parse_and_display() {
        assert_eq!("timeRange".parse::<FilterKey>().unwrap(), FilterKey::TimeRange);
        assert_eq!(FilterKey::TimeRange.to_string(), "timeRange");
        assert!("company".parse::<FilterKey>().is_err());
    }
}
