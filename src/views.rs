// Date bucketing for calendar and analytics views
//
// These work on whatever slice the caller passes, normally
// `Store::filtered_entries()`, and interpret the `time_range` filter that
// the store itself ignores.

use crate::filter::TimeRange;
use crate::models::{Entry, EntryStatus, EntryType};
use chrono::{Datelike, Duration, NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::BTreeMap;

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// The week (Sunday to Saturday) or month containing `today`
pub fn date_range(range: TimeRange, today: NaiveDate) -> DateRange {
    match range {
        TimeRange::Week => {
            let start = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
            DateRange {
                start,
                end: start + Duration::days(6),
            }
        }
        TimeRange::Month => month_range(today),
    }
}

fn month_range(day: NaiveDate) -> DateRange {
    let start = day.with_day(1).unwrap_or(day);
    let next_month = if start.month() == 12 {
        NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
    };
    let end = next_month.and_then(|d| d.pred_opt()).unwrap_or(start);
    DateRange { start, end }
}

/// Calendar day of an entry's creation in `tz`
pub fn day_of<Tz: TimeZone>(entry: &Entry, tz: &Tz) -> NaiveDate {
    entry.created_at.with_timezone(tz).date_naive()
}

/// Entries created on `day`
pub fn entries_on<'a, Tz: TimeZone>(entries: &[&'a Entry], day: NaiveDate, tz: &Tz) -> Vec<&'a Entry> {
    entries.iter().copied().filter(|e| day_of(e, tz) == day).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub jobs: usize,
    pub leads: usize,
    pub total: usize,
}

/// One row per day in `range`, including empty days
pub fn daily_activity<Tz: TimeZone>(entries: &[&Entry], range: DateRange, tz: &Tz) -> Vec<DailyActivity> {
    let mut rows: Vec<DailyActivity> = range
        .days()
        .map(|date| DailyActivity {
            date,
            jobs: 0,
            leads: 0,
            total: 0,
        })
        .collect();

    for entry in entries {
        let day = day_of(entry, tz);
        if !range.contains(day) {
            continue;
        }
        let row = &mut rows[(day - range.start).num_days() as usize];
        match entry.entry_type {
            EntryType::Job => row.jobs += 1,
            EntryType::Lead => row.leads += 1,
        }
        row.total += 1;
    }

    rows
}

/// Status counts for entries created within `range`; absent statuses are omitted
pub fn status_breakdown<Tz: TimeZone>(entries: &[&Entry], range: DateRange, tz: &Tz) -> BTreeMap<EntryStatus, usize> {
    let mut counts = BTreeMap::new();
    for entry in entries.iter().filter(|e| range.contains(day_of(e, tz))) {
        *counts.entry(entry.status).or_insert(0) += 1;
    }
    counts
}

/// How busy a calendar day was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    None,
    Low,
    Medium,
    High,
}

impl ActivityLevel {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => ActivityLevel::None,
            1..=2 => ActivityLevel::Low,
            3..=4 => ActivityLevel::Medium,
            _ => ActivityLevel::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub count: usize,
    pub level: ActivityLevel,
}

/// One cell per day of the month containing `month`
pub fn month_grid<Tz: TimeZone>(entries: &[&Entry], month: NaiveDate, tz: &Tz) -> Vec<CalendarDay> {
    daily_activity(entries, month_range(month), tz)
        .into_iter()
        .map(|row| CalendarDay {
            date: row.date,
            count: row.total,
            level: ActivityLevel::from_count(row.total),
        })
        .collect()
}
