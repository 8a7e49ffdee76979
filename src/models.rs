// Data models for the freelance tracker

use chrono::{DateTime, Utc};
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of opportunity being tracked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// A job application
    #[default]
    Job,
    /// A client lead
    Lead,
}

impl EntryType {
    pub const ALL: [EntryType; 2] = [EntryType::Job, EntryType::Lead];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Job => "job",
            EntryType::Lead => "lead",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "job" => Ok(EntryType::Job),
            "lead" => Ok(EntryType::Lead),
            other => Err(eyre!("Invalid entry type: {} (expected job or lead)", other)),
        }
    }
}

/// Where an entry stands in its pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    #[default]
    Pending,
    Applied,
    Interview,
    Rejected,
    Accepted,
}

impl EntryStatus {
    pub const ALL: [EntryStatus; 5] = [
        EntryStatus::Pending,
        EntryStatus::Applied,
        EntryStatus::Interview,
        EntryStatus::Rejected,
        EntryStatus::Accepted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Applied => "applied",
            EntryStatus::Interview => "interview",
            EntryStatus::Rejected => "rejected",
            EntryStatus::Accepted => "accepted",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        EntryStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| eyre!("Invalid status: {} (expected one of pending, applied, interview, rejected, accepted)", s))
    }
}

/// One tracked job application or client lead
///
/// Field names on disk are camelCase so payloads written by the browser
/// version of the tracker load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default)]
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<String>,
    /// Opaque image payload (data URI or path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating an entry
///
/// The store assigns `id` and both timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewEntry {
    pub entry_type: EntryType,
    pub company: String,
    pub position: Option<String>,
    pub location: Option<String>,
    pub contact_method: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<String>,
    pub screenshot: Option<String>,
    pub status: EntryStatus,
}

impl NewEntry {
    pub fn new(entry_type: EntryType, company: impl Into<String>) -> Self {
        Self {
            entry_type,
            company: company.into(),
            ..Default::default()
        }
    }

    pub(crate) fn into_entry(self, id: String, now: DateTime<Utc>) -> Entry {
        Entry {
            id,
            entry_type: self.entry_type,
            company: self.company,
            position: self.position,
            location: self.location,
            contact_method: self.contact_method,
            url: self.url,
            notes: self.notes,
            follow_up_date: self.follow_up_date,
            screenshot: self.screenshot,
            status: self.status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for an existing entry
///
/// `None` leaves a field alone. For the optional text fields an empty string
/// clears the value. Identity, timestamps and the screenshot cannot be patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub entry_type: Option<EntryType>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub contact_method: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<String>,
    pub status: Option<EntryStatus>,
}

impl EntryPatch {
    pub fn status(status: EntryStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Reject patches that would leave an entry in a state creation forbids
    pub fn validate(&self) -> Result<()> {
        if self.company.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(eyre!("Company cannot be patched to an empty value"));
        }
        Ok(())
    }

    /// Merge onto `entry`; the caller owns `updated_at`
    pub(crate) fn apply(self, entry: &mut Entry) {
        if let Some(entry_type) = self.entry_type {
            entry.entry_type = entry_type;
        }
        if let Some(company) = self.company {
            entry.company = company;
        }
        if let Some(status) = self.status {
            entry.status = status;
        }
        merge_text(&mut entry.position, self.position);
        merge_text(&mut entry.location, self.location);
        merge_text(&mut entry.contact_method, self.contact_method);
        merge_text(&mut entry.url, self.url);
        merge_text(&mut entry.notes, self.notes);
        merge_text(&mut entry.follow_up_date, self.follow_up_date);
    }
}

fn merge_text(field: &mut Option<String>, value: Option<String>) {
    match value {
        None => {}
        Some(v) if v.is_empty() => *field = None,
        Some(v) => *field = Some(v),
    }
}

/// Aggregate counts over the filtered entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub job_applications: usize,
    pub client_leads: usize,
    /// Only statuses that occur are present
    pub status_counts: BTreeMap<EntryStatus, usize>,
}

impl Stats {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Self {
        let mut stats = Stats::default();
        for entry in entries {
            stats.total += 1;
            match entry.entry_type {
                EntryType::Job => stats.job_applications += 1,
                EntryType::Lead => stats.client_leads += 1,
            }
            *stats.status_counts.entry(entry.status).or_insert(0) += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Entry {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        NewEntry {
            position: Some("Backend Engineer".to_string()),
            notes: Some("Referred by Sam".to_string()),
            ..NewEntry::new(EntryType::Job, "Acme")
        }
        .into_entry("id-1".to_string(), ts)
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&EntryStatus::Interview).unwrap();
        assert_eq!(json, "\"interview\"");

        let json = serde_json::to_string(&EntryType::Lead).unwrap();
        assert_eq!(json, "\"lead\"");
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("job".parse::<EntryType>().unwrap(), EntryType::Job);
        assert_eq!(" Lead ".parse::<EntryType>().unwrap(), EntryType::Lead);
        assert!("gig".parse::<EntryType>().is_err());

        assert_eq!("accepted".parse::<EntryStatus>().unwrap(), EntryStatus::Accepted);
        assert!("ghosted".parse::<EntryStatus>().is_err());
    }

    #[test]
    fn test_entry_uses_camel_case_on_disk() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"type\":\"job\""));
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"updatedAt\""));
        assert!(!json.contains("screenshot"));
    }

    #[test]
    fn test_entry_loads_browser_payload() {
        let json = r#"{
            "type": "lead",
            "company": "Globex",
            "position": "",
            "url": "",
            "location": "Remote",
            "contactMethod": "email",
            "status": "applied",
            "notes": "",
            "screenshot": null,
            "followUpDate": "",
            "id": "6a1f",
            "createdAt": "2024-05-02T09:30:00.000Z",
            "updatedAt": "2024-05-02T09:30:00.000Z"
        }"#;

        let entry: Entry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.entry_type, EntryType::Lead);
        assert_eq!(entry.status, EntryStatus::Applied);
        assert_eq!(entry.contact_method.as_deref(), Some("email"));
        assert_eq!(entry.screenshot, None);
    }

    #[test]
    fn test_entry_rejects_unknown_status() {
        let json = r#"{"id":"x","type":"job","company":"A","status":"ghosted",
            "createdAt":"2024-05-02T09:30:00Z","updatedAt":"2024-05-02T09:30:00Z"}"#;
        assert!(serde_json::from_str::<Entry>(json).is_err());
    }

    #[test]
    fn test_patch_merge() {
        let mut entry = sample();
        let patch = EntryPatch {
            status: Some(EntryStatus::Interview),
            notes: Some(String::new()),
            location: Some("Berlin".to_string()),
            ..Default::default()
        };
        patch.apply(&mut entry);

        assert_eq!(entry.status, EntryStatus::Interview);
        assert_eq!(entry.notes, None);
        assert_eq!(entry.location.as_deref(), Some("Berlin"));
        assert_eq!(entry.position.as_deref(), Some("Backend Engineer"));
        assert_eq!(entry.company, "Acme");
    }

    #[test]
    fn test_patch_validation() {
        assert!(EntryPatch::default().validate().is_ok());
        assert!(EntryPatch::default().is_empty());

        let blank = EntryPatch {
            company: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
        assert!(!blank.is_empty());
    }

    #[test]
    fn test_stats_serialization_omits_missing_statuses() {
        let stats = Stats::from_entries(&[sample()]);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "total": 1,
                "jobApplications": 1,
                "clientLeads": 0,
                "statusCounts": { "pending": 1 }
            })
        );
    }
}
