// Screenshot analysis stub
//
// No image is inspected. `MockAnalyzer` waits for its configured delay and
// returns a fixed result, standing in for a real extraction service.

use crate::models::NewEntry;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Fields extracted from a screenshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub company: String,
    pub position: String,
    pub location: String,
    pub contact_method: String,
    pub notes: String,
}

impl Analysis {
    /// Overwrite the draft's fields with the extracted ones
    pub fn apply_to(&self, draft: &mut NewEntry) {
        draft.company = self.company.clone();
        draft.position = Some(self.position.clone());
        draft.location = Some(self.location.clone());
        draft.contact_method = Some(self.contact_method.clone());
        draft.notes = Some(self.notes.clone());
    }
}

pub trait Analyzer {
    fn analyze(&self, screenshot: &str) -> Result<Analysis>;
}

#[derive(Debug, Clone)]
pub struct MockAnalyzer {
    delay: Duration,
}

impl MockAnalyzer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl Analyzer for MockAnalyzer {
    fn analyze(&self, screenshot: &str) -> Result<Analysis> {
        debug!(bytes = screenshot.len(), delay_ms = self.delay.as_millis() as u64, "Running mock analysis");
        thread::sleep(self.delay);

        Ok(Analysis {
            company: "TechCorp Inc.".to_string(),
            position: "Senior Frontend Developer".to_string(),
            location: "Remote".to_string(),
            contact_method: "email".to_string(),
            notes: "Looking for React/Next.js expertise. Great benefits package mentioned.".to_string(),
        })
    }
}
