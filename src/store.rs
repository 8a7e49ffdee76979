// Entry store: the single source of truth for tracked entries

use crate::clock::{Clock, SystemClock};
use crate::export::{self, ExportFormat};
use crate::filter::{FilterKey, FilterState};
use crate::models::{Entry, EntryPatch, NewEntry, Stats};
use crate::storage::{self, Backend};
use chrono::Duration;
use eyre::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a mutation plus any problem persisting it
///
/// A failed write does not undo the in-memory change; the store stays
/// authoritative for the session and the caller decides how loudly to report.
#[derive(Debug)]
pub struct Saved<T> {
    pub value: T,
    pub warning: Option<String>,
}

impl<T> Saved<T> {
    pub fn is_persisted(&self) -> bool {
        self.warning.is_none()
    }
}

/// Holds the entry collection (most recent first) and the active filter
pub struct Store {
    entries: Vec<Entry>,
    filters: FilterState,
    backend: Box<dyn Backend>,
    clock: Box<dyn Clock>,
}

impl Store {
    /// Open a store over `backend` using wall-clock time
    pub fn open<B: Backend + 'static>(backend: B) -> Self {
        Self::open_with_clock(backend, SystemClock)
    }

    /// Load entries from `backend`
    ///
    /// Missing data gives an empty store. Unreadable data is logged, handed to
    /// `Backend::preserve` and also gives an empty store; this never fails.
    /// Filters always start at their defaults.
    pub fn open_with_clock<B, C>(backend: B, clock: C) -> Self
    where
        B: Backend + 'static,
        C: Clock + 'static,
    {
        let mut backend: Box<dyn Backend> = Box::new(backend);
        let entries = Self::load(backend.as_mut());
        info!(backend = %backend.describe(), count = entries.len(), "Opened entry store");

        Self {
            entries,
            filters: FilterState::default(),
            backend,
            clock: Box::new(clock),
        }
    }

    fn load(backend: &mut dyn Backend) -> Vec<Entry> {
        let payload = match backend.read() {
            Ok(Some(payload)) => payload,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(backend = %backend.describe(), error = ?e, "Failed to read stored entries, starting empty");
                return Vec::new();
            }
        };

        match storage::decode(&payload) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(backend = %backend.describe(), error = ?e, "Stored entries are unreadable, starting empty");
                if let Err(e) = backend.preserve(&payload) {
                    warn!(error = ?e, "Failed to preserve unreadable entries");
                }
                Vec::new()
            }
        }
    }

    /// Write the full collection; failures become a warning
    fn persist(&mut self) -> Option<String> {
        let result = storage::encode(&self.entries).and_then(|payload| self.backend.write(&payload));
        match result {
            Ok(()) => None,
            Err(e) => {
                warn!(backend = %self.backend.describe(), error = ?e, "Failed to persist entries");
                Some(format!("{:#}", e))
            }
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a new entry at the front of the collection
    pub fn create(&mut self, fields: NewEntry) -> Saved<Entry> {
        let id = Uuid::now_v7().to_string();
        let entry = fields.into_entry(id, self.clock.now());
        debug!(id = %entry.id, entry_type = %entry.entry_type, "Creating entry");

        self.entries.insert(0, entry.clone());
        let warning = self.persist();
        Saved { value: entry, warning }
    }

    /// Merge `patch` into the entry with `id`
    ///
    /// Returns `None` without writing if the id is unknown.
    pub fn update(&mut self, id: &str, patch: EntryPatch) -> Result<Saved<Option<Entry>>> {
        let Some(index) = self.entries.iter().position(|e| e.id == id) else {
            debug!(id, "Update for unknown entry ignored");
            return Ok(Saved {
                value: None,
                warning: None,
            });
        };
        patch.validate()?;

        let now = self.clock.now();
        let entry = &mut self.entries[index];
        patch.apply(entry);
        // updated_at must move forward even if the clock did not
        entry.updated_at = if now > entry.updated_at {
            now
        } else {
            entry.updated_at + Duration::milliseconds(1)
        };
        debug!(id, status = %entry.status, "Updated entry");

        let updated = entry.clone();
        let warning = self.persist();
        Ok(Saved {
            value: Some(updated),
            warning,
        })
    }

    /// Remove the entry with `id`; returns whether one was removed
    pub fn delete(&mut self, id: &str) -> Saved<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);

        if self.entries.len() == before {
            debug!(id, "Delete for unknown entry ignored");
            return Saved {
                value: false,
                warning: None,
            };
        }

        debug!(id, "Deleted entry");
        let warning = self.persist();
        Saved { value: true, warning }
    }

    /// Drop every entry and the stored record; returns how many were removed
    pub fn clear(&mut self) -> Saved<usize> {
        let count = self.entries.len();
        self.entries.clear();

        let warning = match self.backend.remove() {
            Ok(()) => None,
            Err(e) => {
                warn!(backend = %self.backend.describe(), error = ?e, "Failed to remove stored entries");
                Some(format!("{:#}", e))
            }
        };

        info!(count, "Cleared all entries");
        Saved { value: count, warning }
    }

    // ========================================================================
    // Filters and derived views
    // ========================================================================

    /// Change one filter dimension; entries and storage are untouched
    pub fn set_filter(&mut self, key: FilterKey, value: &str) -> Result<()> {
        self.filters.set(key, value)?;
        debug!(%key, value, "Filter changed");
        Ok(())
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Entries matching the type and status filters, in stored order
    pub fn filtered_entries(&self) -> Vec<&Entry> {
        self.entries.iter().filter(|e| self.filters.matches(e)).collect()
    }

    /// Counts over `filtered_entries()`
    pub fn stats(&self) -> Stats {
        Stats::from_entries(self.filtered_entries())
    }

    /// All entries, unfiltered, most recent first
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    // ========================================================================
    // Export
    // ========================================================================

    pub fn export_json(&self) -> Result<String> {
        export::to_json(&self.entries)
    }

    pub fn export_csv(&self) -> String {
        export::to_csv(&self.entries)
    }

    /// Write a dated export file of the full collection into `dir`
    pub fn export_to(&self, dir: &Path, format: ExportFormat) -> Result<PathBuf> {
        export::write_to(dir, format, &self.entries, self.clock.now().date_naive())
    }
}
