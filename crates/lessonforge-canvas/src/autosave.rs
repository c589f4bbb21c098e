//! Auto-save bookkeeping
//!
//! Tracks dirty/clean state, whether a save is in flight, and when the
//! lesson was last persisted. The I/O itself lives in [`crate::editor`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Auto-save state for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSaveController {
    /// Whether the periodic loop should save this session
    pub enabled: bool,
    /// A save is in flight
    pub is_saving: bool,
    /// Edits since the last successful save
    pub has_unsaved_changes: bool,
    /// Time of the last successful save
    pub last_saved: Option<DateTime<Utc>>,
    /// Bumped on every edit; a save only cleans the revision it wrote
    #[serde(default)]
    pub revision: u64,
}

impl AutoSaveController {
    /// Create a clean controller
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            is_saving: false,
            has_unsaved_changes: false,
            last_saved: None,
            revision: 0,
        }
    }

    /// Record an edit
    pub fn mark_dirty(&mut self) {
        self.has_unsaved_changes = true;
        self.revision += 1;
    }

    /// Enter the saving state and return the revision being written.
    /// Overlapping saves are rejected.
    pub fn begin_save(&mut self) -> Result<u64> {
        if self.is_saving {
            return Err(Error::SaveInProgress);
        }
        self.is_saving = true;
        Ok(self.revision)
    }

    /// Leave the saving state after `revision` was written.
    ///
    /// Edits made while the write was in flight keep the session dirty.
    pub fn complete_save(&mut self, revision: u64, at: DateTime<Utc>) {
        self.is_saving = false;
        if self.revision == revision {
            self.has_unsaved_changes = false;
        }
        self.last_saved = Some(at);
    }

    /// Leave the saving state after a failed write; dirty flag is kept
    pub fn fail_save(&mut self) {
        self.is_saving = false;
    }

    /// Whether the periodic loop should fire now
    #[must_use]
    pub fn should_autosave(&self) -> bool {
        self.enabled && self.has_unsaved_changes && !self.is_saving
    }
}

impl Default for AutoSaveController {
    fn default() -> Self {
        Self::new(true)
    }
}
