//! Editor configuration

use serde::{Deserialize, Serialize};

use crate::gateway::SchemaCapabilities;
use crate::history::DEFAULT_MAX_HISTORY_SIZE;

/// Editor core settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of undo levels
    pub max_history_size: usize,
    /// Background of the first page for new lessons
    pub first_page_background: String,
    /// Offset applied to duplicated and pasted blocks
    pub duplicate_offset: f64,
    /// Auto-save settings
    pub autosave: AutoSaveConfig,
    /// Persisted schema capabilities
    pub schema: SchemaCapabilities,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            first_page_background: "#ffffff".to_string(),
            duplicate_offset: 20.0,
            autosave: AutoSaveConfig::default(),
            schema: SchemaCapabilities::default(),
        }
    }
}

impl EditorConfig {
    /// Restrict configured schema capabilities to what the store supports
    #[must_use]
    pub fn with_schema(mut self, detected: SchemaCapabilities) -> Self {
        self.schema = self.schema.intersect(detected);
        self
    }
}

/// Auto-save loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    /// Whether dirty sessions are saved periodically
    pub enabled: bool,
    /// Seconds between auto-save checks
    pub interval_secs: u64,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}
