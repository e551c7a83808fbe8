//! Patch snapshots carried by placed clips

use serde::{Deserialize, Serialize};

/// Identifier of a patch in the patch repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatchId(pub u64);

/// Immutable snapshot of a patch, captured when a clip is placed.
/// Later edits to the source patch never reach clips holding a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSummary {
    pub id: PatchId,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    /// Pitch name, e.g. "C4"
    #[serde(default = "default_note")]
    pub note: String,
    /// Note value, e.g. "8n"
    #[serde(default = "default_duration")]
    pub duration: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

fn default_note() -> String {
    "C4".to_string()
}

fn default_duration() -> String {
    "8n".to_string()
}

impl PatchSummary {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: PatchId(id),
            display_name: name.clone(),
            name,
            note: default_note(),
            duration: default_duration(),
            parameters: serde_json::Value::Null,
        }
    }

    /// Name shown on clips; falls back to the patch name
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}
