use serde::{Deserialize, Serialize};

/// One decoded change record from the analysis stream.
///
/// Every field is optional on the wire: the backend merges the raw diff
/// record with whatever the classification step produced, and a failed
/// classification yields an `error` field instead of the usual summary.
/// A record is only dispatched if [`ChangeRecord::is_identified`] holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential_impact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ChangeRecord {
    /// A record with none of `section`, `change_type` or `change_summary` is
    /// unusable by the presentation layer and gets dropped before dispatch.
    pub fn is_identified(&self) -> bool {
        self.section.is_some() || self.change_type.is_some() || self.change_summary.is_some()
    }

    /// Single-line rendering used by the CLI, e.g. `[Modified] section 1.2`.
    pub fn headline(&self) -> String {
        let kind = self.change_type.as_deref().unwrap_or("Change");
        match self.section.as_deref() {
            Some(section) => format!("[{}] section {}", kind, section),
            None => format!("[{}]", kind),
        }
    }
}
