//! Panel session scripts
//!
//! A script is a JSON document describing what a user did in one panel:
//!
//! ```json
//! {
//!   "seed": { "title": "Mix notes" },
//!   "steps": [
//!     { "op": "edit", "change": { "description": "bounce stems" } },
//!     { "op": "wait", "ms": 1200 },
//!     { "op": "immediate", "change": { "priority": "high" } },
//!     { "op": "key", "key": "escape" }
//!   ]
//! }
//! ```
//!
//! Without `seed` the panel opens in create mode.

use serde::Deserialize;
use std::path::Path;
use studio_draft::{ChangeOf, EntityKind, KeyCommand, RelationLink};

/// One user action
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", bound = "")]
pub enum Step<K: EntityKind> {
    /// Let time pass
    Wait {
        /// Milliseconds
        ms: u64,
    },
    /// Typed edit, debounced
    Edit {
        /// Field edit
        change: ChangeOf<K>,
    },
    /// Selector edit, sent right away when possible
    Immediate {
        /// Field edit
        change: ChangeOf<K>,
    },
    /// Link another aggregate
    Relate {
        /// Link to record
        link: RelationLink,
    },
    /// Remove the link of one domain type
    Unrelate {
        /// Domain type
        domain_type: String,
    },
    /// Key press
    Key {
        /// Key command
        key: KeyCommand,
    },
    /// Open the delete confirmation and confirm it
    Delete,
    /// Close the panel
    Close,
}

/// A recorded panel session
#[derive(Debug, Clone, Deserialize)]
#[serde(bound = "")]
pub struct Script<K: EntityKind> {
    /// Entity to open in edit mode; create mode when absent
    #[serde(default)]
    pub seed: Option<K::Fields>,
    /// Actions in order
    pub steps: Vec<Step<K>>,
}

impl<K: EntityKind> Script<K> {
    /// Parse from JSON text
    ///
    /// # Errors
    /// Returns an error if the text is not a valid script for this kind
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a script file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        Self::from_json(&text).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_entities::{TaskChange, TaskKind, TaskPriority, TeamKind};

    #[test]
    fn parses_task_script() {
        let script = Script::<TaskKind>::from_json(
            r#"{
                "steps": [
                    {"op": "relate", "link": {"domain_type": "campaign", "related_id": 7}},
                    {"op": "edit", "change": {"title": "Fix mix"}},
                    {"op": "immediate", "change": {"priority": "urgent"}},
                    {"op": "wait", "ms": 1100},
                    {"op": "key", "key": "escape"}
                ]
            }"#,
        )
        .unwrap();

        assert!(script.seed.is_none());
        assert_eq!(script.steps.len(), 5);
        assert_eq!(
            script.steps[2],
            Step::Immediate {
                change: TaskChange::Priority(TaskPriority::Urgent)
            }
        );
        assert_eq!(
            script.steps[4],
            Step::Key {
                key: KeyCommand::Escape
            }
        );
    }

    #[test]
    fn seed_opens_edit_mode() {
        let script = Script::<TeamKind>::from_json(
            r#"{"seed": {"name": "Platform", "member_ids": [1, 2]}, "steps": [{"op": "close"}]}"#,
        )
        .unwrap();
        assert_eq!(script.seed.unwrap().name, "Platform");
    }

    #[test]
    fn load_names_the_file_on_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"{\"steps\": [{\"op\": \"jump\"}]}").unwrap();

        let err = Script::<TaskKind>::load(file.path()).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(Script::<TaskKind>::from_json(
            r#"{"steps": [{"op": "edit", "change": {"colour": "red"}}]}"#
        )
        .is_err());
    }
}
