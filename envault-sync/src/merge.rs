//! Variable merge engine.
//!
//! Folds a remote variable list into local env-file text. Lines that are not
//! assignments of a changed key are never touched, removed or reordered.

use envault_core::{dotenv, UpdateRecord, Variable};

use crate::document::EnvDocument;
use crate::prompt::{confirm_unless_forced, Prompter};

/// How the merge treats keys that are missing locally.
pub struct MergePolicy<'a> {
    /// Allow adding keys that the local file does not have yet.
    pub constructive: bool,
    /// Answer yes to every confirmation.
    pub force: bool,
    /// Env file name, used in prompt text only.
    pub filename: &'a str,
    pub prompter: &'a dyn Prompter,
}

/// Result of a merge: the new text and what changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub content: String,
    pub updates: Vec<UpdateRecord>,
}

impl MergeOutcome {
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Merge `remote` into `content`, in snapshot order.
pub fn merge(content: &str, remote: &[Variable], policy: &MergePolicy<'_>) -> MergeOutcome {
    let local = dotenv::parse(content);
    let mut doc = EnvDocument::parse(content);
    let mut updates = Vec::new();

    for variable in remote {
        let key = variable.key.as_str();
        // Keys the parser rejects are still read from their `KEY=` line.
        let local_value = local
            .get(key)
            .cloned()
            .or_else(|| doc.raw_value(key).map(dotenv::parse_value));

        if local_value.is_none() {
            if !policy.constructive {
                continue;
            }
            let prompt = format!(
                "The {key} variable is not currently present in your {} file. Would you like to add it?",
                policy.filename
            );
            if !confirm_unless_forced(policy.prompter, policy.force, &prompt) {
                tracing::debug!(key, "declined to add missing variable");
                continue;
            }
        }

        let remote_value = &variable.latest_version.value;
        if local_value.is_some_and(|value| value == dotenv::parse_value(remote_value)) {
            continue;
        }

        let rewritten = doc.set(key, remote_value);
        if rewritten > 1 {
            tracing::warn!(key, lines = rewritten, "variable assigned on several lines; rewrote all of them");
        }
        tracing::debug!(key, version = variable.latest_version.id, "updated variable");

        updates.push(UpdateRecord {
            key: variable.key.clone(),
            new_version_id: variable.latest_version.id,
        });
    }

    MergeOutcome {
        content: doc.render(),
        updates,
    }
}
