//! Concurrency group derivation.

use super::triggers::TriggerCategories;
use crate::expr::builders::any_property_set;
use crate::frontmatter::ConcurrencyOverride;
use serde::Serialize;

/// The pipeline's `concurrency:` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConcurrencyPolicy {
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_in_progress: Option<bool>,
}

/// Derive the concurrency block from the trigger categories, unless the
/// author set one.
///
/// The group is scoped to the workflow and, for issue, pull request and
/// discussion triggers, to the item number (issue first, then pull request,
/// then discussion). In-progress runs are cancelled only for workflows that
/// react to nothing but pull request events.
pub fn derive(
    categories: &TriggerCategories,
    author: Option<&ConcurrencyOverride>,
) -> ConcurrencyPolicy {
    if let Some(author) = author {
        return ConcurrencyPolicy {
            group: author.group.clone(),
            cancel_in_progress: author.cancel_in_progress,
        };
    }

    let mut numbers = Vec::new();
    if categories.issue {
        numbers.push("github.event.issue.number");
    }
    if categories.pull_request {
        numbers.push("github.event.pull_request.number");
    }
    if categories.discussion {
        numbers.push("github.event.discussion.number");
    }

    let mut group = "awflow-${{ github.workflow }}".to_string();
    if !numbers.is_empty() {
        group.push_str(&format!("-${{{{ {} }}}}", any_property_set(&numbers).render()));
    }

    ConcurrencyPolicy {
        group,
        cancel_in_progress: (categories.pull_request_only && !categories.command).then_some(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_request_only_cancels() {
        let categories = TriggerCategories {
            pull_request: true,
            pull_request_only: true,
            ..TriggerCategories::default()
        };
        let policy = derive(&categories, None);
        assert_eq!(
            policy.group,
            "awflow-${{ github.workflow }}-${{ github.event.pull_request.number }}"
        );
        assert_eq!(policy.cancel_in_progress, Some(true));
    }

    #[test]
    fn command_never_cancels() {
        let categories = TriggerCategories {
            pull_request: true,
            issue: true,
            command: true,
            pull_request_only: false,
            ..TriggerCategories::default()
        };
        let policy = derive(&categories, None);
        assert_eq!(policy.cancel_in_progress, None);
        assert!(policy.group.ends_with(
            "-${{ github.event.issue.number || github.event.pull_request.number }}"
        ));
    }

    #[test]
    fn schedule_is_workflow_scoped() {
        let policy = derive(&TriggerCategories::default(), None);
        assert_eq!(policy.group, "awflow-${{ github.workflow }}");
        assert_eq!(policy.cancel_in_progress, None);
    }

    #[test]
    fn author_override_wins() {
        let author = ConcurrencyOverride {
            group: "custom".to_string(),
            cancel_in_progress: Some(false),
        };
        let categories = TriggerCategories {
            pull_request: true,
            pull_request_only: true,
            ..TriggerCategories::default()
        };
        let policy = derive(&categories, Some(&author));
        assert_eq!(policy.group, "custom");
        assert_eq!(policy.cancel_in_progress, Some(false));
    }
}
