//! Safe-output directives declared under `safe-outputs`.
//!
//! Each directive is enabled by its presence; `null` enables it with defaults.
//! The enabled set is also serialized to JSON for the output collector.

use super::SemanticIssue;
use crate::schema::FieldPath;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Which issue or pull request a safe output acts on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SafeOutputTarget {
    /// The issue or pull request that triggered the run.
    #[default]
    Triggering,
    /// Any issue, chosen by the agent (`*`).
    Any,
    /// A fixed issue number.
    Number(u64),
}

impl SafeOutputTarget {
    fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_u64().map(SafeOutputTarget::Number),
            Value::String(text) => match text.trim() {
                "triggering" => Some(SafeOutputTarget::Triggering),
                "*" => Some(SafeOutputTarget::Any),
                other => other.parse().ok().map(SafeOutputTarget::Number),
            },
            _ => None,
        }
    }

    /// Text passed to the job as its target variable.
    pub fn as_env(&self) -> String {
        match self {
            SafeOutputTarget::Triggering => "triggering".to_string(),
            SafeOutputTarget::Any => "*".to_string(),
            SafeOutputTarget::Number(number) => number.to_string(),
        }
    }
}

impl Serialize for SafeOutputTarget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_env())
    }
}

fn default_max() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreateIssueConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default = "default_max")]
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct UpdateIssueConfig {
    pub status: bool,
    pub title: bool,
    pub body: bool,
    pub target: SafeOutputTarget,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddIssueCommentConfig {
    pub target: SafeOutputTarget,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreatePullRequestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default = "default_true")]
    pub draft: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PushToBranchConfig {
    pub branch: String,
    pub target: SafeOutputTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreateDiscussionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default = "default_max")]
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReviewCommentConfig {
    #[serde(default = "default_side")]
    pub side: String,
    #[serde(default = "default_max")]
    pub max: u32,
}

fn default_side() -> String {
    "RIGHT".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddIssueLabelConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
    #[serde(default = "default_max")]
    pub max: u32,
}

/// All safe-output directives; `None` means disabled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SafeOutputsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_issue: Option<CreateIssueConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_issue: Option<UpdateIssueConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_issue_comment: Option<AddIssueCommentConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_pull_request: Option<CreatePullRequestConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_to_branch: Option<PushToBranchConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_discussion: Option<CreateDiscussionConfig>,
    #[serde(
        rename = "create-pull-request-review-comment",
        skip_serializing_if = "Option::is_none"
    )]
    pub create_pr_review_comment: Option<ReviewCommentConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_issue_label: Option<AddIssueLabelConfig>,
}

impl SafeOutputsConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Whether an enabled directive commits to the repository.
    pub fn requires_repository_mutation(&self) -> bool {
        self.create_pull_request.is_some() || self.push_to_branch.is_some()
    }

    /// JSON passed to the output collector.
    pub fn to_config_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

pub(super) fn parse_safe_outputs(
    mapping: Option<&Mapping>,
    base: &FieldPath,
    issues: &mut Vec<SemanticIssue>,
) -> SafeOutputsConfig {
    let mut config = SafeOutputsConfig::default();
    let Some(mapping) = mapping else {
        return config;
    };

    for (key, value) in mapping {
        let Some(name) = key.as_str() else { continue };
        let path = base.child(name);
        let fields = value.as_mapping().cloned().unwrap_or_default();
        match name {
            "create-issue" => config.create_issue = decode(value, &path, issues),
            "update-issue" => {
                config.update_issue = Some(UpdateIssueConfig {
                    status: flag(&fields, "status"),
                    title: flag(&fields, "title"),
                    body: flag(&fields, "body"),
                    target: target(&fields, &path, issues),
                    max: max(&fields),
                })
            }
            "add-issue-comment" => {
                config.add_issue_comment = Some(AddIssueCommentConfig {
                    target: target(&fields, &path, issues),
                    max: max(&fields),
                })
            }
            "create-pull-request" => config.create_pull_request = decode(value, &path, issues),
            "push-to-branch" => {
                let branch = fields.get("branch").and_then(Value::as_str).unwrap_or_default();
                if branch.trim().is_empty() {
                    issues.push(SemanticIssue::new(
                        path.child("branch"),
                        "push-to-branch needs a non-empty 'branch'",
                    ));
                    continue;
                }
                config.push_to_branch = Some(PushToBranchConfig {
                    branch: branch.to_string(),
                    target: target(&fields, &path, issues),
                });
            }
            "create-discussion" => config.create_discussion = decode(value, &path, issues),
            "create-pull-request-review-comment" => {
                config.create_pr_review_comment = decode(value, &path, issues)
            }
            "add-issue-label" => config.add_issue_label = decode(value, &path, issues),
            _ => {}
        }
    }
    config
}

/// A directive flag such as `status:`; present with `null` or `true` enables it.
fn flag(fields: &Mapping, key: &str) -> bool {
    match fields.get(key) {
        Some(Value::Bool(enabled)) => *enabled,
        Some(Value::Null) => true,
        _ => false,
    }
}

fn max(fields: &Mapping) -> u32 {
    fields
        .get("max")
        .and_then(Value::as_u64)
        .and_then(|max| u32::try_from(max).ok())
        .unwrap_or_else(default_max)
}

fn target(fields: &Mapping, path: &FieldPath, issues: &mut Vec<SemanticIssue>) -> SafeOutputTarget {
    let Some(value) = fields.get("target") else {
        return SafeOutputTarget::default();
    };
    SafeOutputTarget::parse(value).unwrap_or_else(|| {
        issues.push(
            SemanticIssue::new(path.child("target"), "invalid target")
                .with_hint("use 'triggering', '*', or an issue number"),
        );
        SafeOutputTarget::default()
    })
}

fn decode<T>(value: &Value, path: &FieldPath, issues: &mut Vec<SemanticIssue>) -> Option<T>
where
    T: serde::de::DeserializeOwned,
{
    let value = if value.is_null() {
        Value::Mapping(Mapping::new())
    } else {
        value.clone()
    };
    match serde_yaml::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            issues.push(SemanticIssue::new(path.clone(), e.to_string()));
            None
        }
    }
}
