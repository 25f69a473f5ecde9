//! One job per enabled safe-output directive.
//!
//! Every job needs the agent job, runs with the narrowest permissions its
//! action requires, and receives the collected agent output through
//! `GH_AW_AGENT_OUTPUT` plus its directive settings as environment variables.

use super::graph::JobSpec;
use crate::config::CompilerConfig;
use crate::engine::ExecutionStepSpec;
use crate::expr::ConditionNode;
use crate::expr::builders::{
    any_property_set, equals, event_type_equals, not_equals, or, property, string,
};
use crate::frontmatter::{PermissionLevel, Permissions, SafeOutputTarget, SafeOutputsConfig};
use serde_yaml::Value;
use std::collections::BTreeMap;

pub const AGENT_JOB: &str = "agent";
pub const AGENT_OUTPUT_EXPR: &str = "${{ needs.agent.outputs.output }}";
pub const PATCH_ARTIFACT: &str = "aw.patch";
pub const PATCH_PATH: &str = "/tmp/aw.patch";

const ISSUE_OR_PR_NUMBER: [&str; 2] = ["github.event.issue.number", "github.event.pull_request.number"];

fn scoped(scopes: &[(&str, PermissionLevel)]) -> Permissions {
    Permissions::Scoped(
        scopes
            .iter()
            .map(|(scope, level)| (scope.to_string(), *level))
            .collect(),
    )
}

/// Guard for directives acting on the triggering item; wildcard and fixed
/// targets run unconditionally.
fn target_guard(target: &SafeOutputTarget) -> Option<ConditionNode> {
    match target {
        SafeOutputTarget::Triggering => Some(any_property_set(&ISSUE_OR_PR_NUMBER)),
        SafeOutputTarget::Any | SafeOutputTarget::Number(_) => None,
    }
}

/// Pull requests from forks cannot receive pushes from this repository.
fn same_repository_guard() -> ConditionNode {
    or(
        not_equals(property("github.event_name"), string("pull_request")),
        equals(
            property("github.event.pull_request.head.repo.full_name"),
            property("github.repository"),
        ),
    )
}

struct SafeOutputJob {
    id: &'static str,
    action: &'static str,
    permissions: Permissions,
    guard: Option<ConditionNode>,
    env: BTreeMap<String, String>,
    outputs: &'static [&'static str],
    needs_patch: bool,
}

impl SafeOutputJob {
    fn new(id: &'static str, action: &'static str, permissions: Permissions) -> Self {
        Self {
            id,
            action,
            permissions,
            guard: None,
            env: BTreeMap::new(),
            outputs: &[],
            needs_patch: false,
        }
    }

    fn env(mut self, key: &str, value: impl ToString) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    fn env_if(self, key: &str, value: Option<String>) -> Self {
        match value {
            Some(value) => self.env(key, value),
            None => self,
        }
    }

    fn guard(mut self, guard: Option<ConditionNode>) -> Self {
        self.guard = guard;
        self
    }

    fn outputs(mut self, outputs: &'static [&'static str]) -> Self {
        self.outputs = outputs;
        self
    }

    fn into_job(self, config: &CompilerConfig, runs_on: &Value) -> JobSpec {
        let step_id = self.id;
        let mut job = JobSpec::new(self.id, runs_on.clone(), self.permissions)
            .needs(AGENT_JOB)
            .with_condition(self.guard.map(|guard| guard.render()))
            .with_timeout(config.safe_output_timeout_minutes)
            .with_env("GH_AW_AGENT_OUTPUT", AGENT_OUTPUT_EXPR);

        if self.needs_patch {
            job = job
                .step(
                    ExecutionStepSpec::uses("Download patch", "actions/download-artifact@v4")
                        .with_input("name", PATCH_ARTIFACT)
                        .with_input("path", "/tmp/"),
                )
                .step(
                    ExecutionStepSpec::uses("Checkout repository", "actions/checkout@v4")
                        .with_input("fetch-depth", 0u32),
                );
        }

        let step = ExecutionStepSpec::uses(
            format!("Run {}", self.action),
            config.action_ref(self.action),
        )
        .with_id(step_id)
        .with_envs(&self.env);
        job = job.step(step);

        for output in self.outputs {
            job = job.with_output(
                output,
                format!("${{{{ steps.{}.outputs.{} }}}}", step_id, output),
            );
        }
        job
    }
}

fn join(values: &[String]) -> Option<String> {
    (!values.is_empty()).then(|| values.join(","))
}

/// Jobs for every enabled directive, in a fixed order.
pub fn build(safe_outputs: &SafeOutputsConfig, config: &CompilerConfig, runs_on: &Value) -> Vec<JobSpec> {
    use PermissionLevel::{Read, Write};
    let mut jobs = Vec::new();

    if let Some(issue) = &safe_outputs.create_issue {
        jobs.push(
            SafeOutputJob::new("create_issue", "create-issue", scoped(&[("contents", Read), ("issues", Write)]))
                .env_if("GH_AW_ISSUE_TITLE_PREFIX", issue.title_prefix.clone())
                .env_if("GH_AW_ISSUE_LABELS", join(&issue.labels))
                .env("GH_AW_ISSUE_MAX", issue.max)
                .outputs(&["issue_number", "issue_url"]),
        );
    }

    if let Some(update) = &safe_outputs.update_issue {
        jobs.push(
            SafeOutputJob::new("update_issue", "update-issue", scoped(&[("contents", Read), ("issues", Write)]))
                .guard(match update.target {
                    SafeOutputTarget::Triggering => Some(property("github.event.issue.number")),
                    _ => None,
                })
                .env("GH_AW_UPDATE_STATUS", update.status)
                .env("GH_AW_UPDATE_TITLE", update.title)
                .env("GH_AW_UPDATE_BODY", update.body)
                .env("GH_AW_UPDATE_TARGET", update.target.as_env())
                .env("GH_AW_UPDATE_MAX", update.max)
                .outputs(&["issue_number", "issue_url"]),
        );
    }

    if let Some(comment) = &safe_outputs.add_issue_comment {
        jobs.push(
            SafeOutputJob::new(
                "add_issue_comment",
                "add-issue-comment",
                scoped(&[("contents", Read), ("issues", Write), ("pull-requests", Write)]),
            )
            .guard(target_guard(&comment.target))
            .env("GH_AW_COMMENT_TARGET", comment.target.as_env())
            .env("GH_AW_COMMENT_MAX", comment.max)
            .outputs(&["comment_id", "comment_url"]),
        );
    }

    if let Some(pr) = &safe_outputs.create_pull_request {
        let mut job = SafeOutputJob::new(
            "create_pull_request",
            "create-pull-request",
            scoped(&[("contents", Write), ("issues", Write), ("pull-requests", Write)]),
        )
        .guard(Some(same_repository_guard()))
        .env_if("GH_AW_PR_TITLE_PREFIX", pr.title_prefix.clone())
        .env_if("GH_AW_PR_LABELS", join(&pr.labels))
        .env("GH_AW_PR_DRAFT", pr.draft)
        .env("GH_AW_WORKFLOW_ID", "${{ github.workflow }}")
        .env("GH_AW_BASE_BRANCH", "${{ github.ref_name }}")
        .outputs(&["pull_request_number", "pull_request_url", "branch_name"]);
        job.needs_patch = true;
        jobs.push(job);
    }

    if let Some(push) = &safe_outputs.push_to_branch {
        let mut job = SafeOutputJob::new(
            "push_to_branch",
            "push-to-branch",
            scoped(&[("contents", Write), ("pull-requests", Read)]),
        )
        .guard(target_guard(&push.target))
        .env("GH_AW_PUSH_BRANCH", &push.branch)
        .env("GH_AW_PUSH_TARGET", push.target.as_env())
        .outputs(&["branch_name", "commit_sha"]);
        job.needs_patch = true;
        jobs.push(job);
    }

    if let Some(discussion) = &safe_outputs.create_discussion {
        jobs.push(
            SafeOutputJob::new(
                "create_discussion",
                "create-discussion",
                scoped(&[("contents", Read), ("discussions", Write)]),
            )
            .env_if("GH_AW_DISCUSSION_TITLE_PREFIX", discussion.title_prefix.clone())
            .env_if("GH_AW_DISCUSSION_CATEGORY_ID", discussion.category_id.clone())
            .env("GH_AW_DISCUSSION_MAX", discussion.max)
            .outputs(&["discussion_number", "discussion_url"]),
        );
    }

    if let Some(review) = &safe_outputs.create_pr_review_comment {
        jobs.push(
            SafeOutputJob::new(
                "create_pr_review_comment",
                "create-pr-review-comment",
                scoped(&[("contents", Read), ("pull-requests", Write)]),
            )
            .guard(Some(or(
                event_type_equals("pull_request"),
                event_type_equals("pull_request_review_comment"),
            )))
            .env("GH_AW_REVIEW_SIDE", &review.side)
            .env("GH_AW_REVIEW_MAX", review.max)
            .outputs(&["review_comment_id", "review_comment_url"]),
        );
    }

    if let Some(labels) = &safe_outputs.add_issue_label {
        jobs.push(
            SafeOutputJob::new(
                "add_issue_labels",
                "add-issue-labels",
                scoped(&[("contents", Read), ("issues", Write), ("pull-requests", Write)]),
            )
            .guard(Some(any_property_set(&ISSUE_OR_PR_NUMBER)))
            .env_if("GH_AW_LABELS_ALLOWED", join(&labels.allowed))
            .env("GH_AW_LABELS_MAX", labels.max)
            .outputs(&["labels_added"]),
        );
    }

    jobs.into_iter()
        .map(|job| job.into_job(config, runs_on))
        .collect()
}
