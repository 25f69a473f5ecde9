//! The prompt handed to the engine.

use super::proxy::heredoc;
use crate::engine::{ExecutionStepSpec, PROMPT_PATH};
use crate::frontmatter::{SafeOutputTarget, SafeOutputsConfig};
use regex::Regex;
use std::sync::LazyLock;

/// Expression the prompt body uses to reference the activation job's text.
pub const ACTIVATION_TEXT_OUTPUT: &str = "needs.activation.outputs.text";

/// Environment variable carrying the activation text into the prompt step.
pub const ACTIVATION_TEXT_ENV: &str = "GH_AW_ACTIVATION_TEXT";

const ACTIVATION_TEXT_PLACEHOLDER: &str = "__GH_AW_ACTIVATION_TEXT__";

static ACTIVATION_TEXT_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\{\s*needs\.activation\.outputs\.text\s*\}\}")
        .expect("Invalid activation text regex")
});

/// Whether the body refers to the sanitized triggering text.
pub fn uses_activation_text(body: &str) -> bool {
    body.contains(ACTIVATION_TEXT_OUTPUT)
}

/// Prompt text: the body followed by instructions for each enabled safe output.
pub fn build_prompt(body: &str, safe_outputs: &SafeOutputsConfig) -> String {
    let mut prompt = body.trim().to_string();
    prompt.push('\n');

    let instructions = safe_output_instructions(safe_outputs);
    if !instructions.is_empty() {
        prompt.push_str("\n---\n\n## Reporting Results\n\n");
        prompt.push_str(
            "You cannot change GitHub directly. To request an action, append one JSON \
             object per line to the file named by the `GH_AW_SAFE_OUTPUTS` environment \
             variable. Available actions:\n\n",
        );
        for line in instructions {
            prompt.push_str("- ");
            prompt.push_str(&line);
            prompt.push('\n');
        }
    }
    prompt
}

fn target_text(target: &SafeOutputTarget) -> String {
    match target {
        SafeOutputTarget::Triggering => "the triggering issue or pull request".to_string(),
        SafeOutputTarget::Any => "any issue (set `issue_number`)".to_string(),
        SafeOutputTarget::Number(number) => format!("issue #{}", number),
    }
}

fn safe_output_instructions(config: &SafeOutputsConfig) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(issue) = &config.create_issue {
        lines.push(format!(
            "Create an issue (at most {}): `{{\"type\": \"create-issue\", \"title\": \"...\", \"body\": \"...\"}}`",
            issue.max
        ));
    }
    if let Some(update) = &config.update_issue {
        let mut fields = Vec::new();
        if update.status {
            fields.push("\"status\": \"open|closed\"");
        }
        if update.title {
            fields.push("\"title\": \"...\"");
        }
        if update.body {
            fields.push("\"body\": \"...\"");
        }
        lines.push(format!(
            "Update {} (at most {}): `{{\"type\": \"update-issue\", {}}}`",
            target_text(&update.target),
            update.max,
            fields.join(", ")
        ));
    }
    if let Some(comment) = &config.add_issue_comment {
        lines.push(format!(
            "Comment on {} (at most {}): `{{\"type\": \"add-issue-comment\", \"body\": \"...\"}}`",
            target_text(&comment.target),
            comment.max
        ));
    }
    if config.create_pull_request.is_some() {
        lines.push(
            "Open a pull request with your file changes: \
             `{\"type\": \"create-pull-request\", \"title\": \"...\", \"body\": \"...\"}`. \
             Commit nothing yourself; edited files are collected as a patch."
                .to_string(),
        );
    }
    if let Some(push) = &config.push_to_branch {
        lines.push(format!(
            "Push your file changes to branch `{}`: `{{\"type\": \"push-to-branch\", \"message\": \"...\"}}`",
            push.branch
        ));
    }
    if let Some(discussion) = &config.create_discussion {
        lines.push(format!(
            "Start a discussion (at most {}): `{{\"type\": \"create-discussion\", \"title\": \"...\", \"body\": \"...\"}}`",
            discussion.max
        ));
    }
    if let Some(review) = &config.create_pr_review_comment {
        lines.push(format!(
            "Comment on pull request lines (at most {}): \
             `{{\"type\": \"create-pull-request-review-comment\", \"path\": \"...\", \"line\": 1, \"body\": \"...\"}}`",
            review.max
        ));
    }
    if let Some(labels) = &config.add_issue_label {
        let allowed = if labels.allowed.is_empty() {
            "any label".to_string()
        } else {
            labels.allowed.join(", ")
        };
        lines.push(format!(
            "Add labels ({}; at most {}): `{{\"type\": \"add-issue-label\", \"labels\": [\"...\"]}}`",
            allowed, labels.max
        ));
    }
    lines
}

/// Step writing the prompt file and echoing it to the job summary.
///
/// The activation text never appears in the script itself: it arrives through
/// an environment variable and replaces a placeholder after the file is written.
pub fn prompt_step(prompt: &str) -> ExecutionStepSpec {
    let dir = PROMPT_PATH.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("/tmp");
    let mut script = format!("mkdir -p {}\n", dir);

    let uses_text = ACTIVATION_TEXT_EXPR.is_match(prompt);
    let template = ACTIVATION_TEXT_EXPR.replace_all(prompt, ACTIVATION_TEXT_PLACEHOLDER);
    script.push_str(&heredoc(PROMPT_PATH, &template));
    if uses_text {
        script.push_str(&format!(
            "prompt=\"$(cat {path})\"\n\
             printf '%s\\n' \"${{prompt//{placeholder}/\"${env}\"}}\" > {path}\n",
            path = PROMPT_PATH,
            placeholder = ACTIVATION_TEXT_PLACEHOLDER,
            env = ACTIVATION_TEXT_ENV,
        ));
    }
    script.push_str(&format!(
        "{{\n  echo \"## Prompt\"\n  echo\n  cat {}\n}} >> \"$GITHUB_STEP_SUMMARY\"\n",
        PROMPT_PATH
    ));

    let step = ExecutionStepSpec::run("Create prompt", script);
    if uses_text {
        step.with_env(ACTIVATION_TEXT_ENV, format!("${{{{ {} }}}}", ACTIVATION_TEXT_OUTPUT))
    } else {
        step
    }
}
