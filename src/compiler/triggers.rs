//! Trigger classification and the generated `on:` block.

use crate::frontmatter::TriggerSpec;
use serde_yaml::{Mapping, Value};

/// Events a command trigger listens to, with the activity types it needs.
pub const COMMAND_EVENTS: [(&str, &[&str]); 4] = [
    ("issues", &["opened", "edited", "reopened"]),
    ("issue_comment", &["created", "edited"]),
    ("pull_request", &["opened", "edited", "reopened"]),
    ("pull_request_review_comment", &["created", "edited"]),
];

const PULL_REQUEST_EVENTS: [&str; 4] = [
    "pull_request",
    "pull_request_target",
    "pull_request_review",
    "pull_request_review_comment",
];
const ISSUE_EVENTS: [&str; 2] = ["issues", "issue_comment"];
const DISCUSSION_EVENTS: [&str; 2] = ["discussion", "discussion_comment"];

/// Which kinds of events start the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerCategories {
    pub pull_request: bool,
    pub issue: bool,
    pub discussion: bool,
    pub command: bool,
    /// Every declared event is pull-request-like and there is no command.
    pub pull_request_only: bool,
}

impl TriggerCategories {
    pub fn classify(triggers: &TriggerSpec) -> Self {
        let events = triggers.event_names();
        let any = |set: &[&str]| events.iter().any(|event| set.contains(&event.as_str()));
        let command = triggers.command.is_some();

        Self {
            // A command listens to issue and pull request events.
            pull_request: command || any(&PULL_REQUEST_EVENTS),
            issue: command || any(&ISSUE_EVENTS),
            discussion: any(&DISCUSSION_EVENTS),
            command,
            pull_request_only: !command
                && !events.is_empty()
                && events
                    .iter()
                    .all(|event| PULL_REQUEST_EVENTS.contains(&event.as_str())),
        }
    }
}

/// Declared events that a command trigger does not claim.
pub fn non_command_events(triggers: &TriggerSpec) -> Vec<String> {
    triggers
        .event_names()
        .into_iter()
        .filter(|event| !COMMAND_EVENTS.iter().any(|(name, _)| *name == event.as_str()))
        .collect()
}

/// The `on:` mapping of the generated pipeline.
///
/// Declared events keep their order and configuration. A command trigger
/// adds the events it listens to that were not declared.
pub fn render_on(triggers: &TriggerSpec) -> Mapping {
    let mut on = triggers.events.clone();
    if triggers.command.is_some() {
        for (event, types) in COMMAND_EVENTS {
            if on.contains_key(event) {
                continue;
            }
            let mut config = Mapping::new();
            config.insert(
                Value::from("types"),
                Value::Sequence(types.iter().map(|t| Value::from(*t)).collect()),
            );
            on.insert(Value::from(event), Value::Mapping(config));
        }
    }
    on
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(events: &[&str]) -> TriggerSpec {
        TriggerSpec {
            events: events
                .iter()
                .map(|event| (Value::from(*event), Value::Null))
                .collect(),
            ..TriggerSpec::default()
        }
    }

    #[test]
    fn discussion_events_form_their_own_category() {
        let categories = TriggerCategories::classify(&spec(&["discussion", "discussion_comment"]));
        assert!(categories.discussion);
        assert!(!categories.issue);
        assert!(!categories.pull_request);
        assert!(!categories.pull_request_only);
    }

    #[test]
    fn mixed_events_set_every_matching_category() {
        let categories =
            TriggerCategories::classify(&spec(&["discussion", "issues", "pull_request"]));
        assert!(categories.discussion);
        assert!(categories.issue);
        assert!(categories.pull_request);
        assert!(!categories.pull_request_only);
    }
}
