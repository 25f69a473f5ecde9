//! Guard conditions of generated jobs.

use super::triggers::{COMMAND_EVENTS, non_command_events};
use crate::expr::ConditionNode;
use crate::expr::builders::{
    and_all, any_of, any_of_multiline, event_type_equals, expression, mention_in_any, not,
};
use crate::frontmatter::{ParsedConfiguration, TriggerSpec};

/// Strip a surrounding `${{ ... }}` from an author-written condition.
pub fn unwrap_expression(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("${{")
        .and_then(|rest| rest.strip_suffix("}}"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Gate for command triggers.
///
/// With only command events, the mention must appear. When other events are
/// declared too, those pass unconditionally and only command events are
/// checked for the mention.
pub fn command_gate(triggers: &TriggerSpec) -> Option<ConditionNode> {
    let command = triggers.command.as_ref()?;
    let mention = mention_in_any(&command.mention());

    if non_command_events(triggers).is_empty() {
        return Some(mention);
    }

    let command_event = any_of(
        COMMAND_EVENTS
            .iter()
            .map(|(event, _)| event_type_equals(event))
            .collect(),
    );
    Some(any_of_multiline(vec![not(command_event), mention]))
}

/// Guard of the activation job: the author's `if` and the command gate.
pub fn activation_guard(config: &ParsedConfiguration) -> Option<ConditionNode> {
    let explicit = config
        .condition
        .as_deref()
        .map(|condition| expression(unwrap_expression(condition)));
    and_all(explicit.into_iter().chain(command_gate(&config.triggers)))
}
