//! Trigger (`on`) normalization.

use super::SemanticIssue;
use crate::schema::FieldPath;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_yaml::{Mapping, Value};

/// Keys under `on` that configure the compiler rather than name an event.
const CONTROL_KEYS: [&str; 3] = ["command", "alias", "stop-after"];

/// Normalized trigger configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriggerSpec {
    /// Event triggers in declaration order, mapped to their configuration
    /// (`null` when the event takes no options).
    pub events: Mapping,
    pub command: Option<CommandTrigger>,
    pub stop_after: Option<DateTime<Utc>>,
}

/// A mention-style trigger: the workflow runs when a comment or body
/// contains the mention token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTrigger {
    pub name: String,
    /// Declared with the legacy `alias` key, which mentions as `@name`.
    pub legacy_alias: bool,
}

impl CommandTrigger {
    /// The token that must appear in the event text (`/name` or `@name`).
    pub fn mention(&self) -> String {
        if self.legacy_alias {
            format!("@{}", self.name)
        } else {
            format!("/{}", self.name)
        }
    }
}

impl TriggerSpec {
    pub fn has_event(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    /// Event names in declaration order.
    pub fn event_names(&self) -> Vec<String> {
        self.events
            .keys()
            .filter_map(|key| key.as_str().map(str::to_string))
            .collect()
    }
}

pub(super) fn parse_triggers(
    value: Option<&Value>,
    workflow_id: &str,
    issues: &mut Vec<SemanticIssue>,
) -> TriggerSpec {
    let path = FieldPath::root().child("on");
    let mut spec = TriggerSpec::default();

    match value {
        None => {}
        Some(Value::String(event)) => {
            spec.events.insert(Value::String(event.clone()), Value::Null);
        }
        Some(Value::Sequence(events)) => {
            for event in events.iter().filter_map(Value::as_str) {
                spec.events.insert(Value::String(event.to_string()), Value::Null);
            }
        }
        Some(Value::Mapping(mapping)) => {
            for (key, config) in mapping {
                let Some(name) = key.as_str() else { continue };
                if !CONTROL_KEYS.contains(&name) {
                    spec.events.insert(key.clone(), config.clone());
                }
            }

            let command = mapping.get("command");
            let alias = mapping.get("alias");
            if command.is_some() && alias.is_some() {
                issues.push(SemanticIssue::new(
                    path.child("alias"),
                    "'alias' and 'command' cannot both be declared",
                )
                .with_hint("'alias' is the legacy spelling of 'command'; keep one"));
            }
            if let Some(config) = command {
                spec.command = Some(command_trigger(config, workflow_id, false));
            } else if let Some(config) = alias {
                spec.command = Some(command_trigger(config, workflow_id, true));
            }

            if let Some(raw) = mapping.get("stop-after").and_then(Value::as_str) {
                match parse_stop_time(raw) {
                    Some(time) => spec.stop_after = Some(time),
                    None => issues.push(
                        SemanticIssue::new(
                            path.child("stop-after"),
                            format!("'{}' is not an absolute timestamp", raw),
                        )
                        .with_hint("use a timestamp such as '2026-12-31 23:59:59'"),
                    ),
                }
            }
        }
        Some(_) => {}
    }

    if spec.events.is_empty() && spec.command.is_none() {
        issues.push(
            SemanticIssue::new(path, "at least one trigger must be declared")
                .with_hint("e.g. 'on: issues' or 'on: { command: { name: bot } }'"),
        );
    }
    spec
}

fn command_trigger(config: &Value, workflow_id: &str, legacy_alias: bool) -> CommandTrigger {
    let name = match config {
        Value::String(name) => Some(name.clone()),
        Value::Mapping(mapping) => mapping.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    };
    CommandTrigger {
        name: name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| workflow_id.to_string()),
        legacy_alias,
    }
}

/// Parse an absolute stop time. Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, and
/// a bare date (midnight UTC).
pub fn parse_stop_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(time) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(time.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
}
