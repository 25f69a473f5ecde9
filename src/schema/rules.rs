//! A small structural schema for YAML values.
//!
//! Schemas are plain values built once (see [`frontmatter_schema`]) and walked
//! against a `serde_yaml::Value`, producing one [`Violation`] per problem with
//! the structural path of the offending field.

use super::path::FieldPath;
use serde_yaml::Value;
use std::sync::LazyLock;

/// A violation found by [`check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: FieldPath,
    pub message: String,
}

/// Shape of a YAML value.
#[derive(Debug, Clone)]
pub enum Schema {
    Any,
    Null,
    String,
    Boolean,
    /// Any of string, number or boolean.
    Scalar,
    Integer { min: Option<i64>, max: Option<i64> },
    Enum(&'static [&'static str]),
    Array(Box<Schema>),
    /// Mapping with arbitrary string keys.
    Map(Box<Schema>),
    Object(ObjectSchema),
    /// The value must match one of the named alternatives.
    OneOf(Vec<(&'static str, Schema)>),
}

/// A mapping with known properties.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    pub properties: Vec<(&'static str, Schema)>,
    pub required: &'static [&'static str],
    /// Schema for keys not listed in `properties`; `None` rejects them.
    pub additional: Option<Box<Schema>>,
    /// Exactly one of these keys must be present (ignored when empty).
    pub exactly_one_of: &'static [&'static str],
}

impl ObjectSchema {
    fn property(&self, key: &str) -> Option<&Schema> {
        self.properties
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, schema)| schema)
    }
}

/// Validate `value` against `schema`, appending violations to `out`.
pub fn check(schema: &Schema, value: &Value, path: &FieldPath, out: &mut Vec<Violation>) {
    match schema {
        Schema::Any => {}
        Schema::Null => {
            if !value.is_null() {
                out.push(type_mismatch(path, "null", value));
            }
        }
        Schema::String => {
            if !value.is_string() {
                out.push(type_mismatch(path, "string", value));
            }
        }
        Schema::Boolean => {
            if !value.is_bool() {
                out.push(type_mismatch(path, "boolean", value));
            }
        }
        Schema::Scalar => {
            if !(value.is_string() || value.is_number() || value.is_bool()) {
                out.push(type_mismatch(path, "string, number or boolean", value));
            }
        }
        Schema::Integer { min, max } => check_integer(*min, *max, value, path, out),
        Schema::Enum(allowed) => match value.as_str() {
            Some(text) if allowed.contains(&text) => {}
            Some(text) => out.push(violation(
                path,
                format!("value '{}' must be one of: {}", text, allowed.join(", ")),
            )),
            None => out.push(type_mismatch(path, "string", value)),
        },
        Schema::Array(items) => match value.as_sequence() {
            Some(sequence) => {
                for (i, item) in sequence.iter().enumerate() {
                    check(items, item, &path.index(i), out);
                }
            }
            None => out.push(type_mismatch(path, "list", value)),
        },
        Schema::Map(values) => match value.as_mapping() {
            Some(mapping) => {
                for (key, item) in mapping {
                    let Some(key) = key_text(key) else {
                        out.push(violation(path, "mapping keys must be strings"));
                        continue;
                    };
                    check(values, item, &path.child(key), out);
                }
            }
            None => out.push(type_mismatch(path, "mapping", value)),
        },
        Schema::Object(object) => check_object(object, value, path, out),
        Schema::OneOf(alternatives) => check_one_of(alternatives, value, path, out),
    }
}

fn check_integer(
    min: Option<i64>,
    max: Option<i64>,
    value: &Value,
    path: &FieldPath,
    out: &mut Vec<Violation>,
) {
    let Some(number) = value.as_i64() else {
        out.push(type_mismatch(path, "integer", value));
        return;
    };
    let below = min.is_some_and(|min| number < min);
    let above = max.is_some_and(|max| number > max);
    if !(below || above) {
        return;
    }
    let message = match (min, max) {
        (Some(min), Some(max)) => format!("value {} must be between {} and {}", number, min, max),
        (Some(min), None) => format!("value {} must be at least {}", number, min),
        (None, Some(max)) => format!("value {} must be at most {}", number, max),
        (None, None) => return,
    };
    out.push(violation(path, message));
}

fn check_object(object: &ObjectSchema, value: &Value, path: &FieldPath, out: &mut Vec<Violation>) {
    let Some(mapping) = value.as_mapping() else {
        out.push(type_mismatch(path, "mapping", value));
        return;
    };

    for (key, item) in mapping {
        let Some(key) = key_text(key) else {
            out.push(violation(path, "mapping keys must be strings"));
            continue;
        };
        match object.property(&key) {
            Some(schema) => check(schema, item, &path.child(key.as_str()), out),
            None => match &object.additional {
                Some(schema) => check(schema, item, &path.child(key.as_str()), out),
                None => {
                    let known: Vec<&str> = object.properties.iter().map(|(name, _)| *name).collect();
                    out.push(violation(
                        &path.child(key.as_str()),
                        format!(
                            "unknown property '{}' (expected one of: {})",
                            key,
                            known.join(", ")
                        ),
                    ));
                }
            },
        }
    }

    for required in object.required {
        if !mapping.contains_key(*required) {
            out.push(violation(
                &path.child(*required),
                format!("missing required property '{}'", required),
            ));
        }
    }

    if !object.exactly_one_of.is_empty() {
        let present = object
            .exactly_one_of
            .iter()
            .filter(|key| mapping.contains_key(**key))
            .count();
        if present != 1 {
            let names: Vec<String> = object
                .exactly_one_of
                .iter()
                .map(|key| format!("'{}'", key))
                .collect();
            out.push(violation(
                path,
                format!("must declare exactly one of {}", names.join(" or ")),
            ));
        }
    }
}

fn check_one_of(
    alternatives: &[(&'static str, Schema)],
    value: &Value,
    path: &FieldPath,
    out: &mut Vec<Violation>,
) {
    let mut best: Option<Vec<Violation>> = None;
    for (_, schema) in alternatives {
        let mut found = Vec::new();
        check(schema, value, path, &mut found);
        if found.is_empty() {
            return;
        }
        if best.is_none() && accepts_kind(schema, value) {
            best = Some(found);
        }
    }

    match best {
        Some(found) => out.extend(found),
        None => {
            let names: Vec<&str> = alternatives.iter().map(|(name, _)| *name).collect();
            out.push(violation(
                path,
                format!("expected {}, found {}", names.join(" or "), kind_name(value)),
            ));
        }
    }
}

/// Whether `schema` accepts the top-level kind of `value`, ignoring contents.
fn accepts_kind(schema: &Schema, value: &Value) -> bool {
    match schema {
        Schema::Any => true,
        Schema::Null => value.is_null(),
        Schema::String | Schema::Enum(_) => value.is_string(),
        Schema::Boolean => value.is_bool(),
        Schema::Scalar => value.is_string() || value.is_number() || value.is_bool(),
        Schema::Integer { .. } => value.is_i64() || value.is_u64(),
        Schema::Array(_) => value.is_sequence(),
        Schema::Map(_) | Schema::Object(_) => value.is_mapping(),
        Schema::OneOf(alternatives) => alternatives.iter().any(|(_, s)| accepts_kind(s, value)),
    }
}

fn key_text(key: &Value) -> Option<String> {
    match key {
        Value::String(text) => Some(text.clone()),
        // Non-string scalar keys are matched by their text form.
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Human-readable kind of a YAML value.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn violation(path: &FieldPath, message: impl Into<String>) -> Violation {
    Violation {
        path: path.clone(),
        message: message.into(),
    }
}

fn type_mismatch(path: &FieldPath, expected: &str, value: &Value) -> Violation {
    violation(path, format!("expected {}, found {}", expected, kind_name(value)))
}

// ============================================================================
// Frontmatter schema
// ============================================================================

/// Safe-output directive names accepted under `safe-outputs`.
pub const SAFE_OUTPUT_KEYS: [&str; 8] = [
    "create-issue",
    "update-issue",
    "add-issue-comment",
    "create-pull-request",
    "push-to-branch",
    "create-discussion",
    "create-pull-request-review-comment",
    "add-issue-label",
];

/// Permission scopes accepted in the `permissions` map.
pub const PERMISSION_SCOPES: [&str; 15] = [
    "actions",
    "attestations",
    "checks",
    "contents",
    "deployments",
    "discussions",
    "id-token",
    "issues",
    "models",
    "packages",
    "pages",
    "pull-requests",
    "repository-projects",
    "security-events",
    "statuses",
];

/// Valid `max-turns` range.
pub const MAX_TURNS_RANGE: (i64, i64) = (1, 100);

static FRONTMATTER_SCHEMA: LazyLock<Schema> = LazyLock::new(build_frontmatter_schema);

/// The schema of a workflow frontmatter block.
pub fn frontmatter_schema() -> &'static Schema {
    &FRONTMATTER_SCHEMA
}

fn object(properties: Vec<(&'static str, Schema)>) -> Schema {
    Schema::Object(ObjectSchema {
        properties,
        ..ObjectSchema::default()
    })
}

fn object_with_required(
    properties: Vec<(&'static str, Schema)>,
    required: &'static [&'static str],
) -> Schema {
    Schema::Object(ObjectSchema {
        properties,
        required,
        ..ObjectSchema::default()
    })
}

fn array(items: Schema) -> Schema {
    Schema::Array(Box::new(items))
}

fn map(values: Schema) -> Schema {
    Schema::Map(Box::new(values))
}

fn string_list() -> Schema {
    array(Schema::String)
}

fn string_or_list() -> Schema {
    Schema::OneOf(vec![("string", Schema::String), ("list of strings", string_list())])
}

fn at_least_one() -> Schema {
    Schema::Integer {
        min: Some(1),
        max: None,
    }
}

fn max_turns() -> Schema {
    Schema::Integer {
        min: Some(MAX_TURNS_RANGE.0),
        max: Some(MAX_TURNS_RANGE.1),
    }
}

/// `null` enables a directive with defaults; a mapping configures it.
fn toggle(properties: Vec<(&'static str, Schema)>) -> Schema {
    Schema::OneOf(vec![("null", Schema::Null), ("mapping", object(properties))])
}

fn step() -> Schema {
    Schema::Object(ObjectSchema {
        properties: vec![
            ("name", Schema::String),
            ("id", Schema::String),
            ("if", Schema::String),
            ("uses", Schema::String),
            ("run", Schema::String),
            ("with", map(Schema::Any)),
            ("env", map(Schema::Scalar)),
            ("shell", Schema::String),
            ("working-directory", Schema::String),
            ("continue-on-error", Schema::Boolean),
            ("timeout-minutes", at_least_one()),
        ],
        exactly_one_of: &["uses", "run"],
        ..ObjectSchema::default()
    })
}

fn network() -> Schema {
    Schema::OneOf(vec![
        ("'defaults'", Schema::Enum(&["defaults"])),
        ("network mapping", object(vec![("allowed", string_list())])),
    ])
}

fn command_trigger() -> Schema {
    Schema::OneOf(vec![
        ("command name", Schema::String),
        ("command mapping", object(vec![("name", Schema::String)])),
    ])
}

fn triggers() -> Schema {
    Schema::OneOf(vec![
        ("trigger name", Schema::String),
        ("list of trigger names", string_list()),
        (
            "trigger mapping",
            Schema::Object(ObjectSchema {
                properties: vec![
                    ("command", command_trigger()),
                    ("alias", command_trigger()),
                    ("stop-after", Schema::String),
                ],
                additional: Some(Box::new(Schema::Any)),
                ..ObjectSchema::default()
            }),
        ),
    ])
}

fn permissions() -> Schema {
    let scope = Schema::Enum(&["read", "write", "none"]);
    Schema::OneOf(vec![
        ("'read-all' or 'write-all'", Schema::Enum(&["read-all", "write-all"])),
        (
            "permission mapping",
            object(PERMISSION_SCOPES.iter().map(|name| (*name, scope.clone())).collect()),
        ),
    ])
}

fn engine() -> Schema {
    Schema::OneOf(vec![
        ("engine id", Schema::String),
        (
            "engine mapping",
            object_with_required(
                vec![
                    ("id", Schema::String),
                    ("version", Schema::String),
                    ("model", Schema::String),
                    ("max-turns", max_turns()),
                    ("env", map(Schema::Scalar)),
                    ("steps", array(step())),
                    ("network", network()),
                ],
                &["id"],
            ),
        ),
    ])
}

fn mcp_server() -> Schema {
    object(vec![
        ("type", Schema::Enum(&["stdio", "http"])),
        ("command", Schema::String),
        ("args", string_list()),
        ("env", map(Schema::Scalar)),
        ("url", Schema::String),
        ("headers", map(Schema::String)),
        ("container", Schema::String),
        ("network", object(vec![("allowed", string_list())])),
    ])
}

fn tools() -> Schema {
    let empty = || Schema::OneOf(vec![("null", Schema::Null), ("mapping", object(Vec::new()))]);
    Schema::Object(ObjectSchema {
        properties: vec![
            (
                "github",
                toggle(vec![
                    ("allowed", string_list()),
                    ("docker_image_version", Schema::String),
                ]),
            ),
            ("edit", empty()),
            ("web-fetch", empty()),
            ("web-search", empty()),
            (
                "bash",
                Schema::OneOf(vec![("null", Schema::Null), ("list of commands", string_list())]),
            ),
        ],
        additional: Some(Box::new(object_with_required(
            vec![("mcp", mcp_server()), ("allowed", string_list())],
            &["mcp"],
        ))),
        ..ObjectSchema::default()
    })
}

fn safe_outputs() -> Schema {
    let target = || {
        Schema::OneOf(vec![
            ("'triggering', '*' or issue number string", Schema::String),
            ("issue number", at_least_one()),
        ])
    };
    let flag = || Schema::OneOf(vec![("null", Schema::Null), ("boolean", Schema::Boolean)]);
    object(vec![
        (
            "create-issue",
            toggle(vec![
                ("title-prefix", Schema::String),
                ("labels", string_list()),
                ("max", at_least_one()),
            ]),
        ),
        (
            "update-issue",
            toggle(vec![
                ("status", flag()),
                ("title", flag()),
                ("body", flag()),
                ("target", target()),
                ("max", at_least_one()),
            ]),
        ),
        (
            "add-issue-comment",
            toggle(vec![("target", target()), ("max", at_least_one())]),
        ),
        (
            "create-pull-request",
            toggle(vec![
                ("title-prefix", Schema::String),
                ("labels", string_list()),
                ("draft", Schema::Boolean),
            ]),
        ),
        (
            "push-to-branch",
            Schema::OneOf(vec![(
                "mapping",
                object_with_required(
                    vec![("branch", Schema::String), ("target", target())],
                    &["branch"],
                ),
            )]),
        ),
        (
            "create-discussion",
            toggle(vec![
                ("title-prefix", Schema::String),
                ("category-id", Schema::String),
                ("max", at_least_one()),
            ]),
        ),
        (
            "create-pull-request-review-comment",
            toggle(vec![
                ("side", Schema::Enum(&["LEFT", "RIGHT"])),
                ("max", at_least_one()),
            ]),
        ),
        (
            "add-issue-label",
            toggle(vec![("allowed", string_list()), ("max", at_least_one())]),
        ),
    ])
}

fn cache() -> Schema {
    let entry = object_with_required(
        vec![
            ("key", Schema::String),
            ("path", string_or_list()),
            ("restore-keys", string_or_list()),
            ("upload-chunk-size", at_least_one()),
            ("fail-on-cache-miss", Schema::Boolean),
            ("lookup-only", Schema::Boolean),
        ],
        &["key", "path"],
    );
    Schema::OneOf(vec![
        ("cache mapping", entry.clone()),
        ("list of cache mappings", array(entry)),
    ])
}

fn build_frontmatter_schema() -> Schema {
    let timeout = Schema::Integer {
        min: Some(1),
        max: Some(360),
    };
    object_with_required(
        vec![
            ("name", Schema::String),
            ("on", triggers()),
            ("permissions", permissions()),
            ("run-name", Schema::String),
            (
                "runs-on",
                Schema::OneOf(vec![
                    ("runner label", Schema::String),
                    ("list of runner labels", string_list()),
                    ("runner mapping", map(Schema::Any)),
                ]),
            ),
            ("timeout_minutes", timeout.clone()),
            ("timeout-minutes", timeout),
            (
                "concurrency",
                Schema::OneOf(vec![
                    ("group name", Schema::String),
                    (
                        "concurrency mapping",
                        object_with_required(
                            vec![
                                ("group", Schema::String),
                                ("cancel-in-progress", Schema::Boolean),
                            ],
                            &["group"],
                        ),
                    ),
                ]),
            ),
            ("env", map(Schema::Scalar)),
            ("if", Schema::String),
            ("steps", array(step())),
            ("engine", engine()),
            ("tools", tools()),
            ("safe-outputs", safe_outputs()),
            ("network", network()),
            ("cache", cache()),
            ("max-turns", max_turns()),
            ("allow-domains", string_list()),
        ],
        &["on"],
    )
}
