//! Typed workflow configuration.
//!
//! [`parse_configuration`] turns a schema-valid frontmatter value into an
//! immutable [`ParsedConfiguration`]. Cross-field rules the schema cannot
//! express (conflicting settings, transport requirements, timestamps) are
//! reported as [`SemanticIssue`]s, all of them at once.

mod engine_config;
mod raw;
mod safe_outputs;
mod tools;
mod triggers;


pub use engine_config::{EngineConfig, NetworkPolicy};
pub use raw::scalar_text;
pub use safe_outputs::{
    AddIssueCommentConfig, AddIssueLabelConfig, CreateDiscussionConfig, CreateIssueConfig,
    CreatePullRequestConfig, PushToBranchConfig, ReviewCommentConfig, SafeOutputTarget,
    SafeOutputsConfig, UpdateIssueConfig,
};
pub use tools::{
    BashGrant, DEFAULT_GITHUB_TOOLS, GIT_COMMANDS, GitHubTool, McpServer, McpTransport, ToolGrants,
};
pub use triggers::{CommandTrigger, TriggerSpec, parse_stop_time};

use crate::document::IncludedFrontmatter;
use crate::engine::EngineRegistry;
use crate::schema::FieldPath;
use raw::{RawCache, RawConcurrency, RawFrontmatter, RawInclude, RawPermissions, StringOrList};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// A problem found while normalizing a schema-valid configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticIssue {
    /// Field the problem is reported against; the root path means the whole block.
    pub path: FieldPath,
    pub message: String,
    pub hint: Option<String>,
}

impl SemanticIssue {
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Access level of one permission scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Read,
    Write,
    None,
}

/// Token permissions of the generated main job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Permissions {
    #[default]
    ReadAll,
    WriteAll,
    Scoped(BTreeMap<String, PermissionLevel>),
}

impl Serialize for Permissions {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Permissions::ReadAll => serializer.serialize_str("read-all"),
            Permissions::WriteAll => serializer.serialize_str("write-all"),
            Permissions::Scoped(scopes) => scopes.serialize(serializer),
        }
    }
}

/// Author-supplied concurrency settings that replace the derived ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyOverride {
    pub group: String,
    pub cancel_in_progress: Option<bool>,
}

/// One `actions/cache` restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub paths: Vec<String>,
    pub restore_keys: Vec<String>,
    pub upload_chunk_size: Option<u64>,
    pub fail_on_cache_miss: Option<bool>,
    pub lookup_only: Option<bool>,
}

/// Immutable result of parsing a workflow's frontmatter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConfiguration {
    pub name: Option<String>,
    pub triggers: TriggerSpec,
    pub permissions: Permissions,
    pub run_name: Option<String>,
    pub runs_on: Option<Value>,
    pub timeout_minutes: Option<u32>,
    pub concurrency: Option<ConcurrencyOverride>,
    pub env: BTreeMap<String, String>,
    /// Explicit `if` guard.
    pub condition: Option<String>,
    pub steps: Vec<Mapping>,
    pub engine: EngineConfig,
    /// Whether the engine came from the document (or an include) rather
    /// than from defaults.
    pub engine_explicit: bool,
    pub network: Option<NetworkPolicy>,
    pub tools: ToolGrants,
    pub safe_outputs: SafeOutputsConfig,
    pub cache: Vec<CacheEntry>,
    pub allow_domains: Vec<String>,
}

/// Inputs to [`parse_configuration`] that do not come from the frontmatter.
#[derive(Clone, Copy)]
pub struct ParseContext<'a> {
    /// Engines that ids and their aliases resolve against.
    pub registry: &'a EngineRegistry,
    /// File stem; the default command name.
    pub workflow_id: &'a str,
    /// Engine used when neither the document nor an include names one.
    pub default_engine: &'a str,
    /// Engine forced by the caller, replacing the declared id.
    pub engine_override: Option<&'a str>,
    pub includes: &'a [IncludedFrontmatter],
}

/// Normalize a schema-valid frontmatter value.
pub fn parse_configuration(
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<ParsedConfiguration, Vec<SemanticIssue>> {
    let root = FieldPath::root();
    let raw: RawFrontmatter = match serde_yaml::from_value(value.clone()) {
        Ok(raw) => raw,
        Err(e) => return Err(vec![SemanticIssue::new(root, e.to_string())]),
    };

    let mut issues = Vec::new();
    let triggers = triggers::parse_triggers(raw.on.as_ref(), ctx.workflow_id, &mut issues);
    let permissions = permissions(raw.permissions.as_ref(), &mut issues);

    let selection = engine_config::select_engine(
        raw.engine.as_ref(),
        raw.max_turns,
        raw.network.as_ref(),
        ctx.default_engine,
        &mut issues,
    );
    let mut engine = selection.config;
    let mut engine_explicit = selection.explicit;
    let mut network = selection.network;
    let mut tools = tools::parse_tools(raw.tools.as_ref(), &root.child("tools"), &mut issues);

    for include in ctx.includes {
        let included: RawInclude = match serde_yaml::from_value(Value::Mapping(include.value.clone())) {
            Ok(included) => included,
            Err(e) => {
                issues.push(SemanticIssue::new(
                    root.clone(),
                    format!("in included file '{}': {}", include.path.display(), e),
                ));
                continue;
            }
        };

        if let Some(included_engine) = &included.engine {
            let id = included_engine.id().trim();
            if !engine_explicit {
                let adopted = engine_config::select_engine(
                    Some(included_engine),
                    None,
                    None,
                    ctx.default_engine,
                    &mut issues,
                );
                engine = adopted.config;
                network = network.or(adopted.network);
                engine_explicit = true;
            } else if !same_engine(ctx.registry, &engine.id, id) {
                issues.push(
                    SemanticIssue::new(
                        root.child("engine"),
                        format!(
                            "engine conflict: '{}' is declared here but included file '{}' declares '{}'",
                            engine.id,
                            include.path.display(),
                            id
                        ),
                    )
                    .with_hint("remove the engine from one of the files or make them agree"),
                );
            }
        }

        if let Some(mapping) = &included.tools {
            let included_tools = tools::parse_tools(Some(mapping), &FieldPath::root().child("tools"), &mut issues);
            tools = tools.merged_with(&included_tools);
        }
    }

    if let Some(id) = ctx.engine_override {
        engine.id = id.to_string();
        engine_explicit = true;
    }

    let safe_outputs = safe_outputs::parse_safe_outputs(
        raw.safe_outputs.as_ref(),
        &root.child("safe-outputs"),
        &mut issues,
    );

    if !issues.is_empty() {
        return Err(issues);
    }

    Ok(ParsedConfiguration {
        name: raw.name,
        triggers,
        permissions,
        run_name: raw.run_name,
        runs_on: raw.runs_on,
        timeout_minutes: raw.timeout_minutes,
        concurrency: raw.concurrency.map(|c| match c {
            RawConcurrency::Group(group) => ConcurrencyOverride {
                group,
                cancel_in_progress: None,
            },
            RawConcurrency::Full {
                group,
                cancel_in_progress,
            } => ConcurrencyOverride {
                group,
                cancel_in_progress,
            },
        }),
        env: raw::env_text(raw.env),
        condition: raw.condition.filter(|c| !c.trim().is_empty()),
        steps: raw.steps.unwrap_or_default(),
        engine,
        engine_explicit,
        network,
        tools,
        safe_outputs,
        cache: cache_entries(raw.cache),
        allow_domains: raw.allow_domains.unwrap_or_default(),
    })
}

/// Whether two engine ids name the same registered engine. Ids the registry
/// does not know only match themselves.
fn same_engine(registry: &EngineRegistry, left: &str, right: &str) -> bool {
    match (registry.resolve(left), registry.resolve(right)) {
        (Ok(left), Ok(right)) => left.id() == right.id(),
        _ => left == right,
    }
}

fn permissions(raw: Option<&RawPermissions>, issues: &mut Vec<SemanticIssue>) -> Permissions {
    let path = FieldPath::root().child("permissions");
    match raw {
        None => Permissions::default(),
        Some(RawPermissions::Shorthand(text)) => match text.as_str() {
            "read-all" => Permissions::ReadAll,
            "write-all" => Permissions::WriteAll,
            other => {
                issues.push(SemanticIssue::new(
                    path,
                    format!("unknown permission shorthand '{}'", other),
                ));
                Permissions::default()
            }
        },
        Some(RawPermissions::Scoped(scopes)) => {
            let mut levels = BTreeMap::new();
            for (scope, level) in scopes {
                let level = match level.as_str() {
                    "read" => PermissionLevel::Read,
                    "write" => PermissionLevel::Write,
                    "none" => PermissionLevel::None,
                    other => {
                        issues.push(SemanticIssue::new(
                            path.child(scope.as_str()),
                            format!("unknown permission level '{}'", other),
                        ));
                        continue;
                    }
                };
                levels.insert(scope.clone(), level);
            }
            Permissions::Scoped(levels)
        }
    }
}

fn cache_entries(raw: Option<RawCache>) -> Vec<CacheEntry> {
    let entries = match raw {
        None => Vec::new(),
        Some(RawCache::One(entry)) => vec![entry],
        Some(RawCache::Many(entries)) => entries,
    };
    entries
        .into_iter()
        .map(|entry| CacheEntry {
            key: entry.key,
            paths: entry.path.into_vec(),
            restore_keys: entry
                .restore_keys
                .map(StringOrList::into_vec)
                .unwrap_or_default(),
            upload_chunk_size: entry.upload_chunk_size,
            fail_on_cache_miss: entry.fail_on_cache_miss,
            lookup_only: entry.lookup_only,
        })
        .collect()
}
