//! Serde shapes of the frontmatter as written.
//!
//! These mirror the external YAML forms one to one, including the unions
//! (string or mapping, single entry or list). Normalization into the types
//! the compiler consumes happens in the sibling modules.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawFrontmatter {
    pub name: Option<String>,
    pub on: Option<Value>,
    pub permissions: Option<RawPermissions>,
    pub run_name: Option<String>,
    pub runs_on: Option<Value>,
    #[serde(alias = "timeout_minutes")]
    pub timeout_minutes: Option<u32>,
    pub concurrency: Option<RawConcurrency>,
    pub env: Option<BTreeMap<String, Value>>,
    #[serde(rename = "if")]
    pub condition: Option<String>,
    pub steps: Option<Vec<Mapping>>,
    pub engine: Option<RawEngine>,
    pub tools: Option<Mapping>,
    pub safe_outputs: Option<Mapping>,
    pub network: Option<RawNetwork>,
    pub cache: Option<RawCache>,
    pub max_turns: Option<u32>,
    pub allow_domains: Option<Vec<String>>,
}

/// Frontmatter of an included file.
#[derive(Debug, Default, Deserialize)]
pub struct RawInclude {
    pub engine: Option<RawEngine>,
    pub tools: Option<Mapping>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPermissions {
    Shorthand(String),
    Scoped(BTreeMap<String, String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawConcurrency {
    Group(String),
    Full {
        group: String,
        #[serde(rename = "cancel-in-progress")]
        cancel_in_progress: Option<bool>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawEngine {
    Id(String),
    Full(RawEngineObject),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawEngineObject {
    pub id: String,
    pub version: Option<String>,
    pub model: Option<String>,
    pub max_turns: Option<u32>,
    pub env: Option<BTreeMap<String, Value>>,
    pub steps: Option<Vec<Mapping>>,
    pub network: Option<RawNetwork>,
}

impl RawEngine {
    pub fn id(&self) -> &str {
        match self {
            RawEngine::Id(id) => id,
            RawEngine::Full(object) => &object.id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawNetwork {
    Keyword(String),
    Allowed { allowed: Vec<String> },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::One(value) => vec![value],
            StringOrList::Many(values) => values,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawCacheEntry {
    pub key: String,
    pub path: StringOrList,
    pub restore_keys: Option<StringOrList>,
    pub upload_chunk_size: Option<u64>,
    pub fail_on_cache_miss: Option<bool>,
    pub lookup_only: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCache {
    One(RawCacheEntry),
    Many(Vec<RawCacheEntry>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawGitHubTool {
    pub allowed: Option<Vec<String>>,
    #[serde(rename = "docker_image_version")]
    pub docker_image_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCustomTool {
    pub mcp: RawMcp,
    #[serde(default)]
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMcp {
    #[serde(rename = "type")]
    pub transport: Option<String>,
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, Value>,
    pub url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub container: Option<String>,
    pub network: Option<RawMcpNetwork>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMcpNetwork {
    #[serde(default)]
    pub allowed: Vec<String>,
}

/// Render a YAML scalar as environment-variable text.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Convert an env map of scalars into strings.
pub fn env_text(env: Option<BTreeMap<String, Value>>) -> BTreeMap<String, String> {
    env.unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, scalar_text(&value)))
        .collect()
}
