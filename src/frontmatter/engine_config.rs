//! Engine selection and the two external shapes of turn limits and network
//! policy.
//!
//! `max-turns` and `network` may be written at the top level or under an
//! engine mapping. Both shapes are folded into one canonical place:
//! [`EngineConfig::max_turns`] and the configuration-level [`NetworkPolicy`].
//! Declaring a setting in both places with different values is an error.

use super::SemanticIssue;
use super::raw::{RawEngine, RawNetwork, env_text};
use crate::schema::FieldPath;
use serde_yaml::Mapping;
use std::collections::BTreeMap;

/// Normalized engine selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub id: String,
    pub version: Option<String>,
    pub model: Option<String>,
    pub max_turns: Option<u32>,
    pub env: BTreeMap<String, String>,
    /// Extra steps run after the engine's own installation steps.
    pub steps: Vec<Mapping>,
}

impl EngineConfig {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Egress policy for the engine and network-restricted tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkPolicy {
    /// The platform's default allow-list.
    Defaults,
    /// Only the listed domains.
    Allowed(Vec<String>),
}

impl NetworkPolicy {
    /// Explicitly allowed domains (empty for the default policy).
    pub fn allowed_domains(&self) -> &[String] {
        match self {
            NetworkPolicy::Defaults => &[],
            NetworkPolicy::Allowed(domains) => domains,
        }
    }
}

fn network_policy(raw: &RawNetwork, path: &FieldPath, issues: &mut Vec<SemanticIssue>) -> Option<NetworkPolicy> {
    match raw {
        RawNetwork::Keyword(keyword) if keyword == "defaults" => Some(NetworkPolicy::Defaults),
        RawNetwork::Keyword(keyword) => {
            issues.push(
                SemanticIssue::new(path.clone(), format!("unknown network policy '{}'", keyword))
                    .with_hint("use 'defaults' or a mapping with an 'allowed' list of domains"),
            );
            None
        }
        RawNetwork::Allowed { allowed } => Some(NetworkPolicy::Allowed(allowed.clone())),
    }
}

/// Result of folding engine-related settings.
pub(super) struct EngineSelection {
    pub config: EngineConfig,
    pub network: Option<NetworkPolicy>,
    /// Whether the main document named an engine.
    pub explicit: bool,
}

pub(super) fn select_engine(
    engine: Option<&RawEngine>,
    top_level_max_turns: Option<u32>,
    top_level_network: Option<&RawNetwork>,
    default_engine: &str,
    issues: &mut Vec<SemanticIssue>,
) -> EngineSelection {
    let root = FieldPath::root();
    let engine_path = root.child("engine");

    let (mut config, nested_network) = match engine {
        None => (EngineConfig::with_id(default_engine), None),
        Some(RawEngine::Id(id)) => (EngineConfig::with_id(id.trim()), None),
        Some(RawEngine::Full(object)) => (
            EngineConfig {
                id: object.id.trim().to_string(),
                version: object.version.clone(),
                model: object.model.clone(),
                max_turns: object.max_turns,
                env: env_text(object.env.clone()),
                steps: object.steps.clone().unwrap_or_default(),
            },
            object.network.as_ref(),
        ),
    };

    match (top_level_max_turns, config.max_turns) {
        (Some(top), Some(nested)) if top != nested => issues.push(
            SemanticIssue::new(
                root.child("max-turns"),
                format!(
                    "max-turns is {} here but {} under 'engine'",
                    top, nested
                ),
            )
            .with_hint("declare max-turns in one place"),
        ),
        (Some(top), None) => config.max_turns = Some(top),
        _ => {}
    }

    let top_network = top_level_network.and_then(|raw| network_policy(raw, &root.child("network"), issues));
    let nested = nested_network.and_then(|raw| network_policy(raw, &engine_path.child("network"), issues));
    let network = match (top_network, nested) {
        (Some(top), Some(nested)) if top != nested => {
            issues.push(
                SemanticIssue::new(
                    root.child("network"),
                    "network policy differs from the one declared under 'engine'",
                )
                .with_hint("declare the network policy in one place"),
            );
            Some(top)
        }
        (Some(top), _) => Some(top),
        (None, nested) => nested,
    };

    EngineSelection {
        config,
        network,
        explicit: engine.is_some(),
    }
}
