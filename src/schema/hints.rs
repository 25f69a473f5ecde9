//! Hints attached to validation diagnostics, keyed by path prefix.

use super::path::FieldPath;
use super::rules::{MAX_TURNS_RANGE, SAFE_OUTPUT_KEYS};

/// Suggest a fix for a problem at `path`.
///
/// `engine_ids` lists the registered engines, used for `engine` paths.
pub fn hint_for(path: &FieldPath, engine_ids: &[&str]) -> Option<String> {
    if path.last_key() == Some("max-turns") {
        return Some(format!(
            "max-turns must be an integer between {} and {}",
            MAX_TURNS_RANGE.0, MAX_TURNS_RANGE.1
        ));
    }

    let hint = match path.top_key()? {
        "engine" => format!("valid engines: {}", engine_ids.join(", ")),
        "on" => "declare at least one trigger, e.g. 'on: issues' or 'on: { command: { name: bot } }'"
            .to_string(),
        "permissions" => {
            "use 'read-all', 'write-all', or a map of scope to read|write|none".to_string()
        }
        "safe-outputs" => format!("supported safe outputs: {}", SAFE_OUTPUT_KEYS.join(", ")),
        "tools" => "built-in tools are github, edit, web-fetch, web-search and bash; \
                    custom tools need an 'mcp' section"
            .to_string(),
        "network" => "use 'defaults' or a mapping with an 'allowed' list of domains".to_string(),
        "cache" => "each cache entry needs a 'key' and a 'path'".to_string(),
        "steps" => "each step needs exactly one of 'uses' or 'run'".to_string(),
        "timeout_minutes" | "timeout-minutes" => {
            "timeout must be an integer number of minutes between 1 and 360".to_string()
        }
        _ => return None,
    };
    Some(hint)
}
