//! Implementation of the `awflow engines` command.

use crate::engine::{AgenticEngine, EngineRegistry};
use crate::error::Result;

pub fn cmd_engines() -> Result<()> {
    let registry = EngineRegistry::global();
    let default_id = registry.default_engine().id();

    println!("Engines");
    println!("=======");
    println!();
    for engine in registry.engines() {
        println!("  {}", describe(engine, engine.id() == default_id));
        println!("      {}", engine.description());
    }
    Ok(())
}

/// One summary line: id, display name and flags.
fn describe(engine: &dyn AgenticEngine, is_default: bool) -> String {
    let capabilities = engine.capabilities();
    let mut flags = Vec::new();
    if is_default {
        flags.push("default");
    }
    if engine.is_experimental() {
        flags.push("experimental");
    }
    if capabilities.tool_allowlist {
        flags.push("tool-allowlist");
    }
    if capabilities.http_servers {
        flags.push("http-servers");
    }
    if capabilities.max_turns {
        flags.push("max-turns");
    }

    let mut line = format!("{:8} {}", engine.id(), engine.display_name());
    if !flags.is_empty() {
        line.push_str(&format!(" [{}]", flags.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_lists_flags() {
        let registry = EngineRegistry::builtin();
        let claude = registry.resolve("claude").unwrap();
        let line = describe(claude, true);
        assert!(line.starts_with("claude "));
        assert!(line.contains("[default, tool-allowlist, http-servers, max-turns]"));

        let codex = registry.resolve("codex").unwrap();
        assert!(describe(codex, false).ends_with("[experimental]"));
    }
}
