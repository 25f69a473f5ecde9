use super::AgenticEngine;
use super::claude::ClaudeEngine;
use super::codex::CodexEngine;
use super::gemini::GeminiEngine;
use crate::error::{CompileError, Result};
use std::sync::LazyLock;

static GLOBAL: LazyLock<EngineRegistry> = LazyLock::new(EngineRegistry::builtin);

/// Engines known to the compiler, in registration order.
pub struct EngineRegistry {
    engines: Vec<Box<dyn AgenticEngine>>,
}

impl EngineRegistry {
    /// Registry with every built-in engine. The first one is the default.
    pub fn builtin() -> Self {
        Self {
            engines: vec![
                Box::new(ClaudeEngine),
                Box::new(CodexEngine),
                Box::new(GeminiEngine),
            ],
        }
    }

    /// Process-wide registry, built on first use and never modified.
    pub fn global() -> &'static EngineRegistry {
        &GLOBAL
    }

    pub fn engines(&self) -> impl Iterator<Item = &dyn AgenticEngine> {
        self.engines.iter().map(|engine| engine.as_ref())
    }

    pub fn ids(&self) -> Vec<String> {
        self.engines().map(|engine| engine.id().to_string()).collect()
    }

    pub fn default_engine(&self) -> &dyn AgenticEngine {
        self.engines[0].as_ref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resolve(id).is_ok()
    }

    /// Look up an engine by id.
    ///
    /// An exact id wins; otherwise an id such as `codex-experimental` resolves
    /// to the engine whose id is followed by `-`.
    pub fn resolve(&self, id: &str) -> Result<&dyn AgenticEngine> {
        if let Some(engine) = self.engines().find(|engine| engine.id() == id) {
            return Ok(engine);
        }
        self.engines()
            .find(|engine| {
                id.strip_prefix(engine.id())
                    .is_some_and(|rest| rest.starts_with('-'))
            })
            .ok_or_else(|| CompileError::UnknownEngine {
                id: id.to_string(),
                available: self.ids(),
            })
    }
}
