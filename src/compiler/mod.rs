//! Workflow compilation.
//!
//! A [`Compiler`] drives one document through every stage:
//!
//! 1. split the document and parse the frontmatter YAML
//! 2. validate it against the schema, with source positions
//! 3. expand includes and normalize the configuration
//! 4. resolve the engine and check what it supports
//! 5. assemble the job graph, check it, and render it
//!
//! Stages 1 to 4 report problems as positioned diagnostics, aggregated into one
//! [`CompileError::Failed`]. Stage 5 can only fail on an internal invariant.

pub mod concurrency;
pub mod conditions;
pub mod graph;
pub mod jobs;
pub mod prompt;
pub mod proxy;
pub mod render;
pub mod safe_output_jobs;
pub mod triggers;

#[cfg(test)]
mod tests;

use crate::config::CompilerConfig;
use crate::diagnostic::Diagnostic;
use crate::document::{WorkflowDocument, expand_includes, first_heading, workflow_id_from_path};
use crate::engine::{AgenticEngine, EngineRegistry};
use crate::error::{CompileError, Result};
use crate::frontmatter::{ParseContext, ParsedConfiguration, Permissions, SemanticIssue, parse_configuration};
use crate::schema::{FieldPath, FrontmatterValidator, SourceLocator, hint_for, parse_frontmatter, to_diagnostics};
use graph::JobGraph;
use jobs::JobInputs;
use render::PipelineHeader;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use triggers::TriggerCategories;

/// Suffix of generated pipeline files.
pub const LOCK_SUFFIX: &str = ".lock.yml";

/// Where the pipeline for `source` is written (`triage.md` -> `triage.lock.yml`).
pub fn lock_path(source: &Path) -> PathBuf {
    let stem = workflow_id_from_path(source);
    source.with_file_name(format!("{}{}", stem, LOCK_SUFFIX))
}

/// A document that passed every user-facing check.
#[derive(Debug, Clone)]
pub struct CheckedWorkflow {
    pub workflow_id: String,
    pub name: String,
    /// Id of the engine the workflow resolved to.
    pub engine_id: String,
}

/// The result of compiling one document.
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
    pub workflow_id: String,
    pub name: String,
    pub engine_id: String,
    pub job_ids: Vec<String>,
    pub yaml: String,
}

struct Analysis<'r> {
    workflow_id: String,
    name: String,
    body: String,
    config: ParsedConfiguration,
    engine: &'r dyn AgenticEngine,
}

/// Compiles workflow documents against a fixed registry and configuration.
pub struct Compiler<'a> {
    registry: &'a EngineRegistry,
    config: &'a CompilerConfig,
    engine_override: Option<String>,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a EngineRegistry, config: &'a CompilerConfig) -> Self {
        Self {
            registry,
            config,
            engine_override: None,
        }
    }

    /// Force every compiled document onto `engine`.
    ///
    /// The id is resolved immediately; an unknown id is an error here rather
    /// than a diagnostic in each document.
    pub fn with_engine_override(mut self, engine: Option<&str>) -> Result<Self> {
        self.engine_override = match engine {
            Some(id) => Some(self.registry.resolve(id)?.id().to_string()),
            None => None,
        };
        Ok(self)
    }

    pub fn compile_file(&self, path: &Path) -> Result<CompiledWorkflow> {
        let (source, base_dir) = read_source(path)?;
        self.compile_source(
            &path.display().to_string(),
            &source,
            &base_dir,
            &workflow_id_from_path(path),
        )
    }

    /// Run every user-facing check on a file without building a pipeline.
    pub fn check_file(&self, path: &Path) -> Result<CheckedWorkflow> {
        let (source, base_dir) = read_source(path)?;
        let analysis = self.analyze(
            &path.display().to_string(),
            &source,
            &base_dir,
            &workflow_id_from_path(path),
        )?;
        Ok(CheckedWorkflow {
            workflow_id: analysis.workflow_id,
            name: analysis.name,
            engine_id: analysis.engine.id().to_string(),
        })
    }

    /// Compile document text. `file` names the document in diagnostics and
    /// includes resolve against `base_dir`.
    pub fn compile_source(
        &self,
        file: &str,
        source: &str,
        base_dir: &Path,
        workflow_id: &str,
    ) -> Result<CompiledWorkflow> {
        let analysis = self.analyze(file, source, base_dir, workflow_id)?;
        let graph = self.assemble(&analysis)?;
        debug!(file, jobs = graph.jobs().len(), "Assembled job graph");

        let categories = TriggerCategories::classify(&analysis.config.triggers);
        let concurrency = concurrency::derive(&categories, analysis.config.concurrency.as_ref());
        let top_permissions = Permissions::Scoped(BTreeMap::new());
        let header = PipelineHeader {
            name: &analysis.name,
            on: triggers::render_on(&analysis.config.triggers),
            permissions: &top_permissions,
            run_name: analysis.config.run_name.as_deref(),
            concurrency: &concurrency,
        };
        let yaml = render::render(&header, &graph)?;

        Ok(CompiledWorkflow {
            job_ids: graph.ids().into_iter().map(str::to_string).collect(),
            workflow_id: analysis.workflow_id,
            name: analysis.name,
            engine_id: analysis.engine.id().to_string(),
            yaml,
        })
    }

    fn analyze(
        &self,
        file: &str,
        source: &str,
        base_dir: &Path,
        workflow_id: &str,
    ) -> Result<Analysis<'a>> {
        let failed = |diagnostics: Vec<Diagnostic>| CompileError::Failed {
            file: file.to_string(),
            diagnostics,
        };

        let document = WorkflowDocument::parse(source).map_err(|d| failed(vec![d]))?;
        let offset = document.line_offset();
        let value = parse_frontmatter(&document.frontmatter, offset).map_err(|d| failed(vec![d]))?;
        debug!(file, "Parsed frontmatter");

        let ids = self.registry.ids();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let validator = FrontmatterValidator::new(&document.frontmatter);
        let errors = validator.validate(&value);
        if !errors.is_empty() {
            return Err(failed(to_diagnostics(&errors, offset, &id_refs)));
        }
        debug!(file, "Frontmatter matches schema");

        let expanded = expand_includes(&document.body, base_dir, document.body_line())
            .map_err(|d| failed(vec![d]))?;
        if !expanded.includes.is_empty() {
            debug!(file, includes = expanded.includes.len(), "Expanded includes");
        }

        let ctx = ParseContext {
            registry: self.registry,
            workflow_id,
            default_engine: &self.config.default_engine,
            engine_override: self.engine_override.as_deref(),
            includes: &expanded.includes,
        };
        let locate = |issue: SemanticIssue| {
            semantic_diagnostic(validator.locator(), offset, issue, &id_refs)
        };
        let mut config = parse_configuration(&value, &ctx)
            .map_err(|issues| failed(issues.into_iter().map(locate).collect()))?;

        let engine = match self.registry.resolve(&config.engine.id) {
            Ok(engine) => engine,
            Err(err) if !config.engine_explicit => return Err(err),
            Err(_) => {
                let path = if value.get("engine").is_some_and(Value::is_mapping) {
                    FieldPath::root().child("engine").child("id")
                } else {
                    FieldPath::root().child("engine")
                };
                let issue = SemanticIssue::new(path, format!("unknown engine '{}'", config.engine.id));
                return Err(failed(vec![locate(issue)]));
            }
        };
        debug!(file, engine = engine.id(), "Resolved engine");

        let capabilities = engine.capabilities();
        let mut diagnostics = Vec::new();
        if !capabilities.http_servers {
            for name in config.tools.http_servers() {
                let issue = SemanticIssue::new(
                    FieldPath::root().child("tools").child(name),
                    format!(
                        "tool server '{}' uses the http transport, which engine '{}' does not support",
                        name,
                        engine.id()
                    ),
                )
                .with_hint("run the server over stdio or in a container, or select another engine");
                diagnostics.push(locate(issue));
            }
        }
        if !diagnostics.is_empty() {
            return Err(failed(diagnostics));
        }

        if config.engine.max_turns.is_some() && !capabilities.max_turns {
            warn!(
                file,
                engine = engine.id(),
                "max-turns is not supported by this engine and is ignored"
            );
            config.engine.max_turns = None;
        }

        let name = config
            .name
            .clone()
            .or_else(|| first_heading(&expanded.body))
            .unwrap_or_else(|| workflow_id.to_string());

        Ok(Analysis {
            workflow_id: workflow_id.to_string(),
            name,
            body: expanded.body,
            config,
            engine,
        })
    }

    fn assemble(&self, analysis: &Analysis<'_>) -> Result<JobGraph> {
        let config = &analysis.config;
        let grants = jobs::effective_grants(config, self.config);
        let runs_on = config
            .runs_on
            .clone()
            .unwrap_or_else(|| Value::from(self.config.runs_on.as_str()));
        let inputs = JobInputs {
            workflow_id: &analysis.workflow_id,
            workflow_name: &analysis.name,
            body: &analysis.body,
            config,
            grants: &grants,
            engine: analysis.engine,
            compiler: self.config,
            runs_on: &runs_on,
        };

        let mut graph = JobGraph::new();
        let activation = jobs::needs_activation(config, &analysis.body);
        if activation {
            let guard = conditions::activation_guard(config).map(|guard| guard.render());
            graph.push(jobs::activation_job(&inputs, guard));
        }
        graph.push(jobs::agent_job(&inputs, activation)?);
        for job in safe_output_jobs::build(&config.safe_outputs, self.config, &runs_on) {
            graph.push(job);
        }

        graph.validate()?;
        Ok(graph)
    }
}

fn read_source(path: &Path) -> Result<(String, PathBuf)> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        CompileError::UserError(format!("failed to read '{}': {}", path.display(), e))
    })?;
    let base_dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((source, base_dir))
}

/// Position a semantic issue in the document. The root path and paths with
/// no text carry no span.
fn semantic_diagnostic(
    locator: &SourceLocator,
    line_offset: usize,
    issue: SemanticIssue,
    engine_ids: &[&str],
) -> Diagnostic {
    if issue.path.is_root() {
        let diagnostic = Diagnostic::semantic(issue.message);
        return match issue.hint {
            Some(hint) => diagnostic.with_hint(hint),
            None => diagnostic,
        };
    }

    let span = locator
        .locate(&issue.path)
        .ok()
        .map(|span| span.shifted(line_offset));
    let diagnostic = Diagnostic::semantic(issue.message)
        .with_path(issue.path.to_string())
        .with_span(span);
    match issue.hint.or_else(|| hint_for(&issue.path, engine_ids)) {
        Some(hint) => diagnostic.with_hint(hint),
        None => diagnostic,
    }
}
