//! YAML serialization of the assembled pipeline.
//!
//! Mappings keep insertion order, so keys are written in the fixed order below
//! and identical graphs always render to identical text.

use super::concurrency::ConcurrencyPolicy;
use super::graph::{JobGraph, JobSpec};
use crate::engine::{ExecutionStepSpec, StepAction};
use crate::error::{CompileError, Result};
use crate::frontmatter::Permissions;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

pub const GENERATED_HEADER: &str = "\
# This file was generated by awflow. DO NOT EDIT.
#
# To update this file, edit the corresponding .md file and run:
#   awflow compile
#
";

/// Top-level pieces of a pipeline other than its jobs.
pub struct PipelineHeader<'a> {
    pub name: &'a str,
    pub on: Mapping,
    pub permissions: &'a Permissions,
    pub run_name: Option<&'a str>,
    pub concurrency: &'a ConcurrencyPolicy,
}

fn to_value<T: Serialize>(value: &T, what: &str) -> Result<Value> {
    serde_yaml::to_value(value)
        .map_err(|e| CompileError::Internal(format!("failed to serialize {}: {}", what, e)))
}

fn string_map(map: &BTreeMap<String, String>) -> Value {
    Value::Mapping(
        map.iter()
            .map(|(key, value)| (key.as_str().into(), value.as_str().into()))
            .collect(),
    )
}

fn insert(mapping: &mut Mapping, key: &str, value: impl Into<Value>) {
    mapping.insert(key.into(), value.into());
}

/// Render the whole pipeline, header comment included.
pub fn render(header: &PipelineHeader<'_>, graph: &JobGraph) -> Result<String> {
    let mut root = Mapping::new();
    insert(&mut root, "name", header.name);
    insert(&mut root, "on", Value::Mapping(header.on.clone()));
    insert(&mut root, "permissions", to_value(header.permissions, "permissions")?);
    if let Some(run_name) = header.run_name {
        insert(&mut root, "run-name", run_name);
    }
    insert(&mut root, "concurrency", to_value(header.concurrency, "concurrency")?);

    let mut jobs = Mapping::new();
    for job in graph.jobs() {
        jobs.insert(job.id.as_str().into(), Value::Mapping(render_job(job)?));
    }
    insert(&mut root, "jobs", Value::Mapping(jobs));

    let yaml = serde_yaml::to_string(&root)
        .map_err(|e| CompileError::Internal(format!("failed to render pipeline: {}", e)))?;
    Ok(format!("{}{}", GENERATED_HEADER, yaml))
}

fn render_job(job: &JobSpec) -> Result<Mapping> {
    let mut mapping = Mapping::new();
    if let Some(name) = &job.name {
        insert(&mut mapping, "name", name.as_str());
    }
    insert(&mut mapping, "runs-on", job.runs_on.clone());
    match job.needs.as_slice() {
        [] => {}
        [single] => insert(&mut mapping, "needs", single.as_str()),
        many => insert(
            &mut mapping,
            "needs",
            Value::Sequence(many.iter().map(|id| id.as_str().into()).collect()),
        ),
    }
    if let Some(condition) = &job.condition {
        insert(&mut mapping, "if", condition.as_str());
    }
    insert(&mut mapping, "permissions", to_value(&job.permissions, "job permissions")?);
    if let Some(minutes) = job.timeout_minutes {
        insert(&mut mapping, "timeout-minutes", minutes);
    }
    if !job.env.is_empty() {
        insert(&mut mapping, "env", string_map(&job.env));
    }
    if !job.outputs.is_empty() {
        insert(&mut mapping, "outputs", string_map(&job.outputs));
    }
    let steps = job
        .steps
        .iter()
        .map(|step| render_step(step).map(Value::Mapping))
        .collect::<Result<Vec<_>>>()?;
    insert(&mut mapping, "steps", Value::Sequence(steps));
    Ok(mapping)
}

fn render_step(step: &ExecutionStepSpec) -> Result<Mapping> {
    let mut mapping = Mapping::new();
    insert(&mut mapping, "name", step.name.as_str());
    if let Some(id) = &step.id {
        insert(&mut mapping, "id", id.as_str());
    }
    if let Some(condition) = &step.condition {
        insert(&mut mapping, "if", condition.as_str());
    }
    match &step.action {
        StepAction::Uses { uses, with } => {
            insert(&mut mapping, "uses", uses.as_str());
            if !with.is_empty() {
                insert(&mut mapping, "with", to_value(with, "step inputs")?);
            }
        }
        StepAction::Run { run } => insert(&mut mapping, "run", run.as_str()),
    }
    if !step.env.is_empty() {
        insert(&mut mapping, "env", string_map(&step.env));
    }
    for (key, value) in &step.extra {
        insert(&mut mapping, key, value.clone());
    }
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_keys_follow_fixed_order() {
        let step = ExecutionStepSpec::uses("Checkout", "actions/checkout@v4")
            .with_condition("always()")
            .with_id("co")
            .with_env("A", "1")
            .with_input("fetch-depth", 0u32);
        let mapping = render_step(&step).unwrap();
        let keys: Vec<&str> = mapping.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["name", "id", "if", "uses", "with", "env"]);
        assert_eq!(mapping["with"]["fetch-depth"].as_i64(), Some(0));
    }

    #[test]
    fn single_dependency_renders_as_scalar() {
        let job = JobSpec::new("b", "ubuntu-latest".into(), Permissions::ReadAll).needs("a");
        let mapping = render_job(&job).unwrap();
        assert_eq!(mapping["needs"].as_str(), Some("a"));
        assert_eq!(mapping["permissions"].as_str(), Some("read-all"));
    }

    #[test]
    fn output_starts_with_generated_header() {
        let mut graph = JobGraph::new();
        graph.push(
            JobSpec::new("agent", "ubuntu-latest".into(), Permissions::ReadAll)
                .step(ExecutionStepSpec::run("Say hi", "echo hi")),
        );
        let concurrency = ConcurrencyPolicy {
            group: "awflow-${{ github.workflow }}".to_string(),
            cancel_in_progress: None,
        };
        let mut on = Mapping::new();
        on.insert("push".into(), Value::Null);
        let header = PipelineHeader {
            name: "Hello",
            on,
            permissions: &Permissions::ReadAll,
            run_name: None,
            concurrency: &concurrency,
        };
        let text = render(&header, &graph).unwrap();
        assert!(text.starts_with(GENERATED_HEADER));

        let parsed: Value = serde_yaml::from_str(&text).unwrap();
        let keys: Vec<&str> = parsed.as_mapping().unwrap().keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["name", "on", "permissions", "concurrency", "jobs"]);
        assert_eq!(parsed["jobs"]["agent"]["steps"][0]["run"].as_str(), Some("echo hi"));
    }
}
