//! Job graph of a generated pipeline.
//!
//! Jobs accumulate in insertion order during one compile. Before rendering,
//! [`JobGraph::validate`] checks the structural invariants: ids are unique,
//! every `needs` edge names a job in the graph, and the graph is acyclic.
//! A violation is an internal error, never a user error.

use crate::engine::ExecutionStepSpec;
use crate::error::{CompileError, Result};
use crate::frontmatter::Permissions;
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// One job of the generated pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub id: String,
    pub name: Option<String>,
    pub runs_on: Value,
    pub permissions: Permissions,
    pub needs: Vec<String>,
    /// Rendered guard expression.
    pub condition: Option<String>,
    pub timeout_minutes: Option<u32>,
    pub env: BTreeMap<String, String>,
    /// Job outputs, name to expression.
    pub outputs: BTreeMap<String, String>,
    pub steps: Vec<ExecutionStepSpec>,
}

impl JobSpec {
    pub fn new(id: impl Into<String>, runs_on: Value, permissions: Permissions) -> Self {
        Self {
            id: id.into(),
            name: None,
            runs_on,
            permissions,
            needs: Vec::new(),
            condition: None,
            timeout_minutes: None,
            env: BTreeMap::new(),
            outputs: BTreeMap::new(),
            steps: Vec::new(),
        }
    }

    pub fn needs(mut self, job: impl Into<String>) -> Self {
        self.needs.push(job.into());
        self
    }

    pub fn with_condition(mut self, condition: Option<String>) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_timeout(mut self, minutes: u32) -> Self {
        self.timeout_minutes = Some(minutes);
        self
    }

    pub fn with_output(mut self, name: &str, expression: impl Into<String>) -> Self {
        self.outputs.insert(name.to_string(), expression.into());
        self
    }

    pub fn with_env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.insert(key.to_string(), value.into());
        self
    }

    pub fn step(mut self, step: ExecutionStepSpec) -> Self {
        self.steps.push(step);
        self
    }
}

/// Ordered collection of jobs.
#[derive(Debug, Clone, Default)]
pub struct JobGraph {
    jobs: Vec<JobSpec>,
}

impl JobGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: JobSpec) {
        self.jobs.push(job);
    }

    pub fn jobs(&self) -> &[JobSpec] {
        &self.jobs
    }

    pub fn get(&self, id: &str) -> Option<&JobSpec> {
        self.jobs.iter().find(|job| job.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.jobs.iter().map(|job| job.id.as_str()).collect()
    }

    /// Check that ids are unique, every edge resolves, and there is no cycle.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for job in &self.jobs {
            if !seen.insert(job.id.as_str()) {
                return Err(CompileError::Internal(format!(
                    "duplicate job id '{}'",
                    job.id
                )));
            }
        }

        for job in &self.jobs {
            for dependency in &job.needs {
                if !seen.contains(dependency.as_str()) {
                    return Err(CompileError::Internal(format!(
                        "job '{}' needs '{}', which is not in the graph",
                        job.id, dependency
                    )));
                }
            }
        }

        let order = self.topological_order();
        if order.len() != self.jobs.len() {
            let ordered: HashSet<&str> = order.into_iter().collect();
            let mut stuck: Vec<&str> = self
                .ids()
                .into_iter()
                .filter(|id| !ordered.contains(id))
                .collect();
            stuck.sort_unstable();
            return Err(CompileError::Internal(format!(
                "job dependency cycle among: {}",
                stuck.join(", ")
            )));
        }
        Ok(())
    }

    /// Kahn's algorithm over `needs` edges. Jobs on a cycle are left out.
    fn topological_order(&self) -> Vec<&str> {
        let mut in_degree: HashMap<&str, usize> =
            self.jobs.iter().map(|job| (job.id.as_str(), job.needs.len())).collect();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for job in &self.jobs {
            for dependency in &job.needs {
                dependents
                    .entry(dependency.as_str())
                    .or_default()
                    .push(job.id.as_str());
            }
        }

        let mut queue: VecDeque<&str> = self
            .jobs
            .iter()
            .filter(|job| job.needs.is_empty())
            .map(|job| job.id.as_str())
            .collect();
        let mut order = Vec::with_capacity(self.jobs.len());

        while let Some(id) = queue.pop_front() {
            order.push(id);
            for dependent in dependents.get(id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }
        order
    }
}
