//! Derived-table pipeline.
//!
//! Steps run strictly in declared order, one script each, and every script
//! drops and recreates its own outputs. Dependency edges are declared next to
//! each step and checked against that order when the pipeline is built, so a
//! reordered step list is rejected before anything touches the store.
//!
//! A failing step halts the run. There is no resume: the store keeps the
//! tables of the steps before it and the next attempt is a full rebuild.

use std::collections::HashMap;

use tracing::{error, info};

use crate::error::{F1dbError, F1dbResult};
use crate::scripts::ScriptParams;
use crate::store::Store;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineStep {
    pub name: String,
    pub script: String,
    /// Names of earlier steps whose tables this step reads.
    pub depends_on: Vec<String>,
}

impl PipelineStep {
    pub fn new(name: &str, script: &str, depends_on: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            script: script.to_string(),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Running { index: usize, step: String },
    StepComplete { index: usize, step: String },
    Complete { steps: usize },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub completed: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    /// Validate the declared order: names are unique, and every dependency is
    /// a step declared before the one that needs it.
    pub fn new(steps: Vec<PipelineStep>) -> F1dbResult<Self> {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (i, s) in steps.iter().enumerate() {
            if positions.insert(s.name.as_str(), i).is_some() {
                return Err(F1dbError::DuplicateStep(s.name.clone()));
            }
        }
        for (i, step) in steps.iter().enumerate() {
            for dep in &step.depends_on {
                match positions.get(dep.as_str()) {
                    None => {
                        return Err(F1dbError::UnknownDependency { step: step.name.clone(), dependency: dep.clone() })
                    }
                    Some(&j) if j >= i => {
                        return Err(F1dbError::PipelineOrder { step: step.name.clone(), dependency: dep.clone() })
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[PipelineStep] { &self.steps }

    pub fn len(&self) -> usize { self.steps.len() }

    pub fn is_empty(&self) -> bool { self.steps.is_empty() }

    pub fn run(&self, store: &Store) -> F1dbResult<PipelineReport> { self.run_with(store, |_| {}) }

    /// Run every step, reporting each state transition to `observer`.
    pub fn run_with(&self, store: &Store, mut observer: impl FnMut(&PipelineState)) -> F1dbResult<PipelineReport> {
        let _enter = store.context().span().enter();
        observer(&PipelineState::NotStarted);
        let params = ScriptParams::new();
        let mut report = PipelineReport::default();
        for (index, step) in self.steps.iter().enumerate() {
            observer(&PipelineState::Running { index, step: step.name.clone() });
            info!(step = %step.name, script = %step.script, "pipeline step running");
            if let Err(e) = store.run_script(&step.script, &params) {
                error!(step = %step.name, code = e.code_str(), "pipeline halted: {}", e);
                return Err(e);
            }
            observer(&PipelineState::StepComplete { index, step: step.name.clone() });
            report.completed.push(step.name.clone());
        }
        observer(&PipelineState::Complete { steps: self.steps.len() });
        info!(steps = self.steps.len(), "pipeline complete");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_pipeline, Config};
    use crate::context::{SessionContext, Verbosity};
    use std::fs;

    #[test]
    fn default_order_is_valid() {
        let p = Pipeline::new(default_pipeline()).unwrap();
        assert_eq!(p.len(), 4);
    }

    #[test]
    fn scrambled_order_is_rejected() {
        let mut steps = default_pipeline();
        steps.swap(1, 2); // lap_positions before retirements
        let err = Pipeline::new(steps).unwrap_err();
        match err {
            F1dbError::PipelineOrder { step, dependency } => {
                assert_eq!(step, "lap_positions");
                assert_eq!(dependency, "retirements");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_an_order_error() {
        let err = Pipeline::new(vec![PipelineStep::new("a", "a.sql", &["a"])]).unwrap_err();
        assert_eq!(err.code_str(), "pipeline_order");
    }

    #[test]
    fn unknown_and_duplicate_steps_are_rejected() {
        let err = Pipeline::new(vec![PipelineStep::new("a", "a.sql", &["ghost"])]).unwrap_err();
        assert_eq!(err.code_str(), "unknown_dependency");
        let err = Pipeline::new(vec![PipelineStep::new("a", "a.sql", &[]), PipelineStep::new("a", "b.sql", &[])]).unwrap_err();
        assert!(matches!(err, F1dbError::DuplicateStep(name) if name == "a"));
    }

    #[test]
    fn failing_step_halts_and_keeps_earlier_tables() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("one.sql"), "DROP TABLE IF EXISTS one; CREATE TABLE one AS SELECT 1 AS x;").unwrap();
        fs::write(tmp.path().join("two.sql"), "CREATE TABLE two AS SELECT x FROM nowhere;").unwrap();
        fs::write(tmp.path().join("three.sql"), "CREATE TABLE three AS SELECT 3;").unwrap();
        let cfg = Config { scripts_dir: tmp.path().to_path_buf(), ..Config::default() };
        let store = Store::open_in_memory(&SessionContext::new(cfg, Verbosity::Quiet)).unwrap();

        let pipeline = Pipeline::new(vec![
            PipelineStep::new("one", "one.sql", &[]),
            PipelineStep::new("two", "two.sql", &["one"]),
            PipelineStep::new("three", "three.sql", &["two"]),
        ])
        .unwrap();

        let mut states = Vec::new();
        let err = pipeline.run_with(&store, |s| states.push(s.clone())).unwrap_err();
        assert_eq!(err.code_str(), "script_error");
        assert_eq!(
            states,
            vec![
                PipelineState::NotStarted,
                PipelineState::Running { index: 0, step: "one".into() },
                PipelineState::StepComplete { index: 0, step: "one".into() },
                PipelineState::Running { index: 1, step: "two".into() },
            ]
        );
        assert!(store.has_table("one").unwrap());
        assert!(!store.has_table("two").unwrap());
        assert!(!store.has_table("three").unwrap());
    }

    #[test]
    fn rerun_replaces_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("one.sql"), "DROP TABLE IF EXISTS one; CREATE TABLE one AS SELECT 1 AS x;").unwrap();
        let cfg = Config { scripts_dir: tmp.path().to_path_buf(), ..Config::default() };
        let store = Store::open_in_memory(&SessionContext::new(cfg, Verbosity::Quiet)).unwrap();
        let pipeline = Pipeline::new(vec![PipelineStep::new("one", "one.sql", &[])]).unwrap();
        pipeline.run(&store).unwrap();
        let report = pipeline.run(&store).unwrap();
        assert_eq!(report.completed, vec!["one"]);
        assert_eq!(store.row_count("one").unwrap(), 1);
    }
}
