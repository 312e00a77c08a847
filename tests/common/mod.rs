#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use letsroute::{
    DirectedArc, OptimizationProblem, Solution, SolutionStatus, SolverError, SolverService,
};

/// Six cities with the corpus adjacency and distances.
pub fn six_cities() -> (Vec<&'static str>, Vec<DirectedArc>) {
    let nodes = vec!["A", "B", "C", "D", "E", "F"];
    let arcs = [
        ("A", "B", 8.0),
        ("A", "D", 3.0),
        ("A", "F", 4.0),
        ("B", "A", 8.0),
        ("B", "C", 1.0),
        ("B", "D", 5.0),
        ("B", "E", 9.0),
        ("C", "B", 1.0),
        ("C", "D", 7.0),
        ("C", "E", 2.0),
        ("C", "F", 21.0),
        ("D", "A", 3.0),
        ("D", "B", 5.0),
        ("D", "C", 7.0),
        ("D", "F", 3.0),
        ("E", "B", 9.0),
        ("E", "C", 2.0),
        ("E", "F", 35.0),
        ("F", "A", 4.0),
        ("F", "C", 21.0),
        ("F", "D", 3.0),
        ("F", "E", 35.0),
    ]
    .into_iter()
    .map(|(t, h, c)| DirectedArc::new(t, h, c))
    .collect();
    (nodes, arcs)
}

pub fn strings(groups: &[&[&str]]) -> Vec<Vec<String>> {
    groups
        .iter()
        .map(|g| g.iter().map(|s| s.to_string()).collect())
        .collect()
}

/// One canned answer of [`ScriptedSolver`]
pub enum Scripted {
    /// Select these arcs; rejected if they violate a model constraint
    Arcs(Vec<(&'static str, &'static str)>),
    /// Select these arcs without checking the model
    Raw(Vec<(&'static str, &'static str)>),
    Status(SolutionStatus),
    Fail(&'static str),
}

/// Replays a fixed sequence of solver answers
pub struct ScriptedSolver {
    script: Mutex<VecDeque<Scripted>>,
    seen_constraints: Mutex<Vec<usize>>,
}

impl ScriptedSolver {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen_constraints: Mutex::new(Vec::new()),
        }
    }

    /// Constraint count of the model at each solve call.
    pub fn seen_constraints(&self) -> Vec<usize> {
        self.seen_constraints.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen_constraints.lock().unwrap().len()
    }

    fn values(problem: &OptimizationProblem, arcs: &[(&str, &str)]) -> Vec<f64> {
        let selected: Vec<String> = arcs.iter().map(|(t, h)| format!("y[{},{}]", t, h)).collect();
        problem
            .variables
            .iter()
            .map(|v| if selected.contains(&v.name) { 1.0 } else { 0.0 })
            .collect()
    }
}

impl SolverService for ScriptedSolver {
    fn solve(&self, problem: &OptimizationProblem) -> Result<Solution, SolverError> {
        self.seen_constraints
            .lock()
            .unwrap()
            .push(problem.num_constraints());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SolverError::ExecutionFailed("script exhausted".to_string()))?;

        match next {
            Scripted::Arcs(arcs) => {
                let values = Self::values(problem, &arcs);
                if let Some(c) = problem
                    .constraints
                    .iter()
                    .find(|c| !c.is_satisfied(&values, 1e-9))
                {
                    return Err(SolverError::ExecutionFailed(format!(
                        "scripted answer violates {}",
                        c.name
                    )));
                }
                Ok(Solution::optimal(problem.objective_value(&values), values))
            }
            Scripted::Raw(arcs) => {
                let values = Self::values(problem, &arcs);
                Ok(Solution::optimal(problem.objective_value(&values), values))
            }
            Scripted::Status(status) => Ok(Solution::new(status, format!("scripted {}", status))),
            Scripted::Fail(message) => Err(SolverError::ExecutionFailed(message.to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn supports_mip(&self) -> bool {
        true
    }
}

/// The corpus' three solves: two triangles, three pairs, one tour.
pub fn corpus_script() -> Vec<Scripted> {
    vec![
        Scripted::Arcs(vec![
            ("A", "D"),
            ("D", "F"),
            ("F", "A"),
            ("B", "C"),
            ("C", "E"),
            ("E", "B"),
        ]),
        Scripted::Arcs(vec![
            ("A", "F"),
            ("F", "A"),
            ("B", "D"),
            ("D", "B"),
            ("C", "E"),
            ("E", "C"),
        ]),
        Scripted::Arcs(vec![
            ("A", "B"),
            ("B", "E"),
            ("E", "C"),
            ("C", "D"),
            ("D", "F"),
            ("F", "A"),
        ]),
    ]
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
