// Subtour-elimination driver
// Solves the routing model, splits the assignment into cycles and cuts
// every subtour until a single tour through all nodes remains.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::cycles::is_hamiltonian;
use crate::domain::{
    DriverState, PermutationViolation, RoutingModel, SolverError, SolverService, TopologyError,
};

/// Limits for one driver run
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverConfig {
    /// Maximum number of solve calls; `None` runs until a terminal state.
    pub max_iterations: Option<usize>,
}

impl DriverConfig {
    pub fn with_max_iterations(mut self, limit: usize) -> Self {
        self.max_iterations = Some(limit);
        self
    }
}

/// What one solve + inspection produced
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    /// 1-based solve counter
    pub iteration: usize,
    /// Cycle decomposition of the assignment, in discovery order
    pub cycles: Vec<Vec<String>>,
    pub objective_value: f64,
    pub cuts_added: usize,
    /// Constraint count after this iteration's cuts
    pub num_constraints: usize,
}

impl IterationReport {
    pub fn is_tour(&self) -> bool {
        self.cycles.len() == 1 && self.cuts_added == 0
    }
}

/// Result of a converged run
#[derive(Debug, Clone, PartialEq)]
pub struct TourReport {
    /// Nodes in visiting order, starting at the first node; the closing
    /// arc back to it is implied.
    pub tour: Vec<String>,
    pub total_cost: f64,
    pub iterations: usize,
    pub history: Vec<IterationReport>,
    pub solver: String,
}

type Decomposition = Option<Vec<Vec<String>>>;

/// Failure of a run; no partial tour is ever returned
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("no tour exists (iteration {iteration}): {reason}")]
    Exhausted {
        iteration: usize,
        last_decomposition: Decomposition,
        reason: String,
    },

    #[error("model is unbounded (iteration {iteration}): {reason}")]
    Unbounded {
        iteration: usize,
        last_decomposition: Decomposition,
        reason: String,
    },

    #[error("solver unavailable (iteration {iteration}): {source}")]
    SolverUnavailable {
        iteration: usize,
        last_decomposition: Decomposition,
        #[source]
        source: SolverError,
    },

    #[error("assignment is not a permutation (iteration {iteration}): {source}")]
    NotPermutation {
        iteration: usize,
        last_decomposition: Decomposition,
        #[source]
        source: PermutationViolation,
    },

    #[error("no tour after {limit} iterations")]
    IterationLimit {
        limit: usize,
        last_decomposition: Decomposition,
    },
}

impl DriverError {
    /// Solve call during which the run failed.
    pub fn iteration(&self) -> usize {
        match self {
            DriverError::Exhausted { iteration, .. }
            | DriverError::Unbounded { iteration, .. }
            | DriverError::SolverUnavailable { iteration, .. }
            | DriverError::NotPermutation { iteration, .. } => *iteration,
            DriverError::IterationLimit { limit, .. } => *limit,
        }
    }

    /// Latest cycle decomposition seen before the failure, if any.
    pub fn last_decomposition(&self) -> Option<&[Vec<String>]> {
        match self {
            DriverError::Exhausted {
                last_decomposition, ..
            }
            | DriverError::Unbounded {
                last_decomposition, ..
            }
            | DriverError::SolverUnavailable {
                last_decomposition, ..
            }
            | DriverError::NotPermutation {
                last_decomposition, ..
            }
            | DriverError::IterationLimit {
                last_decomposition, ..
            } => last_decomposition.as_deref(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;

/// Owns one routing model for the lifetime of a run
pub struct SubtourEliminationDriver {
    model: RoutingModel,
    solver: Arc<dyn SolverService>,
    config: DriverConfig,
    state: DriverState,
    history: Vec<IterationReport>,
    tour: Option<Vec<usize>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl SubtourEliminationDriver {
    pub fn new(model: RoutingModel, solver: Arc<dyn SolverService>) -> Self {
        Self {
            model,
            solver,
            config: DriverConfig::default(),
            state: DriverState::Building,
            history: Vec::new(),
            tour: None,
            cancel: None,
        }
    }

    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// Stop before the next solve once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn model(&self) -> &RoutingModel {
        &self.model
    }

    pub fn into_model(self) -> RoutingModel {
        self.model
    }

    pub fn history(&self) -> &[IterationReport] {
        &self.history
    }

    /// Run to a terminal state.
    pub fn run(&mut self) -> Result<TourReport> {
        self.run_with(|_| {})
    }

    /// Run to a terminal state, handing every iteration to `observer`.
    pub fn run_with<F>(&mut self, mut observer: F) -> Result<TourReport>
    where
        F: FnMut(&IterationReport),
    {
        loop {
            let seen = self.history.len();
            let state = self.step()?;
            if self.history.len() > seen {
                if let Some(report) = self.history.last() {
                    observer(report);
                }
            }
            if state.is_terminal() {
                break;
            }
        }
        self.report().ok_or_else(|| DriverError::Exhausted {
            iteration: self.history.len(),
            last_decomposition: self.last_decomposition(),
            reason: "run ended without a tour".to_string(),
        })
    }

    /// One solve followed by inspection. Terminal states are sticky.
    pub fn step(&mut self) -> Result<DriverState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        let iteration = self.history.len() + 1;
        if let Some(limit) = self.config.max_iterations {
            if iteration > limit {
                log::warn!("stopping after {} iteration(s) without a tour", limit);
                self.state = DriverState::Exhausted;
                return Err(DriverError::IterationLimit {
                    limit,
                    last_decomposition: self.last_decomposition(),
                });
            }
        }
        if self.is_cancelled() {
            return Err(self.exhaust(iteration, None, "run cancelled".to_string()));
        }

        self.state = DriverState::Solving;
        log::debug!(
            "iteration {}: solving with {} ({} constraints)",
            iteration,
            self.solver.name(),
            self.model.num_constraints()
        );
        let solution = match self.model.problem().solve(self.solver.as_ref()) {
            Ok(solution) => solution,
            Err(e) => return Err(self.fail(iteration, e)),
        };

        self.state = DriverState::Inspecting;
        let successors = match self.model.successors(&solution) {
            Ok(successors) => successors,
            Err(source) => {
                self.state = DriverState::Exhausted;
                return Err(DriverError::NotPermutation {
                    iteration,
                    last_decomposition: self.last_decomposition(),
                    source,
                });
            }
        };

        let cycles = self.model.cycles(&successors);
        let objective_value = solution
            .optimal_value
            .unwrap_or_else(|| self.model.problem().objective_value(&solution.variable_values));
        let names: Vec<Vec<String>> = cycles.iter().map(|c| self.model.names_of(c)).collect();
        let num_nodes = self.model.num_nodes();

        if is_hamiltonian(&successors) {
            log::info!(
                "converged after {} iteration(s): cost {}",
                iteration,
                objective_value
            );
            self.history.push(IterationReport {
                iteration,
                cycles: names,
                objective_value,
                cuts_added: 0,
                num_constraints: self.model.num_constraints(),
            });
            self.tour = cycles.into_iter().next();
            self.state = DriverState::Converged;
            return Ok(self.state);
        }

        log::debug!("iteration {}: subtours {:?}", iteration, names);
        let before = self.model.num_constraints();
        for cycle in cycles.iter().filter(|c| c.len() < num_nodes) {
            if let Err(e) = self.model.add_cut_for(cycle) {
                return Err(self.exhaust(iteration, Some(names), cut_reason(e)));
            }
        }

        self.history.push(IterationReport {
            iteration,
            cycles: names,
            objective_value,
            cuts_added: self.model.num_constraints() - before,
            num_constraints: self.model.num_constraints(),
        });
        self.state = DriverState::Solving;
        Ok(self.state)
    }

    /// The converged tour, if the run has converged.
    pub fn report(&self) -> Option<TourReport> {
        let tour = self.tour.as_ref()?;
        let last = self.history.last()?;
        Some(TourReport {
            tour: self.model.names_of(tour),
            total_cost: self
                .model
                .tour_cost(tour)
                .unwrap_or(last.objective_value),
            iterations: self.history.len(),
            history: self.history.clone(),
            solver: self.solver.name().to_string(),
        })
    }

    fn last_decomposition(&self) -> Decomposition {
        self.history.last().map(|r| r.cycles.clone())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    fn exhaust(
        &mut self,
        iteration: usize,
        decomposition: Decomposition,
        reason: String,
    ) -> DriverError {
        log::warn!("iteration {}: exhausted: {}", iteration, reason);
        self.state = DriverState::Exhausted;
        DriverError::Exhausted {
            iteration,
            last_decomposition: decomposition.or_else(|| self.last_decomposition()),
            reason,
        }
    }

    fn fail(&mut self, iteration: usize, error: SolverError) -> DriverError {
        match error {
            SolverError::Infeasible(reason) => self.exhaust(iteration, None, reason),
            SolverError::Unbounded(reason) => {
                self.state = DriverState::Exhausted;
                DriverError::Unbounded {
                    iteration,
                    last_decomposition: self.last_decomposition(),
                    reason,
                }
            }
            source => {
                self.state = DriverState::Exhausted;
                DriverError::SolverUnavailable {
                    iteration,
                    last_decomposition: self.last_decomposition(),
                    source,
                }
            }
        }
    }
}

fn cut_reason(error: TopologyError) -> String {
    format!("subtour cannot be cut: {}", error)
}

/// Build, run and report in one call.
pub fn solve_tour<S: AsRef<str>>(
    nodes: &[S],
    arcs: &[crate::domain::DirectedArc],
    solver: Arc<dyn SolverService>,
    config: DriverConfig,
) -> std::result::Result<TourReport, TourError> {
    let model = RoutingModel::create(nodes, arcs)?;
    let mut driver = SubtourEliminationDriver::new(model, solver).with_config(config);
    Ok(driver.run()?)
}

/// Either stage of [`solve_tour`] failing
#[derive(Debug, thiserror::Error)]
pub enum TourError {
    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}
