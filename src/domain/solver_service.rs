// Domain service interface for solving optimization problems
// Any solver backend plugs in behind this contract

use super::models::{OptimizationProblem, Solution};

/// Error types for the solver service
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error("Solver not available: {0}")]
    SolverNotAvailable(String),

    #[error("Solver execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Problem is infeasible: {0}")]
    Infeasible(String),

    #[error("Problem is unbounded: {0}")]
    Unbounded(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// Domain service interface for optimization solvers
///
/// `solve` reports infeasible and unbounded problems through
/// [`Solution::status`]; `Err` is reserved for the solver itself failing.
pub trait SolverService: Send + Sync {
    /// Solve an optimization problem
    fn solve(&self, problem: &OptimizationProblem) -> Result<Solution>;

    /// Validate a problem without solving it
    fn validate(&self, problem: &OptimizationProblem) -> Result<()> {
        let mut errors = Vec::new();
        let num_vars = problem.num_variables();

        match &problem.objective {
            None => errors.push("Problem has no objective".to_string()),
            Some(objective) => {
                for (var, coeff) in objective.expression.terms() {
                    if var.index() >= num_vars {
                        errors.push(format!("Objective references unknown variable {}", var.0));
                    }
                    if !coeff.is_finite() {
                        errors.push(format!(
                            "Objective coefficient of variable {} is not finite",
                            var.0
                        ));
                    }
                }
            }
        }

        for (i, constraint) in problem.constraints.iter().enumerate() {
            if constraint
                .expression
                .terms()
                .iter()
                .any(|(var, _)| var.index() >= num_vars)
            {
                errors.push(format!("Constraint {} references an unknown variable", i));
            }
            if !constraint.bound.is_finite() {
                errors.push(format!("Constraint {} has a non-finite bound", i));
            }
        }

        for (i, var) in problem.variables.iter().enumerate() {
            if let Some(upper) = var.upper_bound {
                if var.lower_bound > upper {
                    errors.push(format!(
                        "Variable {} '{}' has lower bound ({}) > upper bound ({})",
                        i, var.name, var.lower_bound, upper
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SolverError::InvalidProblem(errors.join("; ")))
        }
    }

    /// Get the name of this solver backend
    fn name(&self) -> &str;

    /// Check if this solver supports mixed-integer programming
    fn supports_mip(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConstraintType, LinearExpression, OptimizationType, Variable, VariableId};

    struct NullSolver;

    impl SolverService for NullSolver {
        fn solve(&self, _problem: &OptimizationProblem) -> Result<Solution> {
            Err(SolverError::SolverNotAvailable("null".to_string()))
        }

        fn name(&self) -> &str {
            "null"
        }

        fn supports_mip(&self) -> bool {
            false
        }
    }

    #[test]
    fn validate_requires_objective() {
        let mut problem = OptimizationProblem::new();
        problem.add_variable(Variable::binary("y"));
        let err = NullSolver.validate(&problem).unwrap_err();
        assert!(err.to_string().contains("no objective"));
    }

    #[test]
    fn validate_catches_dangling_variables_and_bounds() {
        let mut problem = OptimizationProblem::new();
        let x = problem.add_variable(Variable::continuous("x").with_bounds(2.0, Some(1.0)));
        problem.set_objective(LinearExpression::sum([x]), OptimizationType::Minimize);
        problem.add_constraint(
            LinearExpression::sum([VariableId(7)]),
            ConstraintType::Equal,
            1.0,
        );
        match NullSolver.validate(&problem) {
            Err(SolverError::InvalidProblem(msg)) => {
                assert!(msg.contains("Constraint 0"));
                assert!(msg.contains("lower bound"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn solve_surfaces_backend_failure() {
        let mut problem = OptimizationProblem::new();
        let x = problem.add_variable(Variable::binary("x"));
        problem.set_objective(LinearExpression::sum([x]), OptimizationType::Minimize);
        assert!(matches!(
            problem.solve(&NullSolver),
            Err(SolverError::SolverNotAvailable(_))
        ));
    }
}
