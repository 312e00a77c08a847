use std::fmt;

use super::solver_service::{Result, SolverError, SolverService};
use super::value_objects::{ConstraintType, OptimizationType, SolutionStatus, VariableType};

/// Index of a variable inside its [`OptimizationProblem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub usize);

impl VariableId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Decision variable in an optimization problem
#[derive(Debug, Clone)]
pub struct Variable {
    pub variable_type: VariableType,
    pub lower_bound: f64,
    pub upper_bound: Option<f64>,
    pub name: String,
}

impl Variable {
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Continuous,
            lower_bound: 0.0,
            upper_bound: None,
            name: name.into(),
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Integer,
            lower_bound: 0.0,
            upper_bound: None,
            name: name.into(),
        }
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Binary,
            lower_bound: 0.0,
            upper_bound: Some(1.0),
            name: name.into(),
        }
    }

    pub fn with_bounds(mut self, lower: f64, upper: Option<f64>) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.variable_type, VariableType::Integer | VariableType::Binary)
    }
}

/// Sparse linear combination of variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpression {
    terms: Vec<(VariableId, f64)>,
}

impl LinearExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unit-coefficient sum of `variables`.
    pub fn sum(variables: impl IntoIterator<Item = VariableId>) -> Self {
        variables.into_iter().map(|v| (v, 1.0)).collect()
    }

    pub fn with_term(mut self, variable: VariableId, coefficient: f64) -> Self {
        self.add_term(variable, coefficient);
        self
    }

    pub fn add_term(&mut self, variable: VariableId, coefficient: f64) {
        self.terms.push((variable, coefficient));
    }

    pub fn terms(&self) -> &[(VariableId, f64)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Evaluate against dense variable values; missing values count as zero.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values.get(v.index()).copied().unwrap_or(0.0))
            .sum()
    }
}

impl FromIterator<(VariableId, f64)> for LinearExpression {
    fn from_iter<I: IntoIterator<Item = (VariableId, f64)>>(iter: I) -> Self {
        Self {
            terms: iter.into_iter().collect(),
        }
    }
}

/// Objective function to minimize or maximize
#[derive(Debug, Clone)]
pub struct ObjectiveFunction {
    pub optimization_type: OptimizationType,
    pub expression: LinearExpression,
}

impl ObjectiveFunction {
    pub fn new(optimization_type: OptimizationType, expression: LinearExpression) -> Self {
        Self {
            optimization_type,
            expression,
        }
    }

    /// Dense coefficient vector over `num_variables` columns.
    pub fn dense_coefficients(&self, num_variables: usize) -> Vec<f64> {
        let mut coefficients = vec![0.0; num_variables];
        for &(var, coeff) in self.expression.terms() {
            if let Some(slot) = coefficients.get_mut(var.index()) {
                *slot += coeff;
            }
        }
        coefficients
    }
}

/// Linear constraint on variables
#[derive(Debug, Clone)]
pub struct Constraint {
    pub constraint_type: ConstraintType,
    pub expression: LinearExpression,
    pub bound: f64,
    pub name: String,
}

impl Constraint {
    pub fn new(constraint_type: ConstraintType, expression: LinearExpression, bound: f64) -> Self {
        Self {
            constraint_type,
            expression,
            bound,
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        self.constraint_type
            .is_satisfied(self.expression.evaluate(values), self.bound, tolerance)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.name.is_empty() {
            write!(f, "{}: ", self.name)?;
        }
        for (i, (var, coeff)) in self.expression.terms().iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}*x{}", coeff, var.index())?;
        }
        if self.expression.is_empty() {
            write!(f, "0")?;
        }
        write!(f, " {} {}", self.constraint_type, self.bound)
    }
}

/// Complete optimization problem
///
/// The shape (variables) is fixed once a solve starts; constraints only
/// ever grow and the objective may be replaced.
#[derive(Debug, Clone, Default)]
pub struct OptimizationProblem {
    pub name: String,
    pub description: String,
    pub objective: Option<ObjectiveFunction>,
    pub constraints: Vec<Constraint>,
    pub variables: Vec<Variable>,
}

impl OptimizationProblem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn add_variable(&mut self, variable: Variable) -> VariableId {
        self.variables.push(variable);
        VariableId(self.variables.len() - 1)
    }

    /// Append `expression <relation> bound` and return its position.
    pub fn add_constraint(
        &mut self,
        expression: LinearExpression,
        relation: ConstraintType,
        bound: f64,
    ) -> usize {
        self.push_constraint(Constraint::new(relation, expression, bound))
    }

    pub fn push_constraint(&mut self, constraint: Constraint) -> usize {
        self.constraints.push(constraint);
        self.constraints.len() - 1
    }

    /// Replace the active objective.
    pub fn set_objective(&mut self, expression: LinearExpression, sense: OptimizationType) {
        self.objective = Some(ObjectiveFunction::new(sense, expression));
    }

    /// Solve with `solver`, turning non-optimal statuses into errors.
    pub fn solve(&self, solver: &dyn SolverService) -> Result<Solution> {
        let solution = solver.solve(self)?;
        match solution.status {
            SolutionStatus::Optimal => Ok(solution),
            SolutionStatus::Infeasible => Err(SolverError::Infeasible(solution.message)),
            SolutionStatus::Unbounded => Err(SolverError::Unbounded(solution.message)),
        }
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_integer_variables(&self) -> usize {
        self.variables.iter().filter(|v| v.is_integer()).count()
    }

    pub fn num_binary_variables(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.variable_type == VariableType::Binary)
            .count()
    }

    pub fn is_mixed_integer(&self) -> bool {
        self.num_integer_variables() > 0
    }

    /// Objective value of `values`, or zero without an objective.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .as_ref()
            .map(|o| o.expression.evaluate(values))
            .unwrap_or(0.0)
    }

    pub(crate) fn statistics(&self, solve_time_ms: f64) -> SolverStatistics {
        SolverStatistics {
            solve_time_ms,
            num_variables: self.num_variables() as u32,
            num_constraints: self.num_constraints() as u32,
            num_integer_vars: (self.num_integer_variables() - self.num_binary_variables()) as u32,
            num_binary_vars: self.num_binary_variables() as u32,
        }
    }
}

/// Statistics about the solve process
#[derive(Debug, Clone, Default)]
pub struct SolverStatistics {
    pub solve_time_ms: f64,
    pub num_variables: u32,
    pub num_constraints: u32,
    pub num_integer_vars: u32,
    pub num_binary_vars: u32,
}

/// Solution to an optimization problem
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolutionStatus,
    pub optimal_value: Option<f64>,
    pub variable_values: Vec<f64>,
    pub message: String,
    pub statistics: SolverStatistics,
}

impl Solution {
    pub fn new(status: SolutionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            optimal_value: None,
            variable_values: Vec::new(),
            message: message.into(),
            statistics: SolverStatistics::default(),
        }
    }

    pub fn optimal(value: f64, variable_values: Vec<f64>) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            optimal_value: Some(value),
            variable_values,
            message: "Optimal solution found".to_string(),
            statistics: SolverStatistics::default(),
        }
    }

    pub fn with_statistics(mut self, statistics: SolverStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn value(&self, variable: VariableId) -> f64 {
        self.variable_values
            .get(variable.index())
            .copied()
            .unwrap_or(0.0)
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_vars() -> (OptimizationProblem, VariableId, VariableId) {
        let mut problem = OptimizationProblem::new().with_name("two");
        let x = problem.add_variable(Variable::continuous("x"));
        let y = problem.add_variable(Variable::binary("y"));
        (problem, x, y)
    }

    #[test]
    fn constraints_are_appended_in_order() {
        let (mut problem, x, y) = two_vars();
        let first = problem.add_constraint(
            LinearExpression::sum([x, y]),
            ConstraintType::LessThanOrEqual,
            4.0,
        );
        let second = problem.add_constraint(
            LinearExpression::new().with_term(x, 2.0),
            ConstraintType::GreaterThanOrEqual,
            1.0,
        );
        assert_eq!((first, second), (0, 1));
        assert_eq!(problem.num_constraints(), 2);
        assert!(problem.constraints[0].is_satisfied(&[3.0, 1.0], 1e-9));
        assert!(!problem.constraints[1].is_satisfied(&[0.25, 0.0], 1e-9));
    }

    #[test]
    fn last_objective_wins() {
        let (mut problem, x, y) = two_vars();
        problem.set_objective(LinearExpression::sum([x]), OptimizationType::Maximize);
        problem.set_objective(
            LinearExpression::new().with_term(y, 3.0),
            OptimizationType::Minimize,
        );
        let objective = problem.objective.as_ref().map(|o| o.optimization_type);
        assert_eq!(objective, Some(OptimizationType::Minimize));
        assert_eq!(problem.objective_value(&[10.0, 1.0]), 3.0);
    }

    #[test]
    fn counts_variable_kinds() {
        let (mut problem, _, _) = two_vars();
        problem.add_variable(Variable::integer("z").with_bounds(0.0, Some(9.0)));
        assert_eq!(problem.num_integer_variables(), 2);
        assert_eq!(problem.num_binary_variables(), 1);
        assert!(problem.is_mixed_integer());
        let stats = problem.statistics(1.5);
        assert_eq!((stats.num_integer_vars, stats.num_binary_vars), (1, 1));
    }

    #[test]
    fn dense_objective_merges_repeated_terms() {
        let objective = ObjectiveFunction::new(
            OptimizationType::Minimize,
            LinearExpression::new()
                .with_term(VariableId(1), 2.0)
                .with_term(VariableId(1), 0.5),
        );
        assert_eq!(objective.dense_coefficients(3), vec![0.0, 2.5, 0.0]);
    }

    #[test]
    fn constraint_display() {
        let c = Constraint::new(
            ConstraintType::GreaterThanOrEqual,
            LinearExpression::sum([VariableId(0), VariableId(2)]),
            1.0,
        )
        .with_name("cut");
        assert_eq!(c.to_string(), "cut: 1*x0 + 1*x2 >= 1");
    }
}
