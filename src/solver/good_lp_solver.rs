// Shared translation of domain problems into good_lp models
// Every good_lp backend (microlp, CBC) goes through `solve_with`

use crate::domain::{
    models::{OptimizationProblem, Solution as DomainSolution},
    solver_service::{Result, SolverError},
    value_objects::{
        ConstraintType, OptimizationType, SolutionStatus as DomainSolutionStatus, VariableType,
    },
    LinearExpression,
};
use good_lp::{
    solvers::Solver, variable, variables, Expression, ResolutionError,
    Solution as GoodLpSolutionTrait, SolverModel, Variable as GoodLpVariable,
};
use std::time::Instant;

fn to_expression(expression: &LinearExpression, lp_variables: &[GoodLpVariable]) -> Expression {
    let mut lhs: Expression = 0.into();
    for &(var, coeff) in expression.terms() {
        if coeff != 0.0 {
            lhs += coeff * lp_variables[var.index()];
        }
    }
    lhs
}

/// Build `problem` for the good_lp backend `solver` and solve it.
///
/// The problem must already have passed `SolverService::validate`.
pub(crate) fn solve_with<S>(problem: &OptimizationProblem, solver: S) -> Result<DomainSolution>
where
    S: Solver,
    S::Model: SolverModel<Error = ResolutionError>,
{
    let objective = problem
        .objective
        .as_ref()
        .ok_or_else(|| SolverError::InvalidProblem("Problem has no objective".to_string()))?;

    let start_time = Instant::now();

    let mut vars = variables!();
    let mut lp_variables: Vec<GoodLpVariable> = Vec::with_capacity(problem.num_variables());

    for var_def in problem.variables.iter() {
        let lower = var_def.lower_bound;
        let upper = var_def.upper_bound.unwrap_or(f64::INFINITY);

        let var = match var_def.variable_type {
            VariableType::Binary => vars.add(variable().binary()),
            VariableType::Integer => vars.add(variable().integer().min(lower).max(upper)),
            VariableType::Continuous => vars.add(variable().min(lower).max(upper)),
        };
        lp_variables.push(var);
    }

    let obj_expr = to_expression(&objective.expression, &lp_variables);
    let unsolved = match objective.optimization_type {
        OptimizationType::Minimize => vars.minimise(obj_expr),
        OptimizationType::Maximize => vars.maximise(obj_expr),
    };

    let mut lp_model = unsolved.using(solver);

    for constraint in &problem.constraints {
        let lhs = to_expression(&constraint.expression, &lp_variables);

        lp_model = match constraint.constraint_type {
            ConstraintType::LessThanOrEqual => lp_model.with(lhs.leq(constraint.bound)),
            ConstraintType::Equal => lp_model.with(lhs.eq(constraint.bound)),
            ConstraintType::GreaterThanOrEqual => lp_model.with(lhs.geq(constraint.bound)),
        };
    }

    let solution_result = lp_model.solve();
    let statistics = problem.statistics(start_time.elapsed().as_secs_f64() * 1000.0);

    match solution_result {
        Ok(sol) => {
            let variable_values: Vec<f64> =
                lp_variables.iter().map(|&var| sol.value(var)).collect();
            let actual_obj = problem.objective_value(&variable_values);

            let mut solution = DomainSolution::optimal(actual_obj, variable_values);
            solution.statistics = statistics;
            solution.message = format!("Optimal solution found for '{}'", problem.name);
            Ok(solution)
        }
        Err(ResolutionError::Infeasible) => Ok(DomainSolution::new(
            DomainSolutionStatus::Infeasible,
            "no solution satisfies all constraints",
        )
        .with_statistics(statistics)),
        Err(ResolutionError::Unbounded) => Ok(DomainSolution::new(
            DomainSolutionStatus::Unbounded,
            "objective can be improved infinitely",
        )
        .with_statistics(statistics)),
        Err(e) => Err(SolverError::ExecutionFailed(format!("{:?}", e))),
    }
}
