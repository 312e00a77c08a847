// Mappers: Convert between gRPC protobuf types and domain models
// Keeps protobuf types out of the domain and the driver

use std::time::Duration;

use crate::application::subtour_driver::{DriverConfig, DriverError, IterationReport, TourReport};
use crate::domain::{DirectedArc, SolverBackend, TopologyError};
use tonic::Status;

pub mod tour_solver {
    tonic::include_proto!("tour_solver");
}

use tour_solver as proto;

/// Server-side defaults applied to fields a request leaves unset
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestDefaults {
    pub backend: SolverBackend,
    pub time_limit: Option<Duration>,
}

/// Domain view of one `TourProblem` request
#[derive(Debug, Clone)]
pub struct TourRequest {
    pub name: String,
    pub nodes: Vec<String>,
    pub arcs: Vec<DirectedArc>,
    pub backend: SolverBackend,
    pub time_limit: Option<Duration>,
    pub driver: DriverConfig,
}

/// Convert protobuf TourProblem to a domain request
pub fn proto_to_domain_request(
    proto_problem: proto::TourProblem,
    defaults: &RequestDefaults,
) -> std::result::Result<TourRequest, Box<Status>> {
    let arcs = proto_problem
        .arcs
        .into_iter()
        .map(|a| DirectedArc::new(a.tail, a.head, a.cost))
        .collect();

    let mut request = TourRequest {
        name: proto_problem.problem_name,
        nodes: proto_problem.nodes,
        arcs,
        backend: defaults.backend,
        time_limit: defaults.time_limit,
        driver: DriverConfig::default(),
    };

    if let Some(cfg) = proto_problem.solver_config {
        request.backend = match proto::solver_config::SolverBackend::try_from(cfg.solver) {
            Ok(proto::solver_config::SolverBackend::Auto) => defaults.backend,
            Ok(proto::solver_config::SolverBackend::Microlp) => SolverBackend::MicroLp,
            Ok(proto::solver_config::SolverBackend::CoinCbc) => SolverBackend::CoinCbc,
            Ok(proto::solver_config::SolverBackend::Highs) => SolverBackend::Highs,
            Err(_) => return Err(Box::new(Status::invalid_argument("Invalid solver backend"))),
        };

        let limit = Duration::try_from_secs_f64(cfg.time_limit).map_err(|e| {
            Box::new(Status::invalid_argument(format!(
                "time_limit must be a non-negative number of seconds: {}",
                e
            )))
        })?;
        if !limit.is_zero() {
            request.time_limit = Some(limit);
        }
        if cfg.max_iterations > 0 {
            request.driver = request.driver.with_max_iterations(cfg.max_iterations as usize);
        }
    }

    Ok(request)
}

fn cycles_to_proto(cycles: &[Vec<String>]) -> Vec<proto::Cycle> {
    cycles
        .iter()
        .map(|nodes| proto::Cycle {
            nodes: nodes.clone(),
        })
        .collect()
}

/// Convert one driver iteration to protobuf
pub fn iteration_to_proto(report: &IterationReport) -> proto::IterationReport {
    proto::IterationReport {
        iteration: report.iteration as u32,
        cycles: cycles_to_proto(&report.cycles),
        objective_value: report.objective_value,
        cuts_added: report.cuts_added as u32,
        num_constraints: report.num_constraints as u32,
    }
}

/// Convert a converged run to protobuf
pub fn tour_report_to_proto(report: TourReport) -> proto::TourResult {
    proto::TourResult {
        status: proto::TourStatus::Converged as i32,
        message: format!(
            "Tour over {} nodes found after {} iteration(s)",
            report.tour.len(),
            report.iterations
        ),
        tour: report.tour,
        total_cost: Some(report.total_cost),
        iterations: report.iterations as u32,
        history: report.history.iter().map(iteration_to_proto).collect(),
        last_decomposition: Vec::new(),
        solver_backend: report.solver,
    }
}

/// Convert a failed run to protobuf; no tour is included
pub fn driver_error_to_proto(
    error: &DriverError,
    history: &[IterationReport],
    solver_name: &str,
) -> proto::TourResult {
    let status = match error {
        DriverError::Exhausted { .. } => proto::TourStatus::Exhausted,
        DriverError::Unbounded { .. } => proto::TourStatus::Unbounded,
        DriverError::SolverUnavailable { .. } | DriverError::NotPermutation { .. } => {
            proto::TourStatus::SolverError
        }
        DriverError::IterationLimit { .. } => proto::TourStatus::IterationLimit,
    };

    proto::TourResult {
        status: status as i32,
        tour: Vec::new(),
        total_cost: None,
        iterations: error.iteration() as u32,
        history: history.iter().map(iteration_to_proto).collect(),
        last_decomposition: error
            .last_decomposition()
            .map(cycles_to_proto)
            .unwrap_or_default(),
        message: error.to_string(),
        solver_backend: solver_name.to_string(),
    }
}

/// Convert a rejected input graph to protobuf
pub fn topology_error_to_proto(error: &TopologyError, solver_name: &str) -> proto::TourResult {
    proto::TourResult {
        status: proto::TourStatus::InvalidTopology as i32,
        message: error.to_string(),
        solver_backend: solver_name.to_string(),
        ..Default::default()
    }
}

/// A run cut short by its deadline is reported like an infeasible one
pub fn time_limit_result(limit: Duration, solver_name: &str) -> proto::TourResult {
    proto::TourResult {
        status: proto::TourStatus::Exhausted as i32,
        message: format!("time limit of {:.3}s expired", limit.as_secs_f64()),
        solver_backend: solver_name.to_string(),
        ..Default::default()
    }
}
