use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

use super::mappers::{self, tour_solver as proto, RequestDefaults, TourRequest};
use super::subtour_driver::SubtourEliminationDriver;
use crate::domain::{RoutingModel, SolverBackend, SolverService};
use crate::solver::SolverFactory;

type EventSender = mpsc::Sender<Result<proto::TourEvent, Status>>;

/// gRPC service implementation
///
/// Each run owns its model and executes on a blocking worker, so
/// concurrent requests never share solver state.
pub struct GrpcTourSolverService {
    defaults: RequestDefaults,
}

impl GrpcTourSolverService {
    pub fn new(default_backend: SolverBackend, default_time_limit: Option<Duration>) -> Self {
        Self {
            defaults: RequestDefaults {
                backend: default_backend,
                time_limit: default_time_limit,
            },
        }
    }

    fn prepare(
        &self,
        request: Request<proto::TourProblem>,
    ) -> Result<(TourRequest, Arc<dyn SolverService>), Status> {
        let request = mappers::proto_to_domain_request(request.into_inner(), &self.defaults)
            .map_err(|e| *e)?;
        let solver = SolverFactory::create_from_backend(request.backend)
            .map_err(|e| Status::failed_precondition(e.to_string()))?;

        log::info!(
            "solving tour '{}' ({} nodes, {} arcs) with {}",
            request.name,
            request.nodes.len(),
            request.arcs.len(),
            solver.name()
        );
        Ok((request, solver))
    }
}

impl Default for GrpcTourSolverService {
    fn default() -> Self {
        Self::new(SolverBackend::Auto, None)
    }
}

/// Build and drive one model synchronously; `cancel` stops the run
/// before its next solve.
fn execute(
    request: TourRequest,
    solver: Arc<dyn SolverService>,
    events: Option<EventSender>,
    cancel: Arc<AtomicBool>,
) -> proto::TourResult {
    let solver_name = solver.name().to_string();
    let model = match RoutingModel::create(&request.nodes, &request.arcs) {
        Ok(model) => model,
        Err(e) => {
            log::warn!("tour '{}' rejected: {}", request.name, e);
            return mappers::topology_error_to_proto(&e, &solver_name);
        }
    };

    let mut driver = SubtourEliminationDriver::new(model, solver)
        .with_config(request.driver)
        .with_cancel_flag(cancel.clone());
    let outcome = driver.run_with(|report| {
        if cancel.load(Ordering::Acquire) {
            return;
        }
        if let Some(tx) = &events {
            let event = proto::TourEvent {
                event: Some(proto::tour_event::Event::Iteration(
                    mappers::iteration_to_proto(report),
                )),
            };
            // A dropped receiver only means the client stopped listening
            let _ = tx.blocking_send(Ok(event));
        }
    });

    match outcome {
        Ok(report) => mappers::tour_report_to_proto(report),
        Err(e) => mappers::driver_error_to_proto(&e, driver.history(), &solver_name),
    }
}

/// Run `execute` on a blocking worker, bounded by the request's time limit.
///
/// On expiry the worker is cancelled. A streaming run also waits for the
/// worker to stop so no iteration event can follow the final result.
async fn run_blocking(
    request: TourRequest,
    solver: Arc<dyn SolverService>,
    events: Option<EventSender>,
) -> Result<proto::TourResult, Status> {
    let solver_name = solver.name().to_string();
    let time_limit = request.time_limit;
    let streaming = events.is_some();
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    let mut task = tokio::task::spawn_blocking(move || execute(request, solver, events, flag));

    let joined = match time_limit {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                log::warn!("run with {} exceeded {:?}", solver_name, limit);
                cancel.store(true, Ordering::Release);
                if streaming {
                    let _ = task.await;
                }
                return Ok(mappers::time_limit_result(limit, &solver_name));
            }
        },
        None => task.await,
    };

    joined.map_err(|e| Status::internal(format!("solver task failed: {}", e)))
}

#[tonic::async_trait]
impl proto::tour_solver_server::TourSolver for GrpcTourSolverService {
    async fn solve_tour(
        &self,
        request: Request<proto::TourProblem>,
    ) -> Result<Response<proto::TourResult>, Status> {
        let (request, solver) = self.prepare(request)?;
        let result = run_blocking(request, solver, None).await?;
        Ok(Response::new(result))
    }

    type SolveTourStreamStream = ReceiverStream<Result<proto::TourEvent, Status>>;

    async fn solve_tour_stream(
        &self,
        request: Request<proto::TourProblem>,
    ) -> Result<Response<Self::SolveTourStreamStream>, Status> {
        let (request, solver) = self.prepare(request)?;
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            let result = run_blocking(request, solver, Some(tx.clone())).await;
            let event = result.map(|r| proto::TourEvent {
                event: Some(proto::tour_event::Event::Result(r)),
            });
            let _ = tx.send(event).await;
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn validate_tour(
        &self,
        request: Request<proto::TourProblem>,
    ) -> Result<Response<proto::ValidationResult>, Status> {
        let request = mappers::proto_to_domain_request(request.into_inner(), &self.defaults)
            .map_err(|e| *e)?;

        let result = match RoutingModel::create(&request.nodes, &request.arcs) {
            Ok(model) => proto::ValidationResult {
                is_valid: true,
                errors: Vec::new(),
                num_nodes: model.num_nodes() as u32,
                num_arcs: model.num_arcs() as u32,
                num_variables: model.problem().num_variables() as u32,
                num_constraints: model.num_constraints() as u32,
            },
            Err(e) => proto::ValidationResult {
                is_valid: false,
                errors: vec![e.to_string()],
                num_nodes: request.nodes.len() as u32,
                num_arcs: request.arcs.len() as u32,
                num_variables: 0,
                num_constraints: 0,
            },
        };

        Ok(Response::new(result))
    }

    async fn get_available_solvers(
        &self,
        _request: Request<proto::Empty>,
    ) -> Result<Response<proto::AvailableSolvers>, Status> {
        let solvers = SolverFactory::available_backends()
            .into_iter()
            .filter_map(|backend| SolverFactory::create_from_backend(backend).ok())
            .map(|solver| proto::SolverInfo {
                name: solver.name().to_string(),
                supports_mip: solver.supports_mip(),
                capabilities: vec![
                    "Mixed-Integer Programming".to_string(),
                    "Subtour Elimination".to_string(),
                ],
            })
            .collect();

        Ok(Response::new(proto::AvailableSolvers { solvers }))
    }
}
