// Domain layer: models, routing topology and the solver contract
pub mod domain;

// Application layer: subtour elimination and the gRPC service
pub mod application;

// Infrastructure layer: External concerns (gRPC, server)
#[cfg(feature = "server")]
pub mod infrastructure;

// Solver adapters: Concrete implementations of SolverService
pub mod solver;

// Re-export commonly used types
pub use domain::{
    Constraint, ConstraintType, DirectedArc, DriverState, LinearExpression, ObjectiveFunction,
    OptimizationProblem, OptimizationType, RoutingModel, Solution, SolutionStatus, SolverBackend,
    SolverError, SolverService, TopologyError, Variable, VariableId, VariableType,
};

pub use application::{
    solve_tour, DriverConfig, DriverError, IterationReport, SubtourEliminationDriver, TourError,
    TourReport,
};

#[cfg(feature = "server")]
pub use application::GrpcTourSolverService;

#[cfg(feature = "server")]
pub use infrastructure::{start_server, ServerConfig};

pub use solver::{MicroLpSolver, SolverFactory};

#[cfg(feature = "coin_cbc")]
pub use solver::CoinCbcSolver;

#[cfg(feature = "highs")]
pub use solver::HighsSolver;
