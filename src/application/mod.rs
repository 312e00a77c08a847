// Application layer: the subtour-elimination use case and its gRPC surface

#[cfg(feature = "server")]
pub mod grpc_service;
#[cfg(feature = "server")]
pub mod mappers;
pub mod subtour_driver;

#[cfg(feature = "server")]
pub use grpc_service::GrpcTourSolverService;
pub use subtour_driver::{
    solve_tour, DriverConfig, DriverError, IterationReport, SubtourEliminationDriver, TourError,
    TourReport,
};
