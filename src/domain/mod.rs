// Domain module: models, routing and the solver contract

pub mod cycles;
pub mod models;
pub mod routing;
pub mod solver_service;
pub mod value_objects;

pub use models::*;
pub use routing::*;
pub use solver_service::*;
pub use value_objects::*;
