use crate::domain::{
    solver_service::{Result, SolverError, SolverService},
    value_objects::SolverBackend,
};
use crate::solver::MicroLpSolver;
#[cfg(feature = "coin_cbc")]
use crate::solver::CoinCbcSolver;
#[cfg(feature = "highs")]
use crate::solver::HighsSolver;
use std::sync::Arc;

/// Factory for creating solver instances based on configuration
pub struct SolverFactory;

impl SolverFactory {
    /// Create a solver for a specific backend
    ///
    /// Backends whose feature is not compiled in report `SolverNotAvailable`.
    pub fn create_from_backend(backend: SolverBackend) -> Result<Arc<dyn SolverService>> {
        match backend {
            SolverBackend::Auto => Ok(Self::default_solver()),
            SolverBackend::MicroLp => Ok(Arc::new(MicroLpSolver::new())),
            #[cfg(feature = "coin_cbc")]
            SolverBackend::CoinCbc => Ok(Arc::new(CoinCbcSolver::new())),
            #[cfg(feature = "highs")]
            SolverBackend::Highs => Ok(Arc::new(HighsSolver::new())),
            #[allow(unreachable_patterns)]
            other => Err(SolverError::SolverNotAvailable(format!(
                "{} support is not compiled into this build",
                other
            ))),
        }
    }

    /// Get the default solver: HiGHS, then CBC, then microlp
    #[cfg(feature = "highs")]
    pub fn default_solver() -> Arc<dyn SolverService> {
        Arc::new(HighsSolver::new())
    }

    /// Get the default solver: HiGHS, then CBC, then microlp
    #[cfg(all(feature = "coin_cbc", not(feature = "highs")))]
    pub fn default_solver() -> Arc<dyn SolverService> {
        Arc::new(CoinCbcSolver::new())
    }

    /// Get the default solver: HiGHS, then CBC, then microlp
    #[cfg(not(any(feature = "coin_cbc", feature = "highs")))]
    pub fn default_solver() -> Arc<dyn SolverService> {
        Arc::new(MicroLpSolver::new())
    }

    /// Backends usable in this build, `Auto` excluded
    pub fn available_backends() -> Vec<SolverBackend> {
        let mut backends = vec![SolverBackend::MicroLp];
        if cfg!(feature = "coin_cbc") {
            backends.push(SolverBackend::CoinCbc);
        }
        if cfg!(feature = "highs") {
            backends.push(SolverBackend::Highs);
        }
        backends
    }
}
