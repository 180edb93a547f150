//! Acquisition optimizer configuration.

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Parameters of the multistart gradient ascent used to maximize the
/// acquisition function. A plain configuration record, not a stateful
/// object.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct OptimParams {
    /// Number of restarts of the multistart approach
    pub n_start: usize,
    /// Maximum number of ascent iterations per restart
    pub max_iters: usize,
    /// Gradient norm below which a restart is considered converged
    pub gtol: f64,
    /// Initial step length of the ascent
    pub init_step: f64,
    /// Step length below which backtracking gives up
    pub min_step: f64,
}

impl Default for OptimParams {
    fn default() -> Self {
        OptimParams {
            n_start: 20,
            max_iters: 100,
            gtol: 1e-6,
            init_step: 0.1,
            min_step: 1e-10,
        }
    }
}

impl OptimParams {
    /// Sets the number of restarts
    pub fn n_start(mut self, n_start: usize) -> Self {
        self.n_start = n_start;
        self
    }

    /// Sets the maximum number of ascent iterations per restart
    pub fn max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Sets the gradient norm tolerance
    pub fn gtol(mut self, gtol: f64) -> Self {
        self.gtol = gtol;
        self
    }

    /// Sets the initial step length
    pub fn init_step(mut self, init_step: f64) -> Self {
        self.init_step = init_step;
        self
    }
}
