//! Multistart gradient ascent of the acquisition function over the
//! bounded domain.

use crate::config::OptimParams;
use crate::criteria::EI;
use crate::domain::Domain;
use crate::errors::{NextPointsError, Result};
use linfa_linalg::norm::*;
use ndarray::{Array1, ArrayBase, Data, Ix1};
use ndarray_rand::rand::Rng;
use nextpoint_gp::{CovarianceModel, GaussianProcess};
use rayon::prelude::*;

/// Maximizes the Expected Improvement of a model over a domain by
/// projected gradient ascent restarted from several random points.
///
/// Each restart follows the analytic EI gradient with a backtracking
/// step control and clamps every candidate back into the domain. The
/// restarts run in parallel; the best point is picked sequentially
/// afterwards so that a given seed always yields the same result.
pub(crate) struct InfillOptimizer<'a, C: CovarianceModel> {
    model: &'a GaussianProcess<C>,
    domain: &'a Domain,
    params: &'a OptimParams,
}

impl<'a, C: CovarianceModel> InfillOptimizer<'a, C> {
    pub fn new(
        model: &'a GaussianProcess<C>,
        domain: &'a Domain,
        params: &'a OptimParams,
    ) -> InfillOptimizer<'a, C> {
        InfillOptimizer {
            model,
            domain,
            params,
        }
    }

    /// Runs the multistart ascent and returns the best point found
    /// together with its EI value.
    ///
    /// Fails with `NoImprovementFound` carrying the best EI seen when no
    /// restart reaches a strictly positive EI.
    pub fn optimize<R: Rng>(&self, fmin: f64, rng: &mut R) -> Result<(Array1<f64>, f64)> {
        if self.params.n_start == 0 {
            return Err(NextPointsError::InvalidDomain(
                "n_start should be at least 1".to_string(),
            ));
        }
        let starts = self.domain.sample(self.params.n_start, rng);

        let candidates = (0..self.params.n_start)
            .into_par_iter()
            .map(|i| self.ascend_from(&starts.row(i), fmin))
            .collect::<Vec<_>>();

        // earliest restart wins ties, making results seed-deterministic
        let mut best = candidates[0].clone();
        for cand in candidates.iter().skip(1) {
            if cand.1 > best.1 + f64::EPSILON {
                best = cand.clone();
            }
        }

        if best.1 > 0. {
            log::debug!("Acquisition maximized: EI={} at {}", best.1, best.0);
            Ok(best)
        } else {
            Err(NextPointsError::NoImprovementFound(best.1))
        }
    }

    fn ascend_from(
        &self,
        start: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        fmin: f64,
    ) -> (Array1<f64>, f64) {
        let mut x = start.to_owned();
        let mut val = EI.value(x.as_slice().unwrap(), self.model, fmin);

        for _ in 0..self.params.max_iters {
            let g = EI.grad(x.as_slice().unwrap(), self.model, fmin);
            if g.norm_l2() < self.params.gtol {
                break;
            }

            // backtracking: halve the step until the clamped candidate
            // improves on the current value
            let mut step = self.params.init_step;
            let mut improved = false;
            while step >= self.params.min_step {
                let cand = self.domain.clamp(&(&x + &(&g * step)));
                let cand_val = EI.value(cand.as_slice().unwrap(), self.model, fmin);
                if cand_val > val {
                    x = cand;
                    val = cand_val;
                    improved = true;
                    break;
                }
                step *= 0.5;
            }
            if !improved {
                break;
            }
        }
        (x, val)
    }
}
