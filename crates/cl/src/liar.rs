//! Greedy batch selection with the Constant Liar heuristic.

use crate::config::OptimParams;
use crate::criteria::MonteCarloEi;
use crate::domain::Domain;
use crate::errors::{NextPointsError, Result};
use crate::optimizer::InfillOptimizer;
use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand::{Rng, SeedableRng};
use nextpoint_gp::{CovarianceModel, GaussianProcess, GpError, HistoricalData};
use rand_xoshiro::Xoshiro256Plus;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

const QEI_DIAGNOSTIC_DRAWS: usize = 1000;

/// A point chosen for the batch, with the diagnostics recorded at the
/// moment of its selection.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SelectedPoint {
    /// Selected sampling location
    pub point: Array1<f64>,
    /// Expected Improvement at selection time, under the lies already told
    pub ei: f64,
    /// Posterior variance of the model at the point at selection time
    pub variance: f64,
}

/// Whether the requested batch was filled completely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum BatchStatus {
    /// All requested points were selected
    Complete,
    /// Selection stopped early: the acquisition went flat and the
    /// remaining points could not be chosen meaningfully
    StoppedEarly,
}

/// Result of a batch selection run.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct BatchSelection {
    /// Selected points in selection order
    pub points: Vec<SelectedPoint>,
    /// Completion status of the run
    pub status: BatchStatus,
    /// Joint posterior covariance of the selected points under the final
    /// lied-to model, a (k, k) matrix where k is the number of points
    pub covariance: Array2<f64>,
}

impl BatchSelection {
    /// Selected locations stacked as a (k, dim) matrix
    pub fn points_matrix(&self) -> Array2<f64> {
        if self.points.is_empty() {
            return Array2::zeros((0, 0));
        }
        let dim = self.points[0].point.len();
        let mut mat = Array2::zeros((self.points.len(), dim));
        for (i, sel) in self.points.iter().enumerate() {
            mat.row_mut(i).assign(&sel.point);
        }
        mat
    }
}

/// Greedy batch point selector using the Constant Liar heuristic.
///
/// Parallel experiments need several points before any new objective
/// value comes back. After each point is selected by maximizing EI, the
/// selector pretends the objective there came out at a fixed `lie_value`
/// and refits a scratch copy of the model, pushing the next selection
/// away from the already chosen locations. The caller's historical data
/// is never modified.
///
/// ```no_run
/// # use ndarray::array;
/// # use nextpoint_cl::{ConstantLiar, Domain};
/// # use nextpoint_gp::{HistoricalData, SquaredExponentialCov};
/// let mut data = HistoricalData::new(1).unwrap();
/// data.append(&array![0.], 0.1, 0.01).unwrap();
/// data.append(&array![1.], 0.2, 0.01).unwrap();
/// let kernel = SquaredExponentialCov::isotropic(1., 0.5, 1).unwrap();
/// let domain = Domain::new(&array![[0., 1.]]).unwrap();
/// let batch = ConstantLiar::new(kernel, &data, &domain, 0.1)
///     .select(3)
///     .unwrap();
/// ```
pub struct ConstantLiar<'a, C: CovarianceModel, R: Rng> {
    corr: C,
    history: &'a HistoricalData,
    domain: &'a Domain,
    lie_value: f64,
    lie_noise_variance: f64,
    params: OptimParams,
    rng: R,
}

impl<'a, C: CovarianceModel> ConstantLiar<'a, C, Xoshiro256Plus> {
    /// Constructor of the selector with an entropy-seeded random source.
    ///
    /// `lie_value` is the objective value pretended at every selected
    /// point; a common choice is the best (minimum) observed value.
    pub fn new(
        corr: C,
        history: &'a HistoricalData,
        domain: &'a Domain,
        lie_value: f64,
    ) -> ConstantLiar<'a, C, Xoshiro256Plus> {
        Self::with_rng(corr, history, domain, lie_value, Xoshiro256Plus::from_entropy())
    }
}

impl<'a, C: CovarianceModel, R: Rng> ConstantLiar<'a, C, R> {
    /// Constructor with an explicit random source for reproducible runs
    pub fn with_rng(
        corr: C,
        history: &'a HistoricalData,
        domain: &'a Domain,
        lie_value: f64,
        rng: R,
    ) -> ConstantLiar<'a, C, R> {
        ConstantLiar {
            corr,
            history,
            domain,
            lie_value,
            lie_noise_variance: 0.,
            params: OptimParams::default(),
            rng,
        }
    }

    /// Sets the noise variance attached to each lie (0 by default)
    pub fn lie_noise_variance(mut self, lie_noise_variance: f64) -> Self {
        self.lie_noise_variance = lie_noise_variance;
        self
    }

    /// Sets the acquisition optimizer parameters
    pub fn optim_params(mut self, params: OptimParams) -> Self {
        self.params = params;
        self
    }

    /// Selects `q` points to sample next.
    ///
    /// Points are chosen one at a time; after each selection except the
    /// last, the lie is appended to the scratch model before the next
    /// acquisition maximization. When the acquisition goes flat midway
    /// the already selected points are returned with a
    /// [`StoppedEarly`](BatchStatus::StoppedEarly) status.
    pub fn select(&mut self, q: usize) -> Result<BatchSelection> {
        if q == 0 {
            return Err(NextPointsError::InvalidDomain(
                "num_samples_to_generate should be at least 1".to_string(),
            ));
        }
        if !(self.lie_noise_variance >= 0. && self.lie_noise_variance.is_finite()) {
            return Err(NextPointsError::InvalidDomain(format!(
                "lie noise variance should be finite and non-negative, got {}",
                self.lie_noise_variance
            )));
        }
        if self.history.dim() != self.domain.dim() {
            return Err(NextPointsError::GpError(GpError::DimensionMismatch {
                expected: self.domain.dim(),
                actual: self.history.dim(),
            }));
        }
        let mut fmin = self.history.best_value().ok_or_else(|| {
            NextPointsError::InvalidDomain(
                "historical data should contain at least one sample".to_string(),
            )
        })?;

        // scratch model fed with lies, the caller's data stays untouched
        let mut model = GaussianProcess::new(self.corr.clone(), self.history.clone())?;
        model.precompute()?;
        let base_model = model.clone();

        let params = self.params.clone();
        let mut points = Vec::with_capacity(q);
        let mut status = BatchStatus::Complete;
        for i in 0..q {
            let optimizer = InfillOptimizer::new(&model, self.domain, &params);
            match optimizer.optimize(fmin, &mut self.rng) {
                Ok((x, ei)) => {
                    let variance = model.predict_var(&x.view().insert_axis(Axis(0)))?[0];
                    log::debug!(
                        "Selected point {}/{q}: {x} (EI={ei}, variance={variance})",
                        i + 1
                    );
                    points.push(SelectedPoint {
                        point: x.clone(),
                        ei,
                        variance,
                    });
                    if i + 1 < q {
                        model.add_sample(&x, self.lie_value, self.lie_noise_variance)?;
                        model.precompute()?;
                        fmin = fmin.min(self.lie_value);
                    }
                }
                Err(NextPointsError::NoImprovementFound(best)) => {
                    log::info!(
                        "Acquisition went flat (best EI={best}) after {} of {q} points; \
                         stopping batch selection early",
                        points.len()
                    );
                    status = BatchStatus::StoppedEarly;
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        let selection = BatchSelection {
            covariance: self.batch_covariance(&model, &points)?,
            points,
            status,
        };
        self.log_batch_quality(&base_model, &selection);
        Ok(selection)
    }

    fn batch_covariance<M: CovarianceModel>(
        &self,
        model: &GaussianProcess<M>,
        points: &[SelectedPoint],
    ) -> Result<Array2<f64>> {
        if points.is_empty() {
            return Ok(Array2::zeros((0, 0)));
        }
        let mut mat = Array2::zeros((points.len(), self.domain.dim()));
        for (i, sel) in points.iter().enumerate() {
            mat.row_mut(i).assign(&sel.point);
        }
        let (_, cov) = model.posterior(&mat)?;
        Ok(cov)
    }

    /// Debug estimate of the joint improvement of the whole batch under
    /// the original model, before any lie was told. Purely informative:
    /// a failure here never fails the selection.
    fn log_batch_quality(&mut self, base_model: &GaussianProcess<C>, selection: &BatchSelection) {
        if selection.points.len() < 2 || !log::log_enabled!(log::Level::Debug) {
            return;
        }
        let Some(fmin) = self.history.best_value() else {
            return;
        };
        let batch = selection.points_matrix();
        let qei = MonteCarloEi::new(batch.nrows(), QEI_DIAGNOSTIC_DRAWS, &mut self.rng);
        match qei.value(&batch, base_model, fmin) {
            Ok(value) => log::debug!("Batch q-EI estimate: {value}"),
            Err(err) => log::debug!("Batch q-EI estimate unavailable: {err}"),
        }
    }
}
