use crate::errors::{GpError, Result};
use crate::history::HistoricalData;
use crate::kernel::CovarianceModel;

use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{Array1, Array2, Array3, ArrayBase, Axis, Data, Ix1, Ix2};

use log::debug;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Derived quantities computed from the training covariance matrix,
/// reused by every posterior computation until the history changes.
#[derive(Debug)]
struct Factorization {
    /// Lower Cholesky factor of `K + diag(noise)`
    k_chol: Array2<f64>,
    /// `K^-1 y` as an (n, 1) column
    alpha: Array2<f64>,
}

/// A Gaussian process conditioned on noisy historical observations.
///
/// The model uses a zero prior mean; the posterior at query points `x` is
///
/// `mean(x) = Ks^T K^-1 y`
///
/// `cov(x, x') = k(x, x') - Ks^T K^-1 Ks'`
///
/// where `K` is the covariance matrix of the sampled points with each
/// observation noise variance added on its diagonal, and `Ks` the
/// cross-covariance between sampled and query points.
///
/// The factorization of `K` is an explicit cache owned by the model
/// instance: it is invalidated whenever an observation is appended and
/// recomputed lazily on the next read (an O(n^3) operation, acceptable
/// for the small histories this engine targets).
pub struct GaussianProcess<Corr: CovarianceModel> {
    corr: Corr,
    history: HistoricalData,
    cache: RwLock<Option<Arc<Factorization>>>,
}

impl<Corr: CovarianceModel> Clone for GaussianProcess<Corr> {
    fn clone(&self) -> Self {
        GaussianProcess {
            corr: self.corr.clone(),
            history: self.history.clone(),
            cache: RwLock::new(self.cache.read().unwrap().clone()),
        }
    }
}

impl<Corr: CovarianceModel> fmt::Display for GaussianProcess<Corr> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GP(corr={}, n={})", self.corr, self.history.len())
    }
}

impl<Corr: CovarianceModel> GaussianProcess<Corr> {
    /// Build a model from a kernel and at least one observation.
    ///
    /// The history is owned by the model for the duration of a run so that
    /// fabricated observations never pollute the caller's data.
    pub fn new(corr: Corr, history: HistoricalData) -> Result<Self> {
        if history.is_empty() {
            return Err(GpError::InvalidValue(
                "historical data should contain at least one sample".to_string(),
            ));
        }
        if corr.dim() != history.dim() {
            return Err(GpError::DimensionMismatch {
                expected: corr.dim(),
                actual: history.dim(),
            });
        }
        Ok(GaussianProcess {
            corr,
            history,
            cache: RwLock::new(None),
        })
    }

    /// The covariance model in use
    pub fn corr(&self) -> &Corr {
        &self.corr
    }

    /// The observations the model is conditioned on
    pub fn history(&self) -> &HistoricalData {
        &self.history
    }

    /// Number of components of the sampled points
    pub fn dim(&self) -> usize {
        self.history.dim()
    }

    /// Append an observation and invalidate the cached factorization.
    pub fn add_sample(
        &mut self,
        point: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        value: f64,
        noise_variance: f64,
    ) -> Result<()> {
        self.history.append(point, value, noise_variance)?;
        *self.cache.write().unwrap() = None;
        Ok(())
    }

    /// Force the computation of the covariance factorization, surfacing
    /// `SingularCovariance` before any prediction is attempted.
    pub fn precompute(&self) -> Result<()> {
        self.factorization().map(|_| ())
    }

    fn factorization(&self) -> Result<Arc<Factorization>> {
        if let Some(f) = self.cache.read().unwrap().as_ref() {
            return Ok(f.clone());
        }
        let n = self.history.len();
        debug!("Factorizing covariance matrix (n={n})");
        let mut k = self.corr.cross(self.history.points(), self.history.points())?;
        for (i, &nv) in self.history.noise_variances().iter().enumerate() {
            k[[i, i]] += nv;
        }
        let k_chol = k.cholesky()?;
        let y = self
            .history
            .values()
            .to_owned()
            .insert_axis(Axis(1));
        let rho = k_chol.solve_triangular(&y, UPLO::Lower)?;
        let alpha = k_chol.t().solve_triangular(&rho, UPLO::Upper)?;
        let f = Arc::new(Factorization { k_chol, alpha });
        *self.cache.write().unwrap() = Some(f.clone());
        Ok(f)
    }

    fn check_query(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Result<()> {
        if x.ncols() != self.dim() {
            return Err(GpError::DimensionMismatch {
                expected: self.dim(),
                actual: x.ncols(),
            });
        }
        Ok(())
    }

    /// Posterior mean values at m given `x` points specified as an
    /// (m, dim) matrix. Returns an (m,) vector.
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Result<Array1<f64>> {
        self.check_query(x)?;
        let f = self.factorization()?;
        let ks = self.corr.cross(self.history.points(), x)?;
        Ok(ks.t().dot(&f.alpha).remove_axis(Axis(1)))
    }

    /// Posterior variance values at m given `x` points specified as an
    /// (m, dim) matrix. Returns an (m,) vector.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Result<Array1<f64>> {
        Ok(self.predict_valvar(x)?.1)
    }

    /// Posterior mean and variance values at m given `x` points
    pub fn predict_valvar(
        &self,
        x: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    ) -> Result<(Array1<f64>, Array1<f64>)> {
        self.check_query(x)?;
        let f = self.factorization()?;
        let ks = self.corr.cross(self.history.points(), x)?;
        let mean = ks.t().dot(&f.alpha).remove_axis(Axis(1));

        let v = f.k_chol.solve_triangular(&ks, UPLO::Lower)?;
        let mut var = self.prior_diagonal(x)? - v.mapv(|e| e * e).sum_axis(Axis(0));
        // Variance might be slightly negative depending on machine
        // precision: set to zero in that case
        var.mapv_inplace(|e| e.max(0.));
        Ok((mean, var))
    }

    /// Posterior mean vector and full (m, m) posterior covariance matrix
    /// at m given `x` points
    pub fn posterior(
        &self,
        x: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    ) -> Result<(Array1<f64>, Array2<f64>)> {
        self.check_query(x)?;
        let f = self.factorization()?;
        let ks = self.corr.cross(self.history.points(), x)?;
        let mean = ks.t().dot(&f.alpha).remove_axis(Axis(1));

        let v = f.k_chol.solve_triangular(&ks, UPLO::Lower)?;
        let kqq = self.corr.cross(x, x)?;
        let cov = kqq - v.t().dot(&v);
        Ok((mean, cov))
    }

    /// Gradients of the posterior mean and variance with respect to the
    /// coordinates of each of the m query points, as two (m, dim) matrices.
    pub fn predict_valvar_gradients(
        &self,
        x: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    ) -> Result<(Array2<f64>, Array2<f64>)> {
        self.check_query(x)?;
        let f = self.factorization()?;
        let ks = self.corr.cross(self.history.points(), x)?;
        let v = f.k_chol.solve_triangular(&ks, UPLO::Lower)?;

        let m = x.nrows();
        let mut dmean = Array2::zeros((m, self.dim()));
        let mut dvar = Array2::zeros((m, self.dim()));
        for (r, xr) in x.rows().into_iter().enumerate() {
            let jac = self.corr.jacobian(&xr, self.history.points())?;
            dmean
                .row_mut(r)
                .assign(&jac.t().dot(&f.alpha).remove_axis(Axis(1)));
            let dv = f.k_chol.solve_triangular(&jac, UPLO::Lower)?;
            // d var / dx = -2 v^T dv, the prior diagonal being constant
            // for a stationary kernel
            dvar.row_mut(r).assign(&v.column(r).dot(&dv).mapv(|e| -2. * e));
        }
        Ok((dmean, dvar))
    }

    /// Derivative of the (m, m) posterior covariance matrix with respect
    /// to the coordinates of query point `index`, as a (dim, m, m) array.
    ///
    /// Only the row and column `index` of each derivative matrix are
    /// non-zero since the other entries do not depend on that point.
    pub fn posterior_cov_gradient(
        &self,
        x: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        index: usize,
    ) -> Result<Array3<f64>> {
        self.check_query(x)?;
        let m = x.nrows();
        if index >= m {
            return Err(GpError::InvalidValue(format!(
                "query point index {index} out of range for {m} points"
            )));
        }
        let f = self.factorization()?;
        let ks = self.corr.cross(self.history.points(), x)?;
        let v = f.k_chol.solve_triangular(&ks, UPLO::Lower)?;

        let xi = x.row(index);
        let jac_train = self.corr.jacobian(&xi, self.history.points())?;
        let dv_i = f.k_chol.solve_triangular(&jac_train, UPLO::Lower)?;
        let jac_q = self.corr.jacobian(&xi, x)?;

        let mut out = Array3::zeros((self.dim(), m, m));
        for d in 0..self.dim() {
            let mut dk = out.index_axis_mut(Axis(0), d);
            for j in 0..m {
                let val = if j == index {
                    // total derivative of k(x_i, x_i) and of the diagonal
                    // data-dependent term
                    2. * jac_q[[j, d]] - 2. * v.column(j).dot(&dv_i.column(d))
                } else {
                    jac_q[[j, d]] - v.column(j).dot(&dv_i.column(d))
                };
                dk[[index, j]] = val;
                dk[[j, index]] = val;
            }
        }
        Ok(out)
    }

    fn prior_diagonal(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Result<Array1<f64>> {
        let mut diag = Array1::zeros(x.nrows());
        for (i, r) in x.rows().into_iter().enumerate() {
            diag[i] = self.corr.value(&r, &r)?;
        }
        Ok(diag)
    }
}
