//! A module for covariance models used as GP kernels.
//!
//! A covariance model is a positive-definite similarity measure between
//! points of the sampling space, parameterized by a signal variance and
//! per-dimension length scales.

use crate::errors::{GpError, Result};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trait for using a covariance model in GP posterior computations
pub trait CovarianceModel: Clone + fmt::Display + Sync {
    /// Number of components of the points this kernel operates on
    fn dim(&self) -> usize;

    /// Compute covariance between points `x1` and `x2`.
    ///
    /// Fails with `DimensionMismatch` when either point disagrees
    /// with the kernel dimension.
    fn value(
        &self,
        x1: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        x2: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    ) -> Result<f64>;

    /// Compute the gradient of `value(x, xtrain_i)` with respect to `x`
    /// for every row `i` of the `xtrain` (n, dim) matrix.
    /// Returns an (n, dim) matrix.
    fn jacobian(
        &self,
        x: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    ) -> Result<Array2<f64>>;

    /// Compute the cross-covariance matrix between two point sets given as
    /// (n, dim) and (m, dim) matrices, as an (n, m) matrix.
    fn cross(
        &self,
        x: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        y: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    ) -> Result<Array2<f64>> {
        let mut k = Array2::zeros((x.nrows(), y.nrows()));
        for (i, xi) in x.rows().into_iter().enumerate() {
            for (j, yj) in y.rows().into_iter().enumerate() {
                k[[i, j]] = self.value(&xi, &yj)?;
            }
        }
        Ok(k)
    }
}

/// Squared exponential covariance model
///
/// `cov(x1, x2) = sigma2 * exp(-0.5 * sum_d ((x1_d - x2_d) / l_d)^2)`
///
/// where `sigma2` is the signal variance and `l` the per-dimension
/// length scales.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SquaredExponentialCov {
    sigma2: f64,
    length_scales: Array1<f64>,
}

impl SquaredExponentialCov {
    /// Constructor given a signal variance and per-dimension length scales.
    ///
    /// Fails with `InvalidValue` when `sigma2` is negative or any length
    /// scale is not strictly positive.
    pub fn new(sigma2: f64, length_scales: Array1<f64>) -> Result<Self> {
        if !sigma2.is_finite() || sigma2 < 0. {
            return Err(GpError::InvalidValue(format!(
                "signal variance should be positive, got {sigma2}"
            )));
        }
        if length_scales.is_empty() || length_scales.iter().any(|&l| !l.is_finite() || l <= 0.) {
            return Err(GpError::InvalidValue(format!(
                "length scales should be strictly positive, got {length_scales}"
            )));
        }
        Ok(SquaredExponentialCov {
            sigma2,
            length_scales,
        })
    }

    /// Constructor with the same length scale along every dimension
    pub fn isotropic(sigma2: f64, length_scale: f64, dim: usize) -> Result<Self> {
        Self::new(sigma2, Array1::from_elem(dim, length_scale))
    }

    /// Signal variance
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Per-dimension length scales
    pub fn length_scales(&self) -> &Array1<f64> {
        &self.length_scales
    }

    fn check_dim(&self, actual: usize) -> Result<()> {
        if actual != self.dim() {
            return Err(GpError::DimensionMismatch {
                expected: self.dim(),
                actual,
            });
        }
        Ok(())
    }
}

impl CovarianceModel for SquaredExponentialCov {
    fn dim(&self) -> usize {
        self.length_scales.len()
    }

    fn value(
        &self,
        x1: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        x2: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    ) -> Result<f64> {
        self.check_dim(x1.len())?;
        self.check_dim(x2.len())?;
        let mut r = 0.;
        for ((&a, &b), &l) in x1.iter().zip(x2.iter()).zip(self.length_scales.iter()) {
            let d = (a - b) / l;
            r += d * d;
        }
        Ok(self.sigma2 * (-0.5 * r).exp())
    }

    fn jacobian(
        &self,
        x: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    ) -> Result<Array2<f64>> {
        self.check_dim(x.len())?;
        self.check_dim(xtrain.ncols())?;
        let mut jac = Array2::zeros((xtrain.nrows(), self.dim()));
        for (i, t) in xtrain.rows().into_iter().enumerate() {
            let k = self.value(x, &t)?;
            for (d, &l) in self.length_scales.iter().enumerate() {
                jac[[i, d]] = -k * (x[d] - t[d]) / (l * l);
            }
        }
        Ok(jac)
    }
}

impl fmt::Display for SquaredExponentialCov {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SquaredExponential(sigma2={}, l={})",
            self.sigma2, self.length_scales
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use finitediff::FiniteDiff;
    use ndarray::array;

    #[test]
    fn test_value() {
        let kern = SquaredExponentialCov::new(2., array![0.5]).unwrap();
        let expected = 2. * (-2.0_f64).exp();
        assert_abs_diff_eq!(
            expected,
            kern.value(&array![0.], &array![1.]).unwrap(),
            epsilon = 1e-12
        );
        // covariance of a point with itself is the signal variance
        assert_abs_diff_eq!(
            2.,
            kern.value(&array![0.3], &array![0.3]).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_dimension_mismatch() {
        let kern = SquaredExponentialCov::isotropic(1., 1., 2).unwrap();
        let res = kern.value(&array![0.], &array![0., 1.]);
        assert!(matches!(
            res,
            Err(GpError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_bad_hyperparameters() {
        assert!(SquaredExponentialCov::new(-1., array![1.]).is_err());
        assert!(SquaredExponentialCov::new(1., array![0.]).is_err());
        assert!(SquaredExponentialCov::new(1., array![]).is_err());
    }

    #[test]
    fn test_jacobian() {
        let kern = SquaredExponentialCov::new(1.5, array![0.7, 1.3]).unwrap();
        let xtrain = array![[0., 0.], [1., -0.5], [0.2, 0.8]];
        let x = vec![0.3, 0.4];

        let jac = kern
            .jacobian(&Array1::from(x.clone()), &xtrain)
            .unwrap();

        for i in 0..xtrain.nrows() {
            let t = xtrain.row(i).to_owned();
            let f = |x: &Vec<f64>| kern.value(&Array1::from(x.clone()), &t).unwrap();
            let grad_central = x.central_diff(&f);
            assert_abs_diff_eq!(jac[[i, 0]], grad_central[0], epsilon = 1e-6);
            assert_abs_diff_eq!(jac[[i, 1]], grad_central[1], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_cross() {
        let kern = SquaredExponentialCov::isotropic(1., 1., 1).unwrap();
        let x = array![[0.], [1.]];
        let k = kern.cross(&x, &x).unwrap();
        assert_abs_diff_eq!(k[[0, 0]], 1., epsilon = 1e-12);
        assert_abs_diff_eq!(k[[0, 1]], k[[1, 0]], epsilon = 1e-12);
    }
}
