use crate::utils::{norm_cdf, norm_pdf};
use ndarray::{Array1, ArrayView};
use nextpoint_gp::{CovarianceModel, GaussianProcess};

/// A structure for the closed-form single-point Expected Improvement
/// acquisition function.
///
/// The engine minimizes a cost: with posterior mean `mu`, standard
/// deviation `sigma` and current best observed value `fmin`,
///
/// `EI(x) = (fmin - mu) * CDF(z) + sigma * PDF(z)`, `z = (fmin - mu) / sigma`
///
/// EI is non-negative everywhere and tends to 0 as `sigma` vanishes.
pub struct ExpectedImprovement;

impl ExpectedImprovement {
    /// Compute EI at given `x` point using the posterior of `model`
    /// and the current minimum `fmin` of the objective function.
    pub fn value<C: CovarianceModel>(
        &self,
        x: &[f64],
        model: &GaussianProcess<C>,
        fmin: f64,
    ) -> f64 {
        let pt = ArrayView::from_shape((1, x.len()), x).unwrap();
        match model.predict_valvar(&pt) {
            Ok((p, s)) => {
                if s[0] < f64::EPSILON {
                    0.0
                } else {
                    let sigma = s[0].sqrt();
                    let z = (fmin - p[0]) / sigma;
                    (fmin - p[0]) * norm_cdf(z) + sigma * norm_pdf(z)
                }
            }
            _ => 0.0,
        }
    }

    /// Compute the derivatives of EI with respect to the components of `x`.
    ///
    /// The closed form reduces to `-dmu * CDF(z) + dsigma * PDF(z)`; the
    /// terms in `dz` cancel out.
    pub fn grad<C: CovarianceModel>(
        &self,
        x: &[f64],
        model: &GaussianProcess<C>,
        fmin: f64,
    ) -> Array1<f64> {
        let pt = ArrayView::from_shape((1, x.len()), x).unwrap();
        match model.predict_valvar(&pt) {
            Ok((p, s)) => {
                if s[0] < f64::EPSILON {
                    Array1::zeros(x.len())
                } else {
                    let sigma = s[0].sqrt();
                    let z = (fmin - p[0]) / sigma;
                    match model.predict_valvar_gradients(&pt) {
                        Ok((dmu, dvar)) => {
                            let dmu = dmu.row(0);
                            let dsigma = dvar.row(0).mapv(|v| v / (2. * sigma));
                            dmu.mapv(|v| -v * norm_cdf(z)) + dsigma.mapv(|v| v * norm_pdf(z))
                        }
                        _ => Array1::zeros(x.len()),
                    }
                }
            }
            _ => Array1::zeros(x.len()),
        }
    }
}

/// Expected Improvement acquisition criterion
pub const EI: ExpectedImprovement = ExpectedImprovement {};
