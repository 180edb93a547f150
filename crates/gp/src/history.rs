//! Historical observations of the objective function.

use crate::errors::{GpError, Result};
use ndarray::{concatenate, Array1, Array2, ArrayBase, Axis, Data, Ix1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A point sampled from the objective function together with its observed
/// value and the variance of the observation noise. Immutable once added
/// to a [`HistoricalData`] collection.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SamplePoint {
    /// Sampled coordinates
    pub point: Array1<f64>,
    /// Observed objective value
    pub value: f64,
    /// Observation noise variance (>= 0)
    pub noise_variance: f64,
}

impl SamplePoint {
    /// Constructor checking the noise variance is valid
    pub fn new(point: Array1<f64>, value: f64, noise_variance: f64) -> Result<Self> {
        check_noise_variance(noise_variance)?;
        Ok(SamplePoint {
            point,
            value,
            noise_variance,
        })
    }
}

fn check_noise_variance(noise_variance: f64) -> Result<()> {
    if !noise_variance.is_finite() || noise_variance < 0. {
        return Err(GpError::InvalidValue(format!(
            "noise variance should be positive, got {noise_variance}"
        )));
    }
    Ok(())
}

/// An ordered, append-only collection of sampled points used as GP
/// training data. Points are stored as the rows of an (n, dim) matrix.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct HistoricalData {
    points: Array2<f64>,
    values: Array1<f64>,
    noise_variances: Array1<f64>,
}

impl HistoricalData {
    /// An empty collection of `dim`-dimensional points
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(GpError::InvalidValue(
                "points should have at least one component".to_string(),
            ));
        }
        Ok(HistoricalData {
            points: Array2::zeros((0, dim)),
            values: Array1::zeros(0),
            noise_variances: Array1::zeros(0),
        })
    }

    /// Build a collection from a non-empty slice of samples,
    /// all of the same dimension
    pub fn from_samples(samples: &[SamplePoint]) -> Result<Self> {
        let dim = samples
            .first()
            .map(|s| s.point.len())
            .ok_or_else(|| GpError::InvalidValue("no sample point given".to_string()))?;
        let mut data = Self::new(dim)?;
        for s in samples {
            data.append(&s.point, s.value, s.noise_variance)?;
        }
        Ok(data)
    }

    /// Append an observation.
    ///
    /// Fails with `DimensionMismatch` when `point` has a wrong number of
    /// components and with `InvalidValue` on a negative noise variance.
    pub fn append(
        &mut self,
        point: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        value: f64,
        noise_variance: f64,
    ) -> Result<()> {
        if point.len() != self.dim() {
            return Err(GpError::DimensionMismatch {
                expected: self.dim(),
                actual: point.len(),
            });
        }
        check_noise_variance(noise_variance)?;
        self.points = concatenate![Axis(0), self.points.view(), point.view().insert_axis(Axis(0))];
        self.values = concatenate![Axis(0), self.values.view(), Array1::from_elem(1, value)];
        self.noise_variances = concatenate![
            Axis(0),
            self.noise_variances.view(),
            Array1::from_elem(1, noise_variance)
        ];
        Ok(())
    }

    /// Number of components of the sampled points
    pub fn dim(&self) -> usize {
        self.points.ncols()
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    /// Whether no observation was recorded yet
    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    /// Sampled points as an (n, dim) matrix
    pub fn points(&self) -> &Array2<f64> {
        &self.points
    }

    /// Observed values as an (n,) vector
    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Observation noise variances as an (n,) vector
    pub fn noise_variances(&self) -> &Array1<f64> {
        &self.noise_variances
    }

    /// Best (lowest) observed value, if any.
    /// The engine works with a minimization convention.
    pub fn best_value(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.values.fold(f64::INFINITY, |a, &b| a.min(b)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_append_and_accessors() {
        let mut data = HistoricalData::new(2).unwrap();
        assert!(data.is_empty());
        data.append(&array![0., 1.], 0.5, 0.01).unwrap();
        data.append(&array![1., 0.], 0.2, 0.).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.dim(), 2);
        assert_eq!(data.points(), &array![[0., 1.], [1., 0.]]);
        assert_eq!(data.values(), &array![0.5, 0.2]);
        assert_eq!(data.best_value(), Some(0.2));
    }

    #[test]
    fn test_append_dimension_mismatch() {
        let mut data = HistoricalData::new(2).unwrap();
        let res = data.append(&array![0.], 0.5, 0.01);
        assert!(matches!(
            res,
            Err(GpError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_negative_noise_rejected() {
        let mut data = HistoricalData::new(1).unwrap();
        assert!(data.append(&array![0.], 0.5, -0.01).is_err());
        assert!(SamplePoint::new(array![0.], 0.5, -1.).is_err());
    }

    #[test]
    fn test_from_samples() {
        let samples = vec![
            SamplePoint::new(array![0.], 0.1, 0.01).unwrap(),
            SamplePoint::new(array![1.], 0.2, 0.01).unwrap(),
        ];
        let data = HistoricalData::from_samples(&samples).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.best_value(), Some(0.1));
        assert!(HistoricalData::from_samples(&[]).is_err());
    }
}
