//! Bounded sampling domain definition.

use crate::errors::{NextPointsError, Result};
use ndarray::{Array, Array1, Array2, ArrayBase, Data, Ix1, Ix2};
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

/// A bounded region of the sampling space given as a (nx, 2) matrix:
/// the ith row is the `[lower_bound, upper_bound]` interval of the ith
/// component of a point `x`. Immutable for the duration of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct Domain {
    xlimits: Array2<f64>,
}

impl Domain {
    /// Constructor given a (nx, 2) bounds matrix
    /// `[[lower bound, upper bound], ...]`.
    ///
    /// Fails with `InvalidDomain` naming the offending dimension when a
    /// bound is not finite or when `lower > upper`.
    pub fn new(xlimits: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Result<Self> {
        if xlimits.ncols() != 2 || xlimits.nrows() == 0 {
            return Err(NextPointsError::InvalidDomain(format!(
                "xlimits should be a non-empty (nx, 2) matrix, got ({}, {})",
                xlimits.nrows(),
                xlimits.ncols()
            )));
        }
        for (i, row) in xlimits.rows().into_iter().enumerate() {
            let (lo, hi) = (row[0], row[1]);
            if !lo.is_finite() || !hi.is_finite() {
                return Err(NextPointsError::InvalidDomain(format!(
                    "bounds of dimension {i} should be finite, got [{lo}, {hi}]"
                )));
            }
            if lo > hi {
                return Err(NextPointsError::InvalidDomain(format!(
                    "lower bound of dimension {i} exceeds its upper bound: [{lo}, {hi}]"
                )));
            }
        }
        Ok(Domain {
            xlimits: xlimits.to_owned(),
        })
    }

    /// Number of components of the domain points
    pub fn dim(&self) -> usize {
        self.xlimits.nrows()
    }

    /// Domain bounds as a (nx, 2) matrix
    pub fn xlimits(&self) -> &Array2<f64> {
        &self.xlimits
    }

    /// Whether every component of `x` lies within its bounds.
    /// A point of the wrong dimension is never inside.
    pub fn is_inside(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> bool {
        x.len() == self.dim()
            && x.iter()
                .zip(self.xlimits.rows())
                .all(|(&v, b)| b[0] <= v && v <= b[1])
    }

    /// Project each out-of-bounds component of `x` to its nearest bound
    pub fn clamp(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Array1<f64> {
        x.iter()
            .zip(self.xlimits.rows())
            .map(|(&v, b)| v.max(b[0]).min(b[1]))
            .collect()
    }

    /// Draw `n` points uniformly within the bounds as an (n, nx) matrix,
    /// using the given random generator for reproducibility
    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Array2<f64> {
        let norm = Array::random_using((n, self.dim()), Uniform::new(0., 1.), rng);
        let lo = self.xlimits.column(0);
        let hi = self.xlimits.column(1);
        norm * (&hi - &lo) + lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray_rand::rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn test_invalid_bounds() {
        let res = Domain::new(&array![[0., 1.], [2., 1.]]);
        match res {
            Err(NextPointsError::InvalidDomain(msg)) => {
                assert!(msg.contains("dimension 1"), "{msg}")
            }
            _ => panic!("expected InvalidDomain"),
        }
        assert!(Domain::new(&array![[0., f64::NAN]]).is_err());
        assert!(Domain::new(&Array2::<f64>::zeros((0, 2))).is_err());
    }

    #[test]
    fn test_is_inside_and_clamp() {
        let domain = Domain::new(&array![[0., 1.], [5., 10.]]).unwrap();
        assert!(domain.is_inside(&array![0.5, 7.]));
        assert!(!domain.is_inside(&array![1.5, 7.]));
        assert!(!domain.is_inside(&array![0.5]));
        assert_eq!(domain.clamp(&array![1.5, 4.]), array![1., 5.]);
        assert_eq!(domain.clamp(&array![0.5, 7.]), array![0.5, 7.]);
    }

    #[test]
    fn test_sample_within_bounds() {
        let domain = Domain::new(&array![[5., 10.], [0., 1.]]).unwrap();
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let samples = domain.sample(50, &mut rng);
        assert_eq!(samples.dim(), (50, 2));
        for row in samples.rows() {
            assert!(domain.is_inside(&row));
        }
    }

    #[test]
    fn test_sample_reproducibility() {
        let domain = Domain::new(&array![[0., 1.]]).unwrap();
        let mut rng1 = Xoshiro256Plus::seed_from_u64(7);
        let mut rng2 = Xoshiro256Plus::seed_from_u64(7);
        assert_eq!(domain.sample(5, &mut rng1), domain.sample(5, &mut rng2));
    }
}
