/*!
This library implements Gaussian process posterior inference over noisy
observations of an expensive objective function, used as the surrogate
model of the batch point-selection engine in `nextpoint-cl`.

Unlike a trained regression model, the process here is conditioned
directly on the caller-provided [`HistoricalData`]: each observation
carries its own noise variance, added on the diagonal of the training
covariance matrix, so that fabricated ("lied") observations can be
appended with an arbitrary confidence.

Example:
```
use nextpoint_gp::{GaussianProcess, HistoricalData, SquaredExponentialCov};
use ndarray::array;

let mut data = HistoricalData::new(1).unwrap();
data.append(&array![0.0], 0.1, 0.01).unwrap();
data.append(&array![1.0], 0.2, 0.01).unwrap();

let kernel = SquaredExponentialCov::isotropic(1.0, 0.5, 1).unwrap();
let gp = GaussianProcess::new(kernel, data).unwrap();

let (mean, variance) = gp.predict_valvar(&array![[0.5]]).unwrap();
assert!(variance[0] > 0.0);
```
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
mod errors;
mod history;
mod kernel;

pub use algorithm::*;
pub use errors::*;
pub use history::*;
pub use kernel::*;
