//! A batch point-selection engine for sequential experiment design.
//!
//! Given noisy historical observations of an expensive objective, a
//! Gaussian process covariance model and a bounded domain, the engine
//! selects the next batch of points to sample. Points are chosen
//! greedily by maximizing the Expected Improvement acquisition with a
//! multistart gradient ascent; between selections the Constant Liar
//! heuristic pretends the objective at each chosen point already came
//! out at a fixed value, pushing later selections apart.
//!
//! ```no_run
//! use ndarray::array;
//! use nextpoint_cl::{BatchStatus, ConstantLiar, Domain};
//! use nextpoint_gp::{HistoricalData, SquaredExponentialCov};
//!
//! // two noisy observations of the objective over [0, 1]
//! let mut data = HistoricalData::new(1).unwrap();
//! data.append(&array![0.], 0.1, 0.01).unwrap();
//! data.append(&array![1.], 0.2, 0.01).unwrap();
//!
//! let kernel = SquaredExponentialCov::isotropic(1., 0.5, 1).unwrap();
//! let domain = Domain::new(&array![[0., 1.]]).unwrap();
//!
//! // lie with the best observed value, ask for 3 points
//! let batch = ConstantLiar::new(kernel, &data, &domain, 0.1)
//!     .select(3)
//!     .unwrap();
//! assert_eq!(batch.status, BatchStatus::Complete);
//! for selected in &batch.points {
//!     println!("next point: {} (EI={})", selected.point, selected.ei);
//! }
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

mod config;
pub mod criteria;
mod domain;
mod errors;
mod liar;
mod optimizer;
mod utils;

pub use config::*;
pub use domain::*;
pub use errors::*;
pub use liar::*;
pub use utils::{norm_cdf, norm_pdf};

pub use nextpoint_gp::{
    CovarianceModel, GaussianProcess, GpError, HistoricalData, SamplePoint, SquaredExponentialCov,
};
