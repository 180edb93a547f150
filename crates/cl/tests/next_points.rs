use ndarray::array;
use ndarray_rand::rand::SeedableRng;
use nextpoint_cl::{BatchStatus, ConstantLiar, Domain, OptimParams};
use nextpoint_gp::{HistoricalData, SquaredExponentialCov};
use rand_xoshiro::Xoshiro256Plus;

fn two_point_history() -> HistoricalData {
    let mut data = HistoricalData::new(1).unwrap();
    data.append(&array![0.], 0.1, 0.01).unwrap();
    data.append(&array![1.], 0.2, 0.01).unwrap();
    data
}

#[test]
fn test_single_next_point() {
    let _ = env_logger::builder().is_test(true).try_init();
    let data = two_point_history();
    let domain = Domain::new(&array![[0., 1.]]).unwrap();
    let kernel = SquaredExponentialCov::isotropic(1., 0.5, 1).unwrap();

    let mut liar = ConstantLiar::with_rng(
        kernel,
        &data,
        &domain,
        0.1,
        Xoshiro256Plus::seed_from_u64(42),
    );
    let batch = liar.select(1).unwrap();

    assert_eq!(batch.status, BatchStatus::Complete);
    assert_eq!(batch.points.len(), 1);
    let selected = &batch.points[0];
    assert!(domain.is_inside(&selected.point));
    assert!(selected.ei > 0.);
    assert!(selected.variance > 0.);
    assert_eq!(batch.covariance.dim(), (1, 1));
    // the caller's data is left untouched
    assert_eq!(data.len(), 2);
}

#[test]
fn test_batch_of_three_with_unfavorable_lie() {
    let _ = env_logger::builder().is_test(true).try_init();
    let data = two_point_history();
    let domain = Domain::new(&array![[0., 1.]]).unwrap();
    let kernel = SquaredExponentialCov::isotropic(1., 0.5, 1).unwrap();

    // lying with a value above the observed minimum keeps the later
    // selections honest without zeroing the acquisition
    let mut liar = ConstantLiar::with_rng(
        kernel,
        &data,
        &domain,
        0.2,
        Xoshiro256Plus::seed_from_u64(42),
    )
    .lie_noise_variance(1e-4)
    .optim_params(OptimParams::default().n_start(10));
    let batch = liar.select(3).unwrap();

    assert_eq!(batch.status, BatchStatus::Complete);
    assert_eq!(batch.points.len(), 3);
    assert_eq!(batch.covariance.dim(), (3, 3));
    for selected in &batch.points {
        assert!(domain.is_inside(&selected.point));
        assert!(selected.ei > 0.);
    }
    // the lies push the selections apart from each other
    for i in 0..3 {
        for j in (i + 1)..3 {
            let d = (batch.points[i].point[0] - batch.points[j].point[0]).abs();
            assert!(d > 1e-3, "points {i} and {j} coincide");
        }
    }
    // the diagnostic covariance is symmetric with non-negative diagonal
    for i in 0..3 {
        assert!(batch.covariance[[i, i]] >= -1e-10);
        for j in 0..3 {
            assert!((batch.covariance[[i, j]] - batch.covariance[[j, i]]).abs() < 1e-10);
        }
    }
}

#[test]
fn test_full_run_seed_determinism() {
    let _ = env_logger::builder().is_test(true).try_init();
    let data = two_point_history();
    let domain = Domain::new(&array![[0., 1.]]).unwrap();
    let kernel = SquaredExponentialCov::isotropic(1., 0.5, 1).unwrap();

    let select = || {
        let mut liar = ConstantLiar::with_rng(
            kernel.clone(),
            &data,
            &domain,
            0.2,
            Xoshiro256Plus::seed_from_u64(7),
        );
        liar.select(3).unwrap()
    };
    let batch1 = select();
    let batch2 = select();

    assert_eq!(batch1.points.len(), batch2.points.len());
    for (a, b) in batch1.points.iter().zip(batch2.points.iter()) {
        assert_eq!(a.point, b.point);
        assert_eq!(a.ei, b.ei);
        assert_eq!(a.variance, b.variance);
    }
    assert_eq!(batch1.covariance, batch2.covariance);
}
