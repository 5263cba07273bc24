//! Scenario tests for outlier removal and the evaluation metrics.
//!
//! Each test pins down one concrete, hand-checkable situation: spikes around
//! a dense interior, a sphere with analytic normals, empty and capped-out
//! inputs, degenerate clouds, heavily repeated coordinates, non-finite
//! normals, and full-pipeline reproducibility.

use approx::assert_relative_eq;
use hullclean::prelude::*;

#[test]
fn test_eight_spikes_around_interior_are_removed() {
    let spiked = generate_spiked_cube_seeded(1000, 1.0, 10.0, 42).unwrap();
    let result = HullOutlierRemover::default().remove(&spiked.cloud).unwrap();

    assert_eq!(result.removed_indices(), spiked.spike_indices.as_slice());
    assert_eq!(result.kept().len(), 1000);
    assert_eq!(result.kept_indices(), (0..1000).collect::<Vec<_>>().as_slice());
}

#[test]
fn test_spikes_removed_for_several_seeds() {
    for seed in [1_u64, 7, 99, 2024] {
        let spiked = generate_spiked_cube_seeded(500, 2.0, 25.0, seed).unwrap();
        let result = HullOutlierRemover::default().remove(&spiked.cloud).unwrap();
        assert_eq!(
            result.removed_indices(),
            spiked.spike_indices.as_slice(),
            "seed {seed}"
        );
    }
}

#[test]
fn test_unit_sphere_normal_consistency_is_one() {
    let sphere = generate_unit_sphere_seeded(500, 42);
    let metric = NormalConsistency::new(
        CorrespondenceConfig {
            max_points: 500,
            seed: 42,
        },
        NormalSearchParams::default(),
    );
    let result = metric.compute(&sphere, &sphere).unwrap();

    assert_relative_eq!(result.a_to_b(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(result.b_to_a(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(result.combined(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_chamfer_self_comparison_is_zero() {
    let cloud = PointSet::new(generate_random_points_seeded(750, (-3.0, 3.0), 5).unwrap());
    let metric = ChamferDistance::new(CorrespondenceConfig {
        max_points: 750,
        seed: 42,
    });
    assert_eq!(metric.compute(&cloud, &cloud).unwrap().combined(), 0.0);
}

#[test]
fn test_chamfer_symmetric_under_swap() {
    let a = PointSet::new(generate_random_points_seeded(3_000, (-1.0, 1.0), 1).unwrap());
    let b = PointSet::new(generate_random_points_seeded(2_000, (-1.0, 1.5), 2).unwrap());
    let metric = ChamferDistance::new(CorrespondenceConfig {
        max_points: 800,
        seed: 42,
    });
    let ab = metric.compute(&a, &b).unwrap();
    let ba = metric.compute(&b, &a).unwrap();
    assert_eq!(ab.combined(), ba.combined());
    assert_ne!(ab.a_to_b(), ab.b_to_a());
}

#[test]
fn test_empty_input_raises_empty_index() {
    let cloud = PointSet::new(generate_random_points_seeded(20, (0.0, 1.0), 3).unwrap());
    let empty = PointSet::default();

    let err = ChamferDistance::default().compute(&empty, &cloud).unwrap_err();
    assert_eq!(err, MetricError::SpatialIndex(SpatialIndexError::EmptyIndex));
    let err = NormalConsistency::default().compute(&cloud, &empty).unwrap_err();
    assert!(err.is_empty_index());
    assert_eq!(
        SpatialIndex::build(empty.points()).unwrap_err(),
        SpatialIndexError::EmptyIndex
    );
}

#[test]
fn test_zero_max_points_raises_empty_index() {
    let cloud = PointSet::new(generate_random_points_seeded(20, (0.0, 1.0), 3).unwrap());
    let capped = CorrespondenceConfig {
        max_points: 0,
        seed: 42,
    };

    assert!(
        ChamferDistance::new(capped)
            .compute(&cloud, &cloud)
            .unwrap_err()
            .is_empty_index()
    );
    assert!(
        NormalConsistency::new(capped, NormalSearchParams::default())
            .compute(&cloud, &cloud)
            .unwrap_err()
            .is_empty_index()
    );
}

#[test]
fn test_degenerate_inputs_fail_explicitly() {
    let collinear: Vec<[f64; 3]> = (0..10).map(|i| [f64::from(i); 3]).collect();
    let coplanar: Vec<[f64; 3]> = (0..25)
        .map(|i| [f64::from(i % 5), f64::from(i / 5), 2.0])
        .collect();
    let coincident = vec![[1.0, 2.0, 3.0]; 12];
    let too_few = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

    for points in [collinear, coplanar, coincident, too_few] {
        let err = HullOutlierRemover::default()
            .remove(&PointSet::new(points))
            .unwrap_err();
        assert!(
            matches!(err, OutlierRemovalError::DegenerateInput { pass: 1, .. }),
            "unexpected error: {err}"
        );
    }
}

#[test]
fn test_pipeline_is_reproducible() {
    let spiked = generate_spiked_cube_seeded(4_000, 1.0, 5.0, 11).unwrap();
    let config = EvaluationConfigBuilder::default()
        .max_points(1_000)
        .seed(42)
        .build()
        .unwrap();

    let first = evaluate(&spiked.cloud, &config).unwrap();
    let second = evaluate(&spiked.cloud, &config).unwrap();
    assert_eq!(first.chamfer, second.chamfer);
    assert_eq!(first.normal_consistency, second.normal_consistency);
    assert_eq!(
        first.report_record().unwrap(),
        second.report_record().unwrap()
    );
}

#[test]
fn test_pipeline_record_fields() {
    let spiked = generate_spiked_cube_seeded(1_000, 1.0, 10.0, 42).unwrap();
    let evaluation = evaluate(&spiked.cloud, &EvaluationConfig::default()).unwrap();
    let record = evaluation.report_record().unwrap();

    assert_eq!(record.original_size, 1_008);
    assert_eq!(record.hull_size, 1_000);
    // Only the raw-to-clean direction sees the spikes.
    let chamfer = evaluation.chamfer.unwrap();
    assert_eq!(chamfer.b_to_a(), 0.0);
    assert!(chamfer.a_to_b() > 0.0);
    assert_relative_eq!(record.chamfer_distance, chamfer.combined());
}

#[test]
fn test_repeated_coordinates_do_not_break_indexing() {
    let mut points = generate_random_points_seeded(2_000, (-1.0, 1.0), 1).unwrap();
    points.extend(std::iter::repeat_n([0.25, 0.25, 0.25], 300));
    let index = SpatialIndex::build(&points).unwrap();
    assert_eq!(index.len(), 2_300);
    assert_eq!(index.nearest(&[0.25, 0.25, 0.25]).index, 2_000);

    let cloud = PointSet::new(points);
    assert_eq!(ChamferDistance::default().compute(&cloud, &cloud).unwrap().combined(), 0.0);
    let nc = NormalConsistency::default().compute(&cloud, &cloud).unwrap();
    assert!((0.0..=1.0).contains(&nc.combined()));
}

#[test]
fn test_single_repeated_coordinate_cloud() {
    let mut points = vec![[0.5, 0.5, 0.5]; 5_000];
    points.push([0.0, 0.0, 0.0]);
    let cloud = PointSet::new(points);

    let chamfer = ChamferDistance::default().compute(&cloud, &cloud).unwrap();
    assert_eq!(chamfer.combined(), 0.0);
    let estimated = NormalEstimator::default().estimate(cloud.points()).unwrap();
    assert!(estimated.iter().flatten().all(|c| c.is_finite()));
}

#[test]
fn test_pipeline_with_duplicated_interior() {
    let spiked = generate_spiked_cube_seeded(500, 1.0, 10.0, 9).unwrap();
    let (mut points, _) = spiked.cloud.into_parts();
    // A scanner that dwelt on one spot; these lie strictly inside the box.
    points.extend(std::iter::repeat_n([0.1, -0.2, 0.3], 1_000));

    let evaluation = evaluate(&PointSet::new(points), &EvaluationConfig::default()).unwrap();
    assert_eq!(evaluation.hull.removed_indices(), spiked.spike_indices.as_slice());
    let record = evaluation.report_record().unwrap();
    assert_eq!(record.original_size, 1_508);
    assert_eq!(record.hull_size, 1_500);
    assert_eq!(evaluation.chamfer.unwrap().b_to_a(), 0.0);
}

#[test]
fn test_non_finite_normals_are_rejected() {
    let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
    let err = PointSet::with_normals(points.clone(), vec![[f64::NAN; 3]; 2]).unwrap_err();
    assert_eq!(err, PointSetError::NonFiniteNormal { index: 0 });
    let err = PointSet::with_normals(points, vec![[0.0, 0.0, 1.0], [f64::INFINITY, 0.0, 0.0]])
        .unwrap_err();
    assert_eq!(err, PointSetError::NonFiniteNormal { index: 1 });
}
