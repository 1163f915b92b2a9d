use evoflow::kde::GaussianKde;
use evoflow::scalarizing::{ScalarisingFunction, gd_weights, project};
use evoflow::simplex_lattice::{lattice_size, simplex_lattice};
use evoflow::surrogate::{
    DensityExpectedImprovement, ExpectedImprovement, InfillCriterion, Interpolator,
    OrdinaryKriging,
};

fn training() -> (Vec<Vec<f64>>, Vec<f64>) {
    let x: Vec<Vec<f64>> = (0..6)
        .map(|i| vec![f64::from(i) / 5.0, (f64::from(i) * 0.37).fract()])
        .collect();
    let y = x.iter().map(|p| (p[0] - 0.4).powi(2) + p[1]).collect();
    (x, y)
}

#[test]
fn test_kriging_interpolates_training_points() {
    let (x, y) = training();
    let mut model = OrdinaryKriging::fit(x.clone(), y.clone()).unwrap();
    for (xi, &yi) in x.iter().zip(&y) {
        assert!((model.value(xi) - yi).abs() < 1e-6);
        assert!(model.error(xi) < 1e-3);
    }
    assert_eq!(model.inputs().len(), 6);
}

#[test]
fn test_kriging_is_uncertain_away_from_data() {
    let (x, y) = training();
    let mut model = OrdinaryKriging::fit(x.clone(), y).unwrap();
    model.value(&x[0]);
    let near = model.error(&x[0]);
    model.value(&[3.0, 3.0]);
    let far = model.error(&[3.0, 3.0]);
    assert!(far > near);
}

#[test]
fn test_expected_improvement_vanishes_at_samples() {
    let (x, y) = training();
    let model = OrdinaryKriging::fit(x.clone(), y.clone()).unwrap();
    let mut ei = ExpectedImprovement::new(model);
    let best = y.iter().copied().fold(f64::INFINITY, f64::min);
    assert!((ei.best() - best).abs() < f64::EPSILON);
    for xi in &x {
        assert!(ei.evaluate(xi) < 1e-6);
    }
    assert!(ei.evaluate(&[0.45, 0.1]) >= 0.0);
}

#[test]
fn test_density_error_grows_in_sparse_regions() {
    let (x, y) = training();
    let model = OrdinaryKriging::fit(x.clone(), y).unwrap();
    let dei = DensityExpectedImprovement::new(model, x.clone()).with_bandwidth(0.2);
    assert!((dei.bandwidth() - 0.2).abs() < f64::EPSILON);
    assert!(dei.error(&x[2]) < dei.error(&[5.0, 5.0]));
}

#[test]
fn test_kde_peaks_at_samples() {
    let kde = GaussianKde::new(vec![vec![0.0, 0.0], vec![0.1, 0.0], vec![0.0, 0.1]]).unwrap();
    assert!(kde.bandwidth() > 0.0);
    assert!(kde.pdf(&[0.0, 0.0]) > kde.pdf(&[2.0, 2.0]));
}

#[test]
fn test_gd_weights_invert_direction() {
    let w = gd_weights(&[1.0, 0.0]);
    assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    assert!((w[1] / w[0] - 101.0).abs() < 1e-9);
}

#[test]
fn test_projection_scales_direction() {
    let p = project(ScalarisingFunction::WeightedSum, &[0.5, 0.5], &[1.0, 1.0]);
    assert!((p.magnitude - 2.0).abs() < 1e-9);
    for v in &p.point {
        assert!((v - 1.0).abs() < 1e-9);
    }
    assert!(project(ScalarisingFunction::WeightedSum, &[1.0], &[1.0, 2.0]).point.is_empty());
}

#[test]
fn test_lattice_covers_simplex() {
    let lattice = simplex_lattice(4, 3);
    assert_eq!(lattice.len(), lattice_size(4, 3));
    assert_eq!(lattice.len(), 15);
    for w in &lattice {
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(w.iter().all(|&x| (0.0..=1.0).contains(&x)));
    }
}
