//! End-to-end properties of the fitting engine through the public API.

use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal, Uniform};

use library_stats::domain::{Dataset, FitStatus};
use library_stats::error::FitError;
use library_stats::fit::{LmOptions, diagnostics, fit, fit_ols};
use library_stats::models::{FnModel, Model, ModelSpec, SaturatingExponential};
use library_stats::stats::pearson;

const TRUE_SATURATION: [f64; 3] = [200.0, 0.05, 10.0];

fn plane(n: usize, sigma: f64, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let xs = Uniform::new(-10.0, 10.0);
    let noise = Normal::new(0.0, sigma).unwrap();
    let x1: Vec<f64> = (0..n).map(|_| xs.sample(&mut rng)).collect();
    let x2: Vec<f64> = (0..n).map(|_| xs.sample(&mut rng)).collect();
    let y: Vec<f64> = x1
        .iter()
        .zip(&x2)
        .map(|(a, b)| 3.0 + 2.0 * a - b + noise.sample(&mut rng))
        .collect();
    Dataset::from_columns(&[&x1, &x2], &y).unwrap()
}

fn saturation(n: usize, sigma: f64, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let visits = Uniform::new_inclusive(1u32, 99);
    let noise = Normal::new(0.0, sigma).unwrap();
    let x: Vec<f64> = (0..n).map(|_| f64::from(visits.sample(&mut rng))).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|&v| SaturatingExponential.predict(&[v], &TRUE_SATURATION) + noise.sample(&mut rng))
        .collect();
    Dataset::univariate(&x, &y).unwrap()
}

#[test]
fn ols_recovers_plane_as_noise_vanishes() {
    let mut last_r2 = 0.0;
    for sigma in [1.0, 1e-3, 1e-7] {
        let fit = fit(&ModelSpec::Linear, &plane(200, sigma, 11), &LmOptions::default()).unwrap();
        let beta = fit.parameters();
        let tol = 10.0 * sigma;
        assert_abs_diff_eq!(beta[0], 3.0, epsilon = tol);
        assert_abs_diff_eq!(beta[1], 2.0, epsilon = tol);
        assert_abs_diff_eq!(beta[2], -1.0, epsilon = tol);
        assert!(fit.r_squared() >= last_r2);
        last_r2 = fit.r_squared();
    }
    assert!(last_r2 > 1.0 - 1e-12);
}

#[test]
fn nonlinear_fit_recovers_saturation_parameters() {
    let data = saturation(1000, 10.0, 42);
    let spec = ModelSpec::saturating_exponential([150.0, 0.03, 5.0]);
    let fit = fit(&spec, &data, &LmOptions::default()).unwrap();

    assert_eq!(fit.status(), FitStatus::Converged);
    assert!(fit.iterations() <= LmOptions::default().max_iterations);
    assert!(fit.r_squared() > 0.9, "R² = {}", fit.r_squared());

    let se = fit.std_errors();
    for ((est, truth), se) in fit.parameters().iter().zip(TRUE_SATURATION).zip(se) {
        let tol = (0.1 * truth).max(4.0 * se);
        assert!((est - truth).abs() <= tol, "estimate {est} vs {truth} (se {se})");
    }
}

#[test]
fn perfectly_linear_sequences_have_unit_correlation() {
    let x: Vec<f64> = (1..=30).map(f64::from).collect();
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
    let res = pearson(&x, &y).unwrap();
    assert_abs_diff_eq!(res.r, 1.0, epsilon = 1e-12);
    assert!(res.p_value < 1e-12);
}

#[test]
fn constant_sequence_is_degenerate() {
    let x = [1.0, 2.0, 3.0, 4.0];
    let err = pearson(&x, &[5.0; 4]).unwrap_err();
    assert!(matches!(err, FitError::DegenerateInput(_)));
}

#[test]
fn ols_with_too_few_samples_is_insufficient() {
    let data = plane(3, 0.1, 1);
    assert_eq!(
        fit_ols(&data).unwrap_err(),
        FitError::InsufficientData { needed: 4, got: 3 }
    );
}

#[test]
fn uphill_model_diverges_within_the_ceiling() {
    // The Jacobian has the wrong sign, so every proposed step climbs.
    let uphill = FnModel::new("uphill", 2, |x, t| t[0] + t[1] * x[0]).with_jacobian(|x, _t, out| {
        out[0] = -1.0;
        out[1] = -x[0];
    });
    let x: Vec<f64> = (0..40).map(f64::from).collect();
    let y: Vec<f64> = x.iter().map(|v| 1.0 + 0.5 * v + (v * 0.9).sin()).collect();
    let data = Dataset::univariate(&x, &y).unwrap();

    let options = LmOptions::default().with_max_iterations(25);
    let spec = ModelSpec::nonlinear(uphill, vec![0.0, 0.0]);
    match fit(&spec, &data, &options) {
        Err(FitError::OptimizationDiverged { iterations, .. }) => assert!(iterations <= 25),
        other => panic!("expected divergence, got {other:?}"),
    }
}

#[test]
fn damping_ceiling_is_a_divergence() {
    let uphill = FnModel::new("uphill", 2, |x, t| t[0] + t[1] * x[0]).with_jacobian(|x, _t, out| {
        out[0] = -1.0;
        out[1] = -x[0];
    });
    let x: Vec<f64> = (0..40).map(f64::from).collect();
    let y: Vec<f64> = x.iter().map(|v| 1.0 + 0.5 * v + (v * 0.9).sin()).collect();
    let data = Dataset::univariate(&x, &y).unwrap();

    let options = LmOptions {
        lambda_max: 1.0,
        ..LmOptions::default()
    };
    let spec = ModelSpec::nonlinear(uphill, vec![0.0, 0.0]);
    match fit(&spec, &data, &options) {
        Err(FitError::OptimizationDiverged { reason, .. }) => assert!(reason.contains("ceiling"), "{reason}"),
        other => panic!("expected divergence, got {other:?}"),
    }
}

#[test]
fn runaway_initial_guess_diverges_immediately() {
    let data = saturation(100, 10.0, 3);
    // e^{800·x} overflows for every sample.
    let spec = ModelSpec::saturating_exponential([200.0, -800.0, 10.0]);
    let err = fit(&spec, &data, &LmOptions::default()).unwrap_err();
    assert!(matches!(err, FitError::OptimizationDiverged { iterations: 0, .. }), "{err:?}");
}

#[test]
fn diagnostics_are_bit_identical_on_repeat() {
    let data = saturation(500, 10.0, 9);
    let theta = [195.0, 0.048, 11.0];
    let first = diagnostics::evaluate(&data, &SaturatingExponential, &theta).unwrap();
    let second = diagnostics::evaluate(&data, &SaturatingExponential, &theta).unwrap();
    assert_eq!(first.r_squared.to_bits(), second.r_squared.to_bits());
    assert_eq!(first.rmse.to_bits(), second.rmse.to_bits());
    assert_eq!(
        diagnostics::r_squared(&data, &SaturatingExponential, &theta).unwrap().to_bits(),
        first.r_squared.to_bits()
    );
}
