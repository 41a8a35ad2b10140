use bloodflow_optimize::calculus::{DifferentiableVectorFunction, VectorFunction};
use bloodflow_optimize::newton::*;
use nalgebra::{DVector, DVectorView, DVectorViewMut, Matrix3, Vector3};
use numeric_literals::replace_numeric_literals;
use std::error::Error;

struct MockLinearVectorFunction;

#[replace_numeric_literals(f64::from(literal))]
fn system_matrix() -> Matrix3<f64> {
    Matrix3::new(5, 1, 2, 1, 4, 2, 2, 2, 4)
}

impl VectorFunction<f64> for MockLinearVectorFunction {
    fn dimension(&self) -> usize {
        3
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>) {
        let b = Vector3::new(1.0, 2.0, 3.0);
        let r = system_matrix() * x - b;
        f.copy_from(&r);
    }
}

impl DifferentiableVectorFunction<f64> for MockLinearVectorFunction {
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<f64>,
        _x: &DVectorView<f64>,
        rhs: &DVectorView<f64>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let a_inv = system_matrix()
            .try_inverse()
            .ok_or("matrix is singular")?;
        sol.copy_from(&(a_inv * rhs));
        Ok(())
    }
}

/// F(x) = x^2 - 2 componentwise, with roots at +-sqrt(2).
struct Square;

impl VectorFunction<f64> for Square {
    fn dimension(&self) -> usize {
        2
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>) {
        for i in 0..x.len() {
            f[i] = x[i] * x[i] - 2.0;
        }
    }
}

impl DifferentiableVectorFunction<f64> for Square {
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<f64>,
        x: &DVectorView<f64>,
        rhs: &DVectorView<f64>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        for i in 0..x.len() {
            if x[i] == 0.0 {
                return Err(Box::from("singular Jacobian"));
            }
            sol[i] = rhs[i] / (2.0 * x[i]);
        }
        Ok(())
    }
}

#[test]
fn newton_converges_in_single_iteration_for_linear_system() {
    let expected_solution = Vector3::new(-0.125, 0.16666667, 0.72916667);

    let settings = NewtonSettings {
        max_iterations: Some(2),
        tolerance: Vector3::new(1.0, 2.0, 3.0).norm() * 1e-6,
        relative_tolerance: None,
    };

    let mut f = DVector::zeros(3);
    let mut x = DVector::zeros(3);
    let mut dx = DVector::zeros(3);

    let result =
        newton(MockLinearVectorFunction, &mut x, &mut f, &mut dx, settings).expect("Newton iterations must succeed");
    let diff = x - expected_solution;
    assert!(diff.norm() < 1e-6);
    assert_eq!(result.iterations, 1);
    assert!(result.residual_norm <= settings.tolerance);
}

#[test]
fn newton_converges_for_nonlinear_system() {
    let mut f = DVector::zeros(2);
    let mut x = DVector::from_column_slice(&[1.0, -3.0]);
    let mut dx = DVector::zeros(2);

    let settings = NewtonSettings {
        max_iterations: Some(20),
        tolerance: 1e-12,
        relative_tolerance: None,
    };
    let result = newton(Square, &mut x, &mut f, &mut dx, settings).unwrap();
    let sqrt2 = 2.0f64.sqrt();
    assert!((x[0] - sqrt2).abs() < 1e-10);
    assert!((x[1] + sqrt2).abs() < 1e-10);
    assert!(result.iterations > 1);
}

#[test]
fn newton_reports_maximum_iterations() {
    let settings = NewtonSettings {
        max_iterations: Some(1),
        tolerance: 1e-14,
        relative_tolerance: None,
    };
    let mut f = DVector::zeros(2);
    let mut x = DVector::from_column_slice(&[10.0, 10.0]);
    let mut dx = DVector::zeros(2);

    let result = newton(Square, &mut x, &mut f, &mut dx, settings);
    assert!(matches!(result, Err(NewtonError::MaximumIterationsReached(1))));
}

#[test]
fn newton_propagates_jacobian_failure() {
    let mut f = DVector::zeros(2);
    let mut x = DVector::zeros(2);
    let mut dx = DVector::zeros(2);

    let result = newton(Square, &mut x, &mut f, &mut dx, NewtonSettings::default());
    assert!(matches!(result, Err(NewtonError::JacobianError(_))));
}

#[test]
fn newton_rejects_non_finite_residual() {
    let mut f = DVector::zeros(2);
    let mut x = DVector::from_column_slice(&[f64::NAN, 1.0]);
    let mut dx = DVector::zeros(2);

    let result = newton(Square, &mut x, &mut f, &mut dx, NewtonSettings::default());
    assert!(matches!(result, Err(NewtonError::NonFiniteResidual(0))));
}

#[test]
fn backtracking_line_search_converges_for_nonlinear_system() {
    let mut f = DVector::zeros(2);
    let mut x = DVector::from_column_slice(&[0.1, 5.0]);
    let mut dx = DVector::zeros(2);

    newton_line_search(
        Square,
        &mut x,
        &mut f,
        &mut dx,
        NewtonSettings {
            max_iterations: Some(50),
            tolerance: 1e-12,
            relative_tolerance: None,
        },
        &mut BacktrackingLineSearch::default(),
    )
    .unwrap();
    let sqrt2 = 2.0f64.sqrt();
    assert!((x[0] - sqrt2).abs() < 1e-10);
    assert!((x[1] - sqrt2).abs() < 1e-10);
}
