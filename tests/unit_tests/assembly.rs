use bloodflow::assembly::{assemble_pattern, BloodFlowAssembler};
use bloodflow::form::BloodFlowForm;
use bloodflow::mesh::IntervalMesh;
use bloodflow::optimize::calculus::approximate_jacobian_fd;
use bloodflow::quadrature::GaussRule;
use bloodflow::space::MixedSpace;
use bloodflow::vessel::{TaperedVessel, VesselParameters};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DMatrix, DVector, DVectorView, Vector2};

fn assembler(params: &VesselParameters, num_elements: usize, time_step: f64) -> BloodFlowAssembler<f64> {
    let vessel = TaperedVessel::new(params, 1.0).unwrap();
    let space = MixedSpace::new(IntervalMesh::uniform(params.length, num_elements));
    let form = BloodFlowForm {
        time_step,
        area_regularization: 1e-16,
        friction_coefficient: vessel.friction_coefficient(),
    };
    BloodFlowAssembler::new(space, &vessel, form, &GaussRule::new(4))
}

#[test]
fn pattern_couples_unknowns_of_neighboring_vertices() {
    let space = MixedSpace::new(IntervalMesh::<f64>::uniform(1.0, 2));
    let pattern = assemble_pattern(&space);

    assert_eq!(pattern.major_dim(), 6);
    assert_eq!(pattern.minor_dim(), 6);
    assert_eq!(pattern.major_offsets(), &[0, 4, 8, 14, 20, 24, 28]);
    assert_eq!(pattern.lane(0), &[0, 1, 2, 3]);
    assert_eq!(pattern.lane(2), &[0, 1, 2, 3, 4, 5]);
    assert_eq!(pattern.lane(5), &[2, 3, 4, 5]);
}

#[test]
fn pattern_contains_exactly_the_element_couplings() {
    let space = MixedSpace::new(IntervalMesh::<f64>::uniform(20.8, 7));
    let pattern = assemble_pattern(&space);

    // Four 2 x 2 blocks per element, with the diagonal blocks of interior vertices shared
    let num_vertices = 8;
    assert_eq!(pattern.nnz(), 4 * (3 * num_vertices - 2));
    for element_index in 0..7 {
        let dofs = space.element_dofs(element_index);
        for &row in &dofs {
            for col in &dofs {
                assert!(pattern.lane(row).binary_search(col).is_ok());
            }
        }
    }
}

#[test]
fn residual_vanishes_at_rest_in_uniform_vessel() {
    let params = VesselParameters::default();
    let vessel = TaperedVessel::new(&params, 1.0).unwrap();
    let mut assembler = assembler(&params, 8, 0.01);
    let u = assembler
        .space()
        .interpolate(|x| Vector2::new(vessel.reference_area(x), 0.0));
    assembler.set_previous(&u).unwrap();

    let residual = assembler.assemble_residual(&DVectorView::from(&u));
    assert_matrix_eq!(residual, DVector::<f64>::zeros(u.len()), comp = abs, tol = 1e-12);
}

#[test]
fn continuity_rows_of_element_jacobian() {
    let params = VesselParameters::default();
    let dt = 0.05;
    let mut assembler = assembler(&params, 4, dt);
    let h = params.length / 4.0;
    let u = assembler.space().interpolate(|x| Vector2::new(0.4, 5.0 + x));
    assembler.set_previous(&u).unwrap();

    let u = DVectorView::from(&u);
    let residual = assembler.assemble_element_residual(1, &u);
    // A = A_n and q' = 1, so the continuity residual is dt times the integral of the basis function
    assert_scalar_eq!(residual[0], dt * h / 2.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(residual[2], dt * h / 2.0, comp = abs, tol = 1e-12);

    let jacobian = assembler.assemble_element_jacobian(1, &u);
    // Mass matrix for the area, convection matrix for the flow
    assert_scalar_eq!(jacobian[(0, 0)], h / 3.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(jacobian[(0, 2)], h / 6.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(jacobian[(2, 2)], h / 3.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(jacobian[(0, 1)], -dt / 2.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(jacobian[(0, 3)], dt / 2.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(jacobian[(2, 1)], -dt / 2.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(jacobian[(2, 3)], dt / 2.0, comp = abs, tol = 1e-12);
}

#[test]
fn jacobian_matches_finite_difference_jacobian() {
    let params = VesselParameters {
        distal_radius: 0.25,
        ..VesselParameters::default()
    };
    let vessel = TaperedVessel::new(&params, 1.0).unwrap();
    let mut assembler = assembler(&params, 5, 0.01);

    let previous = assembler
        .space()
        .interpolate(|x| Vector2::new(vessel.reference_area(x), 5.0));
    assembler.set_previous(&previous).unwrap();
    let mut u = assembler.space().interpolate(|x| {
        Vector2::new(vessel.reference_area(x) * (1.0 + 0.05 * x.sin()), 5.0 + 0.3 * x)
    });

    let mut csr = assembler.create_jacobian();
    assembler
        .assemble_jacobian_into(&mut csr, &DVectorView::from(&u))
        .unwrap();
    let jacobian = DMatrix::from(&csr);

    let n = u.len();
    let jacobian_fd = approximate_jacobian_fd(
        n,
        |x, mut f| assembler.assemble_residual_into(&mut f, &x),
        &mut u,
        1e-6,
    );

    let tol = 1e-6 * jacobian_fd.amax().max(1.0);
    assert_matrix_eq!(jacobian, jacobian_fd, comp = abs, tol = tol);
}

#[test]
fn set_previous_rejects_wrong_length() {
    let mut assembler = assembler(&VesselParameters::default(), 3, 0.01);
    assert!(assembler.set_previous(&DVector::zeros(5)).is_err());
    assert!(assembler.set_previous(&DVector::zeros(8)).is_ok());
}
