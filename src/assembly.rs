//! Element and global assembly of the residual and Jacobian of the weak form.
use crate::form::{BloodFlowForm, Integrand, PointState};
use crate::quadrature::Quadrature1d;
use crate::space::{MixedSpace, SOLUTION_DIM};
use crate::vessel::{TaperedVessel, VesselCoefficients};
use crate::Real;
use eyre::eyre;
use nalgebra::{DVector, DVectorView, DVectorViewMut, Matrix4, RowVector2, Vector2, Vector4};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;

/// Sparsity pattern of the Jacobian on a [`MixedSpace`].
///
/// Segment `i` connects vertices `i` and `i + 1`, so the unknowns of a vertex couple to those of
/// its direct neighbors only, and the pattern is block tridiagonal with `2 x 2` blocks.
pub fn assemble_pattern<T: Real>(space: &MixedSpace<T>) -> SparsityPattern {
    let num_vertices = space.mesh().num_vertices();
    let num_rows = SOLUTION_DIM * num_vertices;
    let mut offsets = Vec::with_capacity(num_rows + 1);
    let mut column_indices = Vec::with_capacity(3 * SOLUTION_DIM * num_rows);
    offsets.push(0);
    for vertex in 0..num_vertices {
        let first = vertex.saturating_sub(1);
        let last = (vertex + 1).min(num_vertices - 1);
        for _ in 0..SOLUTION_DIM {
            column_indices.extend(SOLUTION_DIM * first..SOLUTION_DIM * (last + 1));
            offsets.push(column_indices.len());
        }
    }
    SparsityPattern::try_from_offsets_and_indices(num_rows, num_rows, offsets, column_indices)
        .expect("Block tridiagonal pattern is sorted and in bounds")
}

/// Quadrature data of a single point in the physical domain.
#[derive(Debug, Clone, Copy)]
struct QuadraturePointData<T> {
    /// Quadrature weight multiplied by the element Jacobian determinant.
    weight: T,
    phi: RowVector2<T>,
    grad_phi: RowVector2<T>,
    coefficients: VesselCoefficients<T>,
}

/// Assembles the residual and the Jacobian of the weak form for a fixed previous state.
///
/// Vessel coefficients, basis values and weights at all quadrature points are computed once on
/// construction and reused for every Newton iteration.
#[derive(Debug, Clone)]
pub struct BloodFlowAssembler<T: Real> {
    space: MixedSpace<T>,
    form: BloodFlowForm<T>,
    previous: DVector<T>,
    points_per_element: usize,
    quadrature_table: Vec<QuadraturePointData<T>>,
}

impl<T: Real> BloodFlowAssembler<T> {
    pub fn new(
        space: MixedSpace<T>,
        vessel: &TaperedVessel<T>,
        form: BloodFlowForm<T>,
        quadrature: &impl Quadrature1d<T>,
    ) -> Self {
        let points_per_element = quadrature.weights().len();
        let mut quadrature_table = Vec::with_capacity(points_per_element * space.mesh().num_elements());
        for element_index in 0..space.mesh().num_elements() {
            let element = space
                .mesh()
                .element(element_index)
                .expect("Element index is in bounds");
            let jacobian = element.reference_jacobian();
            let grad_phi = element.physical_gradients();
            for (&w, xi) in quadrature.weights().iter().zip(quadrature.points()) {
                let x = element.map_reference_coords(xi);
                quadrature_table.push(QuadraturePointData {
                    weight: w * jacobian.abs(),
                    phi: element.evaluate_basis(xi),
                    grad_phi,
                    coefficients: vessel.coefficients(x.x),
                });
            }
        }
        let previous = DVector::zeros(space.num_dofs());
        Self {
            space,
            form,
            previous,
            points_per_element,
            quadrature_table,
        }
    }

    pub fn space(&self) -> &MixedSpace<T> {
        &self.space
    }

    pub fn form(&self) -> &BloodFlowForm<T> {
        &self.form
    }

    /// The state `U_n` at the previous time step.
    pub fn previous(&self) -> &DVector<T> {
        &self.previous
    }

    pub fn set_previous(&mut self, previous: &DVector<T>) -> eyre::Result<()> {
        if previous.len() != self.space.num_dofs() {
            return Err(eyre!(
                "previous state has {} entries, expected {}",
                previous.len(),
                self.space.num_dofs()
            ));
        }
        self.previous.copy_from(previous);
        Ok(())
    }

    fn element_points(&self, element_index: usize) -> &[QuadraturePointData<T>] {
        let offset = element_index * self.points_per_element;
        &self.quadrature_table[offset..offset + self.points_per_element]
    }

    /// Local unknowns `[A_a, q_a, A_b, q_b]` gathered into per-field nodal vectors.
    fn gather(&self, u: &DVectorView<T>, element_index: usize) -> [Vector2<T>; 4] {
        let [a_area, a_flow, b_area, b_flow] = self.space.element_dofs(element_index);
        [
            Vector2::new(u[a_area], u[b_area]),
            Vector2::new(u[a_flow], u[b_flow]),
            Vector2::new(self.previous[a_area], self.previous[b_area]),
            Vector2::new(self.previous[a_flow], self.previous[b_flow]),
        ]
    }

    fn evaluate_integrands(
        &self,
        point: &QuadraturePointData<T>,
        nodal: &[Vector2<T>; 4],
    ) -> (Integrand<T>, Integrand<T>) {
        let [area, flow, previous_area, previous_flow] = nodal;
        let state = PointState {
            area: point.phi.dot(&area.transpose()),
            area_gradient: point.grad_phi.dot(&area.transpose()),
            flow: point.phi.dot(&flow.transpose()),
            flow_gradient: point.grad_phi.dot(&flow.transpose()),
            previous_area: point.phi.dot(&previous_area.transpose()),
            previous_flow: point.phi.dot(&previous_flow.transpose()),
        };
        (
            self.form.continuity(&state),
            self.form.momentum(&state, &point.coefficients),
        )
    }

    /// Element residual, ordered like [`MixedSpace::element_dofs`].
    pub fn assemble_element_residual(&self, element_index: usize, u: &DVectorView<T>) -> Vector4<T> {
        let nodal = self.gather(u, element_index);
        let mut residual = Vector4::zeros();
        for point in self.element_points(element_index) {
            let (continuity, momentum) = self.evaluate_integrands(point, &nodal);
            for i in 0..2 {
                residual[SOLUTION_DIM * i] += point.weight * continuity.value * point.phi[i];
                residual[SOLUTION_DIM * i + 1] += point.weight * momentum.value * point.phi[i];
            }
        }
        residual
    }

    /// Element Jacobian, with rows and columns ordered like [`MixedSpace::element_dofs`].
    pub fn assemble_element_jacobian(&self, element_index: usize, u: &DVectorView<T>) -> Matrix4<T> {
        let nodal = self.gather(u, element_index);
        let mut jacobian = Matrix4::zeros();
        for point in self.element_points(element_index) {
            let (continuity, momentum) = self.evaluate_integrands(point, &nodal);
            for (row_component, integrand) in [continuity, momentum].iter().enumerate() {
                let d = &integrand.derivatives;
                for i in 0..2 {
                    let row = SOLUTION_DIM * i + row_component;
                    let test = point.weight * point.phi[i];
                    for j in 0..2 {
                        let (phi_j, grad_phi_j) = (point.phi[j], point.grad_phi[j]);
                        jacobian[(row, SOLUTION_DIM * j)] += test * (d.area * phi_j + d.area_gradient * grad_phi_j);
                        jacobian[(row, SOLUTION_DIM * j + 1)] += test * (d.flow * phi_j + d.flow_gradient * grad_phi_j);
                    }
                }
            }
        }
        jacobian
    }

    /// Assembles the global residual `F(u)` into `output`.
    pub fn assemble_residual_into(&self, output: &mut DVectorViewMut<T>, u: &DVectorView<T>) {
        assert_eq!(output.len(), self.space.num_dofs());
        assert_eq!(u.len(), self.space.num_dofs());
        output.fill(T::zero());
        for element_index in 0..self.space.mesh().num_elements() {
            let element_residual = self.assemble_element_residual(element_index, u);
            for (local, global) in self.space.element_dofs(element_index).into_iter().enumerate() {
                output[global] += element_residual[local];
            }
        }
    }

    pub fn assemble_residual(&self, u: &DVectorView<T>) -> DVector<T> {
        let mut residual = DVector::zeros(self.space.num_dofs());
        self.assemble_residual_into(&mut DVectorViewMut::from(&mut residual), u);
        residual
    }

    /// Creates a zero matrix with the sparsity pattern of the Jacobian.
    pub fn create_jacobian(&self) -> CsrMatrix<T> {
        let pattern = assemble_pattern(&self.space);
        let values = vec![T::zero(); pattern.nnz()];
        CsrMatrix::try_from_pattern_and_values(pattern, values)
            .expect("Number of values matches the pattern")
    }

    /// Assembles the Jacobian `dF/du` into a matrix created by [`create_jacobian`](Self::create_jacobian).
    pub fn assemble_jacobian_into(&self, csr: &mut CsrMatrix<T>, u: &DVectorView<T>) -> eyre::Result<()> {
        let n = self.space.num_dofs();
        if csr.nrows() != n || csr.ncols() != n {
            return Err(eyre!("Jacobian must be {n} x {n}, got {} x {}", csr.nrows(), csr.ncols()));
        }
        csr.values_mut().fill(T::zero());
        for element_index in 0..self.space.mesh().num_elements() {
            let element_jacobian = self.assemble_element_jacobian(element_index, u);
            let dofs = self.space.element_dofs(element_index);
            for (local_row, &global_row) in dofs.iter().enumerate() {
                let mut row = csr.row_mut(global_row);
                let (columns, values) = row.cols_and_values_mut();
                for (local_col, &global_col) in dofs.iter().enumerate() {
                    let idx = columns
                        .binary_search(&global_col)
                        .map_err(|_| eyre!("Entry ({global_row}, {global_col}) is missing from the Jacobian pattern"))?;
                    values[idx] += element_jacobian[(local_row, local_col)];
                }
            }
        }
        Ok(())
    }
}
