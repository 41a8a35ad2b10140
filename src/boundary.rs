//! Dirichlet boundary conditions on the end points of the vessel.
use crate::space::{Field, MixedSpace};
use crate::Real;
use eyre::eyre;
use nalgebra::{DVector, DVectorView, DVectorViewMut};
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};

/// Prescribes the value of one field at one mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirichletBoundaryCondition<T> {
    pub vertex: usize,
    pub field: Field,
    pub value: T,
}

impl<T: Real> DirichletBoundaryCondition<T> {
    pub fn new(vertex: usize, field: Field, value: T) -> Self {
        Self { vertex, field, value }
    }

    pub fn dof(&self, space: &MixedSpace<T>) -> usize {
        space.dof(self.vertex, self.field)
    }
}

/// Selects which boundary values are pinned in addition to the inlet flow.
///
/// The inlet flow rate always follows the prescribed waveform. The remaining conditions pin
/// the area to its reference value `A0` at the respective end, or the outlet flow to the
/// current inlet flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryPolicy {
    pub pin_inlet_area: bool,
    pub pin_outlet_area: bool,
    pub pin_outlet_flow: bool,
}

impl BoundaryPolicy {
    /// Collects the conditions active at a time step with the given inlet flow rate.
    pub fn conditions<T: Real>(
        &self,
        space: &MixedSpace<T>,
        inlet_flow: T,
        inlet_area: T,
        outlet_area: T,
    ) -> Vec<DirichletBoundaryCondition<T>> {
        let inlet = space.mesh().inlet_vertex();
        let outlet = space.mesh().outlet_vertex();
        let mut conditions = vec![DirichletBoundaryCondition::new(inlet, Field::Flow, inlet_flow)];
        if self.pin_inlet_area {
            conditions.push(DirichletBoundaryCondition::new(inlet, Field::Area, inlet_area));
        }
        if self.pin_outlet_area {
            conditions.push(DirichletBoundaryCondition::new(outlet, Field::Area, outlet_area));
        }
        if self.pin_outlet_flow {
            conditions.push(DirichletBoundaryCondition::new(outlet, Field::Flow, inlet_flow));
        }
        conditions
    }
}

/// Overwrites the constrained entries of `u` with their prescribed values.
pub fn apply_dirichlet_values<T: Real>(
    u: &mut DVector<T>,
    space: &MixedSpace<T>,
    conditions: &[DirichletBoundaryCondition<T>],
) {
    for bc in conditions {
        u[bc.dof(space)] = bc.value;
    }
}

/// Replaces constrained residual entries by `u[d] - value`.
pub fn apply_dirichlet_residual<T: Real>(
    residual: &mut DVectorViewMut<T>,
    u: &DVectorView<T>,
    space: &MixedSpace<T>,
    conditions: &[DirichletBoundaryCondition<T>],
) {
    for bc in conditions {
        let d = bc.dof(space);
        residual[d] = u[d] - bc.value;
    }
}

/// Replaces constrained rows of the Jacobian by rows of the identity matrix.
///
/// Columns are left untouched, so the matrix is in general no longer symmetric.
pub fn apply_dirichlet_jacobian<T: Real>(
    jacobian: &mut CsrMatrix<T>,
    space: &MixedSpace<T>,
    conditions: &[DirichletBoundaryCondition<T>],
) -> eyre::Result<()> {
    for bc in conditions {
        let d = bc.dof(space);
        if d >= jacobian.nrows() {
            return Err(eyre!("Dirichlet dof {d} is out of bounds for a Jacobian with {} rows", jacobian.nrows()));
        }
        let mut row = jacobian.row_mut(d);
        let (columns, values) = row.cols_and_values_mut();
        let mut has_diagonal = false;
        for (&col, value) in columns.iter().zip(values.iter_mut()) {
            if col == d {
                *value = T::one();
                has_diagonal = true;
            } else {
                *value = T::zero();
            }
        }
        if !has_diagonal {
            return Err(eyre!("Jacobian pattern has no diagonal entry in row {d}"));
        }
    }
    Ok(())
}
