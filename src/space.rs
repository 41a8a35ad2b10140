//! The mixed P1 × P1 space holding cross-sectional area and flow rate.
use crate::mesh::IntervalMesh;
use crate::Real;
use nalgebra::{DVector, Point1, Vector2};
use serde::{Deserialize, Serialize};

/// The two unknown fields of the flow model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    /// Cross-sectional area `A`.
    Area,
    /// Volumetric flow rate `q`.
    Flow,
}

impl Field {
    pub fn component(&self) -> usize {
        match self {
            Field::Area => 0,
            Field::Flow => 1,
        }
    }
}

/// Number of unknowns per mesh vertex.
pub const SOLUTION_DIM: usize = 2;

/// Linear Lagrange elements for both area and flow on the same interval mesh.
///
/// Degrees of freedom are interleaved per vertex, `[A_0, q_0, A_1, q_1, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedSpace<T: Real> {
    mesh: IntervalMesh<T>,
}

impl<T: Real> MixedSpace<T> {
    pub fn new(mesh: IntervalMesh<T>) -> Self {
        Self { mesh }
    }

    pub fn mesh(&self) -> &IntervalMesh<T> {
        &self.mesh
    }

    pub fn num_dofs(&self) -> usize {
        SOLUTION_DIM * self.mesh.num_vertices()
    }

    pub fn dof(&self, vertex: usize, field: Field) -> usize {
        SOLUTION_DIM * vertex + field.component()
    }

    /// Global dofs of an element, ordered `[A_a, q_a, A_b, q_b]`.
    pub fn element_dofs(&self, element_index: usize) -> [usize; 4] {
        let [a, b] = self.mesh.connectivity()[element_index].0;
        [
            self.dof(a, Field::Area),
            self.dof(a, Field::Flow),
            self.dof(b, Field::Area),
            self.dof(b, Field::Flow),
        ]
    }

    /// Builds a coefficient vector by evaluating `f(x) = (A(x), q(x))` at every vertex.
    pub fn interpolate(&self, f: impl Fn(T) -> Vector2<T>) -> DVector<T> {
        let mut u = DVector::zeros(self.num_dofs());
        for (i, v) in self.mesh.vertices().iter().enumerate() {
            let value = f(v.x);
            u[self.dof(i, Field::Area)] = value[0];
            u[self.dof(i, Field::Flow)] = value[1];
        }
        u
    }

    /// Nodal values of a single field.
    pub fn field_values(&self, u: &DVector<T>, field: Field) -> Vec<T> {
        (0..self.mesh.num_vertices())
            .map(|i| u[self.dof(i, field)])
            .collect()
    }

    /// Evaluates a field of the finite element function `u` at the point `x`.
    ///
    /// Returns `None` if `x` is outside the mesh.
    pub fn evaluate(&self, u: &DVector<T>, field: Field, x: T) -> Option<T> {
        assert_eq!(u.len(), self.num_dofs(), "Coefficient vector has wrong length.");
        let element_index = self.mesh.locate(x)?;
        let element = self.mesh.element(element_index)?;
        let [a, b] = self.mesh.connectivity()[element_index].0;
        let xi = element.map_physical_coords(&Point1::new(x));
        let phi = element.evaluate_basis(&xi);
        Some(phi[0] * u[self.dof(a, field)] + phi[1] * u[self.dof(b, field)])
    }
}
