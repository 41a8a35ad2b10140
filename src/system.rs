//! The nonlinear system solved at every time step.
use crate::assembly::BloodFlowAssembler;
use crate::boundary::{apply_dirichlet_jacobian, apply_dirichlet_residual, DirichletBoundaryCondition};
use crate::Real;
use bloodflow_optimize::calculus::{DifferentiableVectorFunction, VectorFunction};
use eyre::eyre;
use nalgebra::{DVectorView, DVectorViewMut};
use nalgebra_sparse::convert::serial::convert_csr_dense;
use nalgebra_sparse::CsrMatrix;
use std::error::Error;

/// Residual `F(U)` of one implicit Euler step, with Dirichlet rows replaced by `U[d] - value`.
#[derive(Debug)]
pub struct ImplicitEulerSystem<'a, T: Real> {
    assembler: &'a BloodFlowAssembler<T>,
    conditions: &'a [DirichletBoundaryCondition<T>],
    jacobian: &'a mut CsrMatrix<T>,
}

impl<'a, T: Real> ImplicitEulerSystem<'a, T> {
    /// `jacobian` must have been created by [`BloodFlowAssembler::create_jacobian`].
    pub fn new(
        assembler: &'a BloodFlowAssembler<T>,
        conditions: &'a [DirichletBoundaryCondition<T>],
        jacobian: &'a mut CsrMatrix<T>,
    ) -> Self {
        Self {
            assembler,
            conditions,
            jacobian,
        }
    }

    /// Assembles the constrained Jacobian at `x` into the stored matrix and returns it.
    pub fn assemble_jacobian(&mut self, x: &DVectorView<T>) -> eyre::Result<&CsrMatrix<T>> {
        self.assembler.assemble_jacobian_into(self.jacobian, x)?;
        apply_dirichlet_jacobian(self.jacobian, self.assembler.space(), self.conditions)?;
        Ok(&*self.jacobian)
    }
}

impl<'a, T: Real> VectorFunction<T> for ImplicitEulerSystem<'a, T> {
    fn dimension(&self) -> usize {
        self.assembler.space().num_dofs()
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<T>, x: &DVectorView<T>) {
        self.assembler.assemble_residual_into(f, x);
        apply_dirichlet_residual(f, x, self.assembler.space(), self.conditions);
    }
}

impl<'a, T: Real> DifferentiableVectorFunction<T> for ImplicitEulerSystem<'a, T> {
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<T>,
        x: &DVectorView<T>,
        rhs: &DVectorView<T>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let jacobian = self.assemble_jacobian(x)?;
        let dense = convert_csr_dense(jacobian);
        let solution = dense
            .lu()
            .solve(rhs)
            .ok_or_else(|| eyre!("Jacobian is singular"))?;
        sol.copy_from(&solution);
        Ok(())
    }
}
