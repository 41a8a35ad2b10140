use crate::calculus::{DifferentiableVectorFunction, VectorFunction};
use crate::Real;
use itertools::iterate;
use log::debug;
use nalgebra::{DVectorView, DVectorViewMut, Scalar};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::Display;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NewtonResult<T>
where
    T: Scalar,
{
    pub iterations: usize,
    pub residual_norm: T,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewtonSettings<T> {
    pub max_iterations: Option<usize>,
    pub tolerance: T,
    pub relative_tolerance: Option<T>,
}

impl<T: Real> Default for NewtonSettings<T> {
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn default() -> Self {
        Self {
            max_iterations: Some(50),
            tolerance: 1e-10,
            relative_tolerance: Some(1e-9),
        }
    }
}

impl<T: Real> NewtonSettings<T> {
    fn is_converged(&self, residual_norm: T, initial_residual_norm: T) -> bool {
        residual_norm <= self.tolerance
            || self
                .relative_tolerance
                .map(|rtol| residual_norm <= rtol * initial_residual_norm)
                .unwrap_or(false)
    }
}

#[derive(Debug)]
pub enum NewtonError {
    /// The procedure failed because the maximum number of iterations was reached.
    MaximumIterationsReached(usize),
    /// The residual became NaN or infinite at the given iteration.
    NonFiniteResidual(usize),
    /// The procedure failed because solving the Jacobian system failed.
    JacobianError(Box<dyn Error + Send + Sync>),
    /// The line search failed to produce a valid step direction.
    LineSearchError(Box<dyn Error + Send + Sync>),
}

impl Display for NewtonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            NewtonError::MaximumIterationsReached(maxit) => {
                write!(f, "Failed to converge within maximum number of iterations ({}).", maxit)
            }
            NewtonError::NonFiniteResidual(iter) => {
                write!(f, "Residual is not finite after {} iterations.", iter)
            }
            NewtonError::JacobianError(err) => {
                write!(f, "Failed to solve Jacobian system. Error: {}", err)
            }
            NewtonError::LineSearchError(err) => {
                write!(f, "Line search failed to produce valid step direction. Error: {}", err)
            }
        }
    }
}

impl Error for NewtonError {}

/// Attempts to solve the non-linear equation F(u) = 0.
///
/// No heap allocation is performed. The solution is said to have converged if
/// `|F(u)|_2 <= tolerance` or `|F(u)|_2 <= relative_tolerance * |F(u_0)|_2`.
pub fn newton<'a, T, F>(
    function: F,
    x: impl Into<DVectorViewMut<'a, T>>,
    f: impl Into<DVectorViewMut<'a, T>>,
    dx: impl Into<DVectorViewMut<'a, T>>,
    settings: NewtonSettings<T>,
) -> Result<NewtonResult<T>, NewtonError>
where
    T: Real,
    F: DifferentiableVectorFunction<T>,
{
    newton_line_search(function, x, f, dx, settings, &mut NoLineSearch {})
}

/// Same as `newton`, but allows specifying a line search.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn newton_line_search<'a, T, F>(
    mut function: F,
    x: impl Into<DVectorViewMut<'a, T>>,
    f: impl Into<DVectorViewMut<'a, T>>,
    dx: impl Into<DVectorViewMut<'a, T>>,
    settings: NewtonSettings<T>,
    line_search: &mut impl LineSearch<T, F>,
) -> Result<NewtonResult<T>, NewtonError>
where
    T: Real,
    F: DifferentiableVectorFunction<T>,
{
    let mut x = x.into();
    let mut f = f.into();
    let mut minus_dx = dx.into();

    assert_eq!(x.nrows(), f.nrows());
    assert_eq!(minus_dx.nrows(), f.nrows());

    function.eval_into(&mut f, &DVectorView::from(&x));
    let initial_norm = f.norm();
    let mut norm = initial_norm;
    let mut iter = 0;

    loop {
        if !norm.is_finite() {
            return Err(NewtonError::NonFiniteResidual(iter));
        }
        debug!("Newton residual norm at iter {}: {}", iter, norm);
        if settings.is_converged(norm, initial_norm) {
            break;
        }
        if settings
            .max_iterations
            .map(|max_iter| iter == max_iter)
            .unwrap_or(false)
        {
            return Err(NewtonError::MaximumIterationsReached(iter));
        }

        // Solve the system J dx = -f   <=>   J (-dx) = f
        function
            .solve_jacobian_system(&mut minus_dx, &DVectorView::from(&x), &DVectorView::from(&f))
            .map_err(NewtonError::JacobianError)?;

        // Flip sign to make it consistent with line search
        minus_dx *= -1.0;
        let dx = &minus_dx;

        let step_length = line_search
            .step(
                &mut function,
                DVectorViewMut::from(&mut f),
                DVectorViewMut::from(&mut x),
                DVectorView::from(dx),
            )
            .map_err(NewtonError::LineSearchError)?;
        debug!("Newton step length at iter {}: {}", iter, step_length);
        norm = f.norm();
        iter += 1;
    }

    Ok(NewtonResult {
        iterations: iter,
        residual_norm: norm,
    })
}

pub trait LineSearch<T: Scalar, F: VectorFunction<T>> {
    fn step(
        &mut self,
        function: &mut F,
        f: DVectorViewMut<T>,
        x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error + Send + Sync>>;
}

/// Trivial line search, equivalent to a single, full Newton step.
#[derive(Clone, Debug)]
pub struct NoLineSearch;

impl<T, F> LineSearch<T, F> for NoLineSearch
where
    T: Real,
    F: VectorFunction<T>,
{
    fn step(
        &mut self,
        function: &mut F,
        mut f: DVectorViewMut<T>,
        mut x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error + Send + Sync>> {
        x.axpy(T::one(), &direction, T::one());
        function.eval_into(&mut f, &DVectorView::from(&x));
        Ok(T::one())
    }
}

/// Standard backtracking line search using the Armijo condition.
///
/// See Jorge & Nocedal (2006), Numerical Optimization, Chapter 3.1.
#[derive(Clone, Debug)]
pub struct BacktrackingLineSearch {
    pub c: f64,
    pub alpha_min: f64,
}

impl Default for BacktrackingLineSearch {
    fn default() -> Self {
        Self {
            c: 1e-4,
            alpha_min: 1e-6,
        }
    }
}

impl<T, F> LineSearch<T, F> for BacktrackingLineSearch
where
    T: Real,
    F: VectorFunction<T>,
{
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn step(
        &mut self,
        function: &mut F,
        mut f: DVectorViewMut<T>,
        mut x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error + Send + Sync>> {
        // With p the Newton direction we have grad g^T p ~= -2 g(x), so the sufficient
        // decrease condition reduces to
        //  g(x + alpha p) <= (1 - c alpha) g(x)
        let c = T::from_f64(self.c).unwrap();
        let alpha_min = T::from_f64(self.alpha_min).unwrap();
        let g_initial = 0.5 * f.magnitude_squared();

        let mut alphas = [1.0, 0.75, 0.5]
            .into_iter()
            .chain(iterate(0.25, |alpha| 0.25 * *alpha));

        // x^{k+1} = x^k + (alpha^k - alpha^{k-1}) p, so we only ever move x by the difference
        let mut alpha_prev = 0.0;
        loop {
            let alpha = alphas
                .next()
                .expect("Step length sequence is infinite");
            x.axpy(alpha - alpha_prev, &direction, T::one());
            function.eval_into(&mut f, &DVectorView::from(&x));

            let g = 0.5 * f.magnitude_squared();
            if g <= (1.0 - c * alpha) * g_initial {
                return Ok(alpha);
            } else if alpha < alpha_min {
                return Err(Box::from(format!(
                    "Step length {} is smaller than minimum allowed step length {}.",
                    alpha, alpha_min
                )));
            }
            alpha_prev = alpha;
        }
    }
}
