use nalgebra::RealField;

pub use nalgebra;

/// Vector functions and finite difference approximations of their derivatives
pub mod calculus;
/// Newton's method with optional line search
pub mod newton;

/// Scalar type used by the solver routines.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}
