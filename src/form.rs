//! Pointwise integrands of the implicit Euler weak form.
//!
//! With `U = (A, q)` and test functions `(v1, v2)`, one time step solves
//!
//! ```text
//! ∫ [(A - A_n) + dt q'] v1 dx = 0
//! ∫ [(q - q_n) + dt (G' + c_f q / sqrt(A + eps) - S_geo)] v2 dx = 0
//! G     = q² / (A + eps) + f sqrt(A0 (A + eps))
//! S_geo = (2 sqrt(A + eps) (sqrt(pi) f + sqrt(A0) df/dr) - (A + eps) df/dr) dr0/dx
//! ```
//!
//! The flux derivative `G'` is expanded with the chain rule, using the analytic spatial
//! derivatives of `f` and `A0`. Every integrand comes with its partial derivatives with respect to
//! `A`, `A'`, `q` and `q'`, from which the element Jacobian is assembled.
use crate::vessel::VesselCoefficients;
use crate::Real;
use numeric_literals::replace_float_literals;

/// `numerator / (area + epsilon)`.
///
/// For `area >= 0` and a positive `epsilon` the result is finite and bounded by
/// `numerator / epsilon` in magnitude.
pub fn regularized_quotient<T: Real>(numerator: T, area: T, epsilon: T) -> T {
    numerator / (area + epsilon)
}

/// Finite element function values at a quadrature point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointState<T> {
    pub area: T,
    pub area_gradient: T,
    pub flow: T,
    pub flow_gradient: T,
    /// Area at the previous time step.
    pub previous_area: T,
    /// Flow at the previous time step.
    pub previous_flow: T,
}

/// Partial derivatives of an integrand with respect to the local unknowns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrandDerivatives<T> {
    pub area: T,
    pub area_gradient: T,
    pub flow: T,
    pub flow_gradient: T,
}

/// Value of an integrand together with its partial derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integrand<T> {
    pub value: T,
    pub derivatives: IntegrandDerivatives<T>,
}

/// The weak form of one implicit Euler step of the 1D flow equations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloodFlowForm<T> {
    pub time_step: T,
    /// Regularization `eps` added to the area in every division and square root.
    pub area_regularization: T,
    /// Wall friction coefficient `c_f = 2 sqrt(pi) / (db Re)`.
    pub friction_coefficient: T,
}

impl<T: Real> BloodFlowForm<T> {
    /// Integrand tested against `v1` (mass conservation).
    pub fn continuity(&self, u: &PointState<T>) -> Integrand<T> {
        let dt = self.time_step;
        Integrand {
            value: (u.area - u.previous_area) + dt * u.flow_gradient,
            derivatives: IntegrandDerivatives {
                area: T::one(),
                area_gradient: T::zero(),
                flow: T::zero(),
                flow_gradient: dt,
            },
        }
    }

    /// Integrand tested against `v2` (momentum balance).
    #[allow(non_snake_case)]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn momentum(&self, u: &PointState<T>, c: &VesselCoefficients<T>) -> Integrand<T> {
        let dt = self.time_step;
        let eps = self.area_regularization;
        let c_f = self.friction_coefficient;
        let (q, dq) = (u.flow, u.flow_gradient);
        let dA = u.area_gradient;
        let (A0, dA0) = (c.reference_area, c.reference_area_derivative);
        let (f, df) = (c.stiffness, c.stiffness_derivative);
        let (df_dr, dr0) = (c.stiffness_radius_derivative, c.radius_derivative);
        let sqrt_pi = T::pi().sqrt();

        let a = u.area + eps;
        let sqrt_a = a.sqrt();
        // s = sqrt(A0 (A + eps))
        let s = (A0 * a).sqrt();

        // Convective part of G' = d/dx (q² / a)
        let q_over_a = regularized_quotient(q, u.area, eps);
        let convective = 2.0 * q_over_a * dq - q_over_a * q_over_a * dA;
        // Pressure part of G' = d/dx (f s)
        let pressure = df * s + f * (dA0 * a + A0 * dA) / (2.0 * s);
        let friction = c_f * q / sqrt_a;
        let wall = sqrt_pi * f + A0.sqrt() * df_dr;
        let geometric = (2.0 * sqrt_a * wall - a * df_dr) * dr0;

        let value = (q - u.previous_flow) + dt * (convective + pressure + friction - geometric);

        let d_convective_dA = -2.0 * q_over_a * dq / a + 2.0 * q_over_a * q_over_a * dA / a;
        let d_pressure_dA =
            df * A0 / (2.0 * s) + f * (dA0 / (2.0 * s) - (dA0 * a + A0 * dA) * A0 / (4.0 * s * s * s));
        let d_friction_dA = -c_f * q / (2.0 * a * sqrt_a);
        let d_geometric_dA = (wall / sqrt_a - df_dr) * dr0;

        let derivatives = IntegrandDerivatives {
            area: dt * (d_convective_dA + d_pressure_dA + d_friction_dA - d_geometric_dA),
            area_gradient: dt * (-q_over_a * q_over_a + f * A0 / (2.0 * s)),
            flow: 1.0 + dt * (2.0 * dq / a - 2.0 * q_over_a * dA / a + c_f / sqrt_a),
            flow_gradient: dt * 2.0 * q_over_a,
        };

        Integrand { value, derivatives }
    }
}
