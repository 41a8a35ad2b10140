//! Geometry and wall material of a tapered elastic vessel.
use crate::Real;
use eyre::eyre;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

/// Physical constants of the vessel and the blood.
///
/// The default values describe a straight (untapered) artery segment in CGS units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VesselParameters {
    /// Vessel length `L`.
    pub length: f64,
    /// Kinematic viscosity `nu` of blood.
    pub viscosity: f64,
    /// Characteristic velocity used for the Reynolds number, `Re = velocity / nu`.
    pub reynolds_velocity: f64,
    /// Radius `ru` at the inlet (`x = 0`).
    pub proximal_radius: f64,
    /// Radius `rd` at the outlet (`x = L`).
    pub distal_radius: f64,
    /// Coefficients of the wall stiffness law `Eh/r0 = k1 exp(k2 r0) + k3`.
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    /// Factor in front of both `f = factor Eh/r0` and `df/dr`. Set it to `1.0` to reproduce
    /// solvers that evaluate the `4/3` of the stiffness law in integer arithmetic.
    pub stiffness_factor: f64,
}

impl Default for VesselParameters {
    fn default() -> Self {
        Self {
            length: 20.8,
            viscosity: 0.046,
            reynolds_velocity: 10.0,
            proximal_radius: 0.37,
            distal_radius: 0.37,
            k1: 2.0e7,
            k2: -22.53,
            k3: 8.65e5,
            stiffness_factor: 4.0 / 3.0,
        }
    }
}

impl VesselParameters {
    pub fn validate(&self) -> eyre::Result<()> {
        let positive = [
            ("length", self.length),
            ("viscosity", self.viscosity),
            ("reynolds_velocity", self.reynolds_velocity),
            ("proximal_radius", self.proximal_radius),
            ("distal_radius", self.distal_radius),
            ("stiffness_factor", self.stiffness_factor),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(eyre!("vessel parameter `{}` must be positive and finite, got {}", name, value));
            }
        }
        Ok(())
    }

    pub fn reynolds_number(&self) -> f64 {
        self.reynolds_velocity / self.viscosity
    }
}

/// Material and geometric coefficients of the model evaluated at a single position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VesselCoefficients<T> {
    /// Reference area `A0(x)`.
    pub reference_area: T,
    /// `dA0/dx`.
    pub reference_area_derivative: T,
    /// Wall stiffness `f(x)`.
    pub stiffness: T,
    /// `df/dx`.
    pub stiffness_derivative: T,
    /// `df/dr` evaluated at `r0(x)`.
    pub stiffness_radius_derivative: T,
    /// `dr0/dx`.
    pub radius_derivative: T,
}

/// A vessel whose radius decreases exponentially from `ru` at the inlet to `rd` at the outlet.
///
/// The stiffness `f(x)` follows the power law `(ru/rd)^(x/L)`, while the geometric source term
/// uses `df/dr` of the exponential wall law. The two only agree for `rd = ru`, so with a taper
/// the state `A = A0`, `q = const` is not in equilibrium. With the default wall law and
/// `ru = 0.37`, a mild taper to `rd = 0.36` integrates over a full cycle, whereas `rd = 0.3`
/// makes the Newton iteration diverge within the first steps unless both ends are pinned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaperedVessel<T> {
    length: T,
    proximal_radius: T,
    distal_radius: T,
    k1: T,
    k2: T,
    stiffness_factor: T,
    /// Wall stiffness `Eh` at the inlet.
    eh: T,
    /// `ln(rd / ru) / L`.
    taper_rate: T,
    friction_coefficient: T,
    boundary_layer_thickness: T,
}

fn to_real<T: Real>(value: f64) -> T {
    T::from_f64(value).expect("Value must fit in T")
}

impl<T: Real> TaperedVessel<T> {
    /// Builds the vessel for a cardiac cycle of the given `period`.
    ///
    /// The period determines the viscous boundary layer thickness `db = sqrt(nu T / 2 pi)`.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn new(parameters: &VesselParameters, period: T) -> eyre::Result<Self> {
        parameters.validate()?;
        if !(period > T::zero()) {
            return Err(eyre!("period must be positive, got {}", period));
        }
        let length = to_real::<T>(parameters.length);
        let ru = to_real::<T>(parameters.proximal_radius);
        let rd = to_real::<T>(parameters.distal_radius);
        let k1 = to_real::<T>(parameters.k1);
        let k2 = to_real::<T>(parameters.k2);
        let k3 = to_real::<T>(parameters.k3);
        let nu = to_real::<T>(parameters.viscosity);
        let reynolds = to_real::<T>(parameters.reynolds_number());

        let boundary_layer_thickness = (nu * period / 2.0 / T::pi()).sqrt();
        let friction_coefficient = 2.0 * T::pi().sqrt() / boundary_layer_thickness / reynolds;

        Ok(Self {
            length,
            proximal_radius: ru,
            distal_radius: rd,
            k1,
            k2,
            stiffness_factor: to_real::<T>(parameters.stiffness_factor),
            eh: ru * (k1 * (k2 * ru).exp() + k3),
            taper_rate: (rd / ru).ln() / length,
            friction_coefficient,
            boundary_layer_thickness,
        })
    }

    pub fn length(&self) -> T {
        self.length
    }

    pub fn proximal_radius(&self) -> T {
        self.proximal_radius
    }

    pub fn distal_radius(&self) -> T {
        self.distal_radius
    }

    /// Viscous boundary layer thickness `db`.
    pub fn boundary_layer_thickness(&self) -> T {
        self.boundary_layer_thickness
    }

    /// Coefficient `2 sqrt(pi) / (db Re)` of the wall friction term.
    pub fn friction_coefficient(&self) -> T {
        self.friction_coefficient
    }

    /// `r0(x) = ru (rd/ru)^(x/L)`.
    pub fn radius(&self, x: T) -> T {
        self.proximal_radius * (self.taper_rate * x).exp()
    }

    pub fn radius_derivative(&self, x: T) -> T {
        self.taper_rate * self.radius(x)
    }

    /// `A0(x) = pi ru² (rd/ru)^(2x/L)`.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference_area(&self, x: T) -> T {
        T::pi() * self.proximal_radius.powi(2) * (2.0 * self.taper_rate * x).exp()
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference_area_derivative(&self, x: T) -> T {
        2.0 * self.taper_rate * self.reference_area(x)
    }

    /// `f(x) = 4/3 Eh / ru (ru/rd)^(x/L)` with the default stiffness factor.
    pub fn stiffness(&self, x: T) -> T {
        self.stiffness_factor * self.eh / self.proximal_radius * (-self.taper_rate * x).exp()
    }

    pub fn stiffness_derivative(&self, x: T) -> T {
        -self.taper_rate * self.stiffness(x)
    }

    /// `df/dr = 4/3 k1 k2 exp(k2 r0(x))`.
    pub fn stiffness_radius_derivative(&self, x: T) -> T {
        self.stiffness_factor * self.k1 * self.k2 * (self.k2 * self.radius(x)).exp()
    }

    pub fn coefficients(&self, x: T) -> VesselCoefficients<T> {
        VesselCoefficients {
            reference_area: self.reference_area(x),
            reference_area_derivative: self.reference_area_derivative(x),
            stiffness: self.stiffness(x),
            stiffness_derivative: self.stiffness_derivative(x),
            stiffness_radius_derivative: self.stiffness_radius_derivative(x),
            radius_derivative: self.radius_derivative(x),
        }
    }
}
