//! Quadrature rules for the reference segment `[-1, 1]`.
use crate::Real;
use nalgebra::Point1;
use std::f64::consts::PI;
use std::ops::{AddAssign, Mul};

/// A quadrature rule on the reference segment.
pub trait Quadrature1d<T: Real> {
    fn weights(&self) -> &[T];
    fn points(&self) -> &[Point1<T>];

    /// Approximates the integral of the given function over `[-1, 1]`.
    fn integrate<U, F>(&self, f: F) -> U
    where
        F: Fn(&Point1<T>) -> U,
        U: num::Zero + Mul<T, Output = U> + AddAssign<U>,
    {
        let mut integral = U::zero();
        for (&w, p) in self.weights().iter().zip(self.points()) {
            integral += f(p) * w;
        }
        integral
    }
}

/// Gauss-Legendre quadrature with `n` points. Integrates polynomials of degree `2n - 1` exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussRule<T: Real> {
    weights: Vec<T>,
    points: Vec<Point1<T>>,
}

impl<T: Real> GaussRule<T> {
    /// # Panics
    ///
    /// Panics if zero points are requested.
    pub fn new(num_points: usize) -> Self {
        let (weights, points) = gauss_legendre(num_points);
        Self {
            weights: weights
                .into_iter()
                .map(|w| T::from_f64(w).expect("Weight must fit in T"))
                .collect(),
            points: points
                .into_iter()
                .map(|xi| Point1::new(T::from_f64(xi).expect("Point must fit in T")))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl<T: Real> Quadrature1d<T> for GaussRule<T> {
    fn weights(&self) -> &[T] {
        &self.weights
    }

    fn points(&self) -> &[Point1<T>] {
        &self.points
    }
}

/// Returns `(p_n(x), p_n'(x))` for the Legendre polynomial of degree `n`, using
///  m P_m(x) = (2m - 1) x P_{m - 1}(x) - (m - 1) P_{m - 2}(x).
///
/// The derivative formula is singular at |x| == 1.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let mut p = 1.0;
    let mut p_prev = 0.0;
    for m in 1..=n {
        let m = m as f64;
        let p_next = ((2.0 * m - 1.0) * x * p - (m - 1.0) * p_prev) / m;
        p_prev = p;
        p = p_next;
    }
    let dp = n as f64 * (x * p - p_prev) / (x * x - 1.0);
    (p, dp)
}

fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    assert!(n > 0, "number of points must be positive");

    let mut weights = vec![0.0; n];
    let mut points = vec![0.0; n];

    // Roots come in symmetric pairs, so only the first half needs to be found
    for i in 0..(n + 1) / 2 {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut dp;
        loop {
            let (p, dp_x) = legendre(n, x);
            dp = dp_x;
            let dx = -p / dp;
            x += dx;
            if dx.abs() <= 1e-15 {
                dp = legendre(n, x).1;
                break;
            }
        }
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        // Store in ascending order
        points[i] = -x;
        points[n - 1 - i] = x;
        weights[i] = w;
        weights[n - 1 - i] = w;
    }

    (weights, points)
}
