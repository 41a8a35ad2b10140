use crate::Real;
use nalgebra::{Point1, RowVector2};
use numeric_literals::replace_float_literals;

/// A linear Lagrange segment in one dimension.
///
/// The reference domain is `[-1, 1]`, mapped affinely onto `[a, b]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Segment2Element<T: Real> {
    vertices: [Point1<T>; 2],
}

impl<T: Real> Segment2Element<T> {
    pub fn from_vertices(vertices: [Point1<T>; 2]) -> Self {
        Self { vertices }
    }

    pub fn from_interval(interval: [T; 2]) -> Self {
        Self::from_vertices([Point1::new(interval[0]), Point1::new(interval[1])])
    }

    pub fn vertices(&self) -> &[Point1<T>; 2] {
        &self.vertices
    }

    /// Values of the two basis functions at the reference coordinate `xi`.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn evaluate_basis(&self, xi: &Point1<T>) -> RowVector2<T> {
        let xi = xi[0];
        RowVector2::new((1.0 - xi) / 2.0, (1.0 + xi) / 2.0)
    }

    /// Gradients of the basis functions with respect to the reference coordinate.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference_gradients(&self) -> RowVector2<T> {
        RowVector2::new(-0.5, 0.5)
    }

    /// Gradients of the basis functions with respect to the physical coordinate.
    pub fn physical_gradients(&self) -> RowVector2<T> {
        self.reference_gradients() / self.reference_jacobian()
    }

    /// The (constant) derivative `dx/dxi`, i.e. half the element length.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference_jacobian(&self) -> T {
        (self.vertices[1].x - self.vertices[0].x) / 2.0
    }

    pub fn map_reference_coords(&self, xi: &Point1<T>) -> Point1<T> {
        let phi = self.evaluate_basis(xi);
        Point1::new(phi[0] * self.vertices[0].x + phi[1] * self.vertices[1].x)
    }

    /// Inverse of [`map_reference_coords`](Self::map_reference_coords).
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn map_physical_coords(&self, x: &Point1<T>) -> Point1<T> {
        let midpoint = (self.vertices[0].x + self.vertices[1].x) / 2.0;
        Point1::new((x.x - midpoint) / self.reference_jacobian())
    }

    pub fn diameter(&self) -> T {
        (self.vertices[1].x - self.vertices[0].x).abs()
    }
}
