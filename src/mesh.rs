use crate::element::Segment2Element;
use crate::Real;
use nalgebra::Point1;
use serde::{Deserialize, Serialize};

/// Connectivity of a linear segment: indices of its two end vertices.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment2Connectivity(pub [usize; 2]);

impl Segment2Connectivity {
    pub fn vertex_indices(&self) -> &[usize] {
        &self.0
    }

    pub fn element<T: Real>(&self, vertices: &[Point1<T>]) -> Option<Segment2Element<T>> {
        let a = *vertices.get(self.0[0])?;
        let b = *vertices.get(self.0[1])?;
        Some(Segment2Element::from_vertices([a, b]))
    }
}

/// A mesh of the interval `[x_0, x_n]` made up of segments.
///
/// Vertices are stored in increasing order, and segment `i` connects vertices `i` and `i + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct IntervalMesh<T: Real> {
    vertices: Vec<Point1<T>>,
    connectivity: Vec<Segment2Connectivity>,
}

impl<T: Real> IntervalMesh<T> {
    /// Uniform mesh of `[0, length]` with the given number of segments.
    pub fn uniform(length: T, num_elements: usize) -> Self {
        Self::from_vertex_coordinates(linspace(T::zero(), length, num_elements + 1))
    }

    /// Builds a mesh from strictly increasing vertex coordinates.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are not strictly increasing.
    pub fn from_vertex_coordinates(coordinates: Vec<T>) -> Self {
        assert!(
            coordinates.windows(2).all(|w| w[0] < w[1]),
            "Vertex coordinates must be strictly increasing."
        );
        let connectivity = (0..coordinates.len().saturating_sub(1))
            .map(|i| Segment2Connectivity([i, i + 1]))
            .collect();
        Self {
            vertices: coordinates.into_iter().map(Point1::new).collect(),
            connectivity,
        }
    }

    pub fn vertices(&self) -> &[Point1<T>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[Segment2Connectivity] {
        &self.connectivity
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_elements(&self) -> usize {
        self.connectivity.len()
    }

    pub fn element(&self, element_index: usize) -> Option<Segment2Element<T>> {
        self.connectivity.get(element_index)?.element(&self.vertices)
    }

    /// Index of the vertex at the left end of the domain.
    pub fn inlet_vertex(&self) -> usize {
        0
    }

    /// Index of the vertex at the right end of the domain.
    pub fn outlet_vertex(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    /// Returns the index of the segment containing `x`, or `None` if `x` lies outside the mesh.
    ///
    /// Points shared by two segments are assigned to the segment on the left, except for the
    /// left end of the domain, which belongs to the first segment.
    pub fn locate(&self, x: T) -> Option<usize> {
        let first = self.vertices.first()?.x;
        let last = self.vertices.last()?.x;
        if x < first || x > last || self.connectivity.is_empty() {
            return None;
        }
        // Number of vertices strictly to the left of x
        let num_left = self.vertices.partition_point(|v| v.x < x);
        Some(num_left.saturating_sub(1).min(self.num_elements() - 1))
    }
}

/// `n` evenly spaced values from `a` to `b` (inclusive).
///
/// Returns `[a]` if `n == 1` and an empty vector if `n == 0`.
pub fn linspace<T: Real>(a: T, b: T, n: usize) -> Vec<T> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => {
            let denominator = T::from_usize(n - 1).expect("Must be able to fit usize in T");
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        b
                    } else {
                        let i = T::from_usize(i).expect("Must be able to fit usize in T");
                        a + (b - a) * i / denominator
                    }
                })
                .collect()
        }
    }
}
