use bloodflow::mesh::{linspace, IntervalMesh, Segment2Connectivity};
use proptest::prelude::*;

#[test]
fn uniform_mesh_vertices_and_connectivity() {
    let mesh = IntervalMesh::uniform(2.0, 4);

    let x: Vec<f64> = mesh.vertices().iter().map(|v| v.x).collect();
    assert_eq!(x, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    assert_eq!(
        mesh.connectivity(),
        &[
            Segment2Connectivity([0, 1]),
            Segment2Connectivity([1, 2]),
            Segment2Connectivity([2, 3]),
            Segment2Connectivity([3, 4])
        ]
    );
    assert_eq!(mesh.num_vertices(), 5);
    assert_eq!(mesh.num_elements(), 4);
    assert_eq!(mesh.inlet_vertex(), 0);
    assert_eq!(mesh.outlet_vertex(), 4);
}

#[test]
fn element_of_uniform_mesh() {
    let mesh = IntervalMesh::uniform(2.0, 4);
    let element = mesh.element(2).unwrap();
    assert_eq!(element.vertices()[0].x, 1.0);
    assert_eq!(element.vertices()[1].x, 1.5);
    assert!(mesh.element(4).is_none());
}

#[test]
fn locate_assigns_shared_vertices_to_left_segment() {
    let mesh = IntervalMesh::uniform(2.0, 4);
    assert_eq!(mesh.locate(0.0), Some(0));
    assert_eq!(mesh.locate(0.25), Some(0));
    assert_eq!(mesh.locate(0.5), Some(0));
    assert_eq!(mesh.locate(0.6), Some(1));
    assert_eq!(mesh.locate(1.5), Some(2));
    assert_eq!(mesh.locate(2.0), Some(3));
    assert_eq!(mesh.locate(-0.1), None);
    assert_eq!(mesh.locate(2.1), None);
}

#[test]
fn locate_in_empty_mesh() {
    let mesh = IntervalMesh::<f64>::from_vertex_coordinates(vec![1.0]);
    assert_eq!(mesh.num_elements(), 0);
    assert_eq!(mesh.locate(1.0), None);
}

#[test]
#[should_panic]
fn non_increasing_vertices_are_rejected() {
    IntervalMesh::from_vertex_coordinates(vec![0.0, 1.0, 1.0, 2.0]);
}

#[test]
fn linspace_edge_cases() {
    assert!(linspace(0.0f64, 1.0, 0).is_empty());
    assert_eq!(linspace(3.0, 1.0, 1), vec![3.0]);
    assert_eq!(linspace(0.0, 1.0, 2), vec![0.0, 1.0]);
    assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
}

proptest! {
    #[test]
    fn linspace_ends_exactly_at_endpoints(a in -10.0f64 .. 10.0, length in 0.1f64 .. 10.0, n in 2 .. 50usize) {
        let b = a + length;
        let values = linspace(a, b, n);
        prop_assert_eq!(values.len(), n);
        prop_assert_eq!(values[0], a);
        prop_assert_eq!(values[n - 1], b);
        prop_assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn located_segment_contains_point(length in 0.1f64 .. 50.0, n in 1 .. 30usize, s in 0.0f64 ..= 1.0) {
        let mesh = IntervalMesh::uniform(length, n);
        let x = (s * length).min(length);
        let index = mesh.locate(x).expect("Point inside mesh must be located");
        let element = mesh.element(index).unwrap();
        let [a, b] = *element.vertices();
        prop_assert!(a.x <= x && x <= b.x);
    }
}
