pub mod trajectory;
pub mod vtk;
