//! One-dimensional pulsatile blood flow in a tapered elastic vessel.
//!
//! The cross-sectional area `A(x, t)` and the flow rate `q(x, t)` are discretized with linear
//! finite elements in space and implicit Euler in time, and every time step is solved with
//! Newton's method. See [`simulation::Simulation`] for the entry point.
pub mod assembly;
pub mod boundary;
pub mod element;
pub mod form;
pub mod io;
pub mod mesh;
pub mod quadrature;
pub mod simulation;
pub mod space;
pub mod system;
pub mod vessel;
pub mod waveform;

pub mod optimize {
    pub use bloodflow_optimize::*;
}

pub use bloodflow_optimize::Real;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
pub extern crate vtkio;
