//! Consumers of the per-step solution snapshots produced by a simulation.
use crate::io::vtk::IntervalMeshDataSetBuilder;
use crate::mesh::IntervalMesh;
use crate::Real;
use eyre::{eyre, WrapErr};
use log::info;
use num::ToPrimitive;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Nodal area and flow of the solution at a single time.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<T> {
    /// `0` for the initial condition, `n` after the `n`-th time step.
    pub step: usize,
    pub time: T,
    pub coordinates: Vec<T>,
    pub area: Vec<T>,
    pub flow: Vec<T>,
}

pub trait TrajectorySink<T> {
    fn write_frame(&mut self, frame: &Frame<T>) -> eyre::Result<()>;

    /// Called once after the last frame has been written.
    fn finish(&mut self) -> eyre::Result<()> {
        Ok(())
    }
}

impl<T, S> TrajectorySink<T> for &mut S
where
    S: TrajectorySink<T>,
{
    fn write_frame(&mut self, frame: &Frame<T>) -> eyre::Result<()> {
        S::write_frame(self, frame)
    }

    fn finish(&mut self) -> eyre::Result<()> {
        S::finish(self)
    }
}

/// Keeps all frames in memory.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryRecorder<T> {
    frames: Vec<Frame<T>>,
    finished: bool,
}

impl<T> TrajectoryRecorder<T> {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            finished: false,
        }
    }

    pub fn frames(&self) -> &[Frame<T>] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame<T>> {
        self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<T: Clone> TrajectorySink<T> for TrajectoryRecorder<T> {
    fn write_frame(&mut self, frame: &Frame<T>) -> eyre::Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> eyre::Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Writes every frame to a legacy VTK file `<prefix>_<step>.vtk` and, on
/// [`finish`](TrajectorySink::finish), a ParaView collection `<prefix>.pvd` referencing them.
#[derive(Debug, Clone)]
pub struct VtkTrajectoryWriter<T: Real> {
    directory: PathBuf,
    prefix: String,
    mesh: IntervalMesh<T>,
    // Time and file name of each written frame
    entries: Vec<(f64, String)>,
}

impl<T: Real + ToPrimitive> VtkTrajectoryWriter<T> {
    /// Creates the output directory if it does not exist.
    pub fn new(directory: impl AsRef<Path>, prefix: impl Into<String>, mesh: IntervalMesh<T>) -> eyre::Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)
            .wrap_err_with(|| format!("failed to create output directory {}", directory.display()))?;
        Ok(Self {
            directory,
            prefix: prefix.into(),
            mesh,
            entries: Vec::new(),
        })
    }

    pub fn frame_path(&self, step: usize) -> PathBuf {
        self.directory.join(self.frame_file_name(step))
    }

    pub fn collection_path(&self) -> PathBuf {
        self.directory.join(format!("{}.pvd", self.prefix))
    }

    fn frame_file_name(&self, step: usize) -> String {
        format!("{}_{:05}.vtk", self.prefix, step)
    }

    fn collection_xml(&self) -> String {
        let mut xml = String::new();
        // Writing to a String cannot fail
        let _ = writeln!(xml, "<?xml version=\"1.0\"?>");
        let _ = writeln!(
            xml,
            "<VTKFile type=\"Collection\" version=\"0.1\" byte_order=\"LittleEndian\">"
        );
        let _ = writeln!(xml, "  <Collection>");
        for (time, file) in &self.entries {
            let _ = writeln!(
                xml,
                "    <DataSet timestep=\"{:e}\" group=\"\" part=\"0\" file=\"{}\"/>",
                time, file
            );
        }
        let _ = writeln!(xml, "  </Collection>");
        let _ = writeln!(xml, "</VTKFile>");
        xml
    }
}

impl<T: Real + ToPrimitive> TrajectorySink<T> for VtkTrajectoryWriter<T> {
    fn write_frame(&mut self, frame: &Frame<T>) -> eyre::Result<()> {
        let time = frame
            .time
            .to_f64()
            .ok_or_else(|| eyre!("frame time cannot be represented as f64"))?;
        let file_name = self.frame_file_name(frame.step);
        IntervalMeshDataSetBuilder::from_mesh(&self.mesh)
            .with_title(format!("{} t = {:e}", self.prefix, time))
            .with_point_scalar_attributes("area", &frame.area)
            .with_point_scalar_attributes("flow", &frame.flow)
            .try_export(self.directory.join(&file_name))
            .wrap_err_with(|| format!("failed to write frame {}", frame.step))?;
        self.entries.push((time, file_name));
        Ok(())
    }

    fn finish(&mut self) -> eyre::Result<()> {
        let path = self.collection_path();
        fs::write(&path, self.collection_xml())
            .wrap_err_with(|| format!("failed to write collection file {}", path.display()))?;
        info!("Wrote {} frames to {}", self.entries.len(), path.display());
        Ok(())
    }
}
