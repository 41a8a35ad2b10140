use crate::mesh::IntervalMesh;
use crate::Real;
use eyre::eyre;
use num::ToPrimitive;
use std::convert::TryInto;
use std::path::Path;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataArray, DataSet, ElementType, IOBuffer, Piece,
    UnstructuredGridPiece, Version, VertexNumbers, Vtk,
};

/// Builds a legacy VTK unstructured grid of line cells from an interval mesh.
///
/// Vertices are embedded in 3D as `(x, 0, 0)`.
pub struct IntervalMeshDataSetBuilder<'a, T: Real> {
    mesh: &'a IntervalMesh<T>,
    point_scalars: Vec<(String, &'a [T])>,
    // Only used for exporting directly to file
    title: Option<String>,
}

impl<'a, T: Real> IntervalMeshDataSetBuilder<'a, T> {
    pub fn from_mesh(mesh: &'a IntervalMesh<T>) -> Self {
        Self {
            mesh,
            point_scalars: Vec::new(),
            title: None,
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    /// Attaches a scalar field with one value per mesh vertex.
    pub fn with_point_scalar_attributes(mut self, name: impl Into<String>, values: &'a [T]) -> Self {
        self.point_scalars.push((name.into(), values));
        self
    }
}

impl<'a, T: Real + ToPrimitive> IntervalMeshDataSetBuilder<'a, T> {
    pub fn try_build(&self) -> eyre::Result<DataSet> {
        let to_f64 = |value: &T| {
            value
                .to_f64()
                .ok_or_else(|| eyre!("value cannot be represented as f64"))
        };

        let mut points = Vec::with_capacity(3 * self.mesh.num_vertices());
        for v in self.mesh.vertices() {
            points.extend_from_slice(&[to_f64(&v.x)?, 0.0, 0.0]);
        }

        // Vertices is laid out as follows: N, i_1, i_2, ... i_N, so every line contributes 2, a, b
        let mut vertices = Vec::with_capacity(3 * self.mesh.num_elements());
        for cell in self.mesh.connectivity() {
            vertices.push(cell.vertex_indices().len().try_into()?);
            for &idx in cell.vertex_indices() {
                vertices.push(idx.try_into()?);
            }
        }

        let mut data = Attributes::new();
        for (name, values) in &self.point_scalars {
            if values.len() != self.mesh.num_vertices() {
                return Err(eyre!(
                    "attribute `{}` has {} values, but the mesh has {} vertices",
                    name,
                    values.len(),
                    self.mesh.num_vertices()
                ));
            }
            let values = values.iter().map(to_f64).collect::<eyre::Result<Vec<_>>>()?;
            data.point.push(Attribute::DataArray(DataArray {
                name: name.clone(),
                elem: ElementType::Scalars {
                    num_comp: 1,
                    lookup_table: None,
                },
                data: IOBuffer::F64(values),
            }));
        }

        let piece = UnstructuredGridPiece {
            points: points.into(),
            cells: Cells {
                cell_verts: VertexNumbers::Legacy {
                    num_cells: self.mesh.num_elements().try_into()?,
                    vertices,
                },
                types: vec![CellType::Line; self.mesh.num_elements()],
            },
            data,
        };

        Ok(DataSet::UnstructuredGrid {
            meta: None,
            pieces: vec![Piece::Inline(Box::new(piece))],
        })
    }

    /// Convenience function for directly exporting the dataset to a file.
    pub fn try_export(&self, filename: impl AsRef<Path>) -> eyre::Result<()> {
        let filepath = filename.as_ref();
        let fallback_title = filepath
            .file_stem()
            .map(|os_str| os_str.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        let dataset = self.try_build()?;
        Vtk {
            version: Version { major: 4, minor: 1 },
            // If we don't have a title then just make the file name the title
            title: self.title.clone().unwrap_or(fallback_title),
            byte_order: ByteOrder::BigEndian,
            data: dataset,
            file_path: None,
        }
        .export(filepath)
        .map_err(|err| eyre!("failed to export VTK file {}: {}", filepath.display(), err))
    }
}
