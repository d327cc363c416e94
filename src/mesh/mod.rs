mod decode;

pub use decode::{DecodeError, decode};

use nalgebra::{Vector2, Vector3};

use crate::transform::CFrame;

/// A decoded mesh vertex. Color defaults to opaque white when the payload
/// carries no per-vertex color data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub uv: Vector2<f32>,
    pub color: [u8; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            normal: Vector3::zeros(),
            uv: Vector2::zeros(),
            color: [0xff; 4],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub indices: [u32; 3],
}

/// An in-memory mesh: vertices, triangles and a LOD boundary table.
///
/// The boundary table has `lod_count + 1` entries; entries `[i, i + 1)`
/// select the contiguous face range of LOD `i`. Offsets are monotonically
/// non-decreasing and the last offset equals the triangle count.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    lod_offsets: Vec<u32>,
}

impl Mesh {
    /// Installs the LOD boundary table, normalizing the degenerate `[0, 0]`
    /// table some payloads carry to a single full-range LOD, and validating
    /// the boundary invariants.
    pub(crate) fn assign_lod_offsets(&mut self, offsets: Vec<u32>) -> Result<(), DecodeError> {
        let face_count = self.triangles.len() as u32;
        let offsets = if offsets == [0, 0] {
            vec![0, face_count]
        } else {
            offsets
        };

        if offsets.len() < 2 {
            return Err(DecodeError::InvalidLodTable);
        }
        if offsets.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(DecodeError::InvalidLodTable);
        }
        if *offsets.last().unwrap_or(&0) != face_count {
            return Err(DecodeError::InvalidLodTable);
        }

        self.lod_offsets = offsets;
        Ok(())
    }

    pub fn lod_offsets(&self) -> &[u32] {
        &self.lod_offsets
    }

    pub fn lod_count(&self) -> usize {
        self.lod_offsets.len().saturating_sub(1)
    }

    /// Applies the mesh-fit transform: positions become
    /// `frame * ((p + offset) * scale)`, normals are rotated by the frame.
    pub fn transform(&mut self, frame: &CFrame, offset: Vector3<f32>, scale: Vector3<f32>) {
        for vertex in &mut self.vertices {
            let fitted = (vertex.position + offset).component_mul(&scale);
            vertex.position = frame.transform_point(fitted);
            vertex.normal = frame.transform_vector(vertex.normal);
        }
    }

    /// Re-indexes one LOD's face range into a compact zero-based buffer.
    ///
    /// The minimum vertex index referenced by the range becomes index zero,
    /// and the V texture coordinate is inverted (`v' = 1 - v`) for the
    /// destination convention.
    pub fn slice_for_lod(&self, lod: usize) -> Result<GeometryBuffer, DecodeError> {
        if lod + 1 >= self.lod_offsets.len() {
            return Err(DecodeError::LodIndexOutOfRange {
                lod,
                count: self.lod_count(),
            });
        }

        let face_from = self.lod_offsets[lod] as usize;
        let face_to = self.lod_offsets[lod + 1] as usize;
        if face_from == face_to {
            return Ok(GeometryBuffer::default());
        }

        let mut min_index = u32::MAX;
        let mut max_index = 0u32;
        let mut indices = Vec::with_capacity((face_to - face_from) * 3);
        for triangle in &self.triangles[face_from..face_to] {
            for &index in &triangle.indices {
                if index as usize >= self.vertices.len() {
                    return Err(DecodeError::VertexIndexOutOfRange {
                        index,
                        count: self.vertices.len(),
                    });
                }
                min_index = min_index.min(index);
                max_index = max_index.max(index);
                indices.push(index);
            }
        }

        let mut vertices = vec![GeometryVertex::default(); (max_index - min_index + 1) as usize];
        for index in &mut indices {
            let vertex = &self.vertices[*index as usize];
            *index -= min_index;
            vertices[*index as usize] = GeometryVertex {
                position: vertex.position,
                normal: vertex.normal,
                uv: Vector2::new(vertex.uv.x, 1.0 - vertex.uv.y),
            };
        }

        Ok(GeometryBuffer { vertices, indices })
    }
}

/// A vertex renumbered for document emission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryVertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub uv: Vector2<f32>,
}

impl Default for GeometryVertex {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            normal: Vector3::zeros(),
            uv: Vector2::zeros(),
        }
    }
}

/// A compact vertex/index buffer scoped to a single LOD, produced on demand
/// and never persisted.
#[derive(Debug, Clone, Default)]
pub struct GeometryBuffer {
    pub vertices: Vec<GeometryVertex>,
    pub indices: Vec<u32>,
}

impl GeometryBuffer {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex_at(x: f32, v: f32) -> Vertex {
        Vertex {
            position: Vector3::new(x, 0.0, 0.0),
            normal: Vector3::new(0.0, 1.0, 0.0),
            uv: Vector2::new(0.25, v),
            ..Vertex::default()
        }
    }

    fn two_lod_mesh() -> Mesh {
        let mut mesh = Mesh {
            vertices: (0..6).map(|i| vertex_at(i as f32, 0.5)).collect(),
            triangles: vec![
                Triangle { indices: [0, 1, 2] },
                Triangle { indices: [3, 4, 5] },
            ],
            lod_offsets: Vec::new(),
        };
        mesh.assign_lod_offsets(vec![0, 1, 2]).unwrap();
        mesh
    }

    #[test]
    fn given_lod_table_when_assigned_then_boundaries_cover_all_faces() {
        let mesh = two_lod_mesh();
        let offsets = mesh.lod_offsets();

        let total: u32 = offsets.windows(2).map(|pair| pair[1] - pair[0]).sum();
        assert_eq!(total as usize, mesh.triangles.len());
        assert!(offsets.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn given_degenerate_lod_table_when_assigned_then_full_range_is_used() {
        let mut mesh = two_lod_mesh();
        mesh.assign_lod_offsets(vec![0, 0]).unwrap();
        assert_eq!(mesh.lod_offsets(), &[0, 2]);
    }

    #[test]
    fn given_decreasing_lod_table_when_assigned_then_error_is_returned() {
        let mut mesh = two_lod_mesh();
        assert!(matches!(
            mesh.assign_lod_offsets(vec![0, 2, 1]),
            Err(DecodeError::InvalidLodTable)
        ));
    }

    #[test]
    fn given_second_lod_when_sliced_then_indices_are_renumbered_from_zero() {
        let mesh = two_lod_mesh();
        let buffer = mesh.slice_for_lod(1).unwrap();

        assert_eq!(buffer.indices, vec![0, 1, 2]);
        assert_eq!(buffer.vertices.len(), 3);
        assert_eq!(buffer.vertices[0].position.x, 3.0);
    }

    #[test]
    fn given_slice_when_built_then_v_coordinate_is_inverted() {
        let mesh = two_lod_mesh();
        let buffer = mesh.slice_for_lod(0).unwrap();
        assert!((buffer.vertices[0].uv.y - 0.5).abs() < 1.0e-6);

        let mut mesh = two_lod_mesh();
        mesh.vertices[0].uv.y = 0.2;
        let buffer = mesh.slice_for_lod(0).unwrap();
        assert!((buffer.vertices[0].uv.y - 0.8).abs() < 1.0e-6);
    }

    #[test]
    fn given_out_of_range_lod_when_sliced_then_error_is_returned() {
        let mesh = two_lod_mesh();
        assert!(matches!(
            mesh.slice_for_lod(2),
            Err(DecodeError::LodIndexOutOfRange { lod: 2, count: 2 })
        ));
    }

    #[test]
    fn given_fit_transform_when_applied_then_offset_scale_and_frame_compose() {
        let mut mesh = two_lod_mesh();
        let frame = CFrame::from_translation(0.0, 10.0, 0.0);
        mesh.transform(&frame, Vector3::new(1.0, 0.0, 0.0), Vector3::new(2.0, 1.0, 1.0));

        // (0 + 1) * 2 = 2, then translated.
        assert_eq!(mesh.vertices[0].position, Vector3::new(2.0, 10.0, 0.0));
        // Normals ignore offset, scale and translation.
        assert_eq!(mesh.vertices[0].normal, Vector3::new(0.0, 1.0, 0.0));
    }
}
