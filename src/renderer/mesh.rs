//! Mesh and vertex definitions

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use wgpu::util::DeviceExt;

/// Vertex with position, normal, UV and tangent frame
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x2, // uv
        3 => Float32x3, // tangent
        4 => Float32x3, // bitangent
    ];

    /// Create a vertex without a tangent frame
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
            tangent: [0.0; 3],
            bitangent: [0.0; 3],
        }
    }

    /// Get the vertex buffer layout for wgpu
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// A triangle mesh with vertices and indices
#[derive(Debug)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// GPU vertex buffer (created when uploaded)
    pub(crate) vertex_buffer: Option<wgpu::Buffer>,
    /// GPU index buffer (created when uploaded)
    pub(crate) index_buffer: Option<wgpu::Buffer>,
}

impl Mesh {
    /// Create a mesh from vertices and indices
    pub fn from_data(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            vertex_buffer: None,
            index_buffer: None,
        }
    }

    /// Unit textured quad in the XY plane facing +Z, spanning `[-1, 1]`
    pub fn quad() -> Self {
        let normal = [0.0, 0.0, 1.0];
        let mut vertices = vec![
            Vertex::new([-1.0, 1.0, 0.0], normal, [0.0, 1.0]),
            Vertex::new([-1.0, -1.0, 0.0], normal, [0.0, 0.0]),
            Vertex::new([1.0, -1.0, 0.0], normal, [1.0, 0.0]),
            Vertex::new([1.0, 1.0, 0.0], normal, [1.0, 1.0]),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        compute_tangents(&mut vertices, &indices);

        Self::from_data(vertices, indices)
    }

    /// Create the GPU buffers. Empty meshes stay un-uploaded.
    pub fn upload(&mut self, device: &wgpu::Device) {
        if self.vertices.is_empty() || self.indices.is_empty() {
            return;
        }

        self.vertex_buffer = Some(device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            },
        ));
        self.index_buffer = Some(device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&self.indices),
                usage: wgpu::BufferUsages::INDEX,
            },
        ));
    }

    /// Get the number of indices
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Check if the mesh has been uploaded to GPU
    pub fn is_uploaded(&self) -> bool {
        self.vertex_buffer.is_some() && self.index_buffer.is_some()
    }

    /// Vertex and index buffers, when uploaded
    pub(crate) fn buffers(&self) -> Option<(&wgpu::Buffer, &wgpu::Buffer)> {
        self.vertex_buffer.as_ref().zip(self.index_buffer.as_ref())
    }
}

fn triangles(indices: &[u32]) -> impl Iterator<Item = [usize; 3]> + '_ {
    indices
        .chunks_exact(3)
        .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
}

/// Replace vertex normals with area-weighted face normals
pub fn compute_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut normals = vec![Vec3::ZERO; vertices.len()];

    for [a, b, c] in triangles(indices) {
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }
        let p0 = Vec3::from(vertices[a].position);
        let p1 = Vec3::from(vertices[b].position);
        let p2 = Vec3::from(vertices[c].position);
        let face = (p1 - p0).cross(p2 - p0);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    for (vertex, normal) in vertices.iter_mut().zip(normals) {
        vertex.normal = normal.normalize_or(Vec3::Y).into();
    }
}

/// Compute per-vertex tangents and bitangents from positions and UVs.
///
/// Tangents are Gram-Schmidt orthogonalised against the normal. Vertices whose
/// triangles have degenerate UVs get an arbitrary perpendicular frame.
pub fn compute_tangents(vertices: &mut [Vertex], indices: &[u32]) {
    let mut tangents = vec![Vec3::ZERO; vertices.len()];
    let mut bitangents = vec![Vec3::ZERO; vertices.len()];

    for [a, b, c] in triangles(indices) {
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }
        let p0 = Vec3::from(vertices[a].position);
        let p1 = Vec3::from(vertices[b].position);
        let p2 = Vec3::from(vertices[c].position);
        let uv0 = Vec2::from(vertices[a].uv);
        let uv1 = Vec2::from(vertices[b].uv);
        let uv2 = Vec2::from(vertices[c].uv);

        let edge1 = p1 - p0;
        let edge2 = p2 - p0;
        let duv1 = uv1 - uv0;
        let duv2 = uv2 - uv0;

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) * r;
        let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * r;

        for i in [a, b, c] {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
        }
    }

    for ((vertex, tangent), bitangent) in vertices.iter_mut().zip(tangents).zip(bitangents) {
        let normal = Vec3::from(vertex.normal).normalize_or(Vec3::Z);

        let t = (tangent - normal * normal.dot(tangent)).normalize_or_zero();
        let t = if t == Vec3::ZERO {
            normal.any_orthonormal_vector()
        } else {
            t
        };

        // Keep the handedness implied by the UV layout
        let handedness = if normal.cross(t).dot(bitangent) < 0.0 {
            -1.0
        } else {
            1.0
        };

        vertex.tangent = t.into();
        vertex.bitangent = (normal.cross(t) * handedness).into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: [f32; 3], b: Vec3) -> bool {
        (Vec3::from(a) - b).length() < 1e-5
    }

    #[test]
    fn test_vertex_layout_stride() {
        assert_eq!(std::mem::size_of::<Vertex>(), 56);
        assert_eq!(Vertex::layout().array_stride, 56);
        assert_eq!(Vertex::ATTRIBUTES[3].offset, 32);
        assert_eq!(Vertex::ATTRIBUTES[4].shader_location, 4);
    }

    #[test]
    fn test_quad_tangent_frame() {
        let quad = Mesh::quad();
        assert_eq!(quad.vertices.len(), 4);
        assert_eq!(quad.index_count(), 6);
        assert!(!quad.is_uploaded());

        for vertex in &quad.vertices {
            assert!(approx(vertex.normal, Vec3::Z));
            assert!(approx(vertex.tangent, Vec3::X));
            assert!(approx(vertex.bitangent, Vec3::Y));
        }
    }

    #[test]
    fn test_compute_normals_ccw_triangle() {
        let mut vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0; 3], [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], [0.0; 3], [1.0, 0.0]),
            Vertex::new([0.0, 0.0, -1.0], [0.0; 3], [0.0, 1.0]),
        ];
        compute_normals(&mut vertices, &[0, 1, 2]);
        for vertex in &vertices {
            assert!(approx(vertex.normal, Vec3::Y));
        }
    }

    #[test]
    fn test_mirrored_uvs_flip_bitangent() {
        let normal = [0.0, 0.0, 1.0];
        let mut vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], normal, [0.0, 1.0]),
            Vertex::new([1.0, 0.0, 0.0], normal, [1.0, 1.0]),
            Vertex::new([0.0, 1.0, 0.0], normal, [0.0, 0.0]),
        ];
        compute_tangents(&mut vertices, &[0, 1, 2]);
        assert!(approx(vertices[0].tangent, Vec3::X));
        assert!(approx(vertices[0].bitangent, Vec3::NEG_Y));
    }

    #[test]
    fn test_degenerate_uvs_get_perpendicular_frame() {
        let normal = [0.0, 1.0, 0.0];
        let mut vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], normal, [0.5, 0.5]),
            Vertex::new([1.0, 0.0, 0.0], normal, [0.5, 0.5]),
            Vertex::new([0.0, 0.0, -1.0], normal, [0.5, 0.5]),
        ];
        compute_tangents(&mut vertices, &[0, 1, 2]);
        for vertex in &vertices {
            let t = Vec3::from(vertex.tangent);
            let b = Vec3::from(vertex.bitangent);
            assert!((t.length() - 1.0).abs() < 1e-5);
            assert!(t.dot(Vec3::Y).abs() < 1e-5);
            assert!(b.dot(t).abs() < 1e-5);
        }
    }

    #[test]
    fn test_out_of_range_indices_are_ignored() {
        let mut vertices = vec![Vertex::new([0.0; 3], [0.0, 0.0, 1.0], [0.0; 2])];
        compute_normals(&mut vertices, &[0, 5, 9]);
        compute_tangents(&mut vertices, &[0, 5, 9]);
        assert!(approx(vertices[0].normal, Vec3::Y));
    }
}
