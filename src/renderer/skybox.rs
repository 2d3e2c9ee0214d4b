//! Skybox rendering
//!
//! Draws the scene background from either a cubemap (typically the baked
//! environment) or an equirectangular panorama sampled by direction.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

/// Skybox vertex (just position)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SkyboxVertex {
    pub position: [f32; 3],
}

/// Skybox uniform data
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SkyboxUniform {
    /// View-projection matrix (without translation)
    pub view_proj: [[f32; 4]; 4],
    /// Non-zero for HDR sources that need tone mapping
    pub tone_map: u32,
    _padding: [u32; 3],
}

impl SkyboxUniform {
    /// Build the uniform for a camera, dropping the view translation so the
    /// box stays centred on the eye
    pub fn new(view: Mat4, projection: Mat4, tone_map: bool) -> Self {
        let mut view_no_translation = view;
        view_no_translation.w_axis.x = 0.0;
        view_no_translation.w_axis.y = 0.0;
        view_no_translation.w_axis.z = 0.0;

        Self {
            view_proj: (projection * view_no_translation).to_cols_array_2d(),
            tone_map: u32::from(tone_map),
            _padding: [0; 3],
        }
    }
}

/// Texture a skybox samples
#[derive(Debug, Clone, Copy)]
pub enum SkyboxSource<'a> {
    /// A cube view (6 layers)
    Cubemap { view: &'a wgpu::TextureView, hdr: bool },
    /// A 2D latitude/longitude panorama
    Equirect { view: &'a wgpu::TextureView, hdr: bool },
}

impl SkyboxSource<'_> {
    /// Which pipeline draws this source
    pub fn kind(&self) -> SkyboxKind {
        match self {
            SkyboxSource::Cubemap { .. } => SkyboxKind::Cubemap,
            SkyboxSource::Equirect { .. } => SkyboxKind::Equirect,
        }
    }

    fn hdr(&self) -> bool {
        match *self {
            SkyboxSource::Cubemap { hdr, .. } | SkyboxSource::Equirect { hdr, .. } => hdr,
        }
    }
}

/// Projection used by a skybox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkyboxKind {
    Cubemap,
    Equirect,
}

impl SkyboxKind {
    /// Texture binding slot in the skybox shader
    const fn texture_binding(self) -> u32 {
        match self {
            SkyboxKind::Cubemap => 1,
            SkyboxKind::Equirect => 2,
        }
    }

    const fn view_dimension(self) -> wgpu::TextureViewDimension {
        match self {
            SkyboxKind::Cubemap => wgpu::TextureViewDimension::Cube,
            SkyboxKind::Equirect => wgpu::TextureViewDimension::D2,
        }
    }

    /// Fragment entry point in the skybox shader
    pub(crate) const fn fragment_entry(self) -> &'static str {
        match self {
            SkyboxKind::Cubemap => "fs_cube",
            SkyboxKind::Equirect => "fs_equirect",
        }
    }
}

/// Skybox renderer
#[derive(Debug)]
pub struct Skybox {
    /// Cube vertex buffer
    pub vertex_buffer: wgpu::Buffer,
    /// Number of vertices
    pub vertex_count: u32,
    /// Uniform buffer
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub kind: SkyboxKind,
    tone_map: bool,
}

impl Skybox {
    /// Create a skybox for `source`. `layout` must come from
    /// [`Skybox::bind_group_layout`] with the same kind.
    #[must_use]
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, source: SkyboxSource<'_>) -> Self {
        let vertices = cube_vertices();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("skybox_vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform = SkyboxUniform::new(Mat4::IDENTITY, Mat4::IDENTITY, source.hdr());
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("skybox_uniform"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("skybox_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let kind = source.kind();
        let view = match source {
            SkyboxSource::Cubemap { view, .. } | SkyboxSource::Equirect { view, .. } => view,
        };

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skybox_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: kind.texture_binding(),
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            uniform_buffer,
            bind_group,
            kind,
            tone_map: source.hdr(),
        }
    }

    /// Update skybox with camera matrices
    pub fn update(&self, queue: &wgpu::Queue, view: Mat4, projection: Mat4) {
        let uniform = SkyboxUniform::new(view, projection, self.tone_map);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Get vertex buffer layout
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SkyboxVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            }],
        }
    }

    /// Get bind group layout for skyboxes of `kind`
    pub fn bind_group_layout(device: &wgpu::Device, kind: SkyboxKind) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skybox_bind_group_layout"),
            entries: &[
                // Uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Cube or panorama texture
                wgpu::BindGroupLayoutEntry {
                    binding: kind.texture_binding(),
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: kind.view_dimension(),
                        multisampled: false,
                    },
                    count: None,
                },
                // Sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }
}

/// 36 vertices of a `[-1, 1]` cube, two triangles per face
fn cube_vertices() -> Vec<SkyboxVertex> {
    // Corner index bits: x = 1, y = 2, z = 4
    const FACES: [[usize; 4]; 6] = [
        [5, 7, 6, 4], // +Z
        [0, 2, 3, 1], // -Z
        [6, 7, 3, 2], // +Y
        [0, 1, 5, 4], // -Y
        [1, 3, 7, 5], // +X
        [4, 6, 2, 0], // -X
    ];

    let corner = |i: usize| SkyboxVertex {
        position: [
            if i & 1 != 0 { 1.0 } else { -1.0 },
            if i & 2 != 0 { 1.0 } else { -1.0 },
            if i & 4 != 0 { 1.0 } else { -1.0 },
        ],
    };

    FACES
        .iter()
        .flat_map(|&[a, b, c, d]| [a, b, c, a, c, d])
        .map(corner)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};

    #[test]
    fn test_cube_has_six_faces() {
        let vertices = cube_vertices();
        assert_eq!(vertices.len(), 36);
        assert!(
            vertices
                .iter()
                .all(|v| v.position.iter().all(|c| c.abs() == 1.0))
        );

        // Every face is made of vertices sharing one coordinate
        for face in vertices.chunks_exact(6) {
            let shared = (0..3).any(|axis| {
                face.iter()
                    .all(|v| v.position[axis] == face[0].position[axis])
            });
            assert!(shared);
        }
    }

    #[test]
    fn test_uniform_ignores_camera_translation() {
        let projection = Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 1000.0);
        let near = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let far = Mat4::look_at_rh(Vec3::new(100.0, 5.0, -20.0), Vec3::new(100.0, 5.0, -21.0), Vec3::Y);

        let a = SkyboxUniform::new(near, projection, true);
        let b = SkyboxUniform::new(far, projection, true);
        let a = Mat4::from_cols_array_2d(&a.view_proj);
        let b = Mat4::from_cols_array_2d(&b.view_proj);
        assert!(a.abs_diff_eq(b, 1e-5));

        let clip = a * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert!(clip.w > 0.0);
    }

    #[test]
    fn test_source_kind_and_bindings() {
        assert_eq!(SkyboxKind::Cubemap.texture_binding(), 1);
        assert_eq!(SkyboxKind::Equirect.texture_binding(), 2);
        assert_eq!(SkyboxKind::Equirect.fragment_entry(), "fs_equirect");
        assert_eq!(std::mem::size_of::<SkyboxUniform>(), 80);
    }
}
