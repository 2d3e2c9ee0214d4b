//! Image-based lighting
//!
//! Turns an equirectangular HDR panorama into the textures the PBR shader
//! samples for ambient light:
//!
//! * an environment cubemap (also usable as a skybox),
//! * a diffuse irradiance cubemap,
//! * a specular cubemap prefiltered per mip level with increasing roughness,
//! * the split-sum BRDF look-up table.
//!
//! Each face and mip level is rendered by its own pass. All passes go into one
//! command encoder that is submitted once.

use std::f32::consts::{PI, TAU};
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use wgpu::util::DeviceExt;

use super::texture::{Texture, TextureError, TextureOptions, mip_level_count};

/// Format of every cubemap produced here
pub const CUBEMAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Format of the BRDF look-up table
pub const BRDF_LUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Float;

/// Resolutions of the precomputed textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Face size of the environment cubemap
    pub cubemap_size: u32,
    /// Face size of the diffuse irradiance cubemap
    pub irradiance_size: u32,
    /// Face size of mip 0 of the prefiltered cubemap
    pub prefilter_size: u32,
    /// Number of roughness levels in the prefiltered cubemap
    pub prefilter_mip_levels: u32,
    /// Width and height of the BRDF look-up table
    pub brdf_lut_size: u32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            cubemap_size: 512,
            irradiance_size: 32,
            prefilter_size: 128,
            prefilter_mip_levels: 5,
            brdf_lut_size: 512,
        }
    }
}

impl EnvironmentConfig {
    /// Check that every size is usable
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::InvalidConfig`] for zero sizes or a mip
    /// count the prefilter size cannot hold.
    pub fn validate(&self) -> Result<(), EnvironmentError> {
        let sizes = [
            ("cubemap_size", self.cubemap_size),
            ("irradiance_size", self.irradiance_size),
            ("prefilter_size", self.prefilter_size),
            ("brdf_lut_size", self.brdf_lut_size),
        ];
        for (name, size) in sizes {
            if size == 0 {
                return Err(EnvironmentError::InvalidConfig(format!("{name} must be non-zero")));
            }
        }

        let max_levels = mip_level_count(self.prefilter_size, self.prefilter_size);
        if !(1..=max_levels).contains(&self.prefilter_mip_levels) {
            return Err(EnvironmentError::InvalidConfig(format!(
                "prefilter_mip_levels must be in 1..={max_levels} for a {} prefilter, got {}",
                self.prefilter_size, self.prefilter_mip_levels
            )));
        }

        Ok(())
    }

    fn check_device_limit(&self, max_dimension: u32) -> Result<(), EnvironmentError> {
        let largest = self
            .cubemap_size
            .max(self.irradiance_size)
            .max(self.prefilter_size)
            .max(self.brdf_lut_size);
        if largest > max_dimension {
            return Err(EnvironmentError::InvalidConfig(format!(
                "texture size {largest} exceeds device limit {max_dimension}"
            )));
        }
        Ok(())
    }
}

/// Cubemap faces in layer order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    /// All faces in array-layer order
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Array layer of this face
    pub const fn index(self) -> u32 {
        self as u32
    }

    /// World direction through texel coordinate `(u, v)` of this face, with
    /// `v` growing downward. Same mapping as the bake shader.
    pub fn direction(self, u: f32, v: f32) -> Vec3 {
        let s = u * 2.0 - 1.0;
        let t = v * 2.0 - 1.0;
        let dir = match self {
            CubeFace::PositiveX => Vec3::new(1.0, -t, -s),
            CubeFace::NegativeX => Vec3::new(-1.0, -t, s),
            CubeFace::PositiveY => Vec3::new(s, 1.0, t),
            CubeFace::NegativeY => Vec3::new(s, -1.0, -t),
            CubeFace::PositiveZ => Vec3::new(s, -t, 1.0),
            CubeFace::NegativeZ => Vec3::new(-s, -t, -1.0),
        };
        dir.normalize()
    }
}

/// Edge length of mip `level` of a square texture
pub fn mip_size(base: u32, level: u32) -> u32 {
    base.checked_shr(level).unwrap_or(0).max(1)
}

/// Roughness baked into mip `level` of a prefiltered map with `levels` mips
pub fn roughness_for_mip(level: u32, levels: u32) -> f32 {
    if levels <= 1 {
        return 0.0;
    }
    level.min(levels - 1) as f32 / (levels - 1) as f32
}

/// Texture coordinate of `dir` in an equirectangular panorama (row 0 at the
/// zenith)
pub fn equirect_uv(dir: Vec3) -> Vec2 {
    let dir = dir.normalize_or(Vec3::X);
    Vec2::new(
        dir.z.atan2(dir.x) / TAU + 0.5,
        0.5 - dir.y.clamp(-1.0, 1.0).asin() / PI,
    )
}

/// A cube texture with a cube view for sampling
#[derive(Debug)]
pub struct CubeTexture {
    pub texture: wgpu::Texture,
    /// Cube view over all mips
    pub view: wgpu::TextureView,
    /// Face size of mip 0
    pub size: u32,
    pub mip_levels: u32,
}

impl CubeTexture {
    fn new_render_target(device: &wgpu::Device, label: &str, size: u32, mip_levels: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CUBEMAP_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            array_layer_count: Some(6),
            ..Default::default()
        });

        Self {
            texture,
            view,
            size,
            mip_levels,
        }
    }

    /// 2D view of one face at one mip level, for rendering into
    fn face_view(&self, face: CubeFace, mip: u32) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("cube_face_view"),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_mip_level: mip,
            mip_level_count: Some(1),
            base_array_layer: face.index(),
            array_layer_count: Some(1),
            ..Default::default()
        })
    }
}

/// Per-pass shader parameters
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct BakeParams {
    face: u32,
    roughness: f32,
    source_size: f32,
    _padding: f32,
}

/// Pipelines used while baking
struct BakePipelines {
    equirect_layout: wgpu::BindGroupLayout,
    cube_layout: wgpu::BindGroupLayout,
    equirect_to_cube: wgpu::RenderPipeline,
    irradiance: wgpu::RenderPipeline,
    prefilter: wgpu::RenderPipeline,
    brdf: wgpu::RenderPipeline,
}

impl BakePipelines {
    fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Environment Bake Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("environment.wgsl").into()),
        });

        let params_entry = wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let sampler_entry = wgpu::BindGroupLayoutEntry {
            binding: 3,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };
        let source_entry = |binding, view_dimension| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension,
                multisampled: false,
            },
            count: None,
        };

        let equirect_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Equirect Bake Layout"),
            entries: &[
                params_entry,
                source_entry(1, wgpu::TextureViewDimension::D2),
                sampler_entry,
            ],
        });
        let cube_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Cube Bake Layout"),
            entries: &[
                params_entry,
                source_entry(2, wgpu::TextureViewDimension::Cube),
                sampler_entry,
            ],
        });

        let equirect_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Equirect Bake Pipeline Layout"),
                bind_group_layouts: &[&equirect_layout],
                push_constant_ranges: &[],
            });
        let cube_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cube Bake Pipeline Layout"),
            bind_group_layouts: &[&cube_layout],
            push_constant_ranges: &[],
        });
        let brdf_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("BRDF Bake Pipeline Layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });

        let pipeline = |label, layout, entry_point, format| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_fullscreen"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry_point),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        Self {
            equirect_to_cube: pipeline(
                "Equirect To Cube Pipeline",
                &equirect_pipeline_layout,
                "fs_equirect_to_cube",
                CUBEMAP_FORMAT,
            ),
            irradiance: pipeline(
                "Irradiance Pipeline",
                &cube_pipeline_layout,
                "fs_irradiance",
                CUBEMAP_FORMAT,
            ),
            prefilter: pipeline(
                "Prefilter Pipeline",
                &cube_pipeline_layout,
                "fs_prefilter",
                CUBEMAP_FORMAT,
            ),
            brdf: pipeline("BRDF LUT Pipeline", &brdf_pipeline_layout, "fs_brdf", BRDF_LUT_FORMAT),
            equirect_layout,
            cube_layout,
        }
    }
}

/// Records bake passes into one encoder
struct Baker<'a> {
    device: &'a wgpu::Device,
    pipelines: &'a BakePipelines,
    sampler: &'a wgpu::Sampler,
    encoder: wgpu::CommandEncoder,
    passes: u32,
}

impl Baker<'_> {
    /// Render one face from `source` (a 2D view for the equirect pipeline,
    /// a cube view otherwise) into `target`.
    fn face_pass(
        &mut self,
        pipeline: &wgpu::RenderPipeline,
        layout: &wgpu::BindGroupLayout,
        source_binding: u32,
        source: &wgpu::TextureView,
        params: BakeParams,
        target: &wgpu::TextureView,
    ) {
        // Separate buffer per pass: queue writes would all land before submit
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Bake Params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bake Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: source_binding,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(self.sampler),
                },
            ],
        });

        let mut pass = begin_bake_pass(&mut self.encoder, target);
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
        self.passes += 1;
    }

    fn brdf_pass(&mut self, target: &wgpu::TextureView) {
        let mut pass = begin_bake_pass(&mut self.encoder, target);
        pass.set_pipeline(&self.pipelines.brdf);
        pass.draw(0..3, 0..1);
        self.passes += 1;
    }
}

fn begin_bake_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Environment Bake Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

/// Precomputed image-based lighting textures
#[derive(Debug)]
pub struct EnvironmentMap {
    /// Source panorama converted to a cubemap
    pub environment: CubeTexture,
    /// Diffuse irradiance
    pub irradiance: CubeTexture,
    /// Specular radiance, roughness increasing with mip level
    pub prefiltered: CubeTexture,
    /// Split-sum scale (r) and bias (g) by `(n.v, roughness)`
    pub brdf_lut: wgpu::Texture,
    pub brdf_lut_view: wgpu::TextureView,
    /// Trilinear clamp sampler for all of the above
    pub sampler: wgpu::Sampler,
    pub config: EnvironmentConfig,
}

impl EnvironmentMap {
    /// Load an equirectangular image (ideally `.hdr`) and bake it
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be loaded or `config` is invalid
    pub fn from_equirect_path(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: impl AsRef<Path>,
        config: EnvironmentConfig,
    ) -> Result<Self, EnvironmentError> {
        let source = Texture::from_path(device, queue, path, TextureOptions::clamped(false))?;
        if !source.is_hdr() {
            log::warn!("Environment source is not HDR, lighting will be clipped to [0, 1]");
        }
        Self::from_equirect(device, queue, &source, config)
    }

    /// Bake all IBL textures from an equirectangular texture
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::InvalidConfig`] if `config` fails
    /// validation or exceeds the device texture limit
    pub fn from_equirect(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &Texture,
        config: EnvironmentConfig,
    ) -> Result<Self, EnvironmentError> {
        config.validate()?;
        config.check_device_limit(device.limits().max_texture_dimension_2d)?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("environment_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let environment =
            CubeTexture::new_render_target(device, "Environment Cubemap", config.cubemap_size, 1);
        let irradiance =
            CubeTexture::new_render_target(device, "Irradiance Cubemap", config.irradiance_size, 1);
        let prefiltered = CubeTexture::new_render_target(
            device,
            "Prefiltered Cubemap",
            config.prefilter_size,
            config.prefilter_mip_levels,
        );

        let brdf_lut = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("BRDF LUT"),
            size: wgpu::Extent3d {
                width: config.brdf_lut_size,
                height: config.brdf_lut_size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: BRDF_LUT_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let brdf_lut_view = brdf_lut.create_view(&wgpu::TextureViewDescriptor::default());

        let pipelines = BakePipelines::new(device);
        let mut baker = Baker {
            device,
            pipelines: &pipelines,
            sampler: &sampler,
            encoder: device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Environment Bake Encoder"),
            }),
            passes: 0,
        };

        Self::record(&mut baker, source, &environment, &irradiance, &prefiltered);
        baker.brdf_pass(&brdf_lut_view);

        let passes = baker.passes;
        queue.submit(std::iter::once(baker.encoder.finish()));

        log::info!(
            "Baked environment: {}px cubemap, {}px irradiance, {}px x{} prefiltered, {}px BRDF LUT ({} passes)",
            config.cubemap_size,
            config.irradiance_size,
            config.prefilter_size,
            config.prefilter_mip_levels,
            config.brdf_lut_size,
            passes
        );

        Ok(Self {
            environment,
            irradiance,
            prefiltered,
            brdf_lut,
            brdf_lut_view,
            sampler,
            config,
        })
    }

    fn record(
        baker: &mut Baker<'_>,
        source: &Texture,
        environment: &CubeTexture,
        irradiance: &CubeTexture,
        prefiltered: &CubeTexture,
    ) {
        let pipelines = baker.pipelines;
        let source_size = source.width() as f32;

        for face in CubeFace::ALL {
            let target = environment.face_view(face, 0);
            let params = BakeParams {
                face: face.index(),
                roughness: 0.0,
                source_size,
                _padding: 0.0,
            };
            baker.face_pass(
                &pipelines.equirect_to_cube,
                &pipelines.equirect_layout,
                1,
                &source.view,
                params,
                &target,
            );
        }
        log::debug!("Equirect converted to {}px cubemap", environment.size);

        for face in CubeFace::ALL {
            let target = irradiance.face_view(face, 0);
            let params = BakeParams {
                face: face.index(),
                roughness: 0.0,
                source_size: environment.size as f32,
                _padding: 0.0,
            };
            baker.face_pass(
                &pipelines.irradiance,
                &pipelines.cube_layout,
                2,
                &environment.view,
                params,
                &target,
            );
        }
        log::debug!("Irradiance convolved at {}px", irradiance.size);

        for mip in 0..prefiltered.mip_levels {
            let roughness = roughness_for_mip(mip, prefiltered.mip_levels);
            for face in CubeFace::ALL {
                let target = prefiltered.face_view(face, mip);
                let params = BakeParams {
                    face: face.index(),
                    roughness,
                    source_size: environment.size as f32,
                    _padding: 0.0,
                };
                baker.face_pass(
                    &pipelines.prefilter,
                    &pipelines.cube_layout,
                    2,
                    &environment.view,
                    params,
                    &target,
                );
            }
            log::debug!(
                "Prefiltered mip {mip} ({}px, roughness {roughness:.2})",
                mip_size(prefiltered.size, mip)
            );
        }
    }

    /// Number of mip levels in the prefiltered map
    pub fn prefilter_mip_levels(&self) -> u32 {
        self.prefiltered.mip_levels
    }
}

/// Errors that can occur while building an environment map
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    #[error(transparent)]
    Texture(#[from] TextureError),
    #[error("invalid environment config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_face_centers_point_along_axes() {
        let expected = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for (face, axis) in CubeFace::ALL.into_iter().zip(expected) {
            assert!(approx(face.direction(0.5, 0.5), axis), "{face:?}");
        }
    }

    #[test]
    fn test_face_indices_follow_layer_order() {
        for (i, face) in CubeFace::ALL.into_iter().enumerate() {
            assert_eq!(face.index(), i as u32);
        }
    }

    #[test]
    fn test_face_corners() {
        // Top of every side face looks up
        for face in [
            CubeFace::PositiveX,
            CubeFace::NegativeX,
            CubeFace::PositiveZ,
            CubeFace::NegativeZ,
        ] {
            assert!(face.direction(0.5, 0.0).y > 0.0);
            assert!(face.direction(0.5, 1.0).y < 0.0);
        }

        let corner = CubeFace::PositiveX.direction(0.0, 0.0);
        assert!(approx(corner, Vec3::new(1.0, 1.0, 1.0).normalize()));

        // +Y face: bottom edge borders +Z
        assert!(CubeFace::PositiveY.direction(0.5, 1.0).z > 0.0);
        // -Y face: top edge borders +Z
        assert!(CubeFace::NegativeY.direction(0.5, 0.0).z > 0.0);
    }

    #[test]
    fn test_adjacent_faces_share_edges() {
        // Right edge of +Z meets left edge of +X
        let a = CubeFace::PositiveZ.direction(1.0, 0.3);
        let b = CubeFace::PositiveX.direction(0.0, 0.3);
        assert!(approx(a, b));

        // Right edge of +X meets left edge of -Z
        let a = CubeFace::PositiveX.direction(1.0, 0.7);
        let b = CubeFace::NegativeZ.direction(0.0, 0.7);
        assert!(approx(a, b));
    }

    #[test]
    fn test_mip_sizes() {
        assert_eq!(mip_size(128, 0), 128);
        assert_eq!(mip_size(128, 4), 8);
        assert_eq!(mip_size(128, 7), 1);
        assert_eq!(mip_size(128, 12), 1);
        assert_eq!(mip_size(1, 40), 1);
    }

    #[test]
    fn test_roughness_per_mip() {
        let roughness: Vec<f32> = (0..5).map(|mip| roughness_for_mip(mip, 5)).collect();
        assert_eq!(roughness, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(roughness_for_mip(0, 1), 0.0);
        assert_eq!(roughness_for_mip(9, 5), 1.0);
    }

    #[test]
    fn test_equirect_uv() {
        let uv = equirect_uv(Vec3::X);
        assert!((uv - Vec2::new(0.5, 0.5)).length() < 1e-5);

        assert!((equirect_uv(Vec3::Y).y).abs() < 1e-5);
        assert!((equirect_uv(Vec3::NEG_Y).y - 1.0).abs() < 1e-5);
        assert!((equirect_uv(Vec3::Z).x - 0.75).abs() < 1e-5);
        assert!((equirect_uv(Vec3::NEG_Z).x - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = EnvironmentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cubemap_size, 512);
        assert_eq!(config.prefilter_mip_levels, 5);
    }

    #[test]
    fn test_invalid_configs() {
        let zero = EnvironmentConfig {
            irradiance_size: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(EnvironmentError::InvalidConfig(_))));

        let too_many_mips = EnvironmentConfig {
            prefilter_size: 16,
            prefilter_mip_levels: 6,
            ..Default::default()
        };
        assert!(too_many_mips.validate().is_err());

        let no_mips = EnvironmentConfig {
            prefilter_mip_levels: 0,
            ..Default::default()
        };
        assert!(no_mips.validate().is_err());

        let full_chain = EnvironmentConfig {
            prefilter_size: 16,
            prefilter_mip_levels: 5,
            ..Default::default()
        };
        assert!(full_chain.validate().is_ok());
    }

    #[test]
    fn test_device_limit() {
        let config = EnvironmentConfig::default();
        assert!(config.check_device_limit(2048).is_ok());
        assert!(config.check_device_limit(256).is_err());
    }
}
