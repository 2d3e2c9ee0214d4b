//! Main renderer implementation

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::Camera;
use super::environment::EnvironmentMap;
use super::material::{MaterialParams, MaterialTextures, MaterialUniform, PbrMaterial};
use super::mesh::{Mesh, Vertex};
use super::particles::{EmitterUniform, ParticleBatch, ParticleInstance};
use super::skybox::{Skybox, SkyboxKind, SkyboxSource};
use super::texture::Texture;

/// Lights the PBR shader evaluates
pub const MAX_LIGHTS: usize = 4;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Uniform buffer for camera data
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    position: [f32; 4],
}

impl CameraUniform {
    fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            position: [0.0, 0.0, 0.0, 1.0],
        }
    }

    fn update(&mut self, camera: &Camera) {
        self.view_proj = camera.view_projection_matrix().to_cols_array_2d();
        self.view = camera.view_matrix().to_cols_array_2d();
        self.position = camera.position.extend(1.0).into();
    }
}

/// Uniform buffer for model transform
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ModelUniform {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
}

impl ModelUniform {
    pub fn new() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            normal_matrix: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }

    pub fn from_transform(model: Mat4) -> Self {
        let normal_matrix = model.inverse().transpose();
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
        }
    }
}

impl Default for ModelUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Light 0 is directional and `position` is the direction towards it.
/// Every other light is a point light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
    pub color: Vec3,
}

impl Light {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self { position, color }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new(Vec3::new(5.0, 5.0, 5.0), Vec3::ONE)
    }
}

/// Light uniform data
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct LightsUniform {
    /// x = number of lights in use
    count: [u32; 4],
    positions: [[f32; 4]; MAX_LIGHTS],
    colors: [[f32; 4]; MAX_LIGHTS],
}

impl LightsUniform {
    fn from_lights(lights: &[Light]) -> Self {
        if lights.len() > MAX_LIGHTS {
            log::warn!(
                "{} lights given, only the first {MAX_LIGHTS} are used",
                lights.len()
            );
        }

        let mut uniform = Self::zeroed();
        for (i, light) in lights.iter().take(MAX_LIGHTS).enumerate() {
            uniform.positions[i] = light.position.extend(1.0).into();
            uniform.colors[i] = light.color.extend(1.0).into();
            uniform.count[0] += 1;
        }
        uniform
    }
}

/// Errors raised while setting up the GPU
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

/// Main renderer
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: (u32, u32),
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    model_bind_group_layout: wgpu::BindGroupLayout,
    material_bind_group_layout: wgpu::BindGroupLayout,
    environment_bind_group_layout: wgpu::BindGroupLayout,
    environment_bind_group: Option<wgpu::BindGroup>,
    particle_bind_group_layout: wgpu::BindGroupLayout,
    skybox_cube_layout: wgpu::BindGroupLayout,
    skybox_equirect_layout: wgpu::BindGroupLayout,
    pbr_pipeline: wgpu::RenderPipeline,
    skybox_cube_pipeline: wgpu::RenderPipeline,
    skybox_equirect_pipeline: wgpu::RenderPipeline,
    particle_pipeline: wgpu::RenderPipeline,
    white_texture: Arc<Texture>,
    /// Clear color
    pub clear_color: wgpu::Color,
}

impl Renderer {
    /// Create a new renderer
    ///
    /// # Errors
    ///
    /// Fails when no surface, adapter or device can be created for `window`
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self, RendererError> {
        let size = window.inner_size();
        let size = (size.width.max(1), size.height.max(1));

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RendererError::NoAdapter)?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("PBR Demo Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Prefer an sRGB surface so shaders write linear colour
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RendererError::NoSurfaceFormat)?;

        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.0,
            height: size.1,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!("Surface format {surface_format:?}, {}x{}", size.0, size.1);

        let (depth_texture, depth_view) = Self::create_depth_texture(&device, size.0, size.1);

        // Frame uniforms: camera + lights
        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::bytes_of(&camera_uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let lights_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lights Buffer"),
            contents: bytemuck::bytes_of(&LightsUniform::from_lights(&[])),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame Bind Group Layout"),
                entries: &[
                    uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                    uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
                ],
            });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
            ],
        });

        let model_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Model Bind Group Layout"),
                entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
            });

        let material_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Material Bind Group Layout"),
                entries: &[
                    uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                    // albedo, normal, metallic-smoothness, ao, height
                    texture_entry(1, wgpu::TextureViewDimension::D2),
                    texture_entry(2, wgpu::TextureViewDimension::D2),
                    texture_entry(3, wgpu::TextureViewDimension::D2),
                    texture_entry(4, wgpu::TextureViewDimension::D2),
                    texture_entry(5, wgpu::TextureViewDimension::D2),
                    sampler_entry(6),
                ],
            });

        let environment_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Environment Bind Group Layout"),
                entries: &[
                    texture_entry(0, wgpu::TextureViewDimension::Cube),
                    texture_entry(1, wgpu::TextureViewDimension::Cube),
                    texture_entry(2, wgpu::TextureViewDimension::D2),
                    sampler_entry(3),
                ],
            });

        let particle_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Particle Bind Group Layout"),
                entries: &[
                    uniform_entry(0, wgpu::ShaderStages::VERTEX),
                    texture_entry(1, wgpu::TextureViewDimension::D2),
                    sampler_entry(2),
                ],
            });

        let skybox_cube_layout = Skybox::bind_group_layout(&device, SkyboxKind::Cubemap);
        let skybox_equirect_layout = Skybox::bind_group_layout(&device, SkyboxKind::Equirect);

        // PBR pipeline
        let pbr_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("PBR Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("pbr.wgsl").into()),
        });

        let pbr_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("PBR Pipeline Layout"),
            bind_group_layouts: &[
                &frame_bind_group_layout,
                &model_bind_group_layout,
                &material_bind_group_layout,
                &environment_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let pbr_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("PBR Pipeline"),
            layout: Some(&pbr_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &pbr_shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &pbr_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // The terrain quad and imported meshes may be seen from both sides
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Skybox pipelines
        let skybox_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Skybox Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("skybox.wgsl").into()),
        });
        let skybox_cube_pipeline = Self::create_skybox_pipeline(
            &device,
            &skybox_shader,
            &skybox_cube_layout,
            SkyboxKind::Cubemap,
            config.format,
        );
        let skybox_equirect_pipeline = Self::create_skybox_pipeline(
            &device,
            &skybox_shader,
            &skybox_equirect_layout,
            SkyboxKind::Equirect,
            config.format,
        );

        // Particle pipeline
        let particle_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("particle.wgsl").into()),
        });

        let particle_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Particle Pipeline Layout"),
                bind_group_layouts: &[&frame_bind_group_layout, &particle_bind_group_layout],
                push_constant_ranges: &[],
            });

        let additive = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        };

        let particle_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Pipeline"),
            layout: Some(&particle_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &particle_shader,
                entry_point: Some("vs_main"),
                buffers: &[ParticleInstance::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &particle_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState {
                        color: additive,
                        alpha: additive,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let white_texture = Arc::new(Texture::white(&device, &queue));

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            depth_texture,
            depth_view,
            camera_uniform,
            camera_buffer,
            lights_buffer,
            frame_bind_group,
            model_bind_group_layout,
            material_bind_group_layout,
            environment_bind_group_layout,
            environment_bind_group: None,
            particle_bind_group_layout,
            skybox_cube_layout,
            skybox_equirect_layout,
            pbr_pipeline,
            skybox_cube_pipeline,
            skybox_equirect_pipeline,
            particle_pipeline,
            white_texture,
            clear_color: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
        })
    }

    fn create_skybox_pipeline(
        device: &wgpu::Device,
        shader: &wgpu::ShaderModule,
        layout: &wgpu::BindGroupLayout,
        kind: SkyboxKind,
        format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Skybox Pipeline Layout"),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Skybox Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[Skybox::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some(kind.fragment_entry()),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Seen from inside
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        (texture, view)
    }

    /// Resize the renderer
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.size = (width, height);
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);

            let (depth_texture, depth_view) =
                Self::create_depth_texture(&self.device, width, height);
            self.depth_texture = depth_texture;
            self.depth_view = depth_view;

            log::debug!("Resized to {}x{}", width, height);
        }
    }

    /// Current surface size in pixels
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Update camera uniform
    pub fn update_camera(&mut self, camera: &Camera) {
        self.camera_uniform.update(camera);
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&self.camera_uniform));
    }

    /// Replace the scene lights. Only the first [`MAX_LIGHTS`] are used.
    pub fn update_lights(&self, lights: &[Light]) {
        let uniform = LightsUniform::from_lights(lights);
        self.queue
            .write_buffer(&self.lights_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Bind baked IBL textures for every following PBR draw
    pub fn set_environment(&mut self, environment: &EnvironmentMap) {
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Environment Bind Group"),
            layout: &self.environment_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&environment.irradiance.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&environment.prefiltered.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&environment.brdf_lut_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&environment.sampler),
                },
            ],
        });
        self.environment_bind_group = Some(bind_group);
    }

    /// Build a material. Missing AO or height maps bind a white texture and
    /// switch the matching flag off.
    pub fn create_material(&self, textures: MaterialTextures, params: &MaterialParams) -> PbrMaterial {
        let params = MaterialParams {
            has_ao: params.has_ao && textures.ao.is_some(),
            has_height_map: params.has_height_map && textures.height.is_some(),
            ..*params
        };
        let uniform = MaterialUniform::new(&params);

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Buffer"),
                contents: bytemuck::bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let ao = textures.ao.as_deref().unwrap_or(&self.white_texture);
        let height = textures.height.as_deref().unwrap_or(&self.white_texture);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &self.material_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&textures.albedo.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&textures.normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&textures.metallic_smoothness.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&ao.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(&height.view),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::Sampler(&textures.albedo.sampler),
                },
            ],
        });

        PbrMaterial::new(textures, uniform, bind_group)
    }

    /// Create a skybox drawn with the pipeline matching `source`
    pub fn create_skybox(&self, source: SkyboxSource<'_>) -> Skybox {
        let layout = match source.kind() {
            SkyboxKind::Cubemap => &self.skybox_cube_layout,
            SkyboxKind::Equirect => &self.skybox_equirect_layout,
        };
        Skybox::new(&self.device, layout, source)
    }

    /// Point the skybox at the camera's orientation
    pub fn update_skybox(&self, skybox: &Skybox, camera: &Camera) {
        skybox.update(&self.queue, camera.view_matrix(), camera.projection_matrix());
    }

    /// Create the GPU side of a particle emitter
    pub fn create_particle_batch(&self, texture: Arc<Texture>, uniform: EmitterUniform) -> ParticleBatch {
        ParticleBatch::new(&self.device, &self.particle_bind_group_layout, texture, uniform)
    }

    /// Upload this frame's particle instances
    pub fn upload_particles(&self, batch: &mut ParticleBatch, instances: &[ParticleInstance]) {
        batch.upload(&self.device, &self.queue, instances);
    }

    /// Create a model bind group for rendering
    pub fn create_model_bind_group(&self, transform: Mat4) -> (wgpu::Buffer, wgpu::BindGroup) {
        let uniform = ModelUniform::from_transform(transform);
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Model Buffer"),
                contents: bytemuck::bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout: &self.model_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        (buffer, bind_group)
    }

    /// Update a model buffer
    pub fn update_model_buffer(&self, buffer: &wgpu::Buffer, transform: Mat4) {
        let uniform = ModelUniform::from_transform(transform);
        self.queue.write_buffer(buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Begin a render frame
    pub fn begin_frame(&self) -> Option<RenderFrame> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return None;
            }
            Err(e) => {
                log::error!("Surface error: {:?}", e);
                return None;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        Some(RenderFrame {
            output,
            view,
            encoder,
        })
    }

    /// End a render frame
    pub fn end_frame(&self, frame: RenderFrame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.output.present();
    }

    /// Create a render pass clearing colour and depth
    pub fn begin_render_pass<'a>(&'a self, frame: &'a mut RenderFrame) -> wgpu::RenderPass<'a> {
        frame
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            })
    }

    /// Draw the background. Call before any other draw in the pass.
    pub fn draw_skybox(&self, render_pass: &mut wgpu::RenderPass<'_>, skybox: &Skybox) {
        let pipeline = match skybox.kind {
            SkyboxKind::Cubemap => &self.skybox_cube_pipeline,
            SkyboxKind::Equirect => &self.skybox_equirect_pipeline,
        };

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &skybox.bind_group, &[]);
        render_pass.set_vertex_buffer(0, skybox.vertex_buffer.slice(..));
        render_pass.draw(0..skybox.vertex_count, 0..1);
    }

    /// Draw a mesh with a model transform and material.
    ///
    /// Nothing is drawn until an environment has been set or while the mesh
    /// is not uploaded.
    pub fn draw_mesh(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        mesh: &Mesh,
        model_bind_group: &wgpu::BindGroup,
        material: &PbrMaterial,
    ) {
        let (Some((vertex_buffer, index_buffer)), Some(environment)) =
            (mesh.buffers(), &self.environment_bind_group)
        else {
            return;
        };

        render_pass.set_pipeline(&self.pbr_pipeline);
        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
        render_pass.set_bind_group(1, model_bind_group, &[]);
        render_pass.set_bind_group(2, material.bind_group(), &[]);
        render_pass.set_bind_group(3, environment, &[]);
        render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..mesh.index_count(), 0, 0..1);
    }

    /// Draw the instances last uploaded to `batch`
    pub fn draw_particles(&self, render_pass: &mut wgpu::RenderPass<'_>, batch: &ParticleBatch) {
        if batch.instance_count() == 0 {
            return;
        }

        let Some(buffer) = batch.instance_buffer() else {
            return;
        };

        render_pass.set_pipeline(&self.particle_pipeline);
        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
        render_pass.set_bind_group(1, batch.bind_group(), &[]);
        render_pass.set_vertex_buffer(0, buffer.slice(..));
        // Draw 6 vertices per instance (2 triangles)
        render_pass.draw(0..6, 0..batch.instance_count());
    }

    /// Get the device
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Get the queue
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// A render frame in progress
pub struct RenderFrame {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes_match_shaders() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 144);
        assert_eq!(std::mem::size_of::<LightsUniform>(), 144);
        assert_eq!(std::mem::size_of::<ModelUniform>(), 128);
    }

    #[test]
    fn test_lights_uniform_truncates() {
        let lights: Vec<Light> = (0..6)
            .map(|i| Light::new(Vec3::splat(i as f32), Vec3::ONE))
            .collect();
        let uniform = LightsUniform::from_lights(&lights);
        assert_eq!(uniform.count[0], MAX_LIGHTS as u32);
        assert_eq!(uniform.positions[3], [3.0, 3.0, 3.0, 1.0]);

        let empty = LightsUniform::from_lights(&[]);
        assert_eq!(empty.count[0], 0);
    }

    #[test]
    fn test_normal_matrix_handles_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let uniform = ModelUniform::from_transform(model);
        let normal_matrix = Mat4::from_cols_array_2d(&uniform.normal_matrix);

        // A surface tilted 45 degrees in XY keeps a normal perpendicular to it
        let tangent = model.transform_vector3(Vec3::new(1.0, -1.0, 0.0));
        let normal = normal_matrix.transform_vector3(Vec3::new(1.0, 1.0, 0.0));
        assert!(tangent.dot(normal).abs() < 1e-6);
    }

    #[test]
    fn test_camera_uniform_tracks_camera() {
        let camera = Camera::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let mut uniform = CameraUniform::new();
        uniform.update(&camera);
        assert_eq!(uniform.position, [0.0, 0.0, 10.0, 1.0]);
        assert_eq!(uniform.view, camera.view_matrix().to_cols_array_2d());
    }
}
