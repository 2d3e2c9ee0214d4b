//! Rendering module
//!
//! wgpu rendering: PBR meshes lit by baked image-based lighting, a skybox and
//! additive particle billboards.

mod camera;
mod context;
mod environment;
mod material;
mod mesh;
mod particles;
mod skybox;
mod texture;

pub use camera::{Camera, CameraMovement};
pub use context::{Light, MAX_LIGHTS, ModelUniform, RenderFrame, Renderer, RendererError};
pub use environment::{
    CubeFace, CubeTexture, EnvironmentConfig, EnvironmentError, EnvironmentMap, equirect_uv,
    mip_size, roughness_for_mip,
};
pub use material::{MaterialParams, MaterialTextures, MaterialUniform, PbrMaterial};
pub use mesh::{Mesh, Vertex, compute_normals, compute_tangents};
pub use particles::{
    AutoFire, EmitterUniform, GUNFIRE_LIFETIME, GunFireEmitter, Particle, ParticleBatch,
    ParticleEmitter, ParticleInstance, ParticleMode, SMOKE_LIFETIME, SmokeEmitter,
    sorted_instances,
};
pub use skybox::{Skybox, SkyboxKind, SkyboxSource, SkyboxUniform};
pub use texture::{Texture, TextureCache, TextureError, TextureOptions, mip_level_count};
