//! Physically based rendering demo built on wgpu
//!
//! This crate provides:
//! - Metallic/smoothness PBR shading with image-based lighting baked from an
//!   HDR panorama
//! - glTF model import with node hierarchies
//! - Skybox and particle effects
//! - A small window/input loop driving a [`core::Game`]

pub mod core;
pub mod input;
pub mod renderer;
pub mod scene;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use wgpu;
pub use winit;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{DebugInfo, Engine, EngineConfig, EngineContext, FrameStats, Game};
    pub use crate::input::Input;
    pub use crate::renderer::{
        Camera, CameraMovement, EnvironmentMap, GunFireEmitter, Light, ParticleBatch,
        ParticleEmitter, PbrMaterial, RenderFrame, Renderer, Skybox, SmokeEmitter, Texture,
        TextureCache, TextureOptions,
    };
    pub use crate::scene::{Name, PbrObject, SceneConfig, Transform};
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
    pub use winit::keyboard::KeyCode;
}
