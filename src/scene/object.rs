//! PBR scene objects: a model drawn with one material

use std::path::Path;

use glam::Mat4;

use super::descriptor::{DescriptorError, MaterialDescriptor, TextureRef};
use super::model::{Model, ModelError};
use crate::renderer::{
    Mesh, MaterialTextures, PbrMaterial, Renderer, TextureCache, TextureError,
};

/// One mesh instance with its own model uniform
#[derive(Debug)]
struct ObjectDraw {
    mesh: usize,
    /// Node world transform inside the model
    node_transform: Mat4,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// A model with a PBR material, ready to draw
#[derive(Debug)]
pub struct PbrObject {
    model: Model,
    material: PbrMaterial,
    draws: Vec<ObjectDraw>,
}

impl PbrObject {
    /// Wrap an imported model. Uploads its meshes and creates one model
    /// uniform per mesh instance.
    pub fn new(renderer: &Renderer, mut model: Model, material: PbrMaterial) -> Self {
        model.upload(renderer.device());

        let draws = model
            .draw_list(Mat4::IDENTITY)
            .into_iter()
            .map(|(mesh, node_transform)| {
                let (buffer, bind_group) = renderer.create_model_bind_group(node_transform);
                ObjectDraw {
                    mesh,
                    node_transform,
                    buffer,
                    bind_group,
                }
            })
            .collect();

        Self {
            model,
            material,
            draws,
        }
    }

    /// Load the glTF model and material named by a descriptor
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor, model or any texture fails to load
    pub fn load_model(
        renderer: &Renderer,
        cache: &mut TextureCache,
        descriptor_path: impl AsRef<Path>,
        smoothness_factor: Option<f32>,
    ) -> Result<Self, ObjectError> {
        let descriptor = MaterialDescriptor::load(descriptor_path)?;
        let model = Model::load(descriptor.model_path()?)?;
        let material = load_material(renderer, cache, &descriptor, smoothness_factor)?;
        Ok(Self::new(renderer, model, material))
    }

    /// A textured `[-1, 1]` quad using a descriptor's material
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor or any texture fails to load
    pub fn load_quad(
        renderer: &Renderer,
        cache: &mut TextureCache,
        descriptor_path: impl AsRef<Path>,
        smoothness_factor: Option<f32>,
    ) -> Result<Self, ObjectError> {
        let descriptor = MaterialDescriptor::load(descriptor_path)?;
        let material = load_material(renderer, cache, &descriptor, smoothness_factor)?;
        Ok(Self::new(renderer, Model::from_mesh(Mesh::quad()), material))
    }

    /// Write `object_transform * node transform` for every mesh instance
    pub fn prepare(&self, renderer: &Renderer, object_transform: Mat4) {
        for draw in &self.draws {
            renderer.update_model_buffer(&draw.buffer, object_transform * draw.node_transform);
        }
    }

    /// Issue one indexed draw per mesh instance
    pub fn draw(&self, renderer: &Renderer, render_pass: &mut wgpu::RenderPass<'_>) {
        for draw in &self.draws {
            if let Some(mesh) = self.model.meshes.get(draw.mesh) {
                renderer.draw_mesh(render_pass, mesh, &draw.bind_group, &self.material);
            }
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn material(&self) -> &PbrMaterial {
        &self.material
    }

    /// Number of mesh instances drawn per frame
    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }
}

/// Load a descriptor's textures through `cache` and build the material.
/// `smoothness_factor` overrides the descriptor's value.
///
/// # Errors
///
/// Returns an error if any enabled texture fails to load
pub fn load_material(
    renderer: &Renderer,
    cache: &mut TextureCache,
    descriptor: &MaterialDescriptor,
    smoothness_factor: Option<f32>,
) -> Result<PbrMaterial, ObjectError> {
    let mut load = |texture: TextureRef| {
        cache.load(
            renderer.device(),
            renderer.queue(),
            &texture.path,
            texture.options(),
        )
    };

    let textures = MaterialTextures {
        albedo: load(descriptor.albedo())?,
        normal: load(descriptor.normal())?,
        metallic_smoothness: load(descriptor.metallic_smoothness())?,
        ao: descriptor.ao().map(&mut load).transpose()?,
        height: descriptor.height().map(&mut load).transpose()?,
    };

    let mut params = descriptor.params();
    if let Some(factor) = smoothness_factor {
        params.smoothness_factor = factor;
    }

    Ok(renderer.create_material(textures, &params))
}

/// Errors that can occur while building a scene object
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Texture(#[from] TextureError),
}
