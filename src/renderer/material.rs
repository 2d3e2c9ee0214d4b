//! PBR material: texture set plus shading parameters

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use super::texture::Texture;

/// Material parameters as laid out in the shader
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    /// Multiplier applied to the smoothness channel
    pub smoothness_factor: f32,
    /// Parallax depth scale
    pub height_map_scale: f32,
    /// Non-zero when the AO map is sampled
    pub has_ao: u32,
    /// Non-zero when parallax mapping is enabled
    pub has_height_map: u32,
}

impl MaterialUniform {
    /// Create a new material uniform
    pub fn new(params: &MaterialParams) -> Self {
        Self {
            smoothness_factor: params.smoothness_factor,
            height_map_scale: params.height_map_scale,
            has_ao: u32::from(params.has_ao),
            has_height_map: u32::from(params.has_height_map),
        }
    }
}

impl Default for MaterialUniform {
    fn default() -> Self {
        Self::new(&MaterialParams::default())
    }
}

/// Scalar material settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    pub smoothness_factor: f32,
    pub height_map_scale: f32,
    pub has_ao: bool,
    pub has_height_map: bool,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            smoothness_factor: 1.0,
            height_map_scale: 0.0,
            has_ao: false,
            has_height_map: false,
        }
    }
}

/// Textures a material samples. Missing AO or height maps are replaced by
/// a white texture when the material is created.
#[derive(Debug, Clone)]
pub struct MaterialTextures {
    pub albedo: Arc<Texture>,
    pub normal: Arc<Texture>,
    pub metallic_smoothness: Arc<Texture>,
    pub ao: Option<Arc<Texture>>,
    pub height: Option<Arc<Texture>>,
}

/// A GPU material bound at group 2 of the PBR pipeline. The bind group
/// keeps its uniform buffer alive.
#[derive(Debug)]
pub struct PbrMaterial {
    textures: MaterialTextures,
    uniform: MaterialUniform,
    bind_group: wgpu::BindGroup,
}

impl PbrMaterial {
    pub(crate) fn new(
        textures: MaterialTextures,
        uniform: MaterialUniform,
        bind_group: wgpu::BindGroup,
    ) -> Self {
        Self {
            textures,
            uniform,
            bind_group,
        }
    }

    /// Current shader parameters
    pub fn uniform(&self) -> &MaterialUniform {
        &self.uniform
    }

    /// Textures bound by this material
    pub fn textures(&self) -> &MaterialTextures {
        &self.textures
    }

    pub(crate) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 16);
    }

    #[test]
    fn test_uniform_from_params() {
        let uniform = MaterialUniform::new(&MaterialParams {
            smoothness_factor: 0.55,
            height_map_scale: 0.1,
            has_ao: true,
            has_height_map: false,
        });
        assert_eq!(uniform.smoothness_factor, 0.55);
        assert_eq!(uniform.height_map_scale, 0.1);
        assert_eq!(uniform.has_ao, 1);
        assert_eq!(uniform.has_height_map, 0);

        assert_eq!(MaterialUniform::default().smoothness_factor, 1.0);
    }
}
