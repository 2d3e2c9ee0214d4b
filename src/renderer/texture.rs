//! Texture loading and GPU management
//!
//! Decodes images through the `image` crate and uploads them with a CPU-built
//! mip chain. Floating point images (Radiance `.hdr`) stay in linear HDR.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, GenericImageView, RgbaImage, imageops::FilterType};
use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

/// How a texture is stored and sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureOptions {
    /// Texels are sRGB encoded and decoded by the sampler
    pub srgb: bool,
    /// Build a full mip chain
    pub mipmaps: bool,
    /// Repeat (true) or clamp (false) outside `[0, 1]`
    pub repeat: bool,
}

impl TextureOptions {
    /// Material texture: repeat addressing with mipmaps
    pub const fn material(srgb: bool) -> Self {
        Self {
            srgb,
            mipmaps: true,
            repeat: true,
        }
    }

    /// Panorama / lookup texture: clamped, single level
    pub const fn clamped(srgb: bool) -> Self {
        Self {
            srgb,
            mipmaps: false,
            repeat: false,
        }
    }
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self::material(true)
    }
}

/// A GPU texture with its view and sampler
#[derive(Debug)]
pub struct Texture {
    /// The GPU texture
    pub texture: wgpu::Texture,
    /// Texture view for binding
    pub view: wgpu::TextureView,
    /// Sampler for texture filtering
    pub sampler: wgpu::Sampler,
    /// Texture dimensions
    pub size: wgpu::Extent3d,
}

impl Texture {
    /// Load a texture from a file path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, decoded or is larger than
    /// the device allows
    pub fn from_path(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: impl AsRef<Path>,
        options: TextureOptions,
    ) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let img = image::ImageReader::open(path)
            .map_err(|source| TextureError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .with_guessed_format()
            .map_err(|source| TextureError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .decode()
            .map_err(|source| TextureError::Decode {
                path: path.to_path_buf(),
                source,
            })?;

        let label = path.to_string_lossy();
        let texture = Self::from_image(device, queue, &img, options, Some(&label))?;
        log::info!(
            "Loaded texture {} ({}x{}, {})",
            path.display(),
            texture.width(),
            texture.height(),
            if texture.is_hdr() { "HDR" } else { "LDR" }
        );
        Ok(texture)
    }

    /// Create a texture from a `DynamicImage`.
    ///
    /// Floating point images are uploaded as `Rgba16Float` regardless of
    /// `options.srgb`.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &DynamicImage,
        options: TextureOptions,
        label: Option<&str>,
    ) -> Result<Self, TextureError> {
        let (width, height) = img.dimensions();
        let max = device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(TextureError::TooLarge { width, height, max });
        }

        match img {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                Ok(Self::from_hdr(device, queue, img, options, label))
            }
            _ => Ok(Self::from_rgba(device, queue, &img.to_rgba8(), options, label)),
        }
    }

    /// Create a texture from 8-bit RGBA data
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &RgbaImage,
        options: TextureOptions,
        label: Option<&str>,
    ) -> Self {
        let (width, height) = rgba.dimensions();
        let mip_count = if options.mipmaps {
            mip_level_count(width, height)
        } else {
            1
        };

        // All levels back to back, largest first
        let mut data = rgba.as_raw().clone();
        let mut level = rgba.clone();
        for _ in 1..mip_count {
            let (w, h) = level.dimensions();
            level = image::imageops::resize(
                &level,
                (w / 2).max(1),
                (h / 2).max(1),
                FilterType::Triangle,
            );
            data.extend_from_slice(level.as_raw());
        }

        let format = if options.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };

        Self::create(device, queue, (width, height), mip_count, format, options, &data, label)
    }

    /// Create a linear HDR texture from a floating point image
    fn from_hdr(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &DynamicImage,
        options: TextureOptions,
        label: Option<&str>,
    ) -> Self {
        let rgba = img.to_rgba32f();
        let texels: Vec<half::f16> = rgba
            .as_raw()
            .iter()
            .map(|&v| half::f16::from_f32(v))
            .collect();

        let options = TextureOptions {
            srgb: false,
            mipmaps: false,
            ..options
        };

        Self::create(
            device,
            queue,
            rgba.dimensions(),
            1,
            wgpu::TextureFormat::Rgba16Float,
            options,
            bytemuck::cast_slice(&texels),
            label,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        dimensions: (u32, u32),
        mip_level_count: u32,
        format: wgpu::TextureFormat,
        options: TextureOptions,
        data: &[u8],
        label: Option<&str>,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label,
                size,
                mip_level_count,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let address_mode = if options.repeat {
            wgpu::AddressMode::Repeat
        } else {
            wgpu::AddressMode::ClampToEdge
        };

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("texture_sampler"),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            size,
        }
    }

    /// Create a 1x1 texture of a single color (defaults and placeholders)
    #[must_use]
    pub fn solid_color(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color: [u8; 4],
        srgb: bool,
    ) -> Self {
        let pixel = RgbaImage::from_pixel(1, 1, image::Rgba(color));
        Self::from_rgba(
            device,
            queue,
            &pixel,
            TextureOptions::material(srgb),
            Some("solid_color_texture"),
        )
    }

    /// Create a 1x1 white texture
    #[must_use]
    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::solid_color(device, queue, [255, 255, 255, 255], false)
    }

    /// Get texture width
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.size.width
    }

    /// Get texture height
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.size.height
    }

    /// Whether texels are stored as linear floating point
    #[must_use]
    pub fn is_hdr(&self) -> bool {
        self.texture.format() == wgpu::TextureFormat::Rgba16Float
    }
}

/// Textures loaded from disk, shared by path and storage options
#[derive(Debug, Default)]
pub struct TextureCache {
    textures: FxHashMap<(PathBuf, TextureOptions), Arc<Texture>>,
}

impl TextureCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a texture, or return the copy loaded earlier with the same options
    pub fn load(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: impl AsRef<Path>,
        options: TextureOptions,
    ) -> Result<Arc<Texture>, TextureError> {
        let key = (path.as_ref().to_path_buf(), options);
        if let Some(texture) = self.textures.get(&key) {
            log::debug!("Texture cache hit: {}", key.0.display());
            return Ok(Arc::clone(texture));
        }

        let texture = Arc::new(Texture::from_path(device, queue, &key.0, options)?);
        self.textures.insert(key, Arc::clone(&texture));
        Ok(texture)
    }

    /// Number of cached textures
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether the cache holds no textures
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

/// Number of levels in a full mip chain down to 1x1
#[must_use]
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Errors that can occur during texture loading
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to read image {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to decode image: {0}")]
    DecodeBytes(#[from] image::ImageError),
    #[error("image is {width}x{height}, device limit is {max}")]
    TooLarge { width: u32, height: u32, max: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(512, 512), 10);
        assert_eq!(mip_level_count(1024, 256), 11);
        assert_eq!(mip_level_count(300, 7), 9);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn test_options_presets() {
        let material = TextureOptions::material(true);
        assert!(material.srgb && material.mipmaps && material.repeat);

        let clamped = TextureOptions::clamped(false);
        assert!(!clamped.srgb && !clamped.mipmaps && !clamped.repeat);
    }
}
