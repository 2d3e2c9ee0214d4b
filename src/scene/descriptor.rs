//! JSON descriptors naming a PBR object's model and texture maps

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::renderer::{MaterialParams, TextureOptions};

/// Contents of a PBR object descriptor file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDescriptor {
    /// glTF file, required for models but not for quads
    #[serde(default)]
    pub model_file_path: Option<PathBuf>,

    pub albedo_map_path: PathBuf,
    pub albedo_map_is_srgb: bool,

    pub metallic_smoothness_map_path: PathBuf,
    pub metallic_smoothness_map_is_srgb: bool,

    pub normal_map_path: PathBuf,
    pub normal_map_is_srgb: bool,

    #[serde(default)]
    pub has_ao: bool,
    #[serde(default)]
    pub ao_map_path: Option<PathBuf>,
    #[serde(default)]
    pub ao_map_is_srgb: bool,

    #[serde(default)]
    pub has_height_map: bool,
    #[serde(default)]
    pub height_map_path: Option<PathBuf>,
    #[serde(default)]
    pub height_map_scale: f32,
    #[serde(default)]
    pub height_map_is_srgb: bool,

    #[serde(default = "default_smoothness_factor")]
    pub smoothness_factor: f32,
}

fn default_smoothness_factor() -> f32 {
    1.0
}

/// A texture path with the colour space it is stored in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRef {
    pub path: PathBuf,
    pub srgb: bool,
}

impl TextureRef {
    fn new(path: PathBuf, srgb: bool) -> Self {
        Self { path, srgb }
    }

    /// Loading options for this map
    pub fn options(&self) -> TextureOptions {
        TextureOptions::material(self.srgb)
    }
}

impl MaterialDescriptor {
    /// Read and validate a descriptor. Relative paths inside it are
    /// resolved against the descriptor's own directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an enabled
    /// AO / height map has no path
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DescriptorError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let descriptor = Self::from_json(&text, base).map_err(|e| match e {
            DescriptorError::Parse { source, .. } => DescriptorError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        log::debug!("Loaded descriptor {}", path.display());
        Ok(descriptor)
    }

    /// Parse a descriptor from JSON text, resolving relative paths against
    /// `base`
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON or a missing AO / height map path
    pub fn from_json(text: &str, base: &Path) -> Result<Self, DescriptorError> {
        let mut descriptor: Self =
            serde_json::from_str(text).map_err(|source| DescriptorError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        descriptor.resolve_paths(base);
        descriptor.validate()?;
        Ok(descriptor)
    }

    fn resolve_paths(&mut self, base: &Path) {
        // An empty string means "no file"
        for optional in [
            &mut self.model_file_path,
            &mut self.ao_map_path,
            &mut self.height_map_path,
        ] {
            *optional = optional.take().filter(|p| !p.as_os_str().is_empty());
        }

        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        if let Some(p) = self.model_file_path.as_mut() {
            resolve(p);
        }
        resolve(&mut self.albedo_map_path);
        resolve(&mut self.metallic_smoothness_map_path);
        resolve(&mut self.normal_map_path);
        if let Some(p) = self.ao_map_path.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.height_map_path.as_mut() {
            resolve(p);
        }
    }

    fn validate(&self) -> Result<(), DescriptorError> {
        if self.has_ao && self.ao_map_path.is_none() {
            return Err(DescriptorError::MissingAoMap);
        }
        if self.has_height_map && self.height_map_path.is_none() {
            return Err(DescriptorError::MissingHeightMap);
        }
        Ok(())
    }

    /// The glTF file, for descriptors that describe a model
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::MissingModelPath`] when the key is absent
    pub fn model_path(&self) -> Result<&Path, DescriptorError> {
        self.model_file_path
            .as_deref()
            .ok_or(DescriptorError::MissingModelPath)
    }

    pub fn albedo(&self) -> TextureRef {
        TextureRef::new(self.albedo_map_path.clone(), self.albedo_map_is_srgb)
    }

    pub fn metallic_smoothness(&self) -> TextureRef {
        TextureRef::new(
            self.metallic_smoothness_map_path.clone(),
            self.metallic_smoothness_map_is_srgb,
        )
    }

    pub fn normal(&self) -> TextureRef {
        TextureRef::new(self.normal_map_path.clone(), self.normal_map_is_srgb)
    }

    /// AO map, only when enabled
    pub fn ao(&self) -> Option<TextureRef> {
        self.ao_map_path
            .clone()
            .filter(|_| self.has_ao)
            .map(|p| TextureRef::new(p, self.ao_map_is_srgb))
    }

    /// Height map, only when enabled
    pub fn height(&self) -> Option<TextureRef> {
        self.height_map_path
            .clone()
            .filter(|_| self.has_height_map)
            .map(|p| TextureRef::new(p, self.height_map_is_srgb))
    }

    /// Scalar parameters for the material uniform
    pub fn params(&self) -> MaterialParams {
        MaterialParams {
            smoothness_factor: self.smoothness_factor,
            height_map_scale: self.height_map_scale,
            has_ao: self.has_ao,
            has_height_map: self.has_height_map,
        }
    }
}

/// Errors that can occur while reading a descriptor
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("failed to read descriptor {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse descriptor {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("descriptor has no model_file_path")]
    MissingModelPath,
    #[error("has_ao is set but ao_map_path is missing")]
    MissingAoMap,
    #[error("has_height_map is set but height_map_path is missing")]
    MissingHeightMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    const AK47: &str = r#"{
        "model_file_path": "ak47/ak47.gltf",
        "albedo_map_path": "ak47/albedo.png",
        "albedo_map_is_srgb": true,
        "metallic_smoothness_map_path": "ak47/metallic_smoothness.png",
        "metallic_smoothness_map_is_srgb": false,
        "normal_map_path": "ak47/normal.png",
        "normal_map_is_srgb": false,
        "has_ao": true,
        "ao_map_path": "ak47/ao.png",
        "ao_map_is_srgb": false,
        "has_height_map": false,
        "height_map_path": "",
        "height_map_scale": 0.0,
        "height_map_is_srgb": false
    }"#;

    #[test]
    fn test_parse_and_resolve() {
        let d = MaterialDescriptor::from_json(AK47, Path::new("assets")).unwrap();
        assert_eq!(d.model_path().unwrap(), Path::new("assets/ak47/ak47.gltf"));
        assert_eq!(d.albedo().path, PathBuf::from("assets/ak47/albedo.png"));
        assert!(d.albedo().srgb);
        assert!(!d.normal().srgb);
        assert_eq!(d.ao().unwrap().path, PathBuf::from("assets/ak47/ao.png"));
        assert!(d.height().is_none());
        assert_eq!(d.smoothness_factor, 1.0);

        let params = d.params();
        assert!(params.has_ao);
        assert!(!params.has_height_map);
    }

    #[test]
    fn test_absolute_paths_untouched() {
        let json = AK47.replace("\"ak47/albedo.png\"", "\"/textures/albedo.png\"");
        let d = MaterialDescriptor::from_json(&json, Path::new("assets")).unwrap();
        assert_eq!(d.albedo().path, PathBuf::from("/textures/albedo.png"));
    }

    #[test]
    fn test_quad_without_model() {
        let json = r#"{
            "albedo_map_path": "a.png", "albedo_map_is_srgb": true,
            "metallic_smoothness_map_path": "m.png", "metallic_smoothness_map_is_srgb": false,
            "normal_map_path": "n.png", "normal_map_is_srgb": false,
            "has_height_map": true, "height_map_path": "h.png", "height_map_scale": 0.05,
            "smoothness_factor": 0.5
        }"#;
        let d = MaterialDescriptor::from_json(json, Path::new("")).unwrap();
        assert!(matches!(d.model_path(), Err(DescriptorError::MissingModelPath)));
        assert!(d.ao().is_none());
        assert_eq!(d.height().unwrap().path, PathBuf::from("h.png"));
        assert_eq!(d.params().height_map_scale, 0.05);
        assert_eq!(d.params().smoothness_factor, 0.5);
    }

    #[test]
    fn test_enabled_maps_need_paths() {
        let json = r#"{
            "albedo_map_path": "a.png", "albedo_map_is_srgb": true,
            "metallic_smoothness_map_path": "m.png", "metallic_smoothness_map_is_srgb": false,
            "normal_map_path": "n.png", "normal_map_is_srgb": false,
            "has_ao": true
        }"#;
        assert!(matches!(
            MaterialDescriptor::from_json(json, Path::new("")),
            Err(DescriptorError::MissingAoMap)
        ));

        let json = json.replace("has_ao", "has_height_map");
        assert!(matches!(
            MaterialDescriptor::from_json(&json, Path::new("")),
            Err(DescriptorError::MissingHeightMap)
        ));
    }

    #[test]
    fn test_empty_map_paths_count_as_missing() {
        let json = r#"{
            "model_file_path": "",
            "albedo_map_path": "a.png", "albedo_map_is_srgb": true,
            "metallic_smoothness_map_path": "m.png", "metallic_smoothness_map_is_srgb": false,
            "normal_map_path": "n.png", "normal_map_is_srgb": false,
            "has_ao": true, "ao_map_path": ""
        }"#;
        assert!(matches!(
            MaterialDescriptor::from_json(json, Path::new("assets")),
            Err(DescriptorError::MissingAoMap)
        ));

        let json = json.replace(r#""has_ao": true, "ao_map_path": """#, r#""has_height_map": true, "height_map_path": """#);
        assert!(matches!(
            MaterialDescriptor::from_json(&json, Path::new("assets")),
            Err(DescriptorError::MissingHeightMap)
        ));

        let json = json.replace(r#""has_height_map": true"#, r#""has_height_map": false"#);
        let d = MaterialDescriptor::from_json(&json, Path::new("assets")).unwrap();
        assert!(d.height_map_path.is_none());
        assert!(matches!(d.model_path(), Err(DescriptorError::MissingModelPath)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            MaterialDescriptor::from_json("{", Path::new("")),
            Err(DescriptorError::Parse { .. })
        ));
        // Required key missing
        assert!(matches!(
            MaterialDescriptor::from_json(r#"{"albedo_map_path": "a.png"}"#, Path::new("")),
            Err(DescriptorError::Parse { .. })
        ));
        assert!(matches!(
            MaterialDescriptor::load("does/not/exist.json"),
            Err(DescriptorError::Io { .. })
        ));
    }

    #[test]
    fn test_bundled_descriptors_parse() {
        let base = Path::new("assets");
        for text in [
            include_str!("../../assets/ak47.json"),
            include_str!("../../assets/ak47_magazine.json"),
        ] {
            let d = MaterialDescriptor::from_json(text, base).unwrap();
            assert!(d.model_path().is_ok());
            assert!(d.ao().is_some());
        }

        let ground = MaterialDescriptor::from_json(include_str!("../../assets/sandy_ground.json"), base).unwrap();
        assert!(ground.model_file_path.is_none());
        assert!(ground.height().is_some());
    }
}
