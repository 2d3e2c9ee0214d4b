//! Demo scene layout, read from a RON file

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::components::Transform;
use crate::renderer::{EnvironmentConfig, Light, MAX_LIGHTS};

/// Everything the demo loads at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub window: WindowConfig,
    pub environment: EnvironmentSettings,
    /// Panorama drawn as the background instead of the environment cubemap
    #[serde(default)]
    pub skybox: Option<PathBuf>,
    #[serde(default)]
    pub camera: CameraConfig,
    /// Light 0 is directional, the rest are point lights
    #[serde(default)]
    pub lights: Vec<Light>,
    #[serde(default)]
    pub objects: Vec<ObjectConfig>,
    #[serde(default)]
    pub smoke: Option<SmokeConfig>,
    #[serde(default)]
    pub gunfire: Option<GunFireConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: String::from("PBR Demo"),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

/// HDR panorama used for image-based lighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSettings {
    pub path: PathBuf,
    #[serde(default)]
    pub bake: EnvironmentConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    /// Start circling the scene
    pub orbit: bool,
    pub orbit_center: Vec3,
    /// Camera position relative to the center at time zero
    pub orbit_offset: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 10.0),
            orbit: true,
            orbit_center: Vec3::ZERO,
            orbit_offset: Vec3::new(20.0, 10.0, 20.0),
        }
    }
}

/// What an object draws. Both variants name a JSON descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Model(PathBuf),
    Quad(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectConfig {
    pub name: String,
    pub kind: ObjectKind,
    #[serde(default)]
    pub transform: TransformConfig,
    /// Overrides the descriptor's smoothness factor
    #[serde(default)]
    pub smoothness_factor: Option<f32>,
}

/// Translation, XYZ Euler rotation in degrees and scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl From<TransformConfig> for Transform {
    fn from(config: TransformConfig) -> Self {
        Transform::from_euler_degrees(config.translation, config.rotation, config.scale)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmokeConfig {
    pub position: Vec3,
    pub wind: Vec3,
    pub texture: PathBuf,
    /// Billboard edge length
    #[serde(default = "default_smoke_size")]
    pub size: f32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GunFireConfig {
    pub position: Vec3,
    /// Sprite atlas
    pub texture: PathBuf,
    #[serde(default = "default_atlas_cells")]
    pub rows: u32,
    #[serde(default = "default_atlas_cells")]
    pub columns: u32,
    #[serde(default = "default_gunfire_size")]
    pub size: f32,
    /// Seconds between automatic bursts, none to fire only on click
    #[serde(default)]
    pub auto_fire_interval: Option<f32>,
    #[serde(default = "default_fire_direction")]
    pub fire_direction: Vec3,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_smoke_size() -> f32 {
    1.5
}

fn default_gunfire_size() -> f32 {
    0.5
}

fn default_atlas_cells() -> u32 {
    8
}

fn default_fire_direction() -> Vec3 {
    Vec3::NEG_X
}

impl SceneConfig {
    /// Read a scene file. Relative paths inside it are resolved against the
    /// file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or names more
    /// than [`MAX_LIGHTS`] lights
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SceneConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron(&text, path.parent().unwrap_or_else(|| Path::new("")))?;
        log::info!(
            "Loaded scene {} ({} objects, {} lights)",
            path.display(),
            config.objects.len(),
            config.lights.len()
        );
        Ok(config)
    }

    /// Parse RON text, resolving relative paths against `base`
    ///
    /// # Errors
    ///
    /// Returns an error on malformed RON or too many lights
    pub fn from_ron(text: &str, base: &Path) -> Result<Self, SceneConfigError> {
        let mut config: Self = ron::from_str(text)?;
        if config.lights.len() > MAX_LIGHTS {
            return Err(SceneConfigError::TooManyLights(config.lights.len()));
        }
        config.resolve_paths(base);
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        resolve(&mut self.environment.path);
        if let Some(p) = self.skybox.as_mut() {
            resolve(p);
        }
        for object in &mut self.objects {
            match &mut object.kind {
                ObjectKind::Model(p) | ObjectKind::Quad(p) => resolve(p),
            }
        }
        if let Some(smoke) = self.smoke.as_mut() {
            resolve(&mut smoke.texture);
        }
        if let Some(gunfire) = self.gunfire.as_mut() {
            resolve(&mut gunfire.texture);
        }
    }
}

/// Errors that can occur while reading a scene file
#[derive(Debug, thiserror::Error)]
pub enum SceneConfigError {
    #[error("failed to read scene {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse scene: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("scene has {0} lights, at most {MAX_LIGHTS} are supported")]
    TooManyLights(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"(
        environment: (path: "sky.hdr"),
    )"#;

    #[test]
    fn test_minimal_scene_uses_defaults() {
        let config = SceneConfig::from_ron(MINIMAL, Path::new("assets")).unwrap();
        assert_eq!(config.environment.path, PathBuf::from("assets/sky.hdr"));
        assert_eq!(config.environment.bake, EnvironmentConfig::default());
        assert_eq!(config.window, WindowConfig::default());
        assert_eq!(config.camera, CameraConfig::default());
        assert!(config.objects.is_empty());
        assert!(config.smoke.is_none());
        assert!(config.skybox.is_none());
    }

    #[test]
    fn test_objects_and_emitters() {
        let text = r#"(
            environment: (path: "/abs/sky.hdr", bake: (cubemap_size: 256)),
            skybox: Some("sky.jpg"),
            camera: (orbit: false),
            lights: [(position: (1.0, 1.0, 0.0), color: (3.0, 3.0, 3.0))],
            objects: [
                (
                    name: "magazine",
                    kind: Model("ak47_magazine.json"),
                    transform: (translation: (0.0, -0.9, 0.0), rotation: (0.0, 180.0, 0.0), scale: (0.05, 0.05, 0.05)),
                    smoothness_factor: Some(0.55),
                ),
                (name: "ground", kind: Quad("sandy_ground.json")),
            ],
            smoke: Some((position: (0.0, -5.0, 0.0), wind: (0.0, 0.0, 5.0), texture: "smoke.png")),
            gunfire: Some((position: (-6.5, 0.4, 0.0), texture: "atlas.png", auto_fire_interval: Some(2.0))),
        )"#;

        let config = SceneConfig::from_ron(text, Path::new("assets")).unwrap();
        assert_eq!(config.environment.path, PathBuf::from("/abs/sky.hdr"));
        assert_eq!(config.environment.bake.cubemap_size, 256);
        assert_eq!(config.environment.bake.irradiance_size, 32);
        assert_eq!(config.skybox, Some(PathBuf::from("assets/sky.jpg")));
        assert!(!config.camera.orbit);
        assert_eq!(config.camera.position, Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(config.lights.len(), 1);

        let magazine = &config.objects[0];
        assert_eq!(
            magazine.kind,
            ObjectKind::Model(PathBuf::from("assets/ak47_magazine.json"))
        );
        assert_eq!(magazine.smoothness_factor, Some(0.55));
        let ground = &config.objects[1];
        assert_eq!(ground.transform, TransformConfig::default());
        assert_eq!(ground.smoothness_factor, None);

        let smoke = config.smoke.unwrap();
        assert_eq!(smoke.texture, PathBuf::from("assets/smoke.png"));
        assert!(smoke.enabled);

        let gunfire = config.gunfire.unwrap();
        assert_eq!((gunfire.rows, gunfire.columns), (8, 8));
        assert_eq!(gunfire.fire_direction, Vec3::NEG_X);
        assert_eq!(gunfire.auto_fire_interval, Some(2.0));
    }

    #[test]
    fn test_too_many_lights() {
        let text = r#"(
            environment: (path: "sky.hdr"),
            lights: [
                (position: (0.0, 0.0, 0.0), color: (1.0, 1.0, 1.0)),
                (position: (0.0, 0.0, 0.0), color: (1.0, 1.0, 1.0)),
                (position: (0.0, 0.0, 0.0), color: (1.0, 1.0, 1.0)),
                (position: (0.0, 0.0, 0.0), color: (1.0, 1.0, 1.0)),
                (position: (0.0, 0.0, 0.0), color: (1.0, 1.0, 1.0)),
            ],
        )"#;
        assert!(matches!(
            SceneConfig::from_ron(text, Path::new("")),
            Err(SceneConfigError::TooManyLights(5))
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            SceneConfig::from_ron("(objects: [])", Path::new("")),
            Err(SceneConfigError::Parse(_))
        ));
        assert!(matches!(
            SceneConfig::load("missing/scene.ron"),
            Err(SceneConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_bundled_scene_parses() {
        let config = SceneConfig::from_ron(include_str!("../../assets/scene.ron"), Path::new("assets")).unwrap();
        assert_eq!(config.objects.len(), 3);
        assert!(config.smoke.is_some());
        assert!(config.gunfire.is_some());
        assert!(config.environment.bake.validate().is_ok());

        let transform: Transform = config.objects[2].transform.into();
        let up = transform.matrix().transform_vector3(Vec3::Z).normalize();
        assert!((up - Vec3::Y).length() < 1e-5);
    }
}
