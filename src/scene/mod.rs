//! Scene description and loading
//!
//! JSON object descriptors, glTF models, PBR objects and the RON scene file
//! that ties them together.

mod components;
mod config;
mod descriptor;
mod model;
mod object;

pub use components::{Name, Transform};
pub use config::{
    CameraConfig, EnvironmentSettings, GunFireConfig, ObjectConfig, ObjectKind, SceneConfig,
    SceneConfigError, SmokeConfig, TransformConfig, WindowConfig,
};
pub use descriptor::{DescriptorError, MaterialDescriptor, TextureRef};
pub use model::{Model, ModelError, ModelNode};
pub use object::{ObjectError, PbrObject, load_material};
