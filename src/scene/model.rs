//! glTF import and node hierarchy traversal

use std::path::Path;

use glam::{Mat4, Vec3, Vec4};
use smallvec::SmallVec;

use crate::renderer::{Mesh, Vertex, compute_normals, compute_tangents};

/// A node of an imported scene graph
#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    pub name: Option<String>,
    /// Transform relative to the parent node
    pub local: Mat4,
    /// Indices into [`Model::meshes`]
    pub meshes: SmallVec<[usize; 2]>,
    /// Indices into [`Model::nodes`]
    pub children: SmallVec<[usize; 4]>,
}

impl ModelNode {
    fn leaf(local: Mat4, meshes: SmallVec<[usize; 2]>) -> Self {
        Self {
            name: None,
            local,
            meshes,
            children: SmallVec::new(),
        }
    }
}

/// Meshes plus the node tree that places them
#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub nodes: Vec<ModelNode>,
    /// Top-level nodes, drawn in order
    pub roots: Vec<usize>,
}

impl Model {
    /// Import a `.gltf` or `.glb` file. Only geometry is read; textures come
    /// from the object descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its buffers cannot be read, a
    /// primitive has no positions, or the file has no nodes
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let gltf = gltf::Gltf::open(path)?;
        let buffers = gltf::import_buffers(&gltf.document, path.parent(), gltf.blob.clone())?;
        let model = Self::from_document(&gltf.document, &buffers)?;
        log::info!(
            "Loaded model {} ({} meshes, {} nodes)",
            path.display(),
            model.meshes.len(),
            model.nodes.len()
        );
        Ok(model)
    }

    /// Import from in-memory glTF JSON or GLB bytes. External buffers are
    /// not resolved; data URIs and the GLB blob are.
    ///
    /// # Errors
    ///
    /// Same as [`Model::load`]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let gltf = gltf::Gltf::from_slice(bytes)?;
        let buffers = gltf::import_buffers(&gltf.document, None, gltf.blob.clone())?;
        Self::from_document(&gltf.document, &buffers)
    }

    /// A model with one root node drawing `mesh`
    pub fn from_mesh(mesh: Mesh) -> Self {
        Self {
            meshes: vec![mesh],
            nodes: vec![ModelNode::leaf(Mat4::IDENTITY, SmallVec::from_slice(&[0]))],
            roots: vec![0],
        }
    }

    fn from_document(
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
    ) -> Result<Self, ModelError> {
        // Each glTF mesh may expand into several of our meshes, one per primitive
        let mut meshes = Vec::new();
        let mut mesh_ranges = Vec::with_capacity(document.meshes().len());

        for gltf_mesh in document.meshes() {
            let start = meshes.len();
            for primitive in gltf_mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!(
                        "Skipping {:?} primitive {} of mesh {}",
                        primitive.mode(),
                        primitive.index(),
                        gltf_mesh.index()
                    );
                    continue;
                }
                meshes.push(read_primitive(&gltf_mesh, &primitive, buffers)?);
            }
            mesh_ranges.push(start..meshes.len());
        }

        let nodes: Vec<ModelNode> = document
            .nodes()
            .map(|node| ModelNode {
                name: node.name().map(str::to_owned),
                local: Mat4::from_cols_array_2d(&node.transform().matrix()),
                meshes: node
                    .mesh()
                    .and_then(|m| mesh_ranges.get(m.index()).cloned())
                    .map(|range| range.collect())
                    .unwrap_or_default(),
                children: node.children().map(|c| c.index()).collect(),
            })
            .collect();

        let roots = match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => scene.nodes().map(|n| n.index()).collect(),
            None => parentless(&nodes),
        };

        if roots.is_empty() {
            return Err(ModelError::NoScene);
        }

        Ok(Self {
            meshes,
            nodes,
            roots,
        })
    }

    /// Depth-first walk from every root. `visit` receives each node and its
    /// world transform `parent * local`, starting from `root`.
    pub fn traverse(&self, root: Mat4, mut visit: impl FnMut(&ModelNode, Mat4)) {
        let mut stack: Vec<(usize, Mat4, usize)> = self
            .roots
            .iter()
            .rev()
            .map(|&index| (index, root, 0))
            .collect();

        while let Some((index, parent, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            // A cyclic file would otherwise never finish
            if depth > self.nodes.len() {
                log::warn!("Node hierarchy deeper than node count, stopping at node {index}");
                continue;
            }

            let world = parent * node.local;
            visit(node, world);

            stack.extend(
                node.children
                    .iter()
                    .rev()
                    .map(|&child| (child, world, depth + 1)),
            );
        }
    }

    /// Every mesh instance with its world transform, in traversal order
    pub fn draw_list(&self, root: Mat4) -> Vec<(usize, Mat4)> {
        let mut draws = Vec::new();
        self.traverse(root, |node, world| {
            draws.extend(node.meshes.iter().map(|&mesh| (mesh, world)));
        });
        draws
    }

    /// Create GPU buffers for every mesh
    pub fn upload(&mut self, device: &wgpu::Device) {
        for mesh in &mut self.meshes {
            mesh.upload(device);
        }
    }
}

fn parentless(nodes: &[ModelNode]) -> Vec<usize> {
    let mut has_parent = vec![false; nodes.len()];
    for child in nodes.iter().flat_map(|n| n.children.iter()) {
        if let Some(flag) = has_parent.get_mut(*child) {
            *flag = true;
        }
    }
    (0..nodes.len()).filter(|&i| !has_parent[i]).collect()
}

fn read_primitive(
    mesh: &gltf::Mesh<'_>,
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<Mesh, ModelError> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or(ModelError::MissingPositions {
            mesh: mesh.index(),
            primitive: primitive.index(),
        })?
        .collect();

    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
    let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|tc| tc.into_f32().collect());
    let tangents: Option<Vec<[f32; 4]>> = reader.read_tangents().map(Iterator::collect);

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let mut vertices: Vec<Vertex> = positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let normal = normals
                .as_ref()
                .and_then(|n| n.get(i).copied())
                .unwrap_or([0.0, 1.0, 0.0]);
            let uv = uvs.as_ref().and_then(|t| t.get(i).copied()).unwrap_or([0.0; 2]);
            Vertex::new(position, normal, uv)
        })
        .collect();

    if normals.is_none() {
        compute_normals(&mut vertices, &indices);
    }

    match tangents.filter(|t| t.len() == vertices.len()) {
        Some(tangents) => {
            for (vertex, tangent) in vertices.iter_mut().zip(tangents) {
                let tangent = Vec4::from_array(tangent);
                let normal = Vec3::from_array(vertex.normal);
                let bitangent = normal.cross(tangent.truncate()) * tangent.w;
                vertex.tangent = tangent.truncate().into();
                vertex.bitangent = bitangent.into();
            }
        }
        None => compute_tangents(&mut vertices, &indices),
    }

    Ok(Mesh::from_data(vertices, indices))
}

/// Errors that can occur while importing a model
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("glTF import failed: {0}")]
    Import(#[from] gltf::Error),
    #[error("primitive {primitive} of mesh {mesh} has no positions")]
    MissingPositions { mesh: usize, primitive: usize },
    #[error("model has no scene or nodes to draw")]
    NoScene,
}

#[cfg(test)]
mod tests {
    use super::*;

    // One triangle at (0,0,0) (1,0,0) (0,1,0), u16 indices, no normals or UVs
    const BUFFER: &str = "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAA=";

    fn gltf_json(scenes: &str, nodes: &str) -> String {
        format!(
            r#"{{
            "asset": {{ "version": "2.0" }},
            {scenes}
            "nodes": {nodes},
            "meshes": [{{ "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1 }}] }}],
            "buffers": [{{ "byteLength": 44, "uri": "{BUFFER}" }}],
            "bufferViews": [
                {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
                {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }}
            ],
            "accessors": [
                {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                   "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
                {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
            ]
        }}"#
        )
    }

    const NODES: &str = r#"[
        { "name": "root", "translation": [1.0, 0.0, 0.0], "children": [1] },
        { "name": "child", "scale": [2.0, 2.0, 2.0], "mesh": 0 },
        { "name": "other", "translation": [0.0, 5.0, 0.0], "children": [3] },
        { "name": "leaf", "mesh": 0 }
    ]"#;

    fn load(scenes: &str) -> Model {
        Model::from_slice(gltf_json(scenes, NODES).as_bytes()).unwrap()
    }

    #[test]
    fn test_import_geometry() {
        let model = load(r#""scene": 0, "scenes": [{ "nodes": [0, 2] }],"#);
        assert_eq!(model.meshes.len(), 1);

        let mesh = &model.meshes[0];
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        // Normals were computed from the counter-clockwise winding
        for v in &mesh.vertices {
            assert!((Vec3::from_array(v.normal) - Vec3::Z).length() < 1e-5);
        }
        assert_eq!(model.nodes[0].name.as_deref(), Some("root"));
    }

    #[test]
    fn test_draw_list_composes_transforms() {
        let model = load(r#""scene": 0, "scenes": [{ "nodes": [0, 2] }],"#);
        let root = Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0));
        let draws = model.draw_list(root);

        assert_eq!(draws.len(), 2);
        let (mesh, first) = draws[0];
        assert_eq!(mesh, 0);
        let p = first.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(3.0, -1.0, 0.0)).length() < 1e-5);

        let p = draws[1].1.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(0.0, 4.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_traverse_visits_meshless_nodes_depth_first() {
        let model = load(r#""scene": 0, "scenes": [{ "nodes": [0, 2] }],"#);
        let mut order = Vec::new();
        model.traverse(Mat4::IDENTITY, |node, _| {
            order.push(node.name.clone().unwrap_or_default());
        });
        assert_eq!(order, vec!["root", "child", "other", "leaf"]);
    }

    #[test]
    fn test_roots_without_scene_are_parentless_nodes() {
        let model = load("");
        assert_eq!(model.roots, vec![0, 2]);

        // The first scene is used when no default is set
        let model = load(r#""scenes": [{ "nodes": [2] }],"#);
        assert_eq!(model.roots, vec![2]);
        assert_eq!(model.draw_list(Mat4::IDENTITY).len(), 1);
    }

    #[test]
    fn test_from_mesh() {
        let model = Model::from_mesh(Mesh::quad());
        let draws = model.draw_list(Mat4::from_scale(Vec3::splat(30.0)));
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].0, 0);
        assert_eq!(draws[0].1, Mat4::from_scale(Vec3::splat(30.0)));
    }

    #[test]
    fn test_cyclic_hierarchy_terminates() {
        let mut looped = ModelNode::leaf(Mat4::IDENTITY, SmallVec::from_slice(&[0]));
        looped.children.push(0);
        let model = Model {
            meshes: vec![Mesh::quad()],
            nodes: vec![looped],
            roots: vec![0],
        };
        let mut visits = 0;
        model.traverse(Mat4::IDENTITY, |_, _| visits += 1);
        assert_eq!(visits, model.nodes.len() + 1);
        assert_eq!(model.draw_list(Mat4::IDENTITY).len(), 2);

        // Parent and child listing each other
        let mut parent = ModelNode::leaf(Mat4::from_translation(Vec3::X), SmallVec::new());
        parent.children.push(1);
        let mut child = ModelNode::leaf(Mat4::IDENTITY, SmallVec::from_slice(&[0]));
        child.children.push(0);
        let model = Model {
            meshes: vec![Mesh::quad()],
            nodes: vec![parent, child],
            roots: vec![0],
        };
        let mut visits = 0;
        model.traverse(Mat4::IDENTITY, |_, _| visits += 1);
        assert_eq!(visits, model.nodes.len() + 1);
        assert!(model.draw_list(Mat4::IDENTITY).len() <= model.nodes.len());
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(Model::from_slice(b"not gltf"), Err(ModelError::Import(_))));

        let empty = r#"{ "asset": { "version": "2.0" } }"#;
        assert!(matches!(Model::from_slice(empty.as_bytes()), Err(ModelError::NoScene)));
    }
}
