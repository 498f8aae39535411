//! Scene-import contract.
//!
//! Imported scenes are node trees: each node has a local transform, indices
//! into the scene's mesh table, and children. Importers for real file formats
//! live outside the engine; they only have to produce an [`ImportedScene`].

use std::collections::HashMap;
use std::fmt;

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Errors raised while importing or composing model assets.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetError {
    /// No scene is registered under this path.
    NotFound(String),
    /// The path's format is not understood by the importer.
    Unsupported(String),
    /// The scene has no nodes with content.
    EmptyScene,
    /// The scene references no meshes at all.
    NoMeshes,
    /// A face with other than three vertices.
    NonTriangularFace {
        mesh: String,
        face: usize,
        vertex_count: usize,
    },
    /// No prototype with this name in the model library.
    MissingModel(String),
    /// Malformed scene or layout data.
    Parse(String),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::NotFound(path) => write!(f, "scene not found: {path}"),
            AssetError::Unsupported(path) => write!(f, "unsupported scene format: {path}"),
            AssetError::EmptyScene => write!(f, "scene is empty"),
            AssetError::NoMeshes => write!(f, "scene has no meshes"),
            AssetError::NonTriangularFace {
                mesh,
                face,
                vertex_count,
            } => write!(
                f,
                "mesh '{mesh}' face {face} has {vertex_count} vertices, expected 3"
            ),
            AssetError::MissingModel(name) => write!(f, "no model named '{name}'"),
            AssetError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for AssetError {}

impl From<serde_json::Error> for AssetError {
    fn from(err: serde_json::Error) -> Self {
        AssetError::Parse(err.to_string())
    }
}

/// A mesh as delivered by an importer. Faces may have any vertex count;
/// composition rejects everything but triangles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    #[serde(default)]
    pub normals: Vec<Vec3>,
    #[serde(default)]
    pub uvs: Vec<Vec2>,
    pub faces: Vec<Vec<u32>>,
}

/// One node of the imported hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    #[serde(default)]
    pub name: String,
    /// Transform relative to the parent node.
    #[serde(default = "identity")]
    pub transform: Mat4,
    /// Indices into [`ImportedScene::meshes`].
    #[serde(default)]
    pub meshes: Vec<usize>,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh(mut self, mesh: usize) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty() && self.children.is_empty()
    }
}

/// Mesh table plus node hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedScene {
    pub meshes: Vec<ImportedMesh>,
    pub root: SceneNode,
}

impl ImportedScene {
    /// Parse a scene from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Single-mesh scene with the mesh attached to the root.
    pub fn single(mesh: ImportedMesh) -> Self {
        Self {
            meshes: vec![mesh],
            root: SceneNode::new("root").with_mesh(0),
        }
    }
}

/// Source of imported scenes, keyed by asset path.
pub trait SceneImporter {
    fn import(&self, path: &str) -> Result<ImportedScene, AssetError>;
}

/// Importer over scenes registered in memory (procedural geometry, tests,
/// or scenes decoded elsewhere).
#[derive(Debug, Default)]
pub struct MemoryImporter {
    scenes: HashMap<String, ImportedScene>,
}

impl MemoryImporter {
    /// Extensions this importer accepts as scene paths.
    pub const EXTENSIONS: [&'static str; 5] = ["obj", "fbx", "gltf", "glb", "json"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, scene: ImportedScene) {
        self.scenes.insert(path.into(), scene);
    }

    pub fn with_scene(mut self, path: impl Into<String>, scene: ImportedScene) -> Self {
        self.insert(path, scene);
        self
    }
}

impl SceneImporter for MemoryImporter {
    fn import(&self, path: &str) -> Result<ImportedScene, AssetError> {
        let supported = path
            .rsplit_once('.')
            .is_some_and(|(_, ext)| Self::EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if !supported {
            return Err(AssetError::Unsupported(path.to_string()));
        }
        self.scenes
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> ImportedMesh {
        ImportedMesh {
            name: "tri".into(),
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z; 3],
            uvs: vec![Vec2::ZERO, Vec2::X, Vec2::Y],
            faces: vec![vec![0, 1, 2]],
        }
    }

    #[test]
    fn memory_importer_finds_registered_scene() {
        let importer = MemoryImporter::new().with_scene("models/tri.obj", ImportedScene::single(triangle()));
        let scene = importer.import("models/tri.obj").unwrap();
        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.root.meshes, vec![0]);
    }

    #[test]
    fn memory_importer_errors() {
        let importer = MemoryImporter::new();
        assert_eq!(
            importer.import("models/missing.fbx"),
            Err(AssetError::NotFound("models/missing.fbx".into()))
        );
        assert_eq!(
            importer.import("models/readme.txt"),
            Err(AssetError::Unsupported("models/readme.txt".into()))
        );
        assert!(matches!(importer.import("noextension"), Err(AssetError::Unsupported(_))));
    }

    #[test]
    fn scene_from_json_defaults_optional_fields() {
        let json = r#"{
            "meshes": [{ "name": "m", "positions": [[0,0,0],[1,0,0],[0,1,0]], "faces": [[0,1,2]] }],
            "root": { "meshes": [0] }
        }"#;
        let scene = ImportedScene::from_json(json).unwrap();
        assert_eq!(scene.root.transform, Mat4::IDENTITY);
        assert!(scene.meshes[0].normals.is_empty());
        assert!(scene.root.children.is_empty());
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        assert!(matches!(ImportedScene::from_json("{ nope"), Err(AssetError::Parse(_))));
    }

    #[test]
    fn error_messages_name_the_problem() {
        let err = AssetError::NonTriangularFace {
            mesh: "quad".into(),
            face: 2,
            vertex_count: 4,
        };
        assert_eq!(err.to_string(), "mesh 'quad' face 2 has 4 vertices, expected 3");
    }
}
