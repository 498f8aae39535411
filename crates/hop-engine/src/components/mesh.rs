//! Mesh hierarchy composition.
//!
//! An imported node tree is flattened into sub-meshes. Each sub-mesh keeps the
//! accumulated transform of its ancestors; the owner's transform is layered on
//! top of it, never written over it.

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::assets::scene::{AssetError, ImportedMesh, ImportedScene, SceneNode};
use crate::core::transform::Transform;
use crate::renderer::traits::{GpuMeshHandle, Renderer, Vertex};

/// CPU-side geometry of one sub-mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    /// Triangle list.
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Flatten an imported mesh, rejecting anything but triangles.
    pub fn from_imported(mesh: &ImportedMesh) -> Result<Self, AssetError> {
        let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
        for (face, corners) in mesh.faces.iter().enumerate() {
            if corners.len() != 3 {
                return Err(AssetError::NonTriangularFace {
                    mesh: mesh.name.clone(),
                    face,
                    vertex_count: corners.len(),
                });
            }
            if let Some(bad) = corners.iter().find(|&&i| i as usize >= mesh.positions.len()) {
                return Err(AssetError::Parse(format!(
                    "mesh '{}' face {face} references vertex {bad} of {}",
                    mesh.name,
                    mesh.positions.len()
                )));
            }
            indices.extend_from_slice(corners);
        }

        let vertices = mesh
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let n = mesh.normals.get(i).copied().unwrap_or(Vec3::ZERO);
                let uv = mesh.uvs.get(i).copied().unwrap_or(Vec2::ZERO);
                Vertex {
                    position: p.to_array(),
                    normal: n.to_array(),
                    uv: uv.to_array(),
                }
            })
            .collect();

        Ok(Self { vertices, indices })
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices.iter().map(|v| Vec3::from_array(v.position))
    }
}

/// One drawable piece of a [`MeshHierarchy`].
#[derive(Debug)]
pub struct SubMesh {
    pub name: String,
    pub data: MeshData,
    /// Accumulated ancestor transform baked in at import.
    pub ancestor: Transform,
    /// Owner transform composed onto `ancestor`.
    pub world: Transform,
    gpu: Option<GpuMeshHandle>,
}

// A copy owns its own render resources: the handle is not shared, the
// renderer re-uploads from the same CPU data on first draw.
impl Clone for SubMesh {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            data: self.data.clone(),
            ancestor: self.ancestor,
            world: self.world,
            gpu: None,
        }
    }
}

impl SubMesh {
    pub fn new(name: impl Into<String>, data: MeshData, ancestor: Transform) -> Self {
        Self {
            name: name.into(),
            data,
            ancestor,
            world: ancestor,
            gpu: None,
        }
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world.matrix()
    }

    pub fn gpu_handle(&self) -> Option<GpuMeshHandle> {
        self.gpu
    }

    /// Upload geometry if this sub-mesh has no render resources yet.
    pub fn ensure_uploaded(&mut self, renderer: &mut dyn Renderer) -> GpuMeshHandle {
        match self.gpu {
            Some(handle) => handle,
            None => {
                let handle = renderer.upload_mesh(&self.data.vertices, &self.data.indices);
                self.gpu = Some(handle);
                handle
            }
        }
    }
}

/// A model: every sub-mesh of an imported scene plus the owner transform
/// applied on top of them.
#[derive(Debug, Clone, Default)]
pub struct MeshHierarchy {
    submeshes: Vec<SubMesh>,
    owner: Transform,
}

impl MeshHierarchy {
    /// Flatten an imported scene.
    ///
    /// Empty leaf nodes are skipped. A scene without content, without meshes,
    /// or with a non-triangular face is an error; no partial model is returned.
    pub fn from_scene(scene: &ImportedScene) -> Result<Self, AssetError> {
        if scene.root.is_empty() {
            return Err(AssetError::EmptyScene);
        }
        if scene.meshes.is_empty() {
            return Err(AssetError::NoMeshes);
        }
        let mut submeshes = Vec::new();
        collect(scene, &scene.root, Mat4::IDENTITY, &mut submeshes)?;
        if submeshes.is_empty() {
            return Err(AssetError::NoMeshes);
        }
        Ok(Self {
            submeshes,
            owner: Transform::IDENTITY,
        })
    }

    pub fn from_submeshes(submeshes: Vec<SubMesh>) -> Self {
        Self {
            submeshes,
            owner: Transform::IDENTITY,
        }
    }

    // -- Owner transform --

    pub fn set_position(&mut self, position: Vec3) {
        self.owner.position = position;
        self.recompose();
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.owner.set_rotation(rotation);
        self.recompose();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.owner.scale = scale;
        self.recompose();
    }

    /// Replace the whole owner transform and re-derive every sub-mesh.
    pub fn apply(&mut self, owner: &Transform) {
        self.owner = *owner;
        self.recompose();
    }

    pub fn owner(&self) -> &Transform {
        &self.owner
    }

    fn recompose(&mut self) {
        for sub in &mut self.submeshes {
            sub.world = self.owner.compose_onto(&sub.ancestor);
        }
    }

    // -- Access --

    pub fn submeshes(&self) -> &[SubMesh] {
        &self.submeshes
    }

    pub fn submeshes_mut(&mut self) -> &mut [SubMesh] {
        &mut self.submeshes
    }

    pub fn len(&self) -> usize {
        self.submeshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submeshes.is_empty()
    }

    /// Vertex positions of every sub-mesh in the model's local space
    /// (ancestor transforms applied, owner transform not).
    pub fn local_points(&self) -> Vec<Vec3> {
        self.submeshes
            .iter()
            .flat_map(|sub| sub.data.positions().map(move |p| sub.ancestor.local_to_world_point(p)))
            .collect()
    }
}

fn collect(scene: &ImportedScene, node: &SceneNode, parent: Mat4, out: &mut Vec<SubMesh>) -> Result<(), AssetError> {
    let accumulated = parent * node.transform;
    if node.is_empty() {
        log::debug!("skipping empty scene node '{}'", node.name);
        return Ok(());
    }

    let ancestor = Transform::from_matrix(accumulated);
    for &index in &node.meshes {
        let mesh = scene.meshes.get(index).ok_or_else(|| {
            AssetError::Parse(format!(
                "node '{}' references mesh {index} of {}",
                node.name,
                scene.meshes.len()
            ))
        })?;
        out.push(SubMesh::new(mesh.name.clone(), MeshData::from_imported(mesh)?, ancestor));
    }
    for child in &node.children {
        collect(scene, child, accumulated, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::traits::recording::RecordingRenderer;
    use std::f32::consts::FRAC_PI_2;

    fn tri(name: &str) -> ImportedMesh {
        ImportedMesh {
            name: name.into(),
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z; 3],
            uvs: Vec::new(),
            faces: vec![vec![0, 1, 2]],
        }
    }

    fn two_level_scene() -> ImportedScene {
        let child = SceneNode::new("arm")
            .with_transform(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)))
            .with_mesh(1);
        let body = SceneNode::new("body")
            .with_transform(Mat4::from_scale_rotation_translation(
                Vec3::splat(2.0),
                Quat::IDENTITY,
                Vec3::new(1.0, 0.0, 0.0),
            ))
            .with_mesh(0)
            .with_child(child);
        ImportedScene {
            meshes: vec![tri("body"), tri("arm")],
            root: SceneNode::new("root").with_child(body).with_child(SceneNode::new("empty")),
        }
    }

    #[test]
    fn flattens_hierarchy_with_accumulated_transforms() {
        let model = MeshHierarchy::from_scene(&two_level_scene()).unwrap();
        assert_eq!(model.len(), 2);
        let body = &model.submeshes()[0];
        assert_eq!(body.ancestor.position, Vec3::new(1.0, 0.0, 0.0));
        assert!((body.ancestor.scale - Vec3::splat(2.0)).length() < 1e-5);
        // child translation is scaled by the parent
        let arm = &model.submeshes()[1];
        assert!((arm.ancestor.position - Vec3::new(1.0, 4.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn set_position_adds_to_ancestor() {
        let mut model = MeshHierarchy::from_scene(&two_level_scene()).unwrap();
        model.set_position(Vec3::new(0.0, 0.0, 5.0));
        assert!((model.submeshes()[0].world.position - Vec3::new(1.0, 0.0, 5.0)).length() < 1e-5);
        assert!((model.submeshes()[1].world.position - Vec3::new(1.0, 4.0, 5.0)).length() < 1e-5);
        // setting again does not accumulate
        model.set_position(Vec3::new(0.0, 0.0, 5.0));
        assert!((model.submeshes()[0].world.position - Vec3::new(1.0, 0.0, 5.0)).length() < 1e-5);
        assert_eq!(model.submeshes()[0].ancestor.position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn rotation_and_scale_compose() {
        let mut model = MeshHierarchy::from_scene(&two_level_scene()).unwrap();
        let q = Quat::from_rotation_y(FRAC_PI_2);
        model.set_rotation(q);
        model.set_scale(Vec3::new(1.0, 3.0, 1.0));
        let body = &model.submeshes()[0];
        assert!(body.world.rotation.abs_diff_eq(q * body.ancestor.rotation, 1e-5));
        assert!((body.world.scale - Vec3::new(2.0, 6.0, 2.0)).length() < 1e-4);
    }

    #[test]
    fn non_triangular_face_is_rejected() {
        let mut quad = tri("quad");
        quad.positions.push(Vec3::ONE);
        quad.faces = vec![vec![0, 1, 2], vec![0, 1, 2, 3]];
        let err = MeshHierarchy::from_scene(&ImportedScene::single(quad)).unwrap_err();
        assert_eq!(
            err,
            AssetError::NonTriangularFace {
                mesh: "quad".into(),
                face: 1,
                vertex_count: 4
            }
        );
    }

    #[test]
    fn empty_and_meshless_scenes_are_rejected() {
        let empty = ImportedScene {
            meshes: vec![tri("t")],
            root: SceneNode::new("root"),
        };
        assert_eq!(MeshHierarchy::from_scene(&empty).unwrap_err(), AssetError::EmptyScene);

        let meshless = ImportedScene {
            meshes: Vec::new(),
            root: SceneNode::new("root").with_child(SceneNode::new("a").with_child(SceneNode::new("b"))),
        };
        assert_eq!(MeshHierarchy::from_scene(&meshless).unwrap_err(), AssetError::NoMeshes);
    }

    #[test]
    fn dangling_references_are_parse_errors() {
        let scene = ImportedScene {
            meshes: vec![tri("t")],
            root: SceneNode::new("root").with_mesh(3),
        };
        assert!(matches!(MeshHierarchy::from_scene(&scene), Err(AssetError::Parse(_))));

        let mut bad = tri("bad");
        bad.faces = vec![vec![0, 1, 9]];
        assert!(matches!(MeshData::from_imported(&bad), Err(AssetError::Parse(_))));
    }

    #[test]
    fn missing_attributes_default_to_zero() {
        let data = MeshData::from_imported(&tri("t")).unwrap();
        assert_eq!(data.vertices.len(), 3);
        assert_eq!(data.vertices[1].uv, [0.0, 0.0]);
        assert_eq!(data.vertices[1].normal, [0.0, 0.0, 1.0]);
        assert_eq!(data.index_count(), 3);
    }

    #[test]
    fn copies_reupload_their_own_buffers() {
        let mut renderer = RecordingRenderer::default();
        let mut model = MeshHierarchy::from_scene(&two_level_scene()).unwrap();
        let first = model.submeshes_mut()[0].ensure_uploaded(&mut renderer);
        assert_eq!(model.submeshes_mut()[0].ensure_uploaded(&mut renderer), first);

        let mut copy = model.clone();
        assert_eq!(copy.submeshes()[0].gpu_handle(), None);
        assert_eq!(copy.submeshes()[0].data, model.submeshes()[0].data);
        let second = copy.submeshes_mut()[0].ensure_uploaded(&mut renderer);
        assert_ne!(first, second);
    }

    #[test]
    fn local_points_include_ancestor_transform() {
        let model = MeshHierarchy::from_scene(&two_level_scene()).unwrap();
        let points = model.local_points();
        assert_eq!(points.len(), 6);
        // body's Vec3::X vertex, scaled by 2 and shifted by 1
        assert!(points.iter().any(|p| (*p - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5));
    }
}
