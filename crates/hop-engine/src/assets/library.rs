use std::collections::HashMap;

use super::scene::{AssetError, ImportedScene, SceneImporter};
use crate::components::mesh::MeshHierarchy;

/// Named model prototypes. Levels instantiate copies; each copy uploads its
/// own GPU buffers on first draw.
#[derive(Debug, Default)]
pub struct ModelLibrary {
    models: HashMap<String, MeshHierarchy>,
}

impl ModelLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import `path` and register it as `name`.
    ///
    /// On failure the error is logged and returned; nothing is registered.
    pub fn load(&mut self, importer: &dyn SceneImporter, name: &str, path: &str) -> Result<(), AssetError> {
        let model = importer
            .import(path)
            .and_then(|scene| MeshHierarchy::from_scene(&scene))
            .inspect_err(|err| log::warn!("failed to load model '{name}' from {path}: {err}"))?;
        log::debug!("loaded model '{name}' ({} sub-meshes)", model.len());
        self.models.insert(name.to_string(), model);
        Ok(())
    }

    /// Register an already imported scene.
    pub fn insert_scene(&mut self, name: &str, scene: &ImportedScene) -> Result<(), AssetError> {
        let model = MeshHierarchy::from_scene(scene)?;
        self.models.insert(name.to_string(), model);
        Ok(())
    }

    /// A fresh copy of the prototype registered as `name`.
    pub fn instantiate(&self, name: &str) -> Result<MeshHierarchy, AssetError> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::MissingModel(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&MeshHierarchy> {
        self.models.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
