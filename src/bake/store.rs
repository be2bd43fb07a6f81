//! Persistence of baked assets

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::baker::BakedAsset;
use super::mesh::BakedMesh;
use crate::core::error::Error;
use crate::core::types::Result;

pub const MESH_DIR: &str = "Meshes";
pub const MATERIAL_DIR: &str = "Materials";
pub const PREFAB_DIR: &str = "Prefabs";
const INDEX_FILENAME: &str = "index.json";

/// Receives finished bakes
pub trait AssetStore {
    fn store(&mut self, asset: &BakedAsset) -> Result<()>;
}

/// Keeps bakes in memory
#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    pub assets: Vec<BakedAsset>,
}

impl AssetStore for MemoryAssetStore {
    fn store(&mut self, asset: &BakedAsset) -> Result<()> {
        self.assets.push(asset.clone());
        Ok(())
    }
}

/// One baked asset in the index
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub vertex_count: usize,
    pub triangle_count: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AssetIndex {
    assets: Vec<IndexEntry>,
}

/// Writes each bake as JSON files under a root directory:
/// `Meshes/<id>.mesh.json`, `Materials/<id>.mat.json` and
/// `Prefabs/<id>.prefab.json`, plus an `index.json` listing every id.
pub struct DirectoryAssetStore {
    root: PathBuf,
    index: AssetIndex,
}

impl DirectoryAssetStore {
    /// Open `root`, creating it if needed and loading any existing index
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let index_path = root.join(INDEX_FILENAME);
        let index = if index_path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&index_path)?)?
        } else {
            std::fs::create_dir_all(&root)?;
            AssetIndex::default()
        };

        log::info!("Asset store at {:?} ({} assets)", root, index.assets.len());
        Ok(Self { root, index })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.index.assets
    }

    pub fn mesh_path(&self, id: &str) -> PathBuf {
        self.root.join(MESH_DIR).join(format!("{}.mesh.json", id))
    }

    pub fn material_path(&self, id: &str) -> PathBuf {
        self.root.join(MATERIAL_DIR).join(format!("{}.mat.json", id))
    }

    pub fn prefab_path(&self, id: &str) -> PathBuf {
        self.root.join(PREFAB_DIR).join(format!("{}.prefab.json", id))
    }

    /// Read a stored mesh back
    pub fn load_mesh(&self, id: &str) -> Result<BakedMesh> {
        let path = self.mesh_path(id);
        if !path.exists() {
            return Err(Error::Asset(format!("mesh {} not found", id)));
        }
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    fn save_index(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.index)?;
        std::fs::write(self.root.join(INDEX_FILENAME), json)?;
        Ok(())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// Best-effort removal of files from a bake that did not complete
fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("Failed to remove partial asset file {:?}: {}", path, e);
        }
    }
}

impl DirectoryAssetStore {
    /// Write the three asset files. Either all of them land or none do.
    fn write_files(&self, asset: &BakedAsset) -> Result<Vec<PathBuf>> {
        let files = [
            (self.mesh_path(&asset.id), serde_json::to_string_pretty(&asset.mesh)?),
            (self.material_path(&asset.id), serde_json::to_string_pretty(&asset.material)?),
            (self.prefab_path(&asset.id), serde_json::to_string_pretty(&asset.entity)?),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (path, json) in files {
            if let Err(e) = write_file(&path, &json) {
                remove_files(&written);
                return Err(e);
            }
            written.push(path);
        }
        Ok(written)
    }
}

impl AssetStore for DirectoryAssetStore {
    fn store(&mut self, asset: &BakedAsset) -> Result<()> {
        if self.index.assets.iter().any(|e| e.id == asset.id) {
            return Err(Error::Asset(format!("asset {} already exists", asset.id)));
        }

        let written = self.write_files(asset)?;

        self.index.assets.push(IndexEntry {
            id: asset.id.clone(),
            vertex_count: asset.mesh.vertex_count(),
            triangle_count: asset.mesh.triangle_count(),
        });
        if let Err(e) = self.save_index() {
            self.index.assets.pop();
            remove_files(&written);
            return Err(e);
        }

        log::debug!("Stored asset {} under {:?}", asset.id, self.root);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bake::identity::SequentialIds;
    use crate::bake::MeshBaker;
    use crate::generator::config::BakeSettings;
    use crate::render::buffer::SurfaceVertex;

    fn sample_asset(baker: &mut MeshBaker) -> BakedAsset {
        let vertices = [
            SurfaceVertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.4; 3]),
            SurfaceVertex::new([0.25, 0.0, 0.0], [0.0, 0.0, 1.0], [0.4; 3]),
            SurfaceVertex::new([0.0, 0.25, 0.0], [0.0, 0.0, 1.0], [0.4; 3]),
        ];
        baker.build(&vertices, 2.0)
    }

    fn baker() -> MeshBaker {
        MeshBaker::new(Box::new(SequentialIds::new("asset")), BakeSettings::default())
    }

    #[test]
    fn test_writes_three_files_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryAssetStore::open(dir.path().join("assets")).unwrap();
        let asset = sample_asset(&mut baker());

        store.store(&asset).unwrap();

        assert!(store.mesh_path(&asset.id).is_file());
        assert!(store.material_path(&asset.id).is_file());
        assert!(store.prefab_path(&asset.id).is_file());
        assert!(dir.path().join("assets").join("Meshes").join("asset0000.mesh.json").is_file());
        assert_eq!(store.entries().len(), 1);
        assert_eq!(store.entries()[0].triangle_count, 1);
    }

    #[test]
    fn test_load_mesh_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryAssetStore::open(dir.path()).unwrap();
        let asset = sample_asset(&mut baker());
        store.store(&asset).unwrap();

        let loaded = store.load_mesh(&asset.id).unwrap();
        assert_eq!(loaded, asset.mesh);
    }

    #[test]
    fn test_index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut baker = baker();
        {
            let mut store = DirectoryAssetStore::open(dir.path()).unwrap();
            store.store(&sample_asset(&mut baker)).unwrap();
            store.store(&sample_asset(&mut baker)).unwrap();
        }

        let store = DirectoryAssetStore::open(dir.path()).unwrap();
        let ids: Vec<&str> = store.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["asset0000", "asset0001"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryAssetStore::open(dir.path()).unwrap();
        let asset = sample_asset(&mut baker());
        store.store(&asset).unwrap();
        assert!(matches!(store.store(&asset), Err(Error::Asset(_))));
    }

    #[test]
    fn test_failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryAssetStore::open(dir.path()).unwrap();
        let asset = sample_asset(&mut baker());

        // A directory where the material file should go makes that write fail
        std::fs::create_dir_all(store.material_path(&asset.id)).unwrap();

        assert!(matches!(store.store(&asset), Err(Error::Io(_))));
        assert!(!store.mesh_path(&asset.id).exists());
        assert!(!store.prefab_path(&asset.id).exists());
        assert!(store.entries().is_empty());

        std::fs::remove_dir(store.material_path(&asset.id)).unwrap();
        store.store(&asset).unwrap();
        assert_eq!(store.entries().len(), 1);
        assert!(store.mesh_path(&asset.id).is_file());
    }

    #[test]
    fn test_missing_mesh() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryAssetStore::open(dir.path()).unwrap();
        assert!(matches!(store.load_mesh("nope"), Err(Error::Asset(_))));
    }
}
