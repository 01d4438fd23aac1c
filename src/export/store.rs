//! Persistent asset store.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::asset::serialize_texture;
use super::texture::Texture;
use super::ExportError;

/// File extensions the catalog tracks.
const CATALOG_EXTENSIONS: &[&str] = &["png", "asset"];

/// Where baked outputs end up.
///
/// Paths are store-relative. `create_asset` stages a texture; it reaches
/// storage on the next `save_if_dirty` for the same path.
pub trait AssetStore: Send + Sync {
    /// Writes raw bytes (an encoded image) straight to `path`.
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), ExportError>;

    /// Registers `texture` as an asset at `path` and marks it dirty.
    fn create_asset(&self, texture: &Texture, path: &Path) -> Result<(), ExportError>;

    /// Flushes the asset at `path` if it has unsaved changes.
    /// Returns whether anything was written.
    fn save_if_dirty(&self, path: &Path) -> Result<bool, ExportError>;

    /// Re-synchronizes the catalog with storage.
    fn refresh(&self) -> Result<(), ExportError>;
}

/// Asset store backed by a directory tree.
pub struct FsAssetStore {
    root: PathBuf,
    dirty: Mutex<HashMap<PathBuf, Vec<u8>>>,
    catalog: Mutex<BTreeSet<PathBuf>>,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dirty: Mutex::new(HashMap::new()),
            catalog: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a store-relative path.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    /// Store-relative paths of every known asset, sorted.
    pub fn assets(&self) -> Vec<PathBuf> {
        self.catalog.lock().iter().cloned().collect()
    }

    pub fn is_dirty(&self, path: &Path) -> bool {
        self.dirty.lock().contains_key(path)
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, bytes)?;
        Ok(())
    }

    fn scan(&self, dir: &Path, found: &mut BTreeSet<PathBuf>) -> Result<(), ExportError> {
        if !dir.is_dir() {
            return Ok(());
        }
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.scan(&path, found)?;
                continue;
            }
            let tracked = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| CATALOG_EXTENSIONS.contains(&e));
            if tracked {
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    found.insert(relative.to_path_buf());
                }
            }
        }
        Ok(())
    }
}

impl AssetStore for FsAssetStore {
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
        self.write_file(path, bytes)?;
        self.catalog.lock().insert(path.to_path_buf());
        Ok(())
    }

    fn create_asset(&self, texture: &Texture, path: &Path) -> Result<(), ExportError> {
        let bytes = serialize_texture(texture)?;
        self.dirty.lock().insert(path.to_path_buf(), bytes);
        self.catalog.lock().insert(path.to_path_buf());
        Ok(())
    }

    fn save_if_dirty(&self, path: &Path) -> Result<bool, ExportError> {
        let staged = self.dirty.lock().remove(path);
        match staged {
            Some(bytes) => {
                self.write_file(path, &bytes)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn refresh(&self) -> Result<(), ExportError> {
        let mut found = BTreeSet::new();
        self.scan(&self.root, &mut found)?;
        found.extend(self.dirty.lock().keys().cloned());
        log::debug!("Asset catalog refreshed: {} entries under {}", found.len(), self.root.display());
        *self.catalog.lock() = found;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::asset::read_texture_asset;
    use crate::noise::DimensionClass;
    use crate::pipeline::OutputDescriptor;
    use tempfile::tempdir;

    fn texture() -> Texture {
        let desc = OutputDescriptor::new(DimensionClass::D2, 2, 2, 1);
        Texture::from_bytes(&desc, &[9; 16]).unwrap()
    }

    #[test]
    fn test_create_asset_is_staged_until_saved() {
        let dir = tempdir().unwrap();
        let store = FsAssetStore::new(dir.path());
        let path = Path::new("Noise/out.asset");

        store.create_asset(&texture(), path).unwrap();
        assert!(store.is_dirty(path));
        assert!(!store.resolve(path).exists());

        assert!(store.save_if_dirty(path).unwrap());
        assert!(!store.is_dirty(path));
        assert_eq!(read_texture_asset(&store.resolve(path)).unwrap(), texture());

        // Nothing left to flush.
        assert!(!store.save_if_dirty(path).unwrap());
    }

    #[test]
    fn test_write_bytes_creates_parents() {
        let dir = tempdir().unwrap();
        let store = FsAssetStore::new(dir.path());
        let path = Path::new("a/b/c.png");

        store.write_bytes(path, b"png").unwrap();
        assert_eq!(fs::read(dir.path().join(path)).unwrap(), b"png");
        assert_eq!(store.assets(), vec![PathBuf::from("a/b/c.png")]);
    }

    #[test]
    fn test_refresh_scans_root() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/one.png"), b"x").unwrap();
        fs::write(dir.path().join("two.asset"), b"x").unwrap();
        fs::write(dir.path().join("ignored.txt"), b"x").unwrap();

        let store = FsAssetStore::new(dir.path());
        store.refresh().unwrap();
        assert_eq!(
            store.assets(),
            vec![PathBuf::from("nested/one.png"), PathBuf::from("two.asset")]
        );
    }
}
