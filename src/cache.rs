// src/cache.rs

//! Content-signature cache used by `cached = true` stages.
//!
//! A signature is the blake3 hash of a stage input's bytes, keyed by
//! `task/stage/relative-path`. When the stored signature matches and the
//! expected output file already exists, the stage skips that input entirely
//! (zero writes), which is how the image-optimization step avoids
//! reprocessing unchanged images across runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::fs::FileSystem;

/// Relative path (from the project root) to the signature file.
pub const SIGNATURE_FILE_PATH: &str = ".conveyor/signatures";

fn signature_file_path(root: &Path) -> PathBuf {
    root.join(SIGNATURE_FILE_PATH)
}

/// Hash of a stage input's contents.
pub fn compute_signature(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}

/// Abstract storage for stage input signatures.
pub trait SignatureStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, signature: &str) -> Result<()>;
    /// Drop every stored signature (the explicit cache-clear operation).
    fn clear(&mut self) -> Result<()>;
}

/// Stores signatures in `<root>/.conveyor/signatures`, one `key hash` pair
/// per line. Keys may contain spaces (paths), hashes never do, so lines are
/// split at the last space.
pub struct FileSignatureStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileSignatureStore {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { root, fs }
    }

    fn load_all(&self) -> Result<HashMap<String, String>> {
        let path = signature_file_path(&self.root);

        if !self.fs.exists(&path) {
            return Ok(HashMap::new());
        }

        let contents = self
            .fs
            .read_to_string(&path)
            .with_context(|| format!("reading signature file at {:?}", path))?;

        let mut map = HashMap::new();
        for line in contents.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some((key, hash)) = trimmed.rsplit_once(' ') {
                map.insert(key.to_string(), hash.to_string());
            }
        }

        Ok(map)
    }

    fn save_all(&self, map: &HashMap<String, String>) -> Result<()> {
        let path = signature_file_path(&self.root);

        let mut lines: Vec<String> = map
            .iter()
            .map(|(key, hash)| format!("{} {}", key, hash))
            .collect();
        lines.sort();
        let mut contents = lines.join("\n");
        contents.push('\n');

        self.fs
            .write(&path, contents.as_bytes())
            .with_context(|| format!("writing signature file at {:?}", path))
    }
}

impl SignatureStore for FileSignatureStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let map = self.load_all()?;
        Ok(map.get(key).cloned())
    }

    fn save(&mut self, key: &str, signature: &str) -> Result<()> {
        let mut map = self.load_all()?;
        map.insert(key.to_string(), signature.to_string());
        self.save_all(&map)?;
        debug!(key = %key, "stored input signature (file)");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let path = signature_file_path(&self.root);
        if self.fs.exists(&path) {
            self.fs.remove_file(&path)?;
            info!("cleared signature cache");
        }
        Ok(())
    }
}

/// Stores signatures in memory only (lost on restart). Used in tests and
/// useful when a project does not want cache state on disk.
#[derive(Default)]
pub struct MemorySignatureStore {
    map: HashMap<String, String>,
}

impl MemorySignatureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignatureStore for MemorySignatureStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn save(&mut self, key: &str, signature: &str) -> Result<()> {
        self.map.insert(key.to_string(), signature.to_string());
        debug!(key = %key, "stored input signature (memory)");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if !self.map.is_empty() {
            self.map.clear();
            info!("cleared signature cache");
        }
        Ok(())
    }
}
