// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory filesystem for tests.
///
/// Tracks how many `write` calls were made so tests can assert cache-hit
/// behaviour ("zero writes on the second run").
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    writes: Arc<AtomicUsize>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("."), MockEntry::Dir);
        Self {
            entries: Arc::new(Mutex::new(entries)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Seed a file without counting it as a pipeline write.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries.lock().unwrap();
        ensure_parents(&mut entries, &path);
        entries.insert(path, MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries.lock().unwrap();
        ensure_parents(&mut entries, &path);
        entries.insert(path, MockEntry::Dir);
    }

    /// Number of `FileSystem::write` calls made so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reset_write_count(&self) {
        self.writes.store(0, Ordering::SeqCst);
    }

    /// All file paths currently present, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let entries = self.entries.lock().unwrap();
        let mut paths: Vec<PathBuf> = entries
            .iter()
            .filter_map(|(p, e)| matches!(e, MockEntry::File(_)).then(|| p.clone()))
            .collect();
        paths.sort();
        paths
    }
}

/// Parent of a relative path, mapping the empty parent to `"."` so that
/// top-level entries are children of the root.
fn logical_parent(path: &Path) -> Option<&Path> {
    if path == Path::new(".") {
        return None;
    }
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Some(Path::new(".")),
        other => other,
    }
}

fn ensure_parents(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let mut current = path.parent();
    while let Some(parent) = current {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if entries.contains_key(parent) {
            break;
        }
        entries.insert(parent.to_path_buf(), MockEntry::Dir);
        if parent == Path::new(".") {
            break;
        }
        current = parent.parent();
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir) => Err(anyhow!("is a directory: {:?}", path)),
            None => Err(anyhow!("file not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("invalid UTF-8 in {:?}: {}", path, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries.lock().unwrap().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(
            self.entries.lock().unwrap().get(path),
            Some(MockEntry::File(_))
        )
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entries.lock().unwrap().get(path), Some(MockEntry::Dir))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.entries.lock().unwrap();
        if !matches!(entries.get(path), Some(MockEntry::Dir)) {
            return Err(anyhow!("not a directory: {:?}", path));
        }
        let mut children: Vec<PathBuf> = entries
            .keys()
            .filter(|p| logical_parent(p) == Some(path))
            .cloned()
            .collect();
        children.sort();
        Ok(children)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(path) {
            Some(MockEntry::File(_)) => Ok(()),
            Some(MockEntry::Dir) => {
                entries.insert(path.to_path_buf(), MockEntry::Dir);
                Err(anyhow!("is a directory: {:?}", path))
            }
            None => Err(anyhow!("file not found: {:?}", path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if !matches!(entries.get(path), Some(MockEntry::Dir)) {
            return Err(anyhow!("not a directory: {:?}", path));
        }
        entries.retain(|p, _| p != path && !p.starts_with(path));
        Ok(())
    }

    fn remove_dir_if_empty(&self, path: &Path) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap();
        if !matches!(entries.get(path), Some(MockEntry::Dir)) {
            return Err(anyhow!("not a directory: {:?}", path));
        }
        let has_children = entries.keys().any(|p| logical_parent(p) == Some(path));
        if !has_children {
            entries.remove(path);
        }
        Ok(!has_children)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        Ok(path.to_path_buf())
    }
}
