#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub use conveyor_test_utils::{init_tracing, with_timeout};

use conveyor::cache::FileSignatureStore;
use conveyor::fs::mock::MockFileSystem;
use conveyor::fs::{FileSystem, RealFileSystem};
use conveyor::pipeline::stage::StageContext;

/// Context over the in-memory filesystem, rooted at the mock's own root.
///
/// Returns the mock separately so tests can seed files and count writes.
pub fn mock_ctx() -> (StageContext, Arc<MockFileSystem>) {
    let mock = Arc::new(MockFileSystem::new());
    let fs: Arc<dyn FileSystem> = Arc::clone(&mock) as Arc<dyn FileSystem>;
    let root = PathBuf::new();
    let store = FileSignatureStore::new(root.clone(), Arc::clone(&fs));
    let ctx = StageContext {
        root,
        fs,
        signatures: Arc::new(Mutex::new(Box::new(store))),
    };
    (ctx, mock)
}

/// Context over the real filesystem, rooted at `root` (usually a tempdir).
pub fn real_ctx(root: &Path) -> StageContext {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let store = FileSignatureStore::new(root.to_path_buf(), Arc::clone(&fs));
    StageContext {
        root: root.to_path_buf(),
        fs,
        signatures: Arc::new(Mutex::new(Box::new(store))),
    }
}
