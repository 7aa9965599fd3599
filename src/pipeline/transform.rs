// src/pipeline/transform.rs

//! The uniform pipeline-stage contract for external transformations.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use anyhow::Result;

/// A file flowing through a pipeline stage.
///
/// `rel_path` is relative to the stage's glob base on input and to the
/// stage's destination directory on output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileObject {
    pub rel_path: PathBuf,
    pub contents: Vec<u8>,
}

impl FileObject {
    pub fn new(rel_path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            rel_path: rel_path.into(),
            contents: contents.into(),
        }
    }
}

/// Opaque external transformation applied by a pipeline stage.
///
/// Implementations are free to produce zero, one, or many outputs per input
/// batch. An error aborts the stage; the stage maps it into the error
/// taxonomy using its declared kind, so implementations only need a message.
pub trait Transform: Send + Sync {
    /// Short human-readable name for logs.
    fn name(&self) -> &str;

    /// Apply the transform to a batch of input files.
    fn apply(
        &self,
        files: Vec<FileObject>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FileObject>>> + Send + '_>>;

    /// Expected output path for a given input path.
    ///
    /// Used by cached stages to check whether a skipped input's output
    /// already exists. The default assumes the transform keeps paths intact.
    fn output_rel(&self, input_rel: &Path) -> PathBuf {
        input_rel.to_path_buf()
    }
}

/// Copies inputs through unchanged (the fonts task, unmatched route
/// extensions).
#[derive(Debug, Clone, Default)]
pub struct Passthrough;

impl Transform for Passthrough {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn apply(
        &self,
        files: Vec<FileObject>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FileObject>>> + Send + '_>> {
        Box::pin(async move { Ok(files) })
    }
}

/// Replace the extension of `rel` with `ext`, appending it when the path has
/// no extension.
pub fn with_extension(rel: &Path, ext: &str) -> PathBuf {
    rel.with_extension(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passthrough_keeps_files_intact() {
        let files = vec![
            FileObject::new("fonts/a.woff", b"aaaa".to_vec()),
            FileObject::new("fonts/b.woff2", b"bbbb".to_vec()),
        ];
        let out = Passthrough.apply(files.clone()).await.unwrap();
        assert_eq!(out, files);
    }

    #[test]
    fn extension_replacement() {
        assert_eq!(
            with_extension(Path::new("base/main.scss"), "css"),
            PathBuf::from("base/main.css")
        );
    }
}
