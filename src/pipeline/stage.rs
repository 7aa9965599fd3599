// src/pipeline/stage.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info};

use crate::cache::{SignatureStore, compute_signature};
use crate::config::model::StageConfig;
use crate::errors::{ConveyorError, Result};
use crate::fs::{FileSystem, relative_str, walk_files};
use crate::pipeline::command::{CommandTransform, ExtensionRoutes};
use crate::pipeline::transform::{FileObject, Passthrough, Transform};
use crate::types::StageKind;

/// Shared environment a stage runs against.
#[derive(Clone)]
pub struct StageContext {
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub signatures: Arc<Mutex<Box<dyn SignatureStore>>>,
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// One transformation step: source glob -> opaque transform -> destination.
///
/// The glob is re-evaluated against the filesystem on every run; there is no
/// cached file list to go stale.
pub struct PipelineStage {
    label: String,
    src_set: GlobSet,
    src_base: String,
    exclude_set: Option<GlobSet>,
    dest: String,
    kind: StageKind,
    cached: bool,
    transform: Arc<dyn Transform>,
}

impl std::fmt::Debug for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineStage")
            .field("label", &self.label)
            .field("dest", &self.dest)
            .finish_non_exhaustive()
    }
}

impl PipelineStage {
    /// Build a stage from its config table. `index` is the stage's position
    /// within the task, used for labels and signature keys.
    pub fn from_config(cfg: &StageConfig, index: usize) -> Result<Self> {
        let transform: Arc<dyn Transform> = if !cfg.route.is_empty() {
            Arc::new(ExtensionRoutes::from_stage_config(cfg)?)
        } else if let Some(command) = &cfg.command {
            Arc::new(CommandTransform::new(
                command.clone(),
                cfg.fail_pattern.as_deref(),
                cfg.rename_ext.clone(),
            )?)
        } else {
            Arc::new(Passthrough)
        };

        let mut src_builder = GlobSetBuilder::new();
        src_builder.add(Glob::new(&cfg.src)?);
        let src_set = src_builder.build()?;

        let exclude_set = if cfg.exclude.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pat in &cfg.exclude {
                builder.add(Glob::new(pat)?);
            }
            Some(builder.build()?)
        };

        Ok(Self {
            label: format!("stage{index}"),
            src_base: glob_base(&cfg.src),
            src_set,
            exclude_set,
            dest: cfg.dest.clone(),
            kind: cfg.kind,
            cached: cfg.cached,
            transform,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn matches(&self, rel: &str) -> bool {
        if !self.src_set.is_match(rel) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel) {
                return false;
            }
        }
        true
    }

    /// Run the stage to completion: match, read, transform, write.
    ///
    /// A transform error aborts the stage before any output of the failing
    /// batch is written, and surfaces as the error variant matching the
    /// stage's declared kind.
    pub async fn run(&self, task: &str, ctx: &StageContext) -> Result<()> {
        let inputs = self.collect_inputs(ctx)?;

        let (to_process, skipped) = self.partition_cached(task, ctx, inputs)?;
        if skipped > 0 {
            info!(
                task = %task,
                stage = %self.label,
                skipped,
                "skipping unchanged inputs (signature cache hit)"
            );
        }

        if to_process.is_empty() {
            debug!(task = %task, stage = %self.label, "no inputs to transform");
            return Ok(());
        }

        let signatures: Vec<(String, String)> = if self.cached {
            to_process
                .iter()
                .map(|f| {
                    (
                        self.signature_key(task, &f.rel_path),
                        compute_signature(&f.contents),
                    )
                })
                .collect()
        } else {
            Vec::new()
        };

        let count = to_process.len();
        debug!(
            task = %task,
            stage = %self.label,
            transform = %self.transform.name(),
            inputs = count,
            "running stage"
        );

        let outputs = self
            .transform
            .apply(to_process)
            .await
            .map_err(|e| ConveyorError::stage(self.kind, task, &self.label, e.to_string()))?;

        for output in &outputs {
            let target = ctx.root.join(&self.dest).join(&output.rel_path);
            ctx.fs.write(&target, &output.contents)?;
        }

        if self.cached {
            let mut store = ctx
                .signatures
                .lock()
                .map_err(|_| ConveyorError::Config("signature store mutex poisoned".into()))?;
            for (key, signature) in signatures {
                store.save(&key, &signature)?;
            }
        }

        info!(
            task = %task,
            stage = %self.label,
            inputs = count,
            outputs = outputs.len(),
            dest = %self.dest,
            "stage complete"
        );

        Ok(())
    }

    /// Evaluate the source glob freshly and read every match.
    fn collect_inputs(&self, ctx: &StageContext) -> Result<Vec<FileObject>> {
        let walk_root = if self.src_base.is_empty() {
            ctx.root.clone()
        } else {
            ctx.root.join(&self.src_base)
        };

        if !ctx.fs.is_dir(&walk_root) {
            return Ok(Vec::new());
        }

        let mut matched: Vec<(PathBuf, PathBuf)> = Vec::new();
        for path in walk_files(ctx.fs.as_ref(), &walk_root)? {
            let rel = match relative_str(&ctx.root, &path) {
                Some(rel) => rel,
                None => continue,
            };
            if self.matches(&rel) {
                let from_base = self.rel_from_base(&rel);
                matched.push((path, from_base));
            }
        }
        matched.sort_by(|a, b| a.1.cmp(&b.1));

        let mut inputs = Vec::with_capacity(matched.len());
        for (path, from_base) in matched {
            let contents = ctx.fs.read(&path)?;
            inputs.push(FileObject {
                rel_path: from_base,
                contents,
            });
        }
        Ok(inputs)
    }

    /// Path of a matched file relative to the glob base, so
    /// `app/scss/site/main.scss` lands at `<dest>/site/main.css`.
    fn rel_from_base(&self, rel: &str) -> PathBuf {
        if self.src_base.is_empty() {
            return PathBuf::from(rel);
        }
        match rel.strip_prefix(&self.src_base) {
            Some(rest) => {
                let rest = rest.trim_start_matches('/');
                if rest.is_empty() {
                    // The pattern named the file itself.
                    match Path::new(rel).file_name() {
                        Some(name) => PathBuf::from(name),
                        None => PathBuf::from(rel),
                    }
                } else {
                    PathBuf::from(rest)
                }
            }
            None => PathBuf::from(rel),
        }
    }

    fn signature_key(&self, task: &str, rel: &Path) -> String {
        format!("{}/{}/{}", task, self.label, rel.display())
    }

    /// Split inputs into (to-process, skipped-count) based on the signature
    /// store. Only `cached = true` stages consult it.
    fn partition_cached(
        &self,
        task: &str,
        ctx: &StageContext,
        inputs: Vec<FileObject>,
    ) -> Result<(Vec<FileObject>, usize)> {
        if !self.cached {
            return Ok((inputs, 0));
        }

        let store = ctx
            .signatures
            .lock()
            .map_err(|_| ConveyorError::Config("signature store mutex poisoned".into()))?;

        let mut to_process = Vec::new();
        let mut skipped = 0usize;

        for file in inputs {
            let key = self.signature_key(task, &file.rel_path);
            let signature = compute_signature(&file.contents);
            let expected_output = ctx
                .root
                .join(&self.dest)
                .join(self.transform.output_rel(&file.rel_path));

            match store.load(&key)? {
                Some(stored) if stored == signature && ctx.fs.is_file(&expected_output) => {
                    debug!(
                        task = %task,
                        stage = %self.label,
                        input = %file.rel_path.display(),
                        "signature unchanged and output present; skipping"
                    );
                    skipped += 1;
                }
                _ => to_process.push(file),
            }
        }

        Ok((to_process, skipped))
    }
}

/// Literal directory prefix of a glob pattern (`app/scss/**/*.scss` ->
/// `app/scss`). Everything from the first segment containing a meta
/// character onwards is part of the match, not the base.
fn glob_base(pattern: &str) -> String {
    const META: [char; 4] = ['*', '?', '[', '{'];
    let mut segments = Vec::new();
    for segment in pattern.split('/') {
        if segment.chars().any(|c| META.contains(&c)) {
            break;
        }
        segments.push(segment);
    }
    // A pattern with no meta characters names a file; its parent is the base.
    if segments.len() == pattern.split('/').count() {
        segments.pop();
    }
    segments.join("/")
}
