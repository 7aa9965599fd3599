// src/pipeline/command.rs

//! External commands as pipeline transforms.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::model::StageConfig;
use crate::pipeline::transform::{FileObject, Transform, with_extension};

/// Build a shell command appropriate for the platform.
pub fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    }
}

/// Pipes each input file through an external command: contents on stdin,
/// transformed contents from stdout.
///
/// The command is the entire transformation; this wrapper only moves bytes
/// and interprets failure:
/// - non-zero exit fails the stage, with stderr in the message;
/// - a `fail_pattern` match on stdout/stderr fails the stage even on exit
///   zero (linters that print violations but exit cleanly).
pub struct CommandTransform {
    name: String,
    command: String,
    fail_pattern: Option<Regex>,
    rename_ext: Option<String>,
}

impl CommandTransform {
    pub fn new(
        command: impl Into<String>,
        fail_pattern: Option<&str>,
        rename_ext: Option<String>,
    ) -> Result<Self> {
        let command = command.into();
        let fail_pattern = fail_pattern.map(Regex::new).transpose()?;
        let name = command
            .split_whitespace()
            .next()
            .unwrap_or("command")
            .to_string();
        Ok(Self {
            name,
            command,
            fail_pattern,
            rename_ext,
        })
    }

    async fn run_one(&self, file: FileObject) -> Result<FileObject> {
        let FileObject { rel_path, contents } = file;

        debug!(
            command = %self.command,
            input = %rel_path.display(),
            "piping file through external transform"
        );

        let mut child = shell_command(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning transform command '{}'", self.command))?;

        let mut stdin = child
            .stdin
            .take()
            .context("transform command has no stdin handle")?;

        // Feed stdin from a separate task while the output is drained below;
        // a streaming command fills the stdout pipe long before a large input
        // is fully written, so writer and reader must run concurrently.
        // Dropping stdin afterwards lets the command see EOF and finish.
        let writer = tokio::spawn(async move { stdin.write_all(&contents).await });

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("waiting for transform command '{}'", self.command))?;

        let write_result = writer.await.context("transform stdin writer panicked")?;

        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            bail!(
                "'{}' failed on {:?} (exit {}): {}",
                self.command,
                rel_path,
                code,
                stderr.trim()
            );
        }

        // A command that exits zero after closing its stdin early (read only
        // what it needed) is a success; any other write failure is not.
        if let Err(err) = write_result {
            if err.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(err)
                    .with_context(|| format!("writing {:?} to transform stdin", rel_path));
            }
        }

        if let Some(pattern) = &self.fail_pattern {
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines().chain(stderr.lines()) {
                if pattern.is_match(line) {
                    bail!("'{}' reported on {:?}: {}", self.command, rel_path, line);
                }
            }
        }

        Ok(FileObject {
            rel_path: self.output_rel(&rel_path),
            contents: output.stdout,
        })
    }
}

impl Transform for CommandTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(
        &self,
        files: Vec<FileObject>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FileObject>>> + Send + '_>> {
        Box::pin(async move {
            let mut outputs = Vec::with_capacity(files.len());
            for file in files {
                outputs.push(self.run_one(file).await?);
            }
            Ok(outputs)
        })
    }

    fn output_rel(&self, input_rel: &Path) -> PathBuf {
        match &self.rename_ext {
            Some(ext) => with_extension(input_rel, ext),
            None => input_rel.to_path_buf(),
        }
    }
}

/// Routes files to a command by extension; unmatched extensions pass through
/// unchanged. This is the conditional stage of the bundling step (minify
/// `.js`, compress `.css`, copy the rest).
pub struct ExtensionRoutes {
    routes: BTreeMap<String, CommandTransform>,
}

impl ExtensionRoutes {
    pub fn from_stage_config(cfg: &StageConfig) -> Result<Self> {
        let mut routes = BTreeMap::new();
        for (ext, route) in &cfg.route {
            let transform = CommandTransform::new(
                route.command.clone(),
                cfg.fail_pattern.as_deref(),
                route.rename_ext.clone(),
            )?;
            routes.insert(ext.trim_start_matches('.').to_string(), transform);
        }
        Ok(Self { routes })
    }

    fn route_for(&self, rel: &Path) -> Option<&CommandTransform> {
        let ext = rel.extension()?.to_str()?;
        self.routes.get(ext)
    }
}

impl Transform for ExtensionRoutes {
    fn name(&self) -> &str {
        "route"
    }

    fn apply(
        &self,
        files: Vec<FileObject>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FileObject>>> + Send + '_>> {
        Box::pin(async move {
            let mut outputs = Vec::with_capacity(files.len());
            for file in files {
                match self.route_for(&file.rel_path) {
                    Some(transform) => outputs.push(transform.run_one(file).await?),
                    None => outputs.push(file),
                }
            }
            Ok(outputs)
        })
    }

    fn output_rel(&self, input_rel: &Path) -> PathBuf {
        match self.route_for(input_rel) {
            Some(transform) => transform.output_rel(input_rel),
            None => input_rel.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[cfg(unix)]
    async fn stdin_to_stdout_round_trip() {
        let t = CommandTransform::new("tr a-z A-Z", None, None).unwrap();
        let out = t
            .apply(vec![FileObject::new("x.txt", b"hello".to_vec())])
            .await
            .unwrap();
        assert_eq!(out[0].contents, b"HELLO");
        assert_eq!(out[0].rel_path, PathBuf::from("x.txt"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn nonzero_exit_is_an_error() {
        let t = CommandTransform::new("false", None, None).unwrap();
        let err = t
            .apply(vec![FileObject::new("x.txt", b"".to_vec())])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exit 1"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn fail_pattern_fails_clean_exit() {
        let t = CommandTransform::new("echo 'warning: 2 errors found'", Some("error"), None)
            .unwrap();
        let err = t
            .apply(vec![FileObject::new("x.js", b"".to_vec())])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("errors found"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn input_larger_than_the_pipe_buffer_streams_through() {
        let contents: Vec<u8> = (0..1024 * 1024).map(|i| (i % 251) as u8).collect();
        let t = CommandTransform::new("cat", None, None).unwrap();
        let out = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            t.apply(vec![FileObject::new("big.bin", contents.clone())]),
        )
        .await
        .expect("transform stalled on a large input")
        .unwrap();
        assert_eq!(out[0].contents, contents);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn command_may_close_stdin_early() {
        let contents: Vec<u8> = vec![b'a'; 1024 * 1024];
        let t = CommandTransform::new("head -c 16", None, None).unwrap();
        let out = t
            .apply(vec![FileObject::new("big.txt", contents)])
            .await
            .unwrap();
        assert_eq!(out[0].contents, vec![b'a'; 16]);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn rename_ext_applies_to_output() {
        let t = CommandTransform::new("cat", None, Some("css".to_string())).unwrap();
        let out = t
            .apply(vec![FileObject::new("base/main.scss", b"x".to_vec())])
            .await
            .unwrap();
        assert_eq!(out[0].rel_path, PathBuf::from("base/main.css"));
    }
}
