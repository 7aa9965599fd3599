// src/clean.rs

//! Synchronous removal of build artifacts before rebuilds.
//!
//! Patterns are del-style: plain globs select what to remove, patterns
//! prefixed with `!` protect matching paths (and everything under them).
//! A pattern naming a directory removes the directory's contents; a file
//! survives if it, or any of its ancestor directories, is excluded.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;

/// Remove files and directories under `root` matching `patterns`.
///
/// Guarantees no stale artifact matching an include pattern survives, except
/// where an exclusion pattern protects it. Directories emptied by the sweep
/// are removed as well (unless excluded).
pub fn clean(fs: &dyn FileSystem, root: &Path, patterns: &[String]) -> Result<()> {
    let (includes, excludes) = split_patterns(patterns)?;

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    collect_entries(fs, root, root, &mut files, &mut dirs)?;

    for (path, rel) in &files {
        if matches_self_or_ancestor(&includes, rel)
            && !matches_self_or_ancestor(&excludes, rel)
        {
            debug!(path = %rel, "clean: removing file");
            fs.remove_file(path).map_err(crate::errors::ConveyorError::Other)?;
        }
    }

    // Deepest directories first so emptied parents can go too.
    dirs.sort_by_key(|(_, rel)| std::cmp::Reverse(rel.matches('/').count()));
    for (path, rel) in &dirs {
        if matches_self_or_ancestor(&includes, rel)
            && !dir_is_protected(&excludes, rel)
            && fs.is_dir(path)
        {
            let removed = fs
                .remove_dir_if_empty(path)
                .map_err(crate::errors::ConveyorError::Other)?;
            if removed {
                debug!(path = %rel, "clean: removed empty directory");
            }
        }
    }

    Ok(())
}

fn split_patterns(patterns: &[String]) -> Result<(GlobSet, GlobSet)> {
    let mut includes = GlobSetBuilder::new();
    let mut excludes = GlobSetBuilder::new();

    for pattern in patterns {
        match pattern.strip_prefix('!') {
            Some(bare) => {
                excludes.add(Glob::new(bare)?);
            }
            None => {
                includes.add(Glob::new(pattern)?);
            }
        }
    }

    Ok((includes.build()?, excludes.build()?))
}

fn collect_entries(
    fs: &dyn FileSystem,
    root: &Path,
    dir: &Path,
    files: &mut Vec<(PathBuf, String)>,
    dirs: &mut Vec<(PathBuf, String)>,
) -> Result<()> {
    for path in fs
        .read_dir(dir)
        .map_err(crate::errors::ConveyorError::Other)?
    {
        let rel = match crate::fs::relative_str(root, &path) {
            Some(rel) => rel,
            None => continue,
        };
        if fs.is_dir(&path) {
            collect_entries(fs, root, &path, files, dirs)?;
            dirs.push((path, rel));
        } else if fs.is_file(&path) {
            files.push((path, rel));
        }
    }
    Ok(())
}

/// True if the set matches `rel` itself or any ancestor path of `rel`.
///
/// This is what makes `clean = ["app/css"]` remove the files *inside*
/// `app/css`, and `!dist/images` protect the files inside `dist/images`.
fn matches_self_or_ancestor(set: &GlobSet, rel: &str) -> bool {
    if set.is_match(rel) {
        return true;
    }
    let mut end = rel.len();
    while let Some(slash) = rel[..end].rfind('/') {
        if set.is_match(&rel[..slash]) {
            return true;
        }
        end = slash;
    }
    false
}

/// A directory must also survive when it is the *parent* of an excluded path,
/// which `matches_self_or_ancestor` does not cover. Since we only remove
/// empty directories, exclusion of the directory itself or an ancestor is the
/// case that matters; an excluded descendant keeps the directory non-empty.
fn dir_is_protected(excludes: &GlobSet, rel: &str) -> bool {
    matches_self_or_ancestor(excludes, rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn removes_matching_files() {
        let fs = MockFileSystem::new();
        fs.add_file("app/css/main.css", "x");
        fs.add_file("app/index.html", "x");
        fs.add_file("app/scss/main.scss", "x");

        clean(
            &fs,
            Path::new("."),
            &patterns(&["app/css", "app/*.html"]),
        )
        .unwrap();

        assert!(!fs.exists(Path::new("app/css/main.css")));
        assert!(!fs.exists(Path::new("app/index.html")));
        assert!(fs.exists(Path::new("app/scss/main.scss")));
    }

    #[test]
    fn exclusions_protect_subtrees() {
        let fs = MockFileSystem::new();
        fs.add_file("dist/index.html", "x");
        fs.add_file("dist/css/site.css", "x");
        fs.add_file("dist/images/a.png", "x");

        clean(
            &fs,
            Path::new("."),
            &patterns(&["dist/**/*", "!dist/images", "!dist/images/**/*"]),
        )
        .unwrap();

        assert!(fs.exists(Path::new("dist/images/a.png")));
        assert!(!fs.exists(Path::new("dist/index.html")));
        assert!(!fs.exists(Path::new("dist/css/site.css")));
        assert!(!fs.exists(Path::new("dist/css")));
        assert!(fs.exists(Path::new("dist")));
    }

    #[test]
    fn emptied_directories_are_removed() {
        let fs = MockFileSystem::new();
        fs.add_file("out/a/b/deep.txt", "x");

        clean(&fs, Path::new("."), &patterns(&["out/**/*"])).unwrap();

        assert!(!fs.exists(Path::new("out/a/b/deep.txt")));
        assert!(!fs.exists(Path::new("out/a/b")));
        assert!(!fs.exists(Path::new("out/a")));
        assert!(fs.exists(Path::new("out")));
    }
}
