// tests/clean_patterns.rs

//! Clean tasks against a real directory tree: include globs delete, `!`
//! exclusions protect, and emptied directories are pruned.

mod common;
use crate::common::{init_tracing, real_ctx, with_timeout};

use std::error::Error;
use std::fs;
use std::path::Path;

use conveyor::pipeline::task::Task;
use conveyor_test_utils::builders::TaskConfigBuilder;

type TestResult = Result<(), Box<dyn Error>>;

fn seed(root: &Path, files: &[&str]) -> std::io::Result<()> {
    for file in files {
        let path = root.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, b"x")?;
    }
    Ok(())
}

#[tokio::test]
async fn clean_removes_matches_but_spares_exclusions() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    seed(
        dir.path(),
        &[
            "dist/index.html",
            "dist/css/site.css",
            "dist/images/logo.png",
            "dist/images/icons/ok.svg",
            "app/scss/main.scss",
        ],
    )?;

    let task = Task::from_config(
        "clean-dist".to_string(),
        &TaskConfigBuilder::new()
            .clean(vec!["dist/**/*", "!dist/images", "!dist/images/**"])
            .build(),
    )?;

    let ctx = real_ctx(dir.path());
    with_timeout(task.run(&ctx)).await?;

    // Excluded subtree survives untouched.
    assert!(dir.path().join("dist/images/logo.png").is_file());
    assert!(dir.path().join("dist/images/icons/ok.svg").is_file());

    // Everything else under dist is gone, including the emptied css dir.
    assert!(!dir.path().join("dist/index.html").exists());
    assert!(!dir.path().join("dist/css").exists());

    // Paths outside the pattern are never considered.
    assert!(dir.path().join("app/scss/main.scss").is_file());

    Ok(())
}

#[tokio::test]
async fn clean_on_missing_paths_is_a_no_op() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let task = Task::from_config(
        "clean-dev".to_string(),
        &TaskConfigBuilder::new()
            .clean(vec!["app/css", "app/*.html"])
            .build(),
    )?;

    let ctx = real_ctx(dir.path());
    with_timeout(task.run(&ctx)).await?;

    Ok(())
}

#[tokio::test]
async fn clean_directory_pattern_takes_the_whole_subtree() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    seed(
        dir.path(),
        &["app/css/site.css", "app/css/pages/about.css", "app/index.html"],
    )?;

    let task = Task::from_config(
        "clean-dev".to_string(),
        &TaskConfigBuilder::new()
            .clean(vec!["app/css", "app/*.html"])
            .build(),
    )?;

    let ctx = real_ctx(dir.path());
    with_timeout(task.run(&ctx)).await?;

    assert!(!dir.path().join("app/css").exists());
    assert!(!dir.path().join("app/index.html").exists());
    assert!(dir.path().join("app").is_dir());

    Ok(())
}
