// tests/cache_signatures.rs

//! Signature-cache behaviour of cached stages: a second run over unchanged
//! inputs performs zero filesystem writes, a content change re-processes
//! exactly the changed file, and `clear_cache` forces everything through
//! again.

mod common;
use crate::common::{init_tracing, mock_ctx, with_timeout};

use std::error::Error;

use conveyor::fs::FileSystem;
use conveyor::pipeline::task::Task;
use conveyor_test_utils::builders::{StageConfigBuilder, TaskConfigBuilder};

type TestResult = Result<(), Box<dyn Error>>;

fn cached_copy_task() -> conveyor::config::TaskConfig {
    TaskConfigBuilder::new()
        .stage(
            StageConfigBuilder::new("app/images/**/*", "dist/images")
                .cached()
                .build(),
        )
        .build()
}

#[tokio::test]
async fn second_run_over_unchanged_inputs_writes_nothing() -> TestResult {
    init_tracing();

    let (ctx, mock) = mock_ctx();
    mock.add_file("app/images/logo.png", b"png-bytes".to_vec());
    mock.add_file("app/images/icons/ok.svg", b"<svg/>".to_vec());

    let task = Task::from_config("images".to_string(), &cached_copy_task())?;

    with_timeout(task.run(&ctx)).await?;
    assert!(mock.is_file(std::path::Path::new("dist/images/logo.png")));
    assert!(mock.is_file(std::path::Path::new("dist/images/icons/ok.svg")));

    mock.reset_write_count();
    with_timeout(task.run(&ctx)).await?;
    assert_eq!(
        mock.write_count(),
        0,
        "unchanged inputs must not touch the filesystem"
    );

    Ok(())
}

#[tokio::test]
async fn changed_input_is_reprocessed() -> TestResult {
    init_tracing();

    let (ctx, mock) = mock_ctx();
    mock.add_file("app/images/logo.png", b"v1".to_vec());
    mock.add_file("app/images/banner.png", b"stable".to_vec());

    let task = Task::from_config("images".to_string(), &cached_copy_task())?;
    with_timeout(task.run(&ctx)).await?;

    mock.add_file("app/images/logo.png", b"v2".to_vec());
    mock.reset_write_count();
    with_timeout(task.run(&ctx)).await?;

    // One output write plus the signature file update.
    assert_eq!(mock.write_count(), 2);
    assert_eq!(
        mock.read(std::path::Path::new("dist/images/logo.png"))?,
        b"v2".to_vec()
    );

    Ok(())
}

#[tokio::test]
async fn missing_output_defeats_a_signature_hit() -> TestResult {
    init_tracing();

    let (ctx, mock) = mock_ctx();
    mock.add_file("app/images/logo.png", b"bytes".to_vec());

    let task = Task::from_config("images".to_string(), &cached_copy_task())?;
    with_timeout(task.run(&ctx)).await?;

    // Simulate the destination being wiped between runs.
    mock.remove_file(std::path::Path::new("dist/images/logo.png"))?;
    mock.reset_write_count();

    with_timeout(task.run(&ctx)).await?;
    assert!(mock.is_file(std::path::Path::new("dist/images/logo.png")));

    Ok(())
}

#[tokio::test]
async fn clear_cache_task_forces_full_reprocessing() -> TestResult {
    init_tracing();

    let (ctx, mock) = mock_ctx();
    mock.add_file("app/images/logo.png", b"bytes".to_vec());

    let images = Task::from_config("images".to_string(), &cached_copy_task())?;
    with_timeout(images.run(&ctx)).await?;

    let clear = Task::from_config(
        "cache-clear".to_string(),
        &TaskConfigBuilder::new().clear_cache().build(),
    )?;
    with_timeout(clear.run(&ctx)).await?;

    mock.reset_write_count();
    with_timeout(images.run(&ctx)).await?;
    assert!(
        mock.write_count() > 0,
        "a cleared cache must re-process unchanged inputs"
    );

    Ok(())
}

#[tokio::test]
async fn uncached_stage_always_writes() -> TestResult {
    init_tracing();

    let (ctx, mock) = mock_ctx();
    mock.add_file("app/fonts/site.woff", b"font".to_vec());

    let task = Task::from_config(
        "fonts".to_string(),
        &TaskConfigBuilder::new()
            .stage(StageConfigBuilder::new("app/fonts/**/*", "dist/fonts").build())
            .build(),
    )?;

    with_timeout(task.run(&ctx)).await?;
    mock.reset_write_count();
    with_timeout(task.run(&ctx)).await?;
    assert_eq!(mock.write_count(), 1);

    Ok(())
}
