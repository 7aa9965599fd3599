// tests/stage_transforms.rs

//! Pipeline stages end to end: command transforms over stdin/stdout,
//! extension renaming, per-extension routing with passthrough, fail
//! patterns, and error taxonomy mapping.

#![cfg(unix)]

mod common;
use crate::common::{init_tracing, mock_ctx, with_timeout};

use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;

use conveyor::config::{RouteConfig, StageConfig};
use conveyor::errors::ConveyorError;
use conveyor::fs::FileSystem;
use conveyor::pipeline::task::Task;
use conveyor::types::StageKind;
use conveyor_test_utils::builders::{StageConfigBuilder, TaskConfigBuilder};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn command_stage_transforms_and_renames() -> TestResult {
    init_tracing();

    let (ctx, mock) = mock_ctx();
    mock.add_file("app/scss/main.scss", b"color red".to_vec());
    mock.add_file("app/scss/pages/about.scss", b"color red".to_vec());

    let task = Task::from_config(
        "sass".to_string(),
        &TaskConfigBuilder::new()
            .stage(
                StageConfigBuilder::new("app/scss/**/*.scss", "app/css")
                    .command("tr a-z A-Z")
                    .kind(StageKind::Compile)
                    .rename_ext("css")
                    .build(),
            )
            .build(),
    )?;

    with_timeout(task.run(&ctx)).await?;

    assert_eq!(
        mock.read(Path::new("app/css/main.css"))?,
        b"COLOR RED".to_vec()
    );
    // Directory structure below the glob base is preserved.
    assert_eq!(
        mock.read(Path::new("app/css/pages/about.css"))?,
        b"COLOR RED".to_vec()
    );

    Ok(())
}

#[tokio::test]
async fn failing_command_maps_to_declared_kind() -> TestResult {
    init_tracing();

    let (ctx, mock) = mock_ctx();
    mock.add_file("app/scss/bad.scss", b"oops".to_vec());

    let task = Task::from_config(
        "sass".to_string(),
        &TaskConfigBuilder::new()
            .stage(
                StageConfigBuilder::new("app/scss/**/*.scss", "app/css")
                    .command("false")
                    .kind(StageKind::Compile)
                    .build(),
            )
            .build(),
    )?;

    let result = with_timeout(task.run(&ctx)).await;
    assert!(matches!(result, Err(ConveyorError::Compile { .. })));

    // A failed stage writes nothing.
    assert!(!mock.exists(Path::new("app/css/bad.scss")));

    Ok(())
}

#[tokio::test]
async fn fail_pattern_fails_a_zero_exit_command() -> TestResult {
    init_tracing();

    let (ctx, mock) = mock_ctx();
    mock.add_file("app/js/site.js", b"var x = 1".to_vec());

    // `cat` exits zero; the pattern still fails the stage because the
    // output contains the offending text.
    let task = Task::from_config(
        "lint-js".to_string(),
        &TaskConfigBuilder::new()
            .stage(
                StageConfigBuilder::new("app/js/**/*.js", "app/js-checked")
                    .command("cat")
                    .kind(StageKind::Lint)
                    .fail_pattern("var ")
                    .build(),
            )
            .build(),
    )?;

    let result = with_timeout(task.run(&ctx)).await;
    assert!(matches!(result, Err(ConveyorError::Lint { .. })));
    assert!(!mock.exists(Path::new("app/js-checked/site.js")));

    Ok(())
}

#[tokio::test]
async fn routes_dispatch_by_extension_and_pass_the_rest_through() -> TestResult {
    init_tracing();

    let (ctx, mock) = mock_ctx();
    mock.add_file("app/pages/index.tpl", b"hello".to_vec());
    mock.add_file("app/pages/robots.txt", b"allow".to_vec());

    let mut route = BTreeMap::new();
    route.insert(
        "tpl".to_string(),
        RouteConfig {
            command: "tr a-z A-Z".to_string(),
            rename_ext: Some("html".to_string()),
        },
    );

    let stage = StageConfig {
        src: "app/pages/**/*".to_string(),
        exclude: vec![],
        dest: "dist".to_string(),
        command: None,
        kind: StageKind::Render,
        fail_pattern: None,
        rename_ext: None,
        route,
        cached: false,
    };

    let task = Task::from_config(
        "pages".to_string(),
        &TaskConfigBuilder::new().stage(stage).build(),
    )?;

    with_timeout(task.run(&ctx)).await?;

    assert_eq!(mock.read(Path::new("dist/index.html"))?, b"HELLO".to_vec());
    // Unrouted extension copied through unchanged.
    assert_eq!(mock.read(Path::new("dist/robots.txt"))?, b"allow".to_vec());

    Ok(())
}

#[tokio::test]
async fn excluded_sources_are_not_processed() -> TestResult {
    init_tracing();

    let (ctx, mock) = mock_ctx();
    mock.add_file("app/scss/main.scss", b"a".to_vec());
    mock.add_file("app/scss/vendor/lib.scss", b"b".to_vec());

    let task = Task::from_config(
        "sass".to_string(),
        &TaskConfigBuilder::new()
            .stage(
                StageConfigBuilder::new("app/scss/**/*.scss", "app/css")
                    .exclude("app/scss/vendor/**")
                    .rename_ext("css")
                    .command("cat")
                    .build(),
            )
            .build(),
    )?;

    with_timeout(task.run(&ctx)).await?;

    assert!(mock.is_file(Path::new("app/css/main.css")));
    assert!(!mock.exists(Path::new("app/css/vendor/lib.css")));

    Ok(())
}

#[tokio::test]
async fn stages_within_a_task_run_in_order() -> TestResult {
    init_tracing();

    let (ctx, mock) = mock_ctx();
    mock.add_file("app/in/data.txt", b"abc".to_vec());

    // Stage 2 consumes stage 1's output directory.
    let task = Task::from_config(
        "two-step".to_string(),
        &TaskConfigBuilder::new()
            .stage(
                StageConfigBuilder::new("app/in/**/*.txt", "app/mid")
                    .command("tr ab xy")
                    .build(),
            )
            .stage(
                StageConfigBuilder::new("app/mid/**/*.txt", "app/out")
                    .command("tr c z")
                    .build(),
            )
            .build(),
    )?;

    with_timeout(task.run(&ctx)).await?;

    assert_eq!(mock.read(Path::new("app/out/data.txt"))?, b"xyz".to_vec());

    Ok(())
}

#[tokio::test]
async fn rerun_on_unchanged_inputs_reproduces_the_output_tree() -> TestResult {
    init_tracing();

    let (ctx, mock) = mock_ctx();
    mock.add_file("app/scss/main.scss", b"color red".to_vec());
    mock.add_file("app/scss/pages/about.scss", b"margin zero".to_vec());

    let task = Task::from_config(
        "sass".to_string(),
        &TaskConfigBuilder::new()
            .stage(
                StageConfigBuilder::new("app/scss/**/*.scss", "app/css")
                    .command("tr a-z A-Z")
                    .kind(StageKind::Compile)
                    .rename_ext("css")
                    .build(),
            )
            .build(),
    )?;

    let dest_tree = |mock: &conveyor::fs::mock::MockFileSystem| {
        let mut tree = std::collections::BTreeMap::new();
        for path in mock.file_paths() {
            if path.starts_with("app/css") {
                tree.insert(path.clone(), mock.read(&path).expect("artifact readable"));
            }
        }
        tree
    };

    with_timeout(task.run(&ctx)).await?;
    let first = dest_tree(&mock);

    with_timeout(task.run(&ctx)).await?;
    let second = dest_tree(&mock);

    // One artifact per source file, byte-identical across runs.
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(
        first.get(Path::new("app/css/main.css")),
        Some(&b"COLOR RED".to_vec())
    );
    assert_eq!(
        first.get(Path::new("app/css/pages/about.css")),
        Some(&b"MARGIN ZERO".to_vec())
    );

    Ok(())
}

#[tokio::test]
async fn empty_glob_match_is_a_successful_no_op() -> TestResult {
    init_tracing();

    let (ctx, mock) = mock_ctx();

    let task = Task::from_config(
        "sass".to_string(),
        &TaskConfigBuilder::new()
            .stage(
                StageConfigBuilder::new("app/scss/**/*.scss", "app/css")
                    .command("cat")
                    .build(),
            )
            .build(),
    )?;

    with_timeout(task.run(&ctx)).await?;
    assert_eq!(mock.write_count(), 0);

    Ok(())
}
