use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use conveyor::errors::ConveyorError;
use conveyor::pipeline::transform::{FileObject, Transform};
use conveyor::report::FailureReporter;

/// A reporter that records every `(task, message)` pair instead of notifying.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports.lock().expect("reports lock").clone()
    }

    pub fn reported_tasks(&self) -> Vec<String> {
        self.reports()
            .into_iter()
            .map(|(task, _)| task)
            .collect()
    }
}

impl FailureReporter for RecordingReporter {
    fn task_failed(&self, task: &str, error: &ConveyorError) {
        self.reports
            .lock()
            .expect("reports lock")
            .push((task.to_string(), error.to_string()));
    }
}

/// A transform that records each batch it sees and passes files through.
pub struct RecordingTransform {
    name: String,
    batches: Arc<Mutex<Vec<Vec<PathBuf>>>>,
}

impl RecordingTransform {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            batches: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Relative paths of every batch applied so far.
    pub fn batches(&self) -> Vec<Vec<PathBuf>> {
        self.batches.lock().expect("batches lock").clone()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().expect("batches lock").len()
    }
}

impl Transform for RecordingTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(
        &self,
        files: Vec<FileObject>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<FileObject>>> + Send + '_>> {
        self.batches
            .lock()
            .expect("batches lock")
            .push(files.iter().map(|f| f.rel_path.clone()).collect());
        Box::pin(async move { Ok(files) })
    }
}

/// A transform that always fails with the given message.
pub struct FailingTransform {
    message: String,
}

impl FailingTransform {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl Transform for FailingTransform {
    fn name(&self) -> &str {
        "failing"
    }

    fn apply(
        &self,
        _files: Vec<FileObject>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<FileObject>>> + Send + '_>> {
        let message = self.message.clone();
        Box::pin(async move { Err(anyhow::anyhow!(message)) })
    }
}
