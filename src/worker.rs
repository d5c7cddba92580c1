//! Background conversion worker.
//!
//! A [`Converter`] runs at most one conversion at a time. [`Converter::start`]
//! returns immediately with a [`ConversionHandle`]; the conversion itself runs
//! as a Tokio task and reports back over an unbounded channel:
//!
//! ```text
//! start() ──► Running ──► Progress(p)* ──► Success(path) │ Failure(msg)
//!                                              │
//!                              state = Succeeded │ Failed
//! ```
//!
//! The worker state is updated *before* the terminal event is sent, so an
//! observer that reacts to `Success`/`Failure` by starting the next conversion
//! never races the previous one. Exactly one terminal event is sent per
//! conversion, after which the channel closes.
//!
//! Presentation shells (a CLI, a GUI event loop) only ever consume
//! [`ConversionOutcome`]s; they never touch the pipeline directly.

use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::pipeline::{blocking, pdf, table};
use crate::progress::{ConversionOutcome, ProgressReporter};
use crate::request::{ConversionRequest, TargetFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

static NEXT_CONVERSION_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of the worker as a whole (not of a single handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Nothing has been started yet.
    Idle,
    /// A conversion is in flight; further starts are rejected.
    Running,
    /// The last conversion ended with `Success`.
    Succeeded,
    /// The last conversion ended with `Failure`.
    Failed,
}

impl WorkerState {
    pub fn is_running(self) -> bool {
        self == WorkerState::Running
    }
}

/// Runs conversions in the background, one at a time.
///
/// Clones share the same state: a conversion started through one clone
/// blocks starts through every other.
#[derive(Debug, Clone)]
pub struct Converter {
    config: Arc<ConverterConfig>,
    state: Arc<Mutex<WorkerState>>,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConverterConfig::default())
    }
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(WorkerState::Idle)),
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Current worker state.
    pub fn state(&self) -> WorkerState {
        *lock(&self.state)
    }

    /// Begin converting `request` in the background.
    ///
    /// Must be called from within a Tokio runtime. Returns
    /// [`ConvertError::ConversionInProgress`] without touching the running
    /// conversion if one is already in flight. Every other failure (missing
    /// source, bad document, tool errors, write errors) arrives later as a
    /// [`ConversionOutcome::Failure`] on the returned handle.
    pub fn start(&self, request: ConversionRequest) -> Result<ConversionHandle, ConvertError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ConvertError::Internal(format!("Converter::start needs a Tokio runtime: {e}"))
        })?;

        {
            let mut state = lock(&self.state);
            if state.is_running() {
                debug!("Rejected {} while a conversion is running", request.source_path().display());
                return Err(ConvertError::ConversionInProgress);
            }
            *state = WorkerState::Running;
        }

        let id = NEXT_CONVERSION_ID.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        info!(
            "Conversion #{} started: {} → {}",
            id,
            request.source_path().display(),
            request.target_format()
        );

        let guard = RunningGuard {
            id,
            state: Arc::clone(&self.state),
            settled: false,
        };
        let task = runtime.spawn(run(id, request.clone(), Arc::clone(&self.config), guard, tx));

        Ok(ConversionHandle {
            id,
            request,
            events: rx,
            task,
        })
    }
}

// ── Conversion task ──────────────────────────────────────────────────────

async fn run(
    id: u64,
    request: ConversionRequest,
    config: Arc<ConverterConfig>,
    guard: RunningGuard,
    tx: UnboundedSender<ConversionOutcome>,
) {
    let started = Instant::now();
    let format = request.target_format();

    // The routine runs in its own task so that a panic anywhere in it still
    // ends in a terminal event instead of leaving the worker stuck in Running.
    let reporter = ProgressReporter::new(tx.clone());
    let result = match tokio::spawn(dispatch(request, config, reporter)).await {
        Ok(result) => result,
        Err(e) => Err(ConvertError::Internal(format!("Conversion task panicked: {e}"))),
    };

    let elapsed_ms = started.elapsed().as_millis();
    let (next_state, outcome) = match result {
        Ok(path) => {
            info!("Conversion #{} succeeded in {}ms: {}", id, elapsed_ms, path.display());
            (WorkerState::Succeeded, ConversionOutcome::Success(path))
        }
        Err(e) => {
            warn!("Conversion #{} failed after {}ms: {}", id, elapsed_ms, e);
            (
                WorkerState::Failed,
                ConversionOutcome::Failure(failure_message(format, &e)),
            )
        }
    };

    guard.settle(next_state);
    // The receiver may already be gone; the state update above is what counts.
    let _ = tx.send(outcome);
}

async fn dispatch(
    request: ConversionRequest,
    config: Arc<ConverterConfig>,
    progress: ProgressReporter,
) -> Result<PathBuf, ConvertError> {
    match request.target_format() {
        TargetFormat::Pdf => pdf::convert(&request, &config, &progress).await,
        TargetFormat::Csv => blocking(move || table::convert_to_csv(&request, &config)).await,
        TargetFormat::Xlsx => blocking(move || table::convert_to_xlsx(&request, &config)).await,
    }
}

/// `"<FORMAT> conversion error: <detail>"`, the text carried by a failure event.
pub fn failure_message(format: TargetFormat, err: &ConvertError) -> String {
    format!("{} conversion error: {}", format.label(), err)
}

/// Owns the `Running` state of one conversion. Dropped without
/// [`settle`](Self::settle) (the task was cancelled, e.g. by runtime
/// shutdown), it leaves the worker `Failed` so later starts are accepted.
struct RunningGuard {
    id: u64,
    state: Arc<Mutex<WorkerState>>,
    settled: bool,
}

impl RunningGuard {
    fn settle(mut self, next: WorkerState) {
        *lock(&self.state) = next;
        self.settled = true;
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Conversion #{} was cancelled before finishing", self.id);
            *lock(&self.state) = WorkerState::Failed;
        }
    }
}

fn lock(state: &Mutex<WorkerState>) -> MutexGuard<'_, WorkerState> {
    // A poisoned lock still holds a valid enum value.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Handle ───────────────────────────────────────────────────────────────

/// Observer side of one conversion.
///
/// Events arrive in order: any number of non-decreasing `Progress` values,
/// then one terminal event, then `None`. Dropping the handle does not cancel
/// the conversion; the output is still produced and the worker state still
/// advances.
#[derive(Debug)]
pub struct ConversionHandle {
    id: u64,
    request: ConversionRequest,
    events: UnboundedReceiver<ConversionOutcome>,
    task: JoinHandle<()>,
}

impl ConversionHandle {
    /// Process-unique id, also used in log lines.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &ConversionRequest {
        &self.request
    }

    /// Wait for the next event; `None` once the terminal event has been taken.
    pub async fn next_event(&mut self) -> Option<ConversionOutcome> {
        self.events.recv().await
    }

    /// Blocking variant of [`next_event`](Self::next_event) for threads
    /// outside the runtime. Panics if called from within an async context.
    pub fn blocking_next_event(&mut self) -> Option<ConversionOutcome> {
        self.events.blocking_recv()
    }

    /// Non-blocking poll for UI loops that drain events once per frame.
    pub fn try_next_event(&mut self) -> Option<ConversionOutcome> {
        self.events.try_recv().ok()
    }

    /// `true` once the background task has fully finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Drain progress events and return the terminal one.
    pub async fn finish(mut self) -> ConversionOutcome {
        while let Some(event) = self.events.recv().await {
            if event.is_terminal() {
                return event;
            }
        }
        // Only reachable if the runtime shut down mid-conversion.
        ConversionOutcome::Failure(failure_message(
            self.request.target_format(),
            &ConvertError::Internal("conversion ended without a result".to_string()),
        ))
    }

    /// All remaining events as a [`tokio_stream::Stream`].
    pub fn into_stream(self) -> UnboundedReceiverStream<ConversionOutcome> {
        UnboundedReceiverStream::new(self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use std::path::Path;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_docx(path: &Path, paragraphs: &[&str]) {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
            .collect();
        let xml = format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );
        let mut zip = ZipWriter::new(std::fs::File::create(path).unwrap());
        zip.start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn start_outside_runtime_is_internal_error() {
        let converter = Converter::default();
        let err = converter
            .start(ConversionRequest::new("/tmp/x.docx", TargetFormat::Csv))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(converter.state(), WorkerState::Idle);
    }

    #[test]
    fn unsettled_guard_marks_worker_failed() {
        let converter = Converter::default();
        *lock(&converter.state) = WorkerState::Running;
        drop(RunningGuard {
            id: 0,
            state: Arc::clone(&converter.state),
            settled: false,
        });
        assert_eq!(converter.state(), WorkerState::Failed);
    }

    #[test]
    fn settled_guard_keeps_final_state() {
        let converter = Converter::default();
        *lock(&converter.state) = WorkerState::Running;
        RunningGuard {
            id: 0,
            state: Arc::clone(&converter.state),
            settled: false,
        }
        .settle(WorkerState::Succeeded);
        assert_eq!(converter.state(), WorkerState::Succeeded);
    }

    #[test]
    fn failure_message_is_prefixed_with_format() {
        let err = ConvertError::source_read("/x.docx", "file not found");
        let msg = failure_message(TargetFormat::Xlsx, &err);
        assert!(msg.starts_with("XLSX conversion error: "), "got: {msg}");
        assert!(msg.contains("file not found"));
    }

    #[tokio::test]
    async fn csv_conversion_reaches_succeeded() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("notes.docx");
        write_docx(&src, &["Hello", "World"]);

        let converter = Converter::default();
        let handle = converter
            .start(ConversionRequest::new(&src, TargetFormat::Csv))
            .unwrap();
        assert!(handle.id() > 0);
        assert_eq!(handle.request().target_format(), TargetFormat::Csv);

        let outcome = handle.finish().await;
        assert_eq!(outcome, ConversionOutcome::Success(dir.path().join("notes.csv")));
        assert_eq!(converter.state(), WorkerState::Succeeded);
    }

    #[tokio::test]
    async fn missing_source_reaches_failed() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::default();
        let outcome = converter
            .start(ConversionRequest::new(dir.path().join("gone.docx"), TargetFormat::Xlsx))
            .unwrap()
            .finish()
            .await;
        match outcome {
            ConversionOutcome::Failure(msg) => assert!(msg.starts_with("XLSX conversion error: ")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(converter.state(), WorkerState::Failed);
    }

    #[tokio::test]
    async fn clones_share_the_running_guard() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.docx");
        write_docx(&src, &["x"]);

        let converter = Converter::default();
        let other = converter.clone();
        // Hold the state at Running directly so the check is deterministic.
        *lock(&converter.state) = WorkerState::Running;
        let err = other
            .start(ConversionRequest::new(&src, TargetFormat::Csv))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionInProgress);
        assert_eq!(converter.state(), WorkerState::Running);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.docx");
        write_docx(&src, &["x"]);

        let converter = Converter::default();
        let first = converter
            .start(ConversionRequest::new(&src, TargetFormat::Csv))
            .unwrap();
        let first_id = first.id();
        first.finish().await;
        let second = converter
            .start(ConversionRequest::new(&src, TargetFormat::Csv))
            .unwrap();
        assert_ne!(first_id, second.id());
        second.finish().await;
    }
}
