use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::TaskError;
use crate::request::{Response, Task};
use crate::utils::{format_datetime, format_span};

/// Where unhandled task failures are written.
///
/// Runners report through a sink only when the caller supplied no
/// exception handler; cancellations never reach it.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, task: &Task, error: &TaskError);
}

/// Emits one `tracing` error event per failure. The default sink.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, task: &Task, error: &TaskError) {
        tracing::error!(
            method = %task.method(),
            url = task.url(),
            tag = task.tag().unwrap_or("no-tag"),
            kind = error.kind(),
            error = %error,
            "task failed"
        );
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DebugTarget {
    Console,
    File(PathBuf),
}

impl DebugTarget {
    /// `"console"` (any case) or an empty string selects stderr; a directory
    /// selects `debug.log` inside it; anything else is a file path.
    pub fn parse(target: &str) -> Self {
        if target.is_empty() || target.eq_ignore_ascii_case("console") {
            return DebugTarget::Console;
        }
        let path = Path::new(target);
        if path.is_dir() {
            DebugTarget::File(path.join("debug.log"))
        } else {
            DebugTarget::File(path.to_path_buf())
        }
    }
}

/// Writes a framed text block per failure to stderr or a log file.
#[derive(Debug)]
pub struct WriterSink {
    target: DebugTarget,
    write_lock: Mutex<()>,
}

impl WriterSink {
    pub fn new(target: DebugTarget) -> Self {
        Self { target, write_lock: Mutex::new(()) }
    }

    pub fn target(&self) -> &DebugTarget {
        &self.target
    }

    fn render(task: &Task, error: &TaskError) -> String {
        let mut msg = format!(
            "\n==== [{}] ====\nMethod: {}\nURL: {}\n",
            task.tag().unwrap_or("no-tag"),
            task.method(),
            task.url()
        );
        msg.push_str(&format!("Failed with: {}\nError: {}\n", error.kind(), error));
        msg.push_str(&format!("Reported at: {}\n", format_datetime(std::time::SystemTime::now())));
        msg
    }
}

impl DiagnosticSink for WriterSink {
    fn report(&self, task: &Task, error: &TaskError) {
        let msg = Self::render(task, error);
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match &self.target {
            DebugTarget::Console => eprintln!("{msg}"),
            DebugTarget::File(path) => {
                let written = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .and_then(|mut f| writeln!(f, "{msg}"));
                if let Err(e) = written {
                    tracing::warn!(path = %path.display(), error = %e, "could not write diagnostic");
                }
            }
        }
    }
}

pub(crate) fn log_response(task: &Task, response: &Response) {
    tracing::debug!(
        method = %task.method(),
        url = task.url(),
        tag = task.tag().unwrap_or("no-tag"),
        status = response.status().as_u16(),
        process_time = %format!("{:.4}", response.elapsed().as_secs_f64()),
        request_time = %format_span(response.started_at(), response.finished_at()),
        deferred = response.is_deferred(),
        "task completed"
    );
}
