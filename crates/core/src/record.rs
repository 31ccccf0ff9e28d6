//! The normalized error record every notification is built from.
//!
//! Each call site (generic application code, a web request, a dead job) has
//! its own constructor, but all of them produce the same [`ErrorRecord`].
//! Records are immutable once built.

use std::backtrace::BacktraceStatus;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const SOURCE_WORKER: &str = "Worker";
pub const SOURCE_CONTROLLER: &str = "Controller";
pub const SOURCE_APPLICATION: &str = "Application";

/// A single error occurrence, normalized for alerting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    source: String,
    source_detail: Option<String>,
    error_class: String,
    error_message: String,
    queue: Option<String>,
    job_id: Option<String>,
    backtrace: Option<Vec<String>>,
}

impl ErrorRecord {
    /// Start a record for an arbitrary call site. Source defaults to "Worker".
    pub fn builder(
        error_class: impl Into<String>,
        error_message: impl Into<String>,
    ) -> ErrorRecordBuilder {
        ErrorRecordBuilder {
            source: SOURCE_WORKER.to_string(),
            source_detail: None,
            worker_class: None,
            error_class: error_class.into(),
            error_message: error_message.into(),
            queue: None,
            job_id: None,
            backtrace: None,
        }
    }

    /// Record for an error raised in application code.
    ///
    /// Source, detail and queue come from `context`; the error class is the
    /// concrete type name unless the context overrides it.
    pub fn from_error<E>(error: &E, context: &ErrorContext, max_error_length: usize) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let error_class = context
            .error_class
            .clone()
            .unwrap_or_else(|| type_name_of::<E>());
        Self::from_context(error_class, error.to_string(), None, context, max_error_length)
    }

    /// Like [`from_error`](Self::from_error), additionally lifting frames out of
    /// the error's backtrace when one was captured.
    pub fn from_anyhow(
        error: &anyhow::Error,
        context: &ErrorContext,
        max_error_length: usize,
    ) -> Self {
        let error_class = context
            .error_class
            .clone()
            .unwrap_or_else(|| "anyhow::Error".to_string());
        let backtrace = error.backtrace();
        let frames = match backtrace.status() {
            BacktraceStatus::Captured => Some(parse_backtrace(&backtrace.to_string())),
            _ => None,
        };
        Self::from_context(error_class, error.to_string(), frames, context, max_error_length)
    }

    /// Record for an error raised while handling a web request. `backtrace`
    /// carries the raw frames, if the host captured any.
    pub fn from_request<E>(
        handler: &str,
        action: &str,
        error: &E,
        backtrace: Option<Vec<String>>,
        max_error_length: usize,
    ) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut builder = Self::builder(type_name_of::<E>(), error.to_string())
            .source(SOURCE_CONTROLLER)
            .source_detail(format!("{handler}#{action}"));
        builder.backtrace = backtrace;
        builder.build(max_error_length)
    }

    /// Record for a job that exhausted its retries.
    pub fn from_job<E>(job: &DeadJob, error: &E, max_error_length: usize) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut builder = Self::builder(type_name_of::<E>(), error.to_string())
            .worker_class(job.class.clone());
        if let Some(ref queue) = job.queue {
            builder = builder.queue(queue.clone());
        }
        if let Some(ref jid) = job.jid {
            builder = builder.job_id(jid.clone());
        }
        if let Some(ref error_class) = job.error_class {
            builder.error_class = error_class.clone();
        }
        builder.backtrace = job.backtrace.clone();
        builder.build(max_error_length)
    }

    fn from_context(
        error_class: String,
        error_message: String,
        backtrace: Option<Vec<String>>,
        context: &ErrorContext,
        max_error_length: usize,
    ) -> Self {
        let mut builder = Self::builder(error_class, error_message).source(
            context
                .source
                .clone()
                .unwrap_or_else(|| SOURCE_APPLICATION.to_string()),
        );
        builder.source_detail = context.source_detail.clone();
        builder.queue = context.queue.clone();
        builder.backtrace = backtrace;
        builder.build(max_error_length)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn source_detail(&self) -> Option<&str> {
        self.source_detail.as_deref()
    }

    pub fn error_class(&self) -> &str {
        &self.error_class
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn queue(&self) -> Option<&str> {
        self.queue.as_deref()
    }

    /// Captured for correlation; not rendered into alerts.
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn backtrace(&self) -> Option<&[String]> {
        self.backtrace.as_deref()
    }
}

/// Builder for [`ErrorRecord`]. Truncation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ErrorRecordBuilder {
    source: String,
    source_detail: Option<String>,
    worker_class: Option<String>,
    error_class: String,
    error_message: String,
    queue: Option<String>,
    job_id: Option<String>,
    backtrace: Option<Vec<String>>,
}

impl ErrorRecordBuilder {
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn source_detail(mut self, detail: impl Into<String>) -> Self {
        self.source_detail = Some(detail.into());
        self
    }

    /// Used as the source detail when none is set explicitly.
    pub fn worker_class(mut self, class: impl Into<String>) -> Self {
        self.worker_class = Some(class.into());
        self
    }

    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    pub fn job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn backtrace<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backtrace = Some(frames.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self, max_error_length: usize) -> ErrorRecord {
        ErrorRecord {
            source: self.source,
            source_detail: self.source_detail.or(self.worker_class),
            error_class: self.error_class,
            error_message: truncate_chars(&self.error_message, max_error_length),
            queue: self.queue,
            job_id: self.job_id,
            backtrace: self.backtrace,
        }
    }
}

/// Free-form context supplied by application call sites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub source: Option<String>,
    pub source_detail: Option<String>,
    pub queue: Option<String>,
    /// Overrides the type-derived error class (useful for type-erased errors).
    pub error_class: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_source_detail(mut self, detail: impl Into<String>) -> Self {
        self.source_detail = Some(detail.into());
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    pub fn with_error_class(mut self, class: impl Into<String>) -> Self {
        self.error_class = Some(class.into());
        self
    }

    /// Build from a string map using the keys `source`, `source_detail`,
    /// `queue` and `error_class`. Unknown keys are ignored.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            source: map.get("source").cloned(),
            source_detail: map.get("source_detail").cloned(),
            queue: map.get("queue").cloned(),
            error_class: map.get("error_class").cloned(),
        }
    }
}

/// Metadata of a job moved to the dead set, as found in the job payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadJob {
    pub class: String,
    #[serde(default)]
    pub jid: Option<String>,
    #[serde(default)]
    pub queue: Option<String>,
    /// Error class recorded by the job runner, when it is not a Rust type.
    #[serde(default)]
    pub error_class: Option<String>,
    /// Frames of the final failure, as stored by the job runner.
    #[serde(default, alias = "error_backtrace")]
    pub backtrace: Option<Vec<String>>,
}

impl DeadJob {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            jid: None,
            queue: None,
            error_class: None,
            backtrace: None,
        }
    }

    pub fn with_jid(mut self, jid: impl Into<String>) -> Self {
        self.jid = Some(jid.into());
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    pub fn with_backtrace<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backtrace = Some(frames.into_iter().map(Into::into).collect());
        self
    }
}

fn type_name_of<E: ?Sized>() -> String {
    std::any::type_name::<E>().to_string()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Turn the `Display` output of a captured [`std::backtrace::Backtrace`] into
/// one string per frame, `"<file>:<line>:<col> in <function>"`.
///
/// Frames without source location are kept as the bare function name.
pub fn parse_backtrace(rendered: &str) -> Vec<String> {
    let mut frames = Vec::new();
    let mut pending: Option<String> = None;

    for line in rendered.lines() {
        let line = line.trim();
        if let Some(location) = line.strip_prefix("at ") {
            let function = pending.take().unwrap_or_default();
            if function.is_empty() {
                frames.push(location.to_string());
            } else {
                frames.push(format!("{location} in {function}"));
            }
        } else if let Some((index, function)) = line.split_once(": ") {
            if index.chars().all(|c| c.is_ascii_digit()) {
                if let Some(previous) = pending.replace(function.to_string()) {
                    frames.push(previous);
                }
            }
        }
    }
    if let Some(previous) = pending {
        frames.push(previous);
    }
    frames
}
