use std::fmt;
use std::sync::Arc;

use crate::error::TaskError;
use crate::request::Task;

use super::dispatcher::ExceptionHandler;

/// Settings for [`map`](crate::map).
#[derive(Clone, Default)]
pub struct MapOptions {
    /// Defer response bodies.
    pub stream: bool,
    /// Maximum number of requests in flight; `None` means no limit.
    pub size: Option<usize>,
    pub exception_handler: Option<ExceptionHandler>,
}

/// Settings for [`imap`](crate::imap).
#[derive(Clone)]
pub struct ImapOptions {
    pub stream: bool,
    /// Maximum number of requests in flight. Defaults to 2.
    pub size: usize,
    pub exception_handler: Option<ExceptionHandler>,
}

impl Default for ImapOptions {
    fn default() -> Self {
        Self { stream: false, size: 2, exception_handler: None }
    }
}

impl MapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn exception_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Task, &TaskError) + Send + Sync + 'static,
    {
        self.exception_handler = Some(Arc::new(handler));
        self
    }
}

impl ImapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn exception_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Task, &TaskError) + Send + Sync + 'static,
    {
        self.exception_handler = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for MapOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapOptions")
            .field("stream", &self.stream)
            .field("size", &self.size)
            .field("exception_handler", &self.exception_handler.is_some())
            .finish()
    }
}

impl fmt::Debug for ImapOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapOptions")
            .field("stream", &self.stream)
            .field("size", &self.size)
            .field("exception_handler", &self.exception_handler.is_some())
            .finish()
    }
}
