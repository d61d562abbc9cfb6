//! ---
//! cz_section: "04-guest-runtime"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Line-buffered guest output streams routed to logging."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::cell::RefCell;

use cz_logging::{cz_error, cz_info, LogContext};

/// Accumulates text until a line feed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` and return every line it completed, without the line feed.
    /// A trailing partial line stays pending.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = text;
        while let Some(idx) = rest.find('\n') {
            self.pending.push_str(&rest[..idx]);
            lines.push(std::mem::take(&mut self.pending));
            rest = &rest[idx + 1..];
        }
        self.pending.push_str(rest);
        lines
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Take the partial line, if any.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

thread_local! {
    static STDOUT_BUFFER: RefCell<LineBuffer> = RefCell::new(LineBuffer::new());
    static STDERR_BUFFER: RefCell<LineBuffer> = RefCell::new(LineBuffer::new());
}

/// One of the two guest output streams.
///
/// Buffers are per native thread, so lines written from different threads never
/// interleave mid-line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSink {
    Stdout,
    Stderr,
}

impl OutputSink {
    pub fn tag(self) -> &'static str {
        match self {
            OutputSink::Stdout => "stdout",
            OutputSink::Stderr => "stderr",
        }
    }

    pub fn write(self, text: &str) {
        let lines = self.with_buffer(|buf| buf.push(text));
        for line in lines {
            self.emit(&line);
        }
    }

    pub fn flush(self) {
        if let Some(line) = self.with_buffer(LineBuffer::flush) {
            self.emit(&line);
        }
    }

    /// Text written on this thread that has not reached a line feed yet.
    pub fn pending(self) -> String {
        self.with_buffer(|buf| buf.pending().to_owned())
    }

    /// Flush both streams of the calling thread.
    pub fn flush_all() {
        OutputSink::Stdout.flush();
        OutputSink::Stderr.flush();
    }

    fn with_buffer<R>(self, f: impl FnOnce(&mut LineBuffer) -> R) -> R {
        let key = match self {
            OutputSink::Stdout => &STDOUT_BUFFER,
            OutputSink::Stderr => &STDERR_BUFFER,
        };
        key.with(|cell| f(&mut cell.borrow_mut()))
    }

    fn emit(self, line: &str) {
        let ctx = LogContext::tagged(self.tag()).with_service("guest");
        match self {
            OutputSink::Stdout => cz_info!(context = ctx, "{}", line),
            OutputSink::Stderr => cz_error!(context = ctx, "{}", line),
        }
    }
}
