use std::borrow::Cow;
use std::time::Duration;
use tokio::time::Instant;

/// Severity of the message on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// Transient one-line message that hides itself after a timeout.
#[derive(Debug, Clone)]
pub struct StatusLine {
    message: Option<(Cow<'static, str>, StatusKind, Instant)>,
    timeout: Duration,
}

impl StatusLine {
    pub fn new(timeout: Duration) -> Self {
        Self {
            message: None,
            timeout,
        }
    }

    /// Show an informational message. An empty message clears the line.
    pub fn set(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.replace(msg.into(), StatusKind::Info);
    }

    pub fn set_error(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.replace(msg.into(), StatusKind::Error);
    }

    fn replace(&mut self, msg: Cow<'static, str>, kind: StatusKind) {
        self.message = if msg.is_empty() {
            None
        } else {
            Some((msg, kind, Instant::now()))
        };
    }

    pub fn clear(&mut self) {
        self.message = None;
    }

    /// Drop the message once it has been shown for the timeout.
    /// Returns true if a message was actually cleared.
    pub fn clear_expired(&mut self) -> bool {
        if let Some((_, _, shown_at)) = &self.message {
            if shown_at.elapsed() >= self.timeout {
                self.message = None;
                return true;
            }
        }
        false
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().map(|(msg, _, _)| msg.as_ref())
    }

    pub fn kind(&self) -> Option<StatusKind> {
        self.message.as_ref().map(|(_, kind, _)| *kind)
    }
}
