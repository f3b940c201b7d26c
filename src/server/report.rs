use std::io::Write;
use std::sync::{Arc, Mutex};

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    /// Operation succeeded
    Success,
    /// Operation failed
    Error,
    /// Non-fatal problem
    Warning,
    /// Informational note
    Comment,
}

/// A human-readable status message, possibly spanning several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: MessageLevel,
    pub lines: Vec<String>,
}

impl StatusMessage {
    pub fn new(level: MessageLevel, lines: Vec<String>) -> Self {
        Self { level, lines }
    }

    /// Message lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Sink for the status messages produced by the commands.
pub trait Reporter: Send + Sync {
    fn report(&self, message: StatusMessage);
}

/// Helpers available on any reporter, including trait objects.
pub trait ReporterExt {
    fn success(&self, line: impl Into<String>);
    fn error(&self, lines: Vec<String>);
    fn warning(&self, line: impl Into<String>);
    fn comment(&self, line: impl Into<String>);
}

impl<R: Reporter + ?Sized> ReporterExt for R {
    fn success(&self, line: impl Into<String>) {
        self.report(StatusMessage::new(MessageLevel::Success, vec![line.into()]));
    }

    fn error(&self, lines: Vec<String>) {
        self.report(StatusMessage::new(MessageLevel::Error, lines));
    }

    fn warning(&self, line: impl Into<String>) {
        self.report(StatusMessage::new(MessageLevel::Warning, vec![line.into()]));
    }

    fn comment(&self, line: impl Into<String>) {
        self.report(StatusMessage::new(MessageLevel::Comment, vec![line.into()]));
    }
}

/// Writes messages to the terminal. Errors and warnings go to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, message: StatusMessage) {
        let (tag, to_stderr) = match message.level {
            MessageLevel::Success => ("[OK] ", false),
            MessageLevel::Error => ("[ERROR] ", true),
            MessageLevel::Warning => ("[WARNING] ", true),
            MessageLevel::Comment => ("// ", false),
        };

        let indent = " ".repeat(tag.len());
        let mut rendered = String::new();
        for (i, line) in message.lines.iter().enumerate() {
            rendered.push_str(if i == 0 { tag } else { &indent });
            rendered.push_str(line);
            rendered.push('\n');
        }

        // A closed terminal is not worth failing a command over.
        if to_stderr {
            let _ = writeln!(std::io::stderr(), "\n{}", rendered);
        } else {
            let _ = writeln!(std::io::stdout(), "\n{}", rendered);
        }
    }
}

/// Keeps messages in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    messages: Arc<Mutex<Vec<StatusMessage>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded messages, oldest first.
    pub fn messages(&self) -> Vec<StatusMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Recorded messages of one level.
    pub fn messages_at(&self, level: MessageLevel) -> Vec<StatusMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.level == level)
            .collect()
    }

    /// Whether any message line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages()
            .iter()
            .any(|m| m.lines.iter().any(|line| line.contains(needle)))
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, message: StatusMessage) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
    }
}
