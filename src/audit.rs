//! Audit logging for analyzed commands.
//!
//! Entries are appended as JSON lines by a background writer thread so that
//! logging never delays the decision.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

use crate::decision::{AnalysisResult, Decision};
use crate::output::redact_secrets;

const MAX_COMMAND_CHARS: usize = 200;

/// An audit log entry.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub decision: Decision,
    pub rule_ids: Vec<String>,
    pub reason: String,
    /// Redacted and truncated command text.
    pub command: String,
    pub unparseable: bool,
    pub bypass: bool,
}

impl AuditEntry {
    pub fn new(result: &AnalysisResult, bypass: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: None,
            cwd: None,
            decision: result.decision,
            rule_ids: result.rule_ids().into_iter().map(String::from).collect(),
            reason: result.reason.clone(),
            command: truncate_chars(&redact_secrets(&result.original_command), MAX_COMMAND_CHARS),
            unparseable: result.unparseable,
            bypass,
        }
    }

    pub fn with_session(mut self, session_id: Option<&str>) -> Self {
        self.session_id = session_id.map(String::from);
        self
    }

    pub fn with_cwd(mut self, cwd: Option<&str>) -> Self {
        self.cwd = cwd.map(String::from);
        self
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars - 3) {
        Some((end, _)) if s.chars().count() > max_chars => format!("{}...", &s[..end]),
        _ => s.to_string(),
    }
}

/// Audit logger for writing entries to a file.
pub struct AuditLogger {
    file: File,
}

impl AuditLogger {
    /// Open or create an audit log file, creating parent directories.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    /// Write an audit entry to the log.
    pub fn log(&mut self, entry: &AuditEntry) -> std::io::Result<()> {
        let json = serde_json::to_string(entry)?;
        writeln!(self.file, "{}", json)?;
        self.file.flush()
    }
}

/// Fire-and-forget handle to the audit writer thread.
///
/// Dropping the sink closes the channel and waits for queued entries to be
/// written.
pub struct AuditSink {
    sender: Option<Sender<AuditEntry>>,
    handle: Option<JoinHandle<()>>,
}

impl AuditSink {
    /// Start a writer thread appending to `path`.
    pub fn spawn(path: PathBuf) -> Self {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || writer_loop(&path, receiver));
        Self {
            sender: Some(sender),
            handle: Some(handle),
        }
    }

    /// A sink that discards every entry.
    pub fn disabled() -> Self {
        Self {
            sender: None,
            handle: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queue an entry. Never blocks and never fails.
    pub fn record(&self, entry: AuditEntry) {
        if let Some(sender) = &self.sender
            && sender.send(entry).is_err()
        {
            error!("audit writer stopped, dropping entry");
        }
    }
}

impl Drop for AuditSink {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("audit writer thread panicked");
        }
    }
}

fn writer_loop(path: &Path, receiver: Receiver<AuditEntry>) {
    let mut logger = match AuditLogger::open(path) {
        Ok(logger) => logger,
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to open audit log");
            // Drain so senders never see a closed channel mid-run
            while receiver.recv().is_ok() {}
            return;
        }
    };

    while let Ok(entry) = receiver.recv() {
        match logger.log(&entry) {
            Ok(()) => debug!(decision = %entry.decision, "audit entry written"),
            Err(e) => error!(path = %path.display(), error = %e, "failed to write audit entry"),
        }
    }
}
