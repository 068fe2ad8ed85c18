//! Deployment ledger — append-only audit log, one line per attempt.
//!
//! Line format:
//!
//! ```text
//! 2026-10-19T12:00:00Z kind=deploy status=ok version=v2 previous=v1 from=a to=b
//! 2026-10-19T12:10:00Z kind=deploy status=aborted version=v3 previous=v2 from=b to=a stage=health reason="..."
//! ```
//!
//! The orchestrator only ever appends; the file exists for humans.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use cutover_core::{DeployKind, Slot};

use crate::error::{StateError, StateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerStatus {
    Ok,
    Aborted,
    /// Requested version was already live; nothing changed.
    Noop,
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LedgerStatus::Ok => "ok",
            LedgerStatus::Aborted => "aborted",
            LedgerStatus::Noop => "noop",
        })
    }
}

#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: DeployKind,
    pub status: LedgerStatus,
    pub version: String,
    pub previous: Option<String>,
    pub from: Slot,
    pub to: Slot,
    pub stage: Option<String>,
    pub reason: Option<String>,
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} kind={} status={} version={} previous={} from={} to={}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.kind,
            self.status,
            self.version,
            self.previous.as_deref().unwrap_or("-"),
            self.from,
            self.to,
        )?;
        if let Some(stage) = &self.stage {
            write!(f, " stage={stage}")?;
        }
        if let Some(reason) = &self.reason {
            // Keep the entry on one line.
            let reason = reason.replace(['\n', '\r'], " ").replace('"', "'");
            write!(f, " reason=\"{reason}\"")?;
        }
        Ok(())
    }
}

/// Handle to the ledger file.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. Creates the file and its directory on first use.
    pub fn append(&self, entry: &LedgerEntry) -> StateResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StateError::io(parent, e))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StateError::io(&self.path, e))?;
        writeln!(file, "{entry}").map_err(|e| StateError::io(&self.path, e))?;
        debug!(path = %self.path.display(), status = %entry.status, "ledger entry appended");
        Ok(())
    }

    /// Last `limit` lines, oldest first. Empty when the ledger does not exist.
    pub fn tail(&self, limit: usize) -> StateResult<Vec<String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StateError::io(&self.path, e)),
        };
        let lines: Vec<String> = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();
        let skip = lines.len().saturating_sub(limit);
        Ok(lines.into_iter().skip(skip).collect())
    }
}
