//! Scan progress reporting.
//!
//! Emits one event per fetched page so users watching a long scan can see
//! how far pagination has advanced. Progress goes to **stderr** so stdout
//! remains parseable for scripts. Advisory only — the scan result does
//! not depend on it.

use std::io::Write;

/// A single progress event during pagination.
#[derive(Clone, Debug)]
pub enum ScanProgressEvent {
    /// About to request this page (1-based).
    Fetching { page: u32 },
    /// Page fetched and parsed; cumulative record count so far.
    Fetched { page: u32, records_total: usize },
}

/// Reports scan progress. Implementations write to stderr (human or JSON).
pub trait ScanProgressReporter: Send + Sync {
    fn report(&self, event: ScanProgressEvent);
}

/// Human-friendly progress: "scan  page 3  412 reviews".
pub struct StderrProgress;

impl ScanProgressReporter for StderrProgress {
    fn report(&self, event: ScanProgressEvent) {
        let line = match &event {
            ScanProgressEvent::Fetching { page } => {
                format!("scan  page {}  fetching...\n", page)
            }
            ScanProgressEvent::Fetched {
                page,
                records_total,
            } => {
                format!("scan  page {}  {} reviews\n", page, records_total)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ScanProgressReporter for JsonProgress {
    fn report(&self, event: ScanProgressEvent) {
        let obj = match &event {
            ScanProgressEvent::Fetching { page } => serde_json::json!({
                "event": "progress",
                "phase": "fetching",
                "page": page
            }),
            ScanProgressEvent::Fetched {
                page,
                records_total,
            } => serde_json::json!({
                "event": "progress",
                "phase": "fetched",
                "page": page,
                "records": records_total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ScanProgressReporter for NoProgress {
    fn report(&self, _event: ScanProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    /// Build a reporter for this mode. Caller passes it to the driver.
    pub fn reporter(&self) -> Box<dyn ScanProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
