//! At-exit report for compiled Rill programs
//!
//! Dumps generator KPIs when the program finishes, controlled by the
//! `RILL_REPORT` env var:
//! - Unset / `0` → no report, zero cost
//! - `1` → human-readable to stderr
//! - `json` → JSON to stderr
//! - `json:/path` → JSON to file
//!
//! Compiled main epilogues call `rill_report_emit()`; hosts embedding the
//! runtime can call [`emit_if_configured`] directly.

use crate::generator::{
    ACTIVE_GENERATORS, PEAK_GENERATORS, TOTAL_CLOSED, TOTAL_CREATED, TOTAL_FAULTS_INJECTED,
    TOTAL_SENDS, TOTAL_YIELDS,
};
use std::io::Write;
use std::sync::atomic::Ordering;

/// Output format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportFormat {
    Human,
    Json,
}

/// Output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportDestination {
    Stderr,
    File(String),
}

/// Parsed report configuration
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub format: ReportFormat,
    pub destination: ReportDestination,
}

impl ReportConfig {
    /// Parse from the RILL_REPORT environment variable.
    pub fn from_env() -> Option<Self> {
        Self::parse(&std::env::var("RILL_REPORT").ok()?)
    }

    /// Parse a RILL_REPORT value.
    pub fn parse(val: &str) -> Option<Self> {
        match val {
            "" | "0" => None,
            "1" => Some(ReportConfig {
                format: ReportFormat::Human,
                destination: ReportDestination::Stderr,
            }),
            "json" => Some(ReportConfig {
                format: ReportFormat::Json,
                destination: ReportDestination::Stderr,
            }),
            s if s.starts_with("json:") => Some(ReportConfig {
                format: ReportFormat::Json,
                destination: ReportDestination::File(s[5..].to_string()),
            }),
            _ => None,
        }
    }
}

/// Collected metrics for the report
#[derive(Debug)]
pub struct ReportData {
    pub generators_created: u64,
    pub generators_closed: u64,
    pub generators_active: usize,
    pub generators_peak: usize,
    pub yields: u64,
    pub sends: u64,
    pub faults_injected: u64,
}

/// Snapshot the generator counters.
pub fn collect_report_data() -> ReportData {
    ReportData {
        generators_created: TOTAL_CREATED.load(Ordering::Relaxed),
        generators_closed: TOTAL_CLOSED.load(Ordering::Relaxed),
        generators_active: ACTIVE_GENERATORS.load(Ordering::Relaxed),
        generators_peak: PEAK_GENERATORS.load(Ordering::Relaxed),
        yields: TOTAL_YIELDS.load(Ordering::Relaxed),
        sends: TOTAL_SENDS.load(Ordering::Relaxed),
        faults_injected: TOTAL_FAULTS_INJECTED.load(Ordering::Relaxed),
    }
}

pub fn format_human(data: &ReportData) -> String {
    let mut out = String::new();
    out.push_str("=== RILL REPORT ===\n");
    out.push_str(&format!("Generators made:   {}\n", data.generators_created));
    out.push_str(&format!("Generators closed: {}\n", data.generators_closed));
    out.push_str(&format!("Generators live:   {}\n", data.generators_active));
    out.push_str(&format!("Peak live:         {}\n", data.generators_peak));
    out.push_str(&format!("Yields delivered:  {}\n", data.yields));
    out.push_str(&format!("Values sent:       {}\n", data.sends));
    out.push_str(&format!("Faults injected:   {}\n", data.faults_injected));
    out.push_str("===================\n");
    out
}

#[cfg(feature = "report-json")]
pub fn format_json(data: &ReportData) -> String {
    let obj = serde_json::json!({
        "generators_created": data.generators_created,
        "generators_closed": data.generators_closed,
        "generators_active": data.generators_active as u64,
        "generators_peak": data.generators_peak as u64,
        "yields": data.yields,
        "sends": data.sends,
        "faults_injected": data.faults_injected,
    });
    serde_json::to_string(&obj).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(not(feature = "report-json"))]
pub fn format_json(data: &ReportData) -> String {
    eprintln!(
        "Warning: RILL_REPORT=json requires the 'report-json' feature. Falling back to human format."
    );
    format_human(data)
}

/// Render and write one report according to `config`.
pub fn write_report(config: &ReportConfig, data: &ReportData) {
    let text = match config.format {
        ReportFormat::Human => format_human(data),
        ReportFormat::Json => format_json(data),
    };

    match &config.destination {
        ReportDestination::Stderr => {
            let _ = std::io::stderr().lock().write_all(text.as_bytes());
        }
        ReportDestination::File(path) => {
            if let Ok(mut f) = std::fs::File::create(path) {
                let _ = f.write_all(text.as_bytes());
            }
        }
    }
}

/// Emit the report if RILL_REPORT asks for one.
pub fn emit_if_configured() {
    if let Some(config) = ReportConfig::from_env() {
        write_report(&config, &collect_report_data());
    }
}

/// Emit the configured report (FFI-safe, called from compiled main
/// epilogues).
#[unsafe(no_mangle)]
pub extern "C" fn rill_report_emit() {
    emit_if_configured();
}
