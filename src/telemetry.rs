//! Static console panel: control label, signal readout, telemetry and log.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::session::SessionState;

/// Overlay shown while a transmission is being received
pub const OVERLAY_TEXT: &str = "RECEIVING...";

/// Fixed transmission log
pub const LOG_LINES: [&str; 3] = [
    "[00:00] Link established",
    "[00:02] Handshake complete",
    "[00:04] Incoming transmission...",
];

/// One key/value telemetry row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryRow {
    pub key: &'static str,
    pub value: String,
}

impl TelemetryRow {
    fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Telemetry rows; TIME is `now` in RFC 1123 form
pub fn telemetry_rows(now: DateTime<Utc>) -> Vec<TelemetryRow> {
    vec![
        TelemetryRow::new("ID", "TR-0001"),
        TelemetryRow::new("TIME", now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()),
        TelemetryRow::new("COORD", "42.360°N, 71.058°W"),
        TelemetryRow::new("ENCRYPT", "AES-??"),
    ]
}

/// Control label for the current state
pub fn button_label(state: SessionState) -> &'static str {
    match state {
        SessionState::Idle => "Play Transmission",
        SessionState::Active => "Stop",
    }
}

pub fn signal_readout(strength: u8) -> String {
    format!("Signal: {}%", strength)
}

/// Everything the console shows besides the waveform
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleView {
    pub button: &'static str,
    pub signal: String,
    /// Present only while a transmission is active
    pub overlay: Option<&'static str>,
    pub telemetry: Vec<TelemetryRow>,
    pub log: &'static [&'static str],
}

impl ConsoleView {
    pub fn new(state: SessionState, strength: u8, now: DateTime<Utc>) -> Self {
        Self {
            button: button_label(state),
            signal: signal_readout(strength),
            overlay: (state == SessionState::Active).then_some(OVERLAY_TEXT),
            telemetry: telemetry_rows(now),
            log: &LOG_LINES,
        }
    }

    /// Compact one-line status for window titles
    pub fn title(&self) -> String {
        match self.overlay {
            Some(overlay) => format!("{} | {} | {}", overlay, self.signal, self.button),
            None => format!("{} | {}", self.signal, self.button),
        }
    }
}

impl fmt::Display for ConsoleView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]  {}", self.button, self.signal)?;
        if let Some(overlay) = self.overlay {
            writeln!(f, "{}", overlay)?;
        }
        for row in &self.telemetry {
            writeln!(f, "{:<8} {}", row.key, row.value)?;
        }
        for line in self.log {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 5).unwrap()
    }

    #[test]
    fn test_time_row_is_rfc1123() {
        let rows = telemetry_rows(noon());
        assert_eq!(rows[1].key, "TIME");
        assert_eq!(rows[1].value, "Sat, 09 Mar 2024 12:30:05 GMT");
    }

    #[test]
    fn test_fixed_rows() {
        let keys: Vec<_> = telemetry_rows(noon()).iter().map(|r| r.key).collect();
        assert_eq!(keys, ["ID", "TIME", "COORD", "ENCRYPT"]);
        assert_eq!(telemetry_rows(noon())[0].value, "TR-0001");
        assert_eq!(telemetry_rows(noon())[3].value, "AES-??");
    }

    #[test]
    fn test_view_follows_state() {
        let idle = ConsoleView::new(SessionState::Idle, 100, noon());
        assert_eq!(idle.button, "Play Transmission");
        assert_eq!(idle.signal, "Signal: 100%");
        assert_eq!(idle.overlay, None);
        assert_eq!(idle.title(), "Signal: 100% | Play Transmission");

        let active = ConsoleView::new(SessionState::Active, 73, noon());
        assert_eq!(active.button, "Stop");
        assert_eq!(active.overlay, Some("RECEIVING..."));
        assert_eq!(active.title(), "RECEIVING... | Signal: 73% | Stop");
    }

    #[test]
    fn test_panel_text() {
        let text = ConsoleView::new(SessionState::Active, 42, noon()).to_string();
        assert!(text.starts_with("[Stop]  Signal: 42%\nRECEIVING...\n"));
        assert!(text.contains("COORD    42.360°N, 71.058°W"));
        assert!(text.ends_with("[00:04] Incoming transmission...\n"));
    }
}
