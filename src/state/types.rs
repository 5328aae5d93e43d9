use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the scan state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    #[default]
    Idle,
    Connecting,
    Discovering,
    Processing,
    Scraping,
    Completed,
    Error,
}

impl ScanPhase {
    /// Whether the scan has finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Allowed transitions. Any active phase may fail; terminal phases only
    /// return to `Idle` through an explicit reset.
    pub fn can_transition_to(self, next: ScanPhase) -> bool {
        use ScanPhase::*;
        match (self, next) {
            (Idle, Connecting) => true,
            (Connecting, Discovering) => true,
            (Discovering, Processing) => true,
            (Processing, Scraping) => true,
            (Scraping, Completed) => true,
            (Completed | Error, Idle) => true,
            (from, Error) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Discovering => "discovering",
            Self::Processing => "processing",
            Self::Scraping => "scraping",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Live progress of a scan. Readers get clones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStatus {
    pub phase: ScanPhase,
    pub current: u64,
    pub total: u64,
    pub current_item: Option<String>,
    pub errors: Vec<String>,
    pub start_time: Option<DateTime<Utc>>,
    /// Seconds, derived from the average time per finished item
    pub estimated_time_remaining: Option<u64>,
}

impl ScanStatus {
    /// Fraction of the current phase completed, in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.current as f64 / self.total as f64).min(1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use ScanPhase::*;
        let path = [Idle, Connecting, Discovering, Processing, Scraping, Completed, Idle];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn test_error_reachable_from_active_phases() {
        use ScanPhase::*;
        for phase in [Idle, Connecting, Discovering, Processing, Scraping] {
            assert!(phase.can_transition_to(Error));
        }
        assert!(!Completed.can_transition_to(Error));
        assert!(Error.can_transition_to(Idle));
    }

    #[test]
    fn test_no_skipping_phases() {
        use ScanPhase::*;
        assert!(!Idle.can_transition_to(Scraping));
        assert!(!Discovering.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Connecting));
    }

    #[test]
    fn test_phase_serialization() {
        assert_eq!(serde_json::to_string(&ScanPhase::Scraping).unwrap(), r#""scraping""#);
        assert_eq!(ScanPhase::Discovering.to_string(), "discovering");
    }

    #[test]
    fn test_progress() {
        let mut status = ScanStatus::default();
        assert_eq!(status.progress(), 0.0);
        status.total = 4;
        status.current = 1;
        assert_eq!(status.progress(), 0.25);
    }
}
