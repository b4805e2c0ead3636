//! System health reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate health of the co-host pipeline.
///
/// Written only by the orchestrator; everyone else reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemStatus {
    /// Slide watcher running
    pub monitoring: bool,
    /// Presentation host reachable
    pub host_connected: bool,
    /// Speech synthesis available
    pub synthesis_available: bool,
    /// Audio output ready
    pub playback_ready: bool,
    /// Last time anything happened
    pub last_activity: Option<DateTime<Utc>>,
    /// Most recent error, cleared when everything is healthy again
    pub error: Option<String>,
}

impl SystemStatus {
    /// All four pipeline components up
    #[must_use]
    pub const fn components_up(&self) -> bool {
        self.monitoring && self.host_connected && self.synthesis_available && self.playback_ready
    }

    /// Every component up and no standing error
    #[must_use]
    pub const fn fully_operational(&self) -> bool {
        self.components_up() && self.error.is_none()
    }

    /// Names of components currently down
    #[must_use]
    pub fn failed_components(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if !self.monitoring {
            failed.push("monitoring");
        }
        if !self.host_connected {
            failed.push("host");
        }
        if !self.synthesis_available {
            failed.push("synthesis");
        }
        if !self.playback_ready {
            failed.push("playback");
        }
        failed
    }

    /// Record activity now
    pub fn touch(&mut self) {
        self.last_activity = Some(Utc::now());
    }
}

/// Callbacks for interested parties (UI, logs, remote status pages).
///
/// All methods have empty defaults; implement only what you watch.
pub trait StatusObserver: Send + Sync {
    fn on_status_changed(&self, _status: &SystemStatus) {}

    /// Fired when Orik starts or stops speaking
    fn on_speaking_changed(&self, _speaking: bool) {}

    fn on_error(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_operational_requires_all_components() {
        let mut status = SystemStatus::default();
        assert!(!status.fully_operational());

        status.monitoring = true;
        status.host_connected = true;
        status.synthesis_available = true;
        assert!(!status.fully_operational());
        assert_eq!(status.failed_components(), vec!["playback"]);

        status.playback_ready = true;
        assert!(status.fully_operational());
        assert!(status.failed_components().is_empty());
    }

    #[test]
    fn standing_error_blocks_fully_operational() {
        let mut status = SystemStatus {
            monitoring: true,
            host_connected: true,
            synthesis_available: true,
            playback_ready: true,
            ..SystemStatus::default()
        };
        assert!(status.fully_operational());

        status.error = Some("tts outage".to_string());
        assert!(status.components_up());
        assert!(!status.fully_operational());
    }

    #[test]
    fn touch_updates_activity() {
        let mut status = SystemStatus::default();
        assert!(status.last_activity.is_none());
        status.touch();
        assert!(status.last_activity.is_some());
    }
}
