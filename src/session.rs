//! Per-call export state machine.
//!
//! `Idle → Exporting(raster) → {Success | Exporting(text) → {Success | Failed}}`
//!
//! A session lives for exactly one orchestrator call. `Success` and `Failed`
//! are terminal; a new call starts a new session.

use crate::artifact::ExportMode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "mode", rename_all = "lowercase")]
pub enum ExportState {
    Idle,
    Exporting(ExportMode),
    Success(ExportMode),
    Failed,
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportState::Idle => write!(f, "idle"),
            ExportState::Exporting(mode) => write!(f, "exporting({mode})"),
            ExportState::Success(mode) => write!(f, "success({mode})"),
            ExportState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSession {
    pub export_id: String,
    pub resume_name: String,
    pub state: ExportState,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub raster_error: Option<String>,
    pub fallback_error: Option<String>,
}

impl ExportSession {
    pub fn new(resume_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            export_id: Uuid::new_v4().to_string(),
            resume_name: resume_name.into(),
            state: ExportState::Idle,
            started_at: now,
            updated_at: now,
            raster_error: None,
            fallback_error: None,
        }
    }

    /// `Idle → Exporting(raster)`
    pub fn start(&mut self) -> bool {
        self.transition(ExportState::Idle, ExportState::Exporting(ExportMode::Raster))
    }

    /// `Exporting(raster) → Exporting(text)`, keeping the capture error.
    pub fn fall_back(&mut self, raster_error: String) -> bool {
        let moved = self.transition(
            ExportState::Exporting(ExportMode::Raster),
            ExportState::Exporting(ExportMode::Text),
        );
        if moved {
            self.raster_error = Some(raster_error);
        }
        moved
    }

    /// `Exporting(mode) → Success(mode)`
    pub fn succeed(&mut self) -> bool {
        match self.state {
            ExportState::Exporting(mode) => {
                self.transition(self.state, ExportState::Success(mode))
            }
            _ => self.reject("success"),
        }
    }

    /// `Exporting(text) → Failed`
    pub fn fail(&mut self, fallback_error: String) -> bool {
        let moved = self.transition(ExportState::Exporting(ExportMode::Text), ExportState::Failed);
        if moved {
            self.fallback_error = Some(fallback_error);
        }
        moved
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, ExportState::Success(_) | ExportState::Failed)
    }

    /// Elapsed time once the session reached a terminal state.
    pub fn duration_ms(&self) -> Option<i64> {
        self.is_terminal().then(|| {
            self.updated_at
                .signed_duration_since(self.started_at)
                .num_milliseconds()
        })
    }

    fn transition(&mut self, from: ExportState, to: ExportState) -> bool {
        if self.state != from {
            return self.reject(&to.to_string());
        }
        self.state = to;
        self.updated_at = Utc::now();
        true
    }

    fn reject(&self, target: &str) -> bool {
        warn!(
            export_id = %self.export_id,
            state = %self.state,
            target,
            "Ignoring invalid export state transition"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_raster_success_path() {
        let mut session = ExportSession::new("Alex");
        assert_eq!(session.state, ExportState::Idle);
        assert!(session.duration_ms().is_none());

        assert!(session.start());
        assert!(session.succeed());
        assert_eq!(session.state, ExportState::Success(ExportMode::Raster));
        assert!(session.duration_ms().is_some());
        assert!(session.raster_error.is_none());
    }

    #[test]
    fn test_fallback_then_failure() {
        let mut session = ExportSession::new("Alex");
        session.start();

        assert!(session.fall_back("tainted".to_string()));
        assert_eq!(session.state, ExportState::Exporting(ExportMode::Text));
        assert!(session.fail("writer broke".to_string()));

        assert_eq!(session.state, ExportState::Failed);
        assert_eq!(session.raster_error.as_deref(), Some("tainted"));
        assert_eq!(session.fallback_error.as_deref(), Some("writer broke"));
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let mut session = ExportSession::new("Alex");
        assert!(!session.succeed());
        assert!(!session.fail("nope".to_string()));

        session.start();
        session.succeed();
        assert!(!session.start());
        assert!(!session.fall_back("late".to_string()));
        assert_eq!(session.state, ExportState::Success(ExportMode::Raster));
    }

    #[test]
    fn test_state_serializes_with_mode() {
        let json = serde_json::to_value(ExportState::Success(ExportMode::Text)).unwrap();
        assert_eq!(json, serde_json::json!({"state": "success", "mode": "text"}));
    }
}
