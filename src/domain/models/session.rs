//! Session domain model.
//!
//! One invocation of an agent. Exactly one session per project may be
//! `Running` at a time; `last_heartbeat` must monotonically advance while
//! it is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Initializer,
    Coding,
    Review,
}

impl SessionKind {
    /// Stale-session reaping threshold for this kind, per spec §5.
    pub fn heartbeat_threshold(&self) -> chrono::Duration {
        match self {
            Self::Initializer => chrono::Duration::minutes(35),
            Self::Coding => chrono::Duration::minutes(15),
            Self::Review => chrono::Duration::minutes(10),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializer => "initializer",
            Self::Coding => "coding",
            Self::Review => "review",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "initializer" => Some(Self::Initializer),
            "coding" => Some(Self::Coding),
            "review" => Some(Self::Review),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Error,
    Interrupted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Interrupted => "interrupted",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Monotonically increasing per-project sequence number.
    pub sequence: i64,
    pub kind: SessionKind,
    pub model: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Token counts, cost, and tool-use counters.
    pub metrics: serde_json::Value,
    pub interruption_reason: Option<String>,
}

impl Session {
    pub fn new(project_id: Uuid, sequence: i64, kind: SessionKind, model: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            sequence,
            kind,
            model: model.into(),
            status: SessionStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            last_heartbeat: None,
            ended_at: None,
            metrics: serde_json::json!({}),
            interruption_reason: None,
        }
    }

    pub fn start(&mut self) {
        let now = Utc::now();
        self.status = SessionStatus::Running;
        self.started_at = Some(now);
        self.last_heartbeat = Some(now);
    }

    pub fn heartbeat(&mut self) {
        self.last_heartbeat = Some(Utc::now());
    }

    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.ended_at = Some(Utc::now());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = SessionStatus::Error;
        self.interruption_reason = Some(message.into());
        self.ended_at = Some(Utc::now());
    }

    pub fn interrupt(&mut self, reason: impl Into<String>) {
        self.status = SessionStatus::Interrupted;
        self.interruption_reason = Some(reason.into());
        self.ended_at = Some(Utc::now());
    }

    /// Whether this running session's heartbeat is stale as of `now`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Running
            && self
                .last_heartbeat
                .is_some_and(|hb| now - hb > self.kind.heartbeat_threshold())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_detection_respects_kind_threshold() {
        let mut session = Session::new(Uuid::new_v4(), 1, SessionKind::Coding, "mid");
        session.start();
        session.last_heartbeat = Some(Utc::now() - chrono::Duration::minutes(20));
        assert!(session.is_stale(Utc::now()));
    }

    #[test]
    fn fresh_session_is_not_stale() {
        let mut session = Session::new(Uuid::new_v4(), 1, SessionKind::Review, "cheap");
        session.start();
        assert!(!session.is_stale(Utc::now()));
    }

    #[test]
    fn non_running_session_is_never_stale() {
        let mut session = Session::new(Uuid::new_v4(), 1, SessionKind::Coding, "mid");
        session.start();
        session.last_heartbeat = Some(Utc::now() - chrono::Duration::minutes(60));
        session.complete();
        assert!(!session.is_stale(Utc::now()));
    }
}
