//! Heartbeat & stale-session reaping: on demand, transitions any `running`
//! session whose heartbeat has gone silent past its kind's threshold to
//! `interrupted`. Handles process crashes and host hibernation without
//! leaking `running` rows into the next plan.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::ports::SessionRepository;

pub struct HeartbeatReaper {
    repo: Arc<dyn SessionRepository>,
}

impl HeartbeatReaper {
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        Self { repo }
    }

    /// Sweep every `running` session across all projects; returns the
    /// number reaped.
    pub async fn sweep(&self) -> DomainResult<usize> {
        let now = Utc::now();
        let running = self.repo.list_running().await?;
        let mut reaped = 0;

        for mut session in running {
            if session.is_stale(now) {
                session.interrupt("stale: heartbeat exceeded threshold".to_string());
                self.repo.update(&session).await?;
                info!(session_id = %session.id, "reaped stale session");
                reaped += 1;
            }
        }

        Ok(reaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Session, SessionKind, SessionStatus};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct FakeSessions(Mutex<Vec<Session>>);

    #[async_trait]
    impl SessionRepository for FakeSessions {
        async fn create(&self, session: &Session) -> DomainResult<()> {
            self.0.lock().unwrap().push(session.clone());
            Ok(())
        }
        async fn get(&self, id: Uuid) -> DomainResult<Option<Session>> {
            Ok(self.0.lock().unwrap().iter().find(|s| s.id == id).cloned())
        }
        async fn update(&self, session: &Session) -> DomainResult<()> {
            let mut guard = self.0.lock().unwrap();
            if let Some(existing) = guard.iter_mut().find(|s| s.id == session.id) {
                *existing = session.clone();
            }
            Ok(())
        }
        async fn get_running_for_project(&self, project_id: Uuid) -> DomainResult<Option<Session>> {
            Ok(self.0.lock().unwrap().iter().find(|s| s.project_id == project_id && s.status == SessionStatus::Running).cloned())
        }
        async fn list_running(&self) -> DomainResult<Vec<Session>> {
            Ok(self.0.lock().unwrap().iter().filter(|s| s.status == SessionStatus::Running).cloned().collect())
        }
        async fn next_sequence(&self, _project_id: Uuid) -> DomainResult<i64> {
            Ok(1)
        }
    }

    #[tokio::test]
    async fn reaps_stale_coding_session() {
        let mut session = Session::new(Uuid::new_v4(), 1, SessionKind::Coding, "cheap");
        session.start();
        session.last_heartbeat = Some(Utc::now() - Duration::minutes(20));

        let repo = Arc::new(FakeSessions(Mutex::new(vec![session.clone()])));
        let reaper = HeartbeatReaper::new(repo.clone());
        let reaped = reaper.sweep().await.unwrap();

        assert_eq!(reaped, 1);
        let updated = repo.get(session.id).await.unwrap().unwrap();
        assert_eq!(updated.status, SessionStatus::Interrupted);
        assert!(updated.interruption_reason.unwrap().contains("stale"));
    }

    #[tokio::test]
    async fn fresh_heartbeat_is_not_reaped() {
        let mut session = Session::new(Uuid::new_v4(), 1, SessionKind::Coding, "cheap");
        session.start();
        session.last_heartbeat = Some(Utc::now());

        let repo = Arc::new(FakeSessions(Mutex::new(vec![session.clone()])));
        let reaper = HeartbeatReaper::new(repo);
        assert_eq!(reaper.sweep().await.unwrap(), 0);
    }
}
