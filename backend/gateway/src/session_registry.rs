//! Per-browser session state.
//!
//! Each session owns its context behind its own async mutex: actions within
//! one session run one at a time, different sessions never share state.
//! Sessions not seen for [`SESSION_IDLE_TTL`] are evicted by a background sweep.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use studymate_auth::AuthSession;
use studymate_core::{ExplanationResult, NoteId, Style};

pub type SessionId = String;

/// The explanation most recently shown in a session; feedback and
/// "save as note" refer to it.
#[derive(Debug, Clone)]
pub struct LastExplanation {
    pub subject: String,
    pub style: Style,
    pub result: ExplanationResult,
}

#[derive(Debug, Default)]
pub struct SessionContext {
    pub auth: Option<AuthSession>,
    pub last_explanation: Option<LastExplanation>,
    /// Notes currently open for editing.
    pub editing: HashSet<NoteId>,
}

impl SessionContext {
    /// Forget everything tied to the signed-in user.
    pub fn sign_out(&mut self) {
        self.auth = None;
        self.editing.clear();
    }
}

pub type SharedContext = Arc<Mutex<SessionContext>>;

/// Sessions idle for longer than this are dropped by the sweep loop.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(12 * 60 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

struct SessionEntry {
    context: SharedContext,
    last_seen: Instant,
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a session and mark it as seen.
    pub async fn get(&self, id: &str) -> Option<SharedContext> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_seen = Instant::now();
        Some(entry.context.clone())
    }

    /// Start a new empty session under a fresh random id.
    pub async fn create(&self) -> (SessionId, SharedContext) {
        let id = Uuid::new_v4().simple().to_string();
        let context = SharedContext::default();
        let entry = SessionEntry {
            context: context.clone(),
            last_seen: Instant::now(),
        };
        self.sessions.write().await.insert(id.clone(), entry);
        (id, context)
    }

    pub async fn remove(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions not seen within `ttl`. Returns how many were removed.
    pub async fn sweep_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen.elapsed() < ttl);
        before - sessions.len()
    }

    /// Start a background loop that evicts idle sessions.
    pub fn spawn_sweep_loop(&self, ttl: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let removed = registry.sweep_idle(ttl).await;
                if removed > 0 {
                    debug!(removed, "Evicted idle sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_are_isolated() {
        let registry = SessionRegistry::new();
        let (a, ctx_a) = registry.create().await;
        let (b, ctx_b) = registry.create().await;
        assert_ne!(a, b);

        ctx_a.lock().await.editing.insert(Uuid::new_v4());
        assert!(ctx_b.lock().await.editing.is_empty());

        let again = registry.get(&a).await.unwrap();
        assert_eq!(again.lock().await.editing.len(), 1);
    }

    #[tokio::test]
    async fn removed_session_is_gone() {
        let registry = SessionRegistry::new();
        let (id, _) = registry.create().await;
        registry.remove(&id).await;
        assert!(registry.get(&id).await.is_none());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn sweep_drops_only_idle_sessions() {
        let registry = SessionRegistry::new();
        let (stale, _) = registry.create().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        let (fresh, _) = registry.create().await;

        assert_eq!(registry.sweep_idle(Duration::from_millis(20)).await, 1);
        assert!(registry.get(&stale).await.is_none());
        assert!(registry.get(&fresh).await.is_some());
    }

    #[tokio::test]
    async fn lookup_keeps_a_session_alive() {
        let registry = SessionRegistry::new();
        let (id, _) = registry.create().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(registry.get(&id).await.is_some());
        assert_eq!(registry.sweep_idle(Duration::from_millis(20)).await, 0);
    }
}
