use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::import_session::ImportSession;

pub type SharedSession = Arc<Mutex<ImportSession>>;

/// In-memory import sessions, evicted after sitting idle for `ttl`.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<Uuid, SharedSession>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder().time_to_idle(ttl).build(),
        }
    }

    pub fn insert(&self, session: ImportSession) -> SharedSession {
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.insert(id, shared.clone());
        tracing::debug!("Stored import session {}", id);
        shared
    }

    pub fn get(&self, id: Uuid) -> Result<SharedSession, AppError> {
        self.sessions
            .get(&id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }

    pub fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_round_trip_through_the_store() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = ImportSession::new(1024);
        let id = session.id();

        store.insert(session);
        assert_eq!(store.get(id).unwrap().lock().id(), id);

        store.remove(id).unwrap();
        assert!(matches!(store.get(id), Err(AppError::SessionNotFound(_))));
        assert!(store.remove(id).is_err());
    }
}
