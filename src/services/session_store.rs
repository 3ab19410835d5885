// src/services/session_store.rs
use crate::errors::TryOnError;
use crate::models::GenerationResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Append-only history of one session's generation results.
#[derive(Debug, Default)]
pub struct ResultStore {
    history: Vec<Arc<GenerationResult>>,
    latest: Option<Arc<GenerationResult>>,
}

impl ResultStore {
    pub fn record(&mut self, result: GenerationResult) -> Arc<GenerationResult> {
        let result = Arc::new(result);
        self.history.push(result.clone());
        self.latest = Some(result.clone());
        result
    }

    pub fn clear(&mut self) {
        self.history = Vec::new();
        self.latest = None;
    }

    pub fn latest(&self) -> Option<Arc<GenerationResult>> {
        self.latest.clone()
    }

    pub fn history(&self) -> &[Arc<GenerationResult>] {
        &self.history
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<GenerationResult>> {
        self.history.iter().find(|r| &r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }
}

/// Keeps one [`ResultStore`] per session id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, ResultStore>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().insert(id, ResultStore::default());
        id
    }

    pub fn remove(&self, id: &Uuid) -> Result<(), TryOnError> {
        self.lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| TryOnError::SessionNotFound(id.to_string()))
    }

    pub fn with_session<R>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut ResultStore) -> R,
    ) -> Result<R, TryOnError> {
        let mut sessions = self.lock();
        let store = sessions
            .get_mut(id)
            .ok_or_else(|| TryOnError::SessionNotFound(id.to_string()))?;
        Ok(f(store))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, ResultStore>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
