use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::types::{AnalysisResult, TriageError};

/// One session's slot: the current request token and the latest result.
#[derive(Debug)]
struct SessionSlot {
    current_token: u64,
    latest: Option<AnalysisResult>,
    updated_at: Option<NaiveDateTime>,
    /// Last request or commit, used for idle eviction.
    last_active: NaiveDateTime,
}

impl SessionSlot {
    fn new(now: NaiveDateTime) -> Self {
        Self {
            current_token: 0,
            latest: None,
            updated_at: None,
            last_active: now,
        }
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Session-scoped result store backed by RwLock.
///
/// Single-writer: only the triage service opens requests and commits results
/// (crate-private methods). The presentation layer reads through `latest`.
/// A commit is accepted only if its token is still the session's current
/// token, so a superseded turn can never overwrite a newer result.
///
/// Slots live until `evict` or `evict_idle` removes them.
pub struct SessionStore {
    slots: RwLock<HashMap<Uuid, SessionSlot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Open a new request for the session and return its token.
    /// Any earlier token for this session becomes stale.
    pub(crate) fn begin_request(&self, session_id: Uuid) -> Result<u64, TriageError> {
        let mut slots = self.slots.write().map_err(|_| TriageError::LockFailed)?;
        let now = now();
        let slot = slots.entry(session_id).or_insert_with(|| SessionSlot::new(now));
        slot.current_token += 1;
        slot.last_active = now;
        Ok(slot.current_token)
    }

    /// Store a result if `token` is still current. Returns false for a stale
    /// token or an evicted session.
    pub(crate) fn commit(
        &self,
        session_id: Uuid,
        token: u64,
        result: AnalysisResult,
    ) -> Result<bool, TriageError> {
        let mut slots = self.slots.write().map_err(|_| TriageError::LockFailed)?;

        let Some(slot) = slots.get_mut(&session_id) else {
            tracing::debug!(session = %session_id, "Commit for evicted session, discarding");
            return Ok(false);
        };

        if slot.current_token != token {
            tracing::debug!(
                session = %session_id,
                token,
                current = slot.current_token,
                "Stale analysis result, discarding"
            );
            return Ok(false);
        }

        slot.updated_at = Some(result.analyzed_at);
        slot.last_active = now();
        slot.latest = Some(result);
        Ok(true)
    }

    /// Latest committed result for the session.
    pub fn latest(&self, session_id: &Uuid) -> Result<Option<AnalysisResult>, TriageError> {
        let slots = self.slots.read().map_err(|_| TriageError::LockFailed)?;
        Ok(slots.get(session_id).and_then(|s| s.latest.clone()))
    }

    /// When the latest result was committed.
    pub fn updated_at(&self, session_id: &Uuid) -> Result<Option<NaiveDateTime>, TriageError> {
        let slots = self.slots.read().map_err(|_| TriageError::LockFailed)?;
        Ok(slots.get(session_id).and_then(|s| s.updated_at))
    }

    /// The token of the most recent request, 0 if none.
    pub fn current_token(&self, session_id: &Uuid) -> Result<u64, TriageError> {
        let slots = self.slots.read().map_err(|_| TriageError::LockFailed)?;
        Ok(slots.get(session_id).map(|s| s.current_token).unwrap_or(0))
    }

    /// Drop a session and its result.
    pub fn evict(&self, session_id: &Uuid) -> Result<(), TriageError> {
        let mut slots = self.slots.write().map_err(|_| TriageError::LockFailed)?;
        slots.remove(session_id);
        Ok(())
    }

    /// Drop every session last active at or before `cutoff`, except those in
    /// `keep`. Returns how many were removed.
    pub(crate) fn evict_idle(
        &self,
        cutoff: NaiveDateTime,
        keep: &HashSet<Uuid>,
    ) -> Result<usize, TriageError> {
        let mut slots = self.slots.write().map_err(|_| TriageError::LockFailed)?;
        let before = slots.len();
        slots.retain(|id, slot| keep.contains(id) || slot.last_active > cutoff);
        let removed = before - slots.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = slots.len(), "Evicted idle sessions");
        }
        Ok(removed)
    }

    pub fn session_count(&self) -> Result<usize, TriageError> {
        let slots = self.slots.read().map_err(|_| TriageError::LockFailed)?;
        Ok(slots.len())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::engine::DefaultTriageEngine;
    use crate::triage::normalizer::normalize;
    use crate::triage::types::TriageEngine;

    fn result_for(text: &str) -> AnalysisResult {
        let intake = normalize(text, vec![]).unwrap();
        DefaultTriageEngine::builtin().analyze(&intake).unwrap()
    }

    #[test]
    fn new_store_is_empty() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        assert_eq!(store.session_count().unwrap(), 0);
        assert!(store.latest(&id).unwrap().is_none());
        assert_eq!(store.current_token(&id).unwrap(), 0);
    }

    #[test]
    fn tokens_increase_per_session() {
        let store = SessionStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(store.begin_request(a).unwrap(), 1);
        assert_eq!(store.begin_request(a).unwrap(), 2);
        assert_eq!(store.begin_request(b).unwrap(), 1);
    }

    #[test]
    fn current_token_commit_is_stored() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        let token = store.begin_request(id).unwrap();
        assert!(store.commit(id, token, result_for("rash")).unwrap());
        assert_eq!(store.latest(&id).unwrap().unwrap().category, "skin");
        assert!(store.updated_at(&id).unwrap().is_some());
    }

    #[test]
    fn stale_commit_is_discarded() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        let old = store.begin_request(id).unwrap();
        let new = store.begin_request(id).unwrap();

        assert!(store.commit(id, new, result_for("headache")).unwrap());
        assert!(!store.commit(id, old, result_for("rash")).unwrap());
        assert_eq!(store.latest(&id).unwrap().unwrap().category, "headache");
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ta = store.begin_request(a).unwrap();
        store.commit(a, ta, result_for("chest pain")).unwrap();
        assert!(store.latest(&b).unwrap().is_none());
    }

    #[test]
    fn commit_after_evict_is_discarded() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        let token = store.begin_request(id).unwrap();
        store.evict(&id).unwrap();
        assert!(!store.commit(id, token, result_for("rash")).unwrap());
        assert_eq!(store.session_count().unwrap(), 0);
    }

    #[test]
    fn evict_idle_spares_kept_and_recent_sessions() {
        let store = SessionStore::new();
        let idle = Uuid::new_v4();
        let busy = Uuid::new_v4();
        store.begin_request(idle).unwrap();
        store.begin_request(busy).unwrap();

        let long_ago = now() - chrono::Duration::hours(1);
        assert_eq!(store.evict_idle(long_ago, &HashSet::new()).unwrap(), 0);

        let later = now() + chrono::Duration::seconds(1);
        let keep = HashSet::from([busy]);
        assert_eq!(store.evict_idle(later, &keep).unwrap(), 1);
        assert_eq!(store.session_count().unwrap(), 1);
        assert_eq!(store.current_token(&busy).unwrap(), 1);
        assert_eq!(store.current_token(&idle).unwrap(), 0);
    }
}
