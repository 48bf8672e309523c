//! Triage service: runs one pipeline turn per submission and writes the
//! result into the session store.
//!
//! Key properties:
//! - One pending turn per session. A new submission aborts the pending one
//!   (last-submission-wins, never first-completion-wins).
//! - Each turn carries the session's request token; the store rejects a
//!   commit whose token is no longer current.
//! - A failed turn commits nothing; the previous result stays visible.
//! - Sessions are held until `end_session` or `evict_idle_sessions`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};
use uuid::Uuid;

use crate::config::TriageConfig;
use crate::intake::{decode_attachments, RawAttachment};
use crate::triage::engine::DefaultTriageEngine;
use crate::triage::normalizer::normalize;
use crate::triage::store::SessionStore;
use crate::triage::types::{AnalysisResult, TriageEngine, TriageError};

type SharedEngine = Arc<dyn TriageEngine + Send + Sync>;
type PendingMap = Arc<Mutex<HashMap<Uuid, (u64, AbortHandle)>>>;

// ═══════════════════════════════════════════════════════════
// PendingAnalysis
// ═══════════════════════════════════════════════════════════

/// A submitted turn awaiting its result.
#[derive(Debug)]
pub struct PendingAnalysis {
    session_id: Uuid,
    token: u64,
    rx: oneshot::Receiver<Result<AnalysisResult, TriageError>>,
    task: JoinHandle<()>,
}

impl PendingAnalysis {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    /// Wait for the turn. `Superseded` if a newer submission replaced it,
    /// `TaskFailed` if the turn panicked.
    pub async fn wait(self) -> Result<AnalysisResult, TriageError> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => match self.task.await {
                Err(e) if e.is_panic() => {
                    tracing::error!(session = %self.session_id, token = self.token, "Triage turn panicked");
                    Err(TriageError::TaskFailed(e.to_string()))
                }
                _ => Err(TriageError::Superseded),
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════
// TriageService
// ═══════════════════════════════════════════════════════════

pub struct TriageService {
    engine: SharedEngine,
    store: Arc<SessionStore>,
    config: TriageConfig,
    pending: PendingMap,
}

impl TriageService {
    pub fn new(engine: SharedEngine, config: TriageConfig) -> Self {
        Self {
            engine,
            store: Arc::new(SessionStore::new()),
            config,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Service over the built-in reference data.
    pub fn with_builtin(config: TriageConfig) -> Self {
        let engine = DefaultTriageEngine::builtin_with(config.ranking);
        Self::new(Arc::new(engine), config)
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    /// Read-only view of the session results.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Latest committed result for a session.
    pub fn latest(&self, session_id: &Uuid) -> Result<Option<AnalysisResult>, TriageError> {
        self.store.latest(session_id)
    }

    /// Start a turn: decode → normalize → simulated delay → analyze → commit.
    ///
    /// Any turn still pending for the session is aborted. Must be called
    /// inside a Tokio runtime.
    pub fn submit(
        &self,
        session_id: Uuid,
        text: impl Into<String>,
        attachments: Vec<RawAttachment>,
    ) -> Result<PendingAnalysis, TriageError> {
        let text = text.into();
        let (tx, rx) = oneshot::channel();

        // Token issue and handle swap share one critical section, so the
        // newest token always owns the pending slot.
        let mut map = self.pending.lock().map_err(|_| TriageError::LockFailed)?;
        let token = self.store.begin_request(session_id)?;

        let engine = Arc::clone(&self.engine);
        let store = Arc::clone(&self.store);
        let pending = Arc::clone(&self.pending);
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            let outcome = run_turn(engine.as_ref(), &config, &text, attachments)
                .await
                .and_then(|result| match store.commit(session_id, token, result.clone()) {
                    Ok(true) => Ok(result),
                    Ok(false) => Err(TriageError::Superseded),
                    Err(e) => Err(e),
                });

            if let Err(e) = &outcome {
                tracing::debug!(session = %session_id, token, error = %e, "Triage turn ended without result");
            }
            clear_pending(&pending, session_id, token);
            let _ = tx.send(outcome);
        });

        let previous = map.insert(session_id, (token, task.abort_handle()));
        drop(map);

        if let Some((old_token, handle)) = previous {
            if !handle.is_finished() {
                tracing::warn!(
                    session = %session_id,
                    superseded = old_token,
                    current = token,
                    "New submission supersedes pending analysis"
                );
            }
            handle.abort();
        }

        Ok(PendingAnalysis {
            session_id,
            token,
            rx,
            task,
        })
    }

    /// Abort the pending turn for a session, if any. The last committed
    /// result stays in place.
    pub fn cancel(&self, session_id: &Uuid) -> Result<bool, TriageError> {
        let mut map = self.pending.lock().map_err(|_| TriageError::LockFailed)?;
        let Some((token, handle)) = map.remove(session_id) else {
            return Ok(false);
        };
        handle.abort();
        // Invalidate the token so a turn racing past abort cannot commit.
        self.store.begin_request(*session_id)?;
        drop(map);

        tracing::debug!(session = %session_id, token, "Pending analysis cancelled");
        Ok(true)
    }

    /// Abort any pending turn and drop the session's stored result.
    pub fn end_session(&self, session_id: &Uuid) -> Result<(), TriageError> {
        self.cancel(session_id)?;
        self.store.evict(session_id)
    }

    /// Drop every session with no running turn whose last request or result
    /// is at least `max_idle` old. Returns how many were removed.
    pub fn evict_idle_sessions(&self, max_idle: Duration) -> Result<usize, TriageError> {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return Ok(0);
        };
        let Some(cutoff) = chrono::Local::now().naive_local().checked_sub_signed(max_idle) else {
            return Ok(0);
        };

        let mut map = self.pending.lock().map_err(|_| TriageError::LockFailed)?;
        map.retain(|_, (_, handle)| !handle.is_finished());
        let running: HashSet<Uuid> = map.keys().copied().collect();
        self.store.evict_idle(cutoff, &running)
    }

    /// Whether a turn is still running for the session.
    pub fn is_pending(&self, session_id: &Uuid) -> Result<bool, TriageError> {
        let map = self.pending.lock().map_err(|_| TriageError::LockFailed)?;
        Ok(map
            .get(session_id)
            .map(|(_, handle)| !handle.is_finished())
            .unwrap_or(false))
    }
}

async fn run_turn(
    engine: &(dyn TriageEngine + Send + Sync),
    config: &TriageConfig,
    text: &str,
    attachments: Vec<RawAttachment>,
) -> Result<AnalysisResult, TriageError> {
    let blobs = decode_attachments(attachments, config).await?;
    let intake = normalize(text, blobs)?;

    let delay = config.delay_for(intake.attachments().len());
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    engine.analyze(&intake)
}

fn clear_pending(pending: &PendingMap, session_id: Uuid, token: u64) {
    if let Ok(mut map) = pending.lock() {
        if map.get(&session_id).map(|(t, _)| *t) == Some(token) {
            map.remove(&session_id);
        }
    }
}
