//! Speech-to-text capture as a cancellable event stream.
//!
//! The external recognizer pushes transcript events through a
//! `TranscriptSender`. A background listener folds them into a transcript:
//! interim events update a live preview, final events are appended. Once the
//! capture is stopped (or cancelled, or dropped) the listener deregisters and
//! any later event is rejected with `ListenerClosed`, so a late callback can
//! never reach a record that was already submitted.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::triage::types::TriageError;

/// One recognizer callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum TranscriptEvent {
    /// Partial hypothesis; replaced by the next interim or final event.
    Interim(String),
    /// Settled phrase; appended to the transcript.
    Final(String),
}

/// Handle given to the recognizer for emitting events.
#[derive(Debug, Clone)]
pub struct TranscriptSender {
    tx: mpsc::Sender<TranscriptEvent>,
}

impl TranscriptSender {
    /// Deliver an event. Fails with `ListenerClosed` once the capture stopped.
    pub async fn emit(&self, event: TranscriptEvent) -> Result<(), TriageError> {
        self.tx.send(event).await.map_err(|rejected| {
            tracing::debug!(event = ?rejected.0, "Speech event after listener closed, dropped");
            TriageError::ListenerClosed
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A live listening session.
pub struct SpeechCapture {
    stop_tx: Option<oneshot::Sender<()>>,
    listener: JoinHandle<String>,
    interim: watch::Receiver<String>,
}

impl SpeechCapture {
    /// Start listening. Returns the capture and the sender for the recognizer.
    /// Must be called inside a Tokio runtime.
    pub fn start(buffer: usize) -> (Self, TranscriptSender) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();
        let (interim_tx, interim_rx) = watch::channel(String::new());

        let listener = tokio::spawn(listen(rx, stop_rx, interim_tx));
        tracing::debug!("Speech capture started");

        (
            Self {
                stop_tx: Some(stop_tx),
                listener,
                interim: interim_rx,
            },
            TranscriptSender { tx },
        )
    }

    /// Current interim hypothesis, empty when none is pending.
    pub fn interim(&self) -> String {
        self.interim.borrow().clone()
    }

    /// Stop listening and return the finalized transcript. The listener is
    /// deregistered before this returns.
    pub async fn stop(mut self) -> Result<String, TriageError> {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        let transcript = self
            .listener
            .await
            .map_err(|e| TriageError::TaskFailed(e.to_string()))?;
        tracing::debug!(chars = transcript.len(), "Speech capture stopped");
        Ok(transcript)
    }

    /// Stop listening and discard the transcript.
    pub async fn cancel(mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        self.listener.abort();
        // Cancelled is the expected outcome here.
        let _ = self.listener.await;
        tracing::debug!("Speech capture cancelled");
    }
}

async fn listen(
    mut events: mpsc::Receiver<TranscriptEvent>,
    mut stop: oneshot::Receiver<()>,
    interim: watch::Sender<String>,
) -> String {
    let mut phrases: Vec<String> = Vec::new();

    loop {
        tokio::select! {
            biased;
            // Fires on an explicit stop and when the capture is dropped.
            _ = &mut stop => break,
            event = events.recv() => match event {
                Some(event) => apply(event, &mut phrases, &interim),
                None => break,
            },
        }
    }

    // Deregister, then keep whatever was already delivered before the stop.
    events.close();
    while let Ok(event) = events.try_recv() {
        apply(event, &mut phrases, &interim);
    }
    interim.send_replace(String::new());

    phrases.join(" ")
}

fn apply(event: TranscriptEvent, phrases: &mut Vec<String>, interim: &watch::Sender<String>) {
    match event {
        TranscriptEvent::Interim(text) => {
            interim.send_replace(text);
        }
        TranscriptEvent::Final(text) => {
            let text = text.trim();
            if !text.is_empty() {
                phrases.push(text.to_string());
            }
            interim.send_replace(String::new());
        }
    }
}
