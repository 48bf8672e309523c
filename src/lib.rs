pub mod config;
pub mod intake; // Attachment decode + speech capture
pub mod service; // Per-session turn orchestration
pub mod triage; // Classification engine

use tracing_subscriber::EnvFilter;

pub use config::{RankingStrategy, TriageConfig};
pub use intake::{RawAttachment, SpeechCapture, TranscriptEvent, TranscriptSender};
pub use service::{PendingAnalysis, TriageService};
pub use triage::{
    AnalysisResult, DefaultTriageEngine, ImageBlob, ImageFinding, IntakeRecord, SessionStore,
    TriageEngine, TriageError, TriageReferenceData, UrgencyLevel,
};

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG`, falling back to `config::default_log_filter()`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}
