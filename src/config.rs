//! Crate-level constants and runtime configuration for the triage pipeline.
//!
//! `TriageConfig` carries the simulated analysis latency, attachment limits,
//! the speech event buffer and the specialist ordering strategy. Values come
//! from `Default` and can be overridden from the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "SymptomTriage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable names read by `TriageConfig::from_env`.
pub const ENV_ANALYSIS_DELAY_MS: &str = "TRIAGE_ANALYSIS_DELAY_MS";
pub const ENV_IMAGE_DELAY_MS: &str = "TRIAGE_IMAGE_DELAY_MS";
pub const ENV_MAX_ATTACHMENTS: &str = "TRIAGE_MAX_ATTACHMENTS";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "symptom_triage=debug,warn"
    } else {
        "symptom_triage=info,warn"
    }
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// How recommended specialists are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankingStrategy {
    /// Keep the order the category declares its specialists in.
    #[default]
    DeclarationOrder,
    /// Rating descending, then "available today", then name ascending.
    RatingThenAvailability,
}

/// Runtime configuration for the triage pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Simulated model latency for text-only submissions.
    pub analysis_delay: Duration,
    /// Simulated model latency when images are attached.
    pub image_analysis_delay: Duration,
    /// Maximum number of attachments accepted per submission.
    pub max_attachments: usize,
    /// Maximum size of a single attachment in bytes.
    pub max_attachment_bytes: usize,
    /// Capacity of the speech transcript event channel.
    pub speech_buffer: usize,
    pub ranking: RankingStrategy,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            analysis_delay: Duration::from_millis(2000),
            image_analysis_delay: Duration::from_millis(3000),
            max_attachments: 10,
            max_attachment_bytes: 10 * 1024 * 1024,
            speech_buffer: 32,
            ranking: RankingStrategy::DeclarationOrder,
        }
    }
}

impl TriageConfig {
    /// Defaults overridden by `TRIAGE_*` environment variables.
    /// Malformed values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_parse::<u64>(ENV_ANALYSIS_DELAY_MS) {
            config.analysis_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>(ENV_IMAGE_DELAY_MS) {
            config.image_analysis_delay = Duration::from_millis(ms);
        }
        if let Some(max) = env_parse::<usize>(ENV_MAX_ATTACHMENTS) {
            config.max_attachments = max;
        }
        config
    }

    /// Delay applied before results are released for a turn.
    pub fn delay_for(&self, attachment_count: usize) -> Duration {
        if attachment_count > 0 {
            self.image_analysis_delay
        } else {
            self.analysis_delay
        }
    }

    /// Config with no simulated latency (tests, batch use).
    pub fn immediate() -> Self {
        Self {
            analysis_delay: Duration::ZERO,
            image_analysis_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring malformed configuration value");
            None
        }
    }
}
