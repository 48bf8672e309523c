//! Triage classification engine.
//!
//! Free text and image attachments in, a structured pre-diagnosis
//! `AnalysisResult` out. Pipeline per turn:
//! normalizer → matcher → imaging → urgency → ranker → report.

pub mod engine;
pub mod imaging;
pub mod matcher;
pub mod normalizer;
pub mod ranker;
pub mod reference;
pub mod report;
pub mod store;
pub mod types;
pub mod urgency;

pub use engine::DefaultTriageEngine;
pub use normalizer::normalize;
pub use reference::TriageReferenceData;
pub use store::SessionStore;
pub use types::*;
