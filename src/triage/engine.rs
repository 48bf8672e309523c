use std::time::Instant;

use uuid::Uuid;

use crate::config::RankingStrategy;

use super::imaging::analyze_images;
use super::matcher::{match_category, recognized_keywords};
use super::ranker::rank;
use super::reference::TriageReferenceData;
use super::report::{generate_report, ReportContext};
use super::types::{AnalysisResult, IntakeRecord, TriageEngine, TriageError};
use super::urgency::{escalated_to_emergency, resolve_urgency};

/// Prepended to the recommendations when an image escalates the turn.
pub const EMERGENCY_RECOMMENDATION: &str =
    "Seek emergency care now: the attached image suggests a condition that needs immediate attention";

/// Default implementation of the triage engine.
/// Runs the matcher, image simulator, urgency resolver, ranker and report
/// generator in order. Holds no per-turn state.
pub struct DefaultTriageEngine {
    pub(crate) reference: TriageReferenceData,
    pub(crate) ranking: RankingStrategy,
}

impl DefaultTriageEngine {
    /// Engine over caller-supplied reference data, validated up front.
    pub fn new(reference: TriageReferenceData, ranking: RankingStrategy) -> Result<Self, TriageError> {
        reference.validate()?;
        Ok(Self { reference, ranking })
    }

    /// Engine over the built-in reference data with declaration-order ranking.
    pub fn builtin() -> Self {
        Self::builtin_with(RankingStrategy::DeclarationOrder)
    }

    /// Built-in reference data with the given ranking strategy.
    pub fn builtin_with(ranking: RankingStrategy) -> Self {
        Self {
            reference: TriageReferenceData::builtin(),
            ranking,
        }
    }

    pub fn reference(&self) -> &TriageReferenceData {
        &self.reference
    }
}

impl TriageEngine for DefaultTriageEngine {
    fn analyze(&self, intake: &IntakeRecord) -> Result<AnalysisResult, TriageError> {
        let start = Instant::now();

        let matched = match_category(intake.tokens(), &self.reference);
        let category = matched.category;

        let image_finding = analyze_images(intake.attachments(), &matched, &self.reference);
        let urgency = resolve_urgency(category, image_finding.as_ref());
        let emergency = escalated_to_emergency(category, urgency);
        let specialists = rank(&category.specialists, emergency, self.ranking);

        let mut recommendations = Vec::new();
        if emergency {
            recommendations.push(EMERGENCY_RECOMMENDATION.to_string());
        }
        let image_recommendations = image_finding
            .iter()
            .flat_map(|f| f.recommendations.iter());
        for recommendation in category.recommendations.iter().chain(image_recommendations) {
            if !recommendations.contains(recommendation) {
                recommendations.push(recommendation.clone());
            }
        }

        let report = generate_report(&ReportContext {
            intake,
            category,
            specialists: &specialists,
            urgency,
            image_finding: image_finding.as_ref(),
            recommendations: &recommendations,
        });

        let mut symptoms = recognized_keywords(intake.tokens(), &self.reference);
        if symptoms.is_empty() && intake.has_text() {
            symptoms.insert(intake.raw_text().to_string());
        }

        let processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            category = %category.key,
            fallback = matched.is_fallback(),
            urgency = urgency.as_str(),
            attachments = intake.attachments().len(),
            escalated = emergency,
            processing_ms = processing_time_ms,
            "Triage analysis complete"
        );

        Ok(AnalysisResult {
            id: Uuid::new_v4(),
            category: category.key.clone(),
            symptoms,
            possible_conditions: category.conditions.clone(),
            recommended_specialists: specialists,
            urgency_level: urgency,
            recommendations,
            report,
            image_finding,
            analyzed_at: chrono::Local::now().naive_local(),
            processing_time_ms,
        })
    }
}
