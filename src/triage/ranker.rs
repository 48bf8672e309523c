use std::cmp::Ordering;

use crate::config::RankingStrategy;

use super::types::{SpecialistCandidate, UrgencyLevel};

/// Availability text written onto every specialist during an emergency escalation.
pub const EMERGENCY_AVAILABILITY: &str = "Emergency - Available now";

/// Order a category's specialists for display.
///
/// With `DeclarationOrder` the list keeps the category's order. When the
/// image escalated the turn to `Immediate` (`emergency == true`), every
/// specialist's urgency and availability are overwritten; order is unchanged.
pub fn rank(
    specialists: &[SpecialistCandidate],
    emergency: bool,
    strategy: RankingStrategy,
) -> Vec<SpecialistCandidate> {
    let mut ranked: Vec<SpecialistCandidate> = specialists.to_vec();

    if strategy == RankingStrategy::RatingThenAvailability {
        // stable sort: full ties keep declaration order
        ranked.sort_by(compare_by_rating);
    }

    if emergency {
        for specialist in &mut ranked {
            specialist.urgency = UrgencyLevel::Immediate;
            specialist.availability = EMERGENCY_AVAILABILITY.to_string();
        }
    }

    ranked
}

/// Rating descending, then available-today first, then name ascending.
fn compare_by_rating(a: &SpecialistCandidate, b: &SpecialistCandidate) -> Ordering {
    b.rating
        .partial_cmp(&a.rating)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.available_today().cmp(&a.available_today()))
        .then_with(|| a.name.cmp(&b.name))
}
