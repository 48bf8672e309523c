use super::types::{ConditionCategory, ImageFinding, UrgencyLevel};

/// Merge the text-derived base urgency with an optional image finding.
///
/// The image can only raise urgency, never lower it: an image-derived
/// `Immediate` always wins, and the result is never below either input.
pub fn resolve_urgency(category: &ConditionCategory, image_finding: Option<&ImageFinding>) -> UrgencyLevel {
    match image_finding {
        Some(finding) => category.base_urgency.max(finding.urgency),
        None => category.base_urgency,
    }
}

/// Whether the image pushed the turn into `Immediate` on its own.
pub fn escalated_to_emergency(category: &ConditionCategory, resolved: UrgencyLevel) -> bool {
    resolved == UrgencyLevel::Immediate && category.base_urgency < UrgencyLevel::Immediate
}
