use super::types::{ConditionCategory, ImageFinding, IntakeRecord, SpecialistCandidate, UrgencyLevel};

const REPORT_TITLE: &str = "PRE-DIAGNOSIS REPORT";
const NO_TEXT_PLACEHOLDER: &str = "(none provided - image-only submission)";
const DISCLAIMER: &str = "This summary was produced by rule-based symptom matching and is not a \
                          medical diagnosis. Please review it with a qualified clinician.";

/// Inputs to one report, already resolved by the engine.
pub struct ReportContext<'a> {
    pub intake: &'a IntakeRecord,
    pub category: &'a ConditionCategory,
    pub specialists: &'a [SpecialistCandidate],
    pub urgency: UrgencyLevel,
    pub image_finding: Option<&'a ImageFinding>,
    pub recommendations: &'a [String],
}

/// Render the plain-text clinician hand-off narrative.
///
/// Output depends only on the context, so identical intake always yields
/// byte-identical text. No timestamps or ids are written.
pub fn generate_report(ctx: &ReportContext<'_>) -> String {
    let symptoms = if ctx.intake.has_text() {
        ctx.intake.raw_text()
    } else {
        NO_TEXT_PLACEHOLDER
    };

    let mut lines = vec![
        REPORT_TITLE.to_string(),
        "=".repeat(REPORT_TITLE.len()),
        format!("Reported symptoms: {symptoms}"),
        format!("Symptom category: {}", ctx.category.display_name),
        format!(
            "Primary conditions: {}",
            ctx.category.condition_names().join(", ")
        ),
    ];

    if let Some(top) = ctx.specialists.first() {
        lines.push(format!("Recommended specialist: {}", top.specialization));
    }
    lines.push(format!("Urgency level: {}", ctx.urgency.label()));

    if let Some(finding) = ctx.image_finding {
        let detected: Vec<&str> = finding.detected_conditions.iter().map(String::as_str).collect();
        lines.push(String::new());
        lines.push(format!("Image analysis ({} image(s)):", finding.images_analyzed));
        lines.push(format!("  Confidence: {:.1}%", finding.confidence * 100.0));
        lines.push(format!("  Detected: {}", detected.join(", ")));
        lines.push(format!("  Visual findings: {}", finding.visual_findings.join(", ")));
    }

    if !ctx.recommendations.is_empty() {
        lines.push(String::new());
        lines.push("Recommendations:".to_string());
        lines.extend(ctx.recommendations.iter().map(|r| format!("  - {r}")));
    }

    lines.push(String::new());
    lines.push(DISCLAIMER.to_string());

    let mut report = lines.join("\n");
    report.push('\n');
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::imaging::analyze_images;
    use crate::triage::matcher::match_category;
    use crate::triage::normalizer::normalize;
    use crate::triage::reference::TriageReferenceData;
    use crate::triage::types::ImageBlob;

    fn render(text: &str, files: &[&str], urgency: UrgencyLevel) -> String {
        let reference = TriageReferenceData::builtin();
        let blobs = files.iter().map(|f| ImageBlob::new(*f, vec![1])).collect();
        let intake = normalize(text, blobs).unwrap();
        let m = match_category(intake.tokens(), &reference);
        let finding = analyze_images(intake.attachments(), &m, &reference);
        generate_report(&ReportContext {
            intake: &intake,
            category: m.category,
            specialists: &m.category.specialists,
            urgency,
            image_finding: finding.as_ref(),
            recommendations: &m.category.recommendations,
        })
    }

    #[test]
    fn report_contains_verbatim_text_conditions_specialist_and_urgency() {
        let report = render("Sharp CHEST pain", &[], UrgencyLevel::Immediate);
        assert!(report.starts_with("PRE-DIAGNOSIS REPORT\n"));
        assert!(report.contains("Reported symptoms: Sharp CHEST pain\n"));
        assert!(report.contains("Primary conditions: Angina, Acute coronary syndrome, Costochondritis\n"));
        assert!(report.contains("Recommended specialist: Cardiologist\n"));
        assert!(report.contains("Urgency level: IMMEDIATE\n"));
        assert!(!report.contains("Image analysis"));
    }

    #[test]
    fn urgency_label_has_spaces() {
        let report = render("bad headache", &[], UrgencyLevel::Within24Hrs);
        assert!(report.contains("Urgency level: WITHIN 24HRS\n"));
    }

    #[test]
    fn image_section_has_one_decimal_confidence_and_findings() {
        let report = render("", &["skin.jpg"], UrgencyLevel::Within24Hrs);
        assert!(report.contains("Reported symptoms: (none provided - image-only submission)"));
        assert!(report.contains("  Confidence: 87.0%\n"));
        assert!(report.contains(
            "  Visual findings: Erythematous patch with irregular borders, \
             Mild scaling on the affected surface, No signs of ulceration\n"
        ));
    }

    #[test]
    fn recommendations_listed_in_order() {
        let report = render("rash", &[], UrgencyLevel::Routine);
        let first = report.find("  - Avoid scratching").unwrap();
        let second = report.find("  - Use a fragrance-free").unwrap();
        assert!(first < second);
    }

    #[test]
    fn report_is_deterministic() {
        let a = render("rash on my arm", &["rash.png"], UrgencyLevel::Routine);
        let b = render("rash on my arm", &["rash.png"], UrgencyLevel::Routine);
        assert_eq!(a, b);
    }

    #[test]
    fn sections_separated_by_blank_lines() {
        let report = render("rash", &["rash.png"], UrgencyLevel::Routine);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "PRE-DIAGNOSIS REPORT");
        assert_eq!(lines[1], "=".repeat("PRE-DIAGNOSIS REPORT".len()));
        let image = lines.iter().position(|l| l.starts_with("Image analysis (1 image(s))")).unwrap();
        let recs = lines.iter().position(|l| *l == "Recommendations:").unwrap();
        assert_eq!(lines[image - 1], "");
        assert_eq!(lines[recs - 1], "");
        assert_eq!(*lines.last().unwrap(), DISCLAIMER);
        assert!(report.ends_with(".\n"));
    }
}
