//! Image finding simulator.
//!
//! There is no vision model behind this. A finding is derived from
//! attachment filenames and the text category, and every confidence value
//! is a fixed constant from the reference data.
//!
//! Signal priority:
//! 1. the first attachment (in submission order) whose filename contains a
//!    signal hint, signals checked in registry order;
//! 2. the signal corroborated by the keyword-matched text category;
//! 3. the generic low-confidence finding.

use super::matcher::CategoryMatch;
use super::reference::TriageReferenceData;
use super::types::{FindingSource, ImageBlob, ImageFinding, ImageSignal};

/// Derive the finding for an attachment batch. `None` when there are no
/// attachments.
pub fn analyze_images(
    attachments: &[ImageBlob],
    text_context: &CategoryMatch<'_>,
    reference: &TriageReferenceData,
) -> Option<ImageFinding> {
    if attachments.is_empty() {
        return None;
    }

    let (signal, source) = filename_signal(attachments, reference)
        .map(|s| (s, FindingSource::FilenameHint))
        .or_else(|| {
            // A fallback match carries no textual signal.
            if text_context.is_fallback() {
                return None;
            }
            reference
                .signal_for_category(&text_context.category.key)
                .map(|s| (s, FindingSource::TextContext))
        })
        .unwrap_or((&reference.generic_signal, FindingSource::Generic));

    tracing::debug!(
        signal = %signal.key,
        source = ?source,
        images = attachments.len(),
        "Image finding derived"
    );

    Some(build_finding(signal, source, attachments.len()))
}

fn filename_signal<'a>(
    attachments: &[ImageBlob],
    reference: &'a TriageReferenceData,
) -> Option<&'a ImageSignal> {
    attachments.iter().find_map(|attachment| {
        let name = attachment.filename.to_lowercase();
        reference
            .image_signals
            .iter()
            .find(|signal| signal.filename_hints.iter().any(|h| name.contains(h.as_str())))
    })
}

fn build_finding(signal: &ImageSignal, source: FindingSource, images: usize) -> ImageFinding {
    ImageFinding {
        signal: signal.key.clone(),
        source,
        confidence: signal.confidence,
        detected_conditions: signal.detected_conditions.iter().cloned().collect(),
        visual_findings: signal.visual_findings.clone(),
        recommendations: signal.recommendations.clone(),
        urgency: signal.urgency,
        images_analyzed: images,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::matcher::match_category;
    use crate::triage::normalizer::tokenize;
    use crate::triage::types::UrgencyLevel;

    fn blob(name: &str) -> ImageBlob {
        ImageBlob::new(name, vec![1, 2, 3])
    }

    fn finding(text: &str, files: &[&str]) -> Option<ImageFinding> {
        let reference = TriageReferenceData::builtin();
        let tokens = tokenize(&text.to_lowercase());
        let m = match_category(&tokens, &reference);
        let blobs: Vec<ImageBlob> = files.iter().map(|f| blob(f)).collect();
        analyze_images(&blobs, &m, &reference)
    }

    #[test]
    fn no_attachments_no_finding() {
        assert!(finding("rash on my arm", &[]).is_none());
    }

    #[test]
    fn skin_filename_gives_dermatitis_at_fixed_confidence() {
        let f = finding("just a general checkup", &["my_skin_photo.jpg"]).unwrap();
        assert_eq!(f.confidence, 0.87);
        assert!(f.detected_conditions.contains("Contact dermatitis"));
        assert_eq!(f.urgency, UrgencyLevel::Routine);
        assert_eq!(f.source, FindingSource::FilenameHint);
    }

    #[test]
    fn filename_hint_is_case_insensitive() {
        let f = finding("", &["IMG_RASH_01.PNG"]).unwrap();
        assert_eq!(f.signal, "skin");
    }

    #[test]
    fn text_context_used_without_filename_hint() {
        let f = finding("my eye is red and sore", &["IMG_0001.jpg"]).unwrap();
        assert_eq!(f.signal, "eye");
        assert_eq!(f.confidence, 0.82);
        assert_eq!(f.source, FindingSource::TextContext);
    }

    #[test]
    fn filename_beats_text_context() {
        let f = finding("my eye hurts", &["chest_xray.png"]).unwrap();
        assert_eq!(f.signal, "chest");
        assert_eq!(f.urgency, UrgencyLevel::Immediate);
    }

    #[test]
    fn first_hinted_attachment_wins() {
        let f = finding("", &["IMG_0001.jpg", "eye_closeup.jpg", "rash.jpg"]).unwrap();
        assert_eq!(f.signal, "eye");
        assert_eq!(f.images_analyzed, 3);
    }

    #[test]
    fn no_signal_gives_generic_finding() {
        let f = finding("", &["IMG_0001.jpg"]).unwrap();
        assert_eq!(f.confidence, 0.75);
        assert!(f.detected_conditions.contains("Visual abnormality detected"));
        assert_eq!(f.urgency, UrgencyLevel::Routine);
        assert_eq!(f.source, FindingSource::Generic);
    }

    #[test]
    fn fallback_text_is_not_a_signal() {
        // fever has no image signal and the fallback carries no text signal
        let f = finding("just a general checkup", &["IMG_0001.jpg"]).unwrap();
        assert_eq!(f.signal, "generic");
    }

    #[test]
    fn identical_inputs_identical_findings() {
        let a = finding("skin", &["a.jpg"]).unwrap();
        let b = finding("skin", &["a.jpg"]).unwrap();
        assert_eq!(a, b);
    }
}
