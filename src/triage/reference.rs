use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{
    Condition, ConditionCategory, ConditionSeverity, ImageSignal, SpecialistCandidate,
    TriageError, UrgencyLevel,
};

/// Static reference data for triage: the ordered category registry, the
/// fallback key, and the image signals used by the finding simulator.
///
/// Category order is significant. Keyword matching walks `categories`
/// top-to-bottom and the first hit wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageReferenceData {
    pub categories: Vec<ConditionCategory>,
    pub fallback: String,
    pub image_signals: Vec<ImageSignal>,
    pub generic_signal: ImageSignal,
}

impl TriageReferenceData {
    /// Load reference data from a JSON file and validate it.
    pub fn load(path: &Path) -> Result<Self, TriageError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            TriageError::ReferenceDataLoad(path.display().to_string(), e.to_string())
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let data: Self = serde_json::from_str(&json)
            .map_err(|e| TriageError::ReferenceDataParse(name, e.to_string()))?;
        data.validate()?;

        tracing::info!(
            categories = data.categories.len(),
            image_signals = data.image_signals.len(),
            fallback = %data.fallback,
            "Triage reference data loaded"
        );
        Ok(data)
    }

    /// Check the structural guarantees the pipeline relies on.
    pub fn validate(&self) -> Result<(), TriageError> {
        if self.categories.is_empty() {
            return Err(TriageError::InvalidReferenceData(
                "no categories defined".into(),
            ));
        }
        if self.category(&self.fallback).is_none() {
            return Err(TriageError::InvalidReferenceData(format!(
                "fallback category '{}' does not exist",
                self.fallback
            )));
        }
        for category in &self.categories {
            if category.conditions.is_empty() {
                return Err(TriageError::InvalidReferenceData(format!(
                    "category '{}' has no conditions",
                    category.key
                )));
            }
            if category.specialists.is_empty() {
                return Err(TriageError::InvalidReferenceData(format!(
                    "category '{}' has no specialists",
                    category.key
                )));
            }
            if category
                .keywords
                .iter()
                .chain(&category.synonyms)
                .any(|k| k.trim().is_empty())
            {
                return Err(TriageError::InvalidReferenceData(format!(
                    "category '{}' has an empty keyword",
                    category.key
                )));
            }
        }
        for signal in self.image_signals.iter().chain(Some(&self.generic_signal)) {
            if !(0.0..=1.0).contains(&signal.confidence) {
                return Err(TriageError::InvalidReferenceData(format!(
                    "image signal '{}' confidence {} outside 0..=1",
                    signal.key, signal.confidence
                )));
            }
        }
        Ok(())
    }

    /// Look up a category by key.
    pub fn category(&self, key: &str) -> Option<&ConditionCategory> {
        self.categories.iter().find(|c| c.key == key)
    }

    /// The category used when no keyword matches.
    pub fn fallback_category(&self) -> &ConditionCategory {
        // validate() guarantees the fallback exists; builtin data always has it.
        self.category(&self.fallback)
            .unwrap_or_else(|| &self.categories[0])
    }

    /// Keyword bindings in priority order. Within a category, substring
    /// keywords come before whole-token synonyms.
    pub fn keyword_bindings(&self) -> impl Iterator<Item = KeywordBinding<'_>> {
        self.categories.iter().flat_map(|category| {
            let keywords = category.keywords.iter().map(move |k| KeywordBinding {
                keyword: k.as_str(),
                category,
                whole_token: false,
            });
            let synonyms = category.synonyms.iter().map(move |k| KeywordBinding {
                keyword: k.as_str(),
                category,
                whole_token: true,
            });
            keywords.chain(synonyms)
        })
    }

    /// Image signal corroborated by a text category, if any.
    pub fn signal_for_category(&self, category_key: &str) -> Option<&ImageSignal> {
        self.image_signals
            .iter()
            .find(|s| s.category.as_deref() == Some(category_key))
    }

    /// Built-in categories, keyword order and image signals.
    pub fn builtin() -> Self {
        Self {
            categories: vec![
                skin_category(),
                eye_category(),
                chest_category(),
                headache_category(),
                fever_category(),
            ],
            fallback: "fever".into(),
            image_signals: vec![
                ImageSignal {
                    key: "skin".into(),
                    filename_hints: strings(&["skin", "rash", "derm", "mole"]),
                    category: Some("skin".into()),
                    confidence: 0.87,
                    detected_conditions: strings(&["Contact dermatitis", "Skin inflammation"]),
                    visual_findings: strings(&[
                        "Erythematous patch with irregular borders",
                        "Mild scaling on the affected surface",
                        "No signs of ulceration",
                    ]),
                    recommendations: strings(&[
                        "Photograph the area daily to track changes",
                        "See a dermatologist if the area spreads or blisters",
                    ]),
                    urgency: UrgencyLevel::Routine,
                },
                ImageSignal {
                    key: "eye".into(),
                    filename_hints: strings(&["eye", "retina"]),
                    category: Some("eye".into()),
                    confidence: 0.82,
                    detected_conditions: strings(&["Conjunctivitis"]),
                    visual_findings: strings(&[
                        "Diffuse redness of the conjunctiva",
                        "No visible corneal opacity",
                    ]),
                    recommendations: strings(&["Have an eye specialist examine the eye within a day"]),
                    urgency: UrgencyLevel::Within24Hrs,
                },
                ImageSignal {
                    key: "chest".into(),
                    filename_hints: strings(&["xray", "x-ray", "chest"]),
                    category: Some("chest".into()),
                    confidence: 0.91,
                    detected_conditions: strings(&["Possible pulmonary opacity"]),
                    visual_findings: strings(&[
                        "Increased density in the lower lung field",
                        "Cardiac silhouette at the upper limit of normal",
                    ]),
                    recommendations: strings(&["Urgent review of the image by a physician"]),
                    urgency: UrgencyLevel::Immediate,
                },
            ],
            generic_signal: ImageSignal {
                key: "generic".into(),
                filename_hints: Vec::new(),
                category: None,
                confidence: 0.75,
                detected_conditions: strings(&["Visual abnormality detected"]),
                visual_findings: strings(&[
                    "Area of altered color or texture",
                    "Insufficient context for a specific classification",
                ]),
                recommendations: strings(&[
                    "Describe your symptoms in words for a more specific assessment",
                ]),
                urgency: UrgencyLevel::Routine,
            },
        }
    }
}

/// One keyword of the priority list and the category it selects.
#[derive(Debug, Clone, Copy)]
pub struct KeywordBinding<'a> {
    pub keyword: &'a str,
    pub category: &'a ConditionCategory,
    pub whole_token: bool,
}

impl KeywordBinding<'_> {
    /// `text` is the space-joined token list.
    pub fn matches(&self, text: &str, tokens: &[String]) -> bool {
        if self.whole_token {
            tokens.iter().any(|t| t == self.keyword)
        } else {
            text.contains(self.keyword)
        }
    }
}

impl Default for TriageReferenceData {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Built-in categories
// ---------------------------------------------------------------------------

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn condition(name: &str, confidence: f64, severity: ConditionSeverity, description: &str) -> Condition {
    Condition {
        name: name.into(),
        confidence,
        description: description.into(),
        severity,
    }
}

fn specialist(
    name: &str,
    specialization: &str,
    urgency: UrgencyLevel,
    availability: &str,
    rating: f64,
    reasoning: &str,
) -> SpecialistCandidate {
    SpecialistCandidate {
        name: name.into(),
        specialization: specialization.into(),
        urgency,
        reasoning: reasoning.into(),
        availability: availability.into(),
        rating,
    }
}

fn skin_category() -> ConditionCategory {
    ConditionCategory {
        key: "skin".into(),
        display_name: "Skin".into(),
        keywords: strings(&["skin"]),
        synonyms: strings(&["rash", "rashes", "itch", "itchy", "itching"]),
        conditions: vec![
            condition(
                "Contact dermatitis",
                0.72,
                ConditionSeverity::Mild,
                "Skin inflammation caused by contact with an irritant or allergen",
            ),
            condition(
                "Eczema (atopic dermatitis)",
                0.65,
                ConditionSeverity::Moderate,
                "Chronic condition causing dry, itchy and inflamed skin",
            ),
            condition(
                "Psoriasis",
                0.45,
                ConditionSeverity::Moderate,
                "Immune-mediated condition producing scaly, raised plaques",
            ),
        ],
        specialists: vec![
            specialist(
                "Dr. Sarah Mitchell",
                "Dermatologist",
                UrgencyLevel::Routine,
                "Available today",
                4.8,
                "Specializes in inflammatory skin conditions and allergic reactions",
            ),
            specialist(
                "Dr. James Chen",
                "Allergist",
                UrgencyLevel::Routine,
                "Next available: Tomorrow",
                4.6,
                "Can identify allergens behind recurring rashes",
            ),
        ],
        base_urgency: UrgencyLevel::Routine,
        recommendations: strings(&[
            "Avoid scratching the affected area",
            "Use a fragrance-free moisturizer",
            "Note any new products, foods or environments before the symptoms began",
        ]),
    }
}

fn eye_category() -> ConditionCategory {
    ConditionCategory {
        key: "eye".into(),
        display_name: "Eye".into(),
        keywords: strings(&["eye"]),
        synonyms: strings(&["vision"]),
        conditions: vec![
            condition(
                "Conjunctivitis",
                0.70,
                ConditionSeverity::Mild,
                "Inflammation of the membrane covering the white of the eye",
            ),
            condition(
                "Dry eye syndrome",
                0.55,
                ConditionSeverity::Mild,
                "Insufficient tear production causing irritation",
            ),
            condition(
                "Uveitis",
                0.25,
                ConditionSeverity::Severe,
                "Inflammation inside the eye that can threaten vision",
            ),
        ],
        specialists: vec![
            specialist(
                "Dr. Emily Rodriguez",
                "Ophthalmologist",
                UrgencyLevel::Within24Hrs,
                "Available today",
                4.9,
                "Eye specialist able to rule out sight-threatening causes",
            ),
            specialist(
                "Dr. Michael Park",
                "Optometrist",
                UrgencyLevel::Routine,
                "Next available: Tomorrow",
                4.5,
                "Vision testing and management of common eye irritation",
            ),
        ],
        base_urgency: UrgencyLevel::Within24Hrs,
        recommendations: strings(&[
            "Avoid rubbing your eyes",
            "Remove contact lenses until you have been examined",
            "Seek care promptly if your vision changes or pain increases",
        ]),
    }
}

fn chest_category() -> ConditionCategory {
    ConditionCategory {
        key: "chest".into(),
        display_name: "Chest".into(),
        keywords: strings(&["chest"]),
        synonyms: strings(&["heart"]),
        conditions: vec![
            condition(
                "Angina",
                0.68,
                ConditionSeverity::Severe,
                "Chest pain from reduced blood flow to the heart",
            ),
            condition(
                "Acute coronary syndrome",
                0.35,
                ConditionSeverity::Severe,
                "Sudden reduction of blood flow to the heart requiring emergency care",
            ),
            condition(
                "Costochondritis",
                0.30,
                ConditionSeverity::Mild,
                "Inflammation of the cartilage connecting ribs to the breastbone",
            ),
        ],
        specialists: vec![
            specialist(
                "Dr. Robert Williams",
                "Cardiologist",
                UrgencyLevel::Immediate,
                "Emergency - Available now",
                4.9,
                "Chest pain needs prompt cardiac evaluation",
            ),
            specialist(
                "Dr. Kevin Brooks",
                "Emergency Medicine Physician",
                UrgencyLevel::Immediate,
                "Emergency - Available now",
                4.8,
                "Can assess and stabilise acute chest symptoms",
            ),
            specialist(
                "Dr. Lisa Thompson",
                "Pulmonologist",
                UrgencyLevel::Within24Hrs,
                "Available today",
                4.7,
                "Evaluates breathing-related causes of chest discomfort",
            ),
        ],
        base_urgency: UrgencyLevel::Immediate,
        recommendations: strings(&[
            "Call emergency services if pain is severe, spreading, or comes with sweating",
            "Do not drive yourself to the hospital",
            "Rest and avoid exertion until you have been evaluated",
        ]),
    }
}

fn headache_category() -> ConditionCategory {
    ConditionCategory {
        key: "headache".into(),
        display_name: "Headache".into(),
        keywords: strings(&["headache"]),
        synonyms: strings(&["migraine", "migraines"]),
        conditions: vec![
            condition(
                "Tension headache",
                0.75,
                ConditionSeverity::Mild,
                "Band-like pain often linked to stress or posture",
            ),
            condition(
                "Migraine",
                0.60,
                ConditionSeverity::Moderate,
                "Recurring throbbing headache, often with light sensitivity or nausea",
            ),
            condition(
                "Cluster headache",
                0.20,
                ConditionSeverity::Moderate,
                "Severe one-sided headaches occurring in clusters",
            ),
        ],
        specialists: vec![
            specialist(
                "Dr. Amanda Foster",
                "Neurologist",
                UrgencyLevel::Within24Hrs,
                "Next available: Tomorrow",
                4.7,
                "Specializes in headache disorders and migraine management",
            ),
            specialist(
                "Dr. David Kim",
                "General Practitioner",
                UrgencyLevel::Routine,
                "Available today",
                4.5,
                "Can assess common headache causes and refer if needed",
            ),
        ],
        base_urgency: UrgencyLevel::Within24Hrs,
        recommendations: strings(&[
            "Rest in a quiet, dark room",
            "Stay hydrated",
            "Keep a log of headache timing and possible triggers",
        ]),
    }
}

fn fever_category() -> ConditionCategory {
    ConditionCategory {
        key: "fever".into(),
        display_name: "Fever / General".into(),
        keywords: strings(&["fever"]),
        synonyms: strings(&["temperature"]),
        conditions: vec![
            condition(
                "Viral infection",
                0.70,
                ConditionSeverity::Mild,
                "Common viral illness, usually self-limiting",
            ),
            condition(
                "Influenza",
                0.55,
                ConditionSeverity::Moderate,
                "Respiratory infection with fever, aches and fatigue",
            ),
            condition(
                "Bacterial infection",
                0.30,
                ConditionSeverity::Moderate,
                "Infection that may need antibiotic treatment",
            ),
        ],
        specialists: vec![
            specialist(
                "Dr. Jennifer Lee",
                "General Practitioner",
                UrgencyLevel::Within24Hrs,
                "Available today",
                4.6,
                "First point of contact for general symptoms",
            ),
            specialist(
                "Dr. Mark Anderson",
                "Infectious Disease Specialist",
                UrgencyLevel::Within24Hrs,
                "Next available: Tomorrow",
                4.8,
                "Evaluates persistent or unexplained fevers",
            ),
        ],
        base_urgency: UrgencyLevel::Within24Hrs,
        recommendations: strings(&[
            "Rest and stay hydrated",
            "Check your temperature every few hours",
            "Seek care if the fever exceeds 39.4°C (103°F) or lasts more than three days",
        ]),
    }
}
