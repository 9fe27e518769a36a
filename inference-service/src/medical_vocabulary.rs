//! Fixed clinical vocabulary used to pull medication, diagnosis and
//! recommendation lists out of transcripts and notes.
//!
//! Plain keyword lexicon, no NLP: deterministic and offline.

use serde::{Deserialize, Serialize};

/// Category of medical term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermCategory {
    Diagnosis,
    Medication,
}

/// Medical term detected in text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedTerm {
    pub term: String,
    pub category: TermCategory,
    /// ICD-10 for diagnoses.
    pub code: Option<String>,
}

/// Lists attached to a clinical note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalExtraction {
    pub medications: Vec<String>,
    pub diagnoses: Vec<String>,
    pub recommendations: Vec<String>,
}

struct DiagnosisEntry {
    name: &'static str,
    aliases: &'static [&'static str],
    icd10: &'static str,
}

const MEDICATIONS: &[&str] = &[
    "acetaminophen", "paracetamol", "ibuprofen", "naproxen", "aspirin", "amoxicillin",
    "azithromycin", "doxycycline", "cephalexin", "metformin", "insulin", "glipizide",
    "lisinopril", "losartan", "amlodipine", "hydrochlorothiazide", "metoprolol",
    "atorvastatin", "simvastatin", "omeprazole", "pantoprazole", "albuterol",
    "fluticasone", "prednisone", "levothyroxine", "sertraline", "fluoxetine",
    "gabapentin", "sumatriptan", "nitroglycerin", "cetirizine", "loratadine",
    "warfarin", "apixaban",
];

const DIAGNOSES: &[DiagnosisEntry] = &[
    DiagnosisEntry { name: "Hypertension", aliases: &["hypertension", "high blood pressure"], icd10: "I10" },
    DiagnosisEntry { name: "Type 2 diabetes mellitus", aliases: &["type 2 diabetes", "diabetes"], icd10: "E11.9" },
    DiagnosisEntry { name: "Hyperlipidemia", aliases: &["hyperlipidemia", "high cholesterol"], icd10: "E78.5" },
    DiagnosisEntry { name: "Asthma", aliases: &["asthma"], icd10: "J45.909" },
    DiagnosisEntry { name: "Chronic obstructive pulmonary disease", aliases: &["copd", "chronic obstructive pulmonary disease"], icd10: "J44.9" },
    DiagnosisEntry { name: "Upper respiratory infection", aliases: &["upper respiratory infection", "uri", "common cold"], icd10: "J06.9" },
    DiagnosisEntry { name: "Pneumonia", aliases: &["pneumonia"], icd10: "J18.9" },
    DiagnosisEntry { name: "Acute bronchitis", aliases: &["bronchitis"], icd10: "J20.9" },
    DiagnosisEntry { name: "Influenza", aliases: &["influenza", "flu"], icd10: "J11.1" },
    DiagnosisEntry { name: "COVID-19", aliases: &["covid", "covid-19"], icd10: "U07.1" },
    DiagnosisEntry { name: "Urinary tract infection", aliases: &["urinary tract infection", "uti"], icd10: "N39.0" },
    DiagnosisEntry { name: "Migraine", aliases: &["migraine"], icd10: "G43.909" },
    DiagnosisEntry { name: "Tension-type headache", aliases: &["tension headache", "tension-type headache"], icd10: "G44.209" },
    DiagnosisEntry { name: "Gastroesophageal reflux disease", aliases: &["gerd", "acid reflux", "gastroesophageal reflux"], icd10: "K21.9" },
    DiagnosisEntry { name: "Angina pectoris", aliases: &["angina"], icd10: "I20.9" },
    DiagnosisEntry { name: "Heart failure", aliases: &["heart failure", "chf"], icd10: "I50.9" },
    DiagnosisEntry { name: "Low back pain", aliases: &["low back pain", "lower back pain"], icd10: "M54.5" },
    DiagnosisEntry { name: "Hypothyroidism", aliases: &["hypothyroidism"], icd10: "E03.9" },
    DiagnosisEntry { name: "Depression", aliases: &["depression"], icd10: "F32.9" },
    DiagnosisEntry { name: "Anxiety disorder", aliases: &["anxiety"], icd10: "F41.9" },
];

const RECOMMENDATION_CUES: &[&str] = &[
    "recommend", "should", "follow up", "follow-up", "return", "avoid", "continue",
    "start", "stop", "take", "schedule", "increase", "reduce", "monitor", "rest",
    "drink", "seek", "order", "obtain", "consider", "review",
];

const MAX_RECOMMENDATIONS: usize = 6;

/// Standard medical vocabulary
pub struct MedicalVocabulary;

impl MedicalVocabulary {
    /// Get common medical abbreviations
    pub fn common_abbreviations() -> &'static [(&'static str, &'static str)] {
        &[
            ("bp", "blood pressure"),
            ("hr", "heart rate"),
            ("rr", "respiratory rate"),
            ("spo2", "oxygen saturation"),
            ("bid", "twice daily"),
            ("tid", "three times daily"),
            ("qid", "four times daily"),
            ("qd", "once daily"),
            ("prn", "as needed"),
            ("po", "by mouth"),
            ("sob", "shortness of breath"),
            ("htn", "hypertension"),
            ("dm2", "type 2 diabetes"),
            ("mi", "myocardial infarction"),
        ]
    }

    /// Expand medical abbreviations, whole words only.
    pub fn expand_abbreviations(text: &str) -> String {
        text.split(' ')
            .map(|word| {
                let core = word.trim_matches(|c: char| !c.is_alphanumeric());
                let lower = core.to_lowercase();
                match Self::common_abbreviations().iter().find(|(a, _)| *a == lower) {
                    Some((_, full)) if !core.is_empty() => word.replacen(core, full, 1),
                    _ => word.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Detect medical terms in text
    pub fn detect_terms(text: &str) -> Vec<DetectedTerm> {
        let lower = Self::expand_abbreviations(text).to_lowercase();
        let medications = MEDICATIONS
            .iter()
            .filter(|m| contains_word(&lower, m))
            .map(|m| DetectedTerm {
                term: capitalize(m),
                category: TermCategory::Medication,
                code: None,
            });
        let diagnoses = DIAGNOSES
            .iter()
            .filter(|d| d.aliases.iter().any(|a| contains_word(&lower, a)))
            .map(|d| DetectedTerm {
                term: d.name.to_string(),
                category: TermCategory::Diagnosis,
                code: Some(d.icd10.to_string()),
            });
        medications.chain(diagnoses).collect()
    }

    /// Medications and diagnoses from the transcript plus the assessment,
    /// recommendations from the plan.
    pub fn extract(transcript: &str, assessment: &str, plan: &str) -> ClinicalExtraction {
        let combined = format!("{transcript}\n{assessment}\n{plan}");
        let mut extraction = ClinicalExtraction::default();
        for term in Self::detect_terms(&combined) {
            match term.category {
                TermCategory::Medication => extraction.medications.push(term.term),
                TermCategory::Diagnosis => extraction.diagnoses.push(match term.code {
                    Some(code) => format!("{} ({code})", term.term),
                    None => term.term,
                }),
            }
        }
        extraction.recommendations = Self::recommendations(plan);
        extraction
    }

    /// Plan sentences containing an action cue; all plan sentences when none do.
    pub fn recommendations(plan: &str) -> Vec<String> {
        let sentences: Vec<String> = plan
            .split(['.', ';', '\n'])
            .map(|s| s.trim().trim_start_matches(['-', '*', ' ']).trim())
            .filter(|s| s.len() > 2)
            .map(str::to_string)
            .collect();
        let cued: Vec<String> = sentences
            .iter()
            .filter(|s| {
                let lower = s.to_lowercase();
                RECOMMENDATION_CUES.iter().any(|c| contains_word(&lower, c))
            })
            .cloned()
            .collect();
        let chosen = if cued.is_empty() { sentences } else { cued };
        chosen.into_iter().take(MAX_RECOMMENDATIONS).collect()
    }
}

/// Substring match bounded by non-alphanumeric characters on both sides.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack.get(..start).and_then(|s| s.chars().next_back());
        let after = haystack.get(start + needle.len()..).and_then(|s| s.chars().next());
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_whole_words_only() {
        assert_eq!(
            MedicalVocabulary::expand_abbreviations("BP 140/90, take it PRN. Hrm."),
            "blood pressure 140/90, take it as needed. Hrm."
        );
    }

    #[test]
    fn detects_medications_and_diagnoses() {
        let terms = MedicalVocabulary::detect_terms(
            "History of HTN, on lisinopril 10mg. Takes Ibuprofen for flu symptoms.",
        );
        let names: Vec<_> = terms.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(names, vec!["Ibuprofen", "Lisinopril", "Hypertension", "Influenza"]);
    }

    #[test]
    fn word_boundaries_prevent_false_positives() {
        // "fluid" must not match "flu", "curious" must not match "uri".
        let terms = MedicalVocabulary::detect_terms("drink fluids, curious about results");
        assert!(terms.is_empty());
    }

    #[test]
    fn extraction_formats_codes_and_recommendations() {
        let extraction = MedicalVocabulary::extract(
            "I have asthma and use albuterol.",
            "Asthma exacerbation.",
            "Continue albuterol as needed. Patient is stable. Follow up in 2 weeks.",
        );
        assert_eq!(extraction.medications, vec!["Albuterol"]);
        assert_eq!(extraction.diagnoses, vec!["Asthma (J45.909)"]);
        assert_eq!(
            extraction.recommendations,
            vec!["Continue albuterol as needed", "Follow up in 2 weeks"]
        );
    }

    #[test]
    fn plan_without_cues_is_kept_whole() {
        assert_eq!(
            MedicalVocabulary::recommendations("Watchful waiting. Diet changes."),
            vec!["Watchful waiting", "Diet changes"]
        );
    }
}
