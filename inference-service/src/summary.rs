use crate::medical_vocabulary::ClinicalExtraction;
use crate::soap::SoapNote;

pub const SUMMARY_SYSTEM_PROMPT: &str = "You write short visit summaries for patients. \
Use plain language at a sixth-grade reading level, no abbreviations and no jargon. \
Address the patient directly. Cover what was found, what it means and what to do next. \
Do not add advice that is not in the note.";

pub fn summary_prompt(soap: &SoapNote, patient_name: &str) -> String {
    format!(
        "Patient name: {patient_name}\n\nSubjective: {}\nObjective: {}\nAssessment: {}\nPlan: {}",
        soap.subjective, soap.objective, soap.assessment, soap.plan
    )
}

fn first_name(patient_name: &str) -> &str {
    patient_name.split_whitespace().next().unwrap_or("there")
}

/// Deterministic patient summary built from the note itself.
pub fn fallback_summary(soap: &SoapNote, extraction: &ClinicalExtraction, patient_name: &str) -> String {
    let mut parts = vec![
        format!("Hello {},", first_name(patient_name)),
        format!("Here is a summary of your visit. What we discussed: {}", soap.subjective.trim()),
        format!("What we think is going on: {}", soap.assessment.trim()),
    ];
    if extraction.recommendations.is_empty() {
        parts.push(format!("Next steps: {}", soap.plan.trim()));
    } else {
        parts.push(format!("Next steps: {}.", extraction.recommendations.join(". ")));
    }
    if !extraction.medications.is_empty() {
        parts.push(format!(
            "Medicines mentioned: {}.",
            extraction.medications.join(", ")
        ));
    }
    parts.push(
        "If your symptoms get worse or you have new concerns, contact your doctor.".to_string(),
    );
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_summary_addresses_patient_and_lists_steps() {
        let soap = SoapNote {
            subjective: "Cough for three days.".into(),
            objective: "Clear lungs.".into(),
            assessment: "Upper respiratory infection.".into(),
            plan: "Rest. Fluids.".into(),
        };
        let extraction = ClinicalExtraction {
            medications: vec!["Acetaminophen".into()],
            diagnoses: vec![],
            recommendations: vec!["Rest".into(), "Drink fluids".into()],
        };
        let summary = fallback_summary(&soap, &extraction, "Maria Lopez");
        assert!(summary.starts_with("Hello Maria,"));
        assert!(summary.contains("Next steps: Rest. Drink fluids."));
        assert!(summary.contains("Medicines mentioned: Acetaminophen."));
        assert_eq!(summary, fallback_summary(&soap, &extraction, "Maria Lopez"));
    }
}
