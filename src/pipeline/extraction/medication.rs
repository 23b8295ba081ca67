//! Heuristic medication candidates from recognized label text.
//!
//! Precision over recall: a line must mention a dosage unit, a dose form, or a
//! frequency word before it is considered. The first token of a qualifying line
//! is taken as the drug name, so multi-word names are truncated.

use std::sync::LazyLock;

use regex::Regex;

use super::types::MedicationCandidate;

/// Substrings that mark a line as describing a medication.
const MEDICATION_INDICATORS: &[&str] = &["mg", "ml", "tablet", "capsule", "once", "twice", "daily"];

static DOSAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\.?\d*\s*(mg|ml|g|mcg)").expect("valid regex")
});

/// True when the lowercased line contains any indicator substring.
pub fn is_medication_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    MEDICATION_INDICATORS.iter().any(|ind| lower.contains(ind))
}

/// First `<number>[.<digits>][space]<unit>` match, lowercased; empty when absent.
pub fn extract_dosage(line: &str) -> String {
    let lower = line.to_lowercase();
    DOSAGE_RE
        .find(&lower)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Map frequency wording to a canonical phrase. First matching rule wins.
pub fn classify_frequency(line: &str) -> String {
    let lower = line.to_lowercase();
    let phrase = if lower.contains("once") && lower.contains("daily") {
        "Once daily"
    } else if lower.contains("twice") && lower.contains("daily") {
        "Twice daily"
    } else if lower.contains("three times") || lower.contains("tid") {
        "Three times daily"
    } else if lower.contains("four times") || lower.contains("qid") {
        "Four times daily"
    } else {
        ""
    };
    phrase.to_string()
}

/// At most one candidate per non-empty line, in input order.
pub fn extract_candidates(text: &str) -> Vec<MedicationCandidate> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let name = tokens.next()?;
            tokens.next()?;
            if !is_medication_line(line) {
                return None;
            }
            Some(MedicationCandidate {
                name: name.to_string(),
                dosage: extract_dosage(line),
                frequency: classify_frequency(line),
                raw_text: line.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lisinopril_once_daily() {
        let candidates = extract_candidates("Lisinopril 10mg once daily");
        assert_eq!(
            candidates,
            vec![MedicationCandidate {
                name: "Lisinopril".into(),
                dosage: "10mg".into(),
                frequency: "Once daily".into(),
                raw_text: "Lisinopril 10mg once daily".into(),
            }]
        );
    }

    #[test]
    fn address_line_is_not_a_medication() {
        assert!(extract_candidates("Jane Doe 123 Main St").is_empty());
    }

    #[test]
    fn metformin_spaced_dosage() {
        let candidates = extract_candidates("Metformin 500 mg twice daily");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].dosage, "500 mg");
        assert_eq!(candidates[0].frequency, "Twice daily");
    }

    #[test]
    fn aspirin_tid() {
        // "tid" alone carries no indicator substring, so the line needs one more
        let candidates = extract_candidates("Aspirin tablet tid");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].frequency, "Three times daily");
        assert_eq!(candidates[0].dosage, "");
    }

    #[test]
    fn frequency_and_dosage_of_aspirin_tid() {
        assert_eq!(classify_frequency("Aspirin tid"), "Three times daily");
        assert_eq!(extract_dosage("Aspirin tid"), "");
    }

    #[test]
    fn single_token_line_is_skipped() {
        assert!(extract_candidates("Metformin500mg").is_empty());
        assert!(extract_candidates("   daily   ").is_empty());
    }

    #[test]
    fn lines_are_trimmed_and_blank_lines_skipped() {
        let text = "\n   Amoxicillin 250 mg capsule   \n\n\t\nRx# 12345\n";
        let candidates = extract_candidates(text);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Amoxicillin");
        assert_eq!(candidates[0].raw_text, "Amoxicillin 250 mg capsule");
    }

    #[test]
    fn one_candidate_per_line_without_merging() {
        let text = "Lisinopril 10mg once daily\nLisinopril 10mg once daily\nCVS Pharmacy\nWarfarin 2.5mg daily";
        let candidates = extract_candidates(text);
        let names: Vec<_> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Lisinopril", "Lisinopril", "Warfarin"]);
        assert_eq!(candidates[2].dosage, "2.5mg");
        assert_eq!(candidates[2].frequency, "");
    }

    #[test]
    fn indicators_match_case_insensitively() {
        assert!(is_medication_line("TAKE ONE TABLET"));
        assert!(is_medication_line("Dispense 30 ML"));
        assert!(!is_medication_line("Refills: 2"));
    }

    #[test]
    fn indicator_substrings_inside_words_count() {
        // "Smgx" contains "mg": the heuristic is substring-based
        assert!(is_medication_line("Call Smgx pharmacy"));
    }

    #[test]
    fn dosage_units_and_case() {
        assert_eq!(extract_dosage("Vitamin D 1000 MCG"), "1000 mcg");
        assert_eq!(extract_dosage("Cough syrup 5ml"), "5ml");
        assert_eq!(extract_dosage("Powder 2 g sachet"), "2 g");
        assert_eq!(extract_dosage("Levothyroxine 0.125mg"), "0.125mg");
        assert_eq!(extract_dosage("take daily"), "");
    }

    #[test]
    fn dosage_first_match_wins() {
        assert_eq!(extract_dosage("Combo 5mg/325mg tablet"), "5mg");
    }

    #[test]
    fn frequency_rule_order() {
        assert_eq!(classify_frequency("once or twice daily"), "Once daily");
        assert_eq!(classify_frequency("Twice Daily"), "Twice daily");
        assert_eq!(classify_frequency("three times a day"), "Three times daily");
        assert_eq!(classify_frequency("four times a day"), "Four times daily");
        assert_eq!(classify_frequency("take 1 qid"), "Four times daily");
        assert_eq!(classify_frequency("once weekly"), "");
        assert_eq!(classify_frequency("as needed"), "");
    }

    #[test]
    fn tid_substring_matches_inside_words() {
        // "Tidal" contains "tid"
        assert_eq!(classify_frequency("Tidal 5mg"), "Three times daily");
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "Lisinopril 10mg once daily\nMetformin 500 mg twice daily\nfoo bar";
        assert_eq!(extract_candidates(text), extract_candidates(text));
    }

    #[test]
    fn output_never_exceeds_non_empty_lines() {
        let inputs = [
            "",
            "\n\n\n",
            "a mg\nb ml\nc daily\n\nd",
            "x y z\r\nmg mg\r\n",
            "ünïcödé 5mg daily\n💊 tablet once",
        ];
        for text in inputs {
            let non_empty = text.split('\n').filter(|l| !l.trim().is_empty()).count();
            assert!(extract_candidates(text).len() <= non_empty);
        }
    }
}
