//! Output sizing helpers for generation callers.
//!
//! Pure functions that turn the size of the assembled context into
//! targets a prompt can state: summary length and quiz length.

use serde::Serialize;

/// Target summary length for a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummaryTargets {
    /// Word range, e.g. `"100-200"`.
    pub words: &'static str,
    /// Key-point range, e.g. `"3-4"`.
    pub key_points: &'static str,
}

/// Summary targets scaled to the word count of `text`.
pub fn summary_targets(text: &str) -> SummaryTargets {
    let (words, key_points) = match text.split_whitespace().count() {
        n if n < 100 => ("50-100", "2-3"),
        n if n < 500 => ("100-200", "3-4"),
        n if n < 2000 => ("200-350", "4-5"),
        _ => ("400-600", "5-7"),
    };
    SummaryTargets { words, key_points }
}

/// Number of quiz questions for a context of `context_chars` characters.
pub fn quiz_question_target(context_chars: usize) -> usize {
    if context_chars > 5000 {
        20
    } else if context_chars > 2500 {
        15
    } else {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_summary_targets_thresholds() {
        assert_eq!(summary_targets("").words, "50-100");
        assert_eq!(summary_targets(&words(99)).key_points, "2-3");
        assert_eq!(summary_targets(&words(100)).words, "100-200");
        assert_eq!(summary_targets(&words(499)).key_points, "3-4");
        assert_eq!(summary_targets(&words(500)).words, "200-350");
        assert_eq!(
            summary_targets(&words(2000)),
            SummaryTargets {
                words: "400-600",
                key_points: "5-7"
            }
        );
    }

    #[test]
    fn test_quiz_question_target() {
        assert_eq!(quiz_question_target(0), 10);
        assert_eq!(quiz_question_target(2500), 10);
        assert_eq!(quiz_question_target(2501), 15);
        assert_eq!(quiz_question_target(5000), 15);
        assert_eq!(quiz_question_target(5001), 20);
    }

    #[test]
    fn test_summary_targets_serialize() {
        assert_eq!(
            serde_json::to_value(summary_targets("one two")).unwrap(),
            serde_json::json!({"words": "50-100", "key_points": "2-3"})
        );
    }
}
