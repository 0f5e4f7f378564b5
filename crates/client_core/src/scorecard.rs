//! Pure transform from an evaluator scorecard to display rows.

use shared::protocol::Scorecard;

const CATEGORY_LABELS: &[(&str, &str)] = &[
    ("problem_understanding", "Problem Understanding"),
    ("logical_correctness", "Logical Correctness"),
    ("code_quality", "Code Quality"),
    ("optimization", "Optimization"),
    ("communication", "Communication"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub key: String,
    pub label: String,
    /// `score/max`
    pub score_text: String,
    pub percent: f64,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScorecardView {
    pub verdict: String,
    /// Styling class only.
    pub verdict_slug: String,
    pub total_text: String,
    pub rows: Vec<ScoreRow>,
    pub summary: String,
}

pub fn transform(scorecard: &Scorecard) -> ScorecardView {
    let rows = scorecard
        .scores
        .iter()
        .map(|(key, category)| ScoreRow {
            key: key.clone(),
            label: category_label(key).to_string(),
            score_text: format!("{}/{}", category.score, category.max),
            percent: percent(category.score, category.max),
            feedback: category.feedback.clone(),
        })
        .collect();

    ScorecardView {
        verdict: scorecard.overall.clone(),
        verdict_slug: verdict_slug(&scorecard.overall),
        total_text: format!("{} / {}", scorecard.total, scorecard.max_total),
        rows,
        summary: scorecard.summary.clone(),
    }
}

/// Display label for a known category, or the raw key.
pub fn category_label(key: &str) -> &str {
    CATEGORY_LABELS
        .iter()
        .find(|(known, _)| *known == key)
        .map_or(key, |(_, label)| *label)
}

/// Lowercased verdict with whitespace runs collapsed to single hyphens.
pub fn verdict_slug(verdict: &str) -> String {
    verdict
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

// Not clamped: the evaluator is trusted to keep score <= max.
fn percent(score: f64, max: f64) -> f64 {
    if max > 0.0 {
        score / max * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::ScoreCategory;

    fn category(score: f64, max: f64, feedback: &str) -> ScoreCategory {
        ScoreCategory {
            score,
            max,
            feedback: feedback.to_string(),
        }
    }

    fn sample() -> Scorecard {
        Scorecard {
            overall: "Strong Hire".to_string(),
            total: 18.0,
            max_total: 20.0,
            scores: vec![
                ("communication".to_string(), category(5.0, 5.0, "crisp")),
                ("problem_understanding".to_string(), category(4.0, 5.0, "asked good questions")),
                ("system_design".to_string(), category(3.0, 4.0, "ok")),
                ("code_quality".to_string(), category(6.0, 6.0, "clean")),
            ],
            summary: "Solid round.".to_string(),
        }
    }

    #[test]
    fn rows_follow_input_order_and_count() {
        let view = transform(&sample());
        let keys: Vec<_> = view.rows.iter().map(|row| row.key.as_str()).collect();
        assert_eq!(
            keys,
            ["communication", "problem_understanding", "system_design", "code_quality"]
        );
    }

    #[test]
    fn percent_is_exact_ratio() {
        let view = transform(&sample());
        assert_eq!(view.rows[0].percent, 100.0);
        assert_eq!(view.rows[1].percent, 4.0 / 5.0 * 100.0);
        assert_eq!(view.rows[2].percent, 75.0);
        assert_eq!(view.rows[1].score_text, "4/5");
    }

    #[test]
    fn unknown_categories_keep_raw_key() {
        let view = transform(&sample());
        assert_eq!(view.rows[1].label, "Problem Understanding");
        assert_eq!(view.rows[2].label, "system_design");
    }

    #[test]
    fn verdict_slug_and_totals() {
        let view = transform(&sample());
        assert_eq!(view.verdict_slug, "strong-hire");
        assert_eq!(view.total_text, "18 / 20");
        assert_eq!(verdict_slug("  Lean   No\tHire "), "lean-no-hire");
    }

    #[test]
    fn zero_max_yields_zero_percent() {
        let mut scorecard = sample();
        scorecard.scores = vec![("communication".to_string(), category(0.0, 0.0, ""))];
        assert_eq!(transform(&scorecard).rows[0].percent, 0.0);
    }
}
