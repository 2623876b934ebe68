use serde::Serialize;

pub const DEFAULT_FALLBACK_COMMENT: &str = "Refer to Class/Head Teacher for overall assessment.";

/// Narrative comment keyed on the summed aggregate (AGGS), not on a score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRange {
    pub start_marks: f64,
    pub end_marks: f64,
    pub comment: String,
}

/// First range containing `aggs`, in the order supplied.
pub fn resolve_comment(aggs: Option<i64>, ranges: &[CommentRange]) -> Option<&str> {
    let aggs = aggs? as f64;
    ranges
        .iter()
        .find(|r| aggs >= r.start_marks && aggs <= r.end_marks)
        .map(|r| r.comment.as_str())
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Range comment, else the general comment entered for the student, else
/// the placeholder.
pub fn comment_with_fallback(
    aggs: Option<i64>,
    ranges: &[CommentRange],
    general: Option<&str>,
    placeholder: &str,
) -> String {
    non_blank(resolve_comment(aggs, ranges))
        .or_else(|| non_blank(general))
        .unwrap_or(placeholder)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges() -> Vec<CommentRange> {
        vec![
            CommentRange {
                start_marks: 4.0,
                end_marks: 12.0,
                comment: "Excellent".to_string(),
            },
            CommentRange {
                start_marks: 13.0,
                end_marks: 24.0,
                comment: "Good".to_string(),
            },
        ]
    }

    #[test]
    fn bracket_lookup_is_inclusive() {
        let r = ranges();
        assert_eq!(resolve_comment(Some(10), &r), Some("Excellent"));
        assert_eq!(resolve_comment(Some(12), &r), Some("Excellent"));
        assert_eq!(resolve_comment(Some(13), &r), Some("Good"));
        assert_eq!(resolve_comment(Some(30), &r), None);
        assert_eq!(resolve_comment(None, &r), None);
    }

    #[test]
    fn fallback_order_is_range_then_general_then_placeholder() {
        let r = ranges();
        assert_eq!(
            comment_with_fallback(Some(10), &r, Some("Keep it up"), DEFAULT_FALLBACK_COMMENT),
            "Excellent"
        );
        assert_eq!(
            comment_with_fallback(Some(40), &r, Some("Keep it up"), DEFAULT_FALLBACK_COMMENT),
            "Keep it up"
        );
        assert_eq!(
            comment_with_fallback(Some(40), &r, Some("   "), DEFAULT_FALLBACK_COMMENT),
            DEFAULT_FALLBACK_COMMENT
        );
        assert_eq!(
            comment_with_fallback(None, &[], None, DEFAULT_FALLBACK_COMMENT),
            DEFAULT_FALLBACK_COMMENT
        );
    }
}
