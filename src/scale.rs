use crate::marks::Mark;
use serde::Serialize;
use std::cmp::Ordering;

/// One row of a school's grading scale as supplied by the collaborators.
/// `start_marks` is frequently left out and derived from the row below.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingRow {
    pub start_marks: Option<f64>,
    pub end_marks: f64,
    pub grade: i64,
    pub comment: String,
}

/// A grading row with both bounds resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingBand {
    pub start_marks: f64,
    pub end_marks: f64,
    pub grade: i64,
    pub comment: String,
}

impl GradingBand {
    fn contains(&self, score: f64) -> bool {
        score >= self.start_marks && score <= self.end_marks
    }
}

fn by_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Fills in missing lower bounds: after sorting by `end_marks`, the first row
/// starts at 0 and every other row at the previous row's end + 1.
pub fn derive_bands(rows: &[GradingRow]) -> Vec<GradingBand> {
    let mut by_end: Vec<&GradingRow> = rows.iter().collect();
    by_end.sort_by(|a, b| by_f64(a.end_marks, b.end_marks));

    let mut bands = Vec::with_capacity(by_end.len());
    for (i, row) in by_end.iter().enumerate() {
        let start_marks = match row.start_marks {
            Some(v) => v,
            None if i == 0 => 0.0,
            None => by_end[i - 1].end_marks + 1.0,
        };
        bands.push(GradingBand {
            start_marks,
            end_marks: row.end_marks,
            grade: row.grade,
            comment: row.comment.clone(),
        });
    }
    bands
}

/// Bracket lookup over a grading scale. Bands are kept in ascending
/// `start_marks` order; the first band containing the score wins.
#[derive(Debug, Clone, Default)]
pub struct GradingScale {
    bands: Vec<GradingBand>,
}

impl GradingScale {
    pub fn new(rows: &[GradingRow]) -> Self {
        let mut bands = derive_bands(rows);
        bands.sort_by(|a, b| by_f64(a.start_marks, b.start_marks));
        Self { bands }
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    #[cfg(test)]
    pub fn bands(&self) -> &[GradingBand] {
        &self.bands
    }

    pub fn band_for(&self, score: Option<Mark>) -> Option<&GradingBand> {
        let score = score?.countable()?;
        self.bands.iter().find(|b| b.contains(score))
    }

    pub fn aggregate(&self, score: Option<Mark>) -> Option<i64> {
        self.band_for(score).map(|b| b.grade)
    }

    /// Electives never carry remarks, whatever they scored.
    pub fn remarks(&self, score: Option<Mark>, is_compulsory: bool) -> String {
        if !is_compulsory {
            return String::new();
        }
        self.band_for(score)
            .map(|b| b.comment.clone())
            .unwrap_or_default()
    }
}

pub fn get_aggregate_from_grading_rows(score: Option<Mark>, rows: &[GradingRow]) -> Option<i64> {
    GradingScale::new(rows).aggregate(score)
}

pub fn calculate_remarks(score: Option<Mark>, rows: &[GradingRow], is_compulsory: bool) -> String {
    GradingScale::new(rows).remarks(score, is_compulsory)
}
