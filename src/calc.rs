use crate::ingest::{Attribution, CaRecord, ScoreRecord, Subject};
use crate::marks::{
    format_mark_display, format_number, round_half_up, serialize_opt_number, Mark,
};
use crate::scale::GradingScale;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Subject and teacher lookups the row builders need.
pub trait Reference {
    fn subject(&self, id: &str) -> Subject;
    fn initials(&self, attribution: &Attribution) -> String;
}

/// VB6-style 1-decimal rounding: `Int(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

fn display_opt(v: Option<f64>) -> String {
    v.map(format_number).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaDisplay {
    pub classwork: String,
    pub homework: String,
    pub organisation: String,
    pub participation: String,
    pub self_management: String,
    pub total: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaRow {
    pub subject_id: String,
    pub subject_name: String,
    pub classwork: Option<Mark>,
    pub homework: Option<Mark>,
    pub organisation: Option<Mark>,
    pub participation: Option<Mark>,
    pub self_management: Option<Mark>,
    #[serde(serialize_with = "serialize_opt_number")]
    pub total: Option<f64>,
    pub initials: String,
    pub is_compulsory: bool,
    pub display: CaDisplay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegularDisplay {
    pub score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegularRow {
    pub subject_id: String,
    pub subject_name: String,
    pub score: Option<Mark>,
    pub aggregate: Option<i64>,
    pub remarks: String,
    pub initials: String,
    pub is_compulsory: bool,
    pub display: RegularDisplay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegratedDisplay {
    pub ca: String,
    pub mid: String,
    pub eot: String,
    pub total: String,
    pub average: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegratedRow {
    pub subject_id: String,
    pub subject_name: String,
    pub ca: Option<Mark>,
    pub mid: Option<Mark>,
    pub eot: Option<Mark>,
    #[serde(serialize_with = "serialize_opt_number")]
    pub total: Option<f64>,
    #[serde(serialize_with = "serialize_opt_number")]
    pub average: Option<f64>,
    pub aggregate: Option<i64>,
    pub remarks: String,
    pub initials: String,
    pub is_compulsory: bool,
    pub display: IntegratedDisplay,
}

/// Sum of the entered, non-exempt components; `None` when there are none.
/// A zero component is a real mark and is counted.
pub fn ca_total(components: &[Option<Mark>]) -> Option<f64> {
    let valid: Vec<f64> = components
        .iter()
        .filter_map(|c| c.and_then(Mark::countable))
        .collect();
    if valid.is_empty() {
        None
    } else {
        Some(valid.iter().sum())
    }
}

/// `(total, average)` for one subject's CA/MID/EOT marks. The total skips
/// absent and exempt marks; the average counts exempt marks as zero.
pub fn integrated_totals(scores: [Option<Mark>; 3]) -> (Option<f64>, Option<f64>) {
    let valid: Vec<f64> = scores
        .iter()
        .filter_map(|s| s.and_then(Mark::countable))
        .collect();
    let total = if valid.is_empty() {
        None
    } else {
        Some(valid.iter().sum())
    };

    let for_average: Vec<f64> = scores.iter().flatten().map(|s| s.for_average()).collect();
    let average = if for_average.is_empty() {
        None
    } else {
        Some(round_half_up(
            for_average.iter().sum::<f64>() / for_average.len() as f64,
        ))
    };
    (total, average)
}

fn first_per_subject<'a, T>(items: &'a [T], id: impl Fn(&T) -> &str) -> Vec<&'a T> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(id(item).to_string()))
        .collect()
}

pub fn build_ca_rows(records: &[CaRecord], reference: &dyn Reference) -> Vec<CaRow> {
    first_per_subject(records, |r| r.subject_id.as_str())
        .into_iter()
        .map(|r| {
            let subject = reference.subject(&r.subject_id);
            let total = ca_total(&r.components());
            CaRow {
                subject_id: r.subject_id.clone(),
                subject_name: subject.name,
                classwork: r.classwork,
                homework: r.homework,
                organisation: r.organisation,
                participation: r.participation,
                self_management: r.self_management,
                total,
                initials: reference.initials(&r.attribution),
                is_compulsory: subject.is_compulsory,
                display: CaDisplay {
                    classwork: format_mark_display(r.classwork),
                    homework: format_mark_display(r.homework),
                    organisation: format_mark_display(r.organisation),
                    participation: format_mark_display(r.participation),
                    self_management: format_mark_display(r.self_management),
                    total: display_opt(total),
                },
            }
        })
        .collect()
}

/// BOT/MID/EOT rows. Only compulsory subjects are graded.
pub fn build_regular_rows(
    records: &[ScoreRecord],
    scale: &GradingScale,
    reference: &dyn Reference,
) -> Vec<RegularRow> {
    first_per_subject(records, |r| r.subject_id.as_str())
        .into_iter()
        .map(|r| {
            let subject = reference.subject(&r.subject_id);
            let (aggregate, remarks) = if subject.is_compulsory {
                (scale.aggregate(r.score), scale.remarks(r.score, true))
            } else {
                (None, String::new())
            };
            RegularRow {
                subject_id: r.subject_id.clone(),
                subject_name: subject.name,
                score: r.score,
                aggregate,
                remarks,
                initials: reference.initials(&r.attribution),
                is_compulsory: subject.is_compulsory,
                display: RegularDisplay {
                    score: format_mark_display(r.score),
                },
            }
        })
        .collect()
}

/// Merges CA, MID and EOT per subject. Subjects appear in order of first
/// appearance across CA, MID, EOT.
pub fn build_integrated_rows(
    ca: &[CaRow],
    mid: &[RegularRow],
    eot: &[RegularRow],
    scale: &GradingScale,
    reference: &dyn Reference,
) -> Vec<IntegratedRow> {
    let ca_by_id: HashMap<&str, &CaRow> = ca.iter().map(|r| (r.subject_id.as_str(), r)).collect();
    let mid_by_id: HashMap<&str, &RegularRow> =
        mid.iter().map(|r| (r.subject_id.as_str(), r)).collect();
    let eot_by_id: HashMap<&str, &RegularRow> =
        eot.iter().map(|r| (r.subject_id.as_str(), r)).collect();

    let mut order: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let ids = ca
        .iter()
        .map(|r| r.subject_id.as_str())
        .chain(mid.iter().map(|r| r.subject_id.as_str()))
        .chain(eot.iter().map(|r| r.subject_id.as_str()));
    for id in ids {
        if seen.insert(id) {
            order.push(id);
        }
    }

    order
        .into_iter()
        .map(|id| {
            let subject = reference.subject(id);
            let ca_row = ca_by_id.get(id);
            let mid_row = mid_by_id.get(id);
            let eot_row = eot_by_id.get(id);

            let ca_score = ca_row.and_then(|r| r.total).map(Mark::Scored);
            let mid_score = mid_row.and_then(|r| r.score);
            let eot_score = eot_row.and_then(|r| r.score);
            let (total, average) = integrated_totals([ca_score, mid_score, eot_score]);

            let (aggregate, remarks) = match average {
                Some(avg) if subject.is_compulsory => {
                    let avg = Some(Mark::Scored(avg));
                    (scale.aggregate(avg), scale.remarks(avg, true))
                }
                _ => (None, String::new()),
            };

            let initials = [
                eot_row.map(|r| r.initials.as_str()),
                mid_row.map(|r| r.initials.as_str()),
                ca_row.map(|r| r.initials.as_str()),
            ]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();

            IntegratedRow {
                subject_id: id.to_string(),
                subject_name: subject.name,
                ca: ca_score,
                mid: mid_score,
                eot: eot_score,
                total,
                average,
                aggregate,
                remarks,
                initials,
                is_compulsory: subject.is_compulsory,
                display: IntegratedDisplay {
                    ca: format_mark_display(ca_score),
                    mid: format_mark_display(mid_score),
                    eot: format_mark_display(eot_score),
                    total: display_opt(total),
                    average: display_opt(average),
                },
            }
        })
        .collect()
}

/// Report-card footer figures for one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableTotals {
    #[serde(serialize_with = "serialize_opt_number")]
    pub total_marks: Option<f64>,
    #[serde(serialize_with = "serialize_opt_number")]
    pub average: Option<f64>,
    pub subject_count: usize,
}

/// Totals over the rows that carry a countable value.
pub fn table_totals<I>(values: I) -> TableTotals
where
    I: IntoIterator<Item = Option<f64>>,
{
    let valid: Vec<f64> = values.into_iter().flatten().collect();
    if valid.is_empty() {
        return TableTotals {
            total_marks: None,
            average: None,
            subject_count: 0,
        };
    }
    let sum: f64 = valid.iter().sum();
    TableTotals {
        total_marks: Some(sum),
        average: Some(round_off_1_decimal(sum / valid.len() as f64)),
        subject_count: valid.len(),
    }
}
