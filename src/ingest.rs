//! Normalisation of collaborator payloads into the canonical shapes the
//! grading engine works with. Every parser here is total: unknown envelopes
//! and malformed rows degrade to an empty list or a dropped row.

use crate::comments::CommentRange;
use crate::marks::{normalize_integrated_mark, parse_mark_value, Mark};
use crate::scale::GradingRow;
use serde::Serialize;
use serde_json::{Map, Value};

const ENVELOPE_KEYS: [&str; 4] = ["data", "results", "marks", "rows"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub code: String,
    pub is_compulsory: bool,
}

impl Subject {
    /// Stand-in for marks whose subject is not in the reference list.
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: "Unknown".to_string(),
            code: String::new(),
            is_compulsory: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Ca,
    Bot,
    Mid,
    Eot,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::Ca, Period::Bot, Period::Mid, Period::Eot];

    pub fn key(self) -> &'static str {
        match self {
            Period::Ca => "ca",
            Period::Bot => "bot",
            Period::Mid => "mid",
            Period::Eot => "eot",
        }
    }
}

/// Who entered a mark: either initials directly or a teacher id to look up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attribution {
    pub initials: Option<String>,
    pub teacher_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaRecord {
    pub subject_id: String,
    pub classwork: Option<Mark>,
    pub homework: Option<Mark>,
    pub organisation: Option<Mark>,
    pub participation: Option<Mark>,
    pub self_management: Option<Mark>,
    pub attribution: Attribution,
}

impl CaRecord {
    pub fn components(&self) -> [Option<Mark>; 5] {
        [
            self.classwork,
            self.homework,
            self.organisation,
            self.participation,
            self.self_management,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub subject_id: String,
    pub score: Option<Mark>,
    pub attribution: Attribution,
}

/// The records of one assessment period for one student.
#[derive(Debug, Clone, PartialEq)]
pub enum PeriodRecords {
    Ca(Vec<CaRecord>),
    Regular(Period, Vec<ScoreRecord>),
}

impl PeriodRecords {
    pub fn empty(period: Period) -> Self {
        match period {
            Period::Ca => PeriodRecords::Ca(Vec::new()),
            p => PeriodRecords::Regular(p, Vec::new()),
        }
    }

    pub fn parse(period: Period, raw: &Value) -> Self {
        match period {
            Period::Ca => PeriodRecords::Ca(parse_ca_records(raw)),
            Period::Bot => PeriodRecords::Regular(Period::Bot, parse_score_records(raw)),
            p => PeriodRecords::Regular(p, parse_integrated_score_records(raw)),
        }
    }
}

fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(v: &Value) -> Option<String> {
    v.as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Loose boolean: `true`, `1`, and the strings `"true"`, `"yes"`, `"1"`.
pub fn flag(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "1"
        ),
        _ => false,
    }
}

/// Aggregates arrive as numbers, numeric strings, or labels such as `"D1"`.
fn grade_value(v: &Value) -> Option<i64> {
    if let Some(n) = number(v) {
        return Some(n.round() as i64);
    }
    let s = v.as_str()?.trim();
    let digits: String = s
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse::<i64>().ok()
}

/// Returns the list of records carried by a response, whatever envelope it
/// came in. Unknown shapes yield an empty slice.
pub fn unwrap_envelope(raw: &Value) -> &[Value] {
    fn inner(raw: &Value, depth: usize) -> Option<&[Value]> {
        match raw {
            Value::Array(items) => Some(items.as_slice()),
            Value::Object(obj) if depth < 2 => ENVELOPE_KEYS
                .iter()
                .filter_map(|k| obj.get(*k))
                .find_map(|v| inner(v, depth + 1)),
            _ => None,
        }
    }
    inner(raw, 0).unwrap_or(&[])
}

fn subject_id_of(obj: &Map<String, Value>) -> Option<String> {
    if let Some(v) = first_present(obj, &["subjectId", "subject_id"]) {
        return id_string(v);
    }
    match obj.get("subject") {
        Some(Value::Object(s)) => s.get("id").and_then(id_string),
        Some(v) => id_string(v),
        None => None,
    }
}

fn attribution_of(obj: &Map<String, Value>) -> Attribution {
    Attribution {
        initials: first_present(obj, &["initials", "teacherInitials"]).and_then(text),
        teacher_id: first_present(obj, &["teacherId", "teacher_id"]).and_then(id_string),
    }
}

fn mark_at(obj: &Map<String, Value>, keys: &[&str]) -> Option<Mark> {
    first_present(obj, keys).and_then(parse_mark_value)
}

pub fn parse_subjects(raw: &Value) -> Vec<Subject> {
    unwrap_envelope(raw)
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let id = obj.get("id").and_then(id_string)?;
            Some(Subject {
                id,
                name: obj.get("name").and_then(text).unwrap_or_default(),
                code: obj.get("code").and_then(text).unwrap_or_default(),
                is_compulsory: first_present(obj, &["isCompulsory", "is_compulsory", "compulsory"])
                    .map(flag)
                    .unwrap_or(false),
            })
        })
        .collect()
}

pub fn parse_ca_records(raw: &Value) -> Vec<CaRecord> {
    unwrap_envelope(raw)
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            Some(CaRecord {
                subject_id: subject_id_of(obj)?,
                classwork: mark_at(obj, &["classwork", "cw"]),
                homework: mark_at(obj, &["homework", "hw"]),
                organisation: mark_at(obj, &["organisation", "organization", "org"]),
                participation: mark_at(obj, &["participation", "sp"]),
                self_management: mark_at(obj, &["selfManagement", "self_management", "sm"]),
                attribution: attribution_of(obj),
            })
        })
        .collect()
}

pub fn parse_score_records(raw: &Value) -> Vec<ScoreRecord> {
    score_records_with(raw, parse_mark_value)
}

/// MID and EOT records feed integrated rows, so they also take the rendered
/// exempt form `"-"`.
pub fn parse_integrated_score_records(raw: &Value) -> Vec<ScoreRecord> {
    score_records_with(raw, normalize_integrated_mark)
}

fn score_records_with(raw: &Value, parse: fn(&Value) -> Option<Mark>) -> Vec<ScoreRecord> {
    unwrap_envelope(raw)
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            Some(ScoreRecord {
                subject_id: subject_id_of(obj)?,
                score: first_present(obj, &["score", "marks", "mark"]).and_then(parse),
                attribution: attribution_of(obj),
            })
        })
        .collect()
}

pub fn parse_grading_rows(raw: &Value) -> Vec<GradingRow> {
    unwrap_envelope(raw)
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            Some(GradingRow {
                start_marks: first_present(obj, &["startMarks", "start_marks", "from"])
                    .and_then(number),
                end_marks: first_present(obj, &["endMarks", "end_marks", "to"]).and_then(number)?,
                grade: first_present(obj, &["grade", "aggregate"]).and_then(grade_value)?,
                comment: first_present(obj, &["comment", "remarks"])
                    .and_then(text)
                    .unwrap_or_default(),
            })
        })
        .collect()
}

pub fn parse_comment_ranges(raw: &Value) -> Vec<CommentRange> {
    unwrap_envelope(raw)
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            Some(CommentRange {
                start_marks: first_present(obj, &["startMarks", "start_marks", "from"])
                    .and_then(number)?,
                end_marks: first_present(obj, &["endMarks", "end_marks", "to"]).and_then(number)?,
                comment: first_present(obj, &["comment", "remarks"]).and_then(text)?,
            })
        })
        .collect()
}

/// `(teacher id, initials)` pairs.
pub fn parse_teachers(raw: &Value) -> Vec<(String, String)> {
    unwrap_envelope(raw)
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let id = obj.get("id").and_then(id_string)?;
            let initials = obj.get("initials").and_then(text)?;
            Some((id, initials))
        })
        .collect()
}
