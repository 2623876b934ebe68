use crate::calc::{IntegratedRow, RegularRow};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Division {
    One,
    Two,
    Three,
    Four,
    Ungraded,
    /// A compulsory subject is missing, zero or exempt.
    Unclassified,
    NotApplicable,
}

impl Division {
    pub fn label(self) -> &'static str {
        match self {
            Division::One => "DIV I",
            Division::Two => "DIV II",
            Division::Three => "DIV III",
            Division::Four => "DIV IV",
            Division::Ungraded => "U",
            Division::Unclassified => "X",
            Division::NotApplicable => "N/A",
        }
    }

    /// Labels a division band may carry in settings.
    pub fn parse_band_label(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DIV I" => Some(Division::One),
            "DIV II" => Some(Division::Two),
            "DIV III" => Some(Division::Three),
            "DIV IV" => Some(Division::Four),
            "U" => Some(Division::Ungraded),
            _ => None,
        }
    }

    pub fn is_passing(self) -> bool {
        matches!(
            self,
            Division::One | Division::Two | Division::Three | Division::Four
        )
    }
}

impl Serialize for Division {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Division {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Division::parse_band_label(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown division label: {}", s)))
    }
}

/// Inclusive AGGS range mapped to a division.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DivisionBand {
    pub start: i64,
    pub end: i64,
    pub label: Division,
}

pub const DEFAULT_BANDS: [DivisionBand; 5] = [
    DivisionBand { start: 4, end: 12, label: Division::One },
    DivisionBand { start: 13, end: 24, label: Division::Two },
    DivisionBand { start: 25, end: 28, label: Division::Three },
    DivisionBand { start: 29, end: 32, label: Division::Four },
    DivisionBand { start: 33, end: 36, label: Division::Ungraded },
];

/// Rows that can feed the division classifier.
pub trait ClassifiedRow {
    fn is_compulsory(&self) -> bool;
    fn aggregate(&self) -> Option<i64>;
    /// True when the row's marks rule out classification altogether.
    fn blocks_classification(&self) -> bool;
}

impl ClassifiedRow for RegularRow {
    fn is_compulsory(&self) -> bool {
        self.is_compulsory
    }

    fn aggregate(&self) -> Option<i64> {
        self.aggregate
    }

    fn blocks_classification(&self) -> bool {
        match self.score {
            None => true,
            Some(m) => m.is_exempt() || m.is_zero(),
        }
    }
}

impl ClassifiedRow for IntegratedRow {
    fn is_compulsory(&self) -> bool {
        self.is_compulsory
    }

    fn aggregate(&self) -> Option<i64> {
        self.aggregate
    }

    // A zero at MID or EOT disqualifies even when the average is fine.
    fn blocks_classification(&self) -> bool {
        let zero = |m: Option<crate::marks::Mark>| m.map(|m| m.is_zero()).unwrap_or(false);
        match self.average {
            None => true,
            Some(avg) if avg == 0.0 => true,
            Some(_) => zero(self.mid) || zero(self.eot),
        }
    }
}

/// AGGS: sum of the aggregates of compulsory rows that have one. `None` when
/// no row has one or the sum overflows.
pub fn compute_table_aggs<R: ClassifiedRow>(rows: &[R]) -> Option<i64> {
    let aggregates: Vec<i64> = rows
        .iter()
        .filter(|r| r.is_compulsory())
        .filter_map(|r| r.aggregate())
        .collect();
    if aggregates.is_empty() {
        return None;
    }
    aggregates.iter().try_fold(0i64, |acc, a| acc.checked_add(*a))
}

pub fn get_division_grade<R: ClassifiedRow>(
    aggs: Option<i64>,
    rows: &[R],
    bands: &[DivisionBand],
) -> Division {
    let Some(aggs) = aggs else {
        return Division::NotApplicable;
    };
    let compulsory: Vec<&R> = rows.iter().filter(|r| r.is_compulsory()).collect();
    if compulsory.is_empty() {
        return Division::NotApplicable;
    }
    if compulsory.iter().any(|r| r.blocks_classification()) {
        return Division::Unclassified;
    }
    bands
        .iter()
        .find(|b| aggs >= b.start && aggs <= b.end)
        .map(|b| b.label)
        .unwrap_or(Division::NotApplicable)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalGrade {
    pub aggs: Option<i64>,
    pub grade: Division,
}

impl FinalGrade {
    pub fn not_applicable() -> Self {
        Self {
            aggs: None,
            grade: Division::NotApplicable,
        }
    }
}

pub fn final_grade<R: ClassifiedRow>(rows: &[R], bands: &[DivisionBand]) -> FinalGrade {
    let aggs = compute_table_aggs(rows);
    FinalGrade {
        aggs,
        grade: get_division_grade(aggs, rows, bands),
    }
}
