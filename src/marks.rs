use serde::{Serialize, Serializer};
use serde_json::Value;

/// Raw value the data collaborators use for "exempt / not applicable".
pub const EXEMPT_SENTINEL: f64 = -1.0;

/// A mark that was actually entered. Absence is modelled as `Option<Mark>`
/// so that "no value", "exempt" and a genuine zero stay distinct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mark {
    Exempt,
    Scored(f64),
}

impl Mark {
    /// Value that participates in totals. Exempt marks never do.
    pub fn countable(self) -> Option<f64> {
        match self {
            Mark::Exempt => None,
            Mark::Scored(v) => Some(v),
        }
    }

    /// Value used for averaging only: exempt counts as zero.
    pub fn for_average(self) -> f64 {
        match self {
            Mark::Exempt => 0.0,
            Mark::Scored(v) => v,
        }
    }

    pub fn is_zero(self) -> bool {
        matches!(self, Mark::Scored(v) if v == 0.0)
    }

    pub fn is_exempt(self) -> bool {
        matches!(self, Mark::Exempt)
    }

    /// Wire value: the sentinel for exempt, the score otherwise.
    pub fn as_number(self) -> f64 {
        match self {
            Mark::Exempt => EXEMPT_SENTINEL,
            Mark::Scored(v) => v,
        }
    }
}

impl Serialize for Mark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_number(self.as_number(), serializer)
    }
}

/// Integral values go out as JSON integers so consumers see `80`, not `80.0`.
pub fn serialize_number<S: Serializer>(v: f64, serializer: S) -> Result<S::Ok, S::Error> {
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        serializer.serialize_i64(v as i64)
    } else {
        serializer.serialize_f64(v)
    }
}

pub fn serialize_opt_number<S: Serializer>(
    v: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match v {
        Some(v) => serialize_number(*v, serializer),
        None => serializer.serialize_none(),
    }
}

fn from_number(v: f64) -> Option<Mark> {
    if !v.is_finite() {
        return None;
    }
    if v == EXEMPT_SENTINEL {
        return Some(Mark::Exempt);
    }
    if v < 0.0 {
        return None;
    }
    Some(Mark::Scored(v))
}

/// Parses a raw API value into a mark. Never fails: anything that is not a
/// number or a numeric string degrades to `None`.
pub fn parse_mark_value(raw: &Value) -> Option<Mark> {
    match raw {
        Value::Number(n) => n.as_f64().and_then(from_number),
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                return None;
            }
            t.parse::<f64>().ok().and_then(from_number)
        }
        _ => None,
    }
}

/// Variant for marks that feed integrated rows. Same sentinel handling as
/// `parse_mark_value`, but also accepts the rendered exempt form `"-"`, since
/// integrated inputs are sometimes echoed back from an earlier table.
pub fn normalize_integrated_mark(raw: &Value) -> Option<Mark> {
    if let Value::String(s) = raw {
        if s.trim() == "-" {
            return Some(Mark::Exempt);
        }
    }
    parse_mark_value(raw)
}

/// Display-side inverse of `parse_mark_value`.
pub fn format_mark_display(mark: Option<Mark>) -> String {
    match mark {
        None => String::new(),
        Some(Mark::Exempt) => "-".to_string(),
        Some(Mark::Scored(v)) => format_number(v),
    }
}

pub fn format_number(v: f64) -> String {
    if v.is_nan() {
        return String::new();
    }
    if v == 0.0 {
        return "0".to_string();
    }
    format!("{}", v)
}

/// Round half up to the nearest integer (`Int(x + 0.5)`).
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}
