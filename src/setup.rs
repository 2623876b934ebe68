use crate::comments::DEFAULT_FALLBACK_COMMENT;
use crate::division::{Division, DivisionBand, DEFAULT_BANDS};
use anyhow::Context;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::Path;

pub const SETUP_FILE_ENV: &str = "GRADEBOOKD_SETUP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetupSection {
    Reports,
    Division,
}

impl SetupSection {
    pub const ALL: [SetupSection; 2] = [SetupSection::Reports, SetupSection::Division];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reports" => Some(Self::Reports),
            "division" => Some(Self::Division),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Reports => "reports",
            Self::Division => "division",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Reports => json!({
            "fallbackComment": DEFAULT_FALLBACK_COMMENT,
            "promotionText": "Promoted to next class",
            "showGeneratedAt": true,
            "finalTableLabel": "final"
        }),
        SetupSection::Division => json!({
            "bands": DEFAULT_BANDS.to_vec()
        }),
    }
}

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool().ok_or_else(|| format!("{} must be boolean", key))
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.is_empty() {
        return Err(format!("{} must not be empty", key));
    }
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn parse_bands(v: &Value) -> Result<Vec<DivisionBand>, String> {
    let items = v.as_array().ok_or_else(|| "bands must be an array".to_string())?;
    if items.is_empty() {
        return Err("bands must not be empty".into());
    }
    let mut bands = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let start = item
            .get("start")
            .and_then(Value::as_i64)
            .ok_or_else(|| format!("bands[{}].start must be integer", i))?;
        let end = item
            .get("end")
            .and_then(Value::as_i64)
            .ok_or_else(|| format!("bands[{}].end must be integer", i))?;
        if start > end {
            return Err(format!("bands[{}].start must be <= end", i));
        }
        let label = item
            .get("label")
            .and_then(Value::as_str)
            .and_then(Division::parse_band_label)
            .ok_or_else(|| {
                format!(
                    "bands[{}].label must be one of: DIV I, DIV II, DIV III, DIV IV, U",
                    i
                )
            })?;
        bands.push(DivisionBand { start, end, label });
    }
    Ok(bands)
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())?;
    for (k, v) in patch {
        match section {
            SetupSection::Reports => match k.as_str() {
                "fallbackComment" | "promotionText" => {
                    obj.insert(k.clone(), Value::String(parse_string_max(v, k, 200)?));
                }
                "finalTableLabel" => {
                    obj.insert(k.clone(), Value::String(parse_string_max(v, k, 40)?));
                }
                "showGeneratedAt" => {
                    obj.insert(k.clone(), Value::Bool(parse_bool(v, k)?));
                }
                _ => return Err(format!("unknown reports field: {}", k)),
            },
            SetupSection::Division => match k.as_str() {
                "bands" => {
                    let bands = parse_bands(v)?;
                    obj.insert(k.clone(), json!(bands));
                }
                _ => return Err(format!("unknown division field: {}", k)),
            },
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSettings {
    pub fallback_comment: String,
    pub promotion_text: String,
    pub show_generated_at: bool,
    pub final_table_label: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DivisionSettings {
    pub bands: Vec<DivisionBand>,
}

/// Typed view of the current setup, handed to the report assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub reports: ReportSettings,
    pub division: DivisionSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Setup::default().settings()
    }
}

/// In-memory setup store: one JSON object per section, seeded with defaults
/// and only ever changed through validated patches.
#[derive(Debug, Clone)]
pub struct Setup {
    sections: HashMap<SetupSection, Value>,
}

impl Default for Setup {
    fn default() -> Self {
        let sections = SetupSection::ALL
            .iter()
            .map(|s| (*s, default_section(*s)))
            .collect();
        Self { sections }
    }
}

impl Setup {
    pub fn get(&self, section: SetupSection) -> Value {
        self.sections
            .get(&section)
            .cloned()
            .unwrap_or_else(|| default_section(section))
    }

    /// Applies a patch atomically: on any invalid field nothing changes.
    pub fn update(
        &mut self,
        section: SetupSection,
        patch: &Map<String, Value>,
    ) -> Result<(), String> {
        let mut next = self.get(section);
        merge_section_patch(section, &mut next, patch)?;
        self.sections.insert(section, next);
        Ok(())
    }

    /// Applies `{ "<section>": { ...patch } }` overrides from a JSON file.
    pub fn load_overrides(&mut self, path: &Path) -> anyhow::Result<()> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        let doc: Value = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.to_string_lossy()))?;
        let obj = doc
            .as_object()
            .context("setup file must contain a JSON object")?;
        let mut next = self.clone();
        for (key, patch) in obj {
            let section = SetupSection::parse(key)
                .with_context(|| format!("unknown setup section: {}", key))?;
            let patch = patch
                .as_object()
                .with_context(|| format!("section {} must be an object", key))?;
            next.update(section, patch)
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("invalid {} section", key))?;
        }
        *self = next;
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        let reports = serde_json::from_value(self.get(SetupSection::Reports))
            .or_else(|_| serde_json::from_value(default_section(SetupSection::Reports)));
        let division = serde_json::from_value(self.get(SetupSection::Division))
            .or_else(|_| serde_json::from_value(default_section(SetupSection::Division)));
        Settings {
            reports: reports.unwrap_or_else(|_| ReportSettings {
                fallback_comment: DEFAULT_FALLBACK_COMMENT.to_string(),
                promotion_text: "Promoted to next class".to_string(),
                show_generated_at: true,
                final_table_label: "final".to_string(),
            }),
            division: division.unwrap_or_else(|_| DivisionSettings {
                bands: DEFAULT_BANDS.to_vec(),
            }),
        }
    }
}
