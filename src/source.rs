use crate::ingest::{CaRecord, Period, PeriodRecords, ScoreRecord};
use anyhow::{anyhow, Context};
use serde_json::Value;
use std::collections::HashMap;

/// The data-fetch collaborator: one call per student per period.
pub trait MarkSource: Sync {
    fn fetch(&self, student_id: &str, period: Period) -> anyhow::Result<Value>;
}

/// Everything collected for one student, already normalised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentMarks {
    pub ca: Vec<CaRecord>,
    pub bot: Vec<ScoreRecord>,
    pub mid: Vec<ScoreRecord>,
    pub eot: Vec<ScoreRecord>,
    pub failed: Vec<Period>,
}

impl StudentMarks {
    fn absorb(&mut self, records: PeriodRecords) {
        match records {
            PeriodRecords::Ca(v) => self.ca = v,
            PeriodRecords::Regular(Period::Bot, v) => self.bot = v,
            PeriodRecords::Regular(Period::Mid, v) => self.mid = v,
            PeriodRecords::Regular(Period::Eot, v) => self.eot = v,
            PeriodRecords::Regular(Period::Ca, _) => {}
        }
    }
}

/// Fetches all four periods for a student concurrently and waits for every
/// call to settle. A failed or panicked fetch leaves that period empty.
pub fn collect_student_marks(source: &dyn MarkSource, student_id: &str) -> StudentMarks {
    let settled: Vec<(Period, anyhow::Result<Value>)> = std::thread::scope(|s| {
        let handles: Vec<_> = Period::ALL
            .iter()
            .map(|&period| (period, s.spawn(move || source.fetch(student_id, period))))
            .collect();
        handles
            .into_iter()
            .map(|(period, h)| {
                let res = h
                    .join()
                    .unwrap_or_else(|_| Err(anyhow!("fetch panicked")));
                (period, res)
            })
            .collect()
    });

    let mut marks = StudentMarks::default();
    for (period, res) in settled {
        match res {
            Ok(raw) => marks.absorb(PeriodRecords::parse(period, &raw)),
            Err(e) => {
                tracing::warn!(
                    student_id,
                    period = period.key(),
                    error = %format!("{:#}", e),
                    "mark fetch failed; using empty period"
                );
                marks.failed.push(period);
                marks.absorb(PeriodRecords::empty(period));
            }
        }
    }
    marks
}

/// Source backed by payloads that arrived with the request. A period given
/// as `{"error": "..."}` stands for a fetch that failed upstream.
#[derive(Debug, Clone, Default)]
pub struct InlineMarkSource {
    students: HashMap<String, Value>,
}

impl InlineMarkSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_student(&mut self, student_id: &str, payload: Value) {
        self.students.insert(student_id.to_string(), payload);
    }
}

impl MarkSource for InlineMarkSource {
    fn fetch(&self, student_id: &str, period: Period) -> anyhow::Result<Value> {
        let payload = self
            .students
            .get(student_id)
            .with_context(|| format!("no payload for student {}", student_id))?;
        let rows_key = format!("{}Rows", period.key());
        let raw = payload
            .get(period.key())
            .or_else(|| payload.get(rows_key.as_str()))
            .cloned()
            .unwrap_or(Value::Null);
        if let Some(e) = raw.as_object().and_then(|o| o.get("error")) {
            let message = e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string());
            return Err(anyhow!(message)).with_context(|| format!("{} fetch", period.key()));
        }
        Ok(raw)
    }
}
