use super::{optional_str, required_str};
use crate::ingest::{parse_comment_ranges, parse_grading_rows, parse_subjects, parse_teachers};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::report::{assemble_batch, Directory, ReportContext, StudentInput, StudentReportData};
use crate::source::InlineMarkSource;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashSet;
use uuid::Uuid;

fn param<'a>(req: &'a Request, key: &str) -> &'a Value {
    req.params.get(key).unwrap_or(&Value::Null)
}

fn text_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn parse_student(raw: &Value, index: usize) -> Result<(StudentInput, Value), HandlerErr> {
    let Some(obj) = raw.as_object() else {
        return Err(HandlerErr::bad_params("student must be an object")
            .with_details(json!({ "index": index })));
    };
    let Some(student_id) = text_field(obj, &["studentId", "id"]) else {
        return Err(HandlerErr::bad_params("student is missing studentId")
            .with_details(json!({ "index": index })));
    };
    let input = StudentInput {
        student_id,
        student_name: text_field(obj, &["studentName", "name"]).unwrap_or_default(),
        class_teacher_comment: text_field(obj, &["classTeacherComment"]),
        head_teacher_comment: text_field(obj, &["headTeacherComment"]),
    };
    Ok((input, raw.clone()))
}

fn run_reports(
    state: &AppState,
    req: &Request,
    students: Vec<(StudentInput, Value)>,
) -> Result<Vec<StudentReportData>, HandlerErr> {
    let class_name = required_str(req, "className")?;
    let report_type = required_str(req, "reportType")?;
    let term = optional_str(req, "term");

    {
        let mut seen = HashSet::new();
        for (s, _) in &students {
            if !seen.insert(s.student_id.as_str()) {
                return Err(HandlerErr::bad_params("duplicate studentId")
                    .with_details(json!({ "studentId": s.student_id })));
            }
        }
    }

    let settings = state.setup.settings();
    let ctx = ReportContext::new(
        &class_name,
        term.as_deref(),
        &report_type,
        &parse_grading_rows(param(req, "gradingRows")),
        parse_comment_ranges(param(req, "classTeacherCommentRanges")),
        parse_comment_ranges(param(req, "headTeacherCommentRanges")),
        &settings,
    );
    let directory = Directory::new(
        &state.subjects,
        &state.teachers,
        parse_subjects(param(req, "subjects")),
        parse_teachers(param(req, "teachers")),
    );

    let mut source = InlineMarkSource::new();
    for (s, payload) in &students {
        source.add_student(&s.student_id, payload.clone());
    }
    let inputs: Vec<StudentInput> = students.into_iter().map(|(s, _)| s).collect();
    Ok(assemble_batch(&ctx, &directory, &source, &inputs))
}

fn handle_reports_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student = match parse_student(param(req, "student"), 0) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match run_reports(state, req, vec![student]) {
        Ok(mut reports) => match reports.pop() {
            Some(report) => ok(&req.id, json!(report)),
            None => HandlerErr::bad_params("no student report produced").response(&req.id),
        },
        Err(e) => e.response(&req.id),
    }
}

fn handle_reports_batch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw_students) = req.params.get("students").and_then(|v| v.as_array()) else {
        return HandlerErr::bad_params("students must be an array").response(&req.id);
    };
    let mut students = Vec::with_capacity(raw_students.len());
    for (i, raw) in raw_students.iter().enumerate() {
        match parse_student(raw, i) {
            Ok(v) => students.push(v),
            Err(e) => return e.response(&req.id),
        }
    }

    let run_id = Uuid::new_v4().to_string();
    let reports = match run_reports(state, req, students) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    tracing::info!(run_id = %run_id, students = reports.len(), "report batch assembled");

    let mut result = json!({
        "runId": run_id,
        "reports": reports,
    });
    if state.setup.settings().reports.show_generated_at {
        result["generatedAt"] = json!(Utc::now().to_rfc3339());
    }
    ok(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.student" => Some(handle_reports_student(state, req)),
        "reports.batch" => Some(handle_reports_batch(state, req)),
        _ => None,
    }
}
