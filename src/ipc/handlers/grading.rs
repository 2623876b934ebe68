use crate::ingest::{flag, parse_grading_rows};
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::marks::{format_mark_display, parse_mark_value};
use crate::scale::{calculate_remarks, get_aggregate_from_grading_rows};
use serde_json::{json, Value};

fn handle_grading_resolve(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let score = req.params.get("score").and_then(parse_mark_value);
    let rows = parse_grading_rows(req.params.get("gradingRows").unwrap_or(&Value::Null));
    let is_compulsory = req
        .params
        .get("isCompulsory")
        .filter(|v| !v.is_null())
        .map(flag)
        .unwrap_or(true);

    let aggregate = if is_compulsory {
        get_aggregate_from_grading_rows(score, &rows)
    } else {
        None
    };
    ok(
        &req.id,
        json!({
            "score": score,
            "display": format_mark_display(score),
            "aggregate": aggregate,
            "remarks": calculate_remarks(score, &rows, is_compulsory),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grading.resolve" => Some(handle_grading_resolve(state, req)),
        _ => None,
    }
}
