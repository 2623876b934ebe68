use crate::ingest::{parse_subjects, parse_teachers};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_subjects_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("subjects") else {
        return HandlerErr::bad_params("missing params.subjects").response(&req.id);
    };
    let subjects = parse_subjects(raw);
    let registered = subjects.len();
    for s in subjects {
        state.subjects.insert(s.id.clone(), s);
    }
    ok(&req.id, json!({ "registered": registered }))
}

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut subjects = state.subjects.values();
    subjects.sort_by(|a, b| a.id.cmp(&b.id));
    ok(&req.id, json!({ "subjects": subjects }))
}

fn handle_teachers_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("teachers") else {
        return HandlerErr::bad_params("missing params.teachers").response(&req.id);
    };
    let teachers = parse_teachers(raw);
    let registered = teachers.len();
    for (id, initials) in teachers {
        state.teachers.insert(id, initials);
    }
    ok(&req.id, json!({ "registered": registered }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.register" => Some(handle_subjects_register(state, req)),
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "teachers.register" => Some(handle_teachers_register(state, req)),
        _ => None,
    }
}
