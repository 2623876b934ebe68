use super::required_str;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::setup::SetupSection;
use serde_json::json;

fn parse_section(req: &Request) -> Result<SetupSection, HandlerErr> {
    let name = required_str(req, "section")?;
    SetupSection::parse(&name).ok_or_else(|| {
        HandlerErr::bad_params("section must be one of: reports, division")
            .with_details(json!({ "section": name }))
    })
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    match parse_section(req) {
        Ok(section) => ok(&req.id, state.setup.get(section)),
        Err(e) => e.response(&req.id),
    }
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let section = match parse_section(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return HandlerErr::bad_params("patch must be an object").response(&req.id);
    };
    match state.setup.update(section, patch) {
        Ok(()) => {
            tracing::info!(section = section.key(), "setup updated");
            ok(&req.id, json!({ "ok": true }))
        }
        Err(message) => HandlerErr::bad_params(message)
            .with_details(json!({ "section": section.key() }))
            .response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
