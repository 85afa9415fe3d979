use crate::error::CoreError;
use crate::ipc::error::{reply, HandlerErr};
use crate::ipc::helpers::{get_optional_str, get_required_str, require_repo};
use crate::ipc::types::{AppState, Request};
use crate::model::DisplayMode;
use crate::repo::CheckboardPatch;
use serde_json::json;

pub const CHECKBOARDS_PAGE: &str = "/checkboards";

fn parse_display_mode(raw: Option<String>) -> Result<Option<DisplayMode>, HandlerErr> {
    match raw {
        None => Ok(None),
        Some(s) => DisplayMode::parse(&s)
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params("displayMode must be one of: number, seat")),
    }
}

fn parse_student_ids(params: &serde_json::Value) -> Result<Option<Vec<String>>, HandlerErr> {
    let Some(v) = params.get("studentIds") else {
        return Ok(None);
    };
    let Some(items) = v.as_array() else {
        return Err(HandlerErr::bad_params("studentIds must be an array of strings"));
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| HandlerErr::bad_params("studentIds must be an array of strings"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn checkboards_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let scope = get_optional_str(&req.params, "scope")?;
    let checkboards = match scope.as_deref() {
        None | Some("main") => repo.list_checkboards_for_main_classroom(),
        Some("all") => repo.list_checkboards(),
        Some(_) => return Err(HandlerErr::bad_params("scope must be one of: main, all")),
    };
    Ok(json!({
        "checkboards": checkboards,
        "mainClassroomId": repo.main_classroom_id(),
    }))
}

/// Detail view: the checkboard plus its classroom roster, each student
/// flagged by whether it is active on the checkboard.
fn checkboards_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let checkboard_id = get_required_str(&req.params, "checkboardId")?;
    let checkboard = repo.get_checkboard(&checkboard_id).ok_or_else(|| {
        HandlerErr::from(CoreError::not_found("checkboard", &checkboard_id))
            .redirect_to(CHECKBOARDS_PAGE)
    })?;
    let classroom = repo.get_classroom(&checkboard.classroom_id).ok_or_else(|| {
        HandlerErr::from(CoreError::not_found("classroom", &checkboard.classroom_id))
            .redirect_to(CHECKBOARDS_PAGE)
    })?;
    let students: Vec<serde_json::Value> = classroom
        .students
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "number": s.number,
                "name": s.name,
                "active": checkboard.includes(&s.id),
            })
        })
        .collect();
    Ok(json!({
        "checkboard": checkboard,
        "classroom": { "id": classroom.id, "name": classroom.name },
        "students": students,
    }))
}

fn checkboards_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let name = get_required_str(&req.params, "name")?;
    let mode = parse_display_mode(get_optional_str(&req.params, "displayMode")?)?.unwrap_or_default();
    let checkboard = repo.create_checkboard(&name, mode)?;
    Ok(json!({ "checkboard": checkboard }))
}

fn checkboards_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let checkboard_id = get_required_str(&req.params, "checkboardId")?;
    let patch = CheckboardPatch {
        name: get_optional_str(&req.params, "name")?,
        display_mode: parse_display_mode(get_optional_str(&req.params, "displayMode")?)?,
        student_ids: parse_student_ids(&req.params)?,
    };
    let checkboard = repo
        .update_checkboard(&checkboard_id, patch)
        .map_err(|e| HandlerErr::from(e).redirect_to(CHECKBOARDS_PAGE))?;
    Ok(json!({ "checkboard": checkboard }))
}

fn checkboards_toggle_student(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let checkboard_id = get_required_str(&req.params, "checkboardId")?;
    let student_id = get_required_str(&req.params, "studentId")?;
    let checkboard = repo
        .toggle_checkboard_student(&checkboard_id, &student_id)
        .map_err(|e| HandlerErr::from(e).redirect_to(CHECKBOARDS_PAGE))?;
    Ok(json!({
        "checkboard": checkboard,
        "active": checkboard.includes(&student_id),
    }))
}

fn checkboards_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let checkboard_id = get_required_str(&req.params, "checkboardId")?;
    repo.delete_checkboard(&checkboard_id)?;
    state
        .sessions
        .retain(|_, s| s.checkboard().id != checkboard_id);
    Ok(json!({ "deleted": checkboard_id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "checkboards.list" => checkboards_list(state, req),
        "checkboards.get" => checkboards_get(state, req),
        "checkboards.create" => checkboards_create(state, req),
        "checkboards.update" => checkboards_update(state, req),
        "checkboards.toggleStudent" => checkboards_toggle_student(state, req),
        "checkboards.delete" => checkboards_delete(state, req),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
