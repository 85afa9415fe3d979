use crate::error::CoreError;
use crate::ipc::error::{reply, HandlerErr};
use crate::ipc::helpers::{get_required_str, require_repo};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

const SETTINGS_PAGE: &str = "/settings";

fn classrooms_list(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let checkboards = repo.list_checkboards();
    // Counts let the settings page show a dashboard without extra calls.
    let classrooms: Vec<serde_json::Value> = repo
        .list_classrooms()
        .into_iter()
        .map(|c| {
            let checkboard_count = checkboards
                .iter()
                .filter(|b| b.classroom_id == c.id)
                .count();
            let mut v = json!(c);
            v["studentCount"] = json!(c.students.len());
            v["checkboardCount"] = json!(checkboard_count);
            v
        })
        .collect();
    Ok(json!({
        "classrooms": classrooms,
        "mainClassroomId": repo.main_classroom_id(),
    }))
}

fn classrooms_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let classroom_id = get_required_str(&req.params, "classroomId")?;
    let classroom = repo.get_classroom(&classroom_id).ok_or_else(|| {
        HandlerErr::from(CoreError::not_found("classroom", &classroom_id))
            .redirect_to(SETTINGS_PAGE)
    })?;
    Ok(json!({ "classroom": classroom }))
}

fn classrooms_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let name = get_required_str(&req.params, "name")?;
    let classroom = repo.create_classroom(&name)?;
    Ok(json!({
        "classroom": classroom,
        "mainClassroomId": repo.main_classroom_id(),
    }))
}

fn classrooms_rename(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let classroom_id = get_required_str(&req.params, "classroomId")?;
    let name = get_required_str(&req.params, "name")?;
    let classroom = repo
        .rename_classroom(&classroom_id, &name)
        .map_err(|e| HandlerErr::from(e).redirect_to(SETTINGS_PAGE))?;
    Ok(json!({ "classroom": classroom }))
}

fn classrooms_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let classroom_id = get_required_str(&req.params, "classroomId")?;
    repo.delete_classroom(&classroom_id)?;
    let main = repo.main_classroom_id();
    state
        .sessions
        .retain(|_, s| s.classroom().id != classroom_id);
    Ok(json!({ "mainClassroomId": main }))
}

fn classrooms_set_main(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let classroom_id = get_required_str(&req.params, "classroomId")?;
    repo.set_main_classroom(&classroom_id)?;
    Ok(json!({ "mainClassroomId": repo.main_classroom_id() }))
}

/// Settings-page save. `isMain: true` promotes the classroom; `false` on the
/// current main is ignored because some classroom must stay main while any
/// exist.
fn classrooms_save_settings(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let classroom_id = get_required_str(&req.params, "classroomId")?;
    let is_main = match req.params.get("isMain") {
        None => None,
        Some(v) => Some(
            v.as_bool()
                .ok_or_else(|| HandlerErr::bad_params("isMain must be boolean"))?,
        ),
    };
    if repo.get_classroom(&classroom_id).is_none() {
        return Err(HandlerErr::from(CoreError::not_found(
            "classroom",
            &classroom_id,
        ))
        .redirect_to(SETTINGS_PAGE));
    }
    if is_main == Some(true) {
        repo.set_main_classroom(&classroom_id)?;
    }
    Ok(json!({
        "classroom": repo.get_classroom(&classroom_id),
        "mainClassroomId": repo.main_classroom_id(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "classrooms.list" => classrooms_list(state),
        "classrooms.get" => classrooms_get(state, req),
        "classrooms.create" => classrooms_create(state, req),
        "classrooms.rename" => classrooms_rename(state, req),
        "classrooms.delete" => classrooms_delete(state, req),
        "classrooms.setMain" => classrooms_set_main(state, req),
        "classrooms.saveSettings" => classrooms_save_settings(state, req),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
