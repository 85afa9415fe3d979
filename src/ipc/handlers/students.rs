use crate::ipc::error::{reply, HandlerErr};
use crate::ipc::helpers::{
    get_optional_str, get_required_i64, get_required_index, get_required_str, require_repo,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

const SETTINGS_PAGE: &str = "/settings";

fn students_add_bulk(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let classroom_id = get_required_str(&req.params, "classroomId")?;
    let input = get_required_str(&req.params, "input")?;
    let report = repo
        .add_students_bulk(&classroom_id, &input)
        .map_err(|e| HandlerErr::from(e).redirect_to(SETTINGS_PAGE))?;
    Ok(json!({
        "added": report.added,
        "rejected": report.rejected,
        "classroom": repo.get_classroom(&classroom_id),
    }))
}

fn students_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let classroom_id = get_required_str(&req.params, "classroomId")?;
    let student_id = get_required_str(&req.params, "studentId")?;
    let classroom = repo.delete_student(&classroom_id, &student_id)?;
    Ok(json!({ "classroom": classroom }))
}

fn seats_resize(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let classroom_id = get_required_str(&req.params, "classroomId")?;
    let rows = get_required_i64(&req.params, "rows")?;
    let columns = get_required_i64(&req.params, "columns")?;
    let classroom = repo.resize_seats(&classroom_id, rows, columns)?;
    Ok(json!({ "classroom": classroom }))
}

fn seats_assign(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let classroom_id = get_required_str(&req.params, "classroomId")?;
    let seat_index = get_required_index(&req.params, "seatIndex")?;
    let student_id = get_optional_str(&req.params, "studentId")?;
    let classroom = repo.assign_seat(&classroom_id, seat_index, student_id.as_deref())?;
    Ok(json!({ "classroom": classroom }))
}

fn seats_available(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let classroom_id = get_required_str(&req.params, "classroomId")?;
    let seat_index = get_required_index(&req.params, "seatIndex")?;
    let students = repo.available_students_for_seat(&classroom_id, seat_index)?;
    Ok(json!({ "students": students }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.addBulk" => students_add_bulk(state, req),
        "students.delete" => students_delete(state, req),
        "seats.resize" => seats_resize(state, req),
        "seats.assign" => seats_assign(state, req),
        "seats.available" => seats_available(state, req),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
