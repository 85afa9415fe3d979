//! `run.*` methods. At most one session exists per checkboard and date.
//! Opening the same pair again reloads it from the store under the existing
//! session id; moving a session onto a day another session holds closes the
//! other one.

use crate::ipc::error::{reply, HandlerErr};
use crate::ipc::handlers::checkboards::CHECKBOARDS_PAGE;
use crate::ipc::helpers::{
    get_date_or_today, get_optional_str, get_required_index, get_required_str, require_repo,
};
use crate::ipc::types::{AppState, Request};
use crate::model::DATE_FORMAT;
use crate::runtime::{RunSession, SNAPSHOT_TIME_FORMAT};
use chrono::NaiveTime;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

fn session_view(session_id: &str, session: &RunSession) -> serde_json::Value {
    let checkboard = session.checkboard();
    let classroom = session.classroom();
    json!({
        "sessionId": session_id,
        "checkboard": {
            "id": checkboard.id,
            "name": checkboard.name,
            "displayMode": checkboard.display_mode,
        },
        "classroom": { "id": classroom.id, "name": classroom.name },
        "date": session.date().format(DATE_FORMAT).to_string(),
        "checked": session.checked(),
        "layout": session.layout(),
        "snapshots": session.snapshots(),
    })
}

fn session_mut<'a>(
    sessions: &'a mut HashMap<String, RunSession>,
    session_id: &str,
) -> Result<&'a mut RunSession, HandlerErr> {
    sessions.get_mut(session_id).ok_or_else(|| {
        HandlerErr {
            code: "not_found",
            message: format!("run session not found: {}", session_id),
            details: Some(json!({ "entity": "session", "id": session_id })),
        }
        .redirect_to(CHECKBOARDS_PAGE)
    })
}

fn same_day(a: &RunSession, b: &RunSession) -> bool {
    a.checkboard().id == b.checkboard().id && a.date() == b.date()
}

fn run_open(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let checkboard_id = get_required_str(&req.params, "checkboardId")?;
    let date = get_date_or_today(&req.params, "date")?;
    let session = RunSession::open(repo, &checkboard_id, date)
        .map_err(|e| HandlerErr::from(e).redirect_to(CHECKBOARDS_PAGE))?;
    let existing = state
        .sessions
        .iter()
        .find(|(_, s)| same_day(s, &session))
        .map(|(id, _)| id.clone());
    let session_id = existing.unwrap_or_else(|| Uuid::new_v4().to_string());
    let view = session_view(&session_id, &session);
    state.sessions.insert(session_id, session);
    Ok(view)
}

fn run_view(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let session_id = get_required_str(&req.params, "sessionId")?;
    let session = session_mut(&mut state.sessions, &session_id)?;
    Ok(session_view(&session_id, session))
}

fn run_select_date(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let session_id = get_required_str(&req.params, "sessionId")?;
    let date = get_date_or_today(&req.params, "date")?;
    let session = session_mut(&mut state.sessions, &session_id)?;
    session.select_date(repo, date);
    let view = session_view(&session_id, session);
    let checkboard_id = session.checkboard().id.clone();
    state
        .sessions
        .retain(|id, s| *id == session_id || s.checkboard().id != checkboard_id || s.date() != date);
    Ok(view)
}

fn run_toggle(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let session_id = get_required_str(&req.params, "sessionId")?;
    let student_id = get_required_str(&req.params, "studentId")?;
    let session = session_mut(&mut state.sessions, &session_id)?;
    let checked = session.toggle_check(repo, &student_id)?;
    let mut view = session_view(&session_id, session);
    view["toggled"] = json!({ "studentId": student_id, "checked": checked });
    Ok(view)
}

fn run_reset(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let session_id = get_required_str(&req.params, "sessionId")?;
    let session = session_mut(&mut state.sessions, &session_id)?;
    session.reset_checks(repo);
    Ok(session_view(&session_id, session))
}

/// `time` (`HH:MM:SS`) overrides the wall clock for the snapshot label.
fn run_save_snapshot(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let session_id = get_required_str(&req.params, "sessionId")?;
    let now = match get_optional_str(&req.params, "time")? {
        None => chrono::Local::now().time(),
        Some(raw) => NaiveTime::parse_from_str(raw.trim(), SNAPSHOT_TIME_FORMAT)
            .map_err(|_| HandlerErr::bad_params("time must be HH:MM:SS"))?,
    };
    let session = session_mut(&mut state.sessions, &session_id)?;
    let snapshot = session.save_snapshot(repo, now);
    let mut view = session_view(&session_id, session);
    view["saved"] = json!(snapshot);
    Ok(view)
}

fn run_load_snapshot(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let session_id = get_required_str(&req.params, "sessionId")?;
    let label = get_required_str(&req.params, "label")?;
    let session = session_mut(&mut state.sessions, &session_id)?;
    session.load_snapshot(repo, &label)?;
    Ok(session_view(&session_id, session))
}

fn run_delete_snapshot(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let session_id = get_required_str(&req.params, "sessionId")?;
    let index = get_required_index(&req.params, "index")?;
    let session = session_mut(&mut state.sessions, &session_id)?;
    let removed = session.delete_snapshot(repo, index)?;
    let mut view = session_view(&session_id, session);
    view["deleted"] = json!(removed);
    Ok(view)
}

fn run_close(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let session_id = get_required_str(&req.params, "sessionId")?;
    let closed = state.sessions.remove(&session_id).is_some();
    Ok(json!({ "closed": closed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "run.open" => run_open(state, req),
        "run.view" => run_view(state, req),
        "run.selectDate" => run_select_date(state, req),
        "run.toggle" => run_toggle(state, req),
        "run.reset" => run_reset(state, req),
        "run.saveSnapshot" => run_save_snapshot(state, req),
        "run.loadSnapshot" => run_load_snapshot(state, req),
        "run.deleteSnapshot" => run_delete_snapshot(state, req),
        "run.close" => run_close(state, req),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
