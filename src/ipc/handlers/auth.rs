use crate::auth::AuthGate;
use crate::ipc::error::{reply, HandlerErr};
use crate::ipc::helpers::{get_required_str, require_repo};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

// Without a workspace there is nowhere to read the login from, so the status
// is unknown (null) rather than false.
fn auth_status(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let Some(repo) = state.repo.as_ref() else {
        return Ok(json!({ "isAuthenticated": null, "user": null }));
    };
    let gate = AuthGate::new(repo.store());
    let user = gate.current_user();
    Ok(json!({
        "isAuthenticated": user.is_some(),
        "user": user,
    }))
}

fn auth_login(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let username = get_required_str(&req.params, "username")?;
    let password = get_required_str(&req.params, "password")?;
    let gate = AuthGate::new(repo.store());
    let authenticated = gate.login(&username, &password);
    Ok(json!({
        "isAuthenticated": authenticated,
        "user": gate.current_user(),
    }))
}

fn auth_logout(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    AuthGate::new(repo.store()).logout();
    state.sessions.clear();
    Ok(json!({ "isAuthenticated": false }))
}

fn users_list(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    Ok(json!({ "users": AuthGate::new(repo.store()).list_users() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "auth.status" => auth_status(state),
        "auth.login" => auth_login(state, req),
        "auth.logout" => auth_logout(state),
        "users.list" => users_list(state),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
