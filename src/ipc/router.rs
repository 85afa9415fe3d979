use super::handlers;
use super::types::{AppState, Request};
use crate::auth::AuthGate;
use crate::ipc::error::err;

/// Methods reachable before a workspace is selected.
const WORKSPACE_FREE: &[&str] = &["health", "workspace.select", "auth.status"];
/// Methods reachable without a logged-in user.
const AUTH_FREE: &[&str] = &["health", "workspace.select", "auth.status", "auth.login"];

/// Every method past the auth gate needs a workspace to read the login from,
/// so the workspace check runs first.
fn gate(state: &AppState, req: &Request) -> Option<serde_json::Value> {
    let method = req.method.as_str();
    if WORKSPACE_FREE.contains(&method) {
        return None;
    }
    let Some(repo) = state.repo.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    if AUTH_FREE.contains(&method) || AuthGate::new(repo.store()).is_authenticated() {
        return None;
    }
    tracing::debug!(method, "rejected unauthenticated request");
    Some(err(
        &req.id,
        "unauthenticated",
        "log in first",
        Some(serde_json::json!({ "redirect": "/login" })),
    ))
}

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if let Some(resp) = gate(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::auth::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::classrooms::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::checkboards::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::run::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::backup_exchange::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
