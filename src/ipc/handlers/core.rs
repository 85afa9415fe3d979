use crate::auth::AuthGate;
use crate::db;
use crate::ipc::error::{err, ok, reply, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::repo::Repository;
use crate::store::KvStore;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Opens (creating if needed) the workspace database and makes it current.
/// Open run sessions belong to the previous workspace and are dropped.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let conn = db::open_db(path)?;
    let mut repo = Repository::new(KvStore::new(conn));
    let workspace = path.to_string_lossy().to_string();
    repo.subscribe(move |change| {
        tracing::info!(
            workspace = %workspace,
            data_version = change.data_version,
            "store changed by another process"
        );
    });
    state.workspace = Some(path.to_path_buf());
    state.repo = Some(repo);
    state.sessions.clear();
    tracing::info!(workspace = %path.display(), "workspace opened");
    Ok(())
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "openSessions": state.sessions.len(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, &path) {
        Ok(()) => {
            let authenticated = state
                .repo
                .as_ref()
                .map(|r| AuthGate::new(r.store()).is_authenticated());
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "isAuthenticated": authenticated,
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn store_poll(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let Some(repo) = state.repo.as_mut() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let changed = repo.poll_external_changes();
    Ok(json!({ "changed": changed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "store.poll" => Some(reply(&req.id, store_poll(state))),
        _ => None,
    }
}
