use crate::backup;
use crate::ipc::error::{reply, HandlerErr};
use crate::ipc::helpers::{get_required_str, require_repo};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn required_path(req: &Request, key: &str) -> Result<String, HandlerErr> {
    let raw = get_required_str(&req.params, key)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HandlerErr::bad_params(format!("missing {}", key)));
    }
    Ok(trimmed.to_string())
}

fn backup_failed(e: anyhow::Error, path: &str) -> HandlerErr {
    HandlerErr {
        code: "backup_failed",
        message: format!("{:#}", e),
        details: Some(json!({ "path": path })),
    }
}

fn backup_export_store_bundle(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let repo = require_repo(&state.repo)?;
    let out_path = required_path(req, "outPath")?;
    let entries = repo.export_entries()?;
    let export = backup::export_store_bundle(&entries, &PathBuf::from(&out_path))
        .map_err(|e| backup_failed(e, &out_path))?;
    tracing::info!(path = %out_path, entries = export.entry_count, "store bundle exported");
    Ok(json!({
        "path": out_path,
        "bundleFormat": export.bundle_format,
        "entryCount": export.entry_count,
        "payloadSha256": export.payload_sha256,
    }))
}

/// Replaces the whole store with the bundle's entries. The bundle is fully
/// read and verified before anything is written.
fn backup_import_store_bundle(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let in_path = required_path(req, "inPath")?;
    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return Err(HandlerErr {
            code: "not_found",
            message: "bundle file not found".to_string(),
            details: Some(json!({ "entity": "bundle", "path": in_path })),
        });
    }
    let Some(repo) = state.repo.as_mut() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let import = backup::read_store_bundle(&src).map_err(|e| backup_failed(e, &in_path))?;
    repo.restore_entries(&import.entries)?;
    // Sessions hold a copy of the old day state.
    state.sessions.clear();
    Ok(json!({
        "path": in_path,
        "bundleFormatDetected": import.bundle_format_detected,
        "entryCount": import.entries.len(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "backup.exportStoreBundle" => backup_export_store_bundle(state, req),
        "backup.importStoreBundle" => backup_import_store_bundle(state, req),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
