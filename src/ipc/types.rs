use crate::repo::Repository;
use crate::runtime::RunSession;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub repo: Option<Repository>,
    /// Open run sessions by session id.
    pub sessions: HashMap<String, RunSession>,
}
