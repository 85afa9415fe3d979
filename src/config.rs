use std::path::PathBuf;

pub const WORKSPACE_ENV: &str = "CHECKBOARD_WORKSPACE";
pub const LOG_ENV: &str = "CHECKBOARD_LOG";
pub const DEFAULT_LOG_FILTER: &str = "checkboardd=info";

#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace opened at startup, before any `workspace.select`.
    pub workspace: Option<PathBuf>,
    pub log_filter: String,
}

impl Config {
    /// Reads the environment, after loading `.env` if one exists.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let workspace = std::env::var_os(WORKSPACE_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let log_filter = std::env::var(LOG_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        Self {
            workspace,
            log_filter,
        }
    }
}
