use crate::ipc::error::HandlerErr;
use crate::model::parse_date;
use crate::repo::Repository;
use chrono::NaiveDate;

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be string or null", key))),
    }
}

pub fn get_required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing integer {}", key)))
}

pub fn get_required_index(params: &serde_json::Value, key: &str) -> Result<usize, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a non-negative integer", key)))
}

/// `YYYY-MM-DD`; today's local date when absent.
pub fn get_date_or_today(params: &serde_json::Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    match get_optional_str(params, key)? {
        None => Ok(chrono::Local::now().date_naive()),
        Some(raw) => parse_date(&raw).ok_or_else(|| {
            HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key))
        }),
    }
}

pub fn require_repo(repo: &Option<Repository>) -> Result<&Repository, HandlerErr> {
    repo.as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}
