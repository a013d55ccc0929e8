use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::normalize;
use crate::store::{CallResult, StudentRecord, StudentStore};

pub fn store<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a dyn StudentStore, serde_json::Value> {
    state
        .store
        .as_deref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Run a store envelope through the error normalizer and hand back its rows.
/// A surfaced store error becomes a `store_error` IPC response.
pub fn unwrap_rows(req: &Request, result: CallResult) -> Result<Vec<StudentRecord>, serde_json::Value> {
    match normalize::check_store_error(result.error.as_ref()) {
        Ok(()) => Ok(result.data.unwrap_or_default()),
        Err(e) => Err(err(&req.id, "store_error", e.to_string(), None)),
    }
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}
