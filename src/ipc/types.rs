use std::path::PathBuf;

use serde::Deserialize;

use crate::store::StudentStore;

#[derive(Debug, Deserialize)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<Box<dyn StudentStore>>,
}
