use std::path::PathBuf;

use serde::Deserialize;

use crate::store::{GradeStore, MemoryStore};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    /// Scratch memory store until a workspace is selected.
    pub store: Box<dyn GradeStore>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            store: Box::new(MemoryStore::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
