use crate::ipc::error::ok;
use crate::ipc::helpers::HandlerErr;
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn handle_get(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let config = state.store.load_config()?;
    Ok(ok(&req.id, json!(config)))
}

/// `params` is a partial config; unknown or invalid fields reject the whole update.
fn handle_update(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let Some(patch) = req.params.as_object() else {
        return Err(HandlerErr::bad_params("params must be an object"));
    };
    let mut config = state.store.load_config()?;
    config.apply_patch(patch).map_err(HandlerErr::bad_params)?;
    state.store.save_config(&config)?;
    tracing::debug!(?config, "calc config updated");
    Ok(ok(&req.id, json!(config)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "calc.config.get" => handle_get(state, req),
        "calc.config.update" => handle_update(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}
