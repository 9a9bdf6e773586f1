use crate::backup;
use crate::grading::GradeRange;
use crate::ipc::error::ok;
use crate::ipc::helpers::{required_str, typed_param, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::presets::Scale;
use crate::store::{GradeDefinition, NewDefinition};
use serde_json::{json, Value};
use std::path::PathBuf;

fn bundle_err(e: anyhow::Error) -> HandlerErr {
    tracing::warn!(error = %e, "definition bundle failed");
    HandlerErr {
        code: "bundle_failed",
        message: format!("{e:#}"),
        details: None,
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let definitions = state.store.list()?;
    Ok(ok(&req.id, json!({ "definitions": definitions })))
}

fn handle_get(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = required_str(req, "definitionId")?;
    let def = state.store.get(id)?;
    Ok(ok(&req.id, json!(def)))
}

/// `ranges` (custom) or `fromPreset` (preset ranges, scale recorded).
fn handle_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let name = required_str(req, "name")?.to_string();

    let (scale, ranges) = if req.params.get("ranges").is_some() {
        let ranges: Vec<GradeRange> = typed_param(req, "ranges")?;
        (Scale::Custom, ranges)
    } else if req.params.get("fromPreset").is_some() {
        let raw = required_str(req, "fromPreset")?;
        let scale = Scale::parse(raw)
            .filter(|s| *s != Scale::Custom)
            .ok_or_else(|| HandlerErr::bad_params(format!("unknown scale: {}", raw)))?;
        (scale, scale.ranges())
    } else {
        return Err(HandlerErr::bad_params(
            "either params.ranges or params.fromPreset is required",
        ));
    };

    let id = state.store.create(NewDefinition {
        name,
        scale: scale.key().to_string(),
        ranges,
    })?;
    Ok(ok(&req.id, json!({ "definitionId": id })))
}

fn handle_replace(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = required_str(req, "definitionId")?;
    let ranges: Vec<GradeRange> = typed_param(req, "ranges")?;
    let name = match req.params.get("name") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_str()
                .ok_or_else(|| HandlerErr::bad_params("params.name must be a string"))?
                .to_string(),
        ),
    };
    let new_id = state.store.replace(id, name, ranges)?;
    Ok(ok(
        &req.id,
        json!({ "definitionId": new_id, "supersedes": id }),
    ))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = required_str(req, "definitionId")?;
    state.store.delete(id)?;
    Ok(ok(&req.id, json!({ "deleted": true })))
}

fn handle_export(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let out_path = PathBuf::from(required_str(req, "outPath")?);

    let ids: Vec<String> = match req.params.get("definitionIds") {
        None | Some(Value::Null) => state.store.list()?.into_iter().map(|d| d.id).collect(),
        Some(_) => typed_param(req, "definitionIds")?,
    };
    let definitions = ids
        .iter()
        .map(|id| state.store.get(id))
        .collect::<Result<Vec<GradeDefinition>, _>>()?;

    let summary =
        backup::export_definitions_bundle(&definitions, &out_path).map_err(bundle_err)?;
    Ok(ok(
        &req.id,
        json!({
            "bundleFormat": summary.bundle_format,
            "definitionCount": summary.definition_count,
        }),
    ))
}

fn handle_import(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let in_path = PathBuf::from(required_str(req, "inPath")?);
    let bundled = backup::read_definitions_bundle(&in_path).map_err(bundle_err)?;

    let incoming: Vec<NewDefinition> = bundled.into_iter().map(NewDefinition::from).collect();
    for (i, d) in incoming.iter().enumerate() {
        if let Err(e) = d.check() {
            let mut he = HandlerErr::from(e);
            he.message = format!("bundled definition {} ({}): {}", i, d.name, he.message);
            return Err(he);
        }
    }

    let imported = state.store.create_many(incoming)?;
    tracing::info!(count = imported.len(), "definitions imported");
    Ok(ok(&req.id, json!({ "imported": imported })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "definitions.list" => handle_list(state, req),
        "definitions.get" => handle_get(state, req),
        "definitions.create" => handle_create(state, req),
        "definitions.replace" => handle_replace(state, req),
        "definitions.delete" => handle_delete(state, req),
        "definitions.export" => handle_export(state, req),
        "definitions.import" => handle_import(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}
