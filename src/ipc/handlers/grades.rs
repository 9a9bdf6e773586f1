use crate::grading::{self, GradeRange};
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    ranges_from_params, required_f64, required_str, typed_param, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::presets::Scale;
use crate::report::{build_report_card, SubjectScore};
use serde_json::{json, Value};

fn handle_presets_list(req: &Request) -> Result<Value, HandlerErr> {
    let presets: Vec<Value> = Scale::PRESETS
        .iter()
        .map(|s| {
            json!({
                "scale": s.key(),
                "name": s.name(),
                "rangeCount": s.ranges().len(),
            })
        })
        .collect();
    Ok(ok(&req.id, json!({ "presets": presets })))
}

fn handle_presets_get(req: &Request) -> Result<Value, HandlerErr> {
    let raw = required_str(req, "scale")?;
    let scale = Scale::parse(raw)
        .filter(|s| *s != Scale::Custom)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown scale: {}", raw)))?;
    Ok(ok(
        &req.id,
        json!({
            "scale": scale.key(),
            "name": scale.name(),
            "ranges": scale.ranges(),
        }),
    ))
}

fn handle_validate(req: &Request) -> Result<Value, HandlerErr> {
    let ranges: Vec<GradeRange> = typed_param(req, "ranges")?;
    let exhaustive = match req.params.get("exhaustive") {
        None | Some(Value::Null) => false,
        Some(v) => v
            .as_bool()
            .ok_or_else(|| HandlerErr::bad_params("params.exhaustive must be boolean"))?,
    };

    if exhaustive {
        let errors: Vec<Value> = grading::validate_all(&ranges)
            .iter()
            .map(|e| json!({ "error": e.to_string(), "kind": e.kind(), "grades": e.grades() }))
            .collect();
        return Ok(ok(
            &req.id,
            json!({ "valid": errors.is_empty(), "errors": errors }),
        ));
    }

    let result = match grading::validate(&ranges) {
        Ok(()) => json!({ "valid": true }),
        Err(e) => json!({
            "valid": false,
            "error": e.to_string(),
            "kind": e.kind(),
            "grades": e.grades(),
        }),
    };
    Ok(ok(&req.id, result))
}

fn handle_resolve(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let percentage = required_f64(req, "percentage")?;
    let ranges = ranges_from_params(state, req)?;
    let result = match grading::resolve(&ranges, percentage) {
        Some(range) => json!({ "match": true, "range": range }),
        None => json!({ "match": false }),
    };
    Ok(ok(&req.id, result))
}

/// Accepts plain numbers or `{gradePoint}` objects.
fn parse_grade_points(raw: &Value) -> Result<Vec<f64>, HandlerErr> {
    let Some(items) = raw.as_array() else {
        return Err(HandlerErr::bad_params("params.gradePoints must be an array"));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64()
                .or_else(|| v.get("gradePoint").and_then(|g| g.as_f64()))
                .ok_or_else(|| {
                    HandlerErr::bad_params(format!("params.gradePoints[{}] has no grade point", i))
                })
        })
        .collect()
}

fn handle_aggregate(req: &Request) -> Result<Value, HandlerErr> {
    let Some(raw) = req.params.get("gradePoints") else {
        return Err(HandlerErr::bad_params("missing params.gradePoints"));
    };
    let points = parse_grade_points(raw)?;
    Ok(ok(
        &req.id,
        json!({ "aggregate": grading::compute_aggregate(points) }),
    ))
}

fn handle_report_card(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let subjects: Vec<SubjectScore> = typed_param(req, "subjects")?;
    let ranges = ranges_from_params(state, req)?;
    let config = state.store.load_config()?;
    let card = build_report_card(&ranges, &subjects, &config);
    tracing::debug!(
        subjects = subjects.len(),
        graded = card.graded_count,
        cgpa = card.cgpa,
        "report card built"
    );
    let result = serde_json::to_value(&card).map_err(|e| HandlerErr {
        code: "internal",
        message: e.to_string(),
        details: None,
    })?;
    Ok(ok(&req.id, result))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "grades.presets.list" => handle_presets_list(req),
        "grades.presets.get" => handle_presets_get(req),
        "grades.validate" => handle_validate(req),
        "grades.resolve" => handle_resolve(state, req),
        "grades.aggregate" => handle_aggregate(req),
        "grades.reportCard" => handle_report_card(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}
