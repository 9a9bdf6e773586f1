use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradingd");
    let mut child = Command::new(exe)
        .env_remove("GRADINGD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradingd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    value["error"]["code"].as_str().unwrap_or("")
}

#[test]
fn replace_supersedes_and_persists_across_restart() {
    let workspace = temp_dir("gradingd-definitions-lifecycle");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "definitions.create",
        json!({ "name": "Secondary", "fromPreset": "cbse" }),
    );
    let first_id = created["definitionId"].as_str().expect("id").to_string();

    let def = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "definitions.get",
        json!({ "definitionId": first_id }),
    );
    assert_eq!(def["scale"], "cbse");
    assert_eq!(def["ranges"].as_array().map(|a| a.len()), Some(9));

    let replaced = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "definitions.replace",
        json!({
            "definitionId": first_id,
            "name": "Secondary (pass/fail)",
            "ranges": [
                { "grade": "Pass", "minMarks": 33, "maxMarks": 100, "gradePoint": 1, "displayOrder": 1 },
                { "grade": "Fail", "minMarks": 0, "maxMarks": 32, "gradePoint": 0, "displayOrder": 2 }
            ]
        }),
    );
    let second_id = replaced["definitionId"].as_str().expect("id").to_string();
    assert_ne!(second_id, first_id);
    assert_eq!(replaced["supersedes"], first_id.as_str());

    let stale = request(
        &mut stdin,
        &mut reader,
        "5",
        "definitions.replace",
        json!({ "definitionId": first_id, "ranges": [
            { "grade": "X", "minMarks": 0, "maxMarks": 100, "gradePoint": 0 }
        ]}),
    );
    assert_eq!(error_code(&stale), "superseded");
    assert_eq!(stale["error"]["details"]["supersededBy"], second_id.as_str());
    let _ = child.kill();

    // A fresh process sees the same workspace state.
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "7", "definitions.list", json!({}));
    let defs = listed["definitions"].as_array().expect("definitions");
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0]["id"], second_id.as_str());
    assert_eq!(defs[0]["name"], "Secondary (pass/fail)");
    assert_eq!(defs[0]["scale"], "custom");
    assert_eq!(defs[0]["rangeCount"], 2);

    let old = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "definitions.get",
        json!({ "definitionId": first_id }),
    );
    assert_eq!(old["supersededBy"], second_id.as_str());

    let resolved = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "grades.resolve",
        json!({ "definitionId": second_id, "percentage": 33 }),
    );
    assert_eq!(resolved["match"], true);
    assert_eq!(resolved["range"]["grade"], "Pass");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "definitions.delete",
        json!({ "definitionId": second_id }),
    );
    let gone = request(
        &mut stdin,
        &mut reader,
        "11",
        "definitions.get",
        json!({ "definitionId": first_id }),
    );
    assert_eq!(error_code(&gone), "not_found");
    let listed = request_ok(&mut stdin, &mut reader, "12", "definitions.list", json!({}));
    assert_eq!(listed["definitions"].as_array().map(|a| a.len()), Some(0));

    let _ = child.kill();
}

#[test]
fn invalid_definitions_are_rejected_whole() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    // Scratch mode: no workspace selected.
    let overlap = request(
        &mut stdin,
        &mut reader,
        "1",
        "definitions.create",
        json!({
            "name": "Broken",
            "ranges": [
                { "grade": "B1", "minMarks": 71, "maxMarks": 80, "gradePoint": 8 },
                { "grade": "B2", "minMarks": 61, "maxMarks": 71, "gradePoint": 7 }
            ]
        }),
    );
    assert_eq!(error_code(&overlap), "invalid_ranges");
    assert_eq!(overlap["error"]["details"]["kind"], "overlappingRanges");
    assert_eq!(overlap["error"]["details"]["grades"], json!(["B1", "B2"]));
    assert_eq!(
        overlap["error"]["message"],
        "Grade ranges overlap: B1 (71-80) and B2 (61-71)"
    );

    let dup = request(
        &mut stdin,
        &mut reader,
        "2",
        "definitions.create",
        json!({
            "name": "Dup",
            "ranges": [
                { "grade": "A", "minMarks": 50, "maxMarks": 100, "gradePoint": 1 },
                { "grade": "A", "minMarks": 0, "maxMarks": 49, "gradePoint": 0 }
            ]
        }),
    );
    assert_eq!(dup["error"]["details"]["kind"], "duplicateGrade");

    let no_name = request(
        &mut stdin,
        &mut reader,
        "3",
        "definitions.create",
        json!({ "fromPreset": "icse" }),
    );
    assert_eq!(error_code(&no_name), "bad_params");

    let bad_preset = request(
        &mut stdin,
        &mut reader,
        "4",
        "definitions.create",
        json!({ "name": "IB", "fromPreset": "ib" }),
    );
    assert_eq!(error_code(&bad_preset), "bad_params");

    let listed = request_ok(&mut stdin, &mut reader, "5", "definitions.list", json!({}));
    assert_eq!(listed["definitions"].as_array().map(|a| a.len()), Some(0));

    let scratch = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "definitions.create",
        json!({ "name": "Scratch", "fromPreset": "icse" }),
    );
    assert!(scratch["definitionId"].is_string());
    let listed = request_ok(&mut stdin, &mut reader, "7", "definitions.list", json!({}));
    assert_eq!(listed["definitions"][0]["name"], "Scratch");

    let _ = child.kill();
}
