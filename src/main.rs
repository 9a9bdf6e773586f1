use gradingd::{ipc, logging};
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

fn main() {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
    logging::init();

    let mut state = ipc::AppState::new();
    if let Some(ws) = std::env::var_os("GRADINGD_WORKSPACE") {
        let path = PathBuf::from(ws);
        if let Err(e) = ipc::select_workspace(&mut state, &path) {
            tracing::warn!(workspace = %path.display(), error = %e, "startup workspace not opened");
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "unparseable request line");
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
