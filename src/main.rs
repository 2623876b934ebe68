mod cache;
mod calc;
mod classify;
mod comments;
mod division;
mod ingest;
mod ipc;
mod marks;
mod report;
mod scale;
mod setup;
mod source;

use serde_json::json;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    // stdout carries the IPC stream; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn load_setup() -> setup::Setup {
    let mut setup = setup::Setup::default();
    // Best-effort; a bad file is logged and skipped.
    if let Some(path) = std::env::var_os(setup::SETUP_FILE_ENV).map(PathBuf::from) {
        match setup.load_overrides(&path) {
            Ok(()) => tracing::info!(path = %path.display(), "loaded setup overrides"),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %format!("{:#}", e),
                "ignoring setup file"
            ),
        }
    }
    setup
}

fn main() {
    init_tracing();
    let mut state = ipc::AppState::new(load_setup());
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gradebookd ready");

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
                tracing::warn!(error = %e, "bad request line");
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
    tracing::info!("stdin closed; exiting");
}
