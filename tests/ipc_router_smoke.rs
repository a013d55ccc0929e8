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
    let exe = env!("CARGO_BIN_EXE_rosterd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rosterd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_raw(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn error_code(resp: &serde_json::Value) -> &str {
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    resp.get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .expect("error code")
}

#[test]
fn health_unknown_method_and_workspace_lifecycle() {
    let workspace = temp_dir("rosterd-smoke");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_raw(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health.get("ok").and_then(|v| v.as_bool()), Some(true));
    let result = health.get("result").expect("health result");
    assert_eq!(
        result.get("version").and_then(|v| v.as_str()),
        Some(env!("CARGO_PKG_VERSION"))
    );
    assert!(result.get("workspacePath").map(|v| v.is_null()).unwrap_or(false));

    let unknown = request_raw(&mut stdin, &mut reader, "2", "students.reorder", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");

    // Every data method needs a workspace first.
    for (i, method) in [
        "students.list",
        "students.create",
        "students.update",
        "students.delete",
        "students.search",
        "analytics.summary",
    ]
    .into_iter()
    .enumerate()
    {
        let resp = request_raw(
            &mut stdin,
            &mut reader,
            &format!("pre{}", i),
            method,
            json!({}),
        );
        assert_eq!(error_code(&resp), "no_workspace", "method {}", method);
    }

    let bad_select = request_raw(&mut stdin, &mut reader, "3", "workspace.select", json!({}));
    assert_eq!(error_code(&bad_select), "bad_params");

    let select = request_raw(
        &mut stdin,
        &mut reader,
        "4",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(select.get("ok").and_then(|v| v.as_bool()), Some(true));

    let health2 = request_raw(&mut stdin, &mut reader, "5", "health", json!({}));
    assert_eq!(
        health2
            .get("result")
            .and_then(|r| r.get("workspacePath"))
            .and_then(|v| v.as_str()),
        Some(workspace.to_string_lossy().as_ref())
    );

    let list = request_raw(&mut stdin, &mut reader, "6", "students.list", json!({}));
    assert_eq!(list.get("ok").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        list.get("result")
            .and_then(|r| r.get("students"))
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(0)
    );
}
