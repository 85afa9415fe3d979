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
    let exe = env!("CARGO_BIN_EXE_checkboardd");
    let mut child = Command::new(exe)
        .env_remove("CHECKBOARD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn checkboardd");
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
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn open_logged_in(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &PathBuf,
) {
    let _ = request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let login = request_ok(
        stdin,
        reader,
        "login",
        "auth.login",
        json!({ "username": "teacher1", "password": "qweqwe" }),
    );
    assert_eq!(login["isAuthenticated"], json!(true));
}

fn write_raw(workspace: &PathBuf, key: &str, value: &str) {
    let conn = rusqlite::Connection::open(workspace.join("checkboard.sqlite3")).expect("open db");
    conn.execute(
        "INSERT INTO kv_entries(key, value) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![key, value],
    )
    .expect("write raw entry");
}

#[test]
fn undecodable_entries_read_as_absent() {
    let workspace = temp_dir("checkboard-store-corrupt");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_logged_in(&mut stdin, &mut reader, &workspace);

    write_raw(&workspace, "classrooms", "{not json");
    write_raw(&workspace, "checkboards", "42");

    let classrooms = request_ok(&mut stdin, &mut reader, "1", "classrooms.list", json!({}));
    assert_eq!(classrooms["classrooms"], json!([]));
    let boards = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "checkboards.list",
        json!({ "scope": "all" }),
    );
    assert_eq!(boards["checkboards"], json!([]));

    // The next write replaces the broken value.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "classrooms.create",
        json!({ "name": "1-1" }),
    );
    let classrooms = request_ok(&mut stdin, &mut reader, "4", "classrooms.list", json!({}));
    assert_eq!(classrooms["classrooms"].as_array().map(|v| v.len()), Some(1));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn legacy_seat_strings_and_flags_are_understood() {
    let workspace = temp_dir("checkboard-store-legacy");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_logged_in(&mut stdin, &mut reader, &workspace);

    write_raw(
        &workspace,
        "classrooms",
        &json!([
            {
                "id": "c1",
                "name": "1-1",
                "students": [{ "id": "s1", "number": 1, "name": "Kim" }],
                "seats": ["", "s1"],
                "seatRows": 1,
                "seatColumns": 2,
                "isMain": true
            }
        ])
        .to_string(),
    );

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "classrooms.get",
        json!({ "classroomId": "c1" }),
    );
    assert_eq!(got["classroom"]["seats"], json!([null, "s1"]));
    let listed = request_ok(&mut stdin, &mut reader, "2", "classrooms.list", json!({}));
    assert_eq!(listed["mainClassroomId"], json!("c1"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn poll_reports_commits_from_other_processes_once() {
    let workspace = temp_dir("checkboard-store-poll");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_logged_in(&mut stdin, &mut reader, &workspace);

    let quiet = request_ok(&mut stdin, &mut reader, "1", "store.poll", json!({}));
    assert_eq!(quiet["changed"], json!(false));

    // Own writes are not external changes.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "classrooms.create",
        json!({ "name": "1-1" }),
    );
    let own = request_ok(&mut stdin, &mut reader, "3", "store.poll", json!({}));
    assert_eq!(own["changed"], json!(false));

    write_raw(&workspace, "users", &json!([{ "username": "teacher2" }]).to_string());
    let changed = request_ok(&mut stdin, &mut reader, "4", "store.poll", json!({}));
    assert_eq!(changed["changed"], json!(true));
    let again = request_ok(&mut stdin, &mut reader, "5", "store.poll", json!({}));
    assert_eq!(again["changed"], json!(false));

    let users = request_ok(&mut stdin, &mut reader, "6", "users.list", json!({}));
    assert_eq!(users["users"][0]["username"], json!("teacher2"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn store_bundle_restores_an_earlier_state() {
    let workspace = temp_dir("checkboard-store-bundle");
    let out_dir = temp_dir("checkboard-store-bundle-out");
    let bundle = out_dir.join("store.zip");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_logged_in(&mut stdin, &mut reader, &workspace);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "classrooms.create",
        json!({ "name": "Before" }),
    );
    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "backup.exportStoreBundle",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(exported["bundleFormat"], json!("checkboard-store-v1"));
    assert!(bundle.is_file());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "classrooms.create",
        json!({ "name": "After" }),
    );
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "backup.importStoreBundle",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    assert_eq!(imported["entryCount"], exported["entryCount"]);

    let listed = request_ok(&mut stdin, &mut reader, "5", "classrooms.list", json!({}));
    let names: Vec<&str> = listed["classrooms"]
        .as_array()
        .map(|v| v.iter().filter_map(|c| c["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["Before"]);

    let not_zip = out_dir.join("plain.txt");
    std::fs::write(&not_zip, b"hello").expect("write plain file");
    let rejected = request(
        &mut stdin,
        &mut reader,
        "6",
        "backup.importStoreBundle",
        json!({ "inPath": not_zip.to_string_lossy() }),
    );
    assert_eq!(error_code(&rejected), Some("backup_failed"));

    let missing = request(
        &mut stdin,
        &mut reader,
        "7",
        "backup.importStoreBundle",
        json!({ "inPath": out_dir.join("nope.zip").to_string_lossy() }),
    );
    assert_eq!(error_code(&missing), Some("not_found"));

    drop(stdin);
    let _ = child.wait();
}
