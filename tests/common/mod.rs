//! Common test utilities and fixtures
//!
//! This module provides shared test infrastructure: fixture paths, a
//! `stellari` command isolated from the developer's own configuration, and a
//! stub PostgREST server.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use assert_cmd::Command;
use parking_lot::Mutex;
use serde_json::Value;

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get a path to a specific fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// Get the valid config fixture path
pub fn valid_config_fixture() -> PathBuf {
    fixture_path("valid_config.toml")
}

/// Get the invalid config fixture path
pub fn invalid_config_fixture() -> PathBuf {
    fixture_path("invalid_config.toml")
}

const ENV_VARS: &[&str] = &[
    "STELLARI_CONFIG",
    "STELLARI_LLM_API_KEY",
    "STELLARI_LLM_BASE_URL",
    "STELLARI_LLM_MODEL",
    "STELLARI_LLM_TIMEOUT_SECS",
    "STELLARI_STORE_URL",
    "STELLARI_STORE_ANON_KEY",
    "STELLARI_STORE_ACCESS_TOKEN",
    "STELLARI_STORE_TIMEOUT_SECS",
    "STELLARI_LOG_LEVEL",
    "STELLARI_LOG_FILE",
    "STELLARI_LOG_JSON",
    "RUST_LOG",
    // The stub store listens on 127.0.0.1
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
];

/// `stellari` running in `home`, with no config file or STELLARI_* variables
/// leaking in from the environment
pub fn stellari_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stellari").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .current_dir(home);
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Stub PostgREST server
// ─────────────────────────────────────────────────────────────────

/// One request seen by the stub
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    /// Path without the query string
    pub path: String,
    pub query: String,
    pub body: String,
}

/// In-process PostgREST stand-in holding JSON rows per table.
///
/// `GET` applies `col=eq.value` filters, `order=col.asc|desc` and `limit`.
/// `POST` upserts the body by `id`, `PATCH` merges the body into the matching
/// rows and `DELETE` removes them; both answer with the affected rows. Tables
/// listed in `failing` answer `500` to every request.
pub struct StubStore {
    url: String,
    tables: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
}

impl StubStore {
    pub fn start(tables: &[(&str, Value)], failing: &[&str]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let rows: HashMap<String, Vec<Value>> = tables
            .iter()
            .map(|(table, body)| {
                let rows = body.as_array().cloned().unwrap_or_default();
                (table.to_string(), rows)
            })
            .collect();
        let tables = Arc::new(Mutex::new(rows));
        let failing: Vec<String> = failing.iter().map(|t| t.to_string()).collect();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let (state, seen) = (tables.clone(), requests.clone());
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                serve(stream, &state, &failing, &seen);
            }
        });

        Self {
            url,
            tables,
            requests,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.requests.lock().clone()
    }

    /// Current rows of `table`
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }

    /// Config file pointing the store at this stub
    pub fn write_config(&self, dir: &Path) -> PathBuf {
        let path = dir.join("stellari.toml");
        std::fs::write(
            &path,
            format!(
                "[store]\nurl = \"{}\"\nanon_key = \"stub-key\"\ntimeout_secs = 5\n",
                self.url
            ),
        )
        .unwrap();
        path
    }
}

/// Parsed PostgREST query string
#[derive(Default)]
struct RowQuery {
    filters: Vec<(String, String)>,
    order: Option<(String, bool)>,
    limit: Option<usize>,
}

impl RowQuery {
    fn parse(query: &str) -> Self {
        let mut parsed = Self::default();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = percent_decode(value);
            match key {
                "select" => {}
                "order" => {
                    let (column, direction) = value.rsplit_once('.').unwrap_or((&value, "asc"));
                    parsed.order = Some((column.to_string(), direction == "desc"));
                }
                "limit" => parsed.limit = value.parse().ok(),
                column => {
                    if let Some(expected) = value.strip_prefix("eq.") {
                        parsed.filters.push((column.to_string(), expected.to_string()));
                    }
                }
            }
        }
        parsed
    }

    fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|(column, expected)| match row.get(column) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == *expected,
        })
    }
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = (bytes[i] == b'%' && i + 2 < bytes.len())
            .then(|| std::str::from_utf8(&bytes[i + 1..i + 3]).ok())
            .flatten()
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match escaped {
            Some(b) => {
                out.push(b);
                i += 3;
            }
            None => {
                out.push(if bytes[i] == b'+' { b' ' } else { bytes[i] });
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Apply one request to the table state, returning the status line and body
fn apply(
    tables: &Mutex<HashMap<String, Vec<Value>>>,
    method: &str,
    table: &str,
    query: &RowQuery,
    body: &str,
) -> (&'static str, String) {
    let mut tables = tables.lock();
    let rows = tables.entry(table.to_string()).or_default();
    let payload: Value = serde_json::from_str(body).unwrap_or(Value::Null);

    match method {
        "GET" => {
            let mut selected: Vec<Value> = rows.iter().filter(|r| query.matches(r)).cloned().collect();
            if let Some((column, descending)) = &query.order {
                selected.sort_by(|a, b| {
                    let ord = compare(a.get(column), b.get(column));
                    if *descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                });
            }
            if let Some(limit) = query.limit {
                selected.truncate(limit);
            }
            ("200 OK", Value::Array(selected).to_string())
        }
        "POST" => {
            let existing = payload
                .get("id")
                .and_then(|id| rows.iter().position(|r| r.get("id") == Some(id)));
            match existing {
                Some(index) => merge(&mut rows[index], &payload),
                None => rows.push(payload),
            }
            ("201 Created", "[]".to_string())
        }
        "PATCH" => {
            let mut changed = Vec::new();
            for row in rows.iter_mut().filter(|r| query.matches(r)) {
                merge(row, &payload);
                changed.push(row.clone());
            }
            ("200 OK", Value::Array(changed).to_string())
        }
        "DELETE" => {
            let (removed, kept): (Vec<Value>, Vec<Value>) =
                rows.drain(..).partition(|r| query.matches(r));
            *rows = kept;
            ("200 OK", Value::Array(removed).to_string())
        }
        _ => ("405 Method Not Allowed", "{}".to_string()),
    }
}

fn serve(
    stream: TcpStream,
    tables: &Mutex<HashMap<String, Vec<Value>>>,
    failing: &[String],
    seen: &Mutex<Vec<SeenRequest>>,
) -> Option<()> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;
    let body = String::from_utf8_lossy(&body).into_owned();

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), query.to_string()),
        None => (target.clone(), String::new()),
    };
    let table = path.trim_start_matches("/rest/v1/").to_string();

    let (status, payload) = if failing.contains(&table) {
        ("500 Internal Server Error", "{\"message\":\"stub failure\"}".to_string())
    } else {
        apply(tables, &method, &table, &RowQuery::parse(&query), &body)
    };

    seen.lock().push(SeenRequest {
        method,
        path,
        query,
        body,
    });

    let mut stream = stream;
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    );
    stream.write_all(response.as_bytes()).ok()?;
    stream.flush().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_dir_exists() {
        assert!(fixtures_dir().exists(), "Fixtures directory should exist");
    }

    #[test]
    fn test_valid_config_exists() {
        assert!(
            valid_config_fixture().exists(),
            "Valid config fixture should exist"
        );
    }

    #[test]
    fn test_invalid_config_exists() {
        assert!(
            invalid_config_fixture().exists(),
            "Invalid config fixture should exist"
        );
    }
}
