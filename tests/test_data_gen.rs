//! Shared helpers for the integration tests: temp dirs and JSONL fixtures.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// A fresh, empty directory under the system temp dir.
pub fn create_temp_dir(tag: &str) -> PathBuf {
    let n = NEXT_DIR.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "telemflow-{tag}-{}-{n}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write fixture");
}

/// `rows` connection records, alternating between two record shapes:
/// even rows carry `proto`, odd rows carry `service` instead.
pub fn generate_conn_log(rows: usize) -> String {
    let mut out = String::new();
    for i in 0..rows {
        let port = [22, 53, 80, 443][i % 4];
        if i % 2 == 0 {
            out.push_str(&format!(
                "{{\"src\":\"10.0.0.{}\",\"port\":{port},\"bytes\":{},\"proto\":\"tcp\"}}\n",
                i % 8,
                i * 10
            ));
        } else {
            out.push_str(&format!(
                "{{\"src\":\"10.0.0.{}\",\"port\":{port},\"bytes\":{},\"service\":\"dns\"}}\n",
                i % 8,
                i * 10
            ));
        }
    }
    out
}

/// Parse a JSONL file back into JSON values, one per line.
pub fn read_jsonl(path: &Path) -> Vec<serde_json::Value> {
    let text = fs::read_to_string(path).expect("read output");
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("valid json line"))
        .collect()
}

/// Quote a path for use as an operator argument.
pub fn arg(path: &Path) -> String {
    let s = path.to_string_lossy();
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
