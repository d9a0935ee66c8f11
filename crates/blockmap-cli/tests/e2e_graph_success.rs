//! E2E tests for successful `blockmap graph` runs against an in-process
//! GraphQL server serving a fixed project.
//!
//! Project `proj-1` has two pages:
//! - page 1: A (estimate 3) and C (estimate 2);
//! - page 2: F, cancelled.
//!
//! C is blocked by X (outside the project) and by A.

use std::path::Path;

use assert_cmd::Command;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

const API_KEY: &str = "lin_api_test";

const EXPECTED_GRAPH: &str = "flowchart LR

subgraph priority
  A[\"A<br/>(3)\"]
end

subgraph external-blocked-by
  X[\"X<br/>(1)\"]
end

subgraph blocked
  X[\"X<br/>(1)\"] --> C[\"C<br/>(2)\"]
  A[\"A<br/>(3)\"] --> C[\"C<br/>(2)\"]
end
";

// ---------------------------------------------------------------------------
// GraphQL fixture server
// ---------------------------------------------------------------------------

fn issue(id: &str, identifier: &str, estimate: Option<u32>, state: &str) -> Value {
    json!({
        "id": id,
        "identifier": identifier,
        "canceledAt": null,
        "estimate": estimate,
        "state": {"id": format!("s-{state}"), "type": state},
    })
}

fn issues_page(variables: &Value) -> Value {
    if variables["projectId"] != "proj-1" {
        return json!({"project": null});
    }

    let (nodes, has_next, cursor) = if variables["after"].is_null() {
        (
            vec![issue("a", "A", Some(3), "started"), issue("c", "C", Some(2), "started")],
            true,
            json!("page-2"),
        )
    } else {
        let mut cancelled = issue("f", "F", None, "canceled");
        cancelled["canceledAt"] = json!("2024-03-01T10:00:00.000Z");
        (vec![cancelled], false, Value::Null)
    };

    json!({
        "project": {
            "issues": {
                "nodes": nodes,
                "pageInfo": {"hasNextPage": has_next, "endCursor": cursor},
            }
        }
    })
}

fn blockers(issue_id: &str) -> Value {
    let nodes = match issue_id {
        "c" => vec![
            json!({"type": "blocks", "issue": issue("x", "X", None, "unstarted")}),
            json!({"type": "blocks", "issue": issue("a", "A", Some(3), "started")}),
        ],
        "a" => vec![json!({"type": "related", "issue": issue("c", "C", Some(2), "started")})],
        _ => Vec::new(),
    };
    json!({"issue": {"inverseRelations": {"nodes": nodes}}})
}

async fn graphql(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let authorized = headers
        .get("authorization")
        .is_some_and(|value| value == API_KEY);
    if !authorized {
        return Json(json!({"data": null, "errors": [{"message": "Authentication required"}]}));
    }

    let variables = &body["variables"];
    let data = match body["operationName"].as_str() {
        Some("ProjectIssues") => issues_page(variables),
        Some("IssueBlockers") => blockers(variables["id"].as_str().unwrap_or_default()),
        Some("WorkflowState") => json!({"workflowState": null}),
        other => {
            return Json(json!({"data": null, "errors": [{"message": format!("unknown operation {other:?}")}]}));
        }
    };
    Json(json!({"data": data}))
}

/// Fixture API bound to an ephemeral local port. Stops when dropped.
struct FixtureApi {
    url: String,
    _runtime: tokio::runtime::Runtime,
}

fn start_fixture_api() -> FixtureApi {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("runtime");
    let listener = runtime
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .expect("bind fixture API");
    let addr = listener.local_addr().expect("fixture address");

    let app = Router::new().route("/graphql", post(graphql));
    runtime.spawn(async move { axum::serve(listener, app).await });

    FixtureApi {
        url: format!("http://{addr}/graphql"),
        _runtime: runtime,
    }
}

fn blockmap_cmd(dir: &Path, api: &FixtureApi) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("blockmap"));
    cmd.current_dir(dir);
    cmd.env("HOME", dir);
    cmd.env("XDG_CONFIG_HOME", dir.join("config"));
    cmd.env("BLOCKMAP_LOG", "error");
    cmd.env("LINEAR_API_KEY", API_KEY);
    cmd.env("LINEAR_API_URL", &api.url);
    cmd.env_remove("FORMAT");
    cmd
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn stdout_carries_only_the_markup() {
    let api = start_fixture_api();
    let dir = TempDir::new().expect("tempdir");

    let output = blockmap_cmd(dir.path(), &api)
        .args(["graph", "proj-1", "--sorted"])
        .output()
        .expect("graph should not crash");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "graph failed: {stderr}");
    assert_eq!(String::from_utf8_lossy(&output.stdout), EXPECTED_GRAPH);

    let frame = stderr
        .find("\n------\n\n------\n\nhttps://mermaid.live/edit#pako:")
        .expect("separators then link on stderr");
    let link = stderr[frame..].trim().lines().last().unwrap_or_default();
    assert!(link.starts_with("https://mermaid.live/edit#pako:"));
    assert!(!stderr.contains("flowchart LR"));
}

#[test]
fn show_actionable_adds_section_without_moving_others() {
    let api = start_fixture_api();
    let dir = TempDir::new().expect("tempdir");

    // A blocks C, so nothing is actionable: the section is present but empty.
    blockmap_cmd(dir.path(), &api)
        .args(["graph", "proj-1", "--sorted", "--show-actionable", "--no-link"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "flowchart LR\n\nsubgraph actionable\nend\n\nsubgraph priority\n",
        ))
        .stdout(predicate::str::contains("F[").not())
        .stderr(predicate::str::contains("mermaid.live").not());
}

#[test]
fn json_run_reports_sections_and_counts() {
    let api = start_fixture_api();
    let dir = TempDir::new().expect("tempdir");

    let output = blockmap_cmd(dir.path(), &api)
        .args(["graph", "proj-1", "--sorted", "--json"])
        .output()
        .expect("graph should not crash");

    assert!(
        output.status.success(),
        "graph failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["graph"], EXPECTED_GRAPH);
    assert_eq!(json["counts"]["fetched"], 3);
    assert_eq!(json["counts"]["tracked"], 2);
    assert_eq!(json["counts"]["edges"], 2);
    assert_eq!(json["sections"]["external_blocked_by"][0]["identifier"], "X");
    assert!(
        json["link"]
            .as_str()
            .is_some_and(|link| link.starts_with("https://mermaid.live/edit#pako:"))
    );
}

#[test]
fn unknown_project_fails_without_stdout() {
    let api = start_fixture_api();
    let dir = TempDir::new().expect("tempdir");

    blockmap_cmd(dir.path(), &api)
        .args(["graph", "nope"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("project not found: nope"));
}

#[test]
fn rejected_credentials_surface_upstream_message() {
    let api = start_fixture_api();
    let dir = TempDir::new().expect("tempdir");

    blockmap_cmd(dir.path(), &api)
        .env("LINEAR_API_KEY", "wrong-key")
        .args(["graph", "proj-1"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Authentication required"));
}
