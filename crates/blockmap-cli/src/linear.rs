//! Linear GraphQL client backing the `graph` command.
//!
//! # Relation Direction
//!
//! Linear stores a "blocks" relation on the blocking issue: for a relation
//! `{ issue: A, relatedIssue: B, type: "blocks" }`, A blocks B. To list the
//! blockers of B we read B's `inverseRelations` and take each relation's
//! `issue`.
//!
//! # Workflow States
//!
//! Issue nodes are fetched together with their state, and every state seen
//! is cached by id. Lookups for a state that was never embedded fall back to
//! a `workflowState` query.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use blockmap_core::config::Settings;
use blockmap_core::{Error, IssuePage, IssueSource, RawIssue, RawRelation, Result, WorkflowState};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

const USER_AGENT: &str = concat!("blockmap/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RELATIONS_PER_ISSUE: usize = 100;

const PROJECT_ISSUES_QUERY: &str = r"
query ProjectIssues($projectId: String!, $first: Int!, $after: String) {
  project(id: $projectId) {
    issues(first: $first, after: $after) {
      nodes { id identifier canceledAt estimate state { id type } }
      pageInfo { hasNextPage endCursor }
    }
  }
}";

const ISSUE_BLOCKERS_QUERY: &str = r"
query IssueBlockers($id: String!, $first: Int!) {
  issue(id: $id) {
    inverseRelations(first: $first) {
      nodes {
        type
        issue { id identifier canceledAt estimate state { id type } }
      }
    }
  }
}";

const WORKFLOW_STATE_QUERY: &str = r"
query WorkflowState($id: String!) {
  workflowState(id: $id) { id type }
}";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct StateNode {
    id: String,
    #[serde(rename = "type")]
    state_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueNode {
    id: String,
    identifier: String,
    #[serde(default)]
    canceled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    estimate: Option<f64>,
    #[serde(default)]
    state: Option<StateNode>,
}

impl IssueNode {
    /// Convert to a [`RawIssue`], recording the embedded state in `seen`.
    fn into_raw(self, seen: &mut Vec<StateNode>) -> RawIssue {
        let state_id = self.state.map(|state| {
            let id = state.id.clone();
            seen.push(state);
            id
        });
        RawIssue {
            id: self.id,
            identifier: self.identifier,
            canceled_at: self.canceled_at,
            estimate: self.estimate,
            state_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueConnection {
    nodes: Vec<IssueNode>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct ProjectIssues {
    issues: IssueConnection,
}

#[derive(Debug, Deserialize)]
struct ProjectData {
    project: Option<ProjectIssues>,
}

#[derive(Debug, Deserialize)]
struct RelationNode {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    issue: Option<IssueNode>,
}

#[derive(Debug, Deserialize)]
struct RelationConnection {
    nodes: Vec<RelationNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueRelations {
    inverse_relations: RelationConnection,
}

#[derive(Debug, Deserialize)]
struct IssueData {
    issue: Option<IssueRelations>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateData {
    workflow_state: Option<StateNode>,
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

fn unwrap_response<T>(operation: &str, response: GraphQlResponse<T>) -> Result<T> {
    if !response.errors.is_empty() {
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(Error::GraphQl(format!("{operation}: {}", messages.join("; "))));
    }
    response
        .data
        .ok_or_else(|| Error::GraphQl(format!("{operation}: response has no data")))
}

fn decode_page(project_id: &str, data: ProjectData, seen: &mut Vec<StateNode>) -> Result<IssuePage> {
    let project = data.project.ok_or_else(|| Error::ProjectNotFound {
        project_id: project_id.to_string(),
    })?;
    let connection = project.issues;

    Ok(IssuePage {
        issues: connection
            .nodes
            .into_iter()
            .map(|node| node.into_raw(seen))
            .collect(),
        has_next_page: connection.page_info.has_next_page,
        end_cursor: connection.page_info.end_cursor,
    })
}

fn decode_relations(data: IssueData, seen: &mut Vec<StateNode>) -> Vec<RawRelation> {
    data.issue
        .map(|issue| issue.inverse_relations.nodes)
        .unwrap_or_default()
        .into_iter()
        .map(|node| RawRelation {
            kind: node.kind,
            related_issue: node.issue.map(|issue| issue.into_raw(seen)),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// LinearClient
// ---------------------------------------------------------------------------

/// Linear API handle, built once per run and passed to the pipeline.
pub struct LinearClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    page_size: usize,
    states: RwLock<HashMap<String, WorkflowState>>,
    requests: AtomicUsize,
}

impl LinearClient {
    /// Build a client from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if the HTTP client cannot be constructed.
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::fetch("build HTTP client", e))?;

        Ok(Self {
            http,
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            page_size: settings.page_size,
            states: RwLock::new(HashMap::new()),
            requests: AtomicUsize::new(0),
        })
    }

    /// Number of API requests issued so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    async fn query<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: JsonValue,
    ) -> Result<T> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "operationName": operation,
            "query": query,
            "variables": variables,
        });

        let response = self
            .http
            .post(&self.api_url)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::fetch(format!("{operation} request failed"), e))?;

        let decoded: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::fetch(format!("{operation} response unreadable"), e))?;

        unwrap_response(operation, decoded)
    }

    async fn remember_states(&self, seen: Vec<StateNode>) {
        if seen.is_empty() {
            return;
        }
        let mut states = self.states.write().await;
        for node in seen {
            states.insert(node.id, WorkflowState::new(node.state_type));
        }
    }
}

#[async_trait]
impl IssueSource for LinearClient {
    #[instrument(skip(self))]
    async fn fetch_page(&self, project_id: &str, cursor: Option<&str>) -> Result<IssuePage> {
        let data: ProjectData = self
            .query(
                "ProjectIssues",
                PROJECT_ISSUES_QUERY,
                json!({
                    "projectId": project_id,
                    "first": self.page_size,
                    "after": cursor,
                }),
            )
            .await?;

        let mut seen = Vec::new();
        let page = decode_page(project_id, data, &mut seen)?;
        self.remember_states(seen).await;
        debug!(issues = page.issues.len(), more = page.has_next_page, "issue page");
        Ok(page)
    }

    async fn workflow_state(&self, issue: &RawIssue) -> Result<Option<WorkflowState>> {
        let Some(state_id) = issue.state_id.as_deref() else {
            return Ok(None);
        };

        if let Some(state) = self.states.read().await.get(state_id) {
            return Ok(Some(state.clone()));
        }

        let data: StateData = self
            .query("WorkflowState", WORKFLOW_STATE_QUERY, json!({ "id": state_id }))
            .await?;
        let Some(node) = data.workflow_state else {
            return Ok(None);
        };
        let state = WorkflowState::new(node.state_type.clone());
        self.remember_states(vec![node]).await;
        Ok(Some(state))
    }

    async fn relations(&self, issue: &RawIssue) -> Result<Vec<RawRelation>> {
        let data: IssueData = self
            .query(
                "IssueBlockers",
                ISSUE_BLOCKERS_QUERY,
                json!({ "id": issue.id, "first": RELATIONS_PER_ISSUE }),
            )
            .await?;

        let mut seen = Vec::new();
        let relations = decode_relations(data, &mut seen);
        self.remember_states(seen).await;
        Ok(relations)
    }
}
