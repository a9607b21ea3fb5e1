//! Agent Service API Client
//!
//! Communicates with the hosted agent service over HTTP. Requests carry a
//! JSON body and the API key in the Authorization header; non-2xx responses
//! fail fast with the status code and body text in the error. Responses are
//! decoded defensively from `serde_json::Value` so that missing or renamed
//! fields degrade to defaults instead of failing the call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::types::{
    Agent, AgentService, AgentSpec, FileInfo, MessageContent, MessageOrder, MessageRole,
    NewMessage, Run, RunStatus, ThreadInfo, ThreadMessage,
};

use super::files::{parse_file, upload_body};

/// HTTP client for the agent service.
pub struct AgentHttpClient {
    endpoint: String,
    api_key: String,
    http: Client,
}

impl AgentHttpClient {
    /// Create a new client bound to `endpoint`, authenticating with `api_key`.
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            http: Client::new(),
        }
    }

    /// Internal helper: send an HTTP request and return the JSON response.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.endpoint, path);
        debug!("agent service request: {} {}", method, path);

        let mut builder = match method {
            "GET" => self.http.get(&url),
            "POST" => self.http.post(&url),
            "DELETE" => self.http.delete(&url),
            _ => self.http.get(&url),
        };

        builder = builder
            .header("Content-Type", "application/json")
            .header("Authorization", &self.api_key);

        if let Some(b) = body {
            builder = builder.json(&b);
        }

        let resp = builder
            .send()
            .await
            .with_context(|| format!("Agent service request failed: {} {}", method, path))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Agent service error: {} {} -> {}: {}",
                method,
                path,
                status.as_u16(),
                text
            );
        }

        // Deletions may answer with an empty body.
        let text = resp.text().await.unwrap_or_default();
        if text.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON from {} {}", method, path))
    }
}

#[async_trait]
impl AgentService for AgentHttpClient {
    // ── Agents ───────────────────────────────────────────────────

    async fn create_agent(&self, spec: &AgentSpec) -> Result<Agent> {
        let body = serde_json::json!({
            "name": spec.name,
            "model": spec.model,
            "instructions": spec.instructions,
            "tools": spec.tools.iter().map(|t| t.to_wire()).collect::<Vec<_>>(),
        });

        let result = self.request("POST", "/agents", Some(body)).await?;
        Ok(parse_agent(&result, spec))
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        let encoded = urlencoding::encode(agent_id);
        self.request("DELETE", &format!("/agents/{}", encoded), None)
            .await?;
        Ok(())
    }

    // ── Threads ──────────────────────────────────────────────────

    async fn create_thread(&self) -> Result<ThreadInfo> {
        let result = self.request("POST", "/threads", Some(serde_json::json!({}))).await?;
        Ok(ThreadInfo {
            id: result["id"].as_str().unwrap_or("").to_string(),
        })
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let encoded = urlencoding::encode(thread_id);
        self.request("DELETE", &format!("/threads/{}", encoded), None)
            .await?;
        Ok(())
    }

    // ── Messages ─────────────────────────────────────────────────

    async fn create_message(
        &self,
        thread_id: &str,
        message: &NewMessage,
    ) -> Result<ThreadMessage> {
        let encoded = urlencoding::encode(thread_id);
        let result = self
            .request(
                "POST",
                &format!("/threads/{}/messages", encoded),
                Some(message_body(message)),
            )
            .await?;
        Ok(parse_message(&result))
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: MessageOrder,
    ) -> Result<Vec<ThreadMessage>> {
        let encoded = urlencoding::encode(thread_id);
        let result = self
            .request(
                "GET",
                &format!("/threads/{}/messages?order={}", encoded, order.as_str()),
                None,
            )
            .await?;

        let items = if result.is_array() {
            result.as_array().cloned().unwrap_or_default()
        } else {
            result["data"].as_array().cloned().unwrap_or_default()
        };

        Ok(items.iter().map(parse_message).collect())
    }

    // ── Runs ─────────────────────────────────────────────────────

    async fn create_run(
        &self,
        thread_id: &str,
        agent_id: &str,
        seed: &[NewMessage],
    ) -> Result<Run> {
        let encoded = urlencoding::encode(thread_id);
        let mut body = serde_json::json!({ "agent_id": agent_id });
        if !seed.is_empty() {
            body["additional_messages"] =
                Value::Array(seed.iter().map(message_body).collect());
        }

        let result = self
            .request("POST", &format!("/threads/{}/runs", encoded), Some(body))
            .await?;
        Ok(parse_run(&result, thread_id, agent_id))
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let encoded_thread = urlencoding::encode(thread_id);
        let encoded_run = urlencoding::encode(run_id);
        let result = self
            .request(
                "GET",
                &format!("/threads/{}/runs/{}", encoded_thread, encoded_run),
                None,
            )
            .await?;
        Ok(parse_run(&result, thread_id, ""))
    }

    // ── Files ────────────────────────────────────────────────────

    async fn upload_file(&self, filename: &str, bytes: &[u8], purpose: &str) -> Result<FileInfo> {
        let result = self
            .request("POST", "/files", Some(upload_body(filename, bytes, purpose)))
            .await?;
        Ok(parse_file(&result, filename, purpose))
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let encoded = urlencoding::encode(file_id);
        self.request("DELETE", &format!("/files/{}", encoded), None)
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wire decoding
// ---------------------------------------------------------------------------

/// Request body for appending a message (also a run seed message).
fn message_body(message: &NewMessage) -> Value {
    let mut body = serde_json::json!({
        "role": message.role.as_str(),
        "content": message.content,
    });
    if !message.attachments.is_empty() {
        body["attachments"] = Value::Array(
            message
                .attachments
                .iter()
                .map(|id| serde_json::json!({ "file_id": id }))
                .collect(),
        );
    }
    body
}

fn parse_agent(v: &Value, spec: &AgentSpec) -> Agent {
    Agent {
        id: v["id"]
            .as_str()
            .or_else(|| v["agent_id"].as_str())
            .unwrap_or("")
            .to_string(),
        name: v["name"].as_str().unwrap_or(&spec.name).to_string(),
        model: v["model"].as_str().unwrap_or(&spec.model).to_string(),
        instructions: v["instructions"]
            .as_str()
            .unwrap_or(&spec.instructions)
            .to_string(),
    }
}

/// Decode a run object. `agent_id` is a fallback for responses that omit it
/// (status fetches only echo ids the caller already has).
fn parse_run(v: &Value, thread_id: &str, agent_id: &str) -> Run {
    Run {
        id: v["id"]
            .as_str()
            .or_else(|| v["run_id"].as_str())
            .unwrap_or("")
            .to_string(),
        thread_id: v["thread_id"].as_str().unwrap_or(thread_id).to_string(),
        agent_id: v["agent_id"]
            .as_str()
            .or_else(|| v["assistant_id"].as_str())
            .unwrap_or(agent_id)
            .to_string(),
        status: RunStatus::parse(v["status"].as_str().unwrap_or("queued")),
        last_error: v["last_error"]["message"]
            .as_str()
            .map(|s| s.to_string()),
    }
}

fn parse_message(v: &Value) -> ThreadMessage {
    let role = match v["role"].as_str().unwrap_or("assistant") {
        "user" => MessageRole::User,
        _ => MessageRole::Assistant,
    };

    let content = match &v["content"] {
        // Typed content item list.
        Value::Array(items) => items.iter().map(parse_content_item).collect(),
        // Some endpoints return plain string content for appended messages.
        Value::String(s) => vec![MessageContent::Text { value: s.clone() }],
        _ => Vec::new(),
    };

    ThreadMessage {
        id: v["id"].as_str().unwrap_or("").to_string(),
        role,
        content,
    }
}

fn parse_content_item(item: &Value) -> MessageContent {
    let kind = item["type"].as_str().unwrap_or("");
    if kind == "text" {
        let value = item["text"]["value"]
            .as_str()
            .or_else(|| item["text"].as_str())
            .unwrap_or("")
            .to_string();
        MessageContent::Text { value }
    } else {
        MessageContent::Other {
            kind: kind.to_string(),
        }
    }
}
