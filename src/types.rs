//! Agentflow - Type Definitions
//!
//! Shared data model for the hosted agent service. Every entity here is
//! owned by the remote service; the client only holds opaque identifiers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ─── Agents ──────────────────────────────────────────────────────

/// A server-side agent: a model bound to instructions and tools.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub model: String,
    pub instructions: String,
}

/// The creation request for an agent.
#[derive(Clone, Debug)]
pub struct AgentSpec {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<ToolSpec>,
}

impl AgentSpec {
    /// A plain agent with no tool bindings.
    pub fn new(name: &str, model: &str, instructions: &str) -> Self {
        Self {
            name: name.to_string(),
            model: model.to_string(),
            instructions: instructions.to_string(),
            tools: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }
}

/// A callable capability an agent may invoke during a run.
#[derive(Clone, Debug)]
pub enum ToolSpec {
    CodeInterpreter,
    FileSearch {
        vector_store_ids: Vec<String>,
    },
    Function {
        name: String,
        description: String,
        parameters: serde_json::Value,
    },
}

impl ToolSpec {
    /// The wire representation the service expects in an agent definition.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            ToolSpec::CodeInterpreter => serde_json::json!({ "type": "code_interpreter" }),
            ToolSpec::FileSearch { vector_store_ids } => serde_json::json!({
                "type": "file_search",
                "file_search": { "vector_store_ids": vector_store_ids },
            }),
            ToolSpec::Function {
                name,
                description,
                parameters,
            } => serde_json::json!({
                "type": "function",
                "function": {
                    "name": name,
                    "description": description,
                    "parameters": parameters,
                },
            }),
        }
    }
}

// ─── Threads & Messages ──────────────────────────────────────────

/// A conversation container. The service assigns the id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// One typed content item within a message. Only text items are rendered;
/// everything else is carried as `Other` and skipped by text extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageContent {
    Text { value: String },
    Other { kind: String },
}

/// A message as returned by the service. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: Vec<MessageContent>,
}

/// A message append request. Also used as a run seed message.
#[derive(Clone, Debug)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    /// Ids of previously uploaded files to attach.
    pub attachments: Vec<String>,
}

impl NewMessage {
    pub fn user(content: &str) -> Self {
        Self {
            role: MessageRole::User,
            content: content.to_string(),
            attachments: Vec::new(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.to_string(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, file_id: &str) -> Self {
        self.attachments.push(file_id.to_string());
        self
    }
}

/// Listing order for thread messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageOrder {
    Ascending,
    Descending,
}

impl MessageOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageOrder::Ascending => "asc",
            MessageOrder::Descending => "desc",
        }
    }
}

// ─── Runs ────────────────────────────────────────────────────────

/// The server-driven status of a run. Transitions are observed, never
/// driven, by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Cancelled,
    Expired,
    /// A status this client does not recognize. Treated as terminal so the
    /// poll loop cannot spin forever against a newer service.
    Unknown(String),
}

impl RunStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "requires_action" => RunStatus::RequiresAction,
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            "cancelled" => RunStatus::Cancelled,
            "expired" => RunStatus::Expired,
            other => RunStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Unknown(s) => s,
        }
    }

    /// True exactly while the poll loop must keep fetching.
    pub fn is_pending(&self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::InProgress)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asynchronous job executing an agent against a thread. References
/// exactly one thread and one agent, both of which must already exist.
#[derive(Clone, Debug)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub agent_id: String,
    pub status: RunStatus,
    /// Populated by the service for failed runs.
    pub last_error: Option<String>,
}

// ─── Files ───────────────────────────────────────────────────────

/// An uploaded file, referenced from messages by id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: String,
    pub filename: String,
    pub purpose: String,
    pub uploaded_at: String,
}

/// Purpose tag attached to uploads destined for agent file search.
pub const FILE_PURPOSE_AGENTS: &str = "agents";

// ─── Service Interface ───────────────────────────────────────────

/// The remote agent service. The HTTP client implements this; tests script
/// it. All errors are transport or service errors and propagate as-is --
/// unsuccessful run statuses are values, not errors.
#[async_trait]
pub trait AgentService: Send + Sync {
    async fn create_agent(&self, spec: &AgentSpec) -> anyhow::Result<Agent>;
    async fn delete_agent(&self, agent_id: &str) -> anyhow::Result<()>;

    async fn create_thread(&self) -> anyhow::Result<ThreadInfo>;
    async fn delete_thread(&self, thread_id: &str) -> anyhow::Result<()>;

    async fn create_message(
        &self,
        thread_id: &str,
        message: &NewMessage,
    ) -> anyhow::Result<ThreadMessage>;
    async fn list_messages(
        &self,
        thread_id: &str,
        order: MessageOrder,
    ) -> anyhow::Result<Vec<ThreadMessage>>;

    async fn create_run(
        &self,
        thread_id: &str,
        agent_id: &str,
        seed: &[NewMessage],
    ) -> anyhow::Result<Run>;
    async fn get_run(&self, thread_id: &str, run_id: &str) -> anyhow::Result<Run>;

    async fn upload_file(
        &self,
        filename: &str,
        bytes: &[u8],
        purpose: &str,
    ) -> anyhow::Result<FileInfo>;
    async fn delete_file(&self, file_id: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_parse_round_trips_known_values() {
        for s in [
            "queued",
            "in_progress",
            "requires_action",
            "completed",
            "failed",
            "cancelled",
            "expired",
        ] {
            assert_eq!(RunStatus::parse(s).as_str(), s);
        }
    }

    #[test]
    fn run_status_pending_split() {
        assert!(RunStatus::Queued.is_pending());
        assert!(RunStatus::InProgress.is_pending());
        assert!(!RunStatus::RequiresAction.is_pending());
        assert!(!RunStatus::Completed.is_pending());
        assert!(!RunStatus::Failed.is_pending());
        assert!(!RunStatus::Cancelled.is_pending());
        assert!(!RunStatus::Expired.is_pending());
    }

    #[test]
    fn unknown_status_is_terminal() {
        let status = RunStatus::parse("incomplete");
        assert_eq!(status, RunStatus::Unknown("incomplete".to_string()));
        assert!(!status.is_pending());
    }

    #[test]
    fn tool_wire_shapes() {
        let code = ToolSpec::CodeInterpreter.to_wire();
        assert_eq!(code["type"], "code_interpreter");

        let search = ToolSpec::FileSearch {
            vector_store_ids: vec!["vs-1".to_string()],
        }
        .to_wire();
        assert_eq!(search["type"], "file_search");
        assert_eq!(search["file_search"]["vector_store_ids"][0], "vs-1");

        let func = ToolSpec::Function {
            name: "get_weather".to_string(),
            description: "Look up the weather".to_string(),
            parameters: serde_json::json!({ "type": "object" }),
        }
        .to_wire();
        assert_eq!(func["function"]["name"], "get_weather");
    }

    #[test]
    fn new_message_builders() {
        let msg = NewMessage::user("hello").with_attachment("file-1");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.attachments, vec!["file-1".to_string()]);
        assert_eq!(NewMessage::assistant("hi").role, MessageRole::Assistant);
    }
}
