//! Session Teardown
//!
//! Best-effort deletion of session-created resources in reverse creation
//! order: files, then the thread, then the agent. Not transactional -- a
//! failed deletion is recorded and the remaining deletions still run.

use tracing::warn;

use crate::types::AgentService;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Thread,
    Agent,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::File => "file",
            ResourceKind::Thread => "thread",
            ResourceKind::Agent => "agent",
        }
    }
}

/// The result of one deletion attempt.
#[derive(Clone, Debug)]
pub struct TeardownOutcome {
    pub resource: ResourceKind,
    pub id: String,
    /// `None` when the deletion succeeded.
    pub error: Option<String>,
}

/// Per-resource outcomes of a teardown pass, in attempt order.
#[derive(Clone, Debug, Default)]
pub struct TeardownReport {
    pub outcomes: Vec<TeardownOutcome>,
}

impl TeardownReport {
    /// True when every attempted deletion succeeded.
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(|o| o.error.is_none())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TeardownOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }

    fn record(&mut self, resource: ResourceKind, id: &str, result: anyhow::Result<()>) {
        let error = result.err().map(|e| format!("{:#}", e));
        if let Some(ref msg) = error {
            warn!("failed to delete {} {}: {}", resource.as_str(), id, msg);
        }
        self.outcomes.push(TeardownOutcome {
            resource,
            id: id.to_string(),
            error,
        });
    }
}

/// Delete the given resources in reverse creation order. Files are deleted
/// newest-first. Every deletion is attempted regardless of earlier
/// failures.
pub async fn teardown(
    service: &dyn AgentService,
    files: &[String],
    thread_id: Option<&str>,
    agent_id: Option<&str>,
) -> TeardownReport {
    let mut report = TeardownReport::default();

    for file_id in files.iter().rev() {
        report.record(
            ResourceKind::File,
            file_id,
            service.delete_file(file_id).await,
        );
    }

    if let Some(id) = thread_id {
        report.record(ResourceKind::Thread, id, service.delete_thread(id).await);
    }

    if let Some(id) = agent_id {
        report.record(ResourceKind::Agent, id, service.delete_agent(id).await);
    }

    report
}
