//! Session Module
//!
//! One linear conversation session against the agent service: create an
//! agent, create a thread, append messages, drive a run, read the replies,
//! tear everything down. The session tracks every resource it creates so
//! teardown can delete them in reverse creation order.

pub mod teardown;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::run::{driver::RunDriver, reader, CancelFlag, PollPolicy};
use crate::types::{
    Agent, AgentService, AgentSpec, FileInfo, NewMessage, Run, RunStatus, ThreadInfo,
    ThreadMessage, FILE_PURPOSE_AGENTS,
};

pub use teardown::{ResourceKind, TeardownOutcome, TeardownReport};

/// A single linear session. Holds at most one agent and one thread; the
/// service owns the actual resources.
pub struct Session {
    service: Arc<dyn AgentService>,
    model: String,
    policy: PollPolicy,
    cancel: CancelFlag,
    files: Vec<String>,
    thread_id: Option<String>,
    agent_id: Option<String>,
}

impl Session {
    /// Bootstrap a session from a validated config and a service handle.
    pub fn new(service: Arc<dyn AgentService>, config: &Config) -> Self {
        let mut policy = PollPolicy::fixed(config.poll_interval());
        policy.max_wait = config.max_wait();

        Self {
            service,
            model: config.model_deployment.clone(),
            policy,
            cancel: CancelFlag::new(),
            files: Vec::new(),
            thread_id: None,
            agent_id: None,
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// A handle that aborts an in-flight `drive_run` wait when raised.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// The model deployment agents in this session are created with.
    pub fn model(&self) -> &str {
        &self.model
    }

    // ── Resource creation ────────────────────────────────────────

    /// Submit the agent definition. A session drives exactly one agent.
    pub async fn create_agent(&mut self, spec: &AgentSpec) -> Result<Agent> {
        if self.agent_id.is_some() {
            anyhow::bail!("Session already has an agent");
        }
        let agent = self
            .service
            .create_agent(spec)
            .await
            .context("Failed to create agent")?;
        info!("created agent {} ({})", agent.id, agent.name);
        self.agent_id = Some(agent.id.clone());
        Ok(agent)
    }

    /// Convenience: an agent with the session's model and no tools.
    pub async fn create_plain_agent(&mut self, name: &str, instructions: &str) -> Result<Agent> {
        let model = self.model.clone();
        self.create_agent(&AgentSpec::new(name, &model, instructions))
            .await
    }

    pub async fn create_thread(&mut self) -> Result<ThreadInfo> {
        if self.thread_id.is_some() {
            anyhow::bail!("Session already has a thread");
        }
        let thread = self
            .service
            .create_thread()
            .await
            .context("Failed to create thread")?;
        info!("created thread {}", thread.id);
        self.thread_id = Some(thread.id.clone());
        Ok(thread)
    }

    /// Upload a file for later attachment. Tracked for teardown.
    pub async fn upload_file(&mut self, filename: &str, bytes: &[u8]) -> Result<FileInfo> {
        let file = self
            .service
            .upload_file(filename, bytes, FILE_PURPOSE_AGENTS)
            .await
            .with_context(|| format!("Failed to upload {}", filename))?;
        info!("uploaded file {} as {}", filename, file.id);
        self.files.push(file.id.clone());
        Ok(file)
    }

    /// Append a message to the session thread.
    pub async fn post_message(&self, message: &NewMessage) -> Result<ThreadMessage> {
        let thread_id = self.require_thread()?;
        self.service
            .create_message(thread_id, message)
            .await
            .context("Failed to append message")
    }

    // ── Run & results ────────────────────────────────────────────

    /// Submit a run for the session's thread and agent and poll it to a
    /// settled state. The returned status is authoritative; callers must
    /// branch on it.
    pub async fn drive_run(&self, seed: &[NewMessage]) -> Result<Run> {
        let thread_id = self.require_thread()?;
        let agent_id = self
            .agent_id
            .as_deref()
            .context("Session has no agent yet")?;

        RunDriver::new(self.service.as_ref(), self.policy.clone())
            .with_cancel_flag(self.cancel.clone())
            .submit_and_wait(thread_id, agent_id, seed)
            .await
    }

    /// All messages in the session thread, oldest first.
    pub async fn messages(&self) -> Result<Vec<ThreadMessage>> {
        reader::read_thread(self.service.as_ref(), self.require_thread()?).await
    }

    /// Rendered text of the assistant messages, oldest first.
    pub async fn assistant_replies(&self) -> Result<Vec<String>> {
        reader::assistant_replies(self.service.as_ref(), self.require_thread()?).await
    }

    /// The canonical one-shot flow: post `prompt` as a user message, drive
    /// a run, and return the latest assistant reply. A run that settles in
    /// any state other than completed is an error here -- callers that need
    /// to branch on the status use `drive_run` directly.
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        self.post_message(&NewMessage::user(prompt)).await?;
        let run = self.drive_run(&[]).await?;

        match run.status {
            RunStatus::Completed => {}
            RunStatus::RequiresAction => {
                anyhow::bail!("Run {} requested a tool call, which this client does not serve", run.id)
            }
            status => anyhow::bail!(
                "Run {} settled as {}{}",
                run.id,
                status,
                run.last_error
                    .as_deref()
                    .map(|e| format!(": {}", e))
                    .unwrap_or_default()
            ),
        }

        let replies = self.assistant_replies().await?;
        replies
            .into_iter()
            .last()
            .context("Run completed but the thread has no assistant reply")
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Best-effort deletion of everything this session created, in reverse
    /// creation order. Every deletion is attempted even if earlier ones
    /// fail; the report records each outcome individually.
    pub async fn teardown(&mut self) -> TeardownReport {
        let report = teardown::teardown(
            self.service.as_ref(),
            &self.files,
            self.thread_id.as_deref(),
            self.agent_id.as_deref(),
        )
        .await;

        self.files.clear();
        self.thread_id = None;
        self.agent_id = None;
        report
    }

    fn require_thread(&self) -> Result<&str> {
        self.thread_id
            .as_deref()
            .context("Session has no thread yet")
    }
}
