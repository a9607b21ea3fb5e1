//! Agentflow -- Hosted Agent Service Client
//!
//! An async client for a hosted agent service: create an agent, open a
//! conversation thread, append messages, drive a run to completion by
//! status polling, read the replies, and tear down every created resource.

pub mod config;
pub mod run;
pub mod service;
pub mod session;
pub mod types;

pub use config::Config;
pub use run::{CancelFlag, PollPolicy, RunDriver, WaitError};
pub use service::AgentHttpClient;
pub use session::{Session, TeardownReport};
pub use types::{AgentService, AgentSpec, NewMessage, Run, RunStatus, ToolSpec};
