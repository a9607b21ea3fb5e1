//! Agent Service Module
//!
//! HTTP implementation of the `AgentService` trait: agent and thread
//! lifecycle, message append/list, run create/fetch, and file upload.

pub mod client;
pub mod files;

pub use client::AgentHttpClient;
