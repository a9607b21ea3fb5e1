//! Run Module
//!
//! The run driver (status polling protocol) and the result reader.

pub mod driver;
pub mod reader;

pub use driver::{CancelFlag, PollPolicy, RunDriver, WaitError};
