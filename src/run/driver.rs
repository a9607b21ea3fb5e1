//! The Run Driver
//!
//! Drives an asynchronous remote run to a settled state by status polling.
//! The service offers no push channel, so the driver submits the run and
//! then re-fetches its status until it leaves the pending states. The final
//! status is authoritative: a run that settled as failed, cancelled, expired
//! or requires-action is returned as a value, never as an error. Only
//! transport failures, the wait deadline, and cancellation produce errors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::types::{AgentService, NewMessage, Run, RunStatus};

/// Polling parameters. The default is a fixed 500 ms interval with no
/// backoff and no deadline.
#[derive(Clone, Debug)]
pub struct PollPolicy {
    /// Initial sleep between status fetches.
    pub interval: Duration,
    /// Multiplier applied to the sleep after every fetch. 1.0 disables
    /// backoff.
    pub backoff: f64,
    /// Ceiling for the backed-off sleep.
    pub max_interval: Duration,
    /// Overall wait ceiling. `None` waits indefinitely.
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            backoff: 1.0,
            max_interval: Duration::from_secs(30),
            max_wait: None,
        }
    }
}

impl PollPolicy {
    /// A fixed-interval policy with no backoff and no deadline.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn with_backoff(mut self, backoff: f64, max_interval: Duration) -> Self {
        self.backoff = backoff;
        self.max_interval = max_interval;
        self
    }

    /// The sleep to use after `current` has been slept once.
    fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff <= 1.0 {
            return current;
        }
        current.mul_f64(self.backoff).min(self.max_interval)
    }
}

/// Clonable cancellation handle. Raising it stops an in-flight wait before
/// the next status fetch.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a wait stopped without observing a settled run. Matchable via
/// `anyhow::Error::downcast_ref::<WaitError>()`.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("run wait cancelled while status was {last_status}")]
    Cancelled { last_status: RunStatus },
    #[error("run still {last_status} after waiting {waited:?}")]
    DeadlineExceeded {
        last_status: RunStatus,
        waited: Duration,
    },
}

/// Drives runs against an `AgentService` with a fixed policy and an
/// optional cancellation flag.
pub struct RunDriver<'a> {
    service: &'a dyn AgentService,
    policy: PollPolicy,
    cancel: CancelFlag,
}

impl<'a> RunDriver<'a> {
    pub fn new(service: &'a dyn AgentService, policy: PollPolicy) -> Self {
        Self {
            service,
            policy,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Submit a run binding `thread_id` to `agent_id` (optionally seeding
    /// extra messages) and wait for it to settle.
    pub async fn submit_and_wait(
        &self,
        thread_id: &str,
        agent_id: &str,
        seed: &[NewMessage],
    ) -> Result<Run> {
        let run = self.service.create_run(thread_id, agent_id, seed).await?;
        info!("run {} created with status {}", run.id, run.status);
        self.wait(thread_id, run).await
    }

    /// Poll `run` until its status is no longer pending.
    ///
    /// A run that is already settled returns immediately with zero fetches.
    /// Each poll is a read-only remote call; transport errors propagate
    /// without retry.
    pub async fn wait(&self, thread_id: &str, mut run: Run) -> Result<Run> {
        let started = Instant::now();
        let mut interval = self.policy.interval;

        while run.status.is_pending() {
            if self.cancel.is_cancelled() {
                return Err(WaitError::Cancelled {
                    last_status: run.status.clone(),
                }
                .into());
            }

            if let Some(max_wait) = self.policy.max_wait {
                let waited = started.elapsed();
                if waited >= max_wait {
                    return Err(WaitError::DeadlineExceeded {
                        last_status: run.status.clone(),
                        waited,
                    }
                    .into());
                }
            }

            sleep(interval).await;
            run = self.service.get_run(thread_id, &run.id).await?;
            debug!("run {} status {}", run.id, run.status);
            interval = self.policy.next_interval(interval);
        }

        info!(
            "run {} settled as {} after {:?}",
            run.id,
            run.status,
            started.elapsed()
        );
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::testing::ScriptedService;
    use crate::types::RunStatus::*;

    fn quick_policy() -> PollPolicy {
        PollPolicy::fixed(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn polls_until_completed() {
        let service = ScriptedService::with_statuses([Queued, InProgress, Completed]);
        let driver = RunDriver::new(&service, quick_policy());

        let run = driver.submit_and_wait("thread-1", "agent-1", &[]).await.unwrap();

        assert_eq!(run.status, Completed);
        // Creation observed "queued"; the two pending observations each
        // forced one more fetch.
        assert_eq!(service.fetch_count(), 2);
    }

    #[tokio::test]
    async fn failed_run_is_returned_not_raised() {
        let service = ScriptedService::with_statuses([Queued, Failed]);
        let driver = RunDriver::new(&service, quick_policy());

        let run = driver.submit_and_wait("thread-1", "agent-1", &[]).await.unwrap();

        assert_eq!(run.status, Failed);
        assert_eq!(run.last_error.as_deref(), Some("scripted failure"));
        assert_eq!(service.fetch_count(), 1);
    }

    #[tokio::test]
    async fn settled_at_creation_needs_no_fetch() {
        for status in [Completed, RequiresAction, Cancelled, Expired] {
            let service = ScriptedService::with_statuses([status.clone()]);
            let driver = RunDriver::new(&service, quick_policy());

            let run = driver.submit_and_wait("thread-1", "agent-1", &[]).await.unwrap();

            assert_eq!(run.status, status);
            assert_eq!(service.fetch_count(), 0);
        }
    }

    #[tokio::test]
    async fn unknown_status_stops_the_loop() {
        let service = ScriptedService::with_statuses([Queued, Unknown("paused".to_string())]);
        let driver = RunDriver::new(&service, quick_policy());

        let run = driver.submit_and_wait("thread-1", "agent-1", &[]).await.unwrap();

        assert_eq!(run.status, Unknown("paused".to_string()));
        assert_eq!(service.fetch_count(), 1);
    }

    #[tokio::test]
    async fn sleeps_at_least_the_interval_between_fetches() {
        let interval = Duration::from_millis(25);
        let service = ScriptedService::with_statuses([Queued, InProgress, Completed]);
        let driver = RunDriver::new(&service, PollPolicy::fixed(interval));

        let before = Instant::now();
        driver.submit_and_wait("thread-1", "agent-1", &[]).await.unwrap();

        // Two sleeps happened; lower bound only, the upper bound is the
        // scheduler's business.
        assert!(before.elapsed() >= interval * 2);

        let times = service.fetch_times.lock().unwrap();
        assert!(times[1].duration_since(times[0]) >= interval);
    }

    #[tokio::test]
    async fn deadline_exceeded_surfaces_wait_error() {
        let service = ScriptedService::with_statuses([Queued, InProgress]);
        let policy = quick_policy().with_max_wait(Duration::from_millis(1));
        let driver = RunDriver::new(&service, policy);

        let err = driver
            .submit_and_wait("thread-1", "agent-1", &[])
            .await
            .unwrap_err();

        match err.downcast_ref::<WaitError>() {
            Some(WaitError::DeadlineExceeded { last_status, .. }) => {
                assert!(last_status.is_pending());
            }
            other => panic!("expected DeadlineExceeded, got {:?}", other),
        }
        // The deadline fired before the script could run out.
        assert!(service.fetch_count() <= 1);
    }

    #[tokio::test]
    async fn raised_flag_cancels_before_any_fetch() {
        let service = ScriptedService::with_statuses([Queued]);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let driver = RunDriver::new(&service, quick_policy()).with_cancel_flag(cancel);

        let err = driver
            .submit_and_wait("thread-1", "agent-1", &[])
            .await
            .unwrap_err();

        match err.downcast_ref::<WaitError>() {
            Some(WaitError::Cancelled { last_status }) => assert_eq!(*last_status, Queued),
            other => panic!("expected Cancelled, got {:?}", other),
        }
        assert_eq!(service.fetch_count(), 0);
    }

    #[test]
    fn backoff_grows_and_caps_the_interval() {
        let policy = PollPolicy::fixed(Duration::from_millis(100))
            .with_backoff(2.0, Duration::from_millis(300));

        let first = policy.next_interval(policy.interval);
        assert_eq!(first, Duration::from_millis(200));
        let second = policy.next_interval(first);
        assert_eq!(second, Duration::from_millis(300));
        let third = policy.next_interval(second);
        assert_eq!(third, Duration::from_millis(300));
    }

    #[test]
    fn default_policy_is_fixed_interval_without_deadline() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(500));
        assert_eq!(policy.backoff, 1.0);
        assert!(policy.max_wait.is_none());
        assert_eq!(policy.next_interval(policy.interval), policy.interval);
    }
}
