//! Commit job polling
//!
//! A commit returns a job id; the job is then polled until it finishes or
//! the deadline passes. [`CommitPoller`] is a plain state machine so the
//! transition rules can be tested without a clock; [`CommitPoller::wait`]
//! drives it against any [`JobStatusSource`].

use crate::core::error::Result;
use crate::panos::decode::JobStatus;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitState {
    Pending,
    InProgress { progress: u32 },
    FinishedOk,
    FinishedError(String),
    TimedOut,
}

impl CommitState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CommitState::FinishedOk | CommitState::FinishedError(_) | CommitState::TimedOut
        )
    }

    /// Next state after observing `status`. Terminal states never change.
    pub fn on_status(&self, status: &JobStatus) -> CommitState {
        if self.is_terminal() {
            return self.clone();
        }

        match status.status.as_str() {
            "FIN" if status.result.as_deref() == Some("OK") => CommitState::FinishedOk,
            "FIN" => {
                let details = if status.details.is_empty() {
                    "Unknown error".to_string()
                } else {
                    status.details.clone()
                };
                CommitState::FinishedError(details)
            }
            "ACT" => CommitState::InProgress {
                progress: status.progress,
            },
            "PEND" => CommitState::Pending,
            _ => self.clone(),
        }
    }
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitState::Pending => write!(f, "Commit pending"),
            CommitState::InProgress { progress } => write!(f, "Commit in progress ({progress}%)"),
            CommitState::FinishedOk => write!(f, "Commit successful"),
            CommitState::FinishedError(details) => write!(f, "Commit failed: {details}"),
            CommitState::TimedOut => write!(f, "Commit timed out"),
        }
    }
}

/// Anything that can report the status of a PAN-OS job
pub trait JobStatusSource {
    fn job_status(&mut self, job_id: &str) -> impl Future<Output = Result<JobStatus>> + Send;
}

#[derive(Debug, Clone)]
pub struct CommitPoller {
    state: CommitState,
    timeout: Duration,
    interval: Duration,
}

impl Default for CommitPoller {
    fn default() -> Self {
        Self::new(DEFAULT_COMMIT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

impl CommitPoller {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            state: CommitState::Pending,
            timeout,
            interval,
        }
    }

    pub fn state(&self) -> &CommitState {
        &self.state
    }

    pub fn observe(&mut self, status: &JobStatus) -> &CommitState {
        self.state = self.state.on_status(status);
        &self.state
    }

    /// Marks the poll as timed out once `elapsed` reaches the timeout,
    /// unless a terminal state was already reached.
    pub fn observe_elapsed(&mut self, elapsed: Duration) -> &CommitState {
        if !self.state.is_terminal() && elapsed >= self.timeout {
            self.state = CommitState::TimedOut;
        }
        &self.state
    }

    /// Polls `source` every interval until the job reaches a terminal state.
    ///
    /// Errors from the source abort the wait.
    pub async fn wait<S: JobStatusSource>(
        &mut self,
        source: &mut S,
        job_id: &str,
    ) -> Result<CommitState> {
        let start = tokio::time::Instant::now();

        loop {
            if self.observe_elapsed(start.elapsed()).is_terminal() {
                warn!("Commit job {job_id} timed out after {:?}", self.timeout);
                return Ok(self.state.clone());
            }

            let status = source.job_status(job_id).await?;
            let state = self.observe(&status);
            debug!("Commit job {job_id}: {state}");

            if state.is_terminal() {
                info!("Commit job {job_id}: {state}");
                return Ok(self.state.clone());
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
