//! Asynchronous task records and the polling schedule.
//!
//! A task is an operation the controller runs in the background; mutating
//! calls answer with a `taskId` that is then polled at `task/{id}` until it
//! reaches a terminal state.
//!
//! The schedule is kept pure: [`PollPolicy::next_sleep`] and
//! [`PollPolicy::next_interval`] compute what the poller should do next from
//! the current interval and elapsed time, without sleeping themselves.

use crate::envelope::{flatten, scalar_to_string, Attr, JsonResponse};
use crate::error::{DnacError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Default overall polling deadline
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(125);

/// Default first sleep between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default multiplier applied to the interval after each non-terminal poll
pub const DEFAULT_BACKOFF: f64 = 1.15;

/// Status of a task as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Snapshot of one task, parsed from a `task/{id}` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    /// Epoch milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
    /// Epoch milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl TaskRecord {
    /// Parse the task object, found under `response` or at the body root.
    ///
    /// `isError == true` marks the task failed, a present `endTime` marks it
    /// succeeded, `startTime` or `progress` mark it running; anything else is
    /// pending.
    pub fn from_response(task_id: &str, response: &JsonResponse) -> Result<Self> {
        let wrapped = response.get("response");
        let task = match wrapped {
            Attr::Present(Value::Object(_)) => wrapped,
            Attr::Absent if response.raw().is_object() => response.root(),
            _ => {
                return Err(DnacError::Decode {
                    message: format!("Task {} response is not a task object", task_id),
                    body: response.raw().to_string(),
                })
            }
        };

        let text = |key: &str| match task.get(key) {
            Attr::Present(Value::Null) | Attr::Absent => None,
            Attr::Present(value) => Some(scalar_to_string(value)),
        };
        let millis = |key: &str| {
            let attr = task.get(key);
            attr.as_u64()
                .or_else(|| attr.as_f64().map(|v| v.max(0.0) as u64))
                .or_else(|| attr.as_str().and_then(|s| s.parse().ok()))
        };

        let is_error = task.get("isError").as_bool().unwrap_or(false);
        let end_time = millis("endTime");
        let start_time = millis("startTime");
        let progress = text("progress");

        let state = if is_error {
            TaskState::Failed
        } else if end_time.is_some() {
            TaskState::Succeeded
        } else if start_time.is_some() || progress.is_some() {
            TaskState::Running
        } else {
            TaskState::Pending
        };

        Ok(Self {
            task_id: task_id.to_string(),
            state,
            error_code: text("errorCode"),
            failure_reason: text("failureReason"),
            progress,
            start_time,
            end_time,
            data: task.get("data").value().filter(|v| !v.is_null()).cloned(),
        })
    }

    /// Human-readable summary: error code, failure reason, and progress.
    pub fn summary(&self) -> String {
        let fields = serde_json::json!({
            "errorCode": self.error_code,
            "failureReason": self.failure_reason,
            "progress": self.progress,
        });
        let summary = flatten(": ", &fields, &["errorCode", "failureReason", "progress"]);
        if summary.is_empty() {
            format!("task {}", self.state)
        } else {
            summary
        }
    }

    /// Wall-clock run time reported by the controller.
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if end >= start => Some(Duration::from_millis(end - start)),
            _ => None,
        }
    }
}

/// Bounded exponential backoff for task polling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// Overall deadline, measured from the first poll
    pub timeout: Duration,
    /// First sleep between polls
    pub interval: Duration,
    /// Interval multiplier, at least 1.0
    pub backoff: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TASK_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration, backoff: f64) -> Result<Self> {
        let policy = Self {
            timeout,
            interval,
            backoff,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Build a policy from seconds, as entered on a command line.
    pub fn from_secs(timeout: f64, interval: f64, backoff: f64) -> Result<Self> {
        let seconds = |name: &str, value: f64| {
            Duration::try_from_secs_f64(value).map_err(|_| {
                DnacError::Config(format!("Invalid {} of {} seconds", name, value))
            })
        };
        Self::new(seconds("timeout", timeout)?, seconds("interval", interval)?, backoff)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(DnacError::Config(
                "Task timeout must be greater than 0".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(DnacError::Config(
                "Poll interval must be greater than 0".to_string(),
            ));
        }
        if !self.backoff.is_finite() || self.backoff < 1.0 {
            return Err(DnacError::Config(format!(
                "Backoff must be a finite number >= 1.0, got {}",
                self.backoff
            )));
        }
        Ok(())
    }

    /// Sleep to take after a non-terminal poll at `elapsed`, capped at the
    /// remaining budget. `None` once the deadline has been reached.
    pub fn next_sleep(&self, interval: Duration, elapsed: Duration) -> Option<Duration> {
        let remaining = self.timeout.checked_sub(elapsed)?;
        if remaining.is_zero() {
            return None;
        }
        Some(interval.min(remaining))
    }

    /// Interval for the round after `interval`. Never exceeds the timeout.
    pub fn next_interval(&self, interval: Duration) -> Duration {
        Duration::try_from_secs_f64(interval.as_secs_f64() * self.backoff)
            .unwrap_or(self.timeout)
            .min(self.timeout)
    }

    /// Sleeps the poller would take if every poll came back non-terminal.
    ///
    /// The poll count is one more than the number of sleeps that end before
    /// the deadline.
    pub fn schedule(&self) -> Schedule<'_> {
        Schedule {
            policy: self,
            interval: self.interval,
            elapsed: Duration::ZERO,
        }
    }
}

/// Iterator over the sleeps of a [`PollPolicy`]. See [`PollPolicy::schedule`].
#[derive(Debug, Clone)]
pub struct Schedule<'a> {
    policy: &'a PollPolicy,
    interval: Duration,
    elapsed: Duration,
}

impl Iterator for Schedule<'_> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let sleep = self.policy.next_sleep(self.interval, self.elapsed)?;
        self.elapsed += sleep;
        self.interval = self.policy.next_interval(self.interval);
        Some(sleep)
    }
}
