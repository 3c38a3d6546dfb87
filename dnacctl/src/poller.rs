//! Task polling with bounded exponential backoff.

use crate::client::Dnac;
use crate::transport::Transport;
use dnac_core::{DnacError, JsonResponse, PollPolicy, Result, TaskRecord, TaskState};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Outcome of a task that finished successfully.
#[derive(Debug, Clone)]
pub struct CompletedTask {
    pub record: TaskRecord,
    /// Final `task/{id}` response
    pub response: JsonResponse,
    /// Number of task fetches made, including the terminal one
    pub polls: u32,
    /// Time from the first poll to completion
    pub elapsed: Duration,
}

/// Validate a task id, returning it trimmed.
fn checked_task_id(task_id: &str) -> Result<&str> {
    let id = task_id.trim();
    let invalid = id.is_empty()
        || id.contains(['/', '\\', '?', '#'])
        || id.contains("..")
        || id.chars().any(char::is_whitespace);
    if invalid {
        return Err(DnacError::Config(format!("Invalid task id: {:?}", task_id)));
    }
    Ok(id)
}

fn task_path(task_id: &str) -> String {
    format!("task/{}", task_id)
}

fn timed_out(task_id: &str, start: Instant, policy: &PollPolicy) -> DnacError {
    DnacError::Timeout {
        task_id: task_id.to_string(),
        elapsed: start.elapsed(),
        timeout: policy.timeout,
    }
}

impl<T: Transport> Dnac<T> {
    /// Fetch the current state of a task once.
    pub async fn task_status(&self, task_id: &str) -> Result<TaskRecord> {
        let task_id = checked_task_id(task_id)?;
        let response = self.get(&task_path(task_id)).send().await?;
        TaskRecord::from_response(task_id, &response)
    }

    /// Poll `task/{task_id}` until it reaches a terminal state.
    ///
    /// The first poll happens immediately. After each non-terminal poll the
    /// poller sleeps for the current interval (capped at the budget left),
    /// then multiplies the interval by the backoff. No poll starts once the
    /// timeout has elapsed.
    ///
    /// # Errors
    ///
    /// - [`DnacError::Config`] for an invalid policy or task id (nothing is
    ///   sent)
    /// - [`DnacError::Task`] as soon as the task reports failure
    /// - [`DnacError::Timeout`] when the deadline passes first
    /// - any error from the underlying call, unchanged
    pub async fn wait_on_task(&self, task_id: &str, policy: PollPolicy) -> Result<CompletedTask> {
        policy.validate()?;
        let task_id = checked_task_id(task_id)?;
        let path = task_path(task_id);

        let start = Instant::now();
        let mut interval = policy.interval;
        let mut polls = 0u32;

        loop {
            let remaining = policy.timeout.saturating_sub(start.elapsed());
            let response = match tokio::time::timeout(remaining, self.get(&path).send()).await {
                Ok(result) => result?,
                Err(_) => return Err(timed_out(task_id, start, &policy)),
            };
            polls += 1;

            let record = TaskRecord::from_response(task_id, &response)?;
            debug!("Task {} poll {}: {}", task_id, polls, record.state);

            match record.state {
                TaskState::Succeeded => {
                    let elapsed = start.elapsed();
                    info!(
                        "Task {} completed after {} polls in {:.1}s",
                        task_id,
                        polls,
                        elapsed.as_secs_f64()
                    );
                    return Ok(CompletedTask {
                        record,
                        response,
                        polls,
                        elapsed,
                    });
                }
                TaskState::Failed => {
                    return Err(DnacError::Task {
                        task_id: task_id.to_string(),
                        reason: record.summary(),
                        response: Box::new(response),
                    });
                }
                TaskState::Pending | TaskState::Running => {}
            }

            let sleep = policy
                .next_sleep(interval, start.elapsed())
                .ok_or_else(|| timed_out(task_id, start, &policy))?;
            info!(
                "Task {} is {}, sleeping {:.1} seconds",
                task_id,
                record.state,
                sleep.as_secs_f64()
            );
            tokio::time::sleep(sleep).await;

            if start.elapsed() >= policy.timeout {
                return Err(timed_out(task_id, start, &policy));
            }
            interval = policy.next_interval(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{task_body, ScriptedTransport};
    use dnac_core::{ClientOptions, HttpResponse};
    use serde_json::json;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    async fn session(transport: &ScriptedTransport) -> Dnac<ScriptedTransport> {
        transport.queue_login("tok");
        let mut dnac =
            Dnac::with_transport("https://dnac.example.com", ClientOptions::default(), transport.clone())
                .unwrap();
        dnac.login("admin", "pw").await.unwrap();
        dnac
    }

    fn queue_states(transport: &ScriptedTransport, states: &[TaskState]) {
        for state in states {
            transport.queue_json(200, task_body(*state));
        }
    }

    /// Task fetches recorded by the transport, login excluded.
    fn task_polls(transport: &ScriptedTransport) -> usize {
        transport
            .requests()
            .iter()
            .filter(|r| r.url.path().ends_with("/task/t1"))
            .count()
    }

    #[test]
    fn test_checked_task_id() {
        assert_eq!(checked_task_id("t1").unwrap(), "t1");
        assert_eq!(checked_task_id(" abc-123 ").unwrap(), "abc-123");
        assert_eq!(task_path("abc-123"), "task/abc-123");
        for bad in ["", "  ", "a/b", "../x", "a?b", "a b"] {
            assert!(
                matches!(checked_task_id(bad), Err(DnacError::Config(_))),
                "{:?}",
                bad
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_padded_task_id_is_trimmed_everywhere() {
        let transport = ScriptedTransport::new();
        let dnac = session(&transport).await;

        queue_states(&transport, &[TaskState::Running]);
        let record = dnac.task_status(" t1 ").await.unwrap();
        assert_eq!(record.task_id, "t1");

        queue_states(&transport, &[TaskState::Succeeded]);
        let done = dnac.wait_on_task("t1\n", PollPolicy::default()).await.unwrap();
        assert_eq!(done.record.task_id, "t1");

        queue_states(&transport, &[TaskState::Failed]);
        match dnac.wait_on_task("  t1", PollPolicy::default()).await {
            Err(DnacError::Task { task_id, .. }) => assert_eq!(task_id, "t1"),
            other => panic!("expected task error, got {:?}", other),
        }

        queue_states(&transport, &[TaskState::Running; 3]);
        let policy = PollPolicy::new(secs(3), secs(2), 1.0).unwrap();
        match dnac.wait_on_task("t1 ", policy).await {
            Err(DnacError::Timeout { task_id, .. }) => assert_eq!(task_id, "t1"),
            other => panic!("expected timeout, got {:?}", other),
        }

        let paths: Vec<String> = transport
            .requests()
            .iter()
            .skip(1)
            .map(|r| r.url.path().to_string())
            .collect();
        assert!(paths.iter().all(|p| p == "/dna/intent/api/v1/task/t1"), "{:?}", paths);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_until_success() {
        let transport = ScriptedTransport::new();
        let dnac = session(&transport).await;
        queue_states(
            &transport,
            &[
                TaskState::Pending,
                TaskState::Pending,
                TaskState::Running,
                TaskState::Succeeded,
            ],
        );

        let policy = PollPolicy::new(secs(100), secs(1), 2.0).unwrap();
        let started = Instant::now();
        let done = dnac.wait_on_task("t1", policy).await.unwrap();

        assert_eq!(done.polls, 4);
        assert_eq!(task_polls(&transport), 4);
        assert_eq!(done.elapsed, secs(7));
        assert_eq!(started.elapsed(), secs(7));
        assert_eq!(done.record.state, TaskState::Succeeded);
        assert_eq!(done.record.data, Some(json!("site-42")));
        assert_eq!(done.response.lookup("response.progress").as_str(), Some("Site created"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_is_reproducible_across_runs() {
        let policy = PollPolicy::new(secs(100), secs(1), 2.0).unwrap();
        let mut outcomes = Vec::new();

        for _ in 0..2 {
            let transport = ScriptedTransport::new();
            let dnac = session(&transport).await;
            queue_states(
                &transport,
                &[TaskState::Pending, TaskState::Running, TaskState::Succeeded],
            );
            let done = dnac.wait_on_task("t1", policy).await.unwrap();
            outcomes.push((done.polls, done.elapsed));
        }

        assert_eq!(outcomes[0], outcomes[1]);
        assert_eq!(outcomes[0], (3, secs(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_terminal_state() {
        let transport = ScriptedTransport::new();
        let dnac = session(&transport).await;
        queue_states(&transport, &[TaskState::Running; 6]);

        let policy = PollPolicy::new(secs(5), secs(2), 1.0).unwrap();
        let err = dnac.wait_on_task("t1", policy).await.unwrap_err();

        match err {
            DnacError::Timeout {
                task_id,
                elapsed,
                timeout,
            } => {
                assert_eq!(task_id, "t1");
                assert_eq!(elapsed, secs(5));
                assert_eq!(timeout, secs(5));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        // polls at 0s, 2s and 4s; none at or after the deadline
        assert_eq!(task_polls(&transport), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_task_stops_polling() {
        let transport = ScriptedTransport::new();
        let dnac = session(&transport).await;
        queue_states(
            &transport,
            &[TaskState::Running, TaskState::Failed, TaskState::Succeeded],
        );

        let err = dnac
            .wait_on_task("t1", PollPolicy::default())
            .await
            .unwrap_err();

        match err {
            DnacError::Task {
                task_id,
                reason,
                response,
            } => {
                assert_eq!(task_id, "t1");
                assert_eq!(reason, "NCSP10250: Site already exists");
                assert_eq!(response.lookup("response.isError").as_bool(), Some(true));
            }
            other => panic!("expected task error, got {:?}", other),
        }
        assert_eq!(task_polls(&transport), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_errors_propagate_unchanged() {
        let transport = ScriptedTransport::new();
        let dnac = session(&transport).await;
        transport.queue_json(200, task_body(TaskState::Pending));
        transport.queue(HttpResponse::new(502, "Bad Gateway"));

        let err = dnac
            .wait_on_task("t1", PollPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DnacError::Server { status: 502, .. }));
        assert_eq!(task_polls(&transport), 2);

        transport.queue(HttpResponse::new(401, ""));
        let err = dnac
            .wait_on_task("t1", PollPolicy::default())
            .await
            .unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_policy_sends_nothing() {
        let transport = ScriptedTransport::new();
        let dnac = session(&transport).await;

        let policy = PollPolicy {
            timeout: secs(10),
            interval: secs(1),
            backoff: 0.5,
        };
        let err = dnac.wait_on_task("t1", policy).await.unwrap_err();
        assert!(matches!(err, DnacError::Config(_)));

        let err = dnac
            .wait_on_task("a/b", PollPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DnacError::Config(_)));
        assert_eq!(task_polls(&transport), 0);
    }

    #[tokio::test]
    async fn test_task_status_single_fetch() {
        let transport = ScriptedTransport::new();
        let dnac = session(&transport).await;
        transport.queue_json(200, task_body(TaskState::Running));

        let record = dnac.task_status("t1").await.unwrap();
        assert_eq!(record.state, TaskState::Running);
        assert_eq!(record.progress.as_deref(), Some("In progress"));

        let request = transport.requests().pop().unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://dnac.example.com/dna/intent/api/v1/task/t1"
        );
    }
}
