//! Waiting for a submitted report job to finish.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ApplianceError, JobId, ReportAppliance, ReportState, SessionToken};
use crate::config::PollingConfig;

/// Delays between state checks, and the total wait budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub pending_delay: Duration,
    pub running_delay: Duration,
    pub max_wait: Duration,
}

impl PollPolicy {
    /// Delay before the next check after observing `state`, or `None` when done.
    pub fn delay_after(&self, state: ReportState) -> Option<Duration> {
        match state {
            ReportState::Pending => Some(self.pending_delay),
            ReportState::Running => Some(self.running_delay),
            ReportState::Generated => None,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollPolicy {
    fn from(config: &PollingConfig) -> Self {
        Self {
            initial_delay: Duration::from_secs(config.initial_delay_secs),
            pending_delay: Duration::from_secs(config.pending_delay_secs),
            running_delay: Duration::from_secs(config.running_delay_secs),
            max_wait: Duration::from_secs(config.max_wait_secs),
        }
    }
}

/// Suspends the current task. Swapped out in tests to record the schedule.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleep the initial delay, then check the job state until it is `generated`.
///
/// Returns the accumulated wait. Any error from the state check, including an
/// unrecognized state, ends the wait. A sleep that would push the accumulated
/// wait past `policy.max_wait` is not taken; [`ApplianceError::Timeout`] is
/// returned instead.
pub async fn wait_until_generated(
    appliance: &dyn ReportAppliance,
    sleeper: &dyn Sleeper,
    policy: &PollPolicy,
    session: &SessionToken,
    adom: &str,
    job: &JobId,
) -> Result<Duration, ApplianceError> {
    let mut waited = Duration::ZERO;
    let mut delay = policy.initial_delay;

    loop {
        if waited + delay > policy.max_wait {
            return Err(ApplianceError::Timeout {
                job: job.clone(),
                waited,
            });
        }
        sleeper.sleep(delay).await;
        waited += delay;

        let state = appliance.report_state(session, adom, job).await?;
        debug!(job = %job, ?state, waited_secs = waited.as_secs(), "Report job state");

        match policy.delay_after(state) {
            Some(next) => delay = next,
            None => return Ok(waited),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_default_config() {
        let policy = PollPolicy::default();
        assert_eq!(policy.initial_delay, Duration::from_secs(5));
        assert_eq!(policy.pending_delay, Duration::from_secs(5));
        assert_eq!(policy.running_delay, Duration::from_secs(10));
        assert_eq!(policy.max_wait, Duration::from_secs(1800));
    }

    #[test]
    fn test_delay_after_state() {
        let policy = PollPolicy::default();
        assert_eq!(
            policy.delay_after(ReportState::Pending),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            policy.delay_after(ReportState::Running),
            Some(Duration::from_secs(10))
        );
        assert_eq!(policy.delay_after(ReportState::Generated), None);
    }

    async fn wait_with_states(
        states: &[&str],
        policy: &PollPolicy,
    ) -> (Result<Duration, ApplianceError>, Vec<Duration>) {
        use crate::testing::{MockAppliance, RecordingSleeper};

        let appliance = MockAppliance::new();
        appliance.set_states(states).await;
        let sleeper = RecordingSleeper::new();
        let result = wait_until_generated(
            &appliance,
            &sleeper,
            policy,
            &SessionToken::new("s"),
            "root",
            &JobId("tid-1".to_string()),
        )
        .await;
        (result, sleeper.sleeps().await)
    }

    #[tokio::test]
    async fn test_wait_follows_state_schedule() {
        let (result, sleeps) =
            wait_with_states(&["pending", "pending", "running", "generated"], &PollPolicy::default())
                .await;

        let secs: Vec<u64> = sleeps.iter().map(Duration::as_secs).collect();
        assert_eq!(secs, vec![5, 5, 5, 10]);
        assert_eq!(result.unwrap(), Duration::from_secs(25));
    }

    #[tokio::test]
    async fn test_wait_immediately_generated() {
        let (result, sleeps) = wait_with_states(&["generated"], &PollPolicy::default()).await;
        assert_eq!(sleeps, vec![Duration::from_secs(5)]);
        assert_eq!(result.unwrap(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_wait_stops_on_unrecognized_state() {
        let (result, sleeps) =
            wait_with_states(&["pending", "failed"], &PollPolicy::default()).await;
        assert_eq!(sleeps.len(), 2);
        assert!(matches!(
            result,
            Err(ApplianceError::UnrecognizedState(ref s)) if s == "failed"
        ));
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let policy = PollPolicy {
            max_wait: Duration::from_secs(20),
            ..PollPolicy::default()
        };
        let (result, sleeps) =
            wait_with_states(&["running", "running", "running"], &policy).await;

        // 5 + 10 = 15; another 10 would exceed 20.
        assert_eq!(sleeps, vec![Duration::from_secs(5), Duration::from_secs(10)]);
        match result {
            Err(ApplianceError::Timeout { job, waited }) => {
                assert_eq!(job, JobId("tid-1".to_string()));
                assert_eq!(waited, Duration::from_secs(15));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
