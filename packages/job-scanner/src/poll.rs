//! Bounded polling for asynchronous remote work.

use std::future::Future;
use std::time::Duration;

use crate::clock::Sleeper;

/// How long to wait for a remote job: at most `max_attempts` fetches,
/// `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 200,
            interval: Duration::from_secs(10),
        }
    }
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Worst-case wall time spent sleeping.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// One observation of the remote job.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    Ready(T),
    Pending,
}

/// Why polling stopped without a value.
#[derive(Debug)]
pub enum PollError<E> {
    /// Every attempt reported pending.
    Exhausted { attempts: u32 },
    /// A fetch failed; polling stops at the first failure.
    Failed { attempt: u32, error: E },
}

/// Call `fetch` until it reports ready, sleeping `policy.interval` between
/// pending attempts. There is no sleep after the last attempt.
pub async fn poll_until<T, E, F, Fut>(
    policy: PollPolicy,
    sleeper: &dyn Sleeper,
    mut fetch: F,
) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Attempt<T>, E>>,
{
    for attempt in 1..=policy.max_attempts {
        match fetch(attempt).await {
            Ok(Attempt::Ready(value)) => return Ok(value),
            Ok(Attempt::Pending) => {
                if attempt < policy.max_attempts {
                    sleeper.sleep(policy.interval).await;
                }
            }
            Err(error) => return Err(PollError::Failed { attempt, error }),
        }
    }

    Err(PollError::Exhausted {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InstantSleeper;

    #[tokio::test]
    async fn returns_first_ready_value() {
        let sleeper = InstantSleeper::new();
        let result: Result<u32, PollError<String>> = poll_until(
            PollPolicy::new(5, Duration::from_secs(10)),
            &sleeper,
            |attempt| async move {
                if attempt == 3 {
                    Ok(Attempt::Ready(attempt))
                } else {
                    Ok(Attempt::Pending)
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(sleeper.total(), Duration::from_secs(20));
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts_without_trailing_sleep() {
        let sleeper = InstantSleeper::new();
        let result: Result<(), PollError<String>> = poll_until(
            PollPolicy::new(4, Duration::from_secs(10)),
            &sleeper,
            |_| async { Ok(Attempt::Pending) },
        )
        .await;

        assert!(matches!(result, Err(PollError::Exhausted { attempts: 4 })));
        assert_eq!(sleeper.sleeps(), 3);
    }

    #[tokio::test]
    async fn stops_on_first_failure() {
        let sleeper = InstantSleeper::new();
        let result: Result<(), PollError<&str>> = poll_until(
            PollPolicy::default(),
            &sleeper,
            |attempt| async move {
                if attempt == 2 {
                    Err("boom")
                } else {
                    Ok(Attempt::Pending)
                }
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(PollError::Failed {
                attempt: 2,
                error: "boom"
            })
        ));
    }

    #[test]
    fn default_budget_is_multi_minute() {
        assert!(PollPolicy::default().budget() > Duration::from_secs(30 * 60));
    }
}
