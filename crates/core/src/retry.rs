use std::{future::Future, time::Duration};

use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// How often and for how long to repeat a remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub interval: Duration,
    /// Factor applied to the delay after every retry. `1.0` keeps it fixed.
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_attempts: Option<u32>,
    /// Overall deadline, measured from the first attempt.
    pub timeout: Option<Duration>,
}

impl RetryPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self { interval, multiplier: 1.0, max_interval: interval, max_attempts: None, timeout: None }
    }

    pub fn exponential(interval: Duration, max_interval: Duration) -> Self {
        Self { interval, multiplier: 2.0, max_interval, max_attempts: None, timeout: None }
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let delay = self.interval.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(delay.min(self.max_interval.as_secs_f64()))
            .map_or(self.max_interval, |delay| delay.min(self.max_interval))
    }

    pub fn start(&self, cancel: &CancellationToken) -> Poller {
        let started = Instant::now();
        Poller {
            policy: self.clone(),
            cancel: cancel.clone(),
            started,
            deadline: self.timeout.and_then(|timeout| started.checked_add(timeout)),
            attempts: 0,
        }
    }
}

/// Paces one wait loop according to a [`RetryPolicy`].
///
/// Run each remote call through [`Poller::attempt`] and call [`Poller::wait`] after
/// every attempt that did not produce a result. Both fail with [`Error::TimedOut`]
/// once the policy is exhausted and with [`Error::Cancelled`] as soon as the token
/// is cancelled.
#[derive(Debug)]
pub struct Poller {
    policy: RetryPolicy,
    cancel: CancellationToken,
    started: Instant,
    deadline: Option<Instant>,
    attempts: u32,
}

impl Poller {
    pub fn attempts(&self) -> u32 { self.attempts }

    /// Drive a single call, abandoning it on cancellation or at the deadline.
    pub async fn attempt<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        let deadline = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = call => result,
            _ = deadline => Err(self.timed_out()),
        }
    }

    pub async fn wait(&mut self) -> Result<()> {
        self.attempts += 1;
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.policy.max_attempts.is_some_and(|max| self.attempts >= max) {
            return Err(self.timed_out());
        }
        let mut delay = self.policy.delay_for(self.attempts);
        if let Some(deadline) = self.deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out());
            }
            delay = delay.min(remaining);
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = sleep(delay) => Ok(()),
        }
    }

    fn timed_out(&self) -> Error {
        Error::TimedOut { waited: self.started.elapsed(), attempts: self.attempts }
    }
}
