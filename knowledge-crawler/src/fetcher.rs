use crate::transport::{FetchRequest, RawResponse, Transport};
use crate::types::{CrawlerError, FetchConfig, Result};
use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Enforces a minimum spacing between consecutive calls made through it.
///
/// One limiter belongs to one source; callers queue on the inner lock, so
/// requests to the same origin are strictly serial.
pub struct RateLimiter {
    min_delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_call: Mutex::new(None),
        }
    }

    /// Negative or NaN delays mean no throttle; unrepresentable ones saturate.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::new(Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX))
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Waits until `min_delay` has passed since the previous call, then
    /// records this call. Returns how long it waited.
    pub async fn acquire(&self) -> Duration {
        let mut last_call = self.last_call.lock().await;
        let mut waited = Duration::ZERO;

        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_delay {
                waited = self.min_delay - elapsed;
                debug!("Throttling for {:?}", waited);
                tokio::time::sleep(waited).await;
            }
        }

        *last_call = Some(Instant::now());
        waited
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    pub fn from_config(max_retries: u32, config: &FetchConfig) -> Self {
        Self::new(
            max_retries,
            Duration::from_millis(config.retry_delay_ms),
            Duration::from_millis(config.max_retry_delay_ms),
        )
    }

    pub fn start(&self) -> RetryRun {
        let schedule: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: self.base_delay,
            initial_interval: self.base_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: self.max_delay,
            max_elapsed_time: None,
            ..Default::default()
        };

        RetryRun {
            max_retries: self.max_retries,
            schedule,
            state: RetryState::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Attempting { attempt: u32 },
    Backoff { attempt: u32, delay: Duration },
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32 },
}

/// State of one fetch under a [`RetryPolicy`]. Holds no clock of its own:
/// the caller performs the backoff sleep, so the machine can be stepped in
/// tests without waiting.
pub struct RetryRun {
    max_retries: u32,
    schedule: ExponentialBackoff<backoff::SystemClock>,
    state: RetryState,
}

impl RetryRun {
    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Idle or Backoff -> Attempting. Returns the 1-based attempt number.
    pub fn begin_attempt(&mut self) -> u32 {
        let attempt = match self.state {
            RetryState::Idle => 1,
            RetryState::Backoff { attempt, .. } => attempt + 1,
            RetryState::Attempting { attempt } => attempt,
            RetryState::Succeeded { attempts } | RetryState::Exhausted { attempts } => attempts,
        };
        self.state = RetryState::Attempting { attempt };
        attempt
    }

    pub fn record_success(&mut self) -> RetryState {
        if let RetryState::Attempting { attempt } = self.state {
            self.state = RetryState::Succeeded { attempts: attempt };
        }
        self.state
    }

    /// Attempting -> Backoff when a transient failure has retries left,
    /// otherwise Exhausted.
    pub fn record_failure(&mut self, transient: bool) -> RetryState {
        let attempt = match self.state {
            RetryState::Attempting { attempt } => attempt,
            other => return other,
        };

        let retries_used = attempt - 1;
        let next_delay = if transient && retries_used < self.max_retries {
            self.schedule.next_backoff()
        } else {
            None
        };

        self.state = match next_delay {
            // whole milliseconds; the schedule adds sub-nanosecond noise
            Some(delay) => RetryState::Backoff {
                attempt,
                delay: Duration::from_millis(delay.as_millis() as u64),
            },
            None => RetryState::Exhausted { attempts: attempt },
        };
        self.state
    }
}

/// A source's gateway to the network: throttling, retries and transport.
pub struct Fetcher {
    source_name: String,
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(
        source_name: impl Into<String>,
        transport: Arc<dyn Transport>,
        limiter: RateLimiter,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            transport,
            limiter,
            policy,
        }
    }

    pub async fn fetch(&self, request: &FetchRequest) -> Result<RawResponse> {
        let mut run = self.policy.start();

        loop {
            let attempt = run.begin_attempt();
            self.limiter.acquire().await;
            debug!("[{}] GET {} (attempt {})", self.source_name, request, attempt);

            let err = match self.transport.get(request).await {
                Ok(response) => {
                    run.record_success();
                    return Ok(response);
                }
                Err(err) => err,
            };

            match run.record_failure(err.is_transient()) {
                RetryState::Backoff { delay, .. } => {
                    warn!(
                        "[{}] Attempt {} failed for {}: {}, retrying in {:?}",
                        self.source_name, attempt, request, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                _ => {
                    error!(
                        "[{}] Giving up on {} after {} attempt(s): {}",
                        self.source_name, request, attempt, err
                    );
                    return Err(CrawlerError::FetchFailed {
                        url: request.to_string(),
                        cause: err.to_string(),
                    });
                }
            }
        }
    }
}
