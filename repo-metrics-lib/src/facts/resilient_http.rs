//! Resilient HTTP request execution.
//!
//! Every call to the hosting API goes through [`Executor::execute`], which wraps the
//! request in [`seatbelt`] retry and timeout middleware and waits out exhausted rate
//! limits through a shared [`RateLimitGate`]. HTTP-level failures are never turned into
//! errors: once the attempt budget is spent, the last response is handed back and
//! callers inspect its status before trusting the body.

use super::hosting::DEFAULT_REQUEST_TIMEOUT;
use super::rate_limit_gate::RateLimitGate;
use crate::Result;
use chrono::{DateTime, Utc};
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;
use layered::{Execute, Service, Stack};
use ohno::{EnrichableExt, app_err};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use seatbelt::retry::{Backoff, Retry};
use seatbelt::timeout::Timeout;
use seatbelt::{RecoveryInfo, ResilienceContext};
use serde_json::Value;
use std::sync::Arc;
use tick::Clock;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "      http";

/// Default number of attempts per request, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1500);

/// The result of one HTTP attempt.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub status: StatusCode,
    pub headers: HeaderMap,

    /// Parsed JSON body, or `Value::Null` when the body is empty or not JSON.
    pub body: Value,
}

impl RequestOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Rate limit information from response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub remaining: usize,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first one.
    pub max_attempts: u32,
    pub retry_delay: Duration,

    /// Upper bound for a single attempt. Retry delays and rate-limit waits are not
    /// counted against it.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// How a failed attempt is followed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    /// Retry after the policy's fixed delay.
    Retry,

    /// Quota exhausted: close the gate for the given duration, then retry.
    RateLimited(Duration),

    /// Hand the outcome back as-is.
    Never,
}

#[derive(Debug, Clone)]
struct Request {
    url: String,
    query: Vec<(String, String)>,
}

/// Executes GET requests with retry, rate-limit compliance and cooperative cancellation.
#[derive(Debug)]
pub struct Executor {
    client: reqwest::Client,
    policy: RetryPolicy,
    gate: Arc<RateLimitGate>,
    cancel: CancellationToken,
    requests: Arc<AtomicU64>,
}

impl Executor {
    #[must_use]
    pub fn new(client: reqwest::Client, policy: RetryPolicy, gate: Arc<RateLimitGate>, cancel: CancellationToken) -> Self {
        Self {
            client,
            policy: RetryPolicy {
                max_attempts: policy.max_attempts.max(1),
                ..policy
            },
            gate,
            cancel,
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of HTTP requests sent so far, retries included.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    #[must_use]
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Send a GET request to `url` with the given query parameters.
    ///
    /// Returns the first successful outcome, or the last outcome once the attempt budget
    /// is exhausted, whatever its status. An error is returned only when the final
    /// attempt failed below HTTP (connection, timeout, body read) or when the
    /// cancellation token fires. Waiting on the rate limit may block for as long as the
    /// upstream reset window.
    pub async fn execute(&self, url: &str, query: &[(&str, String)]) -> Result<RequestOutcome> {
        let clock = Clock::new_tokio();
        let context = ResilienceContext::new(&clock).name("github_get");

        let gate = Arc::clone(&self.gate);
        let retry_url = url.to_string();
        let client = self.client.clone();
        let requests = Arc::clone(&self.requests);

        let service = (
            Retry::layer("retry", &context)
                .clone_input()
                .recovery_with(move |result: &Result<RequestOutcome>, _| recovery_for(result, &gate))
                .max_retry_attempts(self.policy.max_attempts - 1)
                .base_delay(self.policy.retry_delay)
                .backoff(Backoff::Constant)
                .on_retry(move |_output, args| {
                    log::debug!(
                        target: LOG_TARGET,
                        "retrying {retry_url} (attempt {}, delay {}ms)",
                        args.attempt().index() + 1,
                        args.retry_delay().as_millis(),
                    );
                }),
            Timeout::layer("timeout", &context)
                .timeout_error(|_| app_err!("HTTP request timed out"))
                .timeout(self.policy.request_timeout),
            Execute::new(move |request: Request| {
                let client = client.clone();
                let requests = Arc::clone(&requests);
                async move {
                    let _ = requests.fetch_add(1, Ordering::Relaxed);
                    send(&client, request).await
                }
            }),
        )
            .into_service();

        let request = Request {
            url: url.to_string(),
            query: query.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect(),
        };

        // Pauses left by earlier requests are waited out outside the timeout layer
        self.gate.wait(&self.cancel).await?;

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(app_err!("request to {url} cancelled")),
            result = service.execute(request) => {
                result.map_err(|e| e.enrich_with(|| format!("requesting {url}")))
            }
        }
    }
}

async fn send(client: &reqwest::Client, request: Request) -> Result<RequestOutcome> {
    let resp = client.get(&request.url).query(&request.query).send().await?;
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = resp.bytes().await?;

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            log::debug!(target: LOG_TARGET, "response from {} is not JSON: {e}", request.url);
            Value::Null
        })
    };

    Ok(RequestOutcome { status, headers, body })
}

/// Decide how the retry layer follows up on one attempt.
///
/// An exhausted quota closes the shared gate and delays the retry until the reset.
fn recovery_for(result: &Result<RequestOutcome>, gate: &RateLimitGate) -> RecoveryInfo {
    let outcome = match result {
        Ok(outcome) if outcome.is_success() => return RecoveryInfo::never(),
        Ok(outcome) => outcome,
        Err(e) => {
            log::debug!(target: LOG_TARGET, "request failed: {e:#}");
            return RecoveryInfo::retry();
        }
    };

    match classify(outcome, Utc::now()) {
        Recovery::Retry => RecoveryInfo::retry(),
        Recovery::RateLimited(pause) => {
            if gate.pause_for(pause) {
                log::warn!(target: LOG_TARGET, "Rate limit exhausted, pausing requests for {}s", pause.as_secs());
            }
            RecoveryInfo::retry().delay(pause)
        }
        Recovery::Never => RecoveryInfo::never(),
    }
}

/// Classify a non-successful response for retry purposes.
fn classify(outcome: &RequestOutcome, now: DateTime<Utc>) -> Recovery {
    match outcome.status {
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            rate_limit_pause(&outcome.headers, now).map_or(Recovery::Retry, Recovery::RateLimited)
        }

        // Server errors (5xx) are transient.
        status if status.is_server_error() => Recovery::Retry,

        // Everything else (404, 410, 422, ...) will not change by asking again.
        _ => Recovery::Never,
    }
}

/// How long to hold requests back after a rate-limited response.
///
/// With an exhausted quota this is the time until the reset timestamp plus one second
/// of slack, computed in whole seconds. Otherwise a `Retry-After` header (secondary
/// rate limit) is honored. Returns `None` when the response carries neither.
#[must_use]
pub fn rate_limit_pause(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    if let Some(info) = extract_rate_limit_from_headers(headers)
        && info.remaining == 0
    {
        let secs = (info.reset_at.timestamp() - now.timestamp()).max(0) + 1;
        return Some(Duration::from_secs(secs.cast_unsigned()));
    }

    parse_retry_after(headers).map(Duration::from_secs)
}

/// Extract rate limit information from API response headers
#[must_use]
pub fn extract_rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let remaining = headers.get("x-ratelimit-remaining")?.to_str().ok()?.parse::<usize>().ok()?;
    let reset_timestamp = headers.get("x-ratelimit-reset")?.to_str().ok()?.parse::<i64>().ok()?;
    let reset_at = DateTime::from_timestamp(reset_timestamp, 0)?;

    Some(RateLimitInfo { remaining, reset_at })
}

/// Parse the `Retry-After` header value as seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse::<u64>().ok()
}
