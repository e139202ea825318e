//! Outbound event delivery to subscriber endpoints.
//!
//! [`EventDelivery`] is the seam between the dispatch engine and the
//! network. [`HttpDelivery`] POSTs the event JSON to the endpoint's
//! callback URL; tests substitute recording fakes.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Event, SubscriberEndpoint};
use crate::error::DeliveryError;

/// Header carrying the endpoint's filter tags, comma-separated.
pub const FILTERS_HEADER: &str = "x-event-filters";

/// Sends one event to one subscriber endpoint.
#[async_trait]
pub trait EventDelivery: Send + Sync + fmt::Debug {
    /// Performs a single delivery attempt.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the subscriber could not be reached or
    /// did not accept the event.
    async fn deliver(
        &self,
        endpoint: &SubscriberEndpoint,
        event: &Event,
    ) -> Result<(), DeliveryError>;
}

/// Bounded retry policy for a single delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Total attempts, including the first. At least one.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub retry_delay: Duration,
    /// Upper bound on each attempt.
    pub request_timeout: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Delivers `event` to `endpoint`, retrying up to `policy.max_attempts`.
///
/// Returns the number of attempts used on success.
///
/// # Errors
///
/// Returns the last attempt's [`DeliveryError`] once attempts run out.
pub async fn deliver_with_retry(
    delivery: &dyn EventDelivery,
    policy: DeliveryPolicy,
    endpoint: &SubscriberEndpoint,
    event: &Event,
) -> Result<u32, DeliveryError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let outcome = match tokio::time::timeout(
            policy.request_timeout,
            delivery.deliver(endpoint, event),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(policy.request_timeout)),
        };

        match outcome {
            Ok(()) => {
                tracing::debug!(
                    role = %endpoint.role,
                    address = %endpoint.address,
                    category = %event.category,
                    attempt,
                    "event delivered"
                );
                return Ok(attempt);
            }
            Err(e) if attempt < max_attempts => {
                tracing::debug!(
                    role = %endpoint.role,
                    address = %endpoint.address,
                    attempt,
                    error = %e,
                    "delivery attempt failed, retrying"
                );
                attempt += 1;
                tokio::time::sleep(policy.retry_delay).await;
            }
            Err(e) => {
                tracing::warn!(
                    role = %endpoint.role,
                    address = %endpoint.address,
                    category = %event.category,
                    attempts = attempt,
                    error = %e,
                    "event delivery failed"
                );
                return Err(e);
            }
        }
    }
}

/// Prefixes `http://` when the address carries no scheme.
#[must_use]
pub fn endpoint_url(address: &str) -> String {
    let address = address.trim();
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

/// Delivers events over HTTP with a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpDelivery {
    client: reqwest::Client,
}

impl HttpDelivery {
    /// Wraps an existing client. Timeouts configured on the client apply in
    /// addition to the policy's per-attempt bound.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventDelivery for HttpDelivery {
    async fn deliver(
        &self,
        endpoint: &SubscriberEndpoint,
        event: &Event,
    ) -> Result<(), DeliveryError> {
        let mut request = self.client.post(endpoint_url(&endpoint.address)).json(event);
        if !endpoint.filters.is_empty() {
            request = request.header(FILTERS_HEADER, endpoint.filters.join(","));
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Rejected { status })
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use axum::http::StatusCode;

    use super::*;
    use crate::domain::{EventCategory, PeerRole};

    /// Fails the first `failures` attempts, then succeeds.
    #[derive(Debug)]
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        seen_at: Mutex<Vec<tokio::time::Instant>>,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                seen_at: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EventDelivery for Flaky {
        async fn deliver(&self, _: &SubscriberEndpoint, _: &Event) -> Result<(), DeliveryError> {
            if let Ok(mut seen) = self.seen_at.lock() {
                seen.push(tokio::time::Instant::now());
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(DeliveryError::Rejected {
                    status: StatusCode::BAD_GATEWAY,
                })
            } else {
                Ok(())
            }
        }
    }

    #[derive(Debug)]
    struct Hangs;

    #[async_trait]
    impl EventDelivery for Hangs {
        async fn deliver(&self, _: &SubscriberEndpoint, _: &Event) -> Result<(), DeliveryError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn endpoint() -> SubscriberEndpoint {
        SubscriberEndpoint::new(PeerRole::Ui, "http://ui/event")
    }

    fn event() -> Event {
        Event::new(EventCategory::Room, serde_json::json!("p"))
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let flaky = Flaky::new(2);
        let result =
            deliver_with_retry(&flaky, DeliveryPolicy::default(), &endpoint(), &event()).await;
        assert_eq!(result.ok(), Some(3));

        let Ok(seen) = flaky.seen_at.lock() else {
            panic!("lock poisoned");
        };
        for pair in seen.windows(2) {
            if let [a, b] = pair {
                let gap = *b - *a;
                assert!(gap >= Duration::from_millis(500) && gap < Duration::from_millis(600));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let flaky = Flaky::new(u32::MAX);
        let policy = DeliveryPolicy {
            max_attempts: 4,
            ..DeliveryPolicy::default()
        };
        let result = deliver_with_retry(&flaky, policy, &endpoint(), &event()).await;
        assert!(matches!(result, Err(DeliveryError::Rejected { .. })));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_tries_once() {
        let flaky = Flaky::new(0);
        let policy = DeliveryPolicy {
            max_attempts: 0,
            ..DeliveryPolicy::default()
        };
        let result = deliver_with_retry(&flaky, policy, &endpoint(), &event()).await;
        assert_eq!(result.ok(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempt_is_bounded_by_timeout() {
        let policy = DeliveryPolicy {
            max_attempts: 2,
            retry_delay: Duration::from_millis(10),
            request_timeout: Duration::from_secs(1),
        };
        let started = tokio::time::Instant::now();
        let result = deliver_with_retry(&Hangs, policy, &endpoint(), &event()).await;
        assert!(matches!(result, Err(DeliveryError::Timeout(_))));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2010) && elapsed < Duration::from_millis(2100));
    }

    #[test]
    fn endpoint_url_adds_scheme_only_when_missing() {
        assert_eq!(endpoint_url("10.0.0.5:6999/event"), "http://10.0.0.5:6999/event");
        assert_eq!(endpoint_url("https://ui.local/event"), "https://ui.local/event");
    }
}
