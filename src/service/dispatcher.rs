//! Dispatch engine: resolves an event's category and fans it out.
//!
//! [`EventRouter`] owns references to the [`RoutingTable`] for policy, the
//! [`SubscriptionRegistry`] for destinations, and an [`EventDelivery`] for
//! the network. Every dispatch follows the same pattern: resolve roles →
//! take one registry view → spawn one task per endpoint → either wait for
//! the tally or return right away.
//!
//! Events published on this node go to every matching endpoint, peers
//! included. Events a peer forwarded here ([`EventRouter::handle_delivery`])
//! only reach local consumers, so an event crosses each link at most once
//! even when two routers subscribe to each other.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::Notify;
use utoipa::ToSchema;

use super::delivery::{DeliveryPolicy, EventDelivery, deliver_with_retry};
use crate::domain::{Event, EventCategory, RoutingTable, SubscriptionRegistry};
use crate::error::RouterError;

/// When `handle_event` returns relative to its deliveries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// Return after every delivery has succeeded or exhausted its retries.
    #[default]
    Await,
    /// Return as soon as the deliveries are scheduled.
    Detached,
}

impl std::str::FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "await" => Ok(Self::Await),
            "detached" => Ok(Self::Detached),
            other => Err(format!("unknown dispatch mode: {other}")),
        }
    }
}

/// Summary of one `handle_event` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DispatchReport {
    /// Category of the dispatched event.
    pub category: EventCategory,
    /// Deliveries started, one per endpoint per resolved role.
    pub attempted: usize,
    /// Deliveries accepted by the subscriber. Absent in detached mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub succeeded: Option<usize>,
    /// Deliveries that exhausted their retries. Absent in detached mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
}

/// The request-handling core.
#[derive(Debug)]
pub struct EventRouter {
    table: Arc<RoutingTable>,
    registry: SubscriptionRegistry,
    delivery: Arc<dyn EventDelivery>,
    policy: DeliveryPolicy,
    mode: DispatchMode,
    in_flight: Arc<InFlight>,
    accepting: AtomicBool,
}

impl EventRouter {
    /// Creates a router with the default delivery policy, in await mode.
    #[must_use]
    pub fn new(
        table: Arc<RoutingTable>,
        registry: SubscriptionRegistry,
        delivery: Arc<dyn EventDelivery>,
    ) -> Self {
        Self {
            table,
            registry,
            delivery,
            policy: DeliveryPolicy::default(),
            mode: DispatchMode::default(),
            in_flight: Arc::new(InFlight::default()),
            accepting: AtomicBool::new(true),
        }
    }

    /// Sets the per-delivery retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the dispatch mode.
    #[must_use]
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// The routing table this router resolves against.
    #[must_use]
    pub fn routing_table(&self) -> &RoutingTable {
        &self.table
    }

    /// The registry this router reads destinations from.
    #[must_use]
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// `false` once [`Self::drain`] has started.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Number of admitted events and deliveries still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Forwards `event` to every endpoint registered under each role its
    /// category resolves to.
    ///
    /// A category with no configured roles yields a report with zero
    /// deliveries. Duplicate roles yield duplicate deliveries. Individual
    /// delivery failures are counted and logged, never returned.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::ShuttingDown`] once [`Self::drain`] has been
    /// called.
    pub async fn handle_event(&self, event: Event) -> Result<DispatchReport, RouterError> {
        self.dispatch(event, Scope::Everyone).await
    }

    /// Hands an event forwarded by a peer router to local consumers.
    ///
    /// Same resolution as [`Self::handle_event`], but endpoints registered
    /// by peer handshakes are skipped: the event has already been routed
    /// once and is never sent back out.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::ShuttingDown`] once [`Self::drain`] has been
    /// called.
    pub async fn handle_delivery(&self, event: Event) -> Result<DispatchReport, RouterError> {
        self.dispatch(event, Scope::LocalOnly).await
    }

    async fn dispatch(&self, event: Event, scope: Scope) -> Result<DispatchReport, RouterError> {
        // Enter before checking the flag so a concurrent drain either
        // rejects this event or waits for it.
        let _admission = InFlight::enter(&self.in_flight);
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(RouterError::ShuttingDown);
        }

        let category = event.category;
        let roles = self.table.resolve(category);
        if roles.is_empty() {
            tracing::debug!(%category, "no routes for category, dropping event");
            return Ok(self.report(category, 0, Some((0, 0))));
        }

        let view = self.registry.view();
        let event = Arc::new(event);
        let handles: Vec<_> = roles
            .iter()
            .flat_map(|role| view.endpoints_for(*role).iter())
            .filter(|endpoint| scope == Scope::Everyone || !endpoint.is_peer())
            .cloned()
            .map(|endpoint| {
                let guard = InFlight::enter(&self.in_flight);
                let delivery = Arc::clone(&self.delivery);
                let event = Arc::clone(&event);
                let policy = self.policy;
                tokio::spawn(async move {
                    let _guard = guard;
                    deliver_with_retry(delivery.as_ref(), policy, &endpoint, &event)
                        .await
                        .is_ok()
                })
            })
            .collect();
        let attempted = handles.len();

        tracing::debug!(%category, ?scope, roles = roles.len(), attempted, "event dispatched");

        match self.mode {
            DispatchMode::Detached => Ok(self.report(category, attempted, None)),
            DispatchMode::Await => {
                let succeeded = join_all(handles)
                    .await
                    .into_iter()
                    .filter(|joined| matches!(joined, Ok(true)))
                    .count();
                let failed = attempted - succeeded;
                if failed > 0 {
                    tracing::info!(%category, attempted, failed, "event partially delivered");
                }
                Ok(self.report(category, attempted, Some((succeeded, failed))))
            }
        }
    }

    /// Stops accepting events and waits up to `grace` for running
    /// deliveries. Returns `true` if everything finished in time.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.accepting.store(false, Ordering::SeqCst);
        let remaining = self.in_flight();
        if remaining > 0 {
            tracing::info!(remaining, ?grace, "draining in-flight deliveries");
        }
        let drained = tokio::time::timeout(grace, self.in_flight.idle()).await.is_ok();
        if !drained {
            tracing::warn!(
                abandoned = self.in_flight(),
                "grace period elapsed with deliveries still running"
            );
        }
        drained
    }

    fn report(
        &self,
        category: EventCategory,
        attempted: usize,
        tally: Option<(usize, usize)>,
    ) -> DispatchReport {
        let tally = match self.mode {
            DispatchMode::Await => tally,
            DispatchMode::Detached => None,
        };
        DispatchReport {
            category,
            attempted,
            succeeded: tally.map(|(ok, _)| ok),
            failed: tally.map(|(_, failed)| failed),
        }
    }
}

/// Which endpoints a dispatch may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Every matching endpoint, peer routers included.
    Everyone,
    /// Only endpoints that are not peer routers.
    LocalOnly,
}

/// Counts admitted events and running deliveries, and wakes drainers when
/// it reaches zero.
#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn enter(this: &Arc<Self>) -> InFlightGuard {
        this.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            in_flight: Arc::clone(this),
        }
    }

    async fn idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug)]
struct InFlightGuard {
    in_flight: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.in_flight.idle.notify_waiters();
        }
    }
}
