//! Subscription registry with a single-writer command queue.
//!
//! [`SubscriptionRegistry`] is a cheap, cloneable handle. One spawned task
//! owns the endpoint set; every `register` call is a command on a bounded
//! `mpsc` queue, answered through a `oneshot` once applied. After each
//! mutation the task publishes a fresh immutable [`RegistryView`] through a
//! `watch` channel, and readers borrow that view without touching the
//! queue.
//!
//! # Visibility
//!
//! The task publishes the new view *before* acknowledging the command, so a
//! `register` that has returned is visible to every snapshot taken after it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use super::{PeerRole, SubscriberEndpoint};
use crate::error::RouterError;

/// Immutable point-in-time copy of every registered endpoint.
#[derive(Debug, Clone, Default)]
pub struct RegistryView {
    by_role: HashMap<PeerRole, Vec<SubscriberEndpoint>>,
}

impl RegistryView {
    /// Endpoints registered for `role`, in first-registration order.
    #[must_use]
    pub fn endpoints_for(&self, role: PeerRole) -> &[SubscriberEndpoint] {
        self.by_role
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every endpoint, grouped by role in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &SubscriberEndpoint> {
        PeerRole::ALL
            .into_iter()
            .flat_map(move |role| self.endpoints_for(role).iter())
    }

    /// Total number of registered endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_role.values().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn upsert(&mut self, endpoint: SubscriberEndpoint) -> Registration {
        let slot = self.by_role.entry(endpoint.role).or_default();
        match slot.iter_mut().find(|e| e.address == endpoint.address) {
            Some(existing) => {
                *existing = endpoint;
                Registration::Replaced
            }
            None => {
                slot.push(endpoint);
                Registration::Added
            }
        }
    }
}

/// Outcome of an accepted registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new `(role, address)` entry was created.
    Added,
    /// An existing entry for the same `(role, address)` was replaced.
    Replaced,
}

#[derive(Debug)]
enum Command {
    Register {
        endpoint: SubscriberEndpoint,
        reply: oneshot::Sender<Registration>,
    },
}

/// Handle to the subscription registry.
///
/// Clones share the same owning task. The task exits once every handle has
/// been dropped.
#[derive(Debug, Clone)]
pub struct SubscriptionRegistry {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<Arc<RegistryView>>,
}

impl SubscriptionRegistry {
    /// Spawns the owning task and returns a handle to it.
    ///
    /// `queue_capacity` bounds the number of pending registrations; callers
    /// wait for room when it is full. Must be called from inside a Tokio
    /// runtime.
    #[must_use]
    pub fn spawn(queue_capacity: usize) -> Self {
        let (commands, rx) = mpsc::channel(queue_capacity.max(1));
        let (view_tx, view) = watch::channel(Arc::new(RegistryView::default()));
        tokio::spawn(run_registry(rx, view_tx));
        Self { commands, view }
    }

    /// Registers `endpoint`, replacing any entry with the same role and
    /// address. Returns once the change is visible to snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Validation`] for a blank address (nothing is
    /// mutated), or [`RouterError::Internal`] if the registry task has
    /// stopped.
    pub async fn register(
        &self,
        endpoint: SubscriberEndpoint,
    ) -> Result<Registration, RouterError> {
        endpoint.validate()?;
        let (reply, ack) = oneshot::channel();
        self.commands
            .send(Command::Register { endpoint, reply })
            .await
            .map_err(|_| RouterError::Internal("subscription registry stopped".to_string()))?;
        ack.await
            .map_err(|_| RouterError::Internal("subscription registry dropped command".to_string()))
    }

    /// Point-in-time copy of the endpoints registered for `role`.
    #[must_use]
    pub fn snapshot(&self, role: PeerRole) -> Vec<SubscriberEndpoint> {
        self.view().endpoints_for(role).to_vec()
    }

    /// The current view of the whole registry.
    ///
    /// Holding the returned `Arc` pins that version; later registrations
    /// produce a new view and leave this one untouched.
    #[must_use]
    pub fn view(&self) -> Arc<RegistryView> {
        Arc::clone(&self.view.borrow())
    }

    /// Every registered endpoint.
    #[must_use]
    pub fn endpoints(&self) -> Vec<SubscriberEndpoint> {
        self.view().iter().cloned().collect()
    }

    /// Total number of registered endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.view.borrow().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn run_registry(
    mut commands: mpsc::Receiver<Command>,
    view_tx: watch::Sender<Arc<RegistryView>>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Register { endpoint, reply } => {
                let role = endpoint.role;
                let address = endpoint.address.clone();

                let mut next = RegistryView::clone(&view_tx.borrow());
                let outcome = next.upsert(endpoint);
                view_tx.send_replace(Arc::new(next));

                match outcome {
                    Registration::Added => {
                        tracing::info!(%role, %address, "subscriber registered");
                    }
                    Registration::Replaced => {
                        tracing::debug!(%role, %address, "subscriber re-registered");
                    }
                }
                // The caller may have given up waiting; the change stands.
                let _ = reply.send(outcome);
            }
        }
    }
    tracing::debug!("subscription registry stopped");
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn ui(address: &str) -> SubscriberEndpoint {
        SubscriberEndpoint::new(PeerRole::Ui, address)
    }

    #[tokio::test]
    async fn register_then_snapshot_sees_endpoint() {
        let registry = SubscriptionRegistry::spawn(8);
        assert_ok!(registry.register(ui("http://10.0.0.5:6999/event")).await);

        let snap = registry.snapshot(PeerRole::Ui);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.first().map(|e| e.address.as_str()), Some("http://10.0.0.5:6999/event"));
    }

    #[tokio::test]
    async fn duplicate_role_and_address_is_idempotent() {
        let registry = SubscriptionRegistry::spawn(8);
        let first = registry.register(ui("10.0.0.5:6999")).await;
        let second = registry
            .register(ui("10.0.0.5:6999").with_filters(["late"]))
            .await;

        assert_eq!(first.ok(), Some(Registration::Added));
        assert_eq!(second.ok(), Some(Registration::Replaced));

        let snap = registry.snapshot(PeerRole::Ui);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.first().map(|e| e.filters.clone()), Some(vec!["late".to_string()]));
    }

    #[tokio::test]
    async fn re_registration_supersedes_timestamp() {
        let registry = SubscriptionRegistry::spawn(8);
        let early = ui("10.0.0.5:6999");
        let mut late = ui("10.0.0.5:6999");
        late.registered_at = early.registered_at + chrono::Duration::seconds(30);
        let expected = late.registered_at;

        assert_ok!(registry.register(early).await);
        assert_ok!(registry.register(late).await);

        let snap = registry.snapshot(PeerRole::Ui);
        assert_eq!(snap.first().map(|e| e.registered_at), Some(expected));
    }

    #[tokio::test]
    async fn same_address_under_different_roles_is_two_entries() {
        let registry = SubscriptionRegistry::spawn(8);
        assert_ok!(registry.register(ui("10.0.0.5:6999")).await);
        assert_ok!(
            registry
                .register(SubscriberEndpoint::new(PeerRole::Room, "10.0.0.5:6999"))
                .await
        );
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.snapshot(PeerRole::Ui).len(), 1);
        assert_eq!(registry.snapshot(PeerRole::Room).len(), 1);
    }

    #[tokio::test]
    async fn empty_address_is_rejected_without_mutation() {
        let registry = SubscriptionRegistry::spawn(8);
        let result = registry.register(ui("   ")).await;
        assert!(matches!(result, Err(RouterError::Validation(_))));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn held_view_is_not_affected_by_later_registrations() {
        let registry = SubscriptionRegistry::spawn(8);
        assert_ok!(registry.register(ui("a")).await);
        let pinned = registry.view();

        assert_ok!(registry.register(ui("b")).await);

        assert_eq!(pinned.endpoints_for(PeerRole::Ui).len(), 1);
        assert_eq!(registry.view().endpoints_for(PeerRole::Ui).len(), 2);
    }

    #[tokio::test]
    async fn snapshot_preserves_first_registration_order() {
        let registry = SubscriptionRegistry::spawn(8);
        for addr in ["c", "a", "b"] {
            assert_ok!(registry.register(ui(addr)).await);
        }
        assert_ok!(registry.register(ui("a")).await);

        let order: Vec<String> = registry
            .snapshot(PeerRole::Ui)
            .into_iter()
            .map(|e| e.address)
            .collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_are_not_lost() {
        let registry = SubscriptionRegistry::spawn(4);
        let mut handles = Vec::new();
        for i in 0..64 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let role = PeerRole::ALL
                    .get(i % PeerRole::ALL.len())
                    .copied()
                    .unwrap_or(PeerRole::Ui);
                let result = registry
                    .register(SubscriberEndpoint::new(role, format!("http://node-{i}/event")))
                    .await;
                // Acked registration must already be readable.
                let seen = registry
                    .snapshot(role)
                    .iter()
                    .any(|e| e.address == format!("http://node-{i}/event"));
                (result.is_ok(), seen)
            }));
        }
        for handle in handles {
            let Ok((registered, seen)) = handle.await else {
                panic!("registration task panicked");
            };
            assert!(registered);
            assert!(seen);
        }
        assert_eq!(registry.len(), 64);
    }

    #[tokio::test]
    async fn endpoints_lists_everything_grouped_by_role() {
        let registry = SubscriptionRegistry::spawn(8);
        assert_ok!(
            registry
                .register(SubscriberEndpoint::new(PeerRole::Translator, "t"))
                .await
        );
        assert_ok!(registry.register(SubscriberEndpoint::new(PeerRole::Room, "r")).await);

        let roles: Vec<PeerRole> = registry.endpoints().into_iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![PeerRole::Room, PeerRole::Translator]);
    }
}
