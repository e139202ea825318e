//! Router configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Numeric knobs fall back to their
//! defaults when unparsable; structured values (addresses, routing policy,
//! subscriptions, roles) fail loudly instead, because a silently ignored
//! routing entry is worse than a refused start.

use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::{ConnectionRequest, PeerRole, RoutingTable, SubscriberEndpoint};
use crate::error::RouterError;
use crate::link::ResolutionStrategy;
use crate::service::{DeliveryPolicy, DispatchMode};

/// Top-level router configuration.
///
/// Loaded once at startup via [`RouterConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:6999`).
    pub listen_addr: SocketAddr,

    /// Port announced as this node's publishing port in handshakes.
    pub publish_port: u16,

    /// Role this node asks peers to register it under.
    pub node_role: PeerRole,

    /// Role assigned to peers whose handshake names none.
    pub default_peer_role: PeerRole,

    /// Filter tags this node asks peers to attach to its deliveries.
    pub node_filters: Vec<String>,

    /// Peer registration URLs to handshake with at startup.
    pub peer_addresses: Vec<String>,

    /// Endpoints registered locally before serving starts.
    pub static_subscriptions: Vec<StaticSubscription>,

    /// Category → roles fan-out policy.
    pub routing_table: RoutingTable,

    /// Development hostname, second in the self-address chain.
    pub development_hostname: Option<String>,

    /// Production hostname, last in the self-address chain. Also used to
    /// skip this node when it appears in its own peer list.
    pub pi_hostname: Option<String>,

    /// Keep peers whose host matches `pi_hostname`.
    pub dev_mode: bool,

    /// Prefix length of the local network the interface scan accepts.
    pub subnet_prefix_len: u8,

    /// Upper bound on every outbound call.
    pub request_timeout: Duration,

    /// Total attempts per event delivery.
    pub delivery_max_attempts: u32,

    /// Pause between delivery attempts.
    pub delivery_retry_delay: Duration,

    /// Whether event submission waits for delivery outcomes.
    pub dispatch_mode: DispatchMode,

    /// Bound on pending registry commands.
    pub registry_queue_capacity: usize,

    /// How long shutdown waits for in-flight deliveries.
    pub shutdown_grace: Duration,

    /// Emit JSON log lines instead of human-readable text.
    pub log_json: bool,
}

/// An endpoint installed from configuration rather than a handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticSubscription {
    /// Role to register under.
    pub role: PeerRole,
    /// Callback URL.
    pub address: String,
}

impl StaticSubscription {
    /// Parses one `role@address` entry.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Configuration`] for a missing `@`, an unknown
    /// role, or an empty address.
    pub fn parse(entry: &str) -> Result<Self, RouterError> {
        let Some((role, address)) = entry.split_once('@') else {
            return Err(RouterError::Configuration(format!(
                "static subscription `{entry}` must look like role@address"
            )));
        };
        let role = role.parse().map_err(RouterError::Configuration)?;
        let address = address.trim();
        if address.is_empty() {
            return Err(RouterError::Configuration(format!(
                "static subscription `{entry}` has an empty address"
            )));
        }
        Ok(Self {
            role,
            address: address.to_string(),
        })
    }

    /// The endpoint this entry registers.
    #[must_use]
    pub fn endpoint(&self) -> SubscriberEndpoint {
        SubscriberEndpoint::new(self.role, self.address.clone())
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 6999)),
            publish_port: 7000,
            node_role: PeerRole::Ui,
            default_peer_role: PeerRole::Ui,
            node_filters: Vec::new(),
            peer_addresses: Vec::new(),
            static_subscriptions: Vec::new(),
            routing_table: RoutingTable::default(),
            development_hostname: None,
            pi_hostname: None,
            dev_mode: false,
            subnet_prefix_len: 24,
            request_timeout: Duration::from_secs(5),
            delivery_max_attempts: 3,
            delivery_retry_delay: Duration::from_millis(500),
            dispatch_mode: DispatchMode::Await,
            registry_queue_capacity: 256,
            shutdown_grace: Duration::from_secs(10),
            log_json: false,
        }
    }
}

impl RouterConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Configuration`] if `LISTEN_ADDR`,
    /// `NODE_ROLE`, `DEFAULT_PEER_ROLE`, `ROUTING_TABLE`,
    /// `STATIC_SUBSCRIPTIONS` or `DISPATCH_MODE` is set but malformed.
    pub fn from_env() -> Result<Self, RouterError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RouterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let listen_addr = match get("LISTEN_ADDR") {
            Some(raw) => raw.parse().map_err(|e| {
                RouterError::Configuration(format!("LISTEN_ADDR `{raw}` is invalid: {e}"))
            })?,
            None => defaults.listen_addr,
        };

        let node_role = match get("NODE_ROLE") {
            Some(raw) => raw.parse().map_err(RouterError::Configuration)?,
            None => defaults.node_role,
        };

        let default_peer_role = match get("DEFAULT_PEER_ROLE") {
            Some(raw) => raw.parse().map_err(RouterError::Configuration)?,
            None => defaults.default_peer_role,
        };

        let routing_table = match get("ROUTING_TABLE") {
            Some(raw) => RoutingTable::parse(&raw)?,
            None => defaults.routing_table,
        };

        let static_subscriptions = get("STATIC_SUBSCRIPTIONS")
            .map(|raw| {
                split_list(&raw)
                    .map(StaticSubscription::parse)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let dispatch_mode = match get("DISPATCH_MODE") {
            Some(raw) => raw.parse().map_err(RouterError::Configuration)?,
            None => defaults.dispatch_mode,
        };

        Ok(Self {
            listen_addr,
            publish_port: parse_or(get("PUBLISH_PORT"), defaults.publish_port),
            node_role,
            default_peer_role,
            node_filters: get("NODE_FILTERS")
                .map(|raw| split_list(&raw).map(str::to_string).collect())
                .unwrap_or_default(),
            peer_addresses: get("PEER_ADDRESSES")
                .map(|raw| split_list(&raw).map(str::to_string).collect())
                .unwrap_or_default(),
            static_subscriptions,
            routing_table,
            development_hostname: get("DEVELOPMENT_HOSTNAME"),
            pi_hostname: get("PI_HOSTNAME"),
            dev_mode: parse_bool(get("DEV_MODE"), defaults.dev_mode),
            subnet_prefix_len: parse_or(get("SUBNET_PREFIX_LEN"), defaults.subnet_prefix_len),
            request_timeout: Duration::from_secs(parse_or(get("REQUEST_TIMEOUT_SECS"), 5)),
            delivery_max_attempts: parse_or(
                get("DELIVERY_MAX_ATTEMPTS"),
                defaults.delivery_max_attempts,
            ),
            delivery_retry_delay: Duration::from_millis(parse_or(
                get("DELIVERY_RETRY_DELAY_MS"),
                500,
            )),
            dispatch_mode,
            registry_queue_capacity: parse_or(
                get("REGISTRY_QUEUE_CAPACITY"),
                defaults.registry_queue_capacity,
            ),
            shutdown_grace: Duration::from_secs(parse_or(get("SHUTDOWN_GRACE_SECS"), 10)),
            log_json: get("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }

    /// The self-address fallback chain: interface scan, then development
    /// hostname, then production hostname.
    #[must_use]
    pub fn resolution_strategies(&self) -> Vec<ResolutionStrategy> {
        vec![
            ResolutionStrategy::LocalInterface {
                prefix_len: self.subnet_prefix_len,
            },
            ResolutionStrategy::hostname("DEVELOPMENT_HOSTNAME", self.development_hostname.clone()),
            ResolutionStrategy::hostname("PI_HOSTNAME", self.pi_hostname.clone()),
        ]
    }

    /// Per-delivery retry policy.
    #[must_use]
    pub fn delivery_policy(&self) -> DeliveryPolicy {
        DeliveryPolicy {
            max_attempts: self.delivery_max_attempts,
            retry_delay: self.delivery_retry_delay,
            request_timeout: self.request_timeout,
        }
    }

    /// The handshake payload announcing this node at `self_address`.
    #[must_use]
    pub fn connection_request(&self, self_address: &str) -> ConnectionRequest {
        ConnectionRequest {
            publisher_address: format!("{self_address}:{}", self.publish_port),
            subscriber_endpoint: format!(
                "http://{self_address}:{}/deliver",
                self.listen_addr.port()
            ),
            role: Some(self.node_role),
            filters: self.node_filters.clone(),
        }
    }

    /// Peers to handshake with. Unless `dev_mode` is set, peers whose host
    /// equals `pi_hostname` are this node and are skipped.
    #[must_use]
    pub fn handshake_targets(&self) -> Vec<String> {
        self.peer_addresses
            .iter()
            .filter(|peer| {
                let is_self = !self.dev_mode
                    && self
                        .pi_hostname
                        .as_deref()
                        .zip(peer_host(peer))
                        .is_some_and(|(own, host)| own.eq_ignore_ascii_case(&host));
                if is_self {
                    tracing::debug!(peer = %peer, "skipping self in peer list");
                }
                !is_self
            })
            .cloned()
            .collect()
    }
}

/// Extracts the host portion of a peer URL (scheme optional).
fn peer_host(peer: &str) -> Option<String> {
    let url = crate::service::delivery::endpoint_url(peer);
    reqwest::Url::parse(&url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Parses `value` as `T`, returning `default` on missing or invalid values.
fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Parses a boolean. Accepts `"true"`, `"1"`, `"false"`, `"0"`
/// (case-insensitive). Returns `default` otherwise.
fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value.map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
