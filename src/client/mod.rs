//! Top-level cluster client: resolves the Stream Controller (SC),
//! performs the platform-version handshake, and hands out task-specific
//! sub-clients ([`ControllerClient`] for admin, [`producer::Producer`] and
//! [`consumer::Consumer`] for data). `Client`/`ClientBuilder` wrap a
//! cheaply-clonable `Arc<ClientInner>` so every sub-client can hold its
//! own handle back into the shared connection pool and metadata cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::backoff::BackoffConfig;
use crate::connection::{Broker, BrokerTopology, Messenger};
use crate::error::{Error, Result};
use crate::protocol::messages::{ApiVersionsRequest, MetadataRequest, MetadataResponse};
use crate::topic::{Partition, Topic};
use crate::version::{self, Version};

pub mod consumer;
pub mod controller;
pub mod producer;

pub use consumer::Consumer;
pub use controller::ControllerClient;
pub use producer::Producer;

/// Default client id advertised in every request header when the caller
/// doesn't set one explicitly.
pub const DEFAULT_CLIENT_ID: &str = "fluvio-core";

/// Configuration for [`Client::connect`]/[`ClientBuilder`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_id: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub metadata_ttl: Duration,
    /// The oldest cluster platform version this client will talk to.
    /// Defaults to `0.0.0`, i.e. no floor -- callers that need a hard
    /// minimum set it explicitly via [`ClientBuilder::min_platform_version`].
    pub min_platform_version: Version,
    pub backoff: BackoffConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            metadata_ttl: crate::connection::topology::DEFAULT_METADATA_TTL,
            min_platform_version: Version::new(0, 0, 0),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Builder for [`Client`].
#[derive(Debug)]
pub struct ClientBuilder {
    bootstrap: Vec<String>,
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new(bootstrap: Vec<String>) -> Self {
        Self {
            bootstrap,
            config: ClientConfig::default(),
        }
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = Some(client_id.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn metadata_ttl(mut self, ttl: Duration) -> Self {
        self.config.metadata_ttl = ttl;
        self
    }

    pub fn min_platform_version(mut self, version: Version) -> Self {
        self.config.min_platform_version = version;
        self
    }

    pub fn backoff_config(mut self, backoff: BackoffConfig) -> Self {
        self.config.backoff = backoff;
        self
    }

    pub async fn connect(self) -> Result<Client> {
        Client::connect_with_config(self.bootstrap, self.config).await
    }
}

/// Point-in-time connectivity/latency snapshot, returned by
/// [`Client::check_health`]. Health is a timed round trip against the SC
/// plus, when at least one SPU connection is already pooled, a round trip
/// against one of those -- not a standalone probe protocol.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub is_healthy: bool,
    pub spu_connected: bool,
    pub sc_connected: Option<bool>,
    pub last_successful_request_duration: Option<Duration>,
    pub error: Option<String>,
    pub timestamp: Instant,
}

struct ClientInner {
    sc: Mutex<Arc<Messenger>>,
    sc_endpoint: String,
    topology: Arc<BrokerTopology>,
    spu_pool: Mutex<HashMap<i32, Arc<Messenger>>>,
    producers: SyncMutex<Vec<Weak<producer::ProducerInner>>>,
    config: ClientConfig,
    platform_version: Version,
    closing: AtomicBool,
    closed: AtomicBool,
}

impl std::fmt::Debug for ClientInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientInner")
            .field("sc", &self.sc_endpoint)
            .field("platform_version", &self.platform_version)
            .finish_non_exhaustive()
    }
}

/// Top-level cluster-wide client. Cheap to clone: internals are
/// held behind a single `Arc`, so [`ControllerClient`], [`Producer`] and
/// [`Consumer`] each hold their own clone rather than a borrow.
#[derive(Debug, Clone)]
pub struct Client(Arc<ClientInner>);

impl Client {
    /// Connects using default [`ClientConfig`].
    pub async fn connect(bootstrap: Vec<String>) -> Result<Self> {
        Self::connect_with_config(bootstrap, ClientConfig::default()).await
    }

    async fn connect_with_config(bootstrap: Vec<String>, config: ClientConfig) -> Result<Self> {
        if bootstrap.is_empty() {
            return Err(Error::Malformed(
                "at least one bootstrap endpoint is required".into(),
            ));
        }

        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string());

        let mut last_err = None;
        let mut connected = None;
        for endpoint in &bootstrap {
            match Messenger::connect(endpoint, Some(client_id.clone()), config.connect_timeout)
                .await
            {
                Ok(messenger) => {
                    connected = Some((endpoint.clone(), messenger));
                    break;
                }
                Err(e) => {
                    warn!(endpoint, error = %e, "failed to connect to bootstrap endpoint");
                    last_err = Some(e);
                }
            }
        }
        let (sc_endpoint, sc) = connected.ok_or_else(|| {
            last_err.unwrap_or_else(|| Error::Malformed("no bootstrap endpoints given".into()))
        })?;

        let versions = sc
            .request(
                &ApiVersionsRequest {
                    client_software_name: Some(DEFAULT_CLIENT_ID.to_string()),
                    client_software_version: Some(env!("CARGO_PKG_VERSION").to_string()),
                },
                config.request_timeout,
            )
            .await?;
        if let Some(err) = versions.error_code {
            return Err(Error::from_api_error(err));
        }
        let platform_version = Version::parse(&versions.platform_version)?;
        version::check_compatible(config.min_platform_version, platform_version)?;

        let topology = Arc::new(BrokerTopology::default());
        let metadata = sc
            .request(&MetadataRequest { topics: None }, config.request_timeout)
            .await?;
        topology.update(&metadata);

        info!(
            platform_version = %platform_version,
            brokers = topology.get_brokers().len(),
            "connected to cluster"
        );

        Ok(Self(Arc::new(ClientInner {
            sc: Mutex::new(Arc::new(sc)),
            sc_endpoint,
            topology,
            spu_pool: Mutex::new(HashMap::new()),
            producers: SyncMutex::new(Vec::new()),
            config,
            platform_version,
            closing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })))
    }

    pub fn platform_version(&self) -> Version {
        self.0.platform_version
    }

    /// A client for cluster-wide admin operations (create/delete topic).
    pub fn admin(&self) -> ControllerClient {
        ControllerClient::new(self.clone())
    }

    /// A producer for `topic`, batching and retrying per `options`.
    ///
    /// The returned producer is tracked weakly so [`Client::close`] can
    /// flush whatever it still has pending, without keeping it alive past
    /// its last strong reference.
    pub fn producer(
        &self,
        topic: impl Into<String>,
        options: producer::ProducerOptions,
    ) -> Producer {
        let producer = Producer::new(self.clone(), topic.into(), options);
        self.0.producers.lock().push(producer.downgrade());
        producer
    }

    /// A consumer for a single `(topic, partition)`.
    pub fn consumer(&self, topic: impl Into<String>, partition: i32) -> Consumer {
        Consumer::new(self.clone(), topic.into(), partition)
    }

    pub fn brokers(&self) -> Vec<Broker> {
        self.0.topology.get_brokers()
    }

    /// Lists every topic currently known to the cluster. Always issues a
    /// fresh, uncached metadata request so a topic created moments ago by
    /// this same client is guaranteed to show up.
    pub async fn list_topics(&self) -> Result<Vec<Topic>> {
        let response = self.request_metadata_response(None).await?;
        Ok(response
            .topics
            .into_iter()
            .map(|t| Topic {
                name: t.name,
                partitions: t
                    .partitions
                    .into_iter()
                    .map(|p| {
                        (
                            p.partition_index,
                            Partition {
                                leader_id: p.leader_id,
                                replica_nodes: p.replica_nodes,
                            },
                        )
                    })
                    .collect(),
            })
            .collect())
    }

    /// A timed round trip against the SC, plus -- when at least one SPU
    /// connection is already pooled -- a round trip against one of those.
    /// Never blocks longer than `request_timeout` per round trip.
    pub async fn check_health(&self) -> HealthReport {
        let start = Instant::now();
        let sc = self.0.sc.lock().await.clone();
        let sc_result = sc
            .request(
                &ApiVersionsRequest {
                    client_software_name: None,
                    client_software_version: None,
                },
                self.0.config.request_timeout,
            )
            .await;
        let sc_connected = sc_result.is_ok();
        let elapsed = start.elapsed();

        let spus: Vec<Arc<Messenger>> = self.0.spu_pool.lock().await.values().cloned().collect();
        let mut spu_connected = spus.is_empty();
        for spu in &spus {
            let ok = spu
                .request(
                    &ApiVersionsRequest {
                        client_software_name: None,
                        client_software_version: None,
                    },
                    self.0.config.request_timeout,
                )
                .await
                .is_ok();
            if ok {
                spu_connected = true;
                break;
            }
        }

        HealthReport {
            is_healthy: sc_connected && spu_connected,
            spu_connected,
            sc_connected: Some(sc_connected),
            last_successful_request_duration: sc_connected.then_some(elapsed),
            error: sc_result.err().map(|e| e.to_string()),
            timestamp: start,
        }
    }

    /// Idempotent: drops every pooled SPU connection. The SC connection is
    /// released when the last clone of this `Client` is dropped.
    ///
    /// Flushes every still-alive [`Producer`] before tearing anything
    /// down -- `closing` (not `closed`) is the idempotency guard here so
    /// the flush's own requests still go out over the pooled connections
    /// rather than being rejected by [`Client::is_closed`].
    pub async fn close(&self) {
        if self.0.closing.swap(true, Ordering::SeqCst) {
            return;
        }

        let producers: Vec<_> = self.0.producers.lock().drain(..).collect();
        for weak in producers {
            if let Some(inner) = weak.upgrade() {
                if let Err(e) = Producer::from_inner(inner).flush().await {
                    warn!(error = %e, "failed to flush producer during close");
                }
            }
        }

        self.0.closed.store(true, Ordering::SeqCst);
        self.0.spu_pool.lock().await.clear();
    }

    fn is_closed(&self) -> bool {
        self.0.closed.load(Ordering::SeqCst)
    }

    async fn request_sc<R: crate::protocol::messages::RequestBody>(
        &self,
        body: &R,
    ) -> Result<R::ResponseBody> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        let sc = self.0.sc.lock().await.clone();
        match sc.request(body, self.0.config.request_timeout).await {
            Err(Error::Timeout(d)) => {
                self.reconnect_sc().await;
                Err(Error::Timeout(d))
            }
            other => other,
        }
    }

    /// Replaces the pooled SC connection with a fresh one. Called after a
    /// timed-out SC request, whose response may still land on the old
    /// socket and desync the next request's framing if that connection
    /// were reused as-is.
    async fn reconnect_sc(&self) {
        match Messenger::connect(
            &self.0.sc_endpoint,
            self.0.config.client_id.clone(),
            self.0.config.connect_timeout,
        )
        .await
        {
            Ok(messenger) => *self.0.sc.lock().await = Arc::new(messenger),
            Err(e) => warn!(endpoint = %self.0.sc_endpoint, error = %e, "failed to reconnect to SC after timeout"),
        }
    }

    /// Looks up (refreshing metadata if necessary) the current leader for
    /// `(topic, partition)` and returns its broker id and a pooled
    /// connection to it, creating one on first use.
    async fn spu_for(&self, topic: &str, partition: i32) -> Result<(i32, Arc<Messenger>)> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let leader = match self
            .0
            .topology
            .leader_for(topic, partition, self.0.config.metadata_ttl)
        {
            Some(broker) => broker,
            None => {
                self.refresh_topic(topic).await?;
                self.0
                    .topology
                    .leader_for(topic, partition, self.0.config.metadata_ttl)
                    .ok_or(Error::UnknownTopicOrPartition)?
            }
        };

        let mut pool = self.0.spu_pool.lock().await;
        if let Some(conn) = pool.get(&leader.id) {
            return Ok((leader.id, Arc::clone(conn)));
        }

        let messenger = Messenger::connect(
            &leader.endpoint(),
            self.0.config.client_id.clone(),
            self.0.config.connect_timeout,
        )
        .await?;
        let messenger = Arc::new(messenger);
        pool.insert(leader.id, Arc::clone(&messenger));
        Ok((leader.id, messenger))
    }

    /// Drops `broker_id`'s pooled connection so the next [`Client::spu_for`]
    /// reconnects instead of reusing a socket that may still have a stale
    /// response sitting in its buffer.
    async fn evict_spu(&self, broker_id: i32) {
        self.0.spu_pool.lock().await.remove(&broker_id);
    }

    /// Issues `body` against the current leader for `(topic, partition)`.
    /// A timed-out request's response can still arrive on the wire after
    /// this call gives up on it; reusing that same connection for the next
    /// request would desync its length-prefixed framing, so a timeout
    /// evicts the pooled connection instead of leaving it for reuse.
    pub(crate) async fn request_spu<R: crate::protocol::messages::RequestBody>(
        &self,
        topic: &str,
        partition: i32,
        body: &R,
        timeout: Duration,
    ) -> Result<R::ResponseBody> {
        let (broker_id, spu) = self.spu_for(topic, partition).await?;
        match spu.request(body, timeout).await {
            Err(Error::Timeout(d)) => {
                self.evict_spu(broker_id).await;
                Err(Error::Timeout(d))
            }
            other => other,
        }
    }

    /// Marks `topic`'s cached metadata stale and fetches a fresh copy from
    /// the SC (called after `UnknownTopicOrPartition`/`LeaderNotAvailable`).
    async fn refresh_topic(&self, topic: &str) -> Result<()> {
        self.0.topology.invalidate_topic(topic);
        let response = self
            .request_sc(&MetadataRequest {
                topics: Some(vec![topic.to_string()]),
            })
            .await?;
        for t in &response.topics {
            if t.name == topic {
                if let Some(err) = t.error {
                    return Err(Error::from_api_error(err));
                }
            }
        }
        self.0.topology.update(&response);
        Ok(())
    }

    /// The request/backoff configuration shared by every sub-client.
    fn config(&self) -> &ClientConfig {
        &self.0.config
    }

    async fn request_metadata_response(&self, topics: Option<Vec<String>>) -> Result<MetadataResponse> {
        let response = self.request_sc(&MetadataRequest { topics }).await?;
        self.0.topology.update(&response);
        Ok(response)
    }

    /// Every partition id currently known for `topic`, refreshing the
    /// cache first if it's missing or stale (used by the producer's
    /// partitioner and by callers that just want the partition count).
    async fn partitions_for(&self, topic: &str) -> Result<Vec<i32>> {
        let fresh = self
            .0
            .topology
            .get_topic(topic)
            .map(|meta| !meta.is_stale(self.0.config.metadata_ttl))
            .unwrap_or(false);
        if !fresh {
            self.refresh_topic(topic).await?;
        }

        let meta = self
            .0
            .topology
            .get_topic(topic)
            .ok_or(Error::UnknownTopicOrPartition)?;
        let mut ids: Vec<i32> = meta.partition_leaders.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }
}
