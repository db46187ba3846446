//! The metadata cache: `topic -> {partitions, partition_leader_map}`
//! plus the broker id -> endpoint map it's built from. Read-mostly, with
//! an exclusive write on refresh via a `parking_lot::RwLock`-guarded
//! `BrokerTopology`, and a default 5-minute TTL so a stale topic gets
//! re-resolved on the next lookup rather than pinned forever.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::info;

use crate::protocol::messages::MetadataResponse;

pub const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct Broker {
    /// broker ID from the topology metadata
    pub id: i32,
    pub host: String,
    pub port: i32,
}

impl Broker {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Display for Broker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct TopicMetadata {
    /// Dense partition count for this topic.
    pub partition_count: u32,
    /// partition id -> leader broker id.
    pub partition_leaders: HashMap<i32, i32>,
    fetched_at: Instant,
}

impl TopicMetadata {
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() >= ttl
    }
}

#[derive(Debug, Default)]
pub struct BrokerTopology {
    brokers: RwLock<HashMap<i32, Broker>>,
    topics: RwLock<HashMap<String, TopicMetadata>>,
}

impl BrokerTopology {
    pub fn is_empty(&self) -> bool {
        self.brokers.read().is_empty()
    }

    pub fn get_broker(&self, broker_id: i32) -> Option<Broker> {
        self.brokers.read().get(&broker_id).cloned()
    }

    pub fn get_brokers(&self) -> Vec<Broker> {
        self.brokers.read().values().cloned().collect()
    }

    pub fn get_topic(&self, topic: &str) -> Option<TopicMetadata> {
        self.topics.read().get(topic).cloned()
    }

    /// The leader broker for a given (topic, partition), if known and
    /// not stale against `ttl`.
    pub fn leader_for(&self, topic: &str, partition: i32, ttl: Duration) -> Option<Broker> {
        let topics = self.topics.read();
        let meta = topics.get(topic)?;
        if meta.is_stale(ttl) {
            return None;
        }
        let leader_id = *meta.partition_leaders.get(&partition)?;
        drop(topics);
        self.get_broker(leader_id)
    }

    /// Marks a topic's cached metadata as needing refresh (called on
    /// `UnknownTopicOrPartition`/`LeaderNotAvailable`).
    pub fn invalidate_topic(&self, topic: &str) {
        self.topics.write().remove(topic);
    }

    /// Applies a Metadata response: updates the broker endpoint map and
    /// replaces cached partition-leader data for every topic present in
    /// the response.
    pub fn update(&self, response: &MetadataResponse) {
        {
            let mut brokers = self.brokers.write();
            for broker in &response.brokers {
                let new = Broker {
                    id: broker.node_id,
                    host: broker.host.clone(),
                    port: broker.port,
                };
                match brokers.entry(broker.node_id) {
                    Entry::Occupied(mut o) => {
                        let current = o.get_mut();
                        if current.host != new.host || current.port != new.port {
                            info!(broker = broker.node_id, current = %current, new = %new, "broker update");
                            *current = new;
                        }
                    }
                    Entry::Vacant(v) => {
                        info!(broker = broker.node_id, new = %new, "new broker");
                        v.insert(new);
                    }
                }
            }
        }

        let mut topics = self.topics.write();
        for topic in &response.topics {
            let partition_leaders = topic
                .partitions
                .iter()
                .map(|p| (p.partition_index, p.leader_id))
                .collect();
            topics.insert(
                topic.name.clone(),
                TopicMetadata {
                    partition_count: topic.partitions.len() as u32,
                    partition_leaders,
                    fetched_at: Instant::now(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{MetadataResponseBroker, MetadataResponsePartition, MetadataResponseTopic};

    fn sample_response() -> MetadataResponse {
        MetadataResponse {
            controller_id: 1001,
            brokers: vec![MetadataResponseBroker {
                node_id: 1001,
                host: "spu-1001.cluster.local".into(),
                port: 9005,
            }],
            topics: vec![MetadataResponseTopic {
                error: None,
                name: "orders".into(),
                partitions: vec![MetadataResponsePartition {
                    error: None,
                    partition_index: 0,
                    leader_id: 1001,
                    replica_nodes: vec![1001],
                }],
            }],
        }
    }

    #[test]
    fn test_update_and_lookup() {
        let topology = BrokerTopology::default();
        topology.update(&sample_response());

        let broker = topology.get_broker(1001).unwrap();
        assert_eq!(broker.endpoint(), "spu-1001.cluster.local:9005");

        let leader = topology
            .leader_for("orders", 0, DEFAULT_METADATA_TTL)
            .unwrap();
        assert_eq!(leader.id, 1001);
    }

    #[test]
    fn test_leader_for_unknown_topic_is_none() {
        let topology = BrokerTopology::default();
        topology.update(&sample_response());
        assert!(topology.leader_for("ghost", 0, DEFAULT_METADATA_TTL).is_none());
    }

    #[test]
    fn test_invalidate_topic_clears_cache() {
        let topology = BrokerTopology::default();
        topology.update(&sample_response());
        topology.invalidate_topic("orders");
        assert!(topology.get_topic("orders").is_none());
    }

    #[test]
    fn test_stale_entry_treated_as_absent() {
        let topology = BrokerTopology::default();
        topology.update(&sample_response());
        assert!(topology
            .leader_for("orders", 0, Duration::from_secs(0))
            .is_none());
    }
}
