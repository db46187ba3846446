use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug)]
pub struct Topic {
    /// The name of this topic.
    pub name: String,

    /// Partition information
    pub partitions: BTreeMap<i32, Partition>,
}

#[derive(Debug, Eq, PartialEq)]
pub struct Partition {
    /// The ID of the leader broker.
    pub leader_id: i32,

    /// The set of all nodes that host this partition.
    pub replica_nodes: Vec<i32>,
}

/// Validates a topic name: UTF-8, 1-249 bytes, `[A-Za-z0-9._-]`.
pub fn is_valid_topic_name(name: &str) -> bool {
    let len = name.len();
    (1..=249).contains(&len)
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

/// Creation parameters for a new topic. Zero/`None` fields mean "use
/// the broker's default".
#[derive(Debug, Clone)]
pub struct TopicSpec {
    pub partitions: u32,
    pub replication_factor: u16,
    pub retention: Option<Duration>,
    pub segment_size: Option<u64>,
}

impl Default for TopicSpec {
    fn default() -> Self {
        Self {
            partitions: 1,
            replication_factor: 1,
            retention: None,
            segment_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_topic_names() {
        for name in ["orders", "orders.v2", "orders-v2", "a", "A1._-"] {
            assert!(is_valid_topic_name(name), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_topic_names() {
        assert!(!is_valid_topic_name(""));
        assert!(!is_valid_topic_name("orders/v2"));
        assert!(!is_valid_topic_name("orders v2"));
        assert!(!is_valid_topic_name(&"a".repeat(250)));
    }

    #[test]
    fn test_default_topic_spec() {
        let spec = TopicSpec::default();
        assert_eq!(spec.partitions, 1);
        assert_eq!(spec.replication_factor, 1);
    }
}
