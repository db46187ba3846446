//! Core client for a Kafka-inspired streaming platform: wire codec,
//! producer, consumer and cluster session.
//!
//! A cluster exposes a Stream Controller (SC) for metadata and admin
//! operations and a set of Stream Processing Units (SPUs) that each own
//! some subset of partitions. [`client::Client::connect`] resolves the SC,
//! performs the platform-version handshake, and from there hands
//! out [`client::ControllerClient`] for admin, [`client::Producer`] for
//! writes and [`client::Consumer`] for reads.

pub mod backoff;
pub mod client;
pub mod compression;
pub mod connection;
pub mod error;
pub mod offset;
pub mod partitioner;
pub mod protocol;
pub mod record;
pub mod topic;
pub mod version;

pub use client::{Client, ClientBuilder, ClientConfig, Consumer, ControllerClient, Producer};
pub use error::{Error, Result};
pub use offset::{Offset, OffsetStrategy};
pub use record::{ConsumedRecord, ProduceRecord};
pub use topic::{Partition, Topic, TopicSpec};
