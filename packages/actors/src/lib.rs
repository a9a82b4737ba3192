//! Actor system for the batch job exporter.
//!
//! This crate provides the Ractor-based credential broker: the only piece of
//! state that outlives a collection cycle.
//!
//! # Usage
//!
//! ```ignore
//! use actors::CredentialBroker;
//!
//! let (broker, _handle) = CredentialBroker::spawn(identity, clock).await?;
//! let session = broker.get_session("arn:aws:iam::123456789012:role/reader").await?;
//! ```

mod broker;
mod messages;

pub use broker::{BrokerState, CredentialBroker, CredentialBrokerActor};
pub use messages::BrokerMessage;

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, SpawnErr};
