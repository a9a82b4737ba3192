//! Message types for actor communication.

use batch_core::{CredentialError, SessionCredentials};
use ractor::RpcReplyPort;

/// Messages for the CredentialBrokerActor.
#[derive(Debug)]
pub enum BrokerMessage {
    /// Get credentials for a role, assuming it if the cached session is stale.
    GetSession {
        role_arn: String,
        reply: RpcReplyPort<Result<SessionCredentials, CredentialError>>,
    },

    /// List the roles currently holding a cache entry.
    CachedRoles { reply: RpcReplyPort<Vec<String>> },

    /// Stop the broker.
    Shutdown,
}
