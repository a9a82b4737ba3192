//! Credential broker actor.
//!
//! Owns the process-wide role -> credential cache. The actor handles one
//! message at a time, so the check-expiry-then-assume sequence for a role is
//! atomic: overlapping collection cycles never assume the same role twice and
//! never see a half-written entry.

use std::collections::HashMap;
use std::sync::Arc;

use batch_api::IdentityApi;
use batch_core::{
    CachedCredential, Clock, CredentialError, SessionCredentials, session_name_from_arn,
};
use ractor::concurrency::JoinHandle;
use ractor::{Actor, ActorProcessingErr, ActorRef, SpawnErr};

use crate::messages::BrokerMessage;

/// State for the broker actor.
pub struct BrokerState {
    identity: Arc<dyn IdentityApi>,
    clock: Arc<dyn Clock>,
    /// One entry per role ARN.
    cache: HashMap<String, CachedCredential>,
}

impl BrokerState {
    pub fn new(identity: Arc<dyn IdentityApi>, clock: Arc<dyn Clock>) -> Self {
        Self {
            identity,
            clock,
            cache: HashMap::new(),
        }
    }

    async fn session(&mut self, role_arn: &str) -> Result<SessionCredentials, CredentialError> {
        let now = self.clock.now();

        if let Some(entry) = self.cache.get(role_arn)
            && entry.is_fresh(now)
        {
            tracing::debug!("Reusing cached session for {}", role_arn);
            return Ok(entry.credentials.clone());
        }

        tracing::info!("Retrieving session for assumed role {}", role_arn);

        let caller = self
            .identity
            .caller_arn()
            .await
            .map_err(|e| CredentialError::Identity(e.to_string()))?;

        let credentials = self
            .identity
            .assume_role(role_arn, session_name_from_arn(&caller))
            .await
            .map_err(|e| CredentialError::AssumeRole {
                role_arn: role_arn.to_string(),
                message: e.to_string(),
            })?;

        self.cache.insert(
            role_arn.to_string(),
            CachedCredential::new(role_arn, credentials.clone(), now),
        );

        Ok(credentials)
    }
}

/// Actor serializing all access to the credential cache.
pub struct CredentialBrokerActor;

impl Actor for CredentialBrokerActor {
    type Msg = BrokerMessage;
    type State = BrokerState;
    type Arguments = BrokerState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting credential broker");
        Ok(args)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            BrokerMessage::GetSession { role_arn, reply } => {
                let result = state.session(&role_arn).await;
                if let Err(e) = &result {
                    tracing::warn!("{}", e);
                }
                let _ = reply.send(result);
            }

            BrokerMessage::CachedRoles { reply } => {
                let mut roles: Vec<String> = state.cache.keys().cloned().collect();
                roles.sort();
                let _ = reply.send(roles);
            }

            BrokerMessage::Shutdown => {
                tracing::info!("Shutting down credential broker");
                myself.stop(None);
            }
        }

        Ok(())
    }
}

/// Cloneable handle to a running credential broker.
#[derive(Clone)]
pub struct CredentialBroker {
    actor: ActorRef<BrokerMessage>,
}

impl CredentialBroker {
    /// Start a broker backed by `identity`, reading time from `clock`.
    pub async fn spawn(
        identity: Arc<dyn IdentityApi>,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, JoinHandle<()>), SpawnErr> {
        let (actor, handle) = Actor::spawn(
            None,
            CredentialBrokerActor,
            BrokerState::new(identity, clock),
        )
        .await?;

        Ok((Self { actor }, handle))
    }

    /// Get credentials for `role_arn`, served from cache while fresh.
    ///
    /// Role-assumption failures are returned as-is; there is no retry and no
    /// fallback credential.
    pub async fn get_session(&self, role_arn: &str) -> Result<SessionCredentials, CredentialError> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.actor
            .send_message(BrokerMessage::GetSession {
                role_arn: role_arn.to_string(),
                reply: tx.into(),
            })
            .map_err(|e| CredentialError::BrokerUnavailable(e.to_string()))?;

        rx.await
            .map_err(|_| CredentialError::BrokerUnavailable("no reply from broker".into()))?
    }

    /// Roles that currently hold a cache entry, sorted.
    pub async fn cached_roles(&self) -> Result<Vec<String>, CredentialError> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.actor
            .send_message(BrokerMessage::CachedRoles { reply: tx.into() })
            .map_err(|e| CredentialError::BrokerUnavailable(e.to_string()))?;

        rx.await
            .map_err(|_| CredentialError::BrokerUnavailable("no reply from broker".into()))
    }

    /// Ask the broker to stop.
    pub fn shutdown(&self) {
        let _ = self.actor.send_message(BrokerMessage::Shutdown);
    }
}
