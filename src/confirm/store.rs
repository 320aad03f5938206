//! Storage for pending confirmations.
//!
//! The service operates exclusively through [`ConfirmationStore`], so a
//! persistent backend can replace [`MemoryConfirmationStore`] without touching
//! the flow. Backends must make `take` an atomic check-and-remove: of two
//! callers racing on one token, exactly one gets the context.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::token::generate_confirm_token;
use super::types::{ConfirmationContext, ConfirmationToken, PendingConfirmation};

#[async_trait]
pub trait ConfirmationStore: Send + Sync {
    /// Park a pending confirmation under a freshly minted token.
    async fn put(&self, pending: PendingConfirmation) -> Result<ConfirmationToken>;

    /// Look up without consuming. Expired contexts are never returned.
    async fn get(&self, token: &ConfirmationToken) -> Result<Option<ConfirmationContext>>;

    /// Atomically remove and return the context. Expired contexts are
    /// removed but not returned.
    async fn take(&self, token: &ConfirmationToken) -> Result<Option<ConfirmationContext>>;

    /// Idempotent removal; unknown tokens are a no-op.
    async fn remove(&self, token: &ConfirmationToken) -> Result<()>;

    /// Drop every context expired at `now`. Returns how many were dropped.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

type ContextMap = Arc<RwLock<HashMap<ConfirmationToken, ConfirmationContext>>>;

/// In-process store backed by a `RwLock<HashMap>`.
#[derive(Clone, Default)]
pub struct MemoryConfirmationStore {
    contexts: ContextMap,
}

impl MemoryConfirmationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored contexts, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.contexts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.contexts.read().await.is_empty()
    }
}

#[async_trait]
impl ConfirmationStore for MemoryConfirmationStore {
    async fn put(&self, pending: PendingConfirmation) -> Result<ConfirmationToken> {
        let mut contexts = self.contexts.write().await;
        // A collision on 256 random bits is not expected, but a live token
        // must never be overwritten.
        loop {
            let token = generate_confirm_token();
            if let Entry::Vacant(slot) = contexts.entry(token.clone()) {
                slot.insert(ConfirmationContext::from_pending(token.clone(), pending));
                return Ok(token);
            }
        }
    }

    async fn get(&self, token: &ConfirmationToken) -> Result<Option<ConfirmationContext>> {
        let now = Utc::now();
        {
            let contexts = self.contexts.read().await;
            match contexts.get(token) {
                None => return Ok(None),
                Some(ctx) if !ctx.is_expired(now) => return Ok(Some(ctx.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it lazily so later lookups short-circuit.
        let mut contexts = self.contexts.write().await;
        if contexts.get(token).is_some_and(|ctx| ctx.is_expired(now)) {
            contexts.remove(token);
            tracing::debug!("Dropped expired confirmation context on lookup");
        }
        Ok(None)
    }

    async fn take(&self, token: &ConfirmationToken) -> Result<Option<ConfirmationContext>> {
        let now = Utc::now();
        let removed = self.contexts.write().await.remove(token);
        Ok(removed.filter(|ctx| !ctx.is_expired(now)))
    }

    async fn remove(&self, token: &ConfirmationToken) -> Result<()> {
        self.contexts.write().await.remove(token);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut contexts = self.contexts.write().await;
        let before = contexts.len();
        contexts.retain(|_, ctx| !ctx.is_expired(now));
        Ok(before - contexts.len())
    }
}
