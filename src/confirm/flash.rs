//! Single-request transport for confirmed form data.
//!
//! The replay redirect cannot carry the original form body (the browser
//! resends the confirmation form instead), so the fields are parked here under
//! a correlation id. The id travels to the resumed request in a cookie, and
//! the entry is taken (removed) by that request. Entries nobody collects
//! expire after a short TTL.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::http::{header::InvalidHeaderValue, HeaderValue};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::FormData;

/// Default lifetime of an uncollected flash entry
pub const DEFAULT_FLASH_TTL_SECS: i64 = 60;

/// Cookie naming the flash entry of the next request
pub const FLASH_COOKIE: &str = "ea_flash";

/// `Set-Cookie` value carrying a flash id.
pub fn flash_cookie(id: FlashId, ttl: Duration) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = ttl.num_seconds().max(0);
    HeaderValue::from_str(&format!(
        "{FLASH_COOKIE}={id}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax"
    ))
}

/// Correlation id of a flash entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlashId(Uuid);

impl FlashId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl Default for FlashId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FlashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[async_trait]
pub trait FlashTransport: Send + Sync {
    /// Park form data for the next request. Returns the correlation id.
    async fn put(&self, form: FormData) -> Result<FlashId>;

    /// Remove and return the entry. A second call returns `None`.
    async fn take(&self, id: FlashId) -> Result<Option<FormData>>;

    /// Drop entries that were never collected.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    /// How long an entry stays collectable.
    fn ttl(&self) -> Duration;
}

struct FlashEntry {
    form: FormData,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MemoryFlashStore {
    entries: Arc<RwLock<HashMap<FlashId, FlashEntry>>>,
    ttl: Duration,
}

impl MemoryFlashStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for MemoryFlashStore {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_FLASH_TTL_SECS))
    }
}

#[async_trait]
impl FlashTransport for MemoryFlashStore {
    async fn put(&self, form: FormData) -> Result<FlashId> {
        let id = FlashId::new();
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| anyhow!("flash ttl of {}s is out of range", self.ttl.num_seconds()))?;
        let entry = FlashEntry { form, expires_at };
        self.entries.write().await.insert(id, entry);
        Ok(id)
    }

    async fn take(&self, id: FlashId) -> Result<Option<FormData>> {
        let now = Utc::now();
        let entry = self.entries.write().await.remove(&id);
        Ok(entry
            .filter(|e| now < e.expires_at)
            .map(|e| e.form))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| now < e.expires_at);
        Ok(before - entries.len())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}
