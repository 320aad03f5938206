//! ConfirmationService: creates, looks up and consumes pending confirmations.
//!
//! Lookup (`get_confirmation`, `prepare_display_model`) and consumption
//! (`consume_confirmation`, `clear_confirmation`) are separate operations.
//! The POST path looks the context up, branches on the user's choice, and then
//! consumes exactly once; the consume is atomic so a double-submit has one
//! winner.

use chrono::{Duration, Utc};
use std::sync::Arc;
use url::form_urlencoded;

use super::error::ConfirmationError;
use super::store::ConfirmationStore;
use super::types::{
    ConfirmationContext, ConfirmationToken, DisplayMetadata, DisplayModel, OriginalRequest,
    PendingConfirmation,
};

/// Default confirmation lifetime (20 minutes)
pub const DEFAULT_CONFIRMATION_TTL_SECS: i64 = 20 * 60;

/// Default route of the confirmation page
pub const DEFAULT_CONFIRMATION_PATH: &str = "/Confirmation";

pub struct ConfirmationService {
    store: Arc<dyn ConfirmationStore>,
    confirmation_path: String,
    default_ttl: Duration,
}

impl ConfirmationService {
    pub fn new(store: Arc<dyn ConfirmationStore>) -> Self {
        Self {
            store,
            confirmation_path: DEFAULT_CONFIRMATION_PATH.to_string(),
            default_ttl: Duration::seconds(DEFAULT_CONFIRMATION_TTL_SECS),
        }
    }

    pub fn with_confirmation_path(mut self, path: impl Into<String>) -> Self {
        self.confirmation_path = path.into();
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Park `request` behind a new token valid for `ttl`.
    pub async fn create_confirmation(
        &self,
        request: OriginalRequest,
        metadata: DisplayMetadata,
        ttl: Duration,
    ) -> Result<ConfirmationToken, ConfirmationError> {
        if request.original_page_path.trim().is_empty() {
            return Err(ConfirmationError::InvalidRequest(
                "original_page_path is empty".into(),
            ));
        }
        if request.original_handler.trim().is_empty() {
            return Err(ConfirmationError::InvalidRequest(
                "original_handler is empty".into(),
            ));
        }
        if ttl <= Duration::zero() {
            return Err(ConfirmationError::InvalidRequest(format!(
                "ttl must be positive, got {}s",
                ttl.num_seconds()
            )));
        }

        let page = request.original_page_path.clone();
        let handler = request.original_handler.clone();
        let created_at = Utc::now();
        let expires_at = created_at.checked_add_signed(ttl).ok_or_else(|| {
            ConfirmationError::InvalidRequest(format!(
                "ttl of {}s is out of range",
                ttl.num_seconds()
            ))
        })?;
        let pending = PendingConfirmation {
            request,
            metadata,
            created_at,
            expires_at,
        };

        let token = self
            .store
            .put(pending)
            .await
            .map_err(ConfirmationError::Store)?;

        tracing::info!(
            page = %page,
            handler = %handler,
            ttl_secs = ttl.num_seconds(),
            "Created pending confirmation"
        );
        Ok(token)
    }

    /// [`Self::create_confirmation`] with the configured default TTL.
    pub async fn create_confirmation_with_default_ttl(
        &self,
        request: OriginalRequest,
        metadata: DisplayMetadata,
    ) -> Result<ConfirmationToken, ConfirmationError> {
        self.create_confirmation(request, metadata, self.default_ttl)
            .await
    }

    /// Build the display model for the GET screen. Does not consume.
    pub async fn prepare_display_model(
        &self,
        token: &ConfirmationToken,
    ) -> Result<Option<DisplayModel>, ConfirmationError> {
        Ok(self
            .get_confirmation(token)
            .await?
            .map(|ctx| DisplayModel::from_context(&ctx)))
    }

    /// Look the context up without consuming it.
    pub async fn get_confirmation(
        &self,
        token: &ConfirmationToken,
    ) -> Result<Option<ConfirmationContext>, ConfirmationError> {
        if token.is_empty() {
            return Ok(None);
        }
        self.store.get(token).await.map_err(ConfirmationError::Store)
    }

    /// Atomically consume the token. `None` means it was already consumed,
    /// expired, or never issued.
    pub async fn consume_confirmation(
        &self,
        token: &ConfirmationToken,
    ) -> Result<Option<ConfirmationContext>, ConfirmationError> {
        if token.is_empty() {
            return Ok(None);
        }
        let consumed = self
            .store
            .take(token)
            .await
            .map_err(ConfirmationError::Store)?;
        if consumed.is_some() {
            tracing::debug!(token = %token, "Consumed confirmation token");
        }
        Ok(consumed)
    }

    /// Explicit, idempotent consumption.
    pub async fn clear_confirmation(
        &self,
        token: &ConfirmationToken,
    ) -> Result<(), ConfirmationError> {
        self.store
            .remove(token)
            .await
            .map_err(ConfirmationError::Store)
    }

    /// URL of the confirmation page for `token`.
    pub fn confirmation_url(&self, token: &ConfirmationToken) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("token", token.as_str())
            .finish();
        format!("{}?{}", self.confirmation_path, query)
    }
}
