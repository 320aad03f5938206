//! HTTP surface: confirmation page, generic error page, the sample
//! application form, and the flash middleware that ties replay to the
//! resumed request.

pub mod confirmation_routes;
pub mod error;
pub mod flash;
pub mod forms_routes;
pub mod resume;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::ConfirmationConfig;
use crate::confirm::error::ConfirmationError;
use crate::confirm::flash::{FlashTransport, MemoryFlashStore};
use crate::confirm::replay::ReplayRedirector;
use crate::confirm::service::ConfirmationService;
use crate::confirm::store::{ConfirmationStore, MemoryConfirmationStore};
use crate::ui::PageRenderer;

pub use confirmation_routes::request_confirmation;
pub use flash::ConfirmedForm;
pub use resume::ResumeQuery;

// ── State ────────────────────────────────────────────────────

/// Shared state for every route.
#[derive(Clone)]
pub struct ConfirmationState {
    pub service: Arc<ConfirmationService>,
    pub replay: Arc<ReplayRedirector>,
    pub flash: Arc<dyn FlashTransport>,
    pub pages: Arc<PageRenderer>,
    pub confirmation_path: Arc<str>,
    pub error_path: Arc<str>,
}

impl ConfirmationState {
    pub fn new(
        config: &ConfirmationConfig,
        store: Arc<dyn ConfirmationStore>,
        flash: Arc<dyn FlashTransport>,
    ) -> Result<Self, ConfirmationError> {
        let service = ConfirmationService::new(store)
            .with_confirmation_path(config.confirmation_path.clone())
            .with_default_ttl(config.default_ttl());

        Ok(Self {
            service: Arc::new(service),
            replay: Arc::new(ReplayRedirector::new(Arc::clone(&flash))),
            flash,
            pages: Arc::new(PageRenderer::new()?),
            confirmation_path: config.confirmation_path.as_str().into(),
            error_path: config.error_path.as_str().into(),
        })
    }

    /// State backed by the in-process stores.
    pub fn in_memory(config: &ConfirmationConfig) -> Result<Self, ConfirmationError> {
        Self::new(
            config,
            Arc::new(MemoryConfirmationStore::new()),
            Arc::new(MemoryFlashStore::new(config.flash_ttl())),
        )
    }
}

// ── Router ───────────────────────────────────────────────────

/// Confirmation and error routes only, without middleware.
pub fn create_confirmation_router(state: ConfirmationState) -> Router {
    Router::new()
        .route(
            &state.confirmation_path,
            get(confirmation_routes::show_confirmation)
                .post(confirmation_routes::submit_confirmation),
        )
        .route(&state.error_path, get(confirmation_routes::error_page))
        .with_state(state)
}

/// Full application: confirmation flow, sample form pages, the flash
/// middleware and HTTP tracing.
pub fn create_app(state: ConfirmationState) -> Router {
    create_confirmation_router(state.clone())
        .merge(forms_routes::create_forms_router(state.clone()))
        .layer(middleware::from_fn_with_state(state, flash::flash_layer))
        .layer(TraceLayer::new_for_http())
}
