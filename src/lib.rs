//! ea-confirmation: two-phase confirmation and deferred-action replay.
//!
//! Any page handler can ask the user to confirm an action before it runs.
//! The pending request (path, handler, form fields) is parked behind a
//! single-use token, the user is shown a neutral confirmation screen, and on
//! "yes" the original request is replayed with a method-preserving redirect.
//!
//! ```text
//! upstream handler ──create_confirmation──▶ ConfirmationService ──▶ ConfirmationStore
//!        │                                          ▲
//!        └─303─▶ GET/POST /Confirmation ─────────────┘
//!                       │ confirmed
//!                       ▼
//!                ReplayRedirector ──307──▶ {path}?confirmed=true&handler={handler}
//!                       │
//!                       └──▶ FlashTransport (read once by the next request)
//! ```

pub mod api;
pub mod config;
pub mod confirm;
pub mod ui;

pub use config::{ConfigError, ConfirmationConfig};
pub use confirm::error::ConfirmationError;
pub use confirm::service::ConfirmationService;
pub use confirm::types::{
    ConfirmationContext, ConfirmationToken, DisplayMetadata, DisplayModel, FormData,
    OriginalRequest,
};
