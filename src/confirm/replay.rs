//! ReplayRedirector: turns a confirmed request snapshot into a
//! method-preserving redirect back to the original handler.
//!
//! The redirect is `307 Temporary Redirect`, so a POST stays a POST. The
//! browser resends the confirmation form's body, not the original one, so the
//! original fields travel through the [`FlashTransport`] and are surfaced to
//! the resumed handler by the flash middleware.

use axum::{
    http::{
        header::{self, InvalidHeaderValue},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use thiserror::Error;
use url::form_urlencoded;

use super::flash::{flash_cookie, FlashTransport};
use super::types::OriginalRequest;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("replay target is not a same-origin path: {0:?}")]
    UnsafeTarget(String),

    #[error("replay location is not a valid header value: {0:?}")]
    InvalidLocation(String),

    #[error("flash cookie is not a valid header value: {0}")]
    InvalidCookie(#[from] InvalidHeaderValue),

    #[error("flash transport failure: {0}")]
    Flash(#[from] anyhow::Error),
}

pub struct ReplayRedirector {
    flash: Arc<dyn FlashTransport>,
}

impl ReplayRedirector {
    pub fn new(flash: Arc<dyn FlashTransport>) -> Self {
        Self { flash }
    }

    /// Hand the original form to the next request and redirect to
    /// `{original_page_path}?confirmed=true&handler={original_handler}`.
    pub async fn redirect(&self, request: &OriginalRequest) -> Result<Response, ReplayError> {
        let location = replay_location(request)?;
        let location_value = HeaderValue::from_str(&location)
            .map_err(|_| ReplayError::InvalidLocation(location.clone()))?;

        let flash_id = self.flash.put(request.original_form_data.clone()).await?;
        let cookie = flash_cookie(flash_id, self.flash.ttl())?;

        tracing::debug!(
            location = %location,
            fields = request.original_form_data.len(),
            "Issuing method-preserving replay redirect"
        );

        Ok((
            StatusCode::TEMPORARY_REDIRECT,
            [(header::LOCATION, location_value), (header::SET_COOKIE, cookie)],
        )
            .into_response())
    }
}

/// Target of the replay redirect. Only same-origin absolute paths are
/// accepted; anything with a scheme or authority is refused.
pub fn replay_location(request: &OriginalRequest) -> Result<String, ReplayError> {
    let path = request.original_page_path.as_str();
    let is_local = path.starts_with('/')
        && !path.starts_with("//")
        && !path.starts_with("/\\")
        && !path.chars().any(char::is_control);
    if !is_local {
        return Err(ReplayError::UnsafeTarget(path.to_string()));
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("confirmed", "true")
        .append_pair("handler", &request.original_handler)
        .finish();
    // The query must precede any fragment or the browser drops it.
    let (base, fragment) = match path.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (path, None),
    };
    let separator = if base.contains('?') { '&' } else { '?' };

    Ok(match fragment {
        Some(fragment) => format!("{base}{separator}{query}#{fragment}"),
        None => format!("{base}{separator}{query}"),
    })
}
