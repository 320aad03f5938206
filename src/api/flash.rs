//! Flash cookie plumbing and the middleware that delivers confirmed form data
//! to exactly one request.
//!
//! The replay redirect sets `ea_flash=<id>`. On the next request carrying the
//! cookie, [`flash_layer`] takes the entry out of the
//! [`FlashTransport`](crate::confirm::flash::FlashTransport), exposes it as a
//! [`ConfirmedForm`] extension and expires the cookie on the response. A
//! second hop finds neither cookie nor entry.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::error::AppError;
use super::ConfirmationState;
use crate::confirm::error::ConfirmationError;
use crate::confirm::flash::{FlashId, FLASH_COOKIE};
use crate::confirm::types::FormData;

/// Original form fields of a request resumed after confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedForm(pub FormData);

/// `Set-Cookie` value that deletes the flash cookie.
pub fn clear_flash_cookie() -> HeaderValue {
    HeaderValue::from_static("ea_flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

/// Raw value of the flash cookie, if the request carries one.
pub fn read_flash_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == FLASH_COOKIE)
        .map(|(_, value)| value.trim().to_string())
}

fn sets_flash_cookie(headers: &HeaderMap) -> bool {
    let prefix = format!("{FLASH_COOKIE}=");
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix))
}

/// Router middleware; install with `axum::middleware::from_fn_with_state`.
pub async fn flash_layer(
    State(state): State<ConfirmationState>,
    mut req: Request,
    next: Next,
) -> Response {
    let raw = read_flash_cookie(req.headers());

    if let Some(id) = raw.as_deref().and_then(FlashId::parse) {
        match state.flash.take(id).await {
            Ok(Some(form)) => {
                req.extensions_mut().insert(ConfirmedForm(form));
            }
            Ok(None) => {
                tracing::debug!(flash_id = %id, "Flash entry already collected or expired");
            }
            Err(e) => {
                return AppError::from(ConfirmationError::Store(e)).into_response();
            }
        }
    }

    let mut resp = next.run(req).await;
    if raw.is_some() && !sets_flash_cookie(resp.headers()) {
        resp.headers_mut()
            .append(header::SET_COOKIE, clear_flash_cookie());
    }
    resp
}
