//! Top-level error mapping. Users only ever see the generic error page;
//! details stay in the log.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::confirm::error::ConfirmationError;
use crate::ui::pages;

#[derive(Debug)]
pub struct AppError(pub ConfirmationError);

impl From<ConfirmationError> for AppError {
    fn from(err: ConfirmationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.0);
        } else {
            tracing::warn!("Request rejected: {}", self.0);
        }
        (status, Html(pages::ERROR_PAGE)).into_response()
    }
}
