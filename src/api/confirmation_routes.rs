//! Confirmation page controller.
//!
//! ## Endpoints
//!
//! - `GET  /Confirmation?token=…` - render the confirmation screen
//! - `POST /Confirmation`         - act on the user's yes/no choice
//! - `GET  /Error`                - generic error page
//!
//! ## Flow
//!
//! ```text
//! AwaitingToken ──GET, token ok──▶ AwaitingChoice ──POST true──▶ Replayed (307)
//!       │                              │   │
//!       │                              │   └──POST false──▶ Declined (303 return URL)
//!       │                              └──POST no choice──▶ AwaitingChoice (re-render)
//!       └──no / unknown token──▶ Error (303 error page)
//! ```
//!
//! Routes are mounted at the configured paths; the ones above are defaults.

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Query, State,
    },
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};

use super::error::AppError;
use super::ConfirmationState;
use crate::confirm::replay::ReplayError;
use crate::confirm::return_url::normalize_return_url;
use crate::confirm::types::{
    ConfirmationToken, DisplayMetadata, DisplayModel, FormData, OriginalRequest,
};
use crate::ui::pages;

// ── Request Types ────────────────────────────────────────────

/// Query string or form body as raw pairs.
///
/// Extracting into pairs never fails on repeated or unexpected fields, so a
/// malformed request still ends on the error page (or a re-render) rather
/// than on a framework rejection.
type Pairs = Vec<(String, String)>;

const TOKEN_FIELD: &str = "token";
const CONFIRMED_FIELD: &str = "Confirmed";

fn pairs_from_query(query: Result<Query<Pairs>, QueryRejection>) -> FormData {
    match query {
        Ok(Query(pairs)) => pairs.into(),
        Err(rejection) => {
            tracing::warn!("Unreadable confirmation query string: {rejection}");
            FormData::new()
        }
    }
}

fn pairs_from_form(form: Result<Form<Pairs>, FormRejection>) -> FormData {
    match form {
        Ok(Form(pairs)) => pairs.into(),
        Err(rejection) => {
            tracing::warn!("Unreadable confirmation form body: {rejection}");
            FormData::new()
        }
    }
}

/// The value of `name` when it was submitted exactly once.
fn single_value<'a>(fields: &'a FormData, name: &'a str) -> Option<&'a str> {
    let mut values = fields.get_all(name);
    let first = values.next()?;
    values.next().is_none().then_some(first)
}

/// Parse the `Confirmed` field. Only an explicit, case-insensitive
/// `true`/`false` counts as a choice; anything else is "no selection".
pub fn parse_choice(raw: Option<&str>) -> Option<bool> {
    match raw.map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("true") => Some(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

// ── Error path ───────────────────────────────────────────────

/// Outcomes that end on the generic error page.
#[derive(Debug)]
enum FlowError {
    MissingToken,
    TokenNotFound(ConfirmationToken),
    ReplayFailure(ConfirmationToken, ReplayError),
}

impl FlowError {
    fn into_redirect(self, error_path: &str) -> Response {
        match &self {
            FlowError::MissingToken => {
                tracing::warn!("Confirmation requested without a usable token");
            }
            FlowError::TokenNotFound(token) => {
                tracing::warn!(
                    token = %token,
                    "Confirmation token not found, expired or already used"
                );
            }
            FlowError::ReplayFailure(token, err) => {
                tracing::error!(token = %token, "Failed to replay confirmed action: {err}");
            }
        }
        Redirect::to(error_path).into_response()
    }
}

fn token_from(raw: Option<&str>) -> Option<ConfirmationToken> {
    raw.map(ConfirmationToken::new).filter(|t| !t.is_empty())
}

fn render(state: &ConfirmationState, model: &DisplayModel) -> Result<Response, AppError> {
    let html = state.pages.confirmation(model, &state.confirmation_path)?;
    Ok(Html(html).into_response())
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /Confirmation?token=…
pub async fn show_confirmation(
    State(state): State<ConfirmationState>,
    query: Result<Query<Pairs>, QueryRejection>,
) -> Result<Response, AppError> {
    let query = pairs_from_query(query);
    let Some(token) = token_from(single_value(&query, TOKEN_FIELD)) else {
        return Ok(FlowError::MissingToken.into_redirect(&state.error_path));
    };

    match state.service.prepare_display_model(&token).await? {
        Some(model) => render(&state, &model),
        None => Ok(FlowError::TokenNotFound(token).into_redirect(&state.error_path)),
    }
}

/// POST /Confirmation
pub async fn submit_confirmation(
    State(state): State<ConfirmationState>,
    query: Result<Query<Pairs>, QueryRejection>,
    form: Result<Form<Pairs>, FormRejection>,
) -> Result<Response, AppError> {
    let query = pairs_from_query(query);
    let form = pairs_from_form(form);
    let token = token_from(single_value(&form, TOKEN_FIELD))
        .or_else(|| token_from(single_value(&query, TOKEN_FIELD)));
    let Some(token) = token else {
        return Ok(FlowError::MissingToken.into_redirect(&state.error_path));
    };

    let Some(context) = state.service.get_confirmation(&token).await? else {
        return Ok(FlowError::TokenNotFound(token).into_redirect(&state.error_path));
    };

    let Some(confirmed) = parse_choice(single_value(&form, CONFIRMED_FIELD)) else {
        // Not a decision yet: keep the token and ask again.
        tracing::info!(token = %token, "No selection made, re-rendering confirmation");
        let model = DisplayModel::from_context(&context).with_selection_error();
        return render(&state, &model);
    };

    // Exactly one concurrent submission gets the context back.
    let Some(context) = state.service.consume_confirmation(&token).await? else {
        return Ok(FlowError::TokenNotFound(token).into_redirect(&state.error_path));
    };

    if !confirmed {
        let target = normalize_return_url(&context.request.return_url);
        tracing::info!(
            token = %token,
            target = %target,
            "Confirmation declined"
        );
        return Ok(Redirect::to(&target).into_response());
    }

    match state.replay.redirect(&context.request).await {
        Ok(resp) => {
            tracing::info!(
                token = %token,
                page = %context.request.original_page_path,
                handler = %context.request.original_handler,
                "Confirmation accepted, replaying original request"
            );
            Ok(resp)
        }
        Err(e) => Ok(FlowError::ReplayFailure(token, e).into_redirect(&state.error_path)),
    }
}

/// GET /Error
pub async fn error_page() -> Html<&'static str> {
    Html(pages::ERROR_PAGE)
}

// ── Upstream helper ──────────────────────────────────────────

/// Park `request` and send the browser to the confirmation page.
///
/// Call from any handler that wants the user to confirm before it acts; the
/// handler is re-invoked with `?confirmed=true&handler=…` if they agree.
pub async fn request_confirmation(
    state: &ConfirmationState,
    request: OriginalRequest,
    metadata: DisplayMetadata,
) -> Result<Response, AppError> {
    let token = state
        .service
        .create_confirmation_with_default_ttl(request, metadata)
        .await?;
    Ok(Redirect::to(&state.service.confirmation_url(&token)).into_response())
}
