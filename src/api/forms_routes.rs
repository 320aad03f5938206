//! Sample application form that asks for confirmation before submitting.
//!
//! - `GET  /Forms/Edit`   - blank application form
//! - `POST /Forms/Submit` - first pass parks the submission and redirects to
//!   the confirmation page; the confirmed replay
//!   (`?confirmed=true&handler=Submit`) completes it with the original fields.

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Query, State,
    },
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Router,
};

use super::confirmation_routes::request_confirmation;
use super::error::AppError;
use super::flash::ConfirmedForm;
use super::resume::ResumeQuery;
use super::ConfirmationState;
use crate::confirm::error::ConfirmationError;
use crate::confirm::types::{DisplayMetadata, OriginalRequest};

pub const EDIT_PATH: &str = "/Forms/Edit";
pub const SUBMIT_PATH: &str = "/Forms/Submit";
pub const SUBMIT_HANDLER: &str = "Submit";

pub fn create_forms_router(state: ConfirmationState) -> Router {
    Router::new()
        .route(EDIT_PATH, get(edit_application))
        .route(SUBMIT_PATH, post(submit_application))
        .with_state(state)
}

/// GET /Forms/Edit
async fn edit_application(State(state): State<ConfirmationState>) -> Result<Response, AppError> {
    let html = state.pages.application_form(SUBMIT_PATH)?;
    Ok(Html(html).into_response())
}

/// POST /Forms/Submit
async fn submit_application(
    State(state): State<ConfirmationState>,
    resume: Result<Query<ResumeQuery>, QueryRejection>,
    confirmed: Option<Extension<ConfirmedForm>>,
    fields: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<Response, AppError> {
    // A garbled resume query is treated as a first submission.
    let resume = resume.map(|Query(q)| q).unwrap_or_default();
    if resume.is_confirmed_for(SUBMIT_HANDLER) {
        // The body of a replayed request is the confirmation form, not the
        // application; the original fields arrive through the flash.
        let Some(Extension(ConfirmedForm(original))) = confirmed else {
            tracing::warn!("Confirmed submit arrived without its original form data");
            return Ok(Redirect::to(&state.error_path).into_response());
        };
        tracing::info!(fields = original.len(), "Application submitted");
        let html = state.pages.application_submitted(&original)?;
        return Ok(Html(html).into_response());
    }

    let Form(fields) =
        fields.map_err(|e| ConfirmationError::InvalidRequest(format!("unreadable form: {e}")))?;
    let request = OriginalRequest {
        original_page_path: SUBMIT_PATH.to_string(),
        original_handler: SUBMIT_HANDLER.to_string(),
        original_form_data: fields.into(),
        return_url: EDIT_PATH.to_string(),
    };
    let metadata = DisplayMetadata::default()
        .with_title("Are you sure you want to submit your application?")
        .with_body("You will not be able to change your answers after you submit.")
        .with_selection_required_message("Select yes if you want to submit your application");

    request_confirmation(&state, request, metadata).await
}
