//! HTTP-level tests for the confirmation flow.
//!
//! These drive the full router (flash middleware included) with in-memory
//! stores, so they need no external services.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use axum::body::Body;
use chrono::{DateTime, Duration, Utc};
use ea_confirmation::api::{create_app, ConfirmationState};
use ea_confirmation::confirm::flash::MemoryFlashStore;
use ea_confirmation::confirm::store::{ConfirmationStore, MemoryConfirmationStore};
use ea_confirmation::confirm::types::PendingConfirmation;
use ea_confirmation::{
    ConfirmationConfig, ConfirmationContext, ConfirmationToken, DisplayMetadata, OriginalRequest,
};
use http_body_util::BodyExt;
use hyper::{header, Request, StatusCode};
use tokio::sync::Barrier;
use tower::ServiceExt;

// ── Test app builder ───────────────────────────────────────────

fn build_test_app() -> (axum::Router, ConfirmationState) {
    let state = ConfirmationState::in_memory(&ConfirmationConfig::default())
        .expect("failed to build state");
    (create_app(state.clone()), state)
}

fn sample_request() -> OriginalRequest {
    OriginalRequest {
        original_page_path: "/Forms/Submit".into(),
        original_handler: "Submit".into(),
        original_form_data: vec![("name", "Alice")].into_iter().collect(),
        return_url: "/Forms/Edit".into(),
    }
}

async fn create_token(state: &ConfirmationState, request: OriginalRequest) -> ConfirmationToken {
    state
        .service
        .create_confirmation(
            request,
            DisplayMetadata::default().with_title("Submit your application?"),
            Duration::minutes(20),
        )
        .await
        .expect("failed to create confirmation")
}

// ── Request helpers ────────────────────────────────────────────

async fn get(app: &axum::Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_form(
    app: &axum::Router,
    uri: &str,
    body: &str,
    cookie: Option<&str>,
) -> axum::response::Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

fn location(resp: &axum::response::Response) -> &str {
    resp.headers()[header::LOCATION].to_str().unwrap()
}

/// `name=value` part of the flash Set-Cookie header.
fn flash_cookie_pair(resp: &axum::response::Response) -> String {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("ea_flash="))
        .and_then(|v| v.split(';').next())
        .expect("flash cookie")
        .to_string()
}

fn assert_error_redirect(resp: &axum::response::Response) {
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(resp), "/Error");
}

// ── Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_renders_confirmation_screen() {
    let (app, state) = build_test_app();
    let token = create_token(&state, sample_request()).await;

    let resp = get(&app, &format!("/Confirmation?token={token}")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let html = body_string(resp).await;
    assert!(html.contains("Submit your application?"));
    assert!(html.contains(&format!(r#"name="token" value="{token}""#)));
    assert!(html.contains(r#"name="Confirmed""#));
}

#[tokio::test]
async fn test_get_is_repeatable_while_pending() {
    let (app, state) = build_test_app();
    let token = create_token(&state, sample_request()).await;

    for _ in 0..3 {
        let resp = get(&app, &format!("/Confirmation?token={token}")).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_get_without_token_redirects_to_error() {
    let (app, _) = build_test_app();
    assert_error_redirect(&get(&app, "/Confirmation").await);
    assert_error_redirect(&get(&app, "/Confirmation?token=").await);
}

#[tokio::test]
async fn test_get_with_unknown_token_redirects_to_error() {
    let (app, _) = build_test_app();
    assert_error_redirect(&get(&app, "/Confirmation?token=never-issued").await);
}

#[tokio::test]
async fn test_post_without_token_redirects_to_error() {
    let (app, _) = build_test_app();
    assert_error_redirect(&post_form(&app, "/Confirmation", "Confirmed=true", None).await);
}

#[tokio::test]
async fn test_decline_redirects_to_return_url_and_consumes() {
    let (app, state) = build_test_app();
    let token = create_token(&state, sample_request()).await;

    let resp = post_form(
        &app,
        "/Confirmation",
        &format!("token={token}&Confirmed=false"),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/Forms/Edit");

    assert_error_redirect(&get(&app, &format!("/Confirmation?token={token}")).await);
    assert!(state.service.get_confirmation(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_decline_never_follows_cross_origin_return_url() {
    let (app, state) = build_test_app();
    let mut request = sample_request();
    request.return_url = "https://evil.example/x".into();
    let token = create_token(&state, request).await;

    let resp = post_form(
        &app,
        "/Confirmation",
        &format!("token={token}&Confirmed=false"),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/x");
}

#[tokio::test]
async fn test_confirm_issues_method_preserving_redirect() {
    let (app, state) = build_test_app();
    let token = create_token(&state, sample_request()).await;

    let resp = post_form(
        &app,
        "/Confirmation",
        &format!("token={token}&Confirmed=true"),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&resp),
        "/Forms/Submit?confirmed=true&handler=Submit"
    );
    let cookie = flash_cookie_pair(&resp);
    assert!(cookie.len() > "ea_flash=".len());

    assert_error_redirect(&get(&app, &format!("/Confirmation?token={token}")).await);
}

#[tokio::test]
async fn test_confirmed_form_reaches_next_request_only() {
    let (app, state) = build_test_app();
    let token = create_token(&state, sample_request()).await;

    let confirm = post_form(
        &app,
        "/Confirmation",
        &format!("token={token}&Confirmed=true"),
        None,
    )
    .await;
    let target = location(&confirm).to_string();
    let cookie = flash_cookie_pair(&confirm);
    // The browser re-POSTs the confirmation body to the replay target
    let replay_body = format!("token={token}&Confirmed=true");

    let resumed = post_form(&app, &target, &replay_body, Some(&cookie)).await;
    assert_eq!(resumed.status(), StatusCode::OK);
    let cleared = flash_cookie_pair(&resumed);
    assert_eq!(cleared, "ea_flash=");
    let html = body_string(resumed).await;
    assert!(html.contains("Application submitted"));
    assert!(html.contains("<dd>Alice</dd>"));

    // A second hop with the same (stale) cookie finds nothing
    let again = post_form(&app, &target, &replay_body, Some(&cookie)).await;
    assert_error_redirect(&again);
}

#[tokio::test]
async fn test_missing_selection_rerenders_and_keeps_token() {
    let (app, state) = build_test_app();
    let token = create_token(&state, sample_request()).await;

    for body in [format!("token={token}"), format!("token={token}&Confirmed=maybe")] {
        let resp = post_form(&app, "/Confirmation", &body, None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp).await;
        assert!(html.contains("Confirmed-error"));
        assert!(html.contains("Select yes if you want to continue"));
    }

    assert!(state.service.get_confirmation(&token).await.unwrap().is_some());

    let resp = post_form(
        &app,
        "/Confirmation",
        &format!("token={token}&Confirmed=TRUE"),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn test_token_in_query_is_accepted_on_post() {
    let (app, state) = build_test_app();
    let token = create_token(&state, sample_request()).await;

    let resp = post_form(
        &app,
        &format!("/Confirmation?token={token}"),
        "Confirmed=false",
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/Forms/Edit");
}

// ── Double submit ──────────────────────────────────────────────

/// Holds every `take` until `parties` callers have reached it, so racing
/// submissions are all past their lookup before any of them consumes.
struct ConsumeGatedStore {
    inner: MemoryConfirmationStore,
    gate: Barrier,
}

impl ConsumeGatedStore {
    fn new(parties: usize) -> Self {
        Self {
            inner: MemoryConfirmationStore::new(),
            gate: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl ConfirmationStore for ConsumeGatedStore {
    async fn put(&self, pending: PendingConfirmation) -> anyhow::Result<ConfirmationToken> {
        self.inner.put(pending).await
    }
    async fn get(&self, token: &ConfirmationToken) -> anyhow::Result<Option<ConfirmationContext>> {
        self.inner.get(token).await
    }
    async fn take(
        &self,
        token: &ConfirmationToken,
    ) -> anyhow::Result<Option<ConfirmationContext>> {
        self.gate.wait().await;
        self.inner.take(token).await
    }
    async fn remove(&self, token: &ConfirmationToken) -> anyhow::Result<()> {
        self.inner.remove(token).await
    }
    async fn purge_expired(&self, now: DateTime<Utc>) -> anyhow::Result<usize> {
        self.inner.purge_expired(now).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_confirm_and_decline_past_lookup_execute_exactly_once() {
    let state = ConfirmationState::new(
        &ConfirmationConfig::default(),
        Arc::new(ConsumeGatedStore::new(2)),
        Arc::new(MemoryFlashStore::default()),
    )
    .unwrap();
    let app = create_app(state.clone());
    let token = create_token(&state, sample_request()).await;

    let confirm = tokio::spawn({
        let app = app.clone();
        let body = format!("token={token}&Confirmed=true");
        async move { post_form(&app, "/Confirmation", &body, None).await }
    });
    let decline = tokio::spawn({
        let app = app.clone();
        let body = format!("token={token}&Confirmed=false");
        async move { post_form(&app, "/Confirmation", &body, None).await }
    });

    // Both submissions must reach the consume step for the gate to open
    let (a, b) = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        (confirm.await.unwrap(), decline.await.unwrap())
    })
    .await
    .expect("both submissions should pass the lookup");

    let replayed = a.status() == StatusCode::TEMPORARY_REDIRECT;
    let declined = b.status() == StatusCode::SEE_OTHER && location(&b) == "/Forms/Edit";
    assert!(replayed ^ declined, "exactly one of replay/decline must run");
    if replayed {
        assert_error_redirect(&b);
    } else {
        assert_error_redirect(&a);
    }
    assert!(state.service.get_confirmation(&token).await.unwrap().is_none());
}

// ── Malformed input ────────────────────────────────────────────

#[tokio::test]
async fn test_repeated_token_in_query_redirects_to_error() {
    let (app, state) = build_test_app();
    let token = create_token(&state, sample_request()).await;

    let resp = get(&app, &format!("/Confirmation?token={token}&token=other")).await;
    assert_error_redirect(&resp);
    assert!(state.service.get_confirmation(&token).await.unwrap().is_some());
}

#[tokio::test]
async fn test_repeated_choice_rerenders_and_keeps_token() {
    let (app, state) = build_test_app();
    let token = create_token(&state, sample_request()).await;

    let resp = post_form(
        &app,
        "/Confirmation",
        &format!("token={token}&Confirmed=true&Confirmed=false"),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("Confirmed-error"));
    assert!(!html.contains("Failed to deserialize"));

    assert!(state.service.get_confirmation(&token).await.unwrap().is_some());
}

#[tokio::test]
async fn test_unreadable_body_never_shows_framework_error() {
    let (app, state) = build_test_app();
    let token = create_token(&state, sample_request()).await;

    let send = |uri: String| {
        let app = app.clone();
        async move {
            app.oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from("Confirmed=true"))
                    .unwrap(),
            )
            .await
            .unwrap()
        }
    };

    // Token in the query: treated as no selection
    let resp = send(format!("/Confirmation?token={token}")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("Confirmed-error"));
    assert!(state.service.get_confirmation(&token).await.unwrap().is_some());

    // No token anywhere: generic error page
    assert_error_redirect(&send("/Confirmation".to_string()).await);
}

#[tokio::test]
async fn test_replay_failure_redirects_to_error_and_consumes() {
    let (app, state) = build_test_app();
    let mut request = sample_request();
    request.original_page_path = "https://evil.example/Forms/Submit".into();
    let token = create_token(&state, request).await;

    let resp = post_form(
        &app,
        "/Confirmation",
        &format!("token={token}&Confirmed=true"),
        None,
    )
    .await;
    assert_error_redirect(&resp);
    assert!(state.service.get_confirmation(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sample_form_round_trip() {
    let (app, _) = build_test_app();

    let edit = get(&app, "/Forms/Edit").await;
    assert_eq!(edit.status(), StatusCode::OK);

    let submit = post_form(&app, "/Forms/Submit", "name=Alice&email=a%40example.com", None).await;
    assert_eq!(submit.status(), StatusCode::SEE_OTHER);
    let confirmation_url = location(&submit).to_string();
    assert!(confirmation_url.starts_with("/Confirmation?token="));
    let token = confirmation_url.trim_start_matches("/Confirmation?token=").to_string();

    let page = get(&app, &confirmation_url).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_string(page)
        .await
        .contains("Are you sure you want to submit your application?"));

    let confirm = post_form(
        &app,
        "/Confirmation",
        &format!("token={token}&Confirmed=true"),
        None,
    )
    .await;
    assert_eq!(confirm.status(), StatusCode::TEMPORARY_REDIRECT);
    let cookie = flash_cookie_pair(&confirm);

    let resumed = post_form(
        &app,
        location(&confirm),
        &format!("token={token}&Confirmed=true"),
        Some(&cookie),
    )
    .await;
    assert_eq!(resumed.status(), StatusCode::OK);
    let html = body_string(resumed).await;
    assert!(html.contains("<dd>Alice</dd>"));
    assert!(html.contains("<dd>a@example.com</dd>"));
}

#[tokio::test]
async fn test_error_page_is_generic() {
    let (app, _) = build_test_app();
    let resp = get(&app, "/Error").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp)
        .await
        .contains("Sorry, there is a problem with the service"));
}

// ── Store failure ──────────────────────────────────────────────

struct UnavailableStore;

#[async_trait]
impl ConfirmationStore for UnavailableStore {
    async fn put(&self, _pending: PendingConfirmation) -> anyhow::Result<ConfirmationToken> {
        Err(anyhow!("store unavailable: secret-connection-string"))
    }
    async fn get(&self, _token: &ConfirmationToken) -> anyhow::Result<Option<ConfirmationContext>> {
        Err(anyhow!("store unavailable: secret-connection-string"))
    }
    async fn take(
        &self,
        _token: &ConfirmationToken,
    ) -> anyhow::Result<Option<ConfirmationContext>> {
        Err(anyhow!("store unavailable: secret-connection-string"))
    }
    async fn remove(&self, _token: &ConfirmationToken) -> anyhow::Result<()> {
        Err(anyhow!("store unavailable: secret-connection-string"))
    }
    async fn purge_expired(&self, _now: DateTime<Utc>) -> anyhow::Result<usize> {
        Err(anyhow!("store unavailable: secret-connection-string"))
    }
}

#[tokio::test]
async fn test_store_failure_is_fatal_and_hides_details() {
    let config = ConfirmationConfig::default();
    let state = ConfirmationState::new(
        &config,
        Arc::new(UnavailableStore),
        Arc::new(MemoryFlashStore::default()),
    )
    .unwrap();
    let app = create_app(state);

    let resp = get(&app, "/Confirmation?token=anything").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let html = body_string(resp).await;
    assert!(html.contains("Sorry, there is a problem with the service"));
    assert!(!html.contains("secret-connection-string"));
}
