//! Confirmation domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Token ────────────────────────────────────────────────────

/// Opaque single-use identifier referencing a [`ConfirmationContext`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationToken(String);

impl ConfirmationToken {
    /// Wrap a raw token string (as received from a query or form field).
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ConfirmationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Request snapshot ─────────────────────────────────────────

/// Submitted form fields in the order they were received.
///
/// Repeated names (checkbox groups, multi-selects) are kept as separate
/// pairs. Nothing here normalizes or validates values; that belongs to the
/// resumed handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(Vec<(String, String)>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value submitted for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value submitted for `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.0
    }
}

impl From<Vec<(String, String)>> for FormData {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Snapshot of the inbound request that is waiting for confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalRequest {
    /// Page/route to resume, e.g. `/Forms/Submit`
    pub original_page_path: String,
    /// Handler on that page to invoke, e.g. `Submit`
    pub original_handler: String,
    /// Submitted fields, verbatim
    pub original_form_data: FormData,
    /// Where to send the user on decline. May be absolute; it is always
    /// reduced to path+query before use.
    pub return_url: String,
}

// ── Display text ─────────────────────────────────────────────

/// Text shown on the confirmation screen, captured when the confirmation is
/// created so it never has to be re-derived from the original request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMetadata {
    pub title: String,
    pub body: String,
    pub selection_required_message: String,
    pub confirm_label: String,
    pub decline_label: String,
}

impl Default for DisplayMetadata {
    fn default() -> Self {
        Self {
            title: "Are you sure you want to continue?".to_string(),
            body: "Please confirm whether you want to go ahead with this action.".to_string(),
            selection_required_message: "Select yes if you want to continue".to_string(),
            confirm_label: "Yes".to_string(),
            decline_label: "No".to_string(),
        }
    }
}

impl DisplayMetadata {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_selection_required_message(mut self, message: impl Into<String>) -> Self {
        self.selection_required_message = message.into();
        self
    }
}

// ── Context ──────────────────────────────────────────────────

/// Everything a store needs to park a request. The store mints the token.
#[derive(Debug, Clone)]
pub struct PendingConfirmation {
    pub request: OriginalRequest,
    pub metadata: DisplayMetadata,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Captured state of a pending confirmable action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationContext {
    pub token: ConfirmationToken,
    pub request: OriginalRequest,
    pub metadata: DisplayMetadata,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ConfirmationContext {
    pub fn from_pending(token: ConfirmationToken, pending: PendingConfirmation) -> Self {
        Self {
            token,
            request: pending.request,
            metadata: pending.metadata,
            created_at: pending.created_at,
            expires_at: pending.expires_at,
        }
    }

    /// A context is usable strictly before `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// ── Display model ────────────────────────────────────────────

/// Read-only projection of a [`ConfirmationContext`] for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayModel {
    pub token: ConfirmationToken,
    pub title: String,
    pub body: String,
    pub selection_required_message: String,
    pub confirm_label: String,
    pub decline_label: String,
    pub original_page_path: String,
    pub original_handler: String,
    /// Field-level message shown against the yes/no selection
    pub validation_error: Option<String>,
}

impl DisplayModel {
    pub fn from_context(context: &ConfirmationContext) -> Self {
        Self {
            token: context.token.clone(),
            title: context.metadata.title.clone(),
            body: context.metadata.body.clone(),
            selection_required_message: context.metadata.selection_required_message.clone(),
            confirm_label: context.metadata.confirm_label.clone(),
            decline_label: context.metadata.decline_label.clone(),
            original_page_path: context.request.original_page_path.clone(),
            original_handler: context.request.original_handler.clone(),
            validation_error: None,
        }
    }

    /// Attach the selection-required message to the choice field.
    pub fn with_selection_error(mut self) -> Self {
        self.validation_error = Some(self.selection_required_message.clone());
        self
    }
}
