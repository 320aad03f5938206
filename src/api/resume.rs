//! Query parameters a page handler sees when it is resumed after the user
//! confirmed.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResumeQuery {
    pub confirmed: Option<String>,
    pub handler: Option<String>,
}

impl ResumeQuery {
    /// `true` when this request is the replay of a confirmed `handler`.
    pub fn is_confirmed_for(&self, handler: &str) -> bool {
        let confirmed = self
            .confirmed
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        confirmed && self.handler.as_deref() == Some(handler)
    }
}
