//! Decline-path target normalization.
//!
//! A stored `return_url` may be absolute. It is reduced to a same-origin
//! path+query so it can never be used as an open redirect.

use url::Url;

const LOCAL_BASE: &str = "http://localhost/";

/// Reduce `raw` to a same-origin `path[?query]`.
///
/// - `https://evil.example/x?y=1` → `/x?y=1`
/// - `//evil.example/x` → `/x`
/// - `/Forms/Edit` → `/Forms/Edit`
/// - opaque URLs (`javascript:`, `mailto:`) and unparseable input → `/`
pub fn normalize_return_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "/".to_string();
    }

    let parsed =
        Url::parse(raw).or_else(|_| Url::parse(LOCAL_BASE).and_then(|base| base.join(raw)));
    match parsed {
        Ok(url) if !url.cannot_be_a_base() => path_and_query(&url),
        _ => "/".to_string(),
    }
}

fn path_and_query(url: &Url) -> String {
    // A path of `//host/..` (or `/\host`, which non-special schemes keep
    // verbatim) would be read by the browser as protocol-relative.
    let mut out = format!("/{}", url.path().trim_start_matches(['/', '\\']));
    if let Some(query) = url.query() {
        out.push('?');
        out.push_str(query);
    }
    out
}
