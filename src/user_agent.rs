//! User-Agent string shared by listing and file requests.

/// Default User-Agent for all requests (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("mirror/{version} (directory-listing-mirror)")
}
