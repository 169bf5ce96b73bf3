//! Request language negotiation.

use axum::http::header::ACCEPT_LANGUAGE;
use axum::http::HeaderMap;
use keystone_core::messages::MessageService;

/// Explicit language override header, checked before `Accept-Language`.
pub const LANGUAGE_HEADER: &str = "x-custom-lang";

/// The supported language a request asked for, or the default.
pub fn request_language(messages: &MessageService, headers: &HeaderMap) -> String {
    let candidates: Vec<&str> = [headers.get(LANGUAGE_HEADER), headers.get(ACCEPT_LANGUAGE)]
        .into_iter()
        .flatten()
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect();

    if candidates.is_empty() {
        return messages.default_language().to_string();
    }
    messages.negotiate(Some(&candidates.join(",")))
}
