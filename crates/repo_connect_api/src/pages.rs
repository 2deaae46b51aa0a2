//! Setup landing pages
//!
//! The install callback redirects the browser here. Every value taken from
//! the query string is HTML-escaped before rendering.

use axum::{
    extract::{rejection::QueryRejection, Query},
    http::{header, HeaderMap},
    response::{AppendHeaders, Html, IntoResponse, Response},
};
use repo_connect_core::SECRET_NAME;

use crate::{handlers::SETUP_PATH, models::SetupPageQuery, CALLBACK_COOKIE};

#[cfg(test)]
#[path = "pages_tests.rs"]
mod tests;

const GENERIC_ERROR: &str = "Something went wrong.";

const NO_ERROR_HINT: &str = "If you were redirected here after installing the GitHub App, something may have gone wrong. Check the URL for an error parameter.";

const DEFAULT_REPO_LABEL: &str = "your repository";

/// GET /setup
pub async fn setup_page(
    headers: HeaderMap,
    query: Result<Query<SetupPageQuery>, QueryRejection>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let via_callback = arrived_via_callback(&headers);

    let (title, message) = match query.error.as_deref() {
        Some(tag) => ("Setup issue", error_message(tag)),
        None => ("Setup", NO_ERROR_HINT),
    };

    let body = format!("<p>{}</p>", escape_html(message));
    render(title, &body, via_callback)
}

/// GET /setup/complete
pub async fn setup_complete_page(
    headers: HeaderMap,
    query: Result<Query<SetupPageQuery>, QueryRejection>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let via_callback = arrived_via_callback(&headers);

    let repo = query
        .repo
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or(DEFAULT_REPO_LABEL);

    let body = format!(
        "<p><strong>{}</strong> is now connected. The <code>{SECRET_NAME}</code> secret has been set in GitHub Actions, so your workflows can use it without any extra setup.</p>",
        escape_html(repo)
    );
    render("Repository connected", &body, via_callback)
}

/// Message shown for a callback error tag.
pub fn error_message(tag: &str) -> &'static str {
    match tag {
        "invalid_callback" => "Invalid or missing installation data. Please run perceo init again and use the install link from the CLI.",
        "no_key" => "No API key found for this project. Make sure you've run perceo init and have a github-actions key set up.",
        "github_error" => "We couldn't set the repository secret. The GitHub App may lack access or permissions.",
        _ => GENERIC_ERROR,
    }
}

/// True when the request carries the marker cookie set by the install callback.
pub fn arrived_via_callback(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .any(|(name, _)| name == CALLBACK_COOKIE)
}

fn render(title: &str, body: &str, via_callback: bool) -> Response {
    let html = Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<main>\n<h1>{title}</h1>\n{body}\n<a href=\"/\">Back to home</a>\n</main>\n</body>\n</html>\n",
        title = escape_html(title),
    ));

    if !via_callback {
        return html.into_response();
    }

    // The marker is only meant for the first render after the callback.
    tracing::debug!("Setup page reached from the install callback");
    let expire = format!("{CALLBACK_COOKIE}=; Max-Age=0; HttpOnly; Path={SETUP_PATH}; SameSite=Lax");
    (AppendHeaders([(header::SET_COOKIE, expire)]), html).into_response()
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
