//! Identity provider return URL endpoint.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::proxy::identity::return_url;

/// Route of the return URL endpoint.
pub const RETURN_URL_ROUTE: &str = "/_proxy/tunnistamo-return-url";

#[derive(Debug, Deserialize)]
pub struct ReturnUrlQuery {
    pub lang: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReturnUrl {
    pub url: String,
}

/// `GET /_proxy/tunnistamo-return-url?lang=xx`
///
/// Without `lang`, the front page language is used.
pub async fn tunnistamo_return_url(
    State(state): State<AppState>,
    Query(query): Query<ReturnUrlQuery>,
) -> Response {
    let settings = state.rewrite.settings.load();
    let langcode = query
        .lang
        .as_deref()
        .unwrap_or(&state.front_page.langcode);

    match return_url(&settings, &state.rewrite.hostname, langcode) {
        Some(url) => Json(ReturnUrl { url }).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            format!("No site prefix configured for language {langcode}"),
        )
            .into_response(),
    }
}
