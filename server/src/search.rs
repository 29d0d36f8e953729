use crate::app::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jamroom_protocol as proto;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

#[derive(Deserialize, Debug)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    if params.q.trim().is_empty() {
        return Json(proto::SearchResponse::empty()).into_response();
    }
    match state.upstream.search(&params.q).await {
        Ok(body) => Json(body).into_response(),
        Err(error) => {
            error!(message = "search failed", query = %params.q, %error);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response()
        }
    }
}
