use gloo_net::http::Request;
use jamroom_protocol as proto;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(gloo_net::Error),
    #[error("search returned HTTP {status}")]
    Status { status: u16 },
    #[error("search response has unexpected shape: {0}")]
    Decode(#[from] serde_json::Error),
}

pub async fn fetch(url: &str) -> Result<proto::SearchResponse, SearchError> {
    let response = Request::get(url)
        .send()
        .await
        .map_err(SearchError::Request)?;
    if !response.ok() {
        return Err(SearchError::Status {
            status: response.status(),
        });
    }
    let body = response.text().await.map_err(SearchError::Request)?;
    decode(&body)
}

pub fn decode(body: &str) -> Result<proto::SearchResponse, SearchError> {
    Ok(serde_json::from_str(body)?)
}
