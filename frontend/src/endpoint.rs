//! Server URLs, derived from the address the page was loaded from.

use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("page URL does not parse: {0}")]
    Parse(#[from] url::ParseError),
    #[error("cannot use scheme {0:?} for a websocket")]
    Scheme(String),
}

pub fn page_url() -> Result<Url, EndpointError> {
    let href = {
        let window = web_sys::window().expect("must have JS window");
        let document = window.document().expect("must have JS document");
        let location = document.location().expect("must have JS document.location");
        location
            .href()
            .expect("must have JS document.location.href")
    };
    Ok(Url::parse(&href)?)
}

/// `ws://<host>/socket` (or `wss://` for pages served over https).
pub fn socket_url(page: &Url) -> Result<Url, EndpointError> {
    let scheme = match page.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(EndpointError::Scheme(other.to_string())),
    };
    let mut url = page.join("/socket")?;
    url.set_scheme(scheme)
        .map_err(|()| EndpointError::Scheme(scheme.to_string()))?;
    Ok(url)
}

/// `<origin>/api/search?q=<query>`, with the query percent-encoded.
pub fn search_url(page: &Url, query: &str) -> Result<Url, EndpointError> {
    let mut url = page.join("/api/search")?;
    url.query_pairs_mut().clear().append_pair("q", query);
    Ok(url)
}
