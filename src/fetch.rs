//! The HTTP seam used by the query tool.
//!
//! Everything that talks to the catalog goes through [`Fetch`], so the parsing
//! and download code never sees the HTTP client itself.

use crate::error::{Error, Result};
use std::time::Duration;

/// Status and body of a completed GET request.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking GET. Implementations return `Ok` for any completed exchange,
/// whatever the status, and `Error::Network` only for transport failures.
pub trait Fetch {
    fn get(&self, url: &str) -> Result<Response>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Builds the client; `timeout: None` keeps requests unbounded.
    pub fn new(timeout: Option<Duration>) -> Result<HttpFetcher> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("asassn_lc/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;
        Ok(HttpFetcher { client })
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<Response> {
        log::debug!("GET {}", url);
        let network_err = |e: reqwest::Error| Error::Network {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let response = self.client.get(url).send().map_err(network_err)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(network_err)?.to_vec();
        Ok(Response { status, body })
    }
}

/// GETs a page and fails with `Error::Network` on a non-success status.
pub fn get_page<F: Fetch + ?Sized>(fetcher: &F, url: &str) -> Result<String> {
    let response = fetcher.get(url)?;
    if !response.is_success() {
        return Err(Error::Network {
            url: url.to_string(),
            reason: format!("HTTP status {}", response.status),
        });
    }
    Ok(response.text())
}
