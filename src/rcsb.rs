use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::StructureId;
use crate::error::ProtError;
use crate::store::structure_file_name;

pub trait RcsbClient: Send + Sync {
    fn download_structure(
        &self,
        id: &StructureId,
        compressed: bool,
        destination: &Path,
    ) -> Result<(), ProtError>;
}

#[derive(Clone)]
pub struct RcsbHttpClient {
    client: Client,
    base_url: String,
}

impl RcsbHttpClient {
    pub fn new(base_url: &str) -> Result<Self, ProtError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("protstruct/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ProtError::RcsbHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| ProtError::RcsbHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn structure_url(&self, id: &StructureId, compressed: bool) -> String {
        format!("{}/{}", self.base_url, structure_file_name(id, compressed))
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, ProtError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "RCSB request failed".to_string());
        Err(ProtError::RcsbStatus { status, message })
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<reqwest::blocking::Response, ProtError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        tracing::debug!(status, attempt, "retrying RCSB request");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        tracing::debug!(error = %err, attempt, "retrying RCSB request");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(ProtError::RcsbHttp(err.to_string()));
                }
            }
        }
    }
}

impl RcsbClient for RcsbHttpClient {
    fn download_structure(
        &self,
        id: &StructureId,
        compressed: bool,
        destination: &Path,
    ) -> Result<(), ProtError> {
        let url = self.structure_url(id, compressed);
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let mut response = Self::handle_status(response)?;
        let mut file =
            File::create(destination).map_err(|err| ProtError::Filesystem(err.to_string()))?;
        // a broken transfer is a fetch failure, not a local disk problem
        std::io::copy(&mut response, &mut file)
            .map_err(|err| ProtError::RcsbHttp(err.to_string()))?;
        Ok(())
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_urls() {
        let client = RcsbHttpClient::new("https://files.rcsb.org/download/").unwrap();
        let id: StructureId = "12AS".parse().unwrap();
        assert_eq!(
            client.structure_url(&id, false),
            "https://files.rcsb.org/download/12as.pdb"
        );
        assert_eq!(
            client.structure_url(&id, true),
            "https://files.rcsb.org/download/12as.pdb.gz"
        );
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
    }
}
