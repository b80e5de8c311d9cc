//! Spreadsheet CSV retrieval
//!
//! Thin HTTP collaborator: builds the CSV export URL for one sheet tab and
//! fetches it with retry and exponential backoff. Any failure surviving
//! the retries is fatal to the import pass that requested it.

use std::time::Duration;

use i7card_common::config::export_url;
use i7card_common::{Error, Result};
use tokio::time::sleep;
use tracing::{debug, warn};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;

/// HTTP client for the spreadsheet host
pub struct SheetClient {
    client: reqwest::Client,
    max_retries: u32,
    initial_backoff_ms: u64,
}

impl SheetClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self {
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
        })
    }

    /// Fetch the CSV export of one sheet tab
    pub async fn fetch_csv(&self, sheet_id: &str, gid: &str) -> Result<String> {
        let url = export_url(sheet_id, gid);
        debug!(%url, "Fetching sheet CSV");

        let body = self.get_text_with_retry(&url).await?;

        if is_html_body(&body) {
            return Err(Error::Fetch(format!("non-CSV response from {url}")));
        }
        Ok(body)
    }

    /// Download raw bytes from an arbitrary URL (used by the image tool)
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let mut attempts = 0;
        loop {
            match self.get_bytes(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempts < self.max_retries => {
                    attempts += 1;
                    let backoff = self.initial_backoff_ms * 2u64.pow(attempts - 1);
                    warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_text_with_retry(&self, url: &str) -> Result<String> {
        let mut attempts = 0;
        loop {
            match self.get_text(url).await {
                Ok(text) => return Ok(text),
                Err(e) if attempts < self.max_retries => {
                    attempts += 1;
                    let backoff = self.initial_backoff_ms * 2u64.pow(attempts - 1);
                    warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("GET {url} failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Fetch(format!("non-success status from {url}: {e}")))?
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("reading body from {url}: {e}")))
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("GET {url} failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Fetch(format!("non-success status from {url}: {e}")))?
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("reading body from {url}: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// The host answers sign-in and error pages with 200 + HTML; a body that
/// opens with a tag is never the requested CSV.
fn is_html_body(body: &str) -> bool {
    body.trim_start().starts_with('<')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_bodies_are_rejected_as_non_csv() {
        assert!(is_html_body("<!DOCTYPE html><html><body>Sign in</body></html>"));
        assert!(is_html_body("\n  <html><head></head></html>"));
    }

    #[test]
    fn csv_bodies_pass_the_html_check() {
        assert!(!is_html_body("ID,cardname,attribute\n101,Alpha,3\n"));
        assert!(!is_html_body(""));
        // A quoted field containing markup is still CSV
        assert!(!is_html_body("ID,comment\n101,\"<b>bold</b>\"\n"));
    }
}
