//! Caller-name (CNAM) enrichment client.
//!
//! Best effort by contract: timeouts, non-2xx responses, transport
//! errors, and missing fields all resolve to `None`. A failed lookup
//! never fails the call.

use std::time::Duration;

use patchbay_core::models::did::canonical_did;
use serde::Deserialize;
use tracing::debug;

use crate::config::CnamCredentials;

/// A successful caller-name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnamRecord {
    pub national_number_formatted: String,
    pub caller_id: String,
    pub location: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    national_number_formatted: Option<String>,
    location: Option<String>,
    cnam: Option<CnamPayload>,
}

#[derive(Debug, Deserialize)]
struct CnamPayload {
    caller_id: Option<String>,
}

/// Outbound HTTP client for the lookup API. Constructed once at
/// startup; missing credentials disable enrichment entirely.
#[derive(Debug, Clone)]
pub struct CnamClient {
    http: reqwest::Client,
    credentials: Option<CnamCredentials>,
}

impl CnamClient {
    pub fn new(credentials: Option<CnamCredentials>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { http, credentials }
    }

    /// A client that always returns `None`.
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(1))
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    /// Look up the caller name for a number. Ten-digit input gains a
    /// leading `+1` before the request.
    pub async fn lookup(&self, number: &str) -> Option<CnamRecord> {
        let creds = self.credentials.as_ref()?;
        let e164 = canonical_did(number);
        let url = format!(
            "https://{}/api/relay/rest/lookup/phone_number/{}?include=cnam",
            creds.space_host, e164
        );

        let response = match self
            .http
            .get(&url)
            .basic_auth(&creds.project_id, Some(&creds.api_token))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                debug!(number = %e164, error = %e, "cnam lookup failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(number = %e164, status = %response.status(), "cnam lookup rejected");
            return None;
        }

        let body: LookupResponse = response.json().await.ok()?;
        Some(CnamRecord {
            national_number_formatted: body.national_number_formatted?,
            caller_id: body.cnam?.caller_id?,
            location: body.location?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_client_resolves_to_none() {
        let client = CnamClient::disabled();
        assert!(!client.is_enabled());
        assert_eq!(client.lookup("5125551234").await, None);
    }
}
