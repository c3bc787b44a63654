//! Resolver configuration.

use std::time::Duration;

/// Credentials for the third-party caller-name lookup API.
#[derive(Debug, Clone)]
pub struct CnamCredentials {
    pub project_id: String,
    pub api_token: String,
    /// API host, e.g. `example.signalwire.com`.
    pub space_host: String,
}

/// Configuration for the lookup services.
///
/// Built once at startup and shared read-only across requests.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Gateway profile used when an internal caller dials an external
    /// number outside the NANP fast path.
    pub outbound_profile: String,
    /// Budget for a single data-store read; an elapsed budget turns
    /// into the standard error program.
    pub store_timeout: Duration,
    /// Budget for the CNAM lookup; an elapsed budget drops enrichment.
    pub cnam_timeout: Duration,
    /// Overall per-request budget, enforced at the HTTP edge.
    pub request_budget: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            outbound_profile: "external".into(),
            store_timeout: Duration::from_millis(500),
            cnam_timeout: Duration::from_secs(1),
            request_budget: Duration::from_secs(3),
        }
    }
}
