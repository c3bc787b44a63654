//! SIP client domain model.

use serde::{Deserialize, Serialize};

/// A registering SIP endpoint (a phone) within a tenant.
///
/// `user_id` is the extension number the endpoint registers and is
/// dialed as; it is unique within the tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SipClient {
    pub user_id: String,
    /// SIP registration password, served verbatim in directory lookups.
    pub password: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub enable_voicemail: bool,
    pub voicemail_pin: Option<String>,
    pub voicemail_email: Option<String>,
    /// Seconds to ring before the no-answer action runs. `None` means
    /// the switch default of 30 seconds.
    pub no_answer_timeout: Option<u32>,
    /// Caller-ID name presented on calls between tenant extensions.
    pub local_caller_id_name: Option<String>,
}

impl SipClient {
    pub const DEFAULT_NO_ANSWER_TIMEOUT: u32 = 30;

    pub fn call_timeout(&self) -> u32 {
        self.no_answer_timeout
            .unwrap_or(Self::DEFAULT_NO_ANSWER_TIMEOUT)
    }
}
