//! Upstream gateway (carrier trunk) domain model.
//!
//! Gateways are a global aggregate shared by every tenant; the
//! configuration resolver enumerates them into the external SIP
//! profile and the dialplan resolver picks from them for outbound
//! PSTN calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gateway {
    pub id: Uuid,
    /// Globally unique gateway name; also the profile segment in
    /// `sofia/gateway/<name>/<number>` bridge strings.
    pub name: String,
    pub realm: String,
    pub username: String,
    pub password: String,
    pub proxy: Option<String>,
    pub register: bool,
    pub register_transport: String,
    pub dtmf_type: String,
    pub codec_prefs: String,
    /// Optional secure-media directive (e.g. `srtp`), emitted as a
    /// gateway variable when present.
    pub secure_media: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a gateway. Transport, DTMF, and codec
/// settings fall back to the usual carrier defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGateway {
    pub name: String,
    pub realm: String,
    pub username: String,
    pub password: String,
    pub proxy: Option<String>,
    pub register: Option<bool>,
    pub register_transport: Option<String>,
    pub dtmf_type: Option<String>,
    pub codec_prefs: Option<String>,
    pub secure_media: Option<String>,
}

/// Fields that can be updated on an existing gateway.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateGateway {
    pub realm: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub proxy: Option<Option<String>>,
    pub register: Option<bool>,
    pub register_transport: Option<String>,
    pub dtmf_type: Option<String>,
    pub codec_prefs: Option<String>,
    pub secure_media: Option<Option<String>>,
}

pub const DEFAULT_REGISTER_TRANSPORT: &str = "udp";
pub const DEFAULT_DTMF_TYPE: &str = "rfc2833";
pub const DEFAULT_CODEC_PREFS: &str = "PCMU,PCMA";
