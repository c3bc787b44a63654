//! DID (public phone number) domain model.

use serde::{Deserialize, Serialize};

/// Where an inbound DID call is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingType {
    Extension,
    Group,
    Ivr,
    ExternalNumber,
    Custom,
}

impl RoutingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingType::Extension => "extension",
            RoutingType::Group => "group",
            RoutingType::Ivr => "ivr",
            RoutingType::ExternalNumber => "external_number",
            RoutingType::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "extension" => Some(RoutingType::Extension),
            "group" => Some(RoutingType::Group),
            "ivr" => Some(RoutingType::Ivr),
            "external_number" => Some(RoutingType::ExternalNumber),
            "custom" => Some(RoutingType::Custom),
            _ => None,
        }
    }
}

/// Failover routing type that carries `voicemail_<box>` targets.
pub const FAILOVER_DIALPLAN_EXTENSION: &str = "dialplan_extension";

/// Prefix marking a failover target as a voicemail deposit.
pub const VOICEMAIL_TARGET_PREFIX: &str = "voicemail_";

/// Routing target used when a deleted extension or group leaves a DID
/// dangling.
pub const UNASSIGNED_TARGET: &str = "unassigned";

/// A public phone number owned by a tenant.
///
/// `did_number` is stored canonically: `+1` followed by ten digits for
/// North-American numbers. Lookups normalize 10-digit input to that
/// form before comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Did {
    pub did_number: String,
    #[serde(default)]
    pub active: bool,
    pub routing_type: RoutingType,
    pub routing_target: String,
    pub failover_routing_type: Option<String>,
    pub failover_routing_target: Option<String>,
    /// PIN for the DID mailbox, served by directory voicemail lookups.
    pub voicemail_pin: Option<String>,
}

impl Did {
    /// Mailbox id carried by a `voicemail_<box>` failover target, if any.
    pub fn failover_voicemail_box(&self) -> Option<&str> {
        match self.failover_routing_type.as_deref() {
            Some(FAILOVER_DIALPLAN_EXTENSION) => self
                .failover_routing_target
                .as_deref()
                .and_then(|t| t.strip_prefix(VOICEMAIL_TARGET_PREFIX)),
            _ => None,
        }
    }
}

/// Canonical storage form of a dialed or provisioned number.
///
/// Ten NANP digits gain a `+1`; eleven digits starting with `1` gain a
/// `+`. Anything else is kept as given so non-NANP numbers pass
/// through untouched.
pub fn canonical_did(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => format!("+1{digits}"),
        11 if digits.starts_with('1') => format!("+{digits}"),
        _ => raw.trim().to_string(),
    }
}
