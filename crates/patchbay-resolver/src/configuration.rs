//! The configuration resolver: serves the SIP profile file the
//! switch loads at startup.
//!
//! Exactly two profiles are emitted: the static `internal` profile
//! tenant phones register to, and the `external` profile populated
//! from the global gateway pool. Any other requested key gets the
//! "result not found" document.

use patchbay_core::models::gateway::Gateway;
use patchbay_core::repository::GatewayRepository;
use tracing::{debug, error};

use crate::config::ResolverConfig;
use crate::error::with_store_timeout;
use crate::vars::SwitchVars;
use crate::xml::{DocWriter, NOT_FOUND_DOCUMENT};

/// The only configuration key this resolver recognizes.
pub const SOFIA_CONFIG_KEY: &str = "sofia.conf";

pub const INTERNAL_PROFILE: &str = "internal";
pub const EXTERNAL_PROFILE: &str = "external";

/// Settings for the profile tenant phones register to.
const INTERNAL_SETTINGS: &[(&str, &str)] = &[
    ("context", "default"),
    ("dialplan", "XML"),
    ("sip-port", "5060"),
    ("sip-ip", "$${local_ip_v4}"),
    ("rtp-ip", "$${local_ip_v4}"),
    ("rtp-timer-name", "soft"),
    ("dtmf-duration", "2000"),
    ("rfc2833-pt", "101"),
    ("inbound-codec-prefs", "$${global_codec_prefs}"),
    ("outbound-codec-prefs", "$${global_codec_prefs}"),
    ("inbound-codec-negotiation", "generous"),
    ("auth-calls", "true"),
    ("challenge-realm", "auto_from"),
    ("nonce-ttl", "60"),
    ("apply-nat-acl", "nat.auto"),
    ("local-network-acl", "localnet.auto"),
    ("manage-presence", "true"),
    ("presence-hosts", "$${domain}"),
    ("hold-music", "$${hold_music}"),
    ("record-path", "$${recordings_dir}"),
];

/// Safe defaults for the carrier-facing profile; valid even with an
/// empty gateway list.
const EXTERNAL_SETTINGS: &[(&str, &str)] = &[
    ("context", "public"),
    ("dialplan", "XML"),
    ("sip-port", "5080"),
    ("sip-ip", "$${local_ip_v4}"),
    ("rtp-ip", "$${local_ip_v4}"),
    ("ext-sip-ip", "auto-nat"),
    ("ext-rtp-ip", "auto-nat"),
    ("rtp-timer-name", "soft"),
    ("dtmf-duration", "2000"),
    ("rfc2833-pt", "101"),
    ("inbound-codec-prefs", "$${global_codec_prefs}"),
    ("outbound-codec-prefs", "$${global_codec_prefs}"),
    ("auth-calls", "false"),
    ("manage-presence", "false"),
];

pub struct ConfigurationService<G> {
    gateways: G,
    config: ResolverConfig,
}

impl<G: GatewayRepository> ConfigurationService<G> {
    pub fn new(gateways: G, config: ResolverConfig) -> Self {
        Self { gateways, config }
    }

    /// Resolve one configuration request into a finished XML
    /// document. Unknown keys and internal failures both produce the
    /// "not found" document.
    pub async fn resolve(&self, vars: &SwitchVars) -> String {
        let Some(key) = vars.config_key() else {
            debug!("configuration request without key");
            return NOT_FOUND_DOCUMENT.to_string();
        };
        if key != SOFIA_CONFIG_KEY {
            debug!(key, "unrecognized configuration key");
            return NOT_FOUND_DOCUMENT.to_string();
        }

        let gateways = match with_store_timeout(
            self.config.store_timeout,
            "list_gateways",
            self.gateways.list(),
        )
        .await
        {
            Ok(gateways) => gateways,
            Err(e) => {
                error!(error = %e, "gateway enumeration failed");
                return NOT_FOUND_DOCUMENT.to_string();
            }
        };

        render_sofia_config(&gateways)
    }
}

fn render_sofia_config(gateways: &[Gateway]) -> String {
    match build_sofia_config(gateways) {
        Ok(doc) => doc,
        Err(e) => {
            error!(error = %e, "configuration document emission failed");
            NOT_FOUND_DOCUMENT.to_string()
        }
    }
}

fn build_sofia_config(gateways: &[Gateway]) -> Result<String, quick_xml::Error> {
    let mut w = DocWriter::new();
    w.start("document", &[("type", "freeswitch/xml")])?;
    w.start("section", &[("name", "configuration")])?;
    w.start(
        "configuration",
        &[("name", SOFIA_CONFIG_KEY), ("description", "sofia Endpoint")],
    )?;
    w.start("profiles", &[])?;

    // Internal profile: fixed settings, no gateways.
    w.start("profile", &[("name", INTERNAL_PROFILE)])?;
    w.start("settings", &[])?;
    for &(name, value) in INTERNAL_SETTINGS {
        w.empty("param", &[("name", name), ("value", value)])?;
    }
    w.end("settings")?;
    w.end("profile")?;

    // External profile: one gateway element per pool record.
    w.start("profile", &[("name", EXTERNAL_PROFILE)])?;
    w.start("gateways", &[])?;
    for gateway in gateways {
        write_gateway(&mut w, gateway)?;
    }
    w.end("gateways")?;
    w.start("settings", &[])?;
    for &(name, value) in EXTERNAL_SETTINGS {
        w.empty("param", &[("name", name), ("value", value)])?;
    }
    w.end("settings")?;
    w.end("profile")?;

    w.end("profiles")?;
    w.end("configuration")?;
    w.end("section")?;
    w.end("document")?;
    w.finish()
}

fn write_gateway(w: &mut DocWriter, gateway: &Gateway) -> Result<(), quick_xml::Error> {
    w.start("gateway", &[("name", &gateway.name)])?;
    w.empty("param", &[("name", "realm"), ("value", &gateway.realm)])?;
    w.empty(
        "param",
        &[("name", "username"), ("value", &gateway.username)],
    )?;
    w.empty(
        "param",
        &[("name", "password"), ("value", &gateway.password)],
    )?;
    if let Some(proxy) = &gateway.proxy {
        w.empty("param", &[("name", "proxy"), ("value", proxy)])?;
    }
    let register = if gateway.register { "true" } else { "false" };
    w.empty("param", &[("name", "register"), ("value", register)])?;
    w.empty(
        "param",
        &[
            ("name", "register-transport"),
            ("value", &gateway.register_transport),
        ],
    )?;
    w.empty(
        "param",
        &[("name", "dtmf-type"), ("value", &gateway.dtmf_type)],
    )?;
    w.empty(
        "param",
        &[("name", "codec-prefs"), ("value", &gateway.codec_prefs)],
    )?;
    if let Some(secure) = &gateway.secure_media {
        w.start("variables", &[])?;
        w.empty(
            "variable",
            &[("name", "rtp_secure_media"), ("value", secure)],
        )?;
        w.end("variables")?;
    }
    w.end("gateway")?;
    Ok(())
}
