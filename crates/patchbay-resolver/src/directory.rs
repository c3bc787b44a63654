//! The directory resolver: answers "who is this SIP user" lookups,
//! including voicemail-only pseudo-users for group and DID mailboxes.

use patchbay_core::models::did::canonical_did;
use patchbay_core::models::sip_client::SipClient;
use patchbay_core::repository::RoutingStore;
use tracing::{debug, error};

use crate::config::ResolverConfig;
use crate::error::{ResolverResult, with_store_timeout};
use crate::vars::SwitchVars;
use crate::xml::{DocWriter, EMPTY_DOCUMENT};

/// Password marker for mailbox pseudo-users that must never register.
pub const NO_SIP_AUTH: &str = "NO_SIP_AUTH";

/// Registration dial-string resolved by the switch at call time.
const DIAL_STRING: &str =
    "{presence_id=${dialed_user}@${dialed_domain}}${sofia_contact(${dialed_user}@${dialed_domain})}";

pub struct DirectoryService<S> {
    store: S,
    config: ResolverConfig,
}

impl<S: RoutingStore> DirectoryService<S> {
    pub fn new(store: S, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    /// Resolve one directory request into a finished XML document.
    /// Anything that fails internally degrades to the empty document,
    /// which the switch treats as "unknown user".
    pub async fn resolve(&self, vars: &SwitchVars) -> String {
        match self.lookup(vars).await {
            Ok(doc) => doc,
            Err(e) => {
                error!(error = %e, user = ?vars.directory_user(), "directory lookup failed");
                EMPTY_DOCUMENT.to_string()
            }
        }
    }

    async fn lookup(&self, vars: &SwitchVars) -> ResolverResult<String> {
        let (Some(domain), Some(user)) = (vars.domain(), vars.directory_user()) else {
            return Ok(EMPTY_DOCUMENT.to_string());
        };
        if let Some(action) = vars.action() {
            debug!(action, user, "directory sub-action");
        }

        let tenant = with_store_timeout(
            self.config.store_timeout,
            "tenant_by_domain",
            self.store.tenant_by_domain(domain),
        )
        .await?;
        let Some(tenant) = tenant else {
            return Ok(EMPTY_DOCUMENT.to_string());
        };
        let domain = tenant.domain_name.as_str();

        // 1. A real SIP client.
        if let Some(client) = tenant.sip_client(user) {
            return Ok(render_sip_user(domain, client));
        }

        // 2. A group mailbox.
        if let Some(group) = tenant
            .groups
            .iter()
            .find(|g| g.voicemail_box_id.as_deref() == Some(user))
        {
            let box_id = group.voicemail_box_id.as_deref().unwrap_or(user);
            return Ok(render_mailbox_user(
                domain,
                user,
                box_id,
                group.voicemail_pin.as_deref(),
            ));
        }

        // 3. A DID mailbox, addressed by DID number or by box id.
        let canonical = canonical_did(user);
        if let Some(did) = tenant.dids.iter().find(|d| {
            d.failover_voicemail_box()
                .is_some_and(|b| b == user || d.did_number == canonical)
        }) {
            let box_id = did.failover_voicemail_box().unwrap_or(user);
            return Ok(render_mailbox_user(
                domain,
                user,
                box_id,
                did.voicemail_pin.as_deref(),
            ));
        }

        Ok(EMPTY_DOCUMENT.to_string())
    }
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

fn render_or_empty(build: impl FnOnce() -> Result<String, quick_xml::Error>) -> String {
    match build() {
        Ok(doc) => doc,
        Err(e) => {
            error!(error = %e, "directory document emission failed");
            EMPTY_DOCUMENT.to_string()
        }
    }
}

fn render_sip_user(domain: &str, client: &SipClient) -> String {
    render_or_empty(|| {
        let caller_id_name = client
            .local_caller_id_name
            .as_deref()
            .or(client.display_name.as_deref())
            .unwrap_or(&client.user_id);

        let mut w = DocWriter::new();
        w.start("document", &[("type", "freeswitch/xml")])?;
        w.start("section", &[("name", "directory")])?;
        w.start("domain", &[("name", domain)])?;
        w.start("user", &[("id", &client.user_id)])?;

        w.start("params", &[])?;
        w.empty(
            "param",
            &[("name", "password"), ("value", &client.password)],
        )?;
        if client.enable_voicemail {
            if let Some(pin) = &client.voicemail_pin {
                w.empty("param", &[("name", "vm-password"), ("value", pin)])?;
            }
            if let Some(email) = &client.voicemail_email {
                w.empty("param", &[("name", "vm-mailto"), ("value", email)])?;
                w.empty("param", &[("name", "vm-email-all-messages"), ("value", "true")])?;
            }
        }
        w.empty("param", &[("name", "dial-string"), ("value", DIAL_STRING)])?;
        w.end("params")?;

        w.start("variables", &[])?;
        w.empty(
            "variable",
            &[("name", "user_context"), ("value", "default")],
        )?;
        w.empty("variable", &[("name", "domain_name"), ("value", domain)])?;
        w.empty(
            "variable",
            &[("name", "effective_caller_id_name"), ("value", caller_id_name)],
        )?;
        w.empty(
            "variable",
            &[("name", "effective_caller_id_number"), ("value", &client.user_id)],
        )?;
        w.end("variables")?;

        w.end("user")?;
        w.end("domain")?;
        w.end("section")?;
        w.end("document")?;
        w.finish()
    })
}

/// Voicemail-only pseudo-user for a group or DID mailbox. Carries the
/// mailbox attribute and a password that can never authenticate a
/// registration.
fn render_mailbox_user(domain: &str, user: &str, box_id: &str, pin: Option<&str>) -> String {
    render_or_empty(|| {
        let mut w = DocWriter::new();
        w.start("document", &[("type", "freeswitch/xml")])?;
        w.start("section", &[("name", "directory")])?;
        w.start("domain", &[("name", domain)])?;
        w.start("user", &[("id", user), ("mailbox", box_id)])?;

        w.start("params", &[])?;
        w.empty("param", &[("name", "password"), ("value", NO_SIP_AUTH)])?;
        if let Some(pin) = pin {
            w.empty("param", &[("name", "vm-password"), ("value", pin)])?;
        }
        w.end("params")?;

        w.start("variables", &[])?;
        w.empty(
            "variable",
            &[("name", "user_context"), ("value", "default")],
        )?;
        w.empty("variable", &[("name", "domain_name"), ("value", domain)])?;
        w.end("variables")?;

        w.end("user")?;
        w.end("domain")?;
        w.end("section")?;
        w.end("document")?;
        w.finish()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SipClient {
        SipClient {
            user_id: "1001".into(),
            password: "p&ss<word>".into(),
            display_name: Some("Front Desk".into()),
            enable_voicemail: true,
            voicemail_pin: Some("4242".into()),
            voicemail_email: Some("front@a.example".into()),
            no_answer_timeout: None,
            local_caller_id_name: None,
        }
    }

    #[test]
    fn sip_user_document_carries_credentials() {
        let doc = render_sip_user("a.example", &client());
        assert!(doc.contains("<section name=\"directory\">"));
        assert!(doc.contains("<domain name=\"a.example\">"));
        assert!(doc.contains("<user id=\"1001\">"));
        // password escaped for attribute safety
        assert!(doc.contains("value=\"p&amp;ss&lt;word&gt;\""));
        assert!(doc.contains("name=\"vm-password\" value=\"4242\""));
        assert!(doc.contains("name=\"vm-mailto\" value=\"front@a.example\""));
        assert!(doc.contains("effective_caller_id_name\" value=\"Front Desk\""));
        assert!(doc.contains("${sofia_contact(${dialed_user}@${dialed_domain})}"));
    }

    #[test]
    fn voicemail_disabled_omits_vm_params() {
        let mut c = client();
        c.enable_voicemail = false;
        let doc = render_sip_user("a.example", &c);
        assert!(!doc.contains("vm-password"));
        assert!(!doc.contains("vm-mailto"));
    }

    #[test]
    fn mailbox_user_cannot_register() {
        let doc = render_mailbox_user("a.example", "3000", "3000", Some("9876"));
        assert!(doc.contains("<user id=\"3000\" mailbox=\"3000\">"));
        assert!(doc.contains("value=\"NO_SIP_AUTH\""));
        assert!(doc.contains("name=\"vm-password\" value=\"9876\""));
    }
}
