//! The dialplan resolver: classifies every call and emits the XML
//! program the switch executes.
//!
//! Classification runs as an ordered pipeline. In the `public`
//! context the real DID is recovered from the trunk hints and the
//! call transfers into `default`. Inside `default` the order is:
//! inter-domain guard, outbound PSTN, then local dispatch (feature
//! codes → groups → tenant dialplan entries → SIP clients → external
//! dial-out), with an announce-and-hangup fallback. Anything that
//! fails internally still produces a valid error program.

use patchbay_core::models::did::{RoutingType, canonical_did};
use patchbay_core::models::group::{Group, GroupType};
use patchbay_core::models::sip_client::SipClient;
use patchbay_core::models::tenant::Tenant;
use patchbay_core::repository::{GatewayRepository, RoutingStore};
use regex::Regex;
use tracing::{debug, error, warn};

use crate::cnam::{CnamClient, CnamRecord};
use crate::config::ResolverConfig;
use crate::error::{ResolverResult, with_store_timeout};
use crate::number::{self, anchored_literal};
use crate::program::{
    self, CANNOT_COMPLETE_MEDIA, ExtensionProgram, VOICEMAIL_CHECK_CODE, catch_all_expression,
};
use crate::vars::{DEFAULT_CONTEXT, PUBLIC_CONTEXT, SwitchVars};
use crate::xml;

/// Context-aware routing engine.
///
/// Generic over the store traits so the routing rules can be
/// exercised against any backend.
pub struct DialplanService<S, G> {
    store: S,
    gateways: G,
    cnam: CnamClient,
    config: ResolverConfig,
}

impl<S: RoutingStore, G: GatewayRepository> DialplanService<S, G> {
    pub fn new(store: S, gateways: G, cnam: CnamClient, config: ResolverConfig) -> Self {
        Self {
            store,
            gateways,
            cnam,
            config,
        }
    }

    /// Resolve one dialplan request into a finished XML document.
    /// Never fails: internal errors emit the application-error
    /// program in the requested context.
    pub async fn resolve(&self, vars: &SwitchVars) -> String {
        match self.route(vars).await {
            Ok((context, program)) => xml::render_dialplan(&context, &program),
            Err(e) => {
                error!(
                    error = %e,
                    context = vars.dialplan_context(),
                    destination = ?vars.destination(),
                    "dialplan resolution failed, emitting error program"
                );
                xml::render_dialplan(
                    vars.dialplan_context(),
                    &program::application_error(vars.destination()),
                )
            }
        }
    }

    async fn route(&self, vars: &SwitchVars) -> ResolverResult<(String, ExtensionProgram)> {
        match vars.dialplan_context() {
            PUBLIC_CONTEXT => self.route_public(vars).await,
            DEFAULT_CONTEXT => self.route_default(vars).await,
            other => {
                warn!(context = other, "unrecognized dialplan context");
                Ok((other.to_string(), program::no_route(vars.destination())))
            }
        }
    }

    // -- public context ---------------------------------------------------

    /// Calls arriving from a carrier trunk. The dialed DID is the
    /// trunk-provided override if present, else the trunk-side callee
    /// hint; the emitted program is declared in `default`, which
    /// transfers the call out of `public`.
    async fn route_public(&self, vars: &SwitchVars) -> ResolverResult<(String, ExtensionProgram)> {
        let hint = vars.did_override().or_else(|| vars.trunk_destination());
        match hint {
            Some(raw_did) => {
                let program = self.route_inbound_did(vars, raw_did).await?;
                Ok((DEFAULT_CONTEXT.to_string(), program))
            }
            None => {
                warn!("public call carried no DID hint");
                let mut program = ExtensionProgram::on_destination(
                    "no_did_found",
                    catch_all_expression(vars.destination()),
                );
                program.push_announce_hangup();
                Ok((PUBLIC_CONTEXT.to_string(), program))
            }
        }
    }

    // -- default context --------------------------------------------------

    async fn route_default(&self, vars: &SwitchVars) -> ResolverResult<(String, ExtensionProgram)> {
        // (i) inter-domain guard: a caller whose channel belongs to a
        // different domain gets a bare rejection.
        if let (Some(domain), Some(caller_domain)) = (
            vars.domain(),
            vars.channel_name().and_then(number::caller_domain),
        ) {
            if number::normalize_token(caller_domain) != number::normalize_token(domain) {
                warn!(
                    caller_domain,
                    domain, "rejecting inter-domain call attempt"
                );
                return Ok((
                    DEFAULT_CONTEXT.to_string(),
                    program::interdomain_reject(vars.destination()),
                ));
            }
        }

        let destination = vars.destination().unwrap_or_default();

        // (ii) outbound PSTN via the shared gateway pool.
        if !destination.is_empty() {
            if let Some(program) = self.try_outbound_pstn(destination).await? {
                return Ok((DEFAULT_CONTEXT.to_string(), program));
            }
        }

        // (iii) local dispatch, (iv) fallback.
        let program = self.local_dispatch(vars, destination).await?;
        Ok((DEFAULT_CONTEXT.to_string(), program))
    }

    /// NANP destinations bridge out through the first available
    /// gateway. An empty pool is "no match", letting the call fall
    /// through to local dispatch.
    async fn try_outbound_pstn(
        &self,
        destination: &str,
    ) -> ResolverResult<Option<ExtensionProgram>> {
        let Some(ten_digits) = number::nanp_ten_digits(destination) else {
            return Ok(None);
        };

        let gateways = with_store_timeout(
            self.config.store_timeout,
            "list_gateways",
            self.gateways.list(),
        )
        .await?;
        let Some(gateway) = gateways.first() else {
            debug!(destination, "no gateway available for PSTN destination");
            return Ok(None);
        };

        let number = format!("+1{ten_digits}");
        let mut program =
            ExtensionProgram::on_destination("outbound_pstn", anchored_literal(destination));
        program.push("bridge", format!("sofia/gateway/{}/{}", gateway.name, number));
        program.push("playback", CANNOT_COMPLETE_MEDIA);
        program.push("hangup", "");
        Ok(Some(program))
    }

    /// Strict local precedence: voicemail feature code, groups,
    /// tenant dialplan entries, SIP clients, external dial-out,
    /// fallback.
    async fn local_dispatch(
        &self,
        vars: &SwitchVars,
        destination: &str,
    ) -> ResolverResult<ExtensionProgram> {
        let Some(domain) = vars.domain() else {
            warn!("internal call carried no domain hint");
            return Ok(program::no_route(vars.destination()));
        };

        let tenant = with_store_timeout(
            self.config.store_timeout,
            "tenant_by_domain",
            self.store.tenant_by_domain(domain),
        )
        .await?;
        let Some(tenant) = tenant else {
            warn!(domain, "no tenant for domain");
            return Ok(program::no_route(vars.destination()));
        };

        if destination == VOICEMAIL_CHECK_CODE {
            return Ok(voicemail_check_program(&tenant.domain_name, destination));
        }

        if let Some(group) = tenant.group(destination) {
            return Ok(group_program(group, &tenant.domain_name, destination));
        }

        if let Some(entry) = matching_dialplan_entry(&tenant, destination) {
            debug!(entry = %entry.name, destination, "matched tenant dialplan entry");
            let mut program = ExtensionProgram::on_destination(
                entry.name.clone(),
                anchored_literal(destination),
            );
            program.actions.extend(entry.actions.iter().cloned());
            return Ok(program);
        }

        if let Some(client) = tenant
            .sip_clients
            .iter()
            .find(|c| number::normalize_token(&c.user_id) == number::normalize_token(destination))
        {
            return Ok(user_program(client, &tenant.domain_name, destination));
        }

        if number::EXTERNAL.is_match(destination) {
            return Ok(self.external_dialout_program(destination));
        }

        debug!(domain, destination, "no local route matched");
        Ok(program::no_route(vars.destination()))
    }

    /// Longer international numbers bridge through the configured
    /// outbound trunk profile.
    fn external_dialout_program(&self, destination: &str) -> ExtensionProgram {
        let mut program =
            ExtensionProgram::on_destination("external_dialout", anchored_literal(destination));
        program.push(
            "bridge",
            format!(
                "sofia/gateway/{}/{}",
                self.config.outbound_profile, destination
            ),
        );
        program.push("playback", CANNOT_COMPLETE_MEDIA);
        program.push("hangup", "");
        program
    }

    // -- inbound DID ------------------------------------------------------

    /// Inbound carrier call for a DID: enrich the caller identity,
    /// find the owning tenant, rewrite the presented caller-id, and
    /// dispatch on the DID's routing type with its failover appended.
    async fn route_inbound_did(
        &self,
        vars: &SwitchVars,
        raw_did: &str,
    ) -> ResolverResult<ExtensionProgram> {
        let canonical = canonical_did(raw_did);

        // Enrichment runs first so the rewrite below sees it. Failure
        // keeps the switch-supplied name.
        let caller_number = vars.caller_id_number().unwrap_or_default();
        let cnam = if caller_number.is_empty() {
            None
        } else {
            self.cnam.lookup(caller_number).await
        };
        let display = inbound_display(cnam.as_ref(), vars.caller_id_name().unwrap_or_default());
        let name = number::strip_nanp_prefix(&display).to_string();
        let caller = number::strip_nanp_prefix(caller_number).to_string();

        let tenant = with_store_timeout(
            self.config.store_timeout,
            "tenant_by_did",
            self.store.tenant_by_did(&canonical),
        )
        .await?;
        let Some(tenant) = tenant else {
            warn!(did = %canonical, "no tenant owns DID");
            return Ok(program::no_route(vars.destination()));
        };
        let Some(did) = tenant
            .dids
            .iter()
            .find(|d| d.did_number == canonical && d.active)
        else {
            warn!(did = %canonical, domain = %tenant.domain_name, "DID vanished from aggregate");
            return Ok(program::no_route(vars.destination()));
        };
        let domain = tenant.domain_name.as_str();

        let mut program = ExtensionProgram::on_destination(
            format!("inbound_did_{canonical}"),
            catch_all_expression(vars.destination().or(Some(raw_did))),
        );

        // Caller-identity preamble, set and exported so the bridged
        // leg sees it.
        let from_uri = format!("{caller}@{domain}");
        let identity: [(&str, &str); 9] = [
            ("caller_id_name", &name),
            ("caller_id_number", &caller),
            ("effective_caller_id_name", &name),
            ("effective_caller_id_number", &caller),
            ("sip_invite_domain", domain),
            ("sip_from_host", domain),
            ("sip_from_user", &caller),
            ("sip_from_display", &name),
            ("sip_from_uri", &from_uri),
        ];
        for (key, value) in identity {
            program.push("set", format!("{key}={value}"));
            program.push("export", format!("{key}={value}"));
        }
        program.push("set", "continue_on_fail=true");
        program.push("set", "hangup_after_bridge=true");

        match did.routing_type {
            RoutingType::Extension => {
                if tenant.sip_client(&did.routing_target).is_some() {
                    program.push("bridge", format!("user/{}@{}", did.routing_target, domain));
                } else {
                    warn!(
                        did = %canonical,
                        target = %did.routing_target,
                        "DID routing target no longer exists"
                    );
                    return Ok(program::no_route(vars.destination()));
                }
            }
            RoutingType::Group => {
                let Some(group) = tenant.group(&did.routing_target) else {
                    warn!(
                        did = %canonical,
                        target = %did.routing_target,
                        "DID group target no longer exists"
                    );
                    return Ok(program::no_route(vars.destination()));
                };
                if let Some(data) = group_bridge_data(group, domain) {
                    program.push("bridge", data);
                }
            }
            RoutingType::Ivr => {
                program.push(
                    "transfer",
                    format!("{} XML {}_ivr_context", did.routing_target, domain),
                );
            }
            RoutingType::ExternalNumber | RoutingType::Custom => {
                program.push("transfer", did.routing_target.clone());
            }
        }

        // Failover: a voicemail deposit when declared, otherwise the
        // standard announce-and-hangup.
        if let Some(box_id) = did.failover_voicemail_box() {
            program.push_voicemail_deposit(domain, box_id);
        } else {
            program.push_announce_hangup();
        }

        Ok(program)
    }
}

// ---------------------------------------------------------------------------
// Program builders (pure)
// ---------------------------------------------------------------------------

/// First tenant dialplan entry whose anchored expression matches the
/// destination. Entries with unparseable expressions are skipped.
fn matching_dialplan_entry<'t>(
    tenant: &'t Tenant,
    destination: &str,
) -> Option<&'t patchbay_core::models::dialplan::DialplanEntry> {
    tenant
        .dialplan
        .iter()
        .filter(|e| e.condition_field == "destination_number")
        .find(|e| match Regex::new(&e.condition_expression) {
            Ok(re) => re.is_match(destination),
            Err(err) => {
                warn!(
                    entry = %e.name,
                    expression = %e.condition_expression,
                    error = %err,
                    "skipping dialplan entry with invalid expression"
                );
                false
            }
        })
}

/// `*98`: voicemail retrieval for the caller's own box.
fn voicemail_check_program(domain: &str, destination: &str) -> ExtensionProgram {
    let mut program =
        ExtensionProgram::on_destination("voicemail_check", anchored_literal(destination));
    program.push("answer", "");
    program.push("sleep", "1000");
    program.push("voicemail", format!("check default {domain}"));
    program.push("hangup", "");
    program
}

/// Bridge string for a group: member URIs joined `|` for hunt
/// (sequential ring) or `,` for ring (simultaneous), with an optional
/// leading `timeout=` token. `None` when the group has no members.
fn group_bridge_data(group: &Group, domain: &str) -> Option<String> {
    let members = group.ordered_members();
    if members.is_empty() {
        return None;
    }
    let separator = match group.group_type {
        GroupType::Hunt => "|",
        GroupType::Ring => ",",
    };
    let uris: Vec<String> = members
        .iter()
        .map(|m| format!("user/{}@{}", m.user_id, domain))
        .collect();
    let mut data = uris.join(separator);
    if let Some(timeout) = group.timeout {
        data = format!("timeout={timeout},{data}");
    }
    Some(data)
}

/// Full local group program: bridge plus the group's own failure
/// handling (mailbox, declared action, or announce).
fn group_program(group: &Group, domain: &str, destination: &str) -> ExtensionProgram {
    let mut program = ExtensionProgram::on_destination(
        format!("{}_group_{}", group.group_type.as_str(), group.name),
        anchored_literal(destination),
    );
    program.push("set", "continue_on_fail=true");
    program.push("set", "hangup_after_bridge=true");
    if let Some(data) = group_bridge_data(group, domain) {
        program.push("bridge", data);
    }
    if let Some(box_id) = &group.voicemail_box_id {
        program.push_voicemail_deposit(domain, box_id);
    } else if let Some(action) = &group.no_answer_action {
        program.actions.push(action.clone());
    } else {
        program.push_announce_hangup();
    }
    program
}

/// The standard per-user program for dialing a SIP client directly.
fn user_program(client: &SipClient, domain: &str, destination: &str) -> ExtensionProgram {
    let user = client.user_id.as_str();
    let mut program = ExtensionProgram::on_destination(
        format!("local_extension_{user}"),
        anchored_literal(destination),
    );

    program.push("set", format!("dialed_extension={user}"));
    program.push("export", format!("dialed_extension={user}"));
    program.push(
        "set",
        format!("user_exists=${{user_exists(id {user} {domain})}}"),
    );
    program.push("bind_meta_app", "1 b s execute_extension::dx XML features");
    program.push(
        "bind_meta_app",
        "2 b s record_session::${recordings_dir}/${caller_id_number}.${strftime(%Y-%m-%d-%H-%M-%S)}.wav",
    );
    program.push("bind_meta_app", "3 b s execute_extension::cf XML features");
    program.push(
        "bind_meta_app",
        "4 b s execute_extension::att_xfer XML features",
    );
    program.push("set", "ringback=${us-ring}");
    program.push("set", "transfer_ringback=$${hold_music}");
    program.push("set", format!("call_timeout={}", client.call_timeout()));
    program.push("set", "hangup_after_bridge=true");
    program.push("set", "continue_on_fail=true");
    program.push(
        "hash",
        format!("insert/${{domain_name}}-call_return/{user}/${{caller_id_number}}"),
    );
    program.push(
        "hash",
        format!("insert/${{domain_name}}-last_dial_ext/{user}/${{uuid}}"),
    );
    program.push("bridge", format!("user/{user}@{domain}"));

    if client.enable_voicemail {
        program.push_voicemail_deposit(domain, user);
    } else {
        program.push_announce_hangup();
    }
    program
}

/// Display rewrite for an enriched inbound caller:
/// `<national>, <cnam>, <location>`, else the switch-supplied name.
fn inbound_display(cnam: Option<&CnamRecord>, switch_name: &str) -> String {
    match cnam {
        Some(record) => format!(
            "{}, {}, {}",
            record.national_number_formatted, record.caller_id, record.location
        ),
        None => switch_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_core::models::dialplan::DialplanAction;
    use patchbay_core::models::group::{GroupMember, RingStrategy};

    fn group(group_type: GroupType, timeout: Option<u32>, members: &[&str]) -> Group {
        Group {
            name: "sales".into(),
            group_type,
            timeout,
            members: members
                .iter()
                .enumerate()
                .map(|(i, m)| GroupMember {
                    user_id: (*m).into(),
                    order: i as u32,
                })
                .collect(),
            strategy: RingStrategy::Sequential,
            voicemail_box_id: None,
            voicemail_pin: None,
            no_answer_action: None,
        }
    }

    #[test]
    fn hunt_groups_join_with_pipe_and_carry_timeout() {
        let g = group(GroupType::Hunt, Some(20), &["1001", "1002"]);
        assert_eq!(
            group_bridge_data(&g, "a.example").as_deref(),
            Some("timeout=20,user/1001@a.example|user/1002@a.example")
        );
    }

    #[test]
    fn ring_groups_join_with_comma() {
        let g = group(GroupType::Ring, None, &["1001", "1002"]);
        assert_eq!(
            group_bridge_data(&g, "a.example").as_deref(),
            Some("user/1001@a.example,user/1002@a.example")
        );
    }

    #[test]
    fn members_ring_in_declared_order() {
        let mut g = group(GroupType::Hunt, None, &["1002", "1001"]);
        g.members[0].order = 5;
        g.members[1].order = 1;
        assert_eq!(
            group_bridge_data(&g, "a.example").as_deref(),
            Some("user/1001@a.example|user/1002@a.example")
        );
    }

    #[test]
    fn empty_group_has_no_bridge_but_still_fails_over() {
        let g = group(GroupType::Hunt, Some(20), &[]);
        assert_eq!(group_bridge_data(&g, "a.example"), None);
        let program = group_program(&g, "a.example", "sales");
        assert!(program.actions.iter().all(|a| a.application != "bridge"));
        assert!(program.actions.iter().any(|a| a.application == "playback"));
    }

    #[test]
    fn group_custom_no_answer_action_is_honored() {
        let mut g = group(GroupType::Ring, None, &["1001"]);
        g.no_answer_action = Some(DialplanAction::new("transfer", "9000 XML default"));
        let program = group_program(&g, "a.example", "sales");
        let last = program.actions.last().unwrap();
        assert_eq!(last.application, "transfer");
        assert_eq!(last.data, "9000 XML default");
    }

    #[test]
    fn user_program_carries_timeout_bridge_and_voicemail() {
        let client = SipClient {
            user_id: "1001".into(),
            password: "p".into(),
            display_name: None,
            enable_voicemail: true,
            voicemail_pin: None,
            voicemail_email: None,
            no_answer_timeout: Some(25),
            local_caller_id_name: None,
        };
        let program = user_program(&client, "a.example", "1001");
        assert_eq!(program.expression, "^1001$");
        let data: Vec<&str> = program.actions.iter().map(|a| a.data.as_str()).collect();
        assert!(data.contains(&"call_timeout=25"));
        assert!(data.contains(&"user/1001@a.example"));
        assert!(data.contains(&"default a.example 1001"));
    }

    #[test]
    fn user_program_defaults_timeout_to_thirty() {
        let client = SipClient {
            user_id: "1001".into(),
            password: "p".into(),
            display_name: None,
            enable_voicemail: false,
            voicemail_pin: None,
            voicemail_email: None,
            no_answer_timeout: None,
            local_caller_id_name: None,
        };
        let program = user_program(&client, "a.example", "1001");
        assert!(program
            .actions
            .iter()
            .any(|a| a.data == "call_timeout=30"));
        // no voicemail: plain announce instead of a deposit
        assert!(program.actions.iter().all(|a| a.application != "voicemail"));
    }

    #[test]
    fn voicemail_check_matches_star_ninety_eight() {
        let program = voicemail_check_program("a.example", "*98");
        assert_eq!(program.expression, r"^\*98$");
        let apps: Vec<&str> = program
            .actions
            .iter()
            .map(|a| a.application.as_str())
            .collect();
        assert_eq!(apps, vec!["answer", "sleep", "voicemail", "hangup"]);
        assert_eq!(program.actions[2].data, "check default a.example");
    }

    #[test]
    fn inbound_display_prefers_cnam() {
        let record = CnamRecord {
            national_number_formatted: "(512) 555-1234".into(),
            caller_id: "JOHN DOE".into(),
            location: "AUSTIN TX".into(),
        };
        assert_eq!(
            inbound_display(Some(&record), "fallback"),
            "(512) 555-1234, JOHN DOE, AUSTIN TX"
        );
        assert_eq!(inbound_display(None, "fallback"), "fallback");
    }
}
