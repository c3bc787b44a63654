//! Typed accessor over the switch's request variables.
//!
//! The switch POSTs a loose string→string map. Only a small, closed
//! set of keys is recognized; each accessor documents its precedence
//! order. Empty values are treated as absent so a blank hint falls
//! through to the next key.

use std::collections::HashMap;

pub const DEFAULT_CONTEXT: &str = "default";
pub const PUBLIC_CONTEXT: &str = "public";

#[derive(Debug, Clone)]
pub struct SwitchVars {
    vars: HashMap<String, String>,
}

impl From<HashMap<String, String>> for SwitchVars {
    fn from(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

impl SwitchVars {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn first(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Which lookup family the switch is asking for.
    pub fn section(&self) -> Option<&str> {
        self.get("section")
    }

    /// Optional sub-action, e.g. `voicemail-lookup` on directory.
    pub fn action(&self) -> Option<&str> {
        self.get("action")
    }

    /// Domain hint: `domain`, else `variable_domain_name`, else
    /// `variable_sip_to_host`.
    pub fn domain(&self) -> Option<&str> {
        self.first(&["domain", "variable_domain_name", "variable_sip_to_host"])
    }

    /// Call context: `Caller-Context`, else
    /// `variable_dialplan_context`, else `default`.
    pub fn dialplan_context(&self) -> &str {
        self.first(&["Caller-Context", "variable_dialplan_context"])
            .unwrap_or(DEFAULT_CONTEXT)
    }

    /// Dialed destination: `Caller-Destination-Number`, else
    /// `destination_number`.
    pub fn destination(&self) -> Option<&str> {
        self.first(&["Caller-Destination-Number", "destination_number"])
    }

    /// Trunk-provided DID override.
    pub fn did_override(&self) -> Option<&str> {
        self.get("variable_signalwire_actual_did")
    }

    /// Trunk-side callee hint: `variable_sip_to_user`, else
    /// `variable_sip_dest_user`.
    pub fn trunk_destination(&self) -> Option<&str> {
        self.first(&["variable_sip_to_user", "variable_sip_dest_user"])
    }

    pub fn caller_id_number(&self) -> Option<&str> {
        self.get("Caller-Caller-ID-Number")
    }

    pub fn caller_id_name(&self) -> Option<&str> {
        self.get("Caller-Caller-ID-Name")
    }

    pub fn channel_name(&self) -> Option<&str> {
        self.get("Caller-Channel-Name")
    }

    /// User or mailbox id on directory lookups.
    pub fn directory_user(&self) -> Option<&str> {
        self.first(&["user", "sip_auth_username"])
    }

    /// Requested configuration file on configuration lookups.
    pub fn config_key(&self) -> Option<&str> {
        self.get("key_value")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> SwitchVars {
        SwitchVars::from(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[test]
    fn domain_precedence() {
        let v = vars(&[
            ("variable_sip_to_host", "c.example"),
            ("variable_domain_name", "b.example"),
            ("domain", "a.example"),
        ]);
        assert_eq!(v.domain(), Some("a.example"));

        let v = vars(&[
            ("variable_sip_to_host", "c.example"),
            ("variable_domain_name", "b.example"),
        ]);
        assert_eq!(v.domain(), Some("b.example"));

        let v = vars(&[("variable_sip_to_host", "c.example")]);
        assert_eq!(v.domain(), Some("c.example"));
    }

    #[test]
    fn empty_values_fall_through() {
        let v = vars(&[("domain", ""), ("variable_domain_name", "b.example")]);
        assert_eq!(v.domain(), Some("b.example"));
    }

    #[test]
    fn context_defaults_to_default() {
        assert_eq!(vars(&[]).dialplan_context(), "default");
        assert_eq!(
            vars(&[("Caller-Context", "public")]).dialplan_context(),
            "public"
        );
        assert_eq!(
            vars(&[("variable_dialplan_context", "public")]).dialplan_context(),
            "public"
        );
    }

    #[test]
    fn destination_precedence() {
        let v = vars(&[
            ("destination_number", "2002"),
            ("Caller-Destination-Number", "1001"),
        ]);
        assert_eq!(v.destination(), Some("1001"));
    }

    #[test]
    fn trunk_destination_precedence() {
        let v = vars(&[
            ("variable_sip_dest_user", "5125550000"),
            ("variable_sip_to_user", "5125551234"),
        ]);
        assert_eq!(v.trunk_destination(), Some("5125551234"));
    }
}
