//! In-memory extension programs: what the dialplan resolver builds
//! and the XML emitter renders.
//!
//! A program is one named extension: a condition plus strictly
//! ordered actions. Action order is preserved from construction
//! through emission because the switch executes them in document
//! order.

use patchbay_core::models::dialplan::DialplanAction;

use crate::number::anchored_literal;

/// Announcement played before hanging up an unroutable call.
pub const CANNOT_COMPLETE_MEDIA: &str = "ivr/ivr-call_cannot_be_completed_as_dialed.wav";

/// Reserved feature code for checking voicemail.
pub const VOICEMAIL_CHECK_CODE: &str = "*98";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionProgram {
    pub name: String,
    pub condition_field: String,
    pub expression: String,
    pub actions: Vec<DialplanAction>,
}

impl ExtensionProgram {
    /// A program whose condition matches the given destination
    /// literally.
    pub fn on_destination(name: impl Into<String>, destination_expression: String) -> Self {
        Self {
            name: name.into(),
            condition_field: "destination_number".into(),
            expression: destination_expression,
            actions: Vec::new(),
        }
    }

    pub fn push(&mut self, application: &str, data: impl Into<String>) {
        self.actions.push(DialplanAction::new(application, data));
    }

    /// Required fields the emitter refuses to render without.
    pub fn is_well_formed(&self) -> bool {
        !self.name.is_empty()
            && !self.condition_field.is_empty()
            && !self.expression.is_empty()
            && !self.actions.is_empty()
    }

    /// The standard dead-end: answer, announce, hang up.
    pub fn push_announce_hangup(&mut self) {
        self.push("answer", "");
        self.push("playback", CANNOT_COMPLETE_MEDIA);
        self.push("hangup", "");
    }

    /// Deposit the caller into a voicemail box.
    pub fn push_voicemail_deposit(&mut self, domain: &str, box_id: &str) {
        self.push("answer", "");
        self.push("sleep", "1000");
        self.push("voicemail", format!("default {domain} {box_id}"));
        self.push("hangup", "");
    }
}

/// Condition expression for a possibly-absent destination. Always
/// anchored.
pub fn catch_all_expression(destination: Option<&str>) -> String {
    match destination {
        Some(dest) if !dest.is_empty() => anchored_literal(dest),
        _ => "^.*$".into(),
    }
}

/// Emitted when resolution itself failed (store down, internal bug).
pub fn application_error(destination: Option<&str>) -> ExtensionProgram {
    let mut program =
        ExtensionProgram::on_destination("application_error", catch_all_expression(destination));
    program.push_announce_hangup();
    program
}

/// Emitted when no routing rule claimed the call.
pub fn no_route(destination: Option<&str>) -> ExtensionProgram {
    let mut program =
        ExtensionProgram::on_destination("no_route", catch_all_expression(destination));
    program.push_announce_hangup();
    program
}

/// Emitted when a caller from one domain dials into another.
pub fn interdomain_reject(destination: Option<&str>) -> ExtensionProgram {
    let mut program = ExtensionProgram::on_destination(
        "interdomain_reject",
        catch_all_expression(destination),
    );
    program.push("hangup", "CALL_REJECTED");
    program
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_programs_are_well_formed_and_anchored() {
        for program in [
            application_error(Some("1001")),
            no_route(None),
            interdomain_reject(Some("*98")),
        ] {
            assert!(program.is_well_formed());
            assert!(program.expression.starts_with('^'));
            assert!(program.expression.ends_with('$'));
        }
    }

    #[test]
    fn interdomain_reject_is_a_single_hangup() {
        let program = interdomain_reject(Some("1001"));
        assert_eq!(program.actions.len(), 1);
        assert_eq!(program.actions[0].application, "hangup");
        assert_eq!(program.actions[0].data, "CALL_REJECTED");
    }

    #[test]
    fn voicemail_deposit_sequence() {
        let mut program = ExtensionProgram::on_destination("t", "^x$".into());
        program.push_voicemail_deposit("a.example", "1001");
        let apps: Vec<&str> = program
            .actions
            .iter()
            .map(|a| a.application.as_str())
            .collect();
        assert_eq!(apps, vec!["answer", "sleep", "voicemail", "hangup"]);
        assert_eq!(program.actions[2].data, "default a.example 1001");
    }

    #[test]
    fn empty_program_is_malformed() {
        let program = ExtensionProgram::on_destination("t", "^x$".into());
        assert!(!program.is_well_formed());
    }
}
