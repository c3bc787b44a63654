//! Tenant dialplan entry domain model.

use serde::{Deserialize, Serialize};

/// One switch application invocation: `<action application data/>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialplanAction {
    pub application: String,
    #[serde(default)]
    pub data: String,
}

impl DialplanAction {
    pub fn new(application: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            data: data.into(),
        }
    }
}

/// A tenant-authored dialplan extension: a condition plus its ordered
/// actions. The condition expression is a regex, anchored by
/// convention; actions are emitted verbatim when the entry matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialplanEntry {
    pub name: String,
    pub condition_field: String,
    pub condition_expression: String,
    pub actions: Vec<DialplanAction>,
}
