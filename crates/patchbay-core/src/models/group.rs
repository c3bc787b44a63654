//! Hunt/ring group domain model.

use serde::{Deserialize, Serialize};

use super::dialplan::DialplanAction;

/// How a group's members are offered the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    /// Ring members one after another.
    Hunt,
    /// Ring all members at once.
    Ring,
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Hunt => "hunt",
            GroupType::Ring => "ring",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hunt" => Some(GroupType::Hunt),
            "ring" => Some(GroupType::Ring),
            _ => None,
        }
    }
}

/// Declared ring strategy. Persisted as configured; the emitted bridge
/// string is decided by the group type so that identical requests
/// always emit identical documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingStrategy {
    Sequential,
    Simultaneous,
    Random,
}

impl RingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RingStrategy::Sequential => "sequential",
            RingStrategy::Simultaneous => "simultaneous",
            RingStrategy::Random => "random",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sequential" => Some(RingStrategy::Sequential),
            "simultaneous" => Some(RingStrategy::Simultaneous),
            "random" => Some(RingStrategy::Random),
            _ => None,
        }
    }
}

/// One member slot in a group. `order` controls ring position for
/// sequential strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub user_id: String,
    #[serde(default)]
    pub order: u32,
}

/// A dialable group of tenant extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub group_type: GroupType,
    /// Ring timeout in seconds, prepended to the bridge string when set.
    pub timeout: Option<u32>,
    pub members: Vec<GroupMember>,
    pub strategy: RingStrategy,
    /// Mailbox that receives the call when nobody answers.
    pub voicemail_box_id: Option<String>,
    /// PIN for the group mailbox, served by directory voicemail lookups.
    pub voicemail_pin: Option<String>,
    /// Custom no-answer action, used when no mailbox is configured.
    pub no_answer_action: Option<DialplanAction>,
}

impl Group {
    /// Members in ring order.
    pub fn ordered_members(&self) -> Vec<&GroupMember> {
        let mut members: Vec<&GroupMember> = self.members.iter().collect();
        members.sort_by_key(|m| m.order);
        members
    }
}
