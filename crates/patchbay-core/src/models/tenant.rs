//! Tenant domain model.
//!
//! A tenant is one customer domain on the softswitch. All routing
//! data for that domain (SIP clients, groups, DIDs, dialplan entries)
//! is embedded in the tenant aggregate, and the embedded collections
//! keep their insertion order because routing precedence within a
//! rule family can depend on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dialplan::DialplanEntry;
use super::did::Did;
use super::group::Group;
use super::sip_client::SipClient;

/// Descriptive, non-routing attributes of a tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantProfile {
    pub display_name: String,
    pub description: String,
    pub timezone: Option<String>,
}

/// One customer domain and all of its embedded routing data.
///
/// `domain_name` is globally unique; child entities are unique within
/// the tenant by their own keys (`user_id`, group `name`,
/// `did_number`, dialplan-entry `name`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub domain_name: String,
    pub profile: TenantProfile,
    pub sip_clients: Vec<SipClient>,
    pub dialplan: Vec<DialplanEntry>,
    pub groups: Vec<Group>,
    pub dids: Vec<Did>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn sip_client(&self, user_id: &str) -> Option<&SipClient> {
        self.sip_clients.iter().find(|c| c.user_id == user_id)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn did(&self, did_number: &str) -> Option<&Did> {
        self.dids.iter().find(|d| d.did_number == did_number)
    }
}

/// Fields required to create a new tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub domain_name: String,
    pub profile: Option<TenantProfile>,
}

/// Fields that can be updated on an existing tenant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTenant {
    pub profile: Option<TenantProfile>,
}
