//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-child operations take
//! the tenant `domain` to enforce aggregate scoping. Implementations
//! must preserve the insertion order of embedded collections.

use crate::error::PatchbayResult;
use crate::models::{
    dialplan::DialplanEntry,
    did::Did,
    gateway::{CreateGateway, Gateway, UpdateGateway},
    group::Group,
    sip_client::SipClient,
    tenant::{CreateTenant, Tenant, UpdateTenant},
};

// ---------------------------------------------------------------------------
// Tenant aggregate (admin surface)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = PatchbayResult<Tenant>> + Send;
    fn get_by_domain(&self, domain: &str) -> impl Future<Output = PatchbayResult<Tenant>> + Send;
    fn update(
        &self,
        domain: &str,
        input: UpdateTenant,
    ) -> impl Future<Output = PatchbayResult<Tenant>> + Send;
    fn delete(&self, domain: &str) -> impl Future<Output = PatchbayResult<()>> + Send;
    fn list(&self) -> impl Future<Output = PatchbayResult<Vec<Tenant>>> + Send;

    // -- SIP clients ------------------------------------------------------

    fn add_sip_client(
        &self,
        domain: &str,
        client: SipClient,
    ) -> impl Future<Output = PatchbayResult<SipClient>> + Send;
    fn update_sip_client(
        &self,
        domain: &str,
        client: SipClient,
    ) -> impl Future<Output = PatchbayResult<SipClient>> + Send;
    /// Removes the client, drops it from every group member list, and
    /// rewrites DIDs targeting it to the unassigned custom target.
    fn delete_sip_client(
        &self,
        domain: &str,
        user_id: &str,
    ) -> impl Future<Output = PatchbayResult<()>> + Send;

    // -- Groups -----------------------------------------------------------

    fn add_group(
        &self,
        domain: &str,
        group: Group,
    ) -> impl Future<Output = PatchbayResult<Group>> + Send;
    fn update_group(
        &self,
        domain: &str,
        group: Group,
    ) -> impl Future<Output = PatchbayResult<Group>> + Send;
    /// Removes the group and rewrites DIDs targeting it to the
    /// unassigned custom target.
    fn delete_group(
        &self,
        domain: &str,
        name: &str,
    ) -> impl Future<Output = PatchbayResult<()>> + Send;

    // -- DIDs -------------------------------------------------------------

    /// Stores the DID with its number in canonical form.
    fn add_did(&self, domain: &str, did: Did) -> impl Future<Output = PatchbayResult<Did>> + Send;
    fn update_did(
        &self,
        domain: &str,
        did: Did,
    ) -> impl Future<Output = PatchbayResult<Did>> + Send;
    fn delete_did(
        &self,
        domain: &str,
        did_number: &str,
    ) -> impl Future<Output = PatchbayResult<()>> + Send;

    // -- Dialplan entries -------------------------------------------------

    fn add_dialplan_entry(
        &self,
        domain: &str,
        entry: DialplanEntry,
    ) -> impl Future<Output = PatchbayResult<DialplanEntry>> + Send;
    fn update_dialplan_entry(
        &self,
        domain: &str,
        entry: DialplanEntry,
    ) -> impl Future<Output = PatchbayResult<DialplanEntry>> + Send;
    fn delete_dialplan_entry(
        &self,
        domain: &str,
        name: &str,
    ) -> impl Future<Output = PatchbayResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Resolver read surface
// ---------------------------------------------------------------------------

/// The read-only snapshot queries the lookup path runs on. Missing
/// records are routing decisions, not errors, so these return
/// `Option` rather than `NotFound`.
pub trait RoutingStore: Send + Sync {
    fn tenant_by_domain(
        &self,
        domain: &str,
    ) -> impl Future<Output = PatchbayResult<Option<Tenant>>> + Send;
    /// Matches active DIDs only; the input is normalized to canonical
    /// form before comparison.
    fn tenant_by_did(
        &self,
        did_number: &str,
    ) -> impl Future<Output = PatchbayResult<Option<Tenant>>> + Send;
    fn find_sip_client(
        &self,
        domain: &str,
        user_id: &str,
    ) -> impl Future<Output = PatchbayResult<Option<SipClient>>> + Send;
}

// ---------------------------------------------------------------------------
// Gateways (global aggregate)
// ---------------------------------------------------------------------------

pub trait GatewayRepository: Send + Sync {
    fn create(&self, input: CreateGateway) -> impl Future<Output = PatchbayResult<Gateway>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = PatchbayResult<Gateway>> + Send;
    fn update(
        &self,
        name: &str,
        input: UpdateGateway,
    ) -> impl Future<Output = PatchbayResult<Gateway>> + Send;
    fn delete(&self, name: &str) -> impl Future<Output = PatchbayResult<()>> + Send;
    /// All gateways in creation order; "first available" selection for
    /// outbound calls picks the head of this list.
    fn list(&self) -> impl Future<Output = PatchbayResult<Vec<Gateway>>> + Send;
}
