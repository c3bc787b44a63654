//! SurrealDB implementation of [`TenantRepository`] and [`RoutingStore`].
//!
//! The tenant is stored as one aggregate document; child collection
//! writes are read-modify-write on that document so array order is
//! preserved end to end. The delete cascades (client → group members
//! and DID targets, group → DID targets) live here.

use chrono::{DateTime, Utc};
use patchbay_core::error::PatchbayResult;
use patchbay_core::models::dialplan::{DialplanAction, DialplanEntry};
use patchbay_core::models::did::{Did, RoutingType, UNASSIGNED_TARGET, canonical_did};
use patchbay_core::models::group::{Group, GroupMember, GroupType, RingStrategy};
use patchbay_core::models::sip_client::SipClient;
use patchbay_core::models::tenant::{CreateTenant, Tenant, TenantProfile, UpdateTenant};
use patchbay_core::repository::{RoutingStore, TenantRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Row structs
// -----------------------------------------------------------------------

#[derive(Debug, SurrealValue)]
struct ProfileRow {
    display_name: String,
    description: String,
    timezone: Option<String>,
}

#[derive(Debug, SurrealValue)]
struct SipClientRow {
    user_id: String,
    password: String,
    display_name: Option<String>,
    enable_voicemail: bool,
    voicemail_pin: Option<String>,
    voicemail_email: Option<String>,
    no_answer_timeout: Option<u32>,
    local_caller_id_name: Option<String>,
}

#[derive(Debug, SurrealValue)]
struct ActionRow {
    application: String,
    data: String,
}

#[derive(Debug, SurrealValue)]
struct DialplanEntryRow {
    name: String,
    condition_field: String,
    condition_expression: String,
    actions: Vec<ActionRow>,
}

#[derive(Debug, SurrealValue)]
struct GroupMemberRow {
    user_id: String,
    order: u32,
}

#[derive(Debug, SurrealValue)]
struct GroupRow {
    name: String,
    group_type: String,
    timeout: Option<u32>,
    members: Vec<GroupMemberRow>,
    strategy: String,
    voicemail_box_id: Option<String>,
    voicemail_pin: Option<String>,
    no_answer_action: Option<ActionRow>,
}

#[derive(Debug, SurrealValue)]
struct DidRow {
    did_number: String,
    active: bool,
    routing_type: String,
    routing_target: String,
    failover_routing_type: Option<String>,
    failover_routing_target: Option<String>,
    voicemail_pin: Option<String>,
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct TenantRow {
    domain_name: String,
    profile: ProfileRow,
    sip_clients: Vec<SipClientRow>,
    dialplan: Vec<DialplanEntryRow>,
    groups: Vec<GroupRow>,
    dids: Vec<DidRow>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TenantRowWithId {
    record_id: String,
    domain_name: String,
    profile: ProfileRow,
    sip_clients: Vec<SipClientRow>,
    dialplan: Vec<DialplanEntryRow>,
    groups: Vec<GroupRow>,
    dids: Vec<DidRow>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

// -----------------------------------------------------------------------
// Row <-> model conversions
// -----------------------------------------------------------------------

impl From<&TenantProfile> for ProfileRow {
    fn from(p: &TenantProfile) -> Self {
        Self {
            display_name: p.display_name.clone(),
            description: p.description.clone(),
            timezone: p.timezone.clone(),
        }
    }
}

impl ProfileRow {
    fn into_model(self) -> TenantProfile {
        TenantProfile {
            display_name: self.display_name,
            description: self.description,
            timezone: self.timezone,
        }
    }
}

impl From<&SipClient> for SipClientRow {
    fn from(c: &SipClient) -> Self {
        Self {
            user_id: c.user_id.clone(),
            password: c.password.clone(),
            display_name: c.display_name.clone(),
            enable_voicemail: c.enable_voicemail,
            voicemail_pin: c.voicemail_pin.clone(),
            voicemail_email: c.voicemail_email.clone(),
            no_answer_timeout: c.no_answer_timeout,
            local_caller_id_name: c.local_caller_id_name.clone(),
        }
    }
}

impl SipClientRow {
    fn into_model(self) -> SipClient {
        SipClient {
            user_id: self.user_id,
            password: self.password,
            display_name: self.display_name,
            enable_voicemail: self.enable_voicemail,
            voicemail_pin: self.voicemail_pin,
            voicemail_email: self.voicemail_email,
            no_answer_timeout: self.no_answer_timeout,
            local_caller_id_name: self.local_caller_id_name,
        }
    }
}

impl From<&DialplanAction> for ActionRow {
    fn from(a: &DialplanAction) -> Self {
        Self {
            application: a.application.clone(),
            data: a.data.clone(),
        }
    }
}

impl ActionRow {
    fn into_model(self) -> DialplanAction {
        DialplanAction {
            application: self.application,
            data: self.data,
        }
    }
}

impl From<&DialplanEntry> for DialplanEntryRow {
    fn from(e: &DialplanEntry) -> Self {
        Self {
            name: e.name.clone(),
            condition_field: e.condition_field.clone(),
            condition_expression: e.condition_expression.clone(),
            actions: e.actions.iter().map(ActionRow::from).collect(),
        }
    }
}

impl DialplanEntryRow {
    fn into_model(self) -> DialplanEntry {
        DialplanEntry {
            name: self.name,
            condition_field: self.condition_field,
            condition_expression: self.condition_expression,
            actions: self
                .actions
                .into_iter()
                .map(ActionRow::into_model)
                .collect(),
        }
    }
}

impl From<&Group> for GroupRow {
    fn from(g: &Group) -> Self {
        Self {
            name: g.name.clone(),
            group_type: g.group_type.as_str().to_string(),
            timeout: g.timeout,
            members: g
                .members
                .iter()
                .map(|m| GroupMemberRow {
                    user_id: m.user_id.clone(),
                    order: m.order,
                })
                .collect(),
            strategy: g.strategy.as_str().to_string(),
            voicemail_box_id: g.voicemail_box_id.clone(),
            voicemail_pin: g.voicemail_pin.clone(),
            no_answer_action: g.no_answer_action.as_ref().map(ActionRow::from),
        }
    }
}

impl GroupRow {
    fn into_model(self) -> Result<Group, DbError> {
        let group_type = GroupType::parse(&self.group_type)
            .ok_or_else(|| DbError::Decode(format!("unknown group type '{}'", self.group_type)))?;
        let strategy = RingStrategy::parse(&self.strategy)
            .ok_or_else(|| DbError::Decode(format!("unknown ring strategy '{}'", self.strategy)))?;
        Ok(Group {
            name: self.name,
            group_type,
            timeout: self.timeout,
            members: self
                .members
                .into_iter()
                .map(|m| GroupMember {
                    user_id: m.user_id,
                    order: m.order,
                })
                .collect(),
            strategy,
            voicemail_box_id: self.voicemail_box_id,
            voicemail_pin: self.voicemail_pin,
            no_answer_action: self.no_answer_action.map(ActionRow::into_model),
        })
    }
}

impl From<&Did> for DidRow {
    fn from(d: &Did) -> Self {
        Self {
            did_number: d.did_number.clone(),
            active: d.active,
            routing_type: d.routing_type.as_str().to_string(),
            routing_target: d.routing_target.clone(),
            failover_routing_type: d.failover_routing_type.clone(),
            failover_routing_target: d.failover_routing_target.clone(),
            voicemail_pin: d.voicemail_pin.clone(),
        }
    }
}

impl DidRow {
    fn into_model(self) -> Result<Did, DbError> {
        let routing_type = RoutingType::parse(&self.routing_type).ok_or_else(|| {
            DbError::Decode(format!("unknown routing type '{}'", self.routing_type))
        })?;
        Ok(Did {
            did_number: self.did_number,
            active: self.active,
            routing_type,
            routing_target: self.routing_target,
            failover_routing_type: self.failover_routing_type,
            failover_routing_target: self.failover_routing_target,
            voicemail_pin: self.voicemail_pin,
        })
    }
}

fn children_into_models(
    sip_clients: Vec<SipClientRow>,
    dialplan: Vec<DialplanEntryRow>,
    groups: Vec<GroupRow>,
    dids: Vec<DidRow>,
) -> Result<(Vec<SipClient>, Vec<DialplanEntry>, Vec<Group>, Vec<Did>), DbError> {
    Ok((
        sip_clients
            .into_iter()
            .map(SipClientRow::into_model)
            .collect(),
        dialplan
            .into_iter()
            .map(DialplanEntryRow::into_model)
            .collect(),
        groups
            .into_iter()
            .map(GroupRow::into_model)
            .collect::<Result<Vec<_>, _>>()?,
        dids.into_iter()
            .map(DidRow::into_model)
            .collect::<Result<Vec<_>, _>>()?,
    ))
}

impl TenantRow {
    fn into_tenant(self, id: Uuid) -> Result<Tenant, DbError> {
        let (sip_clients, dialplan, groups, dids) =
            children_into_models(self.sip_clients, self.dialplan, self.groups, self.dids)?;
        Ok(Tenant {
            id,
            domain_name: self.domain_name,
            profile: self.profile.into_model(),
            sip_clients,
            dialplan,
            groups,
            dids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TenantRowWithId {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid tenant UUID: {e}")))?;
        let (sip_clients, dialplan, groups, dids) =
            children_into_models(self.sip_clients, self.dialplan, self.groups, self.dids)?;
        Ok(Tenant {
            id,
            domain_name: self.domain_name,
            profile: self.profile.into_model(),
            sip_clients,
            dialplan,
            groups,
            dids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// -----------------------------------------------------------------------
// Repository
// -----------------------------------------------------------------------

const SELECT_BY_DOMAIN: &str = "SELECT meta::id(id) AS record_id, * \
     FROM tenant \
     WHERE domain_name = $domain";

/// SurrealDB implementation of the Tenant repository and the
/// resolver-facing routing store.
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealTenantRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>, DbError> {
        let mut result = self
            .db
            .query(SELECT_BY_DOMAIN)
            .bind(("domain", domain.to_string()))
            .await?;
        let rows: Vec<TenantRowWithId> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(TenantRowWithId::try_into_tenant)
            .transpose()
    }

    async fn fetch(&self, domain: &str) -> Result<Tenant, DbError> {
        self.find_by_domain(domain)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "tenant".into(),
                key: domain.to_string(),
            })
    }

    /// Write back every child collection of the aggregate in one
    /// statement. The arrays are always written together because the
    /// delete cascades touch more than one of them.
    async fn persist_children(&self, tenant: &Tenant) -> Result<(), DbError> {
        let sip_clients: Vec<SipClientRow> =
            tenant.sip_clients.iter().map(SipClientRow::from).collect();
        let dialplan: Vec<DialplanEntryRow> =
            tenant.dialplan.iter().map(DialplanEntryRow::from).collect();
        let groups: Vec<GroupRow> = tenant.groups.iter().map(GroupRow::from).collect();
        let dids: Vec<DidRow> = tenant.dids.iter().map(DidRow::from).collect();

        self.db
            .query(
                "UPDATE type::record('tenant', $id) SET \
                 sip_clients = $sip_clients, \
                 dialplan = $dialplan, \
                 groups = $groups, \
                 dids = $dids, \
                 updated_at = time::now()",
            )
            .bind(("id", tenant.id.to_string()))
            .bind(("sip_clients", sip_clients))
            .bind(("dialplan", dialplan))
            .bind(("groups", groups))
            .bind(("dids", dids))
            .await?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;
        Ok(())
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant) -> PatchbayResult<Tenant> {
        if self.find_by_domain(&input.domain_name).await?.is_some() {
            return Err(DbError::AlreadyExists {
                entity: "tenant".into(),
                key: input.domain_name,
            }
            .into());
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let profile = ProfileRow::from(&input.profile.unwrap_or_default());

        let mut result = self
            .db
            .query(
                "CREATE type::record('tenant', $id) SET \
                 domain_name = $domain_name, \
                 profile = $profile, \
                 sip_clients = [], \
                 dialplan = [], \
                 groups = [], \
                 dids = []",
            )
            .bind(("id", id_str.clone()))
            .bind(("domain_name", input.domain_name))
            .bind(("profile", profile))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "tenant".into(),
            key: id_str,
        })?;

        Ok(row.into_tenant(id)?)
    }

    async fn get_by_domain(&self, domain: &str) -> PatchbayResult<Tenant> {
        Ok(self.fetch(domain).await?)
    }

    async fn update(&self, domain: &str, input: UpdateTenant) -> PatchbayResult<Tenant> {
        let tenant = self.fetch(domain).await?;

        if let Some(profile) = input.profile {
            self.db
                .query(
                    "UPDATE type::record('tenant', $id) SET \
                     profile = $profile, updated_at = time::now()",
                )
                .bind(("id", tenant.id.to_string()))
                .bind(("profile", ProfileRow::from(&profile)))
                .await
                .map_err(DbError::from)?
                .check()
                .map_err(|e| DbError::Migration(e.to_string()))?;
        }

        Ok(self.fetch(domain).await?)
    }

    async fn delete(&self, domain: &str) -> PatchbayResult<()> {
        let tenant = self.fetch(domain).await?;
        self.db
            .query("DELETE type::record('tenant', $id)")
            .bind(("id", tenant.id.to_string()))
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn list(&self) -> PatchbayResult<Vec<Tenant>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM tenant \
                 ORDER BY domain_name ASC",
            )
            .await
            .map_err(DbError::from)?;
        let rows: Vec<TenantRowWithId> = result.take(0).map_err(DbError::from)?;
        let tenants = rows
            .into_iter()
            .map(TenantRowWithId::try_into_tenant)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(tenants)
    }

    // -- SIP clients ------------------------------------------------------

    async fn add_sip_client(&self, domain: &str, client: SipClient) -> PatchbayResult<SipClient> {
        let mut tenant = self.fetch(domain).await?;
        if tenant.sip_client(&client.user_id).is_some() {
            return Err(DbError::AlreadyExists {
                entity: "sip_client".into(),
                key: client.user_id,
            }
            .into());
        }
        tenant.sip_clients.push(client.clone());
        self.persist_children(&tenant).await?;
        Ok(client)
    }

    async fn update_sip_client(&self, domain: &str, client: SipClient) -> PatchbayResult<SipClient> {
        let mut tenant = self.fetch(domain).await?;
        let slot = tenant
            .sip_clients
            .iter_mut()
            .find(|c| c.user_id == client.user_id)
            .ok_or_else(|| DbError::NotFound {
                entity: "sip_client".into(),
                key: client.user_id.clone(),
            })?;
        *slot = client.clone();
        self.persist_children(&tenant).await?;
        Ok(client)
    }

    async fn delete_sip_client(&self, domain: &str, user_id: &str) -> PatchbayResult<()> {
        let mut tenant = self.fetch(domain).await?;
        let before = tenant.sip_clients.len();
        tenant.sip_clients.retain(|c| c.user_id != user_id);
        if tenant.sip_clients.len() == before {
            return Err(DbError::NotFound {
                entity: "sip_client".into(),
                key: user_id.to_string(),
            }
            .into());
        }

        // Cascade: drop from group member lists and re-point DIDs.
        for group in &mut tenant.groups {
            group.members.retain(|m| m.user_id != user_id);
        }
        for did in &mut tenant.dids {
            if did.routing_type == RoutingType::Extension && did.routing_target == user_id {
                did.routing_type = RoutingType::Custom;
                did.routing_target = UNASSIGNED_TARGET.to_string();
            }
        }

        self.persist_children(&tenant).await?;
        Ok(())
    }

    // -- Groups -----------------------------------------------------------

    async fn add_group(&self, domain: &str, group: Group) -> PatchbayResult<Group> {
        let mut tenant = self.fetch(domain).await?;
        if tenant.group(&group.name).is_some() {
            return Err(DbError::AlreadyExists {
                entity: "group".into(),
                key: group.name,
            }
            .into());
        }
        tenant.groups.push(group.clone());
        self.persist_children(&tenant).await?;
        Ok(group)
    }

    async fn update_group(&self, domain: &str, group: Group) -> PatchbayResult<Group> {
        let mut tenant = self.fetch(domain).await?;
        let slot = tenant
            .groups
            .iter_mut()
            .find(|g| g.name == group.name)
            .ok_or_else(|| DbError::NotFound {
                entity: "group".into(),
                key: group.name.clone(),
            })?;
        *slot = group.clone();
        self.persist_children(&tenant).await?;
        Ok(group)
    }

    async fn delete_group(&self, domain: &str, name: &str) -> PatchbayResult<()> {
        let mut tenant = self.fetch(domain).await?;
        let before = tenant.groups.len();
        tenant.groups.retain(|g| g.name != name);
        if tenant.groups.len() == before {
            return Err(DbError::NotFound {
                entity: "group".into(),
                key: name.to_string(),
            }
            .into());
        }

        // Cascade: re-point DIDs that routed to the deleted group.
        for did in &mut tenant.dids {
            if did.routing_type == RoutingType::Group && did.routing_target == name {
                did.routing_type = RoutingType::Custom;
                did.routing_target = UNASSIGNED_TARGET.to_string();
            }
        }

        self.persist_children(&tenant).await?;
        Ok(())
    }

    // -- DIDs -------------------------------------------------------------

    async fn add_did(&self, domain: &str, mut did: Did) -> PatchbayResult<Did> {
        did.did_number = canonical_did(&did.did_number);
        let mut tenant = self.fetch(domain).await?;
        if tenant.did(&did.did_number).is_some() {
            return Err(DbError::AlreadyExists {
                entity: "did".into(),
                key: did.did_number,
            }
            .into());
        }
        tenant.dids.push(did.clone());
        self.persist_children(&tenant).await?;
        Ok(did)
    }

    async fn update_did(&self, domain: &str, mut did: Did) -> PatchbayResult<Did> {
        did.did_number = canonical_did(&did.did_number);
        let mut tenant = self.fetch(domain).await?;
        let slot = tenant
            .dids
            .iter_mut()
            .find(|d| d.did_number == did.did_number)
            .ok_or_else(|| DbError::NotFound {
                entity: "did".into(),
                key: did.did_number.clone(),
            })?;
        *slot = did.clone();
        self.persist_children(&tenant).await?;
        Ok(did)
    }

    async fn delete_did(&self, domain: &str, did_number: &str) -> PatchbayResult<()> {
        let canonical = canonical_did(did_number);
        let mut tenant = self.fetch(domain).await?;
        let before = tenant.dids.len();
        tenant.dids.retain(|d| d.did_number != canonical);
        if tenant.dids.len() == before {
            return Err(DbError::NotFound {
                entity: "did".into(),
                key: canonical,
            }
            .into());
        }
        self.persist_children(&tenant).await?;
        Ok(())
    }

    // -- Dialplan entries -------------------------------------------------

    async fn add_dialplan_entry(
        &self,
        domain: &str,
        entry: DialplanEntry,
    ) -> PatchbayResult<DialplanEntry> {
        let mut tenant = self.fetch(domain).await?;
        if tenant.dialplan.iter().any(|e| e.name == entry.name) {
            return Err(DbError::AlreadyExists {
                entity: "dialplan_entry".into(),
                key: entry.name,
            }
            .into());
        }
        tenant.dialplan.push(entry.clone());
        self.persist_children(&tenant).await?;
        Ok(entry)
    }

    async fn update_dialplan_entry(
        &self,
        domain: &str,
        entry: DialplanEntry,
    ) -> PatchbayResult<DialplanEntry> {
        let mut tenant = self.fetch(domain).await?;
        let slot = tenant
            .dialplan
            .iter_mut()
            .find(|e| e.name == entry.name)
            .ok_or_else(|| DbError::NotFound {
                entity: "dialplan_entry".into(),
                key: entry.name.clone(),
            })?;
        *slot = entry.clone();
        self.persist_children(&tenant).await?;
        Ok(entry)
    }

    async fn delete_dialplan_entry(&self, domain: &str, name: &str) -> PatchbayResult<()> {
        let mut tenant = self.fetch(domain).await?;
        let before = tenant.dialplan.len();
        tenant.dialplan.retain(|e| e.name != name);
        if tenant.dialplan.len() == before {
            return Err(DbError::NotFound {
                entity: "dialplan_entry".into(),
                key: name.to_string(),
            }
            .into());
        }
        self.persist_children(&tenant).await?;
        Ok(())
    }
}

impl<C: Connection> RoutingStore for SurrealTenantRepository<C> {
    async fn tenant_by_domain(&self, domain: &str) -> PatchbayResult<Option<Tenant>> {
        Ok(self.find_by_domain(domain).await?)
    }

    async fn tenant_by_did(&self, did_number: &str) -> PatchbayResult<Option<Tenant>> {
        let canonical = canonical_did(did_number);
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM tenant \
                 WHERE count(dids[WHERE did_number = $did AND active = true]) > 0",
            )
            .bind(("did", canonical))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<TenantRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(TenantRowWithId::try_into_tenant)
            .transpose()?)
    }

    async fn find_sip_client(&self, domain: &str, user_id: &str) -> PatchbayResult<Option<SipClient>> {
        let tenant = self.find_by_domain(domain).await?;
        Ok(tenant.and_then(|t| t.sip_client(user_id).cloned()))
    }
}
