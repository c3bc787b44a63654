//! Integration tests for the tenant repository and routing store
//! implementations using in-memory SurrealDB.

use patchbay_core::models::dialplan::{DialplanAction, DialplanEntry};
use patchbay_core::models::did::{Did, RoutingType, UNASSIGNED_TARGET};
use patchbay_core::models::group::{Group, GroupMember, GroupType, RingStrategy};
use patchbay_core::models::sip_client::SipClient;
use patchbay_core::models::tenant::{CreateTenant, TenantProfile, UpdateTenant};
use patchbay_core::repository::{RoutingStore, TenantRepository};
use patchbay_core::PatchbayError;
use patchbay_db::SurrealTenantRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    patchbay_db::run_migrations(&db).await.unwrap();
    db
}

fn client(user_id: &str) -> SipClient {
    SipClient {
        user_id: user_id.into(),
        password: "secret".into(),
        display_name: Some(format!("Ext {user_id}")),
        enable_voicemail: true,
        voicemail_pin: Some("1234".into()),
        voicemail_email: None,
        no_answer_timeout: Some(25),
        local_caller_id_name: None,
    }
}

fn hunt_group(name: &str, members: &[&str]) -> Group {
    Group {
        name: name.into(),
        group_type: GroupType::Hunt,
        timeout: Some(20),
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

fn did_to_extension(number: &str, target: &str) -> Did {
    Did {
        did_number: number.into(),
        active: true,
        routing_type: RoutingType::Extension,
        routing_target: target.into(),
        failover_routing_type: None,
        failover_routing_target: None,
        voicemail_pin: None,
    }
}

// -----------------------------------------------------------------------
// Tenant aggregate
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_tenant() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    let tenant = repo
        .create(CreateTenant {
            domain_name: "a.example".into(),
            profile: Some(TenantProfile {
                display_name: "Tenant A".into(),
                description: "first tenant".into(),
                timezone: None,
            }),
        })
        .await
        .unwrap();

    assert_eq!(tenant.domain_name, "a.example");
    assert!(tenant.sip_clients.is_empty());

    let fetched = repo.get_by_domain("a.example").await.unwrap();
    assert_eq!(fetched.id, tenant.id);
    assert_eq!(fetched.profile.display_name, "Tenant A");
}

#[tokio::test]
async fn duplicate_domain_conflicts() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.create(CreateTenant {
        domain_name: "a.example".into(),
        profile: None,
    })
    .await
    .unwrap();

    let err = repo
        .create(CreateTenant {
            domain_name: "a.example".into(),
            profile: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PatchbayError::AlreadyExists { .. }));
}

#[tokio::test]
async fn update_and_delete_tenant() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.create(CreateTenant {
        domain_name: "a.example".into(),
        profile: None,
    })
    .await
    .unwrap();

    let updated = repo
        .update(
            "a.example",
            UpdateTenant {
                profile: Some(TenantProfile {
                    display_name: "Renamed".into(),
                    description: String::new(),
                    timezone: Some("America/Chicago".into()),
                }),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.profile.display_name, "Renamed");

    repo.delete("a.example").await.unwrap();
    let result = repo.get_by_domain("a.example").await;
    assert!(matches!(result, Err(PatchbayError::NotFound { .. })));
}

// -----------------------------------------------------------------------
// Embedded children
// -----------------------------------------------------------------------

#[tokio::test]
async fn sip_clients_round_trip_in_order() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.create(CreateTenant {
        domain_name: "a.example".into(),
        profile: None,
    })
    .await
    .unwrap();

    repo.add_sip_client("a.example", client("1001")).await.unwrap();
    repo.add_sip_client("a.example", client("1002")).await.unwrap();
    repo.add_sip_client("a.example", client("1003")).await.unwrap();

    let tenant = repo.get_by_domain("a.example").await.unwrap();
    let ids: Vec<&str> = tenant
        .sip_clients
        .iter()
        .map(|c| c.user_id.as_str())
        .collect();
    assert_eq!(ids, vec!["1001", "1002", "1003"]);
    assert_eq!(tenant.sip_clients[0].no_answer_timeout, Some(25));

    let err = repo
        .add_sip_client("a.example", client("1001"))
        .await
        .unwrap_err();
    assert!(matches!(err, PatchbayError::AlreadyExists { .. }));
}

#[tokio::test]
async fn dialplan_entries_keep_declared_actions() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.create(CreateTenant {
        domain_name: "a.example".into(),
        profile: None,
    })
    .await
    .unwrap();

    repo.add_dialplan_entry(
        "a.example",
        DialplanEntry {
            name: "night_bell".into(),
            condition_field: "destination_number".into(),
            condition_expression: "^(7\\d{2})$".into(),
            actions: vec![
                DialplanAction::new("answer", ""),
                DialplanAction::new("playback", "tone_stream://%(200,0,500)"),
            ],
        },
    )
    .await
    .unwrap();

    let tenant = repo.get_by_domain("a.example").await.unwrap();
    assert_eq!(tenant.dialplan.len(), 1);
    assert_eq!(tenant.dialplan[0].actions.len(), 2);
    assert_eq!(tenant.dialplan[0].actions[1].application, "playback");
}

#[tokio::test]
async fn deleting_client_cascades_to_groups_and_dids() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.create(CreateTenant {
        domain_name: "a.example".into(),
        profile: None,
    })
    .await
    .unwrap();
    repo.add_sip_client("a.example", client("1001")).await.unwrap();
    repo.add_sip_client("a.example", client("1002")).await.unwrap();
    repo.add_group("a.example", hunt_group("sales", &["1001", "1002"]))
        .await
        .unwrap();
    repo.add_did("a.example", did_to_extension("+15125551234", "1001"))
        .await
        .unwrap();

    repo.delete_sip_client("a.example", "1001").await.unwrap();

    let tenant = repo.get_by_domain("a.example").await.unwrap();
    let group = tenant.group("sales").unwrap();
    assert_eq!(group.members.len(), 1);
    assert_eq!(group.members[0].user_id, "1002");

    let did = tenant.did("+15125551234").unwrap();
    assert_eq!(did.routing_type, RoutingType::Custom);
    assert_eq!(did.routing_target, UNASSIGNED_TARGET);
}

#[tokio::test]
async fn deleting_group_rewrites_did_targets() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.create(CreateTenant {
        domain_name: "a.example".into(),
        profile: None,
    })
    .await
    .unwrap();
    repo.add_group("a.example", hunt_group("sales", &["1001"]))
        .await
        .unwrap();
    repo.add_did(
        "a.example",
        Did {
            did_number: "+15125551234".into(),
            active: true,
            routing_type: RoutingType::Group,
            routing_target: "sales".into(),
            failover_routing_type: None,
            failover_routing_target: None,
            voicemail_pin: None,
        },
    )
    .await
    .unwrap();

    repo.delete_group("a.example", "sales").await.unwrap();

    let tenant = repo.get_by_domain("a.example").await.unwrap();
    assert!(tenant.groups.is_empty());
    let did = tenant.did("+15125551234").unwrap();
    assert_eq!(did.routing_type, RoutingType::Custom);
    assert_eq!(did.routing_target, UNASSIGNED_TARGET);
}

// -----------------------------------------------------------------------
// Routing store reads
// -----------------------------------------------------------------------

#[tokio::test]
async fn did_numbers_are_canonicalized_and_looked_up() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.create(CreateTenant {
        domain_name: "a.example".into(),
        profile: None,
    })
    .await
    .unwrap();

    // Provisioned as bare ten digits; stored canonically.
    let did = repo
        .add_did("a.example", did_to_extension("5125551234", "1001"))
        .await
        .unwrap();
    assert_eq!(did.did_number, "+15125551234");

    // Ten-digit lookup input is normalized before comparison.
    let tenant = repo.tenant_by_did("5125551234").await.unwrap().unwrap();
    assert_eq!(tenant.domain_name, "a.example");
    let tenant = repo.tenant_by_did("+15125551234").await.unwrap().unwrap();
    assert_eq!(tenant.domain_name, "a.example");
}

#[tokio::test]
async fn inactive_dids_do_not_match() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.create(CreateTenant {
        domain_name: "a.example".into(),
        profile: None,
    })
    .await
    .unwrap();
    repo.add_did(
        "a.example",
        Did {
            active: false,
            ..did_to_extension("+15125551234", "1001")
        },
    )
    .await
    .unwrap();

    assert!(repo.tenant_by_did("+15125551234").await.unwrap().is_none());
}

#[tokio::test]
async fn routing_store_returns_none_for_unknown_keys() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    assert!(repo.tenant_by_domain("nowhere.example").await.unwrap().is_none());
    assert!(repo.tenant_by_did("+15120000000").await.unwrap().is_none());

    repo.create(CreateTenant {
        domain_name: "a.example".into(),
        profile: None,
    })
    .await
    .unwrap();
    repo.add_sip_client("a.example", client("1001")).await.unwrap();

    assert!(repo
        .find_sip_client("a.example", "1001")
        .await
        .unwrap()
        .is_some());
    assert!(repo
        .find_sip_client("a.example", "1099")
        .await
        .unwrap()
        .is_none());
}
