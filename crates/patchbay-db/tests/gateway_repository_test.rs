//! Integration tests for the gateway repository using in-memory
//! SurrealDB.

use patchbay_core::PatchbayError;
use patchbay_core::models::gateway::{CreateGateway, UpdateGateway};
use patchbay_core::repository::GatewayRepository;
use patchbay_db::SurrealGatewayRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    patchbay_db::run_migrations(&db).await.unwrap();
    db
}

fn create_input(name: &str) -> CreateGateway {
    CreateGateway {
        name: name.into(),
        realm: "sip.carrier.example".into(),
        username: "acct".into(),
        password: "pw".into(),
        proxy: None,
        register: Some(true),
        register_transport: None,
        dtmf_type: None,
        codec_prefs: None,
        secure_media: None,
    }
}

#[tokio::test]
async fn create_applies_defaults() {
    let db = setup().await;
    let repo = SurrealGatewayRepository::new(db);

    let gw = repo.create(create_input("sw1")).await.unwrap();
    assert_eq!(gw.name, "sw1");
    assert!(gw.register);
    assert_eq!(gw.register_transport, "udp");
    assert_eq!(gw.dtmf_type, "rfc2833");
    assert_eq!(gw.codec_prefs, "PCMU,PCMA");

    let fetched = repo.get_by_name("sw1").await.unwrap();
    assert_eq!(fetched.id, gw.id);
}

#[tokio::test]
async fn duplicate_name_conflicts() {
    let db = setup().await;
    let repo = SurrealGatewayRepository::new(db);

    repo.create(create_input("sw1")).await.unwrap();
    let err = repo.create(create_input("sw1")).await.unwrap_err();
    assert!(matches!(err, PatchbayError::AlreadyExists { .. }));
}

#[tokio::test]
async fn update_changes_only_provided_fields() {
    let db = setup().await;
    let repo = SurrealGatewayRepository::new(db);

    repo.create(create_input("sw1")).await.unwrap();
    let updated = repo
        .update(
            "sw1",
            UpdateGateway {
                proxy: Some(Some("sip-proxy.carrier.example".into())),
                codec_prefs: Some("OPUS,PCMU".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.proxy.as_deref(), Some("sip-proxy.carrier.example"));
    assert_eq!(updated.codec_prefs, "OPUS,PCMU");
    assert_eq!(updated.realm, "sip.carrier.example"); // unchanged
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let db = setup().await;
    let repo = SurrealGatewayRepository::new(db);

    repo.create(create_input("sw1")).await.unwrap();
    repo.delete("sw1").await.unwrap();

    let result = repo.get_by_name("sw1").await;
    assert!(matches!(result, Err(PatchbayError::NotFound { .. })));

    let result = repo.delete("sw1").await;
    assert!(matches!(result, Err(PatchbayError::NotFound { .. })));
}

#[tokio::test]
async fn list_returns_creation_order() {
    let db = setup().await;
    let repo = SurrealGatewayRepository::new(db);

    repo.create(create_input("sw1")).await.unwrap();
    repo.create(create_input("sw2")).await.unwrap();

    let names: Vec<String> = repo
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(names, vec!["sw1".to_string(), "sw2".to_string()]);
}
