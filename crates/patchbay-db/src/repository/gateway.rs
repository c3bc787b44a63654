//! SurrealDB implementation of [`GatewayRepository`].

use chrono::{DateTime, Utc};
use patchbay_core::error::PatchbayResult;
use patchbay_core::models::gateway::{
    CreateGateway, DEFAULT_CODEC_PREFS, DEFAULT_DTMF_TYPE, DEFAULT_REGISTER_TRANSPORT, Gateway,
    UpdateGateway,
};
use patchbay_core::repository::GatewayRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct GatewayRow {
    name: String,
    realm: String,
    username: String,
    password: String,
    proxy: Option<String>,
    register: bool,
    register_transport: String,
    dtmf_type: String,
    codec_prefs: String,
    secure_media: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GatewayRow {
    fn into_gateway(self, id: Uuid) -> Gateway {
        Gateway {
            id,
            name: self.name,
            realm: self.realm,
            username: self.username,
            password: self.password,
            proxy: self.proxy,
            register: self.register,
            register_transport: self.register_transport,
            dtmf_type: self.dtmf_type,
            codec_prefs: self.codec_prefs,
            secure_media: self.secure_media,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct GatewayRowWithId {
    record_id: String,
    name: String,
    realm: String,
    username: String,
    password: String,
    proxy: Option<String>,
    register: bool,
    register_transport: String,
    dtmf_type: String,
    codec_prefs: String,
    secure_media: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GatewayRowWithId {
    fn try_into_gateway(self) -> Result<Gateway, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid gateway UUID: {e}")))?;
        Ok(Gateway {
            id,
            name: self.name,
            realm: self.realm,
            username: self.username,
            password: self.password,
            proxy: self.proxy,
            register: self.register,
            register_transport: self.register_transport,
            dtmf_type: self.dtmf_type,
            codec_prefs: self.codec_prefs,
            secure_media: self.secure_media,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_BY_NAME: &str = "SELECT meta::id(id) AS record_id, * \
     FROM external_gateway \
     WHERE name = $name";

/// SurrealDB implementation of the gateway repository.
pub struct SurrealGatewayRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealGatewayRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealGatewayRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Gateway>, DbError> {
        let mut result = self
            .db
            .query(SELECT_BY_NAME)
            .bind(("name", name.to_string()))
            .await?;
        let rows: Vec<GatewayRowWithId> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(GatewayRowWithId::try_into_gateway)
            .transpose()
    }
}

impl<C: Connection> GatewayRepository for SurrealGatewayRepository<C> {
    async fn create(&self, input: CreateGateway) -> PatchbayResult<Gateway> {
        if self.find_by_name(&input.name).await?.is_some() {
            return Err(DbError::AlreadyExists {
                entity: "gateway".into(),
                key: input.name,
            }
            .into());
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "CREATE type::record('external_gateway', $id) SET \
                 name = $name, \
                 realm = $realm, \
                 username = $username, \
                 password = $password, \
                 proxy = $proxy, \
                 register = $register, \
                 register_transport = $register_transport, \
                 dtmf_type = $dtmf_type, \
                 codec_prefs = $codec_prefs, \
                 secure_media = $secure_media",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("realm", input.realm))
            .bind(("username", input.username))
            .bind(("password", input.password))
            .bind(("proxy", input.proxy))
            .bind(("register", input.register.unwrap_or(false)))
            .bind((
                "register_transport",
                input
                    .register_transport
                    .unwrap_or_else(|| DEFAULT_REGISTER_TRANSPORT.to_string()),
            ))
            .bind((
                "dtmf_type",
                input
                    .dtmf_type
                    .unwrap_or_else(|| DEFAULT_DTMF_TYPE.to_string()),
            ))
            .bind((
                "codec_prefs",
                input
                    .codec_prefs
                    .unwrap_or_else(|| DEFAULT_CODEC_PREFS.to_string()),
            ))
            .bind(("secure_media", input.secure_media))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GatewayRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "gateway".into(),
            key: id_str,
        })?;

        Ok(row.into_gateway(id))
    }

    async fn get_by_name(&self, name: &str) -> PatchbayResult<Gateway> {
        let gateway = self
            .find_by_name(name)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "gateway".into(),
                key: name.to_string(),
            })?;
        Ok(gateway)
    }

    async fn update(&self, name: &str, input: UpdateGateway) -> PatchbayResult<Gateway> {
        let existing = self.get_by_name(name).await?;

        let mut sets = Vec::new();
        if input.realm.is_some() {
            sets.push("realm = $realm");
        }
        if input.username.is_some() {
            sets.push("username = $username");
        }
        if input.password.is_some() {
            sets.push("password = $password");
        }
        if input.proxy.is_some() {
            sets.push("proxy = $proxy");
        }
        if input.register.is_some() {
            sets.push("register = $register");
        }
        if input.register_transport.is_some() {
            sets.push("register_transport = $register_transport");
        }
        if input.dtmf_type.is_some() {
            sets.push("dtmf_type = $dtmf_type");
        }
        if input.codec_prefs.is_some() {
            sets.push("codec_prefs = $codec_prefs");
        }
        if input.secure_media.is_some() {
            sets.push("secure_media = $secure_media");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('external_gateway', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", existing.id.to_string()));

        if let Some(realm) = input.realm {
            builder = builder.bind(("realm", realm));
        }
        if let Some(username) = input.username {
            builder = builder.bind(("username", username));
        }
        if let Some(password) = input.password {
            builder = builder.bind(("password", password));
        }
        if let Some(proxy) = input.proxy {
            builder = builder.bind(("proxy", proxy));
        }
        if let Some(register) = input.register {
            builder = builder.bind(("register", register));
        }
        if let Some(register_transport) = input.register_transport {
            builder = builder.bind(("register_transport", register_transport));
        }
        if let Some(dtmf_type) = input.dtmf_type {
            builder = builder.bind(("dtmf_type", dtmf_type));
        }
        if let Some(codec_prefs) = input.codec_prefs {
            builder = builder.bind(("codec_prefs", codec_prefs));
        }
        if let Some(secure_media) = input.secure_media {
            builder = builder.bind(("secure_media", secure_media));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<GatewayRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "gateway".into(),
            key: name.to_string(),
        })?;

        Ok(row.into_gateway(existing.id))
    }

    async fn delete(&self, name: &str) -> PatchbayResult<()> {
        let existing = self.get_by_name(name).await?;
        self.db
            .query("DELETE type::record('external_gateway', $id)")
            .bind(("id", existing.id.to_string()))
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn list(&self) -> PatchbayResult<Vec<Gateway>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM external_gateway \
                 ORDER BY created_at ASC",
            )
            .await
            .map_err(DbError::from)?;
        let rows: Vec<GatewayRowWithId> = result.take(0).map_err(DbError::from)?;
        let gateways = rows
            .into_iter()
            .map(GatewayRowWithId::try_into_gateway)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(gateways)
    }
}
