//! Admin REST surface: JSON CRUD for tenants, their embedded
//! children, and the global gateway pool.
//!
//! Status mapping: 200/201/204 on success, 404 for a missing
//! aggregate or child, 409 on uniqueness conflicts, 400 for
//! validation failures, 500 for store errors.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::{Json, Router};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use patchbay_core::PatchbayError;
use patchbay_core::models::dialplan::DialplanEntry;
use patchbay_core::models::did::Did;
use patchbay_core::models::gateway::{CreateGateway, UpdateGateway};
use patchbay_core::models::group::Group;
use patchbay_core::models::sip_client::SipClient;
use patchbay_core::models::tenant::{CreateTenant, UpdateTenant};
use patchbay_core::repository::{GatewayRepository, TenantRepository};
use serde_json::json;
use surrealdb::Connection;
use tracing::error;

use crate::http::AppState;

pub fn router<C: Connection>() -> Router<Arc<AppState<C>>> {
    Router::new()
        .route(
            "/tenants",
            post(create_tenant::<C>).get(list_tenants::<C>),
        )
        .route(
            "/tenants/{domain}",
            get(get_tenant::<C>)
                .put(update_tenant::<C>)
                .delete(delete_tenant::<C>),
        )
        .route("/tenants/{domain}/clients", post(add_client::<C>))
        .route(
            "/tenants/{domain}/clients/{user_id}",
            put(update_client::<C>).delete(delete_client::<C>),
        )
        .route("/tenants/{domain}/groups", post(add_group::<C>))
        .route(
            "/tenants/{domain}/groups/{name}",
            put(update_group::<C>).delete(delete_group::<C>),
        )
        .route("/tenants/{domain}/dids", post(add_did::<C>))
        .route(
            "/tenants/{domain}/dids/{did_number}",
            put(update_did::<C>).delete(delete_did::<C>),
        )
        .route("/tenants/{domain}/dialplan", post(add_dialplan_entry::<C>))
        .route(
            "/tenants/{domain}/dialplan/{name}",
            put(update_dialplan_entry::<C>).delete(delete_dialplan_entry::<C>),
        )
        .route(
            "/gateways",
            post(create_gateway::<C>).get(list_gateways::<C>),
        )
        .route(
            "/gateways/{name}",
            get(get_gateway::<C>)
                .put(update_gateway::<C>)
                .delete(delete_gateway::<C>),
        )
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn error_response(err: PatchbayError) -> Response {
    let status = match &err {
        PatchbayError::NotFound { .. } => StatusCode::NOT_FOUND,
        PatchbayError::AlreadyExists { .. } => StatusCode::CONFLICT,
        PatchbayError::Validation { .. } => StatusCode::BAD_REQUEST,
        PatchbayError::Database(_) | PatchbayError::Timeout { .. } | PatchbayError::Internal(_) => {
            error!(error = %err, "admin request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message })),
    )
        .into_response()
}

fn created<T: serde::Serialize>(body: T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

fn ok<T: serde::Serialize>(body: T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

// ---------------------------------------------------------------------------
// Tenants
// ---------------------------------------------------------------------------

async fn create_tenant<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Json(input): Json<CreateTenant>,
) -> Response {
    if input.domain_name.trim().is_empty() {
        return bad_request("domain_name must not be empty");
    }
    match state.tenants.create(input).await {
        Ok(tenant) => created(tenant),
        Err(e) => error_response(e),
    }
}

async fn list_tenants<C: Connection>(State(state): State<Arc<AppState<C>>>) -> Response {
    match state.tenants.list().await {
        Ok(tenants) => ok(tenants),
        Err(e) => error_response(e),
    }
}

async fn get_tenant<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path(domain): Path<String>,
) -> Response {
    match state.tenants.get_by_domain(&domain).await {
        Ok(tenant) => ok(tenant),
        Err(e) => error_response(e),
    }
}

async fn update_tenant<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path(domain): Path<String>,
    Json(input): Json<UpdateTenant>,
) -> Response {
    match state.tenants.update(&domain, input).await {
        Ok(tenant) => ok(tenant),
        Err(e) => error_response(e),
    }
}

async fn delete_tenant<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path(domain): Path<String>,
) -> Response {
    match state.tenants.delete(&domain).await {
        Ok(()) => no_content(),
        Err(e) => error_response(e),
    }
}

// ---------------------------------------------------------------------------
// SIP clients
// ---------------------------------------------------------------------------

async fn add_client<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path(domain): Path<String>,
    Json(client): Json<SipClient>,
) -> Response {
    if client.user_id.trim().is_empty() {
        return bad_request("user_id must not be empty");
    }
    match state.tenants.add_sip_client(&domain, client).await {
        Ok(client) => created(client),
        Err(e) => error_response(e),
    }
}

async fn update_client<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path((domain, user_id)): Path<(String, String)>,
    Json(mut client): Json<SipClient>,
) -> Response {
    client.user_id = user_id;
    match state.tenants.update_sip_client(&domain, client).await {
        Ok(client) => ok(client),
        Err(e) => error_response(e),
    }
}

async fn delete_client<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path((domain, user_id)): Path<(String, String)>,
) -> Response {
    match state.tenants.delete_sip_client(&domain, &user_id).await {
        Ok(()) => no_content(),
        Err(e) => error_response(e),
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

async fn add_group<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path(domain): Path<String>,
    Json(group): Json<Group>,
) -> Response {
    if group.name.trim().is_empty() {
        return bad_request("name must not be empty");
    }
    match state.tenants.add_group(&domain, group).await {
        Ok(group) => created(group),
        Err(e) => error_response(e),
    }
}

async fn update_group<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path((domain, name)): Path<(String, String)>,
    Json(mut group): Json<Group>,
) -> Response {
    group.name = name;
    match state.tenants.update_group(&domain, group).await {
        Ok(group) => ok(group),
        Err(e) => error_response(e),
    }
}

async fn delete_group<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path((domain, name)): Path<(String, String)>,
) -> Response {
    match state.tenants.delete_group(&domain, &name).await {
        Ok(()) => no_content(),
        Err(e) => error_response(e),
    }
}

// ---------------------------------------------------------------------------
// DIDs
// ---------------------------------------------------------------------------

async fn add_did<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path(domain): Path<String>,
    Json(did): Json<Did>,
) -> Response {
    if did.did_number.trim().is_empty() {
        return bad_request("did_number must not be empty");
    }
    match state.tenants.add_did(&domain, did).await {
        Ok(did) => created(did),
        Err(e) => error_response(e),
    }
}

async fn update_did<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path((domain, did_number)): Path<(String, String)>,
    Json(mut did): Json<Did>,
) -> Response {
    did.did_number = did_number;
    match state.tenants.update_did(&domain, did).await {
        Ok(did) => ok(did),
        Err(e) => error_response(e),
    }
}

async fn delete_did<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path((domain, did_number)): Path<(String, String)>,
) -> Response {
    match state.tenants.delete_did(&domain, &did_number).await {
        Ok(()) => no_content(),
        Err(e) => error_response(e),
    }
}

// ---------------------------------------------------------------------------
// Dialplan entries
// ---------------------------------------------------------------------------

async fn add_dialplan_entry<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path(domain): Path<String>,
    Json(entry): Json<DialplanEntry>,
) -> Response {
    if entry.name.trim().is_empty() {
        return bad_request("name must not be empty");
    }
    match state.tenants.add_dialplan_entry(&domain, entry).await {
        Ok(entry) => created(entry),
        Err(e) => error_response(e),
    }
}

async fn update_dialplan_entry<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path((domain, name)): Path<(String, String)>,
    Json(mut entry): Json<DialplanEntry>,
) -> Response {
    entry.name = name;
    match state.tenants.update_dialplan_entry(&domain, entry).await {
        Ok(entry) => ok(entry),
        Err(e) => error_response(e),
    }
}

async fn delete_dialplan_entry<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path((domain, name)): Path<(String, String)>,
) -> Response {
    match state.tenants.delete_dialplan_entry(&domain, &name).await {
        Ok(()) => no_content(),
        Err(e) => error_response(e),
    }
}

// ---------------------------------------------------------------------------
// Gateways
// ---------------------------------------------------------------------------

async fn create_gateway<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Json(input): Json<CreateGateway>,
) -> Response {
    if input.name.trim().is_empty() {
        return bad_request("name must not be empty");
    }
    match state.gateways.create(input).await {
        Ok(gateway) => created(gateway),
        Err(e) => error_response(e),
    }
}

async fn list_gateways<C: Connection>(State(state): State<Arc<AppState<C>>>) -> Response {
    match state.gateways.list().await {
        Ok(gateways) => ok(gateways),
        Err(e) => error_response(e),
    }
}

async fn get_gateway<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path(name): Path<String>,
) -> Response {
    match state.gateways.get_by_name(&name).await {
        Ok(gateway) => ok(gateway),
        Err(e) => error_response(e),
    }
}

async fn update_gateway<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path(name): Path<String>,
    Json(input): Json<UpdateGateway>,
) -> Response {
    match state.gateways.update(&name, input).await {
        Ok(gateway) => ok(gateway),
        Err(e) => error_response(e),
    }
}

async fn delete_gateway<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Path(name): Path<String>,
) -> Response {
    match state.gateways.delete(&name).await {
        Ok(()) => no_content(),
        Err(e) => error_response(e),
    }
}
