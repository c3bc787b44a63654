//! The switch-facing HTTP endpoint and application state.
//!
//! A single `POST /` accepts the switch's request variables as a form
//! body and dispatches on the `section` field. Every well-formed
//! response is 200 with `application/xml` (the switch inspects
//! content, not status). 400 means the section was missing, 404 that
//! it was unrecognized.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::{Form, Router};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use patchbay_db::{SurrealGatewayRepository, SurrealTenantRepository};
use patchbay_resolver::{
    CnamClient, CnamCredentials, ConfigurationService, DialplanService, DirectoryService,
    ResolverConfig, SwitchVars, program,
    xml::{self, EMPTY_DOCUMENT, NOT_FOUND_DOCUMENT},
};
use surrealdb::{Connection, Surreal};
use tokio::time::timeout;
use tracing::error;

use crate::admin;

/// Shared application state: repositories plus the three resolvers,
/// all built once at startup over the same connection.
pub struct AppState<C: Connection> {
    pub tenants: SurrealTenantRepository<C>,
    pub gateways: SurrealGatewayRepository<C>,
    pub dialplan: DialplanService<SurrealTenantRepository<C>, SurrealGatewayRepository<C>>,
    pub directory: DirectoryService<SurrealTenantRepository<C>>,
    pub configuration: ConfigurationService<SurrealGatewayRepository<C>>,
    request_budget: Duration,
}

impl<C: Connection> AppState<C> {
    pub fn new(
        db: Surreal<C>,
        resolver_config: ResolverConfig,
        cnam_credentials: Option<CnamCredentials>,
    ) -> Arc<Self> {
        let tenants = SurrealTenantRepository::new(db.clone());
        let gateways = SurrealGatewayRepository::new(db);
        let cnam = CnamClient::new(cnam_credentials, resolver_config.cnam_timeout);
        Arc::new(Self {
            dialplan: DialplanService::new(
                tenants.clone(),
                gateways.clone(),
                cnam,
                resolver_config.clone(),
            ),
            directory: DirectoryService::new(tenants.clone(), resolver_config.clone()),
            configuration: ConfigurationService::new(gateways.clone(), resolver_config.clone()),
            request_budget: resolver_config.request_budget,
            tenants,
            gateways,
        })
    }
}

/// The full application router: switch endpoint at `/`, admin REST
/// under `/api/v1`.
pub fn router<C: Connection>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/", post(switch_lookup::<C>))
        .nest("/api/v1", admin::router::<C>())
        .with_state(state)
}

fn xml_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        body,
    )
        .into_response()
}

async fn switch_lookup<C: Connection>(
    State(state): State<Arc<AppState<C>>>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let vars = SwitchVars::from(params);
    let Some(section) = vars.section() else {
        return (StatusCode::BAD_REQUEST, "missing section").into_response();
    };

    // The overall request budget is enforced here at the edge; an
    // elapsed budget still yields a valid document for its section.
    let budget = state.request_budget;
    let body = match section {
        "dialplan" => match timeout(budget, state.dialplan.resolve(&vars)).await {
            Ok(doc) => doc,
            Err(_) => {
                error!(destination = ?vars.destination(), "dialplan request exceeded budget");
                xml::render_dialplan(
                    vars.dialplan_context(),
                    &program::application_error(vars.destination()),
                )
            }
        },
        "directory" => match timeout(budget, state.directory.resolve(&vars)).await {
            Ok(doc) => doc,
            Err(_) => {
                error!(user = ?vars.directory_user(), "directory request exceeded budget");
                EMPTY_DOCUMENT.to_string()
            }
        },
        "configuration" => match timeout(budget, state.configuration.resolve(&vars)).await {
            Ok(doc) => doc,
            Err(_) => {
                error!(key = ?vars.config_key(), "configuration request exceeded budget");
                NOT_FOUND_DOCUMENT.to_string()
            }
        },
        other => {
            return (
                StatusCode::NOT_FOUND,
                format!("unknown section '{other}'"),
            )
                .into_response();
        }
    };

    xml_response(body)
}
