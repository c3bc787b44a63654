//! SurrealDB repository implementations.

mod gateway;
mod tenant;

pub use gateway::SurrealGatewayRepository;
pub use tenant::SurrealTenantRepository;
