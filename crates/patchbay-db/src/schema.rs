//! Store schema and the upgrade runner.
//!
//! Two SCHEMAFULL tables: `tenant` (one aggregate document per SIP
//! domain, child collections as arrays of FLEXIBLE objects so the
//! aggregate keeps its insertion order) and `external_gateway` (the
//! global carrier pool). Applied schema versions are recorded in
//! `_schema_history`; every DEFINE is written to be safe to re-run.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Version history
// -----------------------------------------------------------------------

const HISTORY_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _schema_history SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _schema_history TYPE int;
DEFINE FIELD IF NOT EXISTS label ON TABLE _schema_history TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _schema_history \
    TYPE datetime DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_schema_history_version \
    ON TABLE _schema_history COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct VersionRow {
    version: u32,
}

/// One step of the schema's history. New steps append to
/// [`UPGRADES`]; existing steps never change once shipped.
struct SchemaUpgrade {
    to_version: u32,
    label: &'static str,
    ddl: &'static str,
}

static UPGRADES: &[SchemaUpgrade] = &[SchemaUpgrade {
    to_version: 1,
    label: "tenants and gateways",
    ddl: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (aggregate documents, one per SIP domain)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD domain_name ON TABLE tenant TYPE string;
DEFINE FIELD profile ON TABLE tenant TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD sip_clients ON TABLE tenant TYPE array DEFAULT [];
DEFINE FIELD sip_clients.* ON TABLE tenant TYPE object FLEXIBLE;
DEFINE FIELD dialplan ON TABLE tenant TYPE array DEFAULT [];
DEFINE FIELD dialplan.* ON TABLE tenant TYPE object FLEXIBLE;
DEFINE FIELD groups ON TABLE tenant TYPE array DEFAULT [];
DEFINE FIELD groups.* ON TABLE tenant TYPE object FLEXIBLE;
DEFINE FIELD dids ON TABLE tenant TYPE array DEFAULT [];
DEFINE FIELD dids.* ON TABLE tenant TYPE object FLEXIBLE;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_domain ON TABLE tenant \
    COLUMNS domain_name UNIQUE;

-- =======================================================================
-- External gateways (global carrier trunk pool)
-- =======================================================================
DEFINE TABLE external_gateway SCHEMAFULL;
DEFINE FIELD name ON TABLE external_gateway TYPE string;
DEFINE FIELD realm ON TABLE external_gateway TYPE string;
DEFINE FIELD username ON TABLE external_gateway TYPE string;
DEFINE FIELD password ON TABLE external_gateway TYPE string;
DEFINE FIELD proxy ON TABLE external_gateway TYPE option<string>;
DEFINE FIELD register ON TABLE external_gateway TYPE bool DEFAULT false;
DEFINE FIELD register_transport ON TABLE external_gateway TYPE string \
    DEFAULT 'udp';
DEFINE FIELD dtmf_type ON TABLE external_gateway TYPE string \
    DEFAULT 'rfc2833' ASSERT $value IN ['rfc2833', 'info', 'none'];
DEFINE FIELD codec_prefs ON TABLE external_gateway TYPE string \
    DEFAULT 'PCMU,PCMA';
DEFINE FIELD secure_media ON TABLE external_gateway TYPE option<string>;
DEFINE FIELD created_at ON TABLE external_gateway TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE external_gateway TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_gateway_name ON TABLE external_gateway \
    COLUMNS name UNIQUE;
";

// -----------------------------------------------------------------------
// Upgrade runner
// -----------------------------------------------------------------------

/// Bring the store up to the latest schema version.
///
/// Reads the highest recorded version from `_schema_history` and
/// applies every later step in order, recording each one as it
/// lands. A store that is already current is left untouched, so this
/// runs unconditionally at every startup.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(HISTORY_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("schema history table: {e}")))?;

    let mut response = db
        .query("SELECT version FROM _schema_history ORDER BY version DESC LIMIT 1")
        .await?;
    let recorded: Vec<VersionRow> = response.take(0)?;
    let mut current = recorded.first().map(|r| r.version).unwrap_or_default();

    for upgrade in UPGRADES {
        if upgrade.to_version <= current {
            continue;
        }

        info!(
            from = current,
            to = upgrade.to_version,
            label = upgrade.label,
            "upgrading store schema"
        );

        db.query(upgrade.ddl).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "schema upgrade to v{} ({}) failed: {e}",
                upgrade.to_version, upgrade.label,
            ))
        })?;

        db.query("CREATE _schema_history SET version = $version, label = $label")
            .bind(("version", upgrade.to_version))
            .bind(("label", upgrade.label))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "could not record schema v{}: {e}",
                    upgrade.to_version,
                ))
            })?;

        current = upgrade.to_version;
    }

    Ok(())
}

/// The v1 DDL, for tests that want to inspect or apply the raw
/// schema without going through the history table.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_defines_both_aggregates() {
        assert!(SCHEMA_V1.contains("DEFINE TABLE tenant SCHEMAFULL"));
        assert!(SCHEMA_V1.contains("DEFINE TABLE external_gateway SCHEMAFULL"));
        assert!(SCHEMA_V1.contains("COLUMNS domain_name UNIQUE"));
        assert!(SCHEMA_V1.contains("COLUMNS name UNIQUE"));
    }

    #[test]
    fn upgrade_versions_increase_without_gaps() {
        for (i, upgrade) in UPGRADES.iter().enumerate() {
            assert_eq!(
                upgrade.to_version,
                i as u32 + 1,
                "upgrade '{}' is out of sequence",
                upgrade.label
            );
        }
    }
}
