use async_trait::async_trait;
use axum::Router;

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Idempotent DDL a module needs before it can serve requests.
///
/// Statements are applied on every boot and must tolerate an existing schema
/// (`CREATE TABLE IF NOT EXISTS`, `CREATE INDEX IF NOT EXISTS`). There is no
/// version tracking.
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    pub id: &'static str,
    pub ddl: &'static str,
}

/// Core module trait that all bookshelf modules must implement
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context
    /// Called during application startup before schemas are applied
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes
    /// Routes are mounted under the configured API prefix
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON
    /// Will be merged with other modules' specs
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Return the schema this module owns, applied in the order returned
    fn schemas(&self) -> Vec<SchemaDefinition> {
        vec![]
    }

    /// Called after schemas are applied
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop the module and clean up resources
    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
