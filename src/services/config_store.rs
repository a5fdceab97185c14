//! Alert definition store interface.

use crate::errors::DefinitionError;
use crate::models::alert::AlertDefinition;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Source of alert definitions. The engine polls this on a fixed cadence
/// and swaps its cached set; evaluation never reads the store directly.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// All enabled definitions. Validation happens in the engine, not
    /// here, so a store can stay a dumb transport.
    async fn list_active_alert_definitions(&self) -> Result<Vec<AlertDefinition>, DefinitionError>;
}

/// Store backed by a mutable in-memory list, for tests and local runs.
#[derive(Default)]
pub struct InMemoryConfigStore {
    definitions: RwLock<Vec<AlertDefinition>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_definitions(&self, definitions: Vec<AlertDefinition>) {
        *self.definitions.write().await = definitions;
    }
}

#[async_trait]
impl ConfigurationStore for InMemoryConfigStore {
    async fn list_active_alert_definitions(&self) -> Result<Vec<AlertDefinition>, DefinitionError> {
        Ok(self.definitions.read().await.clone())
    }
}
