use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::storage::{PointType, PointTypeRegistry, Result};

/// Mock point-type registry backed by a map.
#[derive(Default)]
pub struct MockPointTypeRegistry {
    types: RwLock<BTreeMap<String, PointType>>,
}

impl MockPointTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with `types`.
    pub fn with_types(types: impl IntoIterator<Item = PointType>) -> Self {
        Self {
            types: RwLock::new(types.into_iter().map(|t| (t.key.clone(), t)).collect()),
        }
    }
}

#[async_trait]
impl PointTypeRegistry for MockPointTypeRegistry {
    async fn lookup(&self, key: &str) -> Result<Option<PointType>> {
        Ok(self.types.read().await.get(key).cloned())
    }

    async fn upsert(&self, point_type: &PointType) -> Result<()> {
        self.types
            .write()
            .await
            .insert(point_type.key.clone(), point_type.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PointType>> {
        Ok(self.types.read().await.values().cloned().collect())
    }
}
