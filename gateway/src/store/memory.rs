//! In-memory code store. Non-durable; used by tests of the access layer.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use kg_common::{Code, CodeMapping};

use super::{CodeStore, StoreError};

/// Process-local code store with the same conflict semantics as SQLite.
#[derive(Debug, Default)]
pub struct MemoryCodeStore {
    mappings: DashMap<Code, CodeMapping>,
}

impl MemoryCodeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CodeStore for MemoryCodeStore {
    async fn lookup(&self, code: &Code) -> Result<Option<CodeMapping>, StoreError> {
        Ok(self.mappings.get(code).map(|entry| entry.clone()))
    }

    async fn insert(&self, mapping: &CodeMapping) -> Result<bool, StoreError> {
        match self.mappings.entry(mapping.code.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(mapping.clone());
                Ok(true)
            }
        }
    }

    async fn remove(&self, code: &Code) -> Result<bool, StoreError> {
        Ok(self.mappings.remove(code).is_some())
    }
}
