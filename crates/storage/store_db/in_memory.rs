use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{api::StoreBackend, error::StoreError};

/// In-memory implementation of the [`StoreBackend`] trait over an ordered
/// map. Batch atomicity comes from holding the lock across the whole batch.
#[derive(Default, Clone)]
pub struct InMemoryBackend(Arc<Mutex<BTreeMap<Vec<u8>, Vec<u8>>>>);

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> Result<MutexGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>, StoreError> {
        self.0.lock().map_err(|_| StoreError::LockError)
    }
}

impl StoreBackend for InMemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.inner()?.get(key).cloned())
    }

    fn put_batch(&self, writes: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), StoreError> {
        let mut db = self.inner()?;
        for (key, value) in writes {
            db.insert(key, value);
        }
        Ok(())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let db = self.inner()?;
        Ok(db
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}
