use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crawler_common::ObjectRef;
use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::ObjectStore;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Faults {
    list: bool,
    get: HashSet<String>,
    put: HashSet<String>,
    delete: HashSet<String>,
}

/// In-process [`ObjectStore`].
///
/// Listing is ordered by key. Individual operations can be made to fail for
/// chosen keys, which is how partial-failure behaviour is exercised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    faults: RwLock<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, StoredObject>>> {
        self.objects.read().map_err(|_| anyhow!("memory store lock poisoned"))
    }

    fn objects_mut(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, StoredObject>>> {
        self.objects.write().map_err(|_| anyhow!("memory store lock poisoned"))
    }

    fn faults(&self) -> Result<RwLockReadGuard<'_, Faults>> {
        self.faults.read().map_err(|_| anyhow!("memory store lock poisoned"))
    }

    fn faults_mut(&self) -> Result<RwLockWriteGuard<'_, Faults>> {
        self.faults.write().map_err(|_| anyhow!("memory store lock poisoned"))
    }

    /// Store an object with an explicit modification time
    pub fn insert(
        &self,
        key: impl Into<String>,
        data: impl Into<Vec<u8>>,
        last_modified: DateTime<Utc>,
    ) -> Result<()> {
        self.objects_mut()?.insert(
            key.into(),
            StoredObject {
                data: data.into(),
                last_modified,
            },
        );
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects().map(|o| o.contains_key(key)).unwrap_or(false)
    }

    /// Raw content of an object, bypassing fault injection
    pub fn content(&self, key: &str) -> Option<Vec<u8>> {
        self.objects().ok()?.get(key).map(|o| o.data.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn fail_list(&self) -> Result<()> {
        self.faults_mut()?.list = true;
        Ok(())
    }

    pub fn fail_get(&self, key: impl Into<String>) -> Result<()> {
        self.faults_mut()?.get.insert(key.into());
        Ok(())
    }

    pub fn fail_put(&self, key: impl Into<String>) -> Result<()> {
        self.faults_mut()?.put.insert(key.into());
        Ok(())
    }

    pub fn fail_delete(&self, key: impl Into<String>) -> Result<()> {
        self.faults_mut()?.delete.insert(key.into());
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectRef>> {
        if self.faults()?.list {
            bail!("injected list failure for prefix '{}'", prefix);
        }

        Ok(self
            .objects()?
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ObjectRef::new(key.clone(), obj.last_modified, obj.data.len() as u64))
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        if self.faults()?.get.contains(key) {
            bail!("injected get failure for '{}'", key);
        }

        self.objects()?
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| anyhow!("NoSuchKey: {}", key))
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        if self.faults()?.put.contains(key) {
            bail!("injected put failure for '{}'", key);
        }

        self.insert(key, data, Utc::now())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if self.faults()?.delete.contains(key) {
            bail!("injected delete failure for '{}'", key);
        }

        self.objects_mut()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_list_filters_by_prefix_in_key_order() {
        let store = MemoryStore::new();
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        store.insert("b/2.csv", "x", t).unwrap();
        store.insert("a/1.csv", "yy", t).unwrap();
        store.insert("c/3.csv", "z", t).unwrap();

        let listed = store.list("").await.unwrap();
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a/1.csv", "b/2.csv", "c/3.csv"]);
        assert_eq!(listed[0].size, 2);

        let listed = store.list("b/").await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();
        store.put("k", vec![0]).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), vec![0]);
        store.delete("k").await.unwrap();
        assert!(!store.contains("k"));
        assert!(store.get("k").await.is_err());
        // Deleting again is fine
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = MemoryStore::new();
        store.put("k", vec![1]).await.unwrap();
        store.fail_get("k").unwrap();
        store.fail_delete("k").unwrap();
        store.fail_put("m").unwrap();

        assert!(store.get("k").await.is_err());
        assert!(store.delete("k").await.is_err());
        assert!(store.put("m", vec![0]).await.is_err());
        assert_eq!(store.content("k"), Some(vec![1]));

        store.fail_list().unwrap();
        assert!(store.list("").await.is_err());
    }
}
