use super::SettingStore;
use anyhow::Result;
use dashmap::DashMap;

/// In-memory settings store. State resets on restart.
#[derive(Default)]
pub struct MemorySettingStore {
    values: DashMap<String, String>,
}

impl MemorySettingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SettingStore for MemorySettingStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }

    fn take(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.remove(key).map(|(_, value)| value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_and_delete() {
        let store = MemorySettingStore::new();
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);

        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert!(store.is_empty());

        store.set("k", "v3").unwrap();
        assert_eq!(store.take("k").unwrap().as_deref(), Some("v3"));
        assert!(store.take("k").unwrap().is_none());
    }
}
