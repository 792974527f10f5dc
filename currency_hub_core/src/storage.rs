//! 本地键值存储
//!
//! 会话记录与展示缓存都保存在这里。写入立即落盘，读取每次都重新解析，
//! 不做内存缓存。

use crate::error::{Error, Result};
use crate::types::{GameItem, News, Promo};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// 会话记录的存储键
pub const SESSION_KEY: &str = "currencyhub_session";
pub const GAMES_KEY: &str = "games";
pub const PROMOS_KEY: &str = "promos";
pub const NEWS_KEY: &str = "news";
pub const ORDERS_KEY: &str = "user_orders";

/// 持久化键值存储
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// 存储配置
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// 数据目录
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".currency-hub"),
        }
    }
}

/// 文件存储：数据目录下每个键一个 `<key>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(config: &StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        Ok(Self {
            dir: config.data_dir.clone(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(Error::InvalidState(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::write(&path, value)?;
        debug!("Stored {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::InvalidState("memory store poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::InvalidState("memory store poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::InvalidState("memory store poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// 本地订单记录（仅用于展示）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_number: String,
    pub game: String,
    pub package: String,
    pub price: f64,
    pub user_id: String,
    pub payment: String,
    pub date: DateTime<Utc>,
    pub status: String,
}

/// 展示缓存
///
/// 只用于后端不可用时维持展示，从不作为数据来源。
pub struct DisplayCache<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> DisplayCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read cache {}: {}", key, e);
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Discarding unreadable cache {}: {}", key, e);
            Vec::new()
        })
    }

    fn write_list<T: Serialize>(&self, key: &str, values: &[T]) -> Result<()> {
        self.store.set(key, &serde_json::to_string(values)?)
    }

    pub fn store_games(&self, games: &[GameItem]) -> Result<()> {
        self.write_list(GAMES_KEY, games)
    }

    pub fn games(&self) -> Vec<GameItem> {
        self.read_list(GAMES_KEY)
    }

    pub fn store_promos(&self, promos: &[Promo]) -> Result<()> {
        self.write_list(PROMOS_KEY, promos)
    }

    pub fn promos(&self) -> Vec<Promo> {
        self.read_list(PROMOS_KEY)
    }

    pub fn store_news(&self, news: &[News]) -> Result<()> {
        self.write_list(NEWS_KEY, news)
    }

    pub fn news(&self) -> Vec<News> {
        self.read_list(NEWS_KEY)
    }

    /// 新订单插在最前面
    pub fn record_order(&self, order: OrderRecord) -> Result<()> {
        let mut orders: Vec<OrderRecord> = self.read_list(ORDERS_KEY);
        orders.insert(0, order);
        self.write_list(ORDERS_KEY, &orders)
    }

    pub fn orders(&self) -> Vec<OrderRecord> {
        self.read_list(ORDERS_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> StorageConfig {
        let dir = std::env::temp_dir().join(format!("currency-hub-test-{}", rand::random::<u64>()));
        StorageConfig { data_dir: dir }
    }

    #[test]
    fn test_file_store_roundtrip() {
        let config = temp_config();
        let store = FileStore::open(&config).unwrap();

        assert_eq!(store.get("games").unwrap(), None);
        store.set("games", "[]").unwrap();
        assert_eq!(store.get("games").unwrap().as_deref(), Some("[]"));
        store.remove("games").unwrap();
        assert_eq!(store.get("games").unwrap(), None);
        store.remove("games").unwrap();

        let _ = std::fs::remove_dir_all(&config.data_dir);
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let config = temp_config();
        let store = FileStore::open(&config).unwrap();
        assert!(store.set("../escape", "x").is_err());
        let _ = std::fs::remove_dir_all(&config.data_dir);
    }

    #[test]
    fn test_orders_newest_first() {
        let cache = DisplayCache::new(MemoryStore::new());
        for n in ["GG1", "GG2"] {
            cache
                .record_order(OrderRecord {
                    order_number: n.to_string(),
                    game: "X".to_string(),
                    package: "100 Diamonds".to_string(),
                    price: 50.0,
                    user_id: "u1".to_string(),
                    payment: "GCash".to_string(),
                    date: Utc::now(),
                    status: "completed".to_string(),
                })
                .unwrap();
        }

        let orders = cache.orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_number, "GG2");
    }

    #[test]
    fn test_unreadable_cache_is_empty() {
        let store = MemoryStore::new();
        store.set(GAMES_KEY, "not json").unwrap();
        let cache = DisplayCache::new(store);
        assert!(cache.games().is_empty());
    }
}
