//! 游戏点券商城客户端核心库
//!
//! 提供商城前台与管理后台的全部客户端逻辑：
//! - 统一的 REST 接口客户端（错误归一化）
//! - 本地会话存储与展示缓存
//! - 商品目录筛选与价格展示
//! - 四步购买流程
//! - 管理后台及其访问检查

pub mod access;
pub mod admin;
pub mod catalog;
pub mod client;
pub mod error;
pub mod media;
pub mod purchase;
pub mod session;
pub mod storage;
pub mod transactions;
pub mod types;

pub use access::{AccessDecision, AccessGate, DenialReason};
pub use admin::{AdminConsole, GameForm};
pub use catalog::{Catalog, CatalogPage, CatalogQuery, CategoryFilter, Package, Page};
pub use client::{ApiClient, ApiReply, ClientConfig, HttpTransport, Transport};
pub use error::{Error, Result};
pub use purchase::{OrderReceipt, PaymentMethod, PurchaseFlow, Step, UserDetails};
pub use session::{Session, SessionStore};
pub use storage::{DisplayCache, FileStore, KeyValueStore, MemoryStore, StorageConfig};
pub use types::*;
