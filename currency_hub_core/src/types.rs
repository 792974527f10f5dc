//! 数据类型定义

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// 用户角色
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

/// 后端返回的用户信息（登录、注册、资料接口）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// 空串、未知取值与缺省一样按 `None` 处理
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<Role>,
}

fn lenient_role<'de, D>(deserializer: D) -> std::result::Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref().map(str::trim) {
        Some(value) if value.eq_ignore_ascii_case("admin") => Some(Role::Admin),
        Some(value) if value.eq_ignore_ascii_case("user") => Some(Role::User),
        _ => None,
    })
}

/// 商品的一档充值套餐
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceOption {
    pub amount: u64,
    pub price: f64,
}

/// 游戏充值商品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub game_platform: Option<String>,
    /// 旧数据使用的分类字段
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, alias = "game_image", alias = "gameImage")]
    pub image: Option<String>,
    #[serde(default, alias = "currencyIcon")]
    pub currency_icon: Option<String>,
    #[serde(
        default,
        rename = "priceOptions",
        alias = "price_options",
        deserialize_with = "null_as_default"
    )]
    pub price_options: Vec<PriceOption>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl GameItem {
    /// 平台字段，空值时回退到旧的分类字段
    pub fn platform(&self) -> Option<&str> {
        non_empty(self.game_platform.as_deref()).or_else(|| non_empty(self.category.as_deref()))
    }

    pub fn display_category(&self) -> &str {
        self.platform().unwrap_or("General")
    }

    pub fn description_or_default(&self) -> &str {
        non_empty(self.description.as_deref()).unwrap_or("No description available")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn default_currency() -> String {
    "PHP".to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 轮播图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promo {
    pub id: i64,
    pub image: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// 新闻
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// 交易状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// 缺省状态按已完成展示
    #[default]
    Completed,
    Pending,
    Failed,
    Refunded,
    /// 数据库中的其他取值
    #[serde(other)]
    Unknown,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// 交易记录（由服务端持有，客户端只读或新建）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub item_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub final_price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TransactionStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub game_platform: Option<String>,
    #[serde(default)]
    pub user_username: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

/// 健康检查响应
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// 注册请求
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// 登录请求
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

/// 新增商品请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewGameItem {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub game_platform: String,
    pub image: String,
    pub currency_icon: String,
    pub price_options: Vec<PriceOption>,
}

/// 新增轮播图请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPromo {
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// 新增或修改新闻请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsDraft {
    pub title: String,
    pub description: String,
    pub date: String,
    pub icon: String,
}

/// 下单请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseRequest {
    pub user_id: i64,
    pub item_id: i64,
    pub quantity: u32,
    pub final_price: f64,
}
