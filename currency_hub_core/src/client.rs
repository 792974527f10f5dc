//! 商城后端 REST 接口客户端
//!
//! 所有请求都经过 [`ApiClient::request`]：网络错误、非 2xx 响应、
//! `"success": false` 的业务错误统一折叠为 [`ApiReply::Failure`]，
//! 调用方无需区分错误来源。每次调用只尝试一次，不重试。

use crate::error::{Error, Result};
use crate::types::*;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// 客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 接口根地址
    pub base_url: String,
    /// 请求超时（秒），超时按网络错误处理
    pub timeout: u64,
    /// 是否验证 TLS 证书
    pub verify_tls: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout: 30,
            verify_tls: true,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }
}

/// 一次待发送的请求
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// 相对于 `base_url` 的路径，以 `/` 开头
    pub endpoint: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// 未解析的 HTTP 响应
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// 传输层
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse>;
}

/// 基于 reqwest 的 HTTP 传输
pub struct HttpTransport {
    base_url: String,
    http_client: Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        let url = Url::parse(&format!("{}{}", self.base_url, request.endpoint))
            .map_err(|e| Error::Network(format!("Invalid URL {}{}: {}", self.base_url, request.endpoint, e)))?;

        let mut builder = self
            .http_client
            .request(request.method, url.clone())
            .header(CONTENT_TYPE, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to connect to {}: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response from {}: {}", url, e)))?;

        Ok(RawResponse { status, body })
    }
}

/// 统一后的接口响应
#[derive(Debug, Clone, PartialEq)]
pub enum ApiReply {
    /// 响应体中的 JSON 对象
    Success(Map<String, Value>),
    /// `status` 为空表示请求未到达服务端
    Failure { status: Option<u16>, error: String },
}

impl ApiReply {
    fn from_raw(raw: RawResponse) -> Self {
        let ok = (200..300).contains(&raw.status);
        let parsed: std::result::Result<Value, _> = serde_json::from_str(&raw.body);

        if !ok {
            let error = parsed
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| format!("HTTP error! status: {}", raw.status));
            return ApiReply::Failure {
                status: Some(raw.status),
                error,
            };
        }

        match parsed {
            Ok(Value::Object(map)) => {
                if map.get("success").and_then(Value::as_bool) == Some(false) {
                    let error = map
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("Request failed")
                        .to_string();
                    ApiReply::Failure {
                        status: Some(raw.status),
                        error,
                    }
                } else {
                    ApiReply::Success(map)
                }
            }
            Ok(_) => ApiReply::Failure {
                status: Some(raw.status),
                error: "Unexpected response format".to_string(),
            },
            Err(e) => ApiReply::Failure {
                status: Some(raw.status),
                error: format!("Invalid response: {}", e),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiReply::Success(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ApiReply::Success(_) => None,
            ApiReply::Failure { error, .. } => Some(error),
        }
    }

    /// `{success, ...}` / `{success: false, error}` 形式的 JSON
    pub fn to_value(&self) -> Value {
        match self {
            ApiReply::Success(map) => {
                let mut map = map.clone();
                map.entry("success").or_insert(Value::Bool(true));
                Value::Object(map)
            }
            ApiReply::Failure { error, .. } => serde_json::json!({
                "success": false,
                "error": error,
            }),
        }
    }

    pub fn into_result(self) -> Result<Map<String, Value>> {
        match self {
            ApiReply::Success(map) => Ok(map),
            ApiReply::Failure { status, error } => Err(Error::Api {
                status,
                message: error,
            }),
        }
    }
}

fn take_field<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Result<T> {
    let value = map
        .remove(key)
        .ok_or_else(|| Error::Encoding(format!("Missing `{}` in response", key)))?;
    Ok(serde_json::from_value(value)?)
}

/// 以百分号编码拼接路径片段
fn encoded_path(segments: &[&str]) -> Result<String> {
    let mut url = Url::parse("http://localhost/").map_err(|e| Error::InvalidState(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidState("URL cannot carry a path".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.path().to_string())
}

fn take_list<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Result<Vec<T>> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

/// 商城接口客户端
pub struct ApiClient<T: Transport = HttpTransport> {
    transport: T,
}

impl ApiClient<HttpTransport> {
    /// 创建新的客户端实例
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }

    /// 使用默认配置创建客户端
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Self::new(&ClientConfig::with_base_url(base_url))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// 通用请求入口，不会返回错误
    pub async fn request(&self, method: Method, endpoint: &str, body: Option<Value>) -> ApiReply {
        self.request_with_query(method, endpoint, Vec::new(), body).await
    }

    async fn request_with_query(
        &self,
        method: Method,
        endpoint: &str,
        query: Vec<(String, String)>,
        body: Option<Value>,
    ) -> ApiReply {
        debug!("API call: {} {}", method, endpoint);

        let request = ApiRequest {
            method,
            endpoint: endpoint.to_string(),
            query,
            body,
        };

        let reply = match self.transport.send(request).await {
            Ok(raw) => ApiReply::from_raw(raw),
            Err(e) => ApiReply::Failure {
                status: None,
                error: e.to_string(),
            },
        };

        if let Some(error) = reply.error() {
            warn!("API error ({}): {}", endpoint, error);
        }
        reply
    }

    async fn get(&self, endpoint: &str) -> Result<Map<String, Value>> {
        self.request(Method::GET, endpoint, None).await.into_result()
    }

    async fn send_json<B: Serialize>(&self, method: Method, endpoint: &str, body: &B) -> Result<Map<String, Value>> {
        let body = serde_json::to_value(body)?;
        self.request(method, endpoint, Some(body)).await.into_result()
    }

    // ---- 认证 ----

    pub async fn signup(&self, request: &SignupRequest) -> Result<AuthUser> {
        info!("Signing up user: {}", request.username);
        let mut data = self.send_json(Method::POST, "/auth/signup", request).await?;
        take_field(&mut data, "user")
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthUser> {
        info!("Logging in user: {}", request.username_or_email);
        let mut data = self.send_json(Method::POST, "/auth/login", request).await?;
        take_field(&mut data, "user")
    }

    pub async fn profile(&self, user_id: i64) -> Result<AuthUser> {
        let mut data = self.get(&format!("/auth/profile/{}", user_id)).await?;
        take_field(&mut data, "user")
    }

    // ---- 商品 ----

    pub async fn items(&self) -> Result<Vec<GameItem>> {
        let mut data = self.get("/items").await?;
        let items: Vec<GameItem> = take_list(&mut data, "items")?;
        debug!("Loaded {} items", items.len());
        Ok(items)
    }

    pub async fn item(&self, item_id: i64) -> Result<GameItem> {
        let mut data = self.get(&format!("/items/{}", item_id)).await?;
        take_field(&mut data, "item")
    }

    pub async fn search_items(&self, keyword: &str) -> Result<Vec<GameItem>> {
        let query = vec![("q".to_string(), keyword.to_string())];
        let mut data = self
            .request_with_query(Method::GET, "/items/search", query, None)
            .await
            .into_result()?;
        take_list(&mut data, "items")
    }

    pub async fn items_by_platform(&self, platform: &str) -> Result<Vec<GameItem>> {
        let mut data = self.get(&encoded_path(&["items", "platform", platform])?).await?;
        take_list(&mut data, "items")
    }

    // ---- 管理 ----

    pub async fn add_item(&self, item: &NewGameItem) -> Result<i64> {
        info!(
            "Adding item {} ({} price options, image {} chars, icon {} chars)",
            item.name,
            item.price_options.len(),
            item.image.len(),
            item.currency_icon.len()
        );
        let mut data = self.send_json(Method::POST, "/admin/items", item).await?;
        take_field(&mut data, "item_id")
    }

    pub async fn delete_item(&self, item_id: i64) -> Result<()> {
        info!("Deleting item {}", item_id);
        self.request(Method::DELETE, &format!("/admin/items/{}", item_id), None)
            .await
            .into_result()?;
        Ok(())
    }

    // ---- 轮播图 ----

    pub async fn promos(&self) -> Result<Vec<Promo>> {
        let mut data = self.get("/promos").await?;
        take_list(&mut data, "promos")
    }

    pub async fn add_promo(&self, promo: &NewPromo) -> Result<i64> {
        info!("Adding promo (image {} chars)", promo.image.len());
        let mut data = self.send_json(Method::POST, "/promos", promo).await?;
        take_field(&mut data, "promo_id")
    }

    pub async fn delete_promo(&self, promo_id: i64) -> Result<()> {
        info!("Deleting promo {}", promo_id);
        self.request(Method::DELETE, &format!("/promos/{}", promo_id), None)
            .await
            .into_result()?;
        Ok(())
    }

    // ---- 新闻 ----

    pub async fn news(&self) -> Result<Vec<News>> {
        let mut data = self.get("/news").await?;
        take_list(&mut data, "news")
    }

    pub async fn add_news(&self, news: &NewsDraft) -> Result<i64> {
        info!("Adding news: {}", news.title);
        let mut data = self.send_json(Method::POST, "/news", news).await?;
        take_field(&mut data, "news_id")
    }

    pub async fn update_news(&self, news_id: i64, news: &NewsDraft) -> Result<()> {
        info!("Updating news {}", news_id);
        self.send_json(Method::PUT, &format!("/news/{}", news_id), news).await?;
        Ok(())
    }

    pub async fn delete_news(&self, news_id: i64) -> Result<()> {
        info!("Deleting news {}", news_id);
        self.request(Method::DELETE, &format!("/news/{}", news_id), None)
            .await
            .into_result()?;
        Ok(())
    }

    // ---- 交易 ----

    pub async fn purchase(&self, request: &PurchaseRequest) -> Result<Transaction> {
        info!(
            "Recording purchase: user {} item {} price {:.2}",
            request.user_id, request.item_id, request.final_price
        );
        let mut data = self.send_json(Method::POST, "/transactions/purchase", request).await?;
        take_field(&mut data, "transaction")
    }

    pub async fn user_transactions(&self, user_id: i64) -> Result<Vec<Transaction>> {
        let mut data = self.get(&format!("/transactions/user/{}", user_id)).await?;
        take_list(&mut data, "transactions")
    }

    pub async fn all_transactions(&self) -> Result<Vec<Transaction>> {
        let mut data = self.get("/transactions/all").await?;
        take_list(&mut data, "transactions")
    }

    /// 健康检查
    pub async fn health(&self) -> Result<HealthStatus> {
        let data = self.get("/health").await?;
        Ok(serde_json::from_value(Value::Object(data))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn respond(status: u16, body: Value) -> Result<RawResponse> {
        Ok(RawResponse {
            status,
            body: body.to_string(),
        })
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000/api");
        assert_eq!(config.timeout, 30);
        assert!(config.verify_tls);
    }

    #[test]
    fn test_client_config_trims_trailing_slash() {
        let config = ClientConfig::with_base_url("http://shop.local/api/");
        assert_eq!(config.base_url, "http://shop.local/api");
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = ApiClient::with_base_url("http://localhost:5000/api");
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_network_failure_is_normalized() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(Error::Network("connection refused".to_string())));

        let api = ApiClient::with_transport(transport);
        let reply = api.request(Method::GET, "/items", None).await;

        assert_eq!(
            reply,
            ApiReply::Failure {
                status: None,
                error: "Network error: connection refused".to_string(),
            }
        );
        assert_eq!(
            reply.to_value(),
            serde_json::json!({"success": false, "error": "Network error: connection refused"})
        );
    }

    #[tokio::test]
    async fn test_http_500_is_normalized() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_| respond(500, serde_json::json!({"error": "database unavailable"})));

        let api = ApiClient::with_transport(transport);
        let reply = api.request(Method::GET, "/items", None).await;

        assert_eq!(reply.error(), Some("database unavailable"));
        assert_eq!(
            reply.to_value(),
            serde_json::json!({"success": false, "error": "database unavailable"})
        );
    }

    #[tokio::test]
    async fn test_http_error_without_json_body() {
        let mut transport = MockTransport::new();
        transport.expect_send().returning(|_| {
            Ok(RawResponse {
                status: 502,
                body: "<html>Bad Gateway</html>".to_string(),
            })
        });

        let api = ApiClient::with_transport(transport);
        let reply = api.request(Method::GET, "/health", None).await;
        assert_eq!(reply.error(), Some("HTTP error! status: 502"));
    }

    #[tokio::test]
    async fn test_application_error_is_normalized() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_| respond(200, serde_json::json!({"success": false, "error": "Invalid credentials"})));

        let api = ApiClient::with_transport(transport);
        let err = api
            .login(&LoginRequest {
                username_or_email: "a@b.com".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_items_parses_list() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.method == Method::GET && req.endpoint == "/items")
            .returning(|_| {
                respond(
                    200,
                    serde_json::json!({
                        "success": true,
                        "items": [
                            {"id": 1, "name": "A", "price": 10.0, "game_platform": "MOBA"},
                            {"id": 2, "name": "B", "price": 20.0, "game_platform": "RPG"}
                        ],
                        "count": 2
                    }),
                )
            });

        let api = ApiClient::with_transport(transport);
        let items = api.items().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].name, "B");
    }

    #[tokio::test]
    async fn test_search_sends_query_parameter() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                req.endpoint == "/items/search"
                    && req.query == vec![("q".to_string(), "genshin impact".to_string())]
            })
            .returning(|_| respond(200, serde_json::json!({"success": true, "items": []})));

        let api = ApiClient::with_transport(transport);
        assert!(api.search_items("genshin impact").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purchase_posts_body() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|req| {
                req.method == Method::POST
                    && req.endpoint == "/transactions/purchase"
                    && req.body
                        == Some(serde_json::json!({
                            "user_id": 4,
                            "item_id": 1,
                            "quantity": 1,
                            "final_price": 50.0
                        }))
            })
            .returning(|_| {
                respond(
                    200,
                    serde_json::json!({
                        "success": true,
                        "transaction": {
                            "id": 12, "user_id": 4, "item_id": 1, "status": "completed",
                            "final_price": 50.0, "quantity": 1, "item_name": "X", "currency": "PHP"
                        }
                    }),
                )
            });

        let api = ApiClient::with_transport(transport);
        let tx = api
            .purchase(&PurchaseRequest {
                user_id: 4,
                item_id: 1,
                quantity: 1,
                final_price: 50.0,
            })
            .await
            .unwrap();
        assert_eq!(tx.id, 12);
        assert_eq!(tx.status, TransactionStatus::Completed);
    }

    #[tokio::test]
    async fn test_health_without_success_flag() {
        let mut transport = MockTransport::new();
        transport.expect_send().returning(|_| {
            respond(
                200,
                serde_json::json!({"status": "healthy", "message": "E-Currency API is running"}),
            )
        });

        let api = ApiClient::with_transport(transport);
        assert!(api.health().await.unwrap().is_healthy());
    }

    #[tokio::test]
    async fn test_missing_list_is_empty() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_| respond(200, serde_json::json!({"success": true})));

        let api = ApiClient::with_transport(transport);
        assert!(api.promos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_platform_path_is_encoded() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|req| req.endpoint == "/items/platform/Battle%20Royale%2FFPS")
            .returning(|_| respond(200, serde_json::json!({"success": true, "items": []})));

        let api = ApiClient::with_transport(transport);
        assert!(api.items_by_platform("Battle Royale/FPS").await.unwrap().is_empty());
    }
}
