//! 商品目录：分类筛选、搜索、价格展示

use crate::client::{ApiClient, Transport};
use crate::error::{Error, Result};
use crate::storage::{DisplayCache, KeyValueStore};
use crate::types::{GameItem, News, Promo};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// 分类筛选
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

impl CategoryFilter {
    /// `"all"`（不区分大小写）或空串表示不筛选
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            CategoryFilter::All
        } else {
            CategoryFilter::Named(value.to_string())
        }
    }

    pub fn matches(&self, item: &GameItem) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Named(name) => item.platform() == Some(name.as_str()),
        }
    }
}

/// 目录查询条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub category: CategoryFilter,
    pub search: Option<String>,
}

impl CatalogQuery {
    fn matches_search(&self, item: &GameItem) -> bool {
        let term = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => term.to_lowercase(),
            _ => return true,
        };

        item.name.to_lowercase().contains(&term)
            || item
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&term))
                .unwrap_or(false)
    }
}

/// 先按分类精确匹配，再按名称、描述做不区分大小写的子串匹配
pub fn filter_items<'a>(items: &'a [GameItem], query: &CatalogQuery) -> Vec<&'a GameItem> {
    items
        .iter()
        .filter(|item| query.category.matches(item))
        .filter(|item| query.matches_search(item))
        .collect()
}

pub fn format_peso(amount: f64) -> String {
    format!("₱{:.2}", amount)
}

/// 价格展示：多档套餐显示区间，区间收敛时显示单价
pub fn price_display(item: &GameItem) -> String {
    if !item.price_options.is_empty() {
        let min = item.price_options.iter().map(|o| o.price).fold(f64::INFINITY, f64::min);
        let max = item.price_options.iter().map(|o| o.price).fold(f64::NEG_INFINITY, f64::max);
        if min == max {
            format_peso(min)
        } else {
            format!("{} - {}", format_peso(min), format_peso(max))
        }
    } else if item.price > 0.0 {
        format_peso(item.price)
    } else {
        format_peso(0.0)
    }
}

/// 一档可购买的套餐
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: u32,
    /// 无套餐配置的商品使用标准包，没有数量
    pub amount: Option<u64>,
    pub label: String,
    pub price: f64,
    pub popular: bool,
}

/// 商品的套餐列表，按价格升序，中间一档标记为热门
pub fn packages_for(item: &GameItem) -> Vec<Package> {
    if item.price_options.is_empty() {
        return vec![Package {
            id: 1,
            amount: None,
            label: format!("Standard {} Package", item.currency),
            price: item.price,
            popular: true,
        }];
    }

    let mut options = item.price_options.clone();
    options.sort_by(|a, b| a.price.total_cmp(&b.price));
    let popular = options.len() / 2;

    options
        .into_iter()
        .enumerate()
        .map(|(index, option)| Package {
            id: index as u32 + 1,
            amount: Some(option.amount),
            label: format!("{} {}", option.amount, item.currency),
            price: option.price,
            popular: index == popular,
        })
        .collect()
}

/// 商品目录
pub struct Catalog<'a, T: Transport, S: KeyValueStore> {
    api: &'a ApiClient<T>,
    cache: &'a DisplayCache<S>,
}

/// 一次加载的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Page<V> {
    pub items: Vec<V>,
    /// 后端不可用、退回本地缓存时为 `Some(错误信息)`
    pub stale: Option<String>,
}

pub type CatalogPage = Page<GameItem>;

/// 拉取成功时刷新缓存，失败时读取缓存
fn with_fallback<V>(
    label: &str,
    fetched: Result<Vec<V>>,
    store: impl FnOnce(&[V]) -> Result<()>,
    cached: impl FnOnce() -> Vec<V>,
) -> Page<V> {
    match fetched {
        Ok(items) => {
            if let Err(e) = store(&items) {
                warn!("Failed to cache {}: {}", label, e);
            }
            Page { items, stale: None }
        }
        Err(e) => {
            let items = cached();
            warn!("Falling back to {} cached {}: {}", items.len(), label, e);
            Page {
                items,
                stale: Some(e.to_string()),
            }
        }
    }
}

impl<'a, T: Transport, S: KeyValueStore> Catalog<'a, T, S> {
    pub fn new(api: &'a ApiClient<T>, cache: &'a DisplayCache<S>) -> Self {
        Self { api, cache }
    }

    /// 拉取全部商品；失败时退回缓存
    pub async fn load(&self) -> CatalogPage {
        with_fallback(
            "games",
            self.api.items().await,
            |items| self.cache.store_games(items),
            || self.cache.games(),
        )
    }

    /// 首页轮播图
    pub async fn promos(&self) -> Page<Promo> {
        with_fallback(
            "promos",
            self.api.promos().await,
            |promos| self.cache.store_promos(promos),
            || self.cache.promos(),
        )
    }

    /// 首页新闻
    pub async fn news(&self) -> Page<News> {
        with_fallback(
            "news",
            self.api.news().await,
            |news| self.cache.store_news(news),
            || self.cache.news(),
        )
    }

    pub async fn browse(&self, query: &CatalogQuery) -> CatalogPage {
        let page = self.load().await;
        let items: Vec<GameItem> = filter_items(&page.items, query).into_iter().cloned().collect();
        debug!("Catalog query {:?} matched {} items", query, items.len());
        Page {
            items,
            stale: page.stale,
        }
    }

    pub async fn find(&self, item_id: i64) -> Result<Option<GameItem>> {
        let page = self.load().await;
        if let (Some(error), true) = (&page.stale, page.items.is_empty()) {
            return Err(Error::Api {
                status: None,
                message: error.clone(),
            });
        }
        Ok(page.items.into_iter().find(|item| item.id == item_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockTransport, RawResponse};
    use crate::storage::MemoryStore;
    use crate::types::PriceOption;

    fn item(id: i64, name: &str, platform: Option<&str>, category: Option<&str>) -> GameItem {
        GameItem {
            id,
            name: name.to_string(),
            description: Some(format!("{} top-up", name)),
            price: 0.0,
            currency: "PHP".to_string(),
            game_platform: platform.map(str::to_string),
            category: category.map(str::to_string),
            image: None,
            currency_icon: None,
            price_options: Vec::new(),
            created_at: None,
        }
    }

    fn sample() -> Vec<GameItem> {
        vec![
            item(1, "Mobile Legends", Some("MOBA"), None),
            item(2, "Genshin Impact", Some("RPG"), None),
            item(3, "Ragnarok", None, Some("RPG")),
            item(4, "Dota Plus", Some("MOBA"), Some("RPG")),
        ]
    }

    #[test]
    fn test_filter_by_category() {
        let items = sample();
        let query = CatalogQuery {
            category: CategoryFilter::parse("RPG"),
            search: None,
        };
        let ids: Vec<i64> = filter_items(&items, &query).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_filter_all() {
        let items = sample();
        assert_eq!(filter_items(&items, &CatalogQuery::default()).len(), 4);
        assert_eq!(CategoryFilter::parse("All"), CategoryFilter::All);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let items = sample();
        let query = CatalogQuery {
            category: CategoryFilter::All,
            search: Some("GENSHIN".to_string()),
        };
        let found = filter_items(&items, &query);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);

        let query = CatalogQuery {
            category: CategoryFilter::All,
            search: Some("top-up".to_string()),
        };
        assert_eq!(filter_items(&items, &query).len(), 4);
    }

    #[test]
    fn test_category_and_search_combined() {
        let items = sample();
        let query = CatalogQuery {
            category: CategoryFilter::Named("MOBA".to_string()),
            search: Some("dota".to_string()),
        };
        let found = filter_items(&items, &query);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 4);
    }

    #[test]
    fn test_price_display_range() {
        let mut game = item(1, "X", None, None);
        game.price_options = vec![
            PriceOption { amount: 500, price: 250.0 },
            PriceOption { amount: 100, price: 50.0 },
        ];
        assert_eq!(price_display(&game), "₱50.00 - ₱250.00");
    }

    #[test]
    fn test_price_display_collapses() {
        let mut game = item(1, "X", None, None);
        game.price_options = vec![
            PriceOption { amount: 100, price: 50.0 },
            PriceOption { amount: 110, price: 50.0 },
        ];
        assert_eq!(price_display(&game), "₱50.00");
    }

    #[test]
    fn test_packages_sorted_with_popular_middle() {
        let mut game = item(1, "X", None, None);
        game.currency = "Diamonds".to_string();
        game.price_options = vec![
            PriceOption { amount: 500, price: 250.0 },
            PriceOption { amount: 100, price: 50.0 },
            PriceOption { amount: 250, price: 120.0 },
        ];

        let packages = packages_for(&game);
        let labels: Vec<&str> = packages.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["100 Diamonds", "250 Diamonds", "500 Diamonds"]);
        assert!(packages[1].popular);
        assert!(!packages[0].popular);
        assert_eq!(packages[0].id, 1);
    }

    #[test]
    fn test_standard_package_fallback() {
        let mut game = item(1, "X", None, None);
        game.price = 75.0;
        let packages = packages_for(&game);
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].label, "Standard PHP Package");
        assert_eq!(packages[0].price, 75.0);
        assert_eq!(packages[0].amount, None);
    }

    #[test]
    fn test_price_display_fallbacks() {
        let mut game = item(1, "X", None, None);
        assert_eq!(price_display(&game), "₱0.00");
        game.price = 99.5;
        assert_eq!(price_display(&game), "₱99.50");
    }

    #[tokio::test]
    async fn test_promos_and_news_fall_back_to_cache() {
        let mut transport = MockTransport::new();
        let mut calls = 0;
        transport.expect_send().times(4).returning(move |req| {
            calls += 1;
            if calls > 2 {
                return Err(Error::Network("connection refused".to_string()));
            }
            let body = if req.endpoint == "/promos" {
                serde_json::json!({"success": true, "promos": [
                    {"id": 1, "image": "data:image/png;base64,AAAA", "title": "Double Diamonds"}
                ]})
            } else {
                serde_json::json!({"success": true, "news": [
                    {"id": 4, "title": "New Games Added!", "description": "Three new titles", "date": "2024-01-15", "icon": "🎉"}
                ]})
            };
            Ok(RawResponse {
                status: 200,
                body: body.to_string(),
            })
        });

        let api = ApiClient::with_transport(transport);
        let cache = DisplayCache::new(MemoryStore::new());
        let catalog = Catalog::new(&api, &cache);

        assert!(catalog.promos().await.stale.is_none());
        assert!(catalog.news().await.stale.is_none());

        let promos = catalog.promos().await;
        assert_eq!(promos.stale.as_deref(), Some("Network error: connection refused"));
        assert_eq!(promos.items[0].title.as_deref(), Some("Double Diamonds"));

        let news = catalog.news().await;
        assert!(news.stale.is_some());
        assert_eq!(news.items[0].id, 4);
    }

    #[tokio::test]
    async fn test_news_without_cache_is_empty() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(RawResponse {
                status: 500,
                body: "{}".to_string(),
            })
        });

        let api = ApiClient::with_transport(transport);
        let cache = DisplayCache::new(MemoryStore::new());
        let page = Catalog::new(&api, &cache).news().await;
        assert!(page.items.is_empty());
        assert_eq!(page.stale.as_deref(), Some("HTTP error! status: 500"));
    }
}
