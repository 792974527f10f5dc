//! 管理后台：商品、轮播图、新闻的增删改，以及只读的交易看板
//!
//! [`AdminConsole`] 只能经由 [`AccessGate`] 构造。

use crate::access::AccessGate;
use crate::client::{ApiClient, Transport};
use crate::error::{Error, Result};
use crate::media::is_image_data_url;
use crate::session::Session;
use crate::transactions::TransactionStats;
use crate::types::*;
use tracing::info;

/// 新增商品表单
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameForm {
    pub name: String,
    pub category: String,
    pub description: String,
    pub currency: String,
    /// 数据 URL
    pub image: String,
    /// 数据 URL
    pub currency_icon: String,
    pub price_options: Vec<PriceOption>,
}

impl GameForm {
    /// 校验表单；标价取第一档套餐价格
    pub fn validate(&self) -> Result<NewGameItem> {
        let name = self.name.trim();
        let category = self.category.trim();
        let description = self.description.trim();
        let currency = self.currency.trim();

        if name.is_empty() || category.is_empty() || description.is_empty() || currency.is_empty() {
            return Err(Error::Validation("Please fill in all required fields".to_string()));
        }
        if self.image.is_empty() {
            return Err(Error::Validation("Please upload a game image".to_string()));
        }
        if self.currency_icon.is_empty() {
            return Err(Error::Validation("Please upload a currency icon".to_string()));
        }
        let first = self
            .price_options
            .first()
            .ok_or_else(|| Error::Validation("Please add at least one price option".to_string()))?;
        if self.price_options.iter().any(|o| o.amount == 0 || o.price <= 0.0) {
            return Err(Error::Validation(
                "Price options need a positive amount and price".to_string(),
            ));
        }
        if !is_image_data_url(&self.image) {
            return Err(Error::Validation(
                "Invalid game image format. Please upload a valid image file.".to_string(),
            ));
        }
        if !is_image_data_url(&self.currency_icon) {
            return Err(Error::Validation(
                "Invalid currency icon format. Please upload a valid image file.".to_string(),
            ));
        }

        Ok(NewGameItem {
            name: name.to_string(),
            description: description.to_string(),
            price: first.price,
            currency: currency.to_string(),
            game_platform: category.to_string(),
            image: self.image.clone(),
            currency_icon: self.currency_icon.clone(),
            price_options: self.price_options.clone(),
        })
    }
}

fn validate_news(draft: &NewsDraft) -> Result<NewsDraft> {
    let trimmed = NewsDraft {
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        date: draft.date.trim().to_string(),
        icon: draft.icon.trim().to_string(),
    };
    if trimmed.title.is_empty()
        || trimmed.description.is_empty()
        || trimmed.date.is_empty()
        || trimmed.icon.is_empty()
    {
        return Err(Error::Validation("Please fill in all fields".to_string()));
    }
    Ok(trimmed)
}

/// 管理后台
pub struct AdminConsole<'a, T: Transport> {
    api: &'a ApiClient<T>,
    session: &'a Session,
}

impl<'a, T: Transport> AdminConsole<'a, T> {
    pub fn new(api: &'a ApiClient<T>, gate: &AccessGate, session: Option<&'a Session>) -> Result<Self> {
        let session = gate.require_admin(session)?;
        Ok(Self { api, session })
    }

    pub fn session(&self) -> &Session {
        self.session
    }

    // ---- 商品 ----

    pub async fn games(&self) -> Result<Vec<GameItem>> {
        self.api.items().await
    }

    pub async fn add_game(&self, form: &GameForm) -> Result<i64> {
        let item = form.validate()?;
        let id = self.api.add_item(&item).await?;
        info!("{} added game {} as #{}", self.session.username, item.name, id);
        Ok(id)
    }

    pub async fn delete_game(&self, item_id: i64) -> Result<()> {
        self.api.delete_item(item_id).await?;
        info!("{} deleted game #{}", self.session.username, item_id);
        Ok(())
    }

    // ---- 轮播图 ----

    pub async fn promos(&self) -> Result<Vec<Promo>> {
        self.api.promos().await
    }

    pub async fn add_promo(&self, promo: &NewPromo) -> Result<i64> {
        if promo.image.is_empty() {
            return Err(Error::Validation("Please select an image".to_string()));
        }
        if !is_image_data_url(&promo.image) {
            return Err(Error::Validation(
                "Invalid promo image format. Please upload a valid image file.".to_string(),
            ));
        }
        let id = self.api.add_promo(promo).await?;
        info!("{} added promo #{}", self.session.username, id);
        Ok(id)
    }

    pub async fn delete_promo(&self, promo_id: i64) -> Result<()> {
        self.api.delete_promo(promo_id).await?;
        info!("{} deleted promo #{}", self.session.username, promo_id);
        Ok(())
    }

    // ---- 新闻 ----

    pub async fn news(&self) -> Result<Vec<News>> {
        self.api.news().await
    }

    pub async fn add_news(&self, draft: &NewsDraft) -> Result<i64> {
        let draft = validate_news(draft)?;
        let id = self.api.add_news(&draft).await?;
        info!("{} added news #{}", self.session.username, id);
        Ok(id)
    }

    pub async fn update_news(&self, news_id: i64, draft: &NewsDraft) -> Result<()> {
        let draft = validate_news(draft)?;
        self.api.update_news(news_id, &draft).await?;
        info!("{} updated news #{}", self.session.username, news_id);
        Ok(())
    }

    pub async fn delete_news(&self, news_id: i64) -> Result<()> {
        self.api.delete_news(news_id).await?;
        info!("{} deleted news #{}", self.session.username, news_id);
        Ok(())
    }

    // ---- 交易看板 ----

    pub async fn transactions(&self) -> Result<(Vec<Transaction>, TransactionStats)> {
        let transactions = self.api.all_transactions().await?;
        let stats = TransactionStats::from_transactions(&transactions);
        Ok((transactions, stats))
    }
}
