//! 四步购买流程
//!
//! 选择套餐 → 选择支付方式 → 填写信息并确认 → 下单成功。
//! 状态只存在于内存中，打开时创建，关闭时整体丢弃。
//!
//! 返回上一步不会清除已有选择：套餐、支付方式和充值信息彼此独立，
//! 确认页始终按当前选择重新生成摘要。

use crate::catalog::{format_peso, packages_for, Package};
use crate::client::{ApiClient, Transport};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::storage::{DisplayCache, KeyValueStore, OrderRecord};
use crate::types::{GameItem, PurchaseRequest};
use chrono::Utc;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// 流程步骤
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    #[default]
    PackageSelection,
    Payment,
    Review,
    Success,
}

impl Step {
    pub fn number(self) -> u8 {
        match self {
            Step::PackageSelection => 1,
            Step::Payment => 2,
            Step::Review => 3,
            Step::Success => 4,
        }
    }
}

/// 支付方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    GCash,
    PayPal,
    Card,
    BankTransfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::GCash,
        PaymentMethod::PayPal,
        PaymentMethod::Card,
        PaymentMethod::BankTransfer,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PaymentMethod::GCash => "gcash",
            PaymentMethod::PayPal => "paypal",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PaymentMethod::GCash => "GCash",
            PaymentMethod::PayPal => "PayPal",
            PaymentMethod::Card => "Credit Card",
            PaymentMethod::BankTransfer => "Bank Transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    /// 接受键名（`gcash`）或展示名（`GCash`），不区分大小写
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.key().eq_ignore_ascii_case(s) || m.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Validation(format!("Unknown payment method: {}", s)))
    }
}

/// 充值账号信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDetails {
    /// 游戏内用户 ID
    pub user_id: String,
    pub server: String,
    pub email: String,
}

impl UserDetails {
    pub fn new(user_id: &str, server: Option<&str>, email: &str) -> Self {
        let server = server
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Not specified");
        Self {
            user_id: user_id.trim().to_string(),
            server: server.to_string(),
            email: email.trim().to_string(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::Validation("Please enter your User ID!".to_string()));
        }
        if self.email.trim().is_empty() {
            return Err(Error::Validation("Please enter your email address!".to_string()));
        }
        Ok(())
    }
}

/// 确认页摘要
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub game: String,
    pub package: String,
    pub user_id: String,
    pub server: String,
    pub payment: PaymentMethod,
    pub email: String,
    pub total: f64,
}

/// 下单成功后的回执
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
    /// 仅供用户参考的订单号
    pub order_number: String,
    /// 服务端交易 ID
    pub transaction_id: i64,
    pub game: String,
    pub package: String,
    pub user_id: String,
    pub payment: PaymentMethod,
    pub total: f64,
}

impl OrderReceipt {
    pub fn total_display(&self) -> String {
        format_peso(self.total)
    }

    pub fn order_record(&self) -> OrderRecord {
        OrderRecord {
            order_number: self.order_number.clone(),
            game: self.game.clone(),
            package: self.package.clone(),
            price: self.total,
            user_id: self.user_id.clone(),
            payment: self.payment.display_name().to_string(),
            date: Utc::now(),
            status: "completed".to_string(),
        }
    }
}

/// `GG<毫秒时间戳><0..10000 随机数>`
pub fn generate_order_number() -> String {
    let random: u32 = rand::thread_rng().gen_range(0..10000);
    format!("GG{}{}", Utc::now().timestamp_millis(), random)
}

/// 购买流程状态
#[derive(Debug, Clone, Default)]
pub struct PurchaseFlow {
    step: Step,
    game: Option<GameItem>,
    selected_package: Option<Package>,
    selected_payment: Option<PaymentMethod>,
    details: UserDetails,
    receipt: Option<OrderReceipt>,
}

impl PurchaseFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为指定商品打开流程，需要已登录
    pub fn open(&mut self, session: Option<&Session>, game: GameItem) -> Result<()> {
        if session.is_none() {
            return Err(Error::NotAuthenticated);
        }

        info!("Opening purchase flow for {}", game.name);
        *self = Self {
            game: Some(game),
            ..Self::default()
        };
        Ok(())
    }

    /// 关闭流程，所有状态回到初始值
    pub fn close(&mut self) {
        if let Some(game) = &self.game {
            debug!("Closing purchase flow for {}", game.name);
        }
        *self = Self::default();
    }

    pub fn is_open(&self) -> bool {
        self.game.is_some()
    }

    pub fn current_step(&self) -> Step {
        self.step
    }

    pub fn game(&self) -> Option<&GameItem> {
        self.game.as_ref()
    }

    pub fn packages(&self) -> Vec<Package> {
        self.game.as_ref().map(packages_for).unwrap_or_default()
    }

    pub fn selected_package(&self) -> Option<&Package> {
        self.selected_package.as_ref()
    }

    pub fn selected_payment(&self) -> Option<PaymentMethod> {
        self.selected_payment
    }

    pub fn details(&self) -> &UserDetails {
        &self.details
    }

    pub fn receipt(&self) -> Option<&OrderReceipt> {
        self.receipt.as_ref()
    }

    fn expect_step(&self, expected: &[Step], action: &str) -> Result<()> {
        if !self.is_open() {
            return Err(Error::InvalidState("Purchase flow is not open".to_string()));
        }
        if !expected.contains(&self.step) {
            return Err(Error::InvalidState(format!(
                "Cannot {} at step {}",
                action,
                self.step.number()
            )));
        }
        Ok(())
    }

    pub fn select_package(&mut self, package: Package) -> Result<()> {
        self.expect_step(&[Step::PackageSelection], "select a package")?;
        debug!("Selected package {} ({})", package.label, format_peso(package.price));
        self.selected_package = Some(package);
        Ok(())
    }

    pub fn select_payment(&mut self, method: PaymentMethod) -> Result<()> {
        self.expect_step(&[Step::Payment], "select a payment method")?;
        debug!("Selected payment {}", method);
        self.selected_payment = Some(method);
        Ok(())
    }

    pub fn set_details(&mut self, details: UserDetails) -> Result<()> {
        self.expect_step(&[Step::Payment, Step::Review], "enter account details")?;
        self.details = details;
        Ok(())
    }

    /// 前进一步；守卫不满足时返回提示，状态不变
    pub fn advance(&mut self) -> Result<Step> {
        self.expect_step(&[Step::PackageSelection, Step::Payment], "advance")?;

        let next = match self.step {
            Step::PackageSelection => {
                if self.selected_package.is_none() {
                    return Err(Error::Validation("Please select a package first!".to_string()));
                }
                Step::Payment
            }
            _ => {
                if self.selected_payment.is_none() {
                    return Err(Error::Validation("Please select a payment method!".to_string()));
                }
                Step::Review
            }
        };

        info!("Purchase flow: step {} -> {}", self.step.number(), next.number());
        self.step = next;
        Ok(next)
    }

    /// 后退一步，保留已有选择
    pub fn back(&mut self) -> Result<Step> {
        self.expect_step(&[Step::Payment, Step::Review], "go back")?;
        let previous = match self.step {
            Step::Review => Step::Payment,
            _ => Step::PackageSelection,
        };
        debug!("Purchase flow: step {} -> {}", self.step.number(), previous.number());
        self.step = previous;
        Ok(previous)
    }

    pub fn summary(&self) -> Option<OrderSummary> {
        let game = self.game.as_ref()?;
        let package = self.selected_package.as_ref()?;
        let payment = self.selected_payment?;
        Some(OrderSummary {
            game: game.name.clone(),
            package: package.label.clone(),
            user_id: self.details.user_id.clone(),
            server: self.details.server.clone(),
            payment,
            email: self.details.email.clone(),
            total: package.price,
        })
    }

    /// 提交订单
    ///
    /// 只发送一次下单请求。请求成功后才进入成功页；失败时停留在确认页并返回错误。
    pub async fn place_order<T: Transport, S: KeyValueStore>(
        &mut self,
        api: &ApiClient<T>,
        session: &Session,
        cache: &DisplayCache<S>,
    ) -> Result<OrderReceipt> {
        self.expect_step(&[Step::Review], "place an order")?;
        self.details.validate()?;

        let (game, package, payment) = match (&self.game, &self.selected_package, self.selected_payment) {
            (Some(game), Some(package), Some(payment)) => (game, package, payment),
            _ => return Err(Error::InvalidState("Missing order information".to_string())),
        };

        let request = PurchaseRequest {
            user_id: session.user_id,
            item_id: game.id,
            quantity: 1,
            final_price: package.price,
        };

        let transaction = api.purchase(&request).await?;

        let receipt = OrderReceipt {
            order_number: generate_order_number(),
            transaction_id: transaction.id,
            game: game.name.clone(),
            package: package.label.clone(),
            user_id: self.details.user_id.clone(),
            payment,
            total: package.price,
        };

        if let Err(e) = cache.record_order(receipt.order_record()) {
            warn!("Failed to record order locally: {}", e);
        }

        info!(
            "Order {} placed (transaction {})",
            receipt.order_number, receipt.transaction_id
        );
        self.step = Step::Success;
        self.receipt = Some(receipt.clone());
        Ok(receipt)
    }
}
