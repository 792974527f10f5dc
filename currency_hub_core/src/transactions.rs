//! 交易记录展示与统计

use crate::catalog::format_peso;
use crate::types::{Transaction, TransactionStatus};
use chrono::{DateTime, NaiveDateTime};
use std::collections::HashSet;

/// 交易统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionStats {
    pub total: usize,
    pub revenue: f64,
    pub completed: usize,
    pub pending: usize,
    pub unique_users: usize,
}

impl TransactionStats {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let count = |status: TransactionStatus| transactions.iter().filter(|t| t.status == status).count();
        Self {
            total: transactions.len(),
            revenue: transactions.iter().map(|t| t.final_price).sum(),
            completed: count(TransactionStatus::Completed),
            pending: count(TransactionStatus::Pending),
            unique_users: transactions.iter().map(|t| t.user_id).collect::<HashSet<_>>().len(),
        }
    }
}

/// 个人订单汇总
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrderTotals {
    pub orders: usize,
    pub spent: f64,
}

impl OrderTotals {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        Self {
            orders: transactions.len(),
            spent: transactions.iter().map(|t| t.final_price).sum(),
        }
    }

    pub fn spent_display(&self) -> String {
        format_peso(self.spent)
    }
}

/// 状态徽标；未知状态按待处理显示
pub fn status_badge(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Completed => "COMPLETED",
        TransactionStatus::Pending | TransactionStatus::Unknown => "PENDING",
        TransactionStatus::Failed => "FAILED",
        TransactionStatus::Refunded => "REFUNDED",
    }
}

/// `#000123`
pub fn format_order_number(id: i64) -> String {
    format!("#{:06}", id)
}

/// 后端时间为不带时区的 ISO 格式，也兼容 RFC 3339
pub fn format_transaction_date(value: Option<&str>) -> String {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return "Unknown date".to_string(),
    };

    let parsed = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|d| d.naive_local()));

    match parsed {
        Some(dt) => dt.format("%b %-d, %Y %I:%M %p").to_string(),
        None => "Invalid date".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: i64, user_id: i64, price: f64, status: TransactionStatus) -> Transaction {
        Transaction {
            id,
            user_id,
            item_id: 1,
            quantity: 1,
            final_price: price,
            status,
            created_at: None,
            item_name: None,
            currency: None,
            game_platform: None,
            user_username: None,
            user_email: None,
        }
    }

    #[test]
    fn test_stats() {
        let list = vec![
            tx(1, 1, 50.0, TransactionStatus::Completed),
            tx(2, 1, 100.0, TransactionStatus::Pending),
            tx(3, 2, 25.5, TransactionStatus::Completed),
            tx(4, 3, 10.0, TransactionStatus::Refunded),
        ];
        let stats = TransactionStats::from_transactions(&list);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.revenue, 185.5);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.unique_users, 3);
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(TransactionStats::from_transactions(&[]), TransactionStats::default());
    }

    #[test]
    fn test_order_totals() {
        let list = vec![
            tx(1, 7, 50.0, TransactionStatus::Completed),
            tx(2, 7, 120.25, TransactionStatus::Pending),
        ];
        let totals = OrderTotals::from_transactions(&list);
        assert_eq!(totals.orders, 2);
        assert_eq!(totals.spent_display(), "₱170.25");
        assert_eq!(OrderTotals::default().spent_display(), "₱0.00");
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_order_number(42), "#000042");
        assert_eq!(status_badge(TransactionStatus::Failed), "FAILED");
        assert_eq!(status_badge(TransactionStatus::Unknown), "PENDING");
        assert_eq!(
            format_transaction_date(Some("2024-01-15T14:05:00")),
            "Jan 15, 2024 02:05 PM"
        );
        assert_eq!(format_transaction_date(None), "Unknown date");
        assert_eq!(format_transaction_date(Some("yesterday")), "Invalid date");
    }
}
