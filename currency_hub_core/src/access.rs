//! 管理页访问检查
//!
//! 这只是界面层的便利检查，用来避免向普通用户展示管理页面。
//! 真正的权限校验必须由后端在每个管理接口上完成；本地会话记录可以被随意改写，
//! 不能作为安全边界。

use crate::error::{Error, Result};
use crate::session::Session;
use std::time::Duration;
use tracing::{info, warn};

/// 拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    NotLoggedIn,
    NotAdmin,
}

impl DenialReason {
    pub fn notice(self) -> &'static str {
        match self {
            DenialReason::NotLoggedIn => "Please login to access admin panel",
            DenialReason::NotAdmin => "Access denied. Admin privileges required.",
        }
    }
}

/// 检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied {
        reason: DenialReason,
        notice: String,
        /// 延迟结束后跳转的页面
        redirect_to: String,
        delay: Duration,
    },
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted)
    }
}

/// 管理页访问检查
#[derive(Debug, Clone)]
pub struct AccessGate {
    pub redirect_to: String,
    pub delay: Duration,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self {
            redirect_to: "index".to_string(),
            delay: Duration::from_secs(2),
        }
    }
}

impl AccessGate {
    pub fn check(&self, session: Option<&Session>) -> AccessDecision {
        let reason = match session {
            None => DenialReason::NotLoggedIn,
            Some(session) if !session.is_admin() => DenialReason::NotAdmin,
            Some(session) => {
                info!("Admin access granted for {}", session.username);
                return AccessDecision::Granted;
            }
        };

        warn!("Admin access denied: {:?}", reason);
        AccessDecision::Denied {
            reason,
            notice: reason.notice().to_string(),
            redirect_to: self.redirect_to.clone(),
            delay: self.delay,
        }
    }

    /// 通过检查时返回会话本身
    pub fn require_admin<'s>(&self, session: Option<&'s Session>) -> Result<&'s Session> {
        match (self.check(session), session) {
            (AccessDecision::Granted, Some(session)) => Ok(session),
            (AccessDecision::Denied { notice, .. }, _) => Err(Error::AccessDenied(notice)),
            (AccessDecision::Granted, None) => Err(Error::NotAuthenticated),
        }
    }
}
