//! 登录会话
//!
//! 同一时间最多存在一条会话记录，保存在 [`SESSION_KEY`] 下，
//! 后写覆盖先写。会话没有过期时间，直到显式登出为止一直有效。

use crate::error::Result;
use crate::storage::{KeyValueStore, SESSION_KEY};
use crate::types::{AuthUser, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 会话信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub login_time: DateTime<Utc>,
    #[serde(default)]
    pub remember_me: bool,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// 会话存储
pub struct SessionStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// 登录或注册成功后写入会话，缺省角色为 `user`
    pub fn create_session(&self, user: &AuthUser, remember_me: bool) -> Result<Session> {
        let session = Session {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.unwrap_or_default(),
            login_time: Utc::now(),
            remember_me,
        };

        self.store.set(SESSION_KEY, &serde_json::to_string(&session)?)?;
        info!("Session created for {} with role {}", session.username, session.role);
        Ok(session)
    }

    /// 读取当前会话；记录损坏时视为未登录
    pub fn current_session(&self) -> Result<Option<Session>> {
        let raw = match self.store.get(SESSION_KEY)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Ignoring unreadable session record: {}", e);
                Ok(None)
            }
        }
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.current_session(), Ok(Some(_)))
    }

    pub fn logout(&self) -> Result<()> {
        self.store.remove(SESSION_KEY)?;
        info!("Session cleared");
        Ok(())
    }
}
