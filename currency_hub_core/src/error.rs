//! 错误类型定义

use thiserror::Error;

/// 错误类型
///
/// 每个变体的 `Display` 即为展示给用户的提示文本。
#[derive(Debug, Error)]
pub enum Error {
    /// 网络错误（连接失败、超时、响应体无法读取）
    #[error("Network error: {0}")]
    Network(String),

    /// 统一后的接口错误；`status` 为空表示请求未到达服务端
    #[error("{message}")]
    Api { status: Option<u16>, message: String },

    /// 表单校验失败
    #[error("{0}")]
    Validation(String),

    /// 权限不足
    #[error("{0}")]
    AccessDenied(String),

    /// 未登录
    #[error("Please login to continue")]
    NotAuthenticated,

    /// 状态错误
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 编解码错误
    #[error("Encoding/Decoding error: {0}")]
    Encoding(String),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Encoding(e.to_string())
    }
}

/// 结果类型
pub type Result<T> = std::result::Result<T, Error>;
