use std::path::PathBuf;
use std::time::Duration;

/// 执行阶段的错误，最终都会被转换为失败的 `RunResult`
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("timeout of {}ms exceeded", .0.as_millis())]
    Timeout(Duration),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    #[error("Failed to read file {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode request body: {0}")]
    Body(String),

    #[error("Proxy responded with HTTP {status}")]
    ProxyStatus { status: u16 },

    #[error("Malformed proxy response: {0}")]
    ProxyReply(#[from] serde_json::Error),

    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

impl ExecuteError {
    /// 将 reqwest 错误中的超时单独分类
    pub fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            ExecuteError::Timeout(timeout)
        } else {
            ExecuteError::Transport(error)
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecuteError::Timeout(_))
    }
}
