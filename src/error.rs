use std::path::PathBuf;
use thiserror::Error;

use crate::variable::ConfigError;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("无效的请求 {path}: {message}")]
    InvalidRequest { path: PathBuf, message: String },

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for collrun crate
pub type Result<T> = std::result::Result<T, RunnerError>;
