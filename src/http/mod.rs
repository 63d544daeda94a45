pub mod auth;
pub mod body;
pub mod client;
pub mod error;
pub mod executor;
pub mod proxy;
pub mod response;

use std::time::Duration;

/// 直连模式的固定截止时间；代理模式下只作为参数告知代理
pub const REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(REQUEST_TIMEOUT_MS);

// Re-export commonly used types for convenient access
pub use client::Client;
pub use error::ExecuteError;
pub use executor::Executor;
pub use proxy::{ProxyClient, ProxyPayload};
pub use response::{FailureData, ResponseData, RunResult};
