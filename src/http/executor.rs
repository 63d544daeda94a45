use tracing::warn;

use crate::collection::RequestItem;
use crate::http::client::Client;
use crate::http::proxy::ProxyClient;
use crate::http::response::RunResult;

/// 把已插值的请求变成一次线上调用
///
/// 配置了代理时转发给代理，否则直接发送。任何错误都转换为失败的 `RunResult`，
/// 不会向调用方抛出。
#[derive(Clone, Default)]
pub struct Executor {
    client: Client,
    proxy: Option<ProxyClient>,
}

impl Executor {
    /// 直连模式
    pub fn new() -> Self {
        Self::default()
    }

    /// 代理模式，所有请求经由 `{base}/proxy` 转发
    pub fn with_proxy(base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            proxy: Some(ProxyClient::new(base)),
        }
    }

    /// `None` 或空字符串时为直连模式
    pub fn from_proxy(proxy: Option<&str>) -> Self {
        match proxy.map(str::trim).filter(|p| !p.is_empty()) {
            Some(base) => Self::with_proxy(base),
            None => Self::new(),
        }
    }

    /// 使用指定的直连客户端
    #[cfg(test)]
    pub(crate) fn with_client(client: Client) -> Self {
        Self {
            client,
            proxy: None,
        }
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_ref().map(ProxyClient::base)
    }

    pub async fn execute(&self, request: &RequestItem) -> RunResult {
        let outcome = match &self.proxy {
            Some(proxy) => proxy.send(request).await,
            None => self.client.send(request).await.map(RunResult::Success),
        };

        match outcome {
            Ok(result) => result,
            Err(e) if e.is_timeout() => {
                warn!("Request timed out: {}", e);
                RunResult::cancelled(e.to_string())
            }
            Err(e) => {
                warn!("Request failed: {}", e);
                RunResult::failure(e.to_string())
            }
        }
    }
}
