use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::collection::{Param, RawKind, RequestBody, RequestItem};
use crate::http::REQUEST_TIMEOUT_MS;
use crate::http::auth::{self, Credential};
use crate::http::body;
use crate::http::error::ExecuteError;
use crate::http::response::RunResult;
use crate::variable::apply_params;

/// 转发给代理的请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyPayload {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    /// 仅告知代理，调用方自己不强制
    pub timeout: u64,
}

impl ProxyPayload {
    /// 由已插值的请求构造转发载荷，认证与默认 Content-Type 在这里注入
    pub fn from_request(request: &RequestItem) -> Result<Self, ExecuteError> {
        let mut url = request.url.clone();
        let mut headers: BTreeMap<String, String> = request
            .enabled_headers()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();

        match auth::credential(&request.auth) {
            Some(Credential::Header { name, value }) => {
                headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
                headers.insert(name, value);
            }
            Some(Credential::Query { name, value }) => {
                url = apply_params(&url, &[Param::query(name, value)]);
            }
            None => {}
        }

        let body = match &request.body {
            Some(body) => {
                let default_type = match body {
                    RequestBody::Raw {
                        kind: RawKind::Json,
                        ..
                    } => Some("application/json"),
                    RequestBody::UrlEncoded { .. } => Some("application/x-www-form-urlencoded"),
                    _ => None,
                };
                if let Some(content_type) = default_type
                    && !request.has_header("content-type")
                {
                    headers.insert("Content-Type".to_string(), content_type.to_string());
                }
                body::proxy_body(body)?
            }
            None => Value::Null,
        };

        Ok(Self {
            url,
            method: request.method.trim().to_ascii_uppercase(),
            headers,
            body,
            timeout: REQUEST_TIMEOUT_MS,
        })
    }
}

/// 代理模式客户端：`POST {base}/proxy`
#[derive(Clone)]
pub struct ProxyClient {
    inner: reqwest::Client,
    base: String,
}

impl ProxyClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base: base.into(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn endpoint(&self) -> String {
        format!("{}/proxy", self.base.trim_end_matches('/'))
    }

    /// 转发请求，代理的 JSON 回复按 `RunResult` 原样采用
    pub async fn send(&self, request: &RequestItem) -> Result<RunResult, ExecuteError> {
        let payload = ProxyPayload::from_request(request)?;
        let endpoint = self.endpoint();
        debug!("Forwarding {} {} via {}", payload.method, payload.url, endpoint);

        let response = self.inner.post(&endpoint).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExecuteError::ProxyStatus {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
