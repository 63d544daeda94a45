use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::collection::{Param, RequestItem};
use crate::http::REQUEST_TIMEOUT;
use crate::http::auth::{self, Credential};
use crate::http::body::{self, PreparedBody};
use crate::http::error::ExecuteError;
use crate::http::response::ResponseData;
use crate::variable::apply_params;

/// 直连模式的 HTTP 客户端
#[derive(Clone)]
pub struct Client {
    inner: reqwest::Client,
    timeout: Duration,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    pub fn new() -> Self {
        let inner = reqwest::Client::builder()
            .user_agent(concat!("collrun/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build configured HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            });

        Self::with_client(inner)
    }

    pub fn with_client(inner: reqwest::Client) -> Self {
        Self {
            inner,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// 缩短截止时间，用于测试超时路径
    #[cfg(test)]
    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 发送一个已插值的请求
    ///
    /// 请求受固定的 30 秒截止时间约束，覆盖连接到读完响应体的全过程。
    pub async fn send(&self, request: &RequestItem) -> Result<ResponseData, ExecuteError> {
        let method = parse_method(&request.method)?;

        let mut headers = build_headers(request)?;
        let mut url_text = request.url.clone();

        match auth::credential(&request.auth) {
            Some(Credential::Header { name, value }) => {
                headers.insert(header_name(&name)?, header_value(&name, &value)?);
            }
            Some(Credential::Query { name, value }) => {
                url_text = apply_params(&url_text, &[Param::query(name, value)]);
            }
            None => {}
        }

        let url = Url::parse(&url_text).map_err(|source| ExecuteError::InvalidUrl {
            url: url_text.clone(),
            source,
        })?;

        let prepared = match &request.body {
            Some(body) => body::prepare(body).await?,
            None => None,
        };

        // 显式设置的 Content-Type（任意大小写）优先
        if let Some(content_type) = prepared.as_ref().and_then(PreparedBody::content_type)
            && !headers.contains_key(CONTENT_TYPE)
        {
            headers.insert(CONTENT_TYPE, header_value("Content-Type", content_type)?);
        }

        debug!("{} {}", method, url);

        let mut builder = self
            .inner
            .request(method, url)
            .timeout(self.timeout)
            .headers(headers);

        builder = match prepared {
            Some(PreparedBody::Bytes { content, .. }) => builder.body(content),
            Some(PreparedBody::Multipart(form)) => builder.multipart(form),
            None => builder,
        };

        let start = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| ExecuteError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = collect_headers(response.headers());
        let text = response
            .text()
            .await
            .map_err(|e| ExecuteError::from_reqwest(e, self.timeout))?;
        let duration = start.elapsed();

        let is_json = headers
            .get("content-type")
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
        let data = if is_json {
            serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone()))
        } else {
            Value::String(text.clone())
        };

        Ok(ResponseData {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            data,
            size: text.len(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            url: final_url,
        })
    }
}

/// 方法名在执行时才校验，任意大小写均可
pub fn parse_method(method: &str) -> Result<Method, ExecuteError> {
    let normalized = method.trim().to_ascii_uppercase();
    if normalized.is_empty() {
        return Err(ExecuteError::InvalidMethod(method.to_string()));
    }
    Method::from_bytes(normalized.as_bytes())
        .map_err(|_| ExecuteError::InvalidMethod(method.to_string()))
}

fn build_headers(request: &RequestItem) -> Result<HeaderMap, ExecuteError> {
    let mut headers = HeaderMap::new();
    for header in request.enabled_headers() {
        if header.name.trim().is_empty() {
            continue;
        }
        headers.append(
            header_name(&header.name)?,
            header_value(&header.name, &header.value)?,
        );
    }
    Ok(headers)
}

fn header_name(name: &str) -> Result<HeaderName, ExecuteError> {
    HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|_| ExecuteError::InvalidHeader(name.to_string()))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ExecuteError> {
    HeaderValue::from_str(value).map_err(|_| ExecuteError::InvalidHeader(name.to_string()))
}

/// 小写 header 名，重复的 header 以 ", " 连接
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match collected.entry(name.as_str().to_string()) {
            Entry::Occupied(mut existing) => {
                let joined: &mut String = existing.get_mut();
                joined.push_str(", ");
                joined.push_str(&value);
            }
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }
    collected
}
