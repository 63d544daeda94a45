use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 一次 HTTP 调用的标准化结果
///
/// 成功与失败两种形状互斥，序列化时不带标签：
/// 成功 `{status, statusText, headers, data, size, durationMs, url}`，
/// 失败 `{error, isCancel?}`。代理的回复也按同样的形状解析。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunResult {
    Success(ResponseData),
    Failure(FailureData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    /// 小写 header 名；重复的 header 以 ", " 连接
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// JSON 响应解析为值，其余为字符串
    #[serde(default)]
    pub data: Value,
    /// 响应文本的字节数
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub duration_ms: u64,
    /// 最终 URL（跟随重定向后）
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureData {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_cancel: Option<bool>,
}

impl RunResult {
    pub fn failure(error: impl Into<String>) -> Self {
        RunResult::Failure(FailureData {
            error: error.into(),
            is_cancel: None,
        })
    }

    /// 超时取消导致的失败
    pub fn cancelled(error: impl Into<String>) -> Self {
        RunResult::Failure(FailureData {
            error: error.into(),
            is_cancel: Some(true),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Success(_))
    }

    pub fn response(&self) -> Option<&ResponseData> {
        match self {
            RunResult::Success(data) => Some(data),
            RunResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RunResult::Success(_) => None,
            RunResult::Failure(failure) => Some(&failure.error),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }
}

impl ResponseData {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_serialization() {
        let json = serde_json::to_value(RunResult::failure("boom")).unwrap();
        assert_eq!(json, json!({"error": "boom"}));

        let json = serde_json::to_value(RunResult::cancelled("timeout")).unwrap();
        assert_eq!(json, json!({"error": "timeout", "isCancel": true}));
    }

    #[test]
    fn test_deserialize_proxy_success() {
        let result: RunResult = serde_json::from_value(json!({
            "status": 201,
            "statusText": "Created",
            "headers": {"content-type": "application/json"},
            "data": {"id": 1},
            "size": 8,
            "durationMs": 12,
            "url": "http://example.com/users"
        }))
        .unwrap();

        let data = result.response().unwrap();
        assert_eq!(data.status, 201);
        assert_eq!(data.data, json!({"id": 1}));
        assert!(data.is_success());
    }

    #[test]
    fn test_deserialize_proxy_error() {
        let result: RunResult = serde_json::from_value(json!({"error": "ECONNREFUSED"})).unwrap();
        assert_eq!(result.error(), Some("ECONNREFUSED"));
        assert!(!result.is_success());
        assert_eq!(result.status(), None);
    }

    #[test]
    fn test_reject_shapeless_reply() {
        let result = serde_json::from_value::<RunResult>(json!({"hello": "world"}));
        assert!(result.is_err());
    }
}
