use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::collection::auth::Auth;
use crate::collection::body::{self, RequestBody};
use crate::error::{Result, RunnerError};

/// 集合中的单个请求描述
///
/// 所有字符串字段都可以包含 `{{name}}` 占位符，运行时由插值器替换。
/// 脚本阶段可以原地修改 `url`、`method`、`headers` 和 `body`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestItem {
    /// 请求名称（可选，供脚本和报告使用）
    #[serde(default)]
    pub name: String,

    /// HTTP 方法，执行时才校验
    #[serde(default = "default_method")]
    pub method: String,

    /// URL 模板
    pub url: String,

    #[serde(default)]
    pub params: Vec<Param>,

    #[serde(default)]
    pub headers: Vec<Header>,

    /// 请求体，兼容旧的无标签结构
    #[serde(
        default,
        deserialize_with = "body::deserialize_compat",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<RequestBody>,

    #[serde(default)]
    pub auth: Auth,

    #[serde(default)]
    pub scripts: Scripts,

    /// 请求级变量，目前仅作展示，不参与运行时解析
    #[serde(default)]
    pub variables: Vec<ItemVariable>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RequestItem {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            method: method.into(),
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            body: None,
            auth: Auth::None,
            scripts: Scripts::default(),
            variables: Vec::new(),
        }
    }

    /// 从 JSON 文件读取单个请求；未命名的请求以文件名命名
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut item: RequestItem = serde_json::from_str(&content)?;

        if item.url.trim().is_empty() {
            return Err(RunnerError::InvalidRequest {
                path: path.to_path_buf(),
                message: "url is empty".to_string(),
            });
        }

        if item.name.is_empty()
            && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
        {
            item.name = stem.to_string();
        }
        Ok(item)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_scripts(mut self, scripts: Scripts) -> Self {
        self.scripts = scripts;
        self
    }

    /// 所有未禁用的 header
    pub fn enabled_headers(&self) -> impl Iterator<Item = &Header> {
        self.headers.iter().filter(|h| !h.disabled)
    }

    /// 大小写不敏感地查找已启用的 header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.enabled_headers()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }
}

/// 参数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    #[default]
    Query,
    Path,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, rename = "type")]
    pub kind: ParamKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Param {
    pub fn query(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: ParamKind::Query,
            enabled: true,
        }
    }

    pub fn path(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: ParamKind::Path,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub disabled: bool,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            disabled: false,
        }
    }
}

/// 三个脚本阶段，每个都是可选的脚本正文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Scripts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<String>,
}

impl Scripts {
    pub fn pre_request(script: impl Into<String>) -> Self {
        Self {
            pre_request: Some(script.into()),
            ..Self::default()
        }
    }

    pub fn post_response(script: impl Into<String>) -> Self {
        Self {
            post_response: Some(script.into()),
            ..Self::default()
        }
    }

    pub fn tests(script: impl Into<String>) -> Self {
        Self {
            tests: Some(script.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemVariable {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::body::RawKind;

    #[test]
    fn test_deserialize_minimal_item() {
        let item: RequestItem = serde_json::from_str(r#"{"url": "http://example.com"}"#).unwrap();
        assert_eq!(item.method, "GET");
        assert!(item.headers.is_empty());
        assert!(item.body.is_none());
        assert_eq!(item.auth, Auth::None);
    }

    #[test]
    fn test_deserialize_full_item() {
        let json = r#"{
            "name": "Create user",
            "method": "POST",
            "url": "{{base_url}}/users/:id",
            "params": [
                {"name": "id", "value": "7", "type": "path"},
                {"name": "q", "value": "x", "type": "query", "enabled": false}
            ],
            "headers": [{"name": "X-Trace", "value": "1", "disabled": true}],
            "body": {"kind": "json", "data": "{\"a\": 1}"},
            "auth": {"kind": "bearer", "token": "{{token}}"},
            "scripts": {"preRequest": "bru.setVar('a', 1)"}
        }"#;

        let item: RequestItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.params[0].kind, ParamKind::Path);
        assert!(!item.params[1].enabled);
        assert!(item.headers[0].disabled);
        assert_eq!(
            item.body,
            Some(RequestBody::Raw {
                kind: RawKind::Json,
                data: "{\"a\": 1}".to_string()
            })
        );
        assert_eq!(item.scripts.pre_request.as_deref(), Some("bru.setVar('a', 1)"));
        assert!(item.scripts.tests.is_none());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("get-users.json");
        std::fs::write(&path, r#"{"url": "{{base}}/users"}"#).unwrap();

        let item = RequestItem::from_file(&path).unwrap();
        assert_eq!(item.name, "get-users");
        assert_eq!(item.url, "{{base}}/users");

        std::fs::write(&path, r#"{"url": " "}"#).unwrap();
        assert!(matches!(
            RequestItem::from_file(&path),
            Err(RunnerError::InvalidRequest { .. })
        ));

        std::fs::write(&path, "{oops").unwrap();
        assert!(matches!(
            RequestItem::from_file(&path),
            Err(RunnerError::JsonError(_))
        ));
    }

    #[test]
    fn test_header_lookup_ignores_case_and_disabled() {
        let mut item = RequestItem::new("GET", "http://example.com")
            .with_header("Content-Type", "text/plain");
        item.headers.push(Header {
            name: "Accept".to_string(),
            value: "*/*".to_string(),
            disabled: true,
        });

        assert_eq!(item.header("content-type"), Some("text/plain"));
        assert!(!item.has_header("accept"));
    }
}
