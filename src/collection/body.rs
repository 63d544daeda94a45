use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 原始请求体的内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RawKind {
    Json,
    #[default]
    Text,
    Xml,
    Sparql,
}

impl RawKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            RawKind::Json => "application/json",
            RawKind::Text => "text/plain",
            RawKind::Xml => "application/xml",
            RawKind::Sparql => "application/sparql-query",
        }
    }
}

/// 请求体
///
/// 序列化时带 `mode` 标签；旧格式（无标签）通过 [`RequestBody::from_value`] 按结构推断。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum RequestBody {
    Raw { kind: RawKind, data: String },
    UrlEncoded { fields: Vec<FormField> },
    Multipart { fields: Vec<MultipartField> },
    File { files: Vec<FileEntry> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl FormField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MultipartKind {
    #[default]
    Text,
    File,
}

/// multipart 字段；`kind == file` 时 value 是文件路径（多个路径用 `|` 分隔）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartField {
    pub name: String,
    #[serde(default)]
    pub value: String,
    /// 缺省为 text
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: MultipartKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl MultipartField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: MultipartKind::Text,
            enabled: true,
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: path.into(),
            kind: MultipartKind::File,
            enabled: true,
        }
    }

    /// file 字段的所有路径
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.value.split('|').map(str::trim).filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default = "default_true")]
    pub selected: bool,
}

fn default_true() -> bool {
    true
}

impl RequestBody {
    pub fn json(data: impl Into<String>) -> Self {
        RequestBody::Raw {
            kind: RawKind::Json,
            data: data.into(),
        }
    }

    pub fn text(data: impl Into<String>) -> Self {
        RequestBody::Raw {
            kind: RawKind::Text,
            data: data.into(),
        }
    }

    pub fn url_encoded(fields: Vec<FormField>) -> Self {
        RequestBody::UrlEncoded { fields }
    }

    pub fn multipart(fields: Vec<MultipartField>) -> Self {
        RequestBody::Multipart { fields }
    }

    pub fn is_json(&self) -> bool {
        matches!(
            self,
            RequestBody::Raw {
                kind: RawKind::Json,
                ..
            }
        )
    }

    /// 从 JSON 值构造请求体
    ///
    /// 有 `mode` 字段时按标签解析；否则按结构推断：
    /// - 对象且带 `kind` → raw
    /// - 数组元素带 `kind`/`type` → multipart
    /// - 数组元素带 `filePath` → 文件列表
    /// - 其他数组 → url-encoded
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Object(ref map) if map.contains_key("mode") => serde_json::from_value(value),
            Value::Object(mut map) if map.contains_key("kind") => {
                let kind = serde_json::from_value(map.remove("kind").unwrap_or_default())?;
                let data = match map.remove("data") {
                    Some(Value::String(s)) => s,
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                Ok(RequestBody::Raw { kind, data })
            }
            Value::Array(items) => {
                let has_field = |key: &str| {
                    items
                        .iter()
                        .any(|item| item.get(key).is_some_and(|v| !v.is_null()))
                };

                if has_field("kind") || has_field("type") {
                    Ok(RequestBody::Multipart {
                        fields: serde_json::from_value(Value::Array(items))?,
                    })
                } else if has_field("filePath") {
                    Ok(RequestBody::File {
                        files: serde_json::from_value(Value::Array(items))?,
                    })
                } else {
                    Ok(RequestBody::UrlEncoded {
                        fields: serde_json::from_value(Value::Array(items))?,
                    })
                }
            }
            other => Err(serde_json::Error::custom(format!(
                "unrecognised request body shape: {}",
                other
            ))),
        }
    }

    /// 脚本中看到的请求体形式
    ///
    /// JSON raw 体尽量解析为对象，其余 raw 体为字符串，列表体为数组。
    pub fn to_script_value(&self) -> Value {
        match self {
            RequestBody::Raw {
                kind: RawKind::Json,
                data,
            } => serde_json::from_str(data).unwrap_or_else(|_| Value::String(data.clone())),
            RequestBody::Raw { data, .. } => Value::String(data.clone()),
            RequestBody::UrlEncoded { fields } => serde_json::to_value(fields).unwrap_or_default(),
            RequestBody::Multipart { fields } => serde_json::to_value(fields).unwrap_or_default(),
            RequestBody::File { files } => serde_json::to_value(files).unwrap_or_default(),
        }
    }

    /// 将脚本写回的值应用到请求体，保持原有的编码方式
    pub fn apply_script_value(
        current: Option<&RequestBody>,
        value: Value,
    ) -> Result<Option<RequestBody>, serde_json::Error> {
        let body = match (current, value) {
            (_, Value::Null) => None,
            (Some(RequestBody::Raw { kind, .. }), Value::String(data)) => {
                Some(RequestBody::Raw { kind: *kind, data })
            }
            (Some(RequestBody::Raw { kind, .. }), other) => Some(RequestBody::Raw {
                kind: *kind,
                data: other.to_string(),
            }),
            (Some(RequestBody::UrlEncoded { .. }), value @ Value::Array(_)) => {
                Some(RequestBody::UrlEncoded {
                    fields: serde_json::from_value(value)?,
                })
            }
            (Some(RequestBody::Multipart { .. }), value @ Value::Array(_)) => {
                Some(RequestBody::Multipart {
                    fields: serde_json::from_value(value)?,
                })
            }
            (Some(RequestBody::File { .. }), value @ Value::Array(_)) => Some(RequestBody::File {
                files: serde_json::from_value(value)?,
            }),
            (_, Value::String(data)) => Some(RequestBody::text(data)),
            (_, other) => Some(RequestBody::json(other.to_string())),
        };
        Ok(body)
    }
}

/// 兼容反序列化：接受带标签与不带标签的请求体
pub fn deserialize_compat<'de, D>(deserializer: D) -> Result<Option<RequestBody>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => RequestBody::from_value(value)
            .map(Some)
            .map_err(D::Error::custom),
    }
}
