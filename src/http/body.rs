use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;

use crate::collection::{FileEntry, FormField, MultipartField, MultipartKind, RawKind, RequestBody};
use crate::http::error::ExecuteError;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// 编码后的请求体
pub enum PreparedBody {
    Bytes {
        content: Vec<u8>,
        /// 未显式设置 Content-Type 时使用的默认值
        content_type: Option<String>,
    },
    /// reqwest 会自动设置带 boundary 的 Content-Type
    Multipart(Form),
}

impl PreparedBody {
    pub fn content_type(&self) -> Option<&str> {
        match self {
            PreparedBody::Bytes { content_type, .. } => content_type.as_deref(),
            PreparedBody::Multipart(_) => None,
        }
    }
}

/// 按请求体的编码方式构造线上请求体
///
/// 文件列表只发送第一个选中的文件；没有选中的文件时不发送请求体。
pub async fn prepare(body: &RequestBody) -> Result<Option<PreparedBody>, ExecuteError> {
    match body {
        RequestBody::Raw { kind, data } => Ok(Some(PreparedBody::Bytes {
            content: data.clone().into_bytes(),
            content_type: (*kind == RawKind::Json).then(|| kind.content_type().to_string()),
        })),
        RequestBody::UrlEncoded { fields } => Ok(Some(PreparedBody::Bytes {
            content: encode_form(fields)?.into_bytes(),
            content_type: Some(FORM_CONTENT_TYPE.to_string()),
        })),
        RequestBody::Multipart { fields } => Ok(Some(PreparedBody::Multipart(
            build_multipart_form(fields).await?,
        ))),
        RequestBody::File { files } => match files.iter().find(|f| f.selected) {
            Some(entry) => read_file_body(entry).await.map(Some),
            None => Ok(None),
        },
    }
}

/// url-encoded 表单：跳过禁用的字段
pub fn encode_form(fields: &[FormField]) -> Result<String, ExecuteError> {
    let pairs: Vec<(&str, &str)> = fields
        .iter()
        .filter(|f| f.enabled)
        .map(|f| (f.name.as_str(), f.value.as_str()))
        .collect();

    serde_urlencoded::to_string(pairs).map_err(|e| ExecuteError::Body(e.to_string()))
}

/// 代理模式下请求体的 JSON 表示
///
/// raw 体原样作为字符串（JSON 体尽量解析为对象），url-encoded 体编码为字符串，
/// multipart 和文件列表以字段数组交给代理处理。
pub fn proxy_body(body: &RequestBody) -> Result<Value, ExecuteError> {
    match body {
        RequestBody::Raw { .. } => Ok(body.to_script_value()),
        RequestBody::UrlEncoded { fields } => Ok(Value::String(encode_form(fields)?)),
        RequestBody::Multipart { fields } => {
            let enabled: Vec<&MultipartField> = fields.iter().filter(|f| f.enabled).collect();
            serde_json::to_value(enabled).map_err(|e| ExecuteError::Body(e.to_string()))
        }
        RequestBody::File { .. } => Ok(body.to_script_value()),
    }
}

async fn build_multipart_form(fields: &[MultipartField]) -> Result<Form, ExecuteError> {
    let mut form = Form::new();

    for field in fields.iter().filter(|f| f.enabled) {
        match field.kind {
            MultipartKind::Text => {
                form = form.text(field.name.clone(), field.value.clone());
            }
            MultipartKind::File => {
                for path in field.paths() {
                    let file_path = Path::new(path);
                    let content = read_file(file_path).await?;

                    let filename = file_path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("file")
                        .to_string();

                    let mime_type = mime_guess::from_path(file_path)
                        .first_or_octet_stream()
                        .to_string();

                    let part = Part::bytes(content)
                        .file_name(filename)
                        .mime_str(&mime_type)
                        .map_err(|e| ExecuteError::Body(format!("Invalid MIME type: {e}")))?;

                    form = form.part(field.name.clone(), part);
                }
            }
        }
    }

    Ok(form)
}

async fn read_file_body(entry: &FileEntry) -> Result<PreparedBody, ExecuteError> {
    let file_path = Path::new(&entry.file_path);
    let content = read_file(file_path).await?;

    let content_type = entry
        .content_type
        .clone()
        .filter(|ct| !ct.trim().is_empty())
        .unwrap_or_else(|| {
            mime_guess::from_path(file_path)
                .first_or_octet_stream()
                .to_string()
        });

    Ok(PreparedBody::Bytes {
        content,
        content_type: Some(content_type),
    })
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ExecuteError> {
    tokio::fs::read(path).await.map_err(|source| ExecuteError::File {
        path: path.to_path_buf(),
        source,
    })
}
