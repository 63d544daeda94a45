use regex::Captures;
use tracing::debug;
use url::Url;

use crate::collection::{Param, ParamKind, RequestBody, RequestItem};
use crate::variable::resolver::VariableResolver;
use crate::variable::types::VariableMap;

/// 默认 scheme，URL 中未指定 scheme 时用于解析
const DEFAULT_SCHEME: &str = "http";

/// 对请求中的所有模板字段做变量替换，返回新的请求
///
/// 覆盖 URL、header 名和值、参数名和值、请求体文本（含表单字段）以及认证的全部字符串字段。
/// 替换完成后，已启用的 query 参数写入 URL 查询串（同名覆盖），path 参数替换 `:name` 路径段。
/// 输入不会被修改。
pub fn interpolate(request: &RequestItem, vars: &VariableMap) -> RequestItem {
    let sub = |text: &str| VariableResolver::substitute(text, vars);

    let mut resolved = request.clone();

    resolved.url = sub(&request.url);

    for header in &mut resolved.headers {
        header.name = sub(&header.name);
        header.value = sub(&header.value);
    }

    for param in &mut resolved.params {
        param.name = sub(&param.name);
        param.value = sub(&param.value);
    }

    if let Some(body) = &mut resolved.body {
        interpolate_body(body, vars);
    }

    resolved.auth = request.auth.map_strings(sub);

    resolved.url = apply_params(&resolved.url, &resolved.params);

    resolved
}

fn interpolate_body(body: &mut RequestBody, vars: &VariableMap) {
    let sub = |text: &mut String| *text = VariableResolver::substitute(text, vars);

    match body {
        RequestBody::Raw { data, .. } => sub(data),
        RequestBody::UrlEncoded { fields } => {
            for field in fields {
                sub(&mut field.name);
                sub(&mut field.value);
            }
        }
        RequestBody::Multipart { fields } => {
            for field in fields {
                sub(&mut field.name);
                sub(&mut field.value);
            }
        }
        RequestBody::File { files } => {
            for file in files {
                sub(&mut file.file_path);
            }
        }
    }
}

/// 把已启用的参数合并到 URL
///
/// 没有已启用参数时 URL 原样返回；否则 URL 会被解析（缺少 scheme 时按 http:// 处理）
/// 并以绝对形式返回。解析失败时同样原样返回，由执行阶段报告错误。
/// 未解析的 `{{name}}` 占位符不会被百分号编码，原样保留在结果中。
pub fn apply_params(url: &str, params: &[Param]) -> String {
    let enabled: Vec<&Param> = params.iter().filter(|p| p.enabled).collect();
    if enabled.is_empty() {
        return url.to_string();
    }

    let mut mask = PlaceholderMask::default();
    let masked_url = mask.mask(url);
    let enabled: Vec<Param> = enabled
        .into_iter()
        .map(|p| Param {
            name: mask.mask(&p.name),
            value: mask.mask(&p.value),
            ..p.clone()
        })
        .collect();

    let normalized = if masked_url.contains("://") {
        masked_url
    } else {
        format!("{}://{}", DEFAULT_SCHEME, masked_url)
    };

    let mut parsed = match Url::parse(&normalized) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Skipping param merge, URL '{}' does not parse: {}", url, e);
            return url.to_string();
        }
    };

    let path_params: Vec<&Param> = enabled
        .iter()
        .filter(|p| p.kind == ParamKind::Path)
        .collect();
    if !path_params.is_empty() {
        replace_path_params(&mut parsed, &path_params);
    }

    let query_params: Vec<&Param> = enabled
        .iter()
        .filter(|p| p.kind == ParamKind::Query)
        .collect();
    if !query_params.is_empty() {
        merge_query_params(&mut parsed, &query_params);
    }

    mask.unmask(parsed.to_string())
}

/// 解析 URL 前把占位符换成不受编码影响的记号，序列化后再换回
#[derive(Default)]
struct PlaceholderMask {
    spans: Vec<String>,
}

impl PlaceholderMask {
    fn token(index: usize) -> String {
        format!("__collrun_ph_{}__", index)
    }

    fn mask(&mut self, text: &str) -> String {
        if !text.contains("{{") {
            return text.to_string();
        }

        VariableResolver::placeholder_regex()
            .replace_all(text, |caps: &Captures| {
                let token = Self::token(self.spans.len());
                self.spans.push(caps[0].to_string());
                token
            })
            .into_owned()
    }

    fn unmask(&self, mut text: String) -> String {
        for (index, span) in self.spans.iter().enumerate() {
            text = text.replace(&Self::token(index), span);
        }
        text
    }
}

fn replace_path_params(url: &mut Url, params: &[&Param]) {
    let Some(segments) = url.path_segments() else {
        return;
    };

    let replaced: Vec<String> = segments
        .map(|segment| {
            segment
                .strip_prefix(':')
                .and_then(|name| params.iter().find(|p| p.name == name))
                .map(|p| p.value.clone())
                .unwrap_or_else(|| segment.to_string())
        })
        .collect();

    url.set_path(&format!("/{}", replaced.join("/")));
}

/// 同名参数覆盖第一次出现的位置并移除其余重复项，新参数追加在末尾
fn merge_query_params(url: &mut Url, params: &[&Param]) {
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    for param in params {
        match pairs.iter().position(|(k, _)| *k == param.name) {
            Some(first) => {
                pairs[first].1 = param.value.clone();
                let mut index = 0;
                pairs.retain(|(k, _)| {
                    let keep = index <= first || *k != param.name;
                    index += 1;
                    keep
                });
            }
            None => pairs.push((param.name.clone(), param.value.clone())),
        }
    }

    url.query_pairs_mut().clear().extend_pairs(pairs.iter());
}
