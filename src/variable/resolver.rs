use crate::variable::types::VariableMap;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// 变量替换器
pub struct VariableResolver;

impl VariableResolver {
    /// `{{name}}` 占位符，第一个分组是花括号内的原文
    pub(crate) fn placeholder_regex() -> &'static Regex {
        static VAR_REGEX: OnceLock<Regex> = OnceLock::new();
        VAR_REGEX.get_or_init(|| Regex::new(r"\{\{([^{}]+)\}\}").unwrap())
    }

    /// 替换文本中的所有 {{variable}} 占位符
    ///
    /// 花括号内的内容去除首尾空白后作为变量名；未定义的变量保持原样。
    /// 单次扫描，替换后的值不会被再次展开。
    pub fn substitute(text: &str, vars: &VariableMap) -> String {
        if !text.contains("{{") {
            return text.to_string();
        }

        Self::placeholder_regex().replace_all(text, |caps: &Captures| {
            let var_name = caps[1].trim();
            vars.get(var_name).unwrap_or(&caps[0]).to_string()
        })
        .to_string()
    }

    /// 解析并替换系统环境变量 ${VAR}（配置文件使用）
    pub fn resolve_env_vars(text: &str) -> String {
        static ENV_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = ENV_REGEX.get_or_init(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

        re.replace_all(text, |caps: &Captures| {
            let env_name = &caps[1];
            std::env::var(env_name).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
    }
}
