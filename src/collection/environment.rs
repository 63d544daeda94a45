use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 命名的环境变量集合
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Environment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub variables: Vec<EnvVariable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVariable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub transient: bool,
}

impl EnvVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            default: None,
            disabled: false,
            transient: false,
        }
    }

    /// 实际生效的值：value 未设置时回退到 default
    pub fn effective_value(&self) -> Option<&str> {
        self.value.as_deref().or(self.default.as_deref())
    }
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push(EnvVariable::new(name, value));
        self
    }

    /// 从简单的键值表构造（配置文件使用）
    pub fn from_map(name: impl Into<String>, vars: &HashMap<String, String>) -> Self {
        let mut variables: Vec<EnvVariable> = vars
            .iter()
            .map(|(k, v)| EnvVariable::new(k.clone(), v.clone()))
            .collect();
        variables.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            name: name.into(),
            variables,
        }
    }

    /// 参与变量解析的 (name, value) 对，跳过禁用项
    pub fn active_variables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables
            .iter()
            .filter(|v| !v.disabled)
            .filter_map(|v| v.effective_value().map(|value| (v.name.as_str(), value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_variables_skip_disabled_and_fallback_to_default() {
        let env: Environment = serde_json::from_str(
            r#"{
                "name": "dev",
                "variables": [
                    {"name": "host", "value": "localhost"},
                    {"name": "port", "default": "8080"},
                    {"name": "secret", "value": "s3cr3t", "disabled": true},
                    {"name": "empty"}
                ]
            }"#,
        )
        .unwrap();

        let active: Vec<_> = env.active_variables().collect();
        assert_eq!(active, vec![("host", "localhost"), ("port", "8080")]);
    }

    #[test]
    fn test_from_map_is_sorted() {
        let mut vars = HashMap::new();
        vars.insert("b".to_string(), "2".to_string());
        vars.insert("a".to_string(), "1".to_string());

        let env = Environment::from_map("dev", &vars);
        assert_eq!(env.name, "dev");
        assert_eq!(env.variables[0].name, "a");
        assert_eq!(env.variables[1].effective_value(), Some("2"));
    }
}
