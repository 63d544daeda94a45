use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::collection::Environment;

/// 单次运行使用的扁平变量表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableMap {
    /// 变量映射表
    variables: HashMap<String, String>,
}

impl VariableMap {
    /// 创建新的空变量表
    pub fn new() -> Self {
        Self::default()
    }

    /// 按优先级从低到高合并：环境变量 → 脚本设置的进程级变量 → 调用方传入的运行时变量
    ///
    /// 同名时后者覆盖前者。
    pub fn resolve(
        environment: Option<&Environment>,
        store: &HashMap<String, String>,
        runtime: Option<&VariableMap>,
    ) -> Self {
        let mut map = Self::new();

        if let Some(env) = environment {
            for (name, value) in env.active_variables() {
                map.insert(name, value);
            }
        }

        map.extend(store.clone());

        if let Some(runtime) = runtime {
            map.extend(runtime.variables.clone());
        }

        map
    }

    /// 插入变量
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// 获取变量值
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(|s| s.as_str())
    }

    /// 批量插入变量
    pub fn extend(&mut self, vars: HashMap<String, String>) {
        self.variables.extend(vars);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 变量数量
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl From<HashMap<String, String>> for VariableMap {
    fn from(variables: HashMap<String, String>) -> Self {
        Self { variables }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VariableMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_map_basic() {
        let mut vars = VariableMap::new();
        assert!(vars.is_empty());

        vars.insert("key", "value");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("key"), Some("value"));
        assert_eq!(vars.get("missing"), None);
    }

    #[test]
    fn test_resolve_priority() {
        let env = Environment::new("dev")
            .with_variable("host", "env-host")
            .with_variable("token", "env-token")
            .with_variable("user", "env-user");

        let mut store = HashMap::new();
        store.insert("token".to_string(), "store-token".to_string());
        store.insert("user".to_string(), "store-user".to_string());

        let runtime: VariableMap = [("user", "runtime-user")].into_iter().collect();

        let vars = VariableMap::resolve(Some(&env), &store, Some(&runtime));
        assert_eq!(vars.get("host"), Some("env-host"));
        assert_eq!(vars.get("token"), Some("store-token"));
        assert_eq!(vars.get("user"), Some("runtime-user"));
    }

    #[test]
    fn test_resolve_without_sources() {
        let vars = VariableMap::resolve(None, &HashMap::new(), None);
        assert!(vars.is_empty());
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let vars: VariableMap = [("a", "1")].into_iter().collect();
        assert_eq!(serde_json::to_string(&vars).unwrap(), r#"{"a":"1"}"#);
    }
}
