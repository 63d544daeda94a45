use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// 脚本写入的变量存储
///
/// 克隆共享同一份数据。每次写入都是单键原子操作：
/// 并发运行对同一变量的写入按"最后写入者胜出"处理，不会出现部分写入或合并。
/// 除 [`VariableStore::clear`] 外从不重置。
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级共享存储
    pub fn global() -> &'static VariableStore {
        static GLOBAL: OnceLock<VariableStore> = OnceLock::new();
        GLOBAL.get_or_init(VariableStore::new)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    /// 当前内容的快照
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_set_get_clear() {
        let store = VariableStore::new();
        store.set("token", "abc");
        assert_eq!(store.get("token"), Some("abc".to_string()));

        let shared = store.clone();
        shared.set("token", "def");
        assert_eq!(store.get("token"), Some("def".to_string()));

        store.clear();
        assert!(shared.is_empty());
    }

    #[test]
    fn test_concurrent_writes_last_writer_wins() {
        let store = VariableStore::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        store.set("shared", format!("value-{}", i));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let value = store.get("shared").unwrap();
        let expected: Vec<String> = (0..8).map(|i| format!("value-{}", i)).collect();
        assert!(expected.contains(&value));
        assert_eq!(store.len(), 1);
    }
}
