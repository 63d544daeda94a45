use regex::Regex;
use std::sync::OnceLock;

/// 被替换掉的词的占位注释
pub const BLOCKED_PLACEHOLDER: &str = "/* blocked */";

/// 模块加载、动态求值、定时器、网络、DOM 全局对象和原型污染相关的词
const BLOCKED_TOKENS: &[&str] = &[
    "import",
    "require",
    "eval",
    "Function",
    "setTimeout",
    "setInterval",
    "setImmediate",
    "fetch",
    "XMLHttpRequest",
    "WebSocket",
    "window",
    "document",
    "globalThis",
    "process",
    "__proto__",
    "prototype",
    "constructor",
];

/// 把脚本中的黑名单词替换为占位注释
///
/// 只是文本层面的兼容处理，很容易绕过。隔离由解释器本身保证：
/// 脚本上下文中不存在任何宿主能力。
pub fn sanitize(script: &str) -> String {
    static BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = BLOCK_REGEX.get_or_init(|| {
        let alternation = BLOCKED_TOKENS
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"\b(?:{})\b", alternation)).unwrap()
    });

    re.replace_all(script, BLOCKED_PLACEHOLDER).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_tokens() {
        let script = "const fs = require('fs'); eval('1'); setTimeout(f, 10);";
        assert_eq!(
            sanitize(script),
            "const fs = /* blocked */('fs'); /* blocked */('1'); /* blocked */(f, 10);"
        );
    }

    #[test]
    fn test_sanitize_prototype_tokens() {
        let script = "({}).__proto__.polluted = 1; Object.prototype.x = 2;";
        let sanitized = sanitize(script);
        assert!(!sanitized.contains("__proto__"));
        assert!(!sanitized.contains("prototype"));
    }

    #[test]
    fn test_sanitize_keeps_partial_words() {
        let script = "const important = res.getHeader('x-evaluation'); bru.setVar('a', important);";
        assert_eq!(sanitize(script), script);
    }

    /// 只按整词匹配：标识符内部的词不替换，字符串中被非单词字符隔开的词会被替换
    #[test]
    fn test_sanitize_word_boundaries() {
        let script = "myeval(1); evaluate(); fetched;";
        assert_eq!(sanitize(script), script);
        assert_eq!(
            sanitize("req.setHeader('x-import', 'a.eval')"),
            "req.setHeader('x-/* blocked */', 'a./* blocked */')"
        );
    }

    #[test]
    fn test_sanitize_clean_script_untouched() {
        let script = "test('ok', () => expect(res.status).to.equal(200));";
        assert_eq!(sanitize(script), script);
    }
}
