use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 脚本执行错误
///
/// 除 `test()` 内的断言失败外，任何脚本错误都会中止整个运行。
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("{0}")]
    Thrown(String),

    #[error("script exceeded its {}ms execution deadline", .0.as_millis())]
    Timeout(Duration),

    #[error("script engine error: {0}")]
    Engine(#[from] rquickjs::Error),

    #[error("invalid script output: {0}")]
    Output(#[from] serde_json::Error),
}

/// 脚本阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptStage {
    PreRequest,
    PostResponse,
    Tests,
}

impl ScriptStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptStage::PreRequest => "pre-request",
            ScriptStage::PostResponse => "post-response",
            ScriptStage::Tests => "tests",
        }
    }
}

impl fmt::Display for ScriptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `test(name, fn)` 的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestResult {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            error: Some(error.into()),
        }
    }
}

/// 脚本 console 输出
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// 一次成功脚本执行的结果
#[derive(Debug, Clone, Default)]
pub struct ScriptOutcome {
    /// 本次产生的测试数量
    pub tests_run: usize,

    /// 按调用顺序记录的变量写入，由运行器提交到共享存储
    pub variable_writes: Vec<(String, String)>,
}
