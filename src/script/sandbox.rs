use rquickjs::{Context, Runtime};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::collection::{Header, RequestBody, RequestItem};
use crate::http::{REQUEST_TIMEOUT_MS, RunResult};
use crate::script::blocklist;
use crate::script::types::{LogEntry, LogLevel, ScriptError, ScriptOutcome, ScriptStage, TestResult};
use crate::variable::VariableMap;

/// 注入脚本上下文的 JS 运行时：构造 req/res/bru/test/expect/console 并执行脚本
const PRELUDE: &str = include_str!("prelude.js");

/// 单次脚本执行的资源限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    /// 堆内存上限（字节）
    pub memory_limit: usize,
    /// 栈大小上限（字节）
    pub max_stack_size: usize,
    /// 墙钟时间上限
    pub timeout: Duration,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            memory_limit: 32 * 1024 * 1024,
            max_stack_size: 1024 * 1024,
            timeout: Duration::from_secs(5),
        }
    }
}

/// 脚本可以访问的运行状态
///
/// 脚本对请求、响应和变量的修改直接写回这些借用，
/// 测试结果追加到 `test_results`（脚本中途出错时已产生的结果也会保留）。
pub struct ScriptContext<'a> {
    pub request: &'a mut RequestItem,
    pub response: Option<&'a mut RunResult>,
    pub variables: &'a mut VariableMap,
    pub test_results: &'a mut Vec<TestResult>,
}

/// 用户脚本沙箱
///
/// 每次执行都创建全新的 QuickJS 运行时，上下文中只有 `req`、`res`、`bru`、
/// `test`、`expect` 和 `console`，没有文件、网络、定时器或模块加载能力。
#[derive(Debug, Clone)]
pub struct ScriptSandbox {
    limits: SandboxLimits,
    blocklist: bool,
}

impl Default for ScriptSandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ScriptOutput {
    request: RequestSnapshot,
    response: Option<ResponseSnapshot>,
    #[serde(default)]
    writes: Vec<(String, String)>,
    #[serde(default)]
    tests: Vec<TestResult>,
    #[serde(default)]
    logs: Vec<LogEntry>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RequestSnapshot {
    url: String,
    method: String,
    #[serde(default)]
    headers: Map<String, Value>,
    #[serde(default)]
    body: Value,
}

#[derive(Debug, Deserialize)]
struct ResponseSnapshot {
    #[serde(default)]
    data: Value,
}

impl ScriptSandbox {
    pub fn new() -> Self {
        Self {
            limits: SandboxLimits::default(),
            blocklist: true,
        }
    }

    pub fn with_limits(mut self, limits: SandboxLimits) -> Self {
        self.limits = limits;
        self
    }

    /// 是否在执行前替换黑名单词
    pub fn with_blocklist(mut self, enabled: bool) -> Self {
        self.blocklist = enabled;
        self
    }

    /// 执行一段脚本
    ///
    /// `test()` 内的断言失败只记录为失败的测试；其他任何未捕获的异常、
    /// 超时或引擎错误都以 `Err` 返回，此时请求和响应保持执行前的状态。
    pub fn run(
        &self,
        stage: ScriptStage,
        script: &str,
        ctx: ScriptContext<'_>,
    ) -> Result<ScriptOutcome, ScriptError> {
        let ScriptContext {
            request,
            mut response,
            variables,
            test_results,
        } = ctx;

        let source = if self.blocklist {
            blocklist::sanitize(script)
        } else {
            script.to_string()
        };

        let request_headers = header_map(request);
        let request_body = request
            .body
            .as_ref()
            .map(RequestBody::to_script_value)
            .unwrap_or(Value::Null);
        let response_value = match response.as_deref() {
            Some(result) => serde_json::to_value(result)?,
            None => Value::Null,
        };

        let input = json!({
            "script": source,
            "variables": variables,
            "request": {
                "name": request.name,
                "url": request.url,
                "method": request.method,
                "headers": request_headers,
                "body": request_body,
                "timeout": REQUEST_TIMEOUT_MS,
            },
            "response": response_value,
        });

        debug!(stage = %stage, "Evaluating script");
        let raw = self.evaluate(serde_json::to_string(&input)?)?;
        let output: ScriptOutput = serde_json::from_str(&raw)?;

        for entry in &output.logs {
            emit_log(stage, entry);
        }

        let tests_run = output.tests.len();
        test_results.extend(output.tests);

        if let Some(message) = output.error {
            return Err(ScriptError::Thrown(message));
        }

        apply_request(request, &request_headers, &request_body, output.request)?;

        if let (Some(RunResult::Success(data)), Some(snapshot)) =
            (response.as_deref_mut(), output.response)
        {
            data.data = snapshot.data;
        }

        for (name, value) in &output.writes {
            variables.insert(name.clone(), value.clone());
        }

        Ok(ScriptOutcome {
            tests_run,
            variable_writes: output.writes,
        })
    }

    /// 在全新的运行时中执行前导脚本，返回其输出的 JSON 字符串
    fn evaluate(&self, input: String) -> Result<String, ScriptError> {
        let limits = self.limits;
        let runtime = Runtime::new()?;
        runtime.set_memory_limit(limits.memory_limit);
        runtime.set_max_stack_size(limits.max_stack_size);

        let deadline = Instant::now() + limits.timeout;
        let timed_out = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&timed_out);
        runtime.set_interrupt_handler(Some(Box::new(move || {
            let expired = Instant::now() >= deadline;
            if expired {
                flag.store(true, Ordering::Relaxed);
            }
            expired
        })));

        let context = Context::full(&runtime)?;
        context.with(|ctx| {
            ctx.globals().set("__collrunInput", input)?;
            match ctx.eval::<String, _>(PRELUDE) {
                Ok(output) => Ok(output),
                Err(rquickjs::Error::Exception) => {
                    if timed_out.load(Ordering::Relaxed) {
                        return Err(ScriptError::Timeout(limits.timeout));
                    }
                    let thrown = ctx.catch();
                    let message = thrown
                        .as_exception()
                        .and_then(|e| e.message())
                        .or_else(|| thrown.as_string().and_then(|s| s.to_string().ok()))
                        .unwrap_or_else(|| "uncaught exception".to_string());
                    Err(ScriptError::Thrown(message))
                }
                Err(e) => Err(e.into()),
            }
        })
    }
}

/// 脚本看到的 header 表：只包含启用的 header，同名时后者覆盖前者
fn header_map(request: &RequestItem) -> Map<String, Value> {
    request
        .enabled_headers()
        .map(|h| (h.name.clone(), Value::String(h.value.clone())))
        .collect()
}

fn apply_request(
    request: &mut RequestItem,
    headers_before: &Map<String, Value>,
    body_before: &Value,
    snapshot: RequestSnapshot,
) -> Result<(), ScriptError> {
    request.url = snapshot.url;
    request.method = snapshot.method;

    if &snapshot.headers != headers_before {
        rebuild_headers(request, snapshot.headers);
    }

    if &snapshot.body != body_before {
        request.body = RequestBody::apply_script_value(request.body.as_ref(), snapshot.body)?;
    }

    Ok(())
}

/// 按脚本写回的 header 表重建 header 列表，保留禁用的 header 和原有顺序
fn rebuild_headers(request: &mut RequestItem, mut written: Map<String, Value>) {
    let mut rebuilt = Vec::with_capacity(request.headers.len());

    for header in request.headers.drain(..) {
        if header.disabled {
            rebuilt.push(header);
        } else if let Some(value) = written.remove(&header.name) {
            rebuilt.push(Header::new(header.name, value_to_string(value)));
        }
    }

    for (name, value) in written {
        rebuilt.push(Header::new(name, value_to_string(value)));
    }

    request.headers = rebuilt;
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn emit_log(stage: ScriptStage, entry: &LogEntry) {
    let message = &entry.message;
    match entry.level {
        LogLevel::Debug => debug!(target: "collrun::script", stage = %stage, "[script] {}", message),
        LogLevel::Info => info!(target: "collrun::script", stage = %stage, "[script] {}", message),
        LogLevel::Warn => warn!(target: "collrun::script", stage = %stage, "[script] {}", message),
        LogLevel::Error => error!(target: "collrun::script", stage = %stage, "[script] {}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::RawKind;
    use crate::http::ResponseData;
    use std::collections::BTreeMap;

    fn run_script(
        script: &str,
        request: &mut RequestItem,
        response: Option<&mut RunResult>,
        variables: &mut VariableMap,
    ) -> (Result<ScriptOutcome, ScriptError>, Vec<TestResult>) {
        let mut tests = Vec::new();
        let result = ScriptSandbox::new().run(
            ScriptStage::Tests,
            script,
            ScriptContext {
                request,
                response,
                variables,
                test_results: &mut tests,
            },
        );
        (result, tests)
    }

    fn success(data: Value) -> RunResult {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        RunResult::Success(ResponseData {
            status: 200,
            status_text: "OK".to_string(),
            headers,
            data,
            size: 11,
            duration_ms: 5,
            url: "http://example.com/users".to_string(),
        })
    }

    #[test]
    fn test_set_and_get_var() {
        let mut request = RequestItem::new("GET", "http://example.com");
        let mut vars = VariableMap::new();

        let (result, _) = run_script(
            "bru.setVar('x', '42'); if (bru.getVar('x') !== '42') throw new Error('mismatch');\
             bru.setEnvVar('y', 7); if (bru.getEnvVar('y') !== '7') throw new Error('env mismatch');",
            &mut request,
            None,
            &mut vars,
        );

        let outcome = result.unwrap();
        assert_eq!(vars.get("x"), Some("42"));
        assert_eq!(vars.get("y"), Some("7"));
        assert_eq!(
            outcome.variable_writes,
            vec![
                ("x".to_string(), "42".to_string()),
                ("y".to_string(), "7".to_string())
            ]
        );
    }

    #[test]
    fn test_reads_resolved_variables() {
        let mut request = RequestItem::new("GET", "http://example.com");
        let mut vars: VariableMap = [("token", "abc")].into_iter().collect();

        let (result, _) = run_script(
            "bru.setVar('copy', bru.getVar('token') + '-' + bru.hasVar('missing'));",
            &mut request,
            None,
            &mut vars,
        );

        result.unwrap();
        assert_eq!(vars.get("copy"), Some("abc-false"));
    }

    #[test]
    fn test_passing_and_failing_tests() {
        let mut request = RequestItem::new("GET", "http://example.com");
        let mut vars = VariableMap::new();

        let (result, tests) = run_script(
            r#"
            test("ok", () => expect(1).to.equal(1));
            test("bad", () => expect(1).to.equal(2));
            "#,
            &mut request,
            None,
            &mut vars,
        );

        assert_eq!(result.unwrap().tests_run, 2);
        assert_eq!(tests[0], TestResult::passed("ok"));
        assert!(!tests[1].passed);
        assert_eq!(tests[1].error.as_deref(), Some("expected 1 to equal 2"));
    }

    #[test]
    fn test_assertion_primitives() {
        let mut request = RequestItem::new("GET", "http://example.com");
        let mut vars = VariableMap::new();

        let (_, tests) = run_script(
            r#"
            test("above", () => expect(5).to.be.above(3));
            test("below", () => expect(5).to.be.below(3));
            test("include", () => expect("hello world").to.include("world"));
            test("not", () => expect("a").to.not.equal("b"));
            test("eql", () => expect({a: [1]}).to.eql({a: [1]}));
            test("exist", () => expect(undefined).to.exist);
            "#,
            &mut request,
            None,
            &mut vars,
        );

        let passed: Vec<bool> = tests.iter().map(|t| t.passed).collect();
        assert_eq!(passed, vec![true, false, true, true, true, false]);
        assert_eq!(tests[1].error.as_deref(), Some("expected 5 to be below 3"));
    }

    #[test]
    fn test_uncaught_error_aborts() {
        let mut request = RequestItem::new("GET", "http://example.com");
        let mut vars = VariableMap::new();

        let (result, tests) = run_script(
            "test('first', () => {}); req.setUrl('http://changed'); bru.setVar('a', '1'); missing.call();",
            &mut request,
            None,
            &mut vars,
        );

        let err = result.unwrap_err();
        assert!(matches!(err, ScriptError::Thrown(ref m) if m.contains("missing")));
        assert_eq!(tests.len(), 1);
        assert_eq!(request.url, "http://example.com");
        assert!(vars.is_empty());
    }

    #[test]
    fn test_syntax_error_aborts() {
        let mut request = RequestItem::new("GET", "http://example.com");
        let mut vars = VariableMap::new();

        let (result, _) = run_script("let = ;", &mut request, None, &mut vars);
        assert!(matches!(result, Err(ScriptError::Thrown(_))));
    }

    #[test]
    fn test_request_mutation() {
        let mut request = RequestItem::new("GET", "{{base}}/users")
            .with_header("Accept", "text/plain")
            .with_header("X-Remove", "1")
            .with_body(RequestBody::json(r#"{"a":1}"#));
        request.headers.push(Header {
            name: "X-Off".to_string(),
            value: "0".to_string(),
            disabled: true,
        });
        let mut vars = VariableMap::new();

        let (result, _) = run_script(
            r#"
            req.setUrl(req.getUrl() + '?page=2');
            req.method = 'post';
            req.setHeader('accept', 'application/json');
            req.deleteHeader('x-remove');
            req.headers['X-New'] = 'yes';
            const body = req.getBody();
            body.a = 2;
            req.setBody(body);
            "#,
            &mut request,
            None,
            &mut vars,
        );

        result.unwrap();
        assert_eq!(request.url, "{{base}}/users?page=2");
        assert_eq!(request.method, "POST");
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert!(!request.has_header("X-Remove"));
        assert_eq!(request.header("X-New"), Some("yes"));
        assert!(request.headers.iter().any(|h| h.name == "X-Off" && h.disabled));
        assert_eq!(
            request.body,
            Some(RequestBody::Raw {
                kind: RawKind::Json,
                data: r#"{"a":2}"#.to_string()
            })
        );
    }

    #[test]
    fn test_untouched_request_keeps_headers() {
        let mut request = RequestItem::new("GET", "http://example.com")
            .with_header("X-Dup", "1")
            .with_header("X-Dup", "2");
        let original = request.clone();
        let mut vars = VariableMap::new();

        let (result, _) = run_script("console.log(req.url);", &mut request, None, &mut vars);
        result.unwrap();
        assert_eq!(request, original);
    }

    #[test]
    fn test_response_accessor() {
        let mut request = RequestItem::new("GET", "http://example.com");
        let mut response = success(json!({"users": [{"name": "ada"}], "total": 1}));
        let mut vars = VariableMap::new();

        let (result, tests) = run_script(
            r#"
            test("status", () => expect(res.status).to.equal(200));
            test("path", () => expect(res("users[0].name")).to.equal("ada"));
            test("missing", () => expect(res("users.9.name")).to.equal(undefined));
            test("header", () => expect(res.getHeader("Content-Type")).to.include("json"));
            const body = res.getBody();
            body.total = 2;
            res.setBody(body);
            "#,
            &mut request,
            Some(&mut response),
            &mut vars,
        );

        result.unwrap();
        assert!(tests.iter().all(|t| t.passed), "{:?}", tests);
        match response {
            RunResult::Success(data) => assert_eq!(data.data["total"], 2),
            other => panic!("Expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_res_absent_before_request() {
        let mut request = RequestItem::new("GET", "http://example.com");
        let mut vars = VariableMap::new();

        let (result, _) = run_script(
            "if (typeof res !== 'undefined') throw new Error('res should be absent');",
            &mut request,
            None,
            &mut vars,
        );
        result.unwrap();
    }

    #[test]
    fn test_blocked_tokens_do_not_reach_interpreter() {
        let mut request = RequestItem::new("GET", "http://example.com");
        let mut vars = VariableMap::new();

        let (result, _) = run_script(
            "bru.setVar('r', String(eval('1 + 1')));",
            &mut request,
            None,
            &mut vars,
        );

        result.unwrap();
        // 替换后只剩括号表达式，字符串没有被求值
        assert_eq!(vars.get("r"), Some("1 + 1"));
    }

    #[test]
    fn test_no_host_capabilities() {
        let mut request = RequestItem::new("GET", "http://example.com");
        let mut vars = VariableMap::new();
        let mut tests = Vec::new();

        let result = ScriptSandbox::new().with_blocklist(false).run(
            ScriptStage::PreRequest,
            "bru.setVar('kinds', [typeof fetch, typeof setTimeout, typeof require].join(','));",
            ScriptContext {
                request: &mut request,
                response: None,
                variables: &mut vars,
                test_results: &mut tests,
            },
        );

        result.unwrap();
        assert_eq!(vars.get("kinds"), Some("undefined,undefined,undefined"));
    }

    #[test]
    fn test_infinite_loop_times_out() {
        let mut request = RequestItem::new("GET", "http://example.com");
        let mut vars = VariableMap::new();
        let mut tests = Vec::new();

        let sandbox = ScriptSandbox::new().with_limits(SandboxLimits {
            timeout: Duration::from_millis(200),
            ..SandboxLimits::default()
        });
        let result = sandbox.run(
            ScriptStage::PreRequest,
            "while (true) {}",
            ScriptContext {
                request: &mut request,
                response: None,
                variables: &mut vars,
                test_results: &mut tests,
            },
        );

        assert!(matches!(result, Err(ScriptError::Timeout(_))));
    }
}
