use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::collection::{Environment, RequestItem};
use crate::http::{Executor, RunResult};
use crate::runner::types::RunOutcome;
use crate::script::{ScriptContext, ScriptError, ScriptSandbox, ScriptStage, TestResult};
use crate::variable::{VariableMap, VariableStore, interpolate};

/// 请求运行器
///
/// 按固定顺序执行：解析变量 → 前置脚本 → 插值 → 执行 → 后置脚本 → 测试脚本。
/// 唯一跨运行共享的状态是变量存储，脚本写入的变量在每个脚本阶段结束后提交。
#[derive(Clone)]
pub struct Runner {
    executor: Executor,
    store: VariableStore,
    sandbox: ScriptSandbox,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// 使用进程级共享变量存储、直连模式
    pub fn new() -> Self {
        Self::with_store(VariableStore::global().clone())
    }

    /// 使用独立的变量存储
    pub fn with_store(store: VariableStore) -> Self {
        Self {
            executor: Executor::new(),
            store,
            sandbox: ScriptSandbox::new(),
        }
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.executor = Executor::with_proxy(proxy);
        self
    }

    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_sandbox(mut self, sandbox: ScriptSandbox) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    /// 运行单个请求
    ///
    /// 从不返回错误：传输错误体现为失败的 `RunResult`；
    /// 任何脚本阶段的未捕获异常都会让整个结果变为 `{error}`，即使请求已经成功。
    pub async fn run_request(
        &self,
        item: &RequestItem,
        environment: Option<&Environment>,
        runtime: Option<&VariableMap>,
    ) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, method = %item.method, url = %item.url);

        async {
            let mut test_results = Vec::new();
            match self
                .run_stages(item, environment, runtime, &mut test_results)
                .await
            {
                Ok(result) => RunOutcome::new(result, test_results),
                Err(e) => {
                    warn!("Run aborted by script error: {}", e);
                    RunOutcome::new(RunResult::failure(e.to_string()), test_results)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        item: &RequestItem,
        environment: Option<&Environment>,
        runtime: Option<&VariableMap>,
        test_results: &mut Vec<TestResult>,
    ) -> Result<RunResult, ScriptError> {
        let mut variables = VariableMap::resolve(environment, &self.store.snapshot(), runtime);
        debug!(count = variables.len(), "Variables resolved");

        // 前置脚本操作的是模板请求，而不是插值后的请求
        let mut request = item.clone();
        if let Some(script) = script_body(item.scripts.pre_request.as_deref()) {
            self.run_script(
                ScriptStage::PreRequest,
                script,
                ScriptContext {
                    request: &mut request,
                    response: None,
                    variables: &mut variables,
                    test_results: &mut *test_results,
                },
            )?;
        }

        let mut resolved = interpolate(&request, &variables);
        debug!(url = %resolved.url, "Request interpolated");

        let mut result = self.executor.execute(&resolved).await;
        debug!(success = result.is_success(), "Request executed");

        for (stage, script) in [
            (ScriptStage::PostResponse, &item.scripts.post_response),
            (ScriptStage::Tests, &item.scripts.tests),
        ] {
            if let Some(script) = script_body(script.as_deref()) {
                self.run_script(
                    stage,
                    script,
                    ScriptContext {
                        request: &mut resolved,
                        response: Some(&mut result),
                        variables: &mut variables,
                        test_results: &mut *test_results,
                    },
                )?;
            }
        }

        Ok(result)
    }

    fn run_script(
        &self,
        stage: ScriptStage,
        script: &str,
        ctx: ScriptContext<'_>,
    ) -> Result<(), ScriptError> {
        let outcome = self.sandbox.run(stage, script, ctx)?;

        let writes = outcome.variable_writes.len();
        for (name, value) in outcome.variable_writes {
            self.store.set(name, value);
        }

        debug!(
            stage = %stage,
            tests = outcome.tests_run,
            writes,
            "Script stage completed"
        );
        Ok(())
    }
}

fn script_body(script: Option<&str>) -> Option<&str> {
    script.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_body_skips_blank() {
        assert_eq!(script_body(None), None);
        assert_eq!(script_body(Some("  \n")), None);
        assert_eq!(script_body(Some("bru.setVar('a', 1)")), Some("bru.setVar('a', 1)"));
    }

    #[tokio::test]
    async fn test_pre_request_error_skips_execution() {
        let store = VariableStore::new();
        let runner = Runner::with_store(store.clone());
        let item = RequestItem::new("GET", "http://127.0.0.1:1/")
            .with_scripts(crate::collection::Scripts::pre_request(
                "bru.setVar('before', '1'); throw new Error('stop here');",
            ));

        let outcome = runner.run_request(&item, None, None).await;
        assert_eq!(outcome.result.error(), Some("stop here"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_script_writes_committed_before_execution() {
        let store = VariableStore::new();
        let runner = Runner::with_store(store.clone());
        let item = RequestItem::new("NOT VALID", "http://127.0.0.1:1/{{path}}")
            .with_scripts(crate::collection::Scripts::pre_request(
                "bru.setVar('path', 'users');",
            ));

        let outcome = runner.run_request(&item, None, None).await;
        // 方法非法，执行阶段失败，但脚本写入已提交
        assert!(!outcome.result.is_success());
        assert_eq!(store.get("path").as_deref(), Some("users"));
    }
}
