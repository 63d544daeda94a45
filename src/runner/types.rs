use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::http::RunResult;
use crate::script::TestResult;

/// 单次运行的结果
///
/// 任何脚本阶段出错时 `result` 是失败记录，已得到的 HTTP 响应被丢弃；
/// 出错前已经完成的 `test()` 结果仍然保留在 `test_results` 中。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub result: RunResult,
    #[serde(default)]
    pub test_results: Vec<TestResult>,
}

impl RunOutcome {
    pub fn new(result: RunResult, test_results: Vec<TestResult>) -> Self {
        Self {
            result,
            test_results,
        }
    }

    /// 请求成功且所有测试通过
    pub fn passed(&self) -> bool {
        self.result.is_success() && self.test_results.iter().all(|t| t.passed)
    }

    pub fn failed_tests(&self) -> impl Iterator<Item = &TestResult> {
        self.test_results.iter().filter(|t| !t.passed)
    }

    pub fn duration(&self) -> Duration {
        self.result
            .response()
            .map(|r| Duration::from_millis(r.duration_ms))
            .unwrap_or_default()
    }
}

/// 多次运行的摘要
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub total_duration: Duration,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[RunOutcome]) -> Self {
        let passed = outcomes.iter().filter(|o| o.passed()).count();
        let total_duration = outcomes.iter().map(RunOutcome::duration).sum();

        // 统计测试
        let total_tests = outcomes.iter().map(|o| o.test_results.len()).sum();
        let passed_tests = outcomes
            .iter()
            .flat_map(|o| &o.test_results)
            .filter(|t| t.passed)
            .count();

        Self {
            total: outcomes.len(),
            passed,
            failed: outcomes.len() - passed,
            total_duration,
            total_tests,
            passed_tests,
            failed_tests: total_tests - passed_tests,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
