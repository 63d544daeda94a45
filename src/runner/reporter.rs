use crate::collection::RequestItem;
use crate::http::RunResult;
use crate::runner::types::{RunOutcome, RunSummary};
use crate::utils::{ResponseFormat, ResponseFormatter};
use colored::Colorize;

pub struct RunReporter {
    verbose: bool,
    formatter: ResponseFormatter,
}

impl RunReporter {
    pub fn new(verbose: bool) -> Self {
        let format = if verbose {
            ResponseFormat::Verbose
        } else {
            ResponseFormat::Compact
        };

        Self {
            verbose,
            formatter: ResponseFormatter::new(format),
        }
    }

    /// 打印运行开始
    pub fn print_header(&self, total: usize, proxy: Option<&str>) {
        match proxy {
            Some(proxy) => println!(
                "\nRunning {} requests via proxy {}...\n",
                total,
                proxy.bold()
            ),
            None => println!("\nRunning {} requests...\n", total),
        }
    }

    /// 打印单次运行结果
    pub fn print_outcome(&self, index: usize, item: &RequestItem, outcome: &RunOutcome) {
        let passed = outcome.passed();
        let symbol = if passed { "✓".green() } else { "✗".red() };

        let name_part = if item.name.is_empty() {
            String::new()
        } else {
            format!(" {} -", item.name)
        };

        match &outcome.result {
            RunResult::Success(response) => {
                println!(
                    " {} [{}]{} {} {} {} ({}ms)",
                    symbol,
                    index,
                    name_part,
                    item.method.to_uppercase().cyan(),
                    response.url,
                    response.status,
                    response.duration_ms
                );

                // verbose 模式或失败时显示响应详情
                if self.verbose || !passed {
                    for line in self.formatter.format(response).lines() {
                        println!("   {}", line);
                    }
                    println!();
                }
            }
            RunResult::Failure(failure) => {
                let cancelled = if failure.is_cancel == Some(true) {
                    " (cancelled)".dimmed().to_string()
                } else {
                    String::new()
                };
                println!(
                    " {} [{}]{} {} {}{}",
                    symbol,
                    index,
                    name_part,
                    item.method.to_uppercase().cyan(),
                    item.url,
                    cancelled
                );
                println!("   {}: {}", "Error".red().bold(), failure.error);
                println!();
            }
        }

        // 显示测试结果
        if !outcome.test_results.is_empty() {
            println!("   Tests:");
            for test in &outcome.test_results {
                if test.passed {
                    println!("     {} {}", "✓".green(), test.name);
                } else {
                    println!("     {} {}", "✗".red(), test.name);
                    if let Some(msg) = &test.error {
                        println!("       {}", msg.red());
                    }
                }
            }
            println!();
        }
    }

    /// 打印运行摘要
    pub fn print_summary(&self, summary: &RunSummary) {
        println!("\n{}", "━".repeat(50));
        println!("{}", "Summary".bold());
        println!("{}", "━".repeat(50));

        if summary.failed == 0 {
            println!(
                "  {}: {} passed, {} total",
                "Requests".bold(),
                summary.passed.to_string().green(),
                summary.total
            );
        } else {
            println!(
                "  {}: {} passed, {} failed, {} total",
                "Requests".bold(),
                summary.passed.to_string().green(),
                summary.failed.to_string().red(),
                summary.total
            );
        }

        // 显示测试统计
        if summary.total_tests > 0 {
            if summary.failed_tests == 0 {
                println!(
                    "  {}: {} passed, {} total",
                    "Tests".bold(),
                    summary.passed_tests.to_string().green(),
                    summary.total_tests
                );
            } else {
                println!(
                    "  {}: {} passed, {} failed, {} total",
                    "Tests".bold(),
                    summary.passed_tests.to_string().green(),
                    summary.failed_tests.to_string().red(),
                    summary.total_tests
                );
            }
        }

        println!(
            "  {}: {:.3}s",
            "Duration".bold(),
            summary.total_duration.as_secs_f64()
        );
        println!();
    }
}

impl Default for RunReporter {
    fn default() -> Self {
        Self::new(false)
    }
}
