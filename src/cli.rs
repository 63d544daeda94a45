use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use collrun::collection::{Environment, RequestItem};
use collrun::http::Executor;
use collrun::runner::{RunOutcome, RunReporter, RunSummary, Runner};
use collrun::script::{SandboxLimits, ScriptSandbox};
use collrun::variable::{ConfigError, ConfigLoader, RunnerConfig};
use tracing::debug;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 依次运行一个或多个请求文件（JSON 格式的 RequestItem）
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// 请求文件
    #[arg(required = true)]
    pub requests: Vec<PathBuf>,

    /// 使用配置文件中的环境
    #[arg(short, long = "env", conflicts_with = "env_file")]
    pub env: Option<String>,

    /// 从 JSON 文件加载环境
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// 运行时变量 key=value，优先级最高
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// 代理服务地址，覆盖配置文件和 COLLRUN_PROXY
    #[arg(long)]
    pub proxy: Option<String>,

    /// 指定配置文件，默认自动查找 collrun.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 以 JSON 输出每次运行的结果
    #[arg(long)]
    pub json: bool,

    /// 显示完整响应
    #[arg(short, long)]
    pub verbose: bool,
}

/// 执行 run 子命令，所有请求都通过并返回 true
pub async fn run(args: RunArgs) -> Result<bool> {
    let config = load_config(args.config.as_deref())?;
    let environment = load_environment(&args, &config)?;
    let runtime_vars = ConfigLoader::build_runtime_vars(&args.vars);
    let proxy = ConfigLoader::resolve_proxy(&config, args.proxy.as_deref());

    let runner = Runner::new()
        .with_executor(Executor::from_proxy(proxy.as_deref()))
        .with_sandbox(build_sandbox(&config));
    let reporter = RunReporter::new(args.verbose);

    let items = args
        .requests
        .iter()
        .map(|path| load_request(path))
        .collect::<Result<Vec<_>>>()?;

    if !args.json {
        reporter.print_header(items.len(), proxy.as_deref());
    }

    let mut outcomes: Vec<RunOutcome> = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let outcome = runner
            .run_request(item, environment.as_ref(), Some(&runtime_vars))
            .await;

        if args.json {
            println!("{}", serde_json::to_string(&outcome)?);
        } else {
            reporter.print_outcome(index + 1, item, &outcome);
        }
        outcomes.push(outcome);
    }

    let summary = RunSummary::from_outcomes(&outcomes);
    if !args.json {
        reporter.print_summary(&summary);
    }

    Ok(summary.all_passed())
}

fn load_config(path: Option<&Path>) -> Result<RunnerConfig> {
    match path {
        Some(path) => Ok(ConfigLoader::load_from_path(path)?),
        None => Ok(ConfigLoader::find_and_load().unwrap_or_default()),
    }
}

fn load_environment(args: &RunArgs, config: &RunnerConfig) -> Result<Option<Environment>> {
    if let Some(path) = &args.env_file {
        debug!("Loading environment from {}", path.display());
        return Ok(Some(ConfigLoader::load_environment_file(path)?));
    }

    match &args.env {
        Some(name) => config
            .get_environment(name)
            .map(Some)
            .ok_or_else(|| ConfigError::UnknownEnvironment(name.clone()).into()),
        None => Ok(None),
    }
}

fn build_sandbox(config: &RunnerConfig) -> ScriptSandbox {
    let mut limits = SandboxLimits::default();
    if let Some(ms) = config.script_timeout_ms {
        debug!("Script timeout set to {}ms", ms);
        limits.timeout = Duration::from_millis(ms);
    }
    ScriptSandbox::new().with_limits(limits)
}

fn load_request(path: &Path) -> Result<RequestItem> {
    RequestItem::from_file(path)
        .with_context(|| format!("Failed to load request file {}", path.display()))
}
