use crate::collection::Environment;
use crate::variable::resolver::VariableResolver;
use crate::variable::types::VariableMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 配置加载错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse environment file {path}: {source}")]
    Environment {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Environment '{0}' not found in config")]
    UnknownEnvironment(String),
}

/// 完整的运行器配置文件
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RunnerConfig {
    /// 代理服务地址，设置后所有请求经由 `{proxy}/proxy` 转发
    #[serde(default)]
    pub proxy: Option<String>,

    /// 单个脚本的执行时限（毫秒），不设置时为 5000
    #[serde(default)]
    pub script_timeout_ms: Option<u64>,

    /// 所有环境配置：环境名 → 变量表
    #[serde(default)]
    pub environments: HashMap<String, HashMap<String, String>>,
}

impl RunnerConfig {
    /// 获取指定环境，变量值中的 ${VAR} 从系统环境变量解析
    pub fn get_environment(&self, env_name: &str) -> Option<Environment> {
        self.environments.get(env_name).map(|vars| {
            let resolved: HashMap<String, String> = vars
                .iter()
                .map(|(k, v)| (k.clone(), VariableResolver::resolve_env_vars(v)))
                .collect();
            Environment::from_map(env_name, &resolved)
        })
    }
}

/// 配置文件加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置文件名
    const CONFIG_FILE: &'static str = "collrun.toml";

    /// 覆盖代理地址的环境变量
    pub const PROXY_ENV: &'static str = "COLLRUN_PROXY";

    /// 从指定路径加载配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<RunnerConfig, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 查找并加载配置文件
    /// 查找顺序：
    /// 1. 当前目录及其父目录
    /// 2. 用户配置目录 ~/.config/collrun/
    pub fn find_and_load() -> Option<RunnerConfig> {
        Self::try_load_from_current_dir().or_else(Self::try_load_from_user_dir)
    }

    /// 尝试从当前目录及其父目录加载
    fn try_load_from_current_dir() -> Option<RunnerConfig> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let config_path = current.join(Self::CONFIG_FILE);
            if config_path.exists() {
                debug!("Loading config from {}", config_path.display());
                return Self::load_from_path(&config_path).ok();
            }

            // 尝试父目录
            if !current.pop() {
                break;
            }
        }

        None
    }

    /// 尝试从用户配置目录加载
    fn try_load_from_user_dir() -> Option<RunnerConfig> {
        let home = dirs::home_dir()?;
        let config_path = home
            .join(".config")
            .join("collrun")
            .join(Self::CONFIG_FILE);

        if config_path.exists() {
            debug!("Loading config from {}", config_path.display());
            Self::load_from_path(&config_path).ok()
        } else {
            None
        }
    }

    /// 从 JSON 文件加载环境定义
    pub fn load_environment_file<P: AsRef<Path>>(path: P) -> Result<Environment, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Environment {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 决定代理地址，优先级：CLI > 环境变量 COLLRUN_PROXY > 配置文件
    pub fn resolve_proxy(config: &RunnerConfig, cli_proxy: Option<&str>) -> Option<String> {
        cli_proxy
            .map(str::to_string)
            .or_else(|| std::env::var(Self::PROXY_ENV).ok())
            .or_else(|| config.proxy.clone())
            .filter(|p| !p.trim().is_empty())
    }

    /// 解析 CLI 变量参数，构建运行时变量表
    pub fn build_runtime_vars(cli_vars: &[String]) -> VariableMap {
        cli_vars
            .iter()
            .filter_map(|s| Self::parse_cli_var(s))
            .collect()
    }

    /// 解析 CLI 变量参数 "key=value"
    pub fn parse_cli_var(s: &str) -> Option<(String, String)> {
        s.split_once('=')
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
    }
}
