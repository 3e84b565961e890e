//! # 配置管理模块
//!
//! 处理应用配置加载、环境变量覆盖与验证

mod app_config;
mod database;

pub use app_config::{AppConfig, BlacklistConfig};
pub use database::DatabaseConfig;

use crate::error::{BlacklistError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo};
use std::env;
use std::path::{Path, PathBuf};

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "PROVIDER_BLACKLIST_CONFIG_PATH";
/// 覆盖数据库URL的环境变量
pub const DATABASE_URL_ENV: &str = "PROVIDER_BLACKLIST_DATABASE_URL";

/// 解析配置文件路径：显式参数 > 环境变量 > `config/config.{RUST_ENV}.toml`
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
    PathBuf::from(format!("config/config.{env}.toml"))
}

/// 加载配置文件
///
/// 文件不存在时使用内置默认值；存在但无法解析时返回错误。
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let config_file = resolve_config_path(explicit);

    let mut config = if config_file.exists() {
        let content = std::fs::read_to_string(&config_file).map_err(|e| {
            BlacklistError::config_with_source(
                format!("读取配置文件失败: {}", config_file.display()),
                e,
            )
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "config_loaded",
            "Configuration file loaded",
            path = %config_file.display()
        );
        config
    } else {
        ldebug!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "config_defaults",
            "Configuration file not found, using defaults",
            path = %config_file.display()
        );
        AppConfig::default()
    };

    apply_env_overrides(&mut config);
    config.validate()?;

    Ok(config)
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(url) = env::var(DATABASE_URL_ENV) {
        ldebug!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "env_override",
            "Database URL overridden from environment"
        );
        config.database.url = url;
    }
}
