//! # 应用配置结构定义

use super::DatabaseConfig;
use crate::error::Result;
use crate::ensure_config;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 黑名单引擎的进程级参数（不落库）
    pub blacklist: BlacklistConfig,
}

/// 黑名单引擎进程级配置
///
/// 与 `app_settings` 表中的三个可在线修改的参数不同，这些值只在启动时读取。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlacklistConfig {
    /// 黑名单等级上限
    pub max_level: u32,
    /// 退避倍数上限
    pub max_backoff_multiplier: u32,
    /// 乐观锁冲突时的最大尝试次数
    pub max_cas_retries: u32,
    /// `is_blacklisted` 结果缓存时间（毫秒），0 表示不缓存
    pub status_cache_ttl_ms: u64,
    /// 读取设置表的超时时间（毫秒）
    pub settings_read_timeout_ms: u64,
    /// 后台刷新设置的间隔（秒），0 表示不启动后台刷新
    pub settings_refresh_interval_secs: u64,
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            max_level: 5,
            max_backoff_multiplier: 16,
            max_cas_retries: 16,
            status_cache_ttl_ms: 500,
            settings_read_timeout_ms: 1000,
            settings_refresh_interval_secs: 30,
        }
    }
}

impl BlacklistConfig {
    /// 状态缓存存活时间
    #[must_use]
    pub const fn status_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.status_cache_ttl_ms)
    }

    /// 设置读取超时
    #[must_use]
    pub const fn settings_read_timeout(&self) -> Duration {
        Duration::from_millis(self.settings_read_timeout_ms)
    }

    /// 后台刷新间隔，未启用时为 `None`
    #[must_use]
    pub const fn settings_refresh_interval(&self) -> Option<Duration> {
        if self.settings_refresh_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.settings_refresh_interval_secs))
        }
    }
}

impl AppConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        ensure_config!(!self.database.url.is_empty(), "数据库URL不能为空");
        ensure_config!(self.database.max_connections > 0, "数据库最大连接数必须大于0");
        ensure_config!(self.blacklist.max_level >= 1, "max_level 必须至少为1");
        ensure_config!(
            self.blacklist.max_backoff_multiplier >= 1,
            "max_backoff_multiplier 必须至少为1"
        );
        ensure_config!(self.blacklist.max_cas_retries >= 1, "max_cas_retries 必须至少为1");
        Ok(())
    }
}
