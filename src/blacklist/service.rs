//! # 服务商黑名单服务
//!
//! 路由层的唯一入口：派发前调用 [`ProviderBlacklistService::is_blacklisted`]，
//! 每次尝试后调用 `record_failure` / `record_success`。
//!
//! `is_blacklisted` 的结果可在进程内缓存 `status_cache_ttl_ms` 毫秒，
//! 因此状态变化最多滞后这么久才被路由层看到；记录失败、手动重置和修改设置时会主动失效缓存。

use super::clock::{Clock, SystemClock};
use super::escalation::EscalationPolicy;
use super::recovery::RecoveryEvaluator;
use super::settings::SettingsProvider;
use super::store::BlacklistStore;
use super::tracker::{FailureOutcome, FailureTracker};
use super::types::{BlacklistSettings, ProviderKey, SettingKey};
use crate::config::BlacklistConfig;
use crate::error::Result;
use crate::linfo;
use crate::logging::{LogComponent, LogStage};
use entity::provider_blacklist::Model;
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const STATUS_CACHE_CAPACITY: u64 = 10_000;

/// 服务商黑名单服务
pub struct ProviderBlacklistService {
    settings: Arc<SettingsProvider>,
    store: BlacklistStore,
    tracker: FailureTracker,
    recovery: RecoveryEvaluator,
    status_cache: Option<Cache<ProviderKey, bool>>,
    clock: Arc<dyn Clock>,
    refresh_interval: Option<Duration>,
}

impl ProviderBlacklistService {
    /// 使用系统时钟创建服务
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: &BlacklistConfig) -> Self {
        Self::with_clock(db, config, Arc::new(SystemClock))
    }

    /// 使用指定时钟创建服务
    #[must_use]
    pub fn with_clock(
        db: Arc<DatabaseConnection>,
        config: &BlacklistConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = BlacklistStore::new(Arc::clone(&db));
        let settings = Arc::new(SettingsProvider::new(db, config.settings_read_timeout()));
        let policy = EscalationPolicy::from_config(config);

        let tracker = FailureTracker::new(
            store.clone(),
            Arc::clone(&settings),
            policy,
            Arc::clone(&clock),
            config.max_cas_retries,
        );
        let recovery = RecoveryEvaluator::new(
            store.clone(),
            Arc::clone(&settings),
            Arc::clone(&clock),
            config.max_cas_retries,
        );

        let ttl = config.status_cache_ttl();
        let status_cache = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(STATUS_CACHE_CAPACITY)
                .time_to_live(ttl)
                .build()
        });

        Self {
            settings,
            store,
            tracker,
            recovery,
            status_cache,
            clock,
            refresh_interval: config.settings_refresh_interval(),
        }
    }

    /// 服务商当前是否在黑名单中
    pub async fn is_blacklisted(&self, platform: &str, provider_name: &str) -> Result<bool> {
        let Some(cache) = &self.status_cache else {
            return self.recovery.is_blacklisted(platform, provider_name).await;
        };

        let key = ProviderKey::new(platform, provider_name);
        if let Some(cached) = cache.get(&key).await {
            return Ok(cached);
        }

        let blacklisted = self.recovery.is_blacklisted(platform, provider_name).await?;
        cache.insert(key, blacklisted).await;
        Ok(blacklisted)
    }

    /// 记录一次失败
    pub async fn record_failure(&self, platform: &str, provider_name: &str) -> Result<()> {
        self.record_failure_detailed(platform, provider_name)
            .await
            .map(|_| ())
    }

    /// 记录一次失败并返回本次的计数与升级结果
    pub async fn record_failure_detailed(
        &self,
        platform: &str,
        provider_name: &str,
    ) -> Result<FailureOutcome> {
        let outcome = self.tracker.record_failure(platform, provider_name).await;
        self.invalidate_status(platform, provider_name).await;
        outcome
    }

    /// 记录一次成功（不改变任何状态）
    pub async fn record_success(&self, platform: &str, provider_name: &str) -> Result<()> {
        self.tracker.record_success(platform, provider_name).await
    }

    /// 手动重置服务商为健康零级状态，返回记录是否存在
    pub async fn reset_provider(&self, platform: &str, provider_name: &str) -> Result<bool> {
        let existed = self
            .store
            .reset(platform, provider_name, self.clock.now_naive())
            .await?;
        self.invalidate_status(platform, provider_name).await;

        linfo!(
            "system",
            LogStage::Recovery,
            LogComponent::Service,
            "manual_reset",
            "Provider blacklist state reset manually",
            platform = %platform,
            provider = %provider_name,
            existed = existed
        );
        Ok(existed)
    }

    /// 读取单个服务商的原始记录（运维用）
    pub async fn record(&self, platform: &str, provider_name: &str) -> Result<Option<Model>> {
        self.store.find(platform, provider_name).await
    }

    /// 全部服务商记录（运维用）
    pub async fn list_records(&self) -> Result<Vec<Model>> {
        self.store.list().await
    }

    /// 当前生效的设置
    pub async fn settings(&self) -> BlacklistSettings {
        self.settings.get_settings().await
    }

    /// 按键名修改设置
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let key = SettingKey::from_str(key)?;
        self.settings.set_setting(key, value).await?;
        if let Some(cache) = &self.status_cache {
            cache.invalidate_all();
        }
        Ok(())
    }

    /// 按配置的间隔启动后台设置刷新任务，间隔为 0 时不启动
    ///
    /// 需要在 tokio 运行时内调用。
    pub fn spawn_settings_refresher(&self) -> Option<JoinHandle<()>> {
        self.refresh_interval
            .map(|interval| self.settings.spawn_refresher(interval))
    }

    async fn invalidate_status(&self, platform: &str, provider_name: &str) {
        if let Some(cache) = &self.status_cache {
            cache
                .invalidate(&ProviderKey::new(platform, provider_name))
                .await;
        }
    }
}
