//! # 黑名单设置提供者
//!
//! 读穿缓存 `app_settings` 表中的三个调优参数。首次使用时写入默认值；
//! 读取失败时退回上一次成功读取的值（或默认值）。进入降级状态后，
//! 读取直接返回缓存值，重新加载在后台任务中进行，不会阻塞失败记录路径。

use super::types::{BlacklistSettings, SettingKey};
use crate::database_error;
use crate::error::{BlacklistError, Context, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo, lwarn};
use entity::app_settings::{self, Column, Entity as AppSettings};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// 读取失败后，在此时间内不再尝试重新加载
const FAILED_READ_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
struct SettingsState {
    settings: BlacklistSettings,
    loaded: bool,
    /// 最近一次读取失败，尚未恢复
    degraded: bool,
    /// 每次失效递增，防止失效前发起的读取把旧值写回
    generation: u64,
    retry_after: Option<Instant>,
}

/// 黑名单设置提供者
pub struct SettingsProvider {
    db: Arc<DatabaseConnection>,
    state: RwLock<SettingsState>,
    read_timeout: Duration,
    retry_backoff: Duration,
    defaults_seeded: AtomicBool,
    refreshing: AtomicBool,
}

impl SettingsProvider {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, read_timeout: Duration) -> Self {
        Self {
            db,
            state: RwLock::new(SettingsState {
                settings: BlacklistSettings::default(),
                loaded: false,
                degraded: false,
                generation: 0,
                retry_after: None,
            }),
            read_timeout,
            retry_backoff: FAILED_READ_BACKOFF,
            defaults_seeded: AtomicBool::new(false),
            refreshing: AtomicBool::new(false),
        }
    }

    /// 设置读取失败后的重试间隔
    #[must_use]
    pub const fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    /// 获取当前设置
    ///
    /// 尚未成功读取过时会访问存储；存储不可用时返回上一次的值或默认值并记录告警。
    /// 降级期间不在调用方路径上访问存储，到达重试时间后在后台重新加载。
    pub async fn get_settings(self: &Arc<Self>) -> BlacklistSettings {
        let state = *self.state.read().await;
        if state.loaded {
            return state.settings;
        }
        if state.degraded {
            if state.retry_after.is_none_or(|at| Instant::now() >= at) {
                self.spawn_background_reload();
            }
            return state.settings;
        }

        match self.refresh().await {
            Ok(settings) => settings,
            Err(e) => self.mark_degraded(&e).await,
        }
    }

    /// 从存储重新读取设置并更新缓存
    pub async fn refresh(&self) -> Result<BlacklistSettings> {
        let generation = self.state.read().await.generation;

        let settings = tokio::time::timeout(self.read_timeout, self.load_from_store())
            .await
            .map_err(|_| {
                database_error!("读取黑名单设置超时 ({}ms)", self.read_timeout.as_millis())
            })??;

        let mut state = self.state.write().await;
        if state.generation == generation {
            state.settings = settings;
            state.loaded = true;
            state.degraded = false;
            state.retry_after = None;
        }
        Ok(settings)
    }

    async fn mark_degraded(&self, error: &BlacklistError) -> BlacklistSettings {
        let mut state = self.state.write().await;
        state.degraded = true;
        state.retry_after = Some(Instant::now() + self.retry_backoff);
        lwarn!(
            "system",
            LogStage::Settings,
            LogComponent::Settings,
            "settings_degraded",
            "Settings store unavailable, using last known values",
            enabled = state.settings.enabled,
            failure_threshold = state.settings.failure_threshold,
            duration_minutes = state.settings.duration_minutes,
            error = %error
        );
        state.settings
    }

    /// 同一时间最多一个后台重新加载任务
    fn spawn_background_reload(self: &Arc<Self>) {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let provider = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = provider.refresh().await {
                provider.mark_degraded(&e).await;
            } else {
                linfo!(
                    "system",
                    LogStage::Settings,
                    LogComponent::Settings,
                    "settings_recovered",
                    "Settings store reachable again"
                );
            }
            provider.refreshing.store(false, Ordering::Release);
        });
    }

    /// 写入一个设置并使缓存失效
    pub async fn set_setting(&self, key: SettingKey, value: &str) -> Result<()> {
        let mut validated = BlacklistSettings::default();
        validated.apply(key, value)?;
        let normalized = match key {
            SettingKey::EnableBlacklist => validated.enabled.to_string(),
            SettingKey::FailureThreshold => validated.failure_threshold.to_string(),
            SettingKey::DurationMinutes => validated.duration_minutes.to_string(),
        };

        let row = app_settings::ActiveModel {
            key: Set(key.as_str().to_string()),
            value: Set(Some(normalized.clone())),
            ..Default::default()
        };
        AppSettings::insert(row)
            .on_conflict(
                OnConflict::column(Column::Key)
                    .update_column(Column::Value)
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .with_context(|| format!("写入设置失败: {key}"))?;

        self.invalidate().await;

        linfo!(
            "system",
            LogStage::Settings,
            LogComponent::Settings,
            "setting_updated",
            "Blacklist setting updated",
            key = %key,
            value = %normalized
        );
        Ok(())
    }

    /// 使缓存失效，下一次读取会重新访问存储
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.loaded = false;
        state.degraded = false;
        state.retry_after = None;
        state.generation = state.generation.wrapping_add(1);
    }

    /// 启动后台刷新任务，提供者被释放后任务自动退出
    pub fn spawn_refresher(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(provider) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = provider.refresh().await {
                    lwarn!(
                        "system",
                        LogStage::Settings,
                        LogComponent::Settings,
                        "background_refresh_failed",
                        "Background settings refresh failed",
                        error = %e
                    );
                }
            }
        })
    }

    async fn load_from_store(&self) -> Result<BlacklistSettings> {
        self.ensure_defaults().await?;

        let keys: Vec<&str> = SettingKey::ALL.iter().map(|k| k.as_str()).collect();
        let rows = AppSettings::find()
            .filter(Column::Key.is_in(keys))
            .all(self.db.as_ref())
            .await
            .context("读取黑名单设置失败")?;

        let mut settings = BlacklistSettings::default();
        for row in rows {
            let Ok(key) = SettingKey::from_str(&row.key) else {
                continue;
            };
            let Some(raw) = row.value.as_deref() else {
                continue;
            };
            if let Err(e) = settings.apply(key, raw) {
                lwarn!(
                    "system",
                    LogStage::Settings,
                    LogComponent::Settings,
                    "invalid_setting_value",
                    "Stored setting is invalid, using default",
                    key = %key,
                    error = %e
                );
            }
        }

        ldebug!(
            "system",
            LogStage::Settings,
            LogComponent::Settings,
            "settings_loaded",
            "Blacklist settings loaded",
            enabled = settings.enabled,
            failure_threshold = settings.failure_threshold,
            duration_minutes = settings.duration_minutes
        );
        Ok(settings)
    }

    /// 首次使用时写入默认设置，已存在的键保持不变
    async fn ensure_defaults(&self) -> Result<()> {
        if self.defaults_seeded.load(Ordering::Acquire) {
            return Ok(());
        }

        for key in SettingKey::ALL {
            let row = app_settings::ActiveModel {
                key: Set(key.as_str().to_string()),
                value: Set(Some(key.default_value())),
                ..Default::default()
            };
            AppSettings::insert(row)
                .on_conflict(OnConflict::column(Column::Key).do_nothing().to_owned())
                .exec_without_returning(self.db.as_ref())
                .await
                .with_context(|| format!("写入默认设置失败: {key}"))?;
        }

        self.defaults_seeded.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::create_test_db;
    use pretty_assertions::assert_eq;
    use sea_orm::ConnectionTrait;

    async fn provider() -> (Arc<DatabaseConnection>, Arc<SettingsProvider>) {
        let db = Arc::new(create_test_db().await.unwrap());
        let provider = Arc::new(SettingsProvider::new(Arc::clone(&db), Duration::from_secs(1)));
        (db, provider)
    }

    #[tokio::test]
    async fn test_defaults_seeded_on_first_use() {
        let (db, provider) = provider().await;

        assert_eq!(provider.get_settings().await, BlacklistSettings::default());

        let rows = AppSettings::find().all(db.as_ref()).await.unwrap();
        assert_eq!(rows.len(), 3);
        let threshold = rows
            .iter()
            .find(|r| r.key == "blacklist_failure_threshold")
            .unwrap();
        assert_eq!(threshold.value.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_existing_values_not_overwritten_by_defaults() {
        let (db, provider) = provider().await;
        db.execute_unprepared(
            "INSERT INTO app_settings (key, value) VALUES ('blacklist_failure_threshold', '7')",
        )
        .await
        .unwrap();

        let settings = provider.get_settings().await;
        assert_eq!(settings.failure_threshold, 7);
        assert_eq!(settings.duration_minutes, 30);
    }

    #[tokio::test]
    async fn test_set_setting_invalidates_cache() {
        let (_db, provider) = provider().await;
        assert!(provider.get_settings().await.enabled);

        provider
            .set_setting(SettingKey::EnableBlacklist, "false")
            .await
            .unwrap();
        provider
            .set_setting(SettingKey::DurationMinutes, "45")
            .await
            .unwrap();

        let settings = provider.get_settings().await;
        assert!(!settings.enabled);
        assert_eq!(settings.duration_minutes, 45);
    }

    #[tokio::test]
    async fn test_set_setting_rejects_invalid_value() {
        let (_db, provider) = provider().await;
        let err = provider
            .set_setting(SettingKey::FailureThreshold, "0")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::BlacklistError::Config { .. }));
        assert_eq!(provider.get_settings().await.failure_threshold, 3);
    }

    #[tokio::test]
    async fn test_invalid_stored_value_falls_back_to_default() {
        let (db, provider) = provider().await;
        db.execute_unprepared(
            "INSERT INTO app_settings (key, value) VALUES ('blacklist_duration_minutes', 'abc')",
        )
        .await
        .unwrap();

        assert_eq!(provider.get_settings().await.duration_minutes, 30);
    }

    #[tokio::test]
    async fn test_store_outage_keeps_last_known_values() {
        let (db, provider) = provider().await;
        provider
            .set_setting(SettingKey::FailureThreshold, "5")
            .await
            .unwrap();
        assert_eq!(provider.get_settings().await.failure_threshold, 5);

        db.execute_unprepared("DROP TABLE app_settings").await.unwrap();
        provider.invalidate().await;

        // 存储不可用：不报错，继续使用上一次的值
        assert_eq!(provider.get_settings().await.failure_threshold, 5);
        assert!(provider.refresh().await.is_err());
    }

    #[tokio::test]
    async fn test_store_outage_before_first_read_uses_defaults() {
        let (db, provider) = provider().await;
        db.execute_unprepared("DROP TABLE app_settings").await.unwrap();

        assert_eq!(provider.get_settings().await, BlacklistSettings::default());
    }

    #[tokio::test]
    async fn test_degraded_reads_return_cached_and_reload_in_background() {
        let db = Arc::new(create_test_db().await.unwrap());
        let provider = Arc::new(
            SettingsProvider::new(Arc::clone(&db), Duration::from_secs(1))
                .with_retry_backoff(Duration::ZERO),
        );
        provider
            .set_setting(SettingKey::FailureThreshold, "4")
            .await
            .unwrap();
        assert_eq!(provider.get_settings().await.failure_threshold, 4);

        db.execute_unprepared("DROP TABLE app_settings").await.unwrap();
        provider.invalidate().await;
        assert_eq!(provider.get_settings().await.failure_threshold, 4);

        db.execute_unprepared(
            "CREATE TABLE app_settings (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             key TEXT NOT NULL UNIQUE, value TEXT)",
        )
        .await
        .unwrap();
        db.execute_unprepared(
            "INSERT INTO app_settings (key, value) VALUES ('blacklist_failure_threshold', '8')",
        )
        .await
        .unwrap();

        // 降级期间直接返回缓存值，后台任务完成后读到新值
        let mut threshold = provider.get_settings().await.failure_threshold;
        for _ in 0..50 {
            if threshold == 8 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            threshold = provider.get_settings().await.failure_threshold;
        }
        assert_eq!(threshold, 8);
    }
}
