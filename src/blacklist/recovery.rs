//! # 惰性恢复判定
//!
//! 在读取时判断服务商是否仍在黑名单中；冷却已结束的记录在此处被标记为自动恢复。
//! 恢复只结束当前冷却期，不会降低黑名单等级。

use super::clock::Clock;
use super::settings::SettingsProvider;
use super::store::BlacklistStore;
use crate::database_error;
use crate::error::Result;
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo};
use std::sync::Arc;

/// 恢复判定器
pub struct RecoveryEvaluator {
    store: BlacklistStore,
    settings: Arc<SettingsProvider>,
    clock: Arc<dyn Clock>,
    max_cas_retries: u32,
}

impl RecoveryEvaluator {
    #[must_use]
    pub fn new(
        store: BlacklistStore,
        settings: Arc<SettingsProvider>,
        clock: Arc<dyn Clock>,
        max_cas_retries: u32,
    ) -> Self {
        Self {
            store,
            settings,
            clock,
            max_cas_retries: max_cas_retries.max(1),
        }
    }

    /// 服务商当前是否在黑名单中
    pub async fn is_blacklisted(&self, platform: &str, provider_name: &str) -> Result<bool> {
        if !self.settings.get_settings().await.enabled {
            return Ok(false);
        }

        for attempt in 1..=self.max_cas_retries {
            let now = self.clock.now_naive();
            let Some(mut record) = self.store.find(platform, provider_name).await? else {
                return Ok(false);
            };
            let Some(until) = record.blacklisted_until else {
                return Ok(false);
            };
            if !record.is_expired_at(now) {
                return Ok(true);
            }

            let expected_version = record.version;
            record.blacklisted_at = None;
            record.blacklisted_until = None;
            record.auto_recovered = true;
            record.last_recovered_at = Some(now);

            if self
                .store
                .compare_and_save(&record, expected_version, now)
                .await?
            {
                linfo!(
                    "system",
                    LogStage::Recovery,
                    LogComponent::Recovery,
                    "auto_recovered",
                    "Blacklist expired, provider auto-recovered",
                    platform = %platform,
                    provider = %provider_name,
                    level = record.blacklist_level,
                    expired_at = %until
                );
                return Ok(false);
            }

            // 并发写入者可能已经恢复或重新拉黑了该记录，重新读取后再判定
            ldebug!(
                "system",
                LogStage::Recovery,
                LogComponent::Recovery,
                "version_conflict",
                "Concurrent update during recovery, re-evaluating",
                platform = %platform,
                provider = %provider_name,
                attempt = attempt
            );
            tokio::task::yield_now().await;
        }

        Err(database_error!(
            "自动恢复时乐观锁冲突，重试 {} 次后放弃: {}/{}",
            self.max_cas_retries,
            platform,
            provider_name
        ))
    }
}
