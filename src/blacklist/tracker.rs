//! # 失败记录器
//!
//! 在滚动窗口内累计服务商失败次数，越过阈值时交给 [`EscalationPolicy`]。
//! 每次记录都是"读取 → 修改 → 按版本保存"，冲突时重新读取并整体重试。

use super::clock::Clock;
use super::escalation::{EscalationOutcome, EscalationPolicy};
use super::settings::SettingsProvider;
use super::store::BlacklistStore;
use super::types::BlacklistSettings;
use crate::database_error;
use crate::error::Result;
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};
use chrono::NaiveDateTime;
use entity::provider_blacklist::Model;
use std::sync::Arc;

/// 一次失败记录后的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    /// 当前窗口内的失败次数
    pub failure_count: u32,
    /// 本次是否触发了升级判定，以及判定结果
    pub escalation: Option<EscalationOutcome>,
}

/// 失败记录器
pub struct FailureTracker {
    store: BlacklistStore,
    settings: Arc<SettingsProvider>,
    policy: EscalationPolicy,
    clock: Arc<dyn Clock>,
    max_cas_retries: u32,
}

impl FailureTracker {
    #[must_use]
    pub fn new(
        store: BlacklistStore,
        settings: Arc<SettingsProvider>,
        policy: EscalationPolicy,
        clock: Arc<dyn Clock>,
        max_cas_retries: u32,
    ) -> Self {
        Self {
            store,
            settings,
            policy,
            clock,
            max_cas_retries: max_cas_retries.max(1),
        }
    }

    /// 记录一次失败
    pub async fn record_failure(&self, platform: &str, provider_name: &str) -> Result<FailureOutcome> {
        let settings = self.settings.get_settings().await;

        for attempt in 1..=self.max_cas_retries {
            let now = self.clock.now_naive();
            let mut record = self.store.get_or_create(platform, provider_name, now).await?;
            let expected_version = record.version;

            let outcome = apply_failure(&mut record, &settings, &self.policy, now);

            if self
                .store
                .compare_and_save(&record, expected_version, now)
                .await?
            {
                ldebug!(
                    "system",
                    LogStage::FailureRecording,
                    LogComponent::Tracker,
                    "failure_recorded",
                    "Provider failure recorded",
                    platform = %platform,
                    provider = %provider_name,
                    failure_count = outcome.failure_count,
                    level = record.blacklist_level,
                    attempt = attempt
                );
                return Ok(outcome);
            }

            ldebug!(
                "system",
                LogStage::FailureRecording,
                LogComponent::Tracker,
                "version_conflict",
                "Concurrent update detected, retrying",
                platform = %platform,
                provider = %provider_name,
                attempt = attempt
            );
            tokio::task::yield_now().await;
        }

        Err(database_error!(
            "记录失败时乐观锁冲突，重试 {} 次后放弃: {}/{}",
            self.max_cas_retries,
            platform,
            provider_name
        ))
    }

    /// 记录一次成功
    ///
    /// 仅作参考：不会清零失败计数，也不会提前结束冷却期，冷却只随时间结束。
    pub async fn record_success(&self, platform: &str, provider_name: &str) -> Result<()> {
        let now = self.clock.now_naive();
        let record = self.store.find(platform, provider_name).await?;
        let blacklisted = record.as_ref().is_some_and(|r| r.is_blacklisted_at(now));

        ldebug!(
            "system",
            LogStage::FailureRecording,
            LogComponent::Tracker,
            "success_observed",
            if blacklisted {
                "Success ignored while provider is blacklisted"
            } else {
                "Success observed, failure window unchanged"
            },
            platform = %platform,
            provider = %provider_name,
            failure_count = record.as_ref().map_or(0, |r| r.failure_count)
        );
        Ok(())
    }
}

/// 对记录应用一次失败：维护计数窗口、累加次数，越过阈值时执行升级判定
pub fn apply_failure(
    record: &mut Model,
    settings: &BlacklistSettings,
    policy: &EscalationPolicy,
    now: NaiveDateTime,
) -> FailureOutcome {
    let window_expired = record
        .last_failure_window_start
        .is_none_or(|start| now - start > settings.duration());
    if window_expired {
        record.last_failure_window_start = Some(now);
        record.failure_count = 0;
    }

    record.failure_count = record.failure_count.saturating_add(1);
    record.last_failure_at = Some(now);

    let failure_count = u32::try_from(record.failure_count).unwrap_or(0);
    let escalation = (settings.enabled && failure_count >= settings.failure_threshold)
        .then(|| policy.apply(record, settings, now));

    FailureOutcome {
        failure_count,
        escalation,
    }
}
