//! # 黑名单升级策略
//!
//! 失败次数越过阈值时决定新的黑名单等级与冷却时长：
//!
//! - 每个自然小时最多升级一次（`last_degrade_hour` 小时桶）；同一小时内再次越过阈值时
//!   按当前等级重新拉黑，等级不变
//! - 等级上限为 `max_level`，到达上限后仍会重新拉黑，但不再升级
//! - 冷却时长 = 基础时长 × `min(2^(level-1), max_backoff_multiplier)`

use super::types::BlacklistSettings;
use crate::config::BlacklistConfig;
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo};
use chrono::{Duration, NaiveDateTime};
use entity::provider_blacklist::Model;

const SECONDS_PER_HOUR: i64 = 3600;

/// 一次升级判定的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// 已升级并进入（或延长）黑名单
    Escalated {
        level: u32,
        until: NaiveDateTime,
    },
    /// 本小时已经升级过，按当前等级重新拉黑
    HourGuarded {
        level: u32,
        until: NaiveDateTime,
    },
}

/// 升级策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    max_level: u32,
    max_backoff_multiplier: u32,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::from_config(&BlacklistConfig::default())
    }
}

impl EscalationPolicy {
    #[must_use]
    pub const fn new(max_level: u32, max_backoff_multiplier: u32) -> Self {
        Self {
            max_level,
            max_backoff_multiplier,
        }
    }

    #[must_use]
    pub const fn from_config(config: &BlacklistConfig) -> Self {
        Self::new(config.max_level, config.max_backoff_multiplier)
    }

    /// 所在的小时桶（Unix 纪元起的整小时数）
    #[must_use]
    pub fn hour_bucket(now: NaiveDateTime) -> i64 {
        now.and_utc().timestamp().div_euclid(SECONDS_PER_HOUR)
    }

    /// 退避倍数，随等级单调不减
    #[must_use]
    pub fn backoff(&self, level: u32) -> u32 {
        if level <= 1 {
            return 1;
        }
        2_u32
            .checked_pow(level - 1)
            .unwrap_or(u32::MAX)
            .min(self.max_backoff_multiplier)
            .max(1)
    }

    /// 指定等级的冷却时长，溢出时饱和为最大值
    #[must_use]
    pub fn cooldown(&self, settings: &BlacklistSettings, level: u32) -> Duration {
        i64::from(settings.duration_minutes)
            .checked_mul(i64::from(self.backoff(level)))
            .and_then(Duration::try_minutes)
            .unwrap_or(Duration::MAX)
    }

    fn cooldown_end(
        &self,
        settings: &BlacklistSettings,
        level: u32,
        now: NaiveDateTime,
    ) -> NaiveDateTime {
        now.checked_add_signed(self.cooldown(settings, level))
            .unwrap_or(NaiveDateTime::MAX)
    }

    /// 对记录执行一次升级判定，原地修改记录
    pub fn apply(
        &self,
        record: &mut Model,
        settings: &BlacklistSettings,
        now: NaiveDateTime,
    ) -> EscalationOutcome {
        let current_level = u32::try_from(record.blacklist_level).unwrap_or(0);
        let current_hour = Self::hour_bucket(now);

        if record.last_degrade_hour == current_hour {
            let level = current_level.max(1);
            let mut until = self.cooldown_end(settings, level, now);
            // 仍在冷却中时不缩短已有的冷却期
            if let Some(existing) = record.blacklisted_until
                && existing > until
            {
                until = existing;
            }
            if !record.is_blacklisted_at(now) {
                record.blacklisted_at = Some(now);
            }
            record.blacklisted_until = Some(until);
            record.auto_recovered = false;

            ldebug!(
                "system",
                LogStage::Escalation,
                LogComponent::Escalation,
                "hour_guarded",
                "Threshold crossed again this hour, re-blacklisted at current level",
                platform = %record.platform,
                provider = %record.provider_name,
                level = current_level,
                failure_count = record.failure_count,
                until = %until
            );
            return EscalationOutcome::HourGuarded {
                level: current_level,
                until,
            };
        }

        // 等级只增不减，即便上限在运行中被调低
        let new_level = current_level
            .saturating_add(1)
            .min(self.max_level)
            .max(current_level);
        let cooldown = self.cooldown(settings, new_level);
        let until = self.cooldown_end(settings, new_level, now);

        if !record.is_blacklisted_at(now) {
            record.blacklisted_at = Some(now);
        }
        record.blacklisted_until = Some(until);
        record.blacklist_level = i32::try_from(new_level).unwrap_or(i32::MAX);
        record.last_degrade_hour = current_hour;
        record.auto_recovered = false;

        linfo!(
            "system",
            LogStage::Escalation,
            LogComponent::Escalation,
            "provider_blacklisted",
            "Provider blacklisted",
            platform = %record.platform,
            provider = %record.provider_name,
            level = new_level,
            cooldown_minutes = cooldown.num_minutes(),
            until = %until
        );

        EscalationOutcome::Escalated {
            level: new_level,
            until,
        }
    }
}
