//! # 黑名单类型定义

use crate::error::{BlacklistError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `app_settings` 表中识别的设置键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// 是否启用黑名单
    EnableBlacklist,
    /// 触发拉黑的失败次数阈值
    FailureThreshold,
    /// 基础拉黑时长（分钟），同时也是失败计数窗口大小
    DurationMinutes,
}

impl SettingKey {
    /// 全部设置键，顺序即默认值写入顺序
    pub const ALL: [Self; 3] = [
        Self::EnableBlacklist,
        Self::FailureThreshold,
        Self::DurationMinutes,
    ];

    /// 数据库中的键名
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnableBlacklist => "enable_blacklist",
            Self::FailureThreshold => "blacklist_failure_threshold",
            Self::DurationMinutes => "blacklist_duration_minutes",
        }
    }

    /// 该键的默认值文本
    #[must_use]
    pub fn default_value(self) -> String {
        let defaults = BlacklistSettings::default();
        match self {
            Self::EnableBlacklist => defaults.enabled.to_string(),
            Self::FailureThreshold => defaults.failure_threshold.to_string(),
            Self::DurationMinutes => defaults.duration_minutes.to_string(),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = BlacklistError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "enable_blacklist" => Ok(Self::EnableBlacklist),
            "blacklist_failure_threshold" => Ok(Self::FailureThreshold),
            "blacklist_duration_minutes" => Ok(Self::DurationMinutes),
            _ => Err(BlacklistError::config(format!("未知的设置项: {s}"))),
        }
    }
}

/// 进程级黑名单设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistSettings {
    pub enabled: bool,
    pub failure_threshold: u32,
    pub duration_minutes: u32,
}

impl Default for BlacklistSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 3,
            duration_minutes: 30,
        }
    }
}

impl BlacklistSettings {
    /// 基础拉黑时长，也是失败计数窗口大小
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.duration_minutes))
    }

    /// 校验并应用一个设置值
    pub fn apply(&mut self, key: SettingKey, raw: &str) -> Result<()> {
        let raw = raw.trim();
        match key {
            SettingKey::EnableBlacklist => {
                self.enabled = parse_bool(raw)
                    .ok_or_else(|| BlacklistError::config(format!("{key} 需要 true/false，实际为: {raw}")))?;
            }
            SettingKey::FailureThreshold => self.failure_threshold = parse_positive(key, raw)?,
            SettingKey::DurationMinutes => self.duration_minutes = parse_positive(key, raw)?,
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_positive(key: SettingKey, raw: &str) -> Result<u32> {
    match raw.parse::<u32>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(BlacklistError::config(format!(
            "{key} 需要不小于1的整数，实际为: {raw}"
        ))),
    }
}

/// 服务商标识 (platform, provider_name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderKey {
    pub platform: String,
    pub provider_name: String,
}

impl ProviderKey {
    pub fn new(platform: impl Into<String>, provider_name: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            provider_name: provider_name.into(),
        }
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.provider_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_setting_key_parsing() {
        assert_eq!(
            SettingKey::from_str("enable_blacklist").unwrap(),
            SettingKey::EnableBlacklist
        );
        assert_eq!(
            SettingKey::from_str("blacklist_duration_minutes").unwrap(),
            SettingKey::DurationMinutes
        );
        assert!(SettingKey::from_str("theme").is_err());
    }

    #[test]
    fn test_default_values_match_defaults() {
        assert_eq!(SettingKey::EnableBlacklist.default_value(), "true");
        assert_eq!(SettingKey::FailureThreshold.default_value(), "3");
        assert_eq!(SettingKey::DurationMinutes.default_value(), "30");
    }

    #[rstest]
    #[case(SettingKey::EnableBlacklist, "false")]
    #[case(SettingKey::FailureThreshold, "5")]
    #[case(SettingKey::DurationMinutes, " 45 ")]
    fn test_apply_accepts_valid_values(#[case] key: SettingKey, #[case] raw: &str) {
        let mut settings = BlacklistSettings::default();
        settings.apply(key, raw).unwrap();
        assert_ne!(settings, BlacklistSettings::default());
    }

    #[rstest]
    #[case(SettingKey::EnableBlacklist, "yes")]
    #[case(SettingKey::FailureThreshold, "0")]
    #[case(SettingKey::FailureThreshold, "-1")]
    #[case(SettingKey::DurationMinutes, "half an hour")]
    fn test_apply_rejects_invalid_values(#[case] key: SettingKey, #[case] raw: &str) {
        let mut settings = BlacklistSettings::default();
        assert!(settings.apply(key, raw).is_err());
        assert_eq!(settings, BlacklistSettings::default());
    }

    #[test]
    fn test_provider_key_display() {
        assert_eq!(ProviderKey::new("claude", "relay-a").to_string(), "claude/relay-a");
    }
}
