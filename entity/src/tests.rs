//! # 实体定义测试

#[cfg(test)]
mod tests {
    use crate::{app_settings, provider_blacklist};
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use sea_orm::Set;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn healthy_record() -> provider_blacklist::Model {
        provider_blacklist::Model {
            id: 1,
            platform: "claude".to_string(),
            provider_name: "relay-a".to_string(),
            failure_count: 0,
            blacklisted_at: None,
            blacklisted_until: None,
            last_failure_at: None,
            blacklist_level: 0,
            last_recovered_at: None,
            last_degrade_hour: 0,
            last_failure_window_start: None,
            auto_recovered: false,
            version: 0,
            created_at: at(0, 0),
            updated_at: at(0, 0),
        }
    }

    #[test]
    fn test_app_setting_creation() {
        let setting = app_settings::ActiveModel {
            key: Set("enable_blacklist".to_string()),
            value: Set(Some("true".to_string())),
            ..Default::default()
        };

        assert_eq!(setting.key.as_ref(), "enable_blacklist");
        assert_eq!(setting.value.as_ref(), &Some("true".to_string()));
    }

    #[test]
    fn test_healthy_record_is_not_blacklisted() {
        let record = healthy_record();
        assert!(!record.is_blacklisted_at(at(12, 0)));
        assert!(!record.is_expired_at(at(12, 0)));
    }

    #[test]
    fn test_blacklist_window_boundaries() {
        let mut record = healthy_record();
        record.blacklisted_at = Some(at(10, 0));
        record.blacklisted_until = Some(at(10, 0) + Duration::minutes(30));

        assert!(record.is_blacklisted_at(at(10, 29)));
        assert!(!record.is_expired_at(at(10, 29)));

        // 到期时刻本身视为已恢复
        assert!(!record.is_blacklisted_at(at(10, 30)));
        assert!(record.is_expired_at(at(10, 30)));
    }
}
