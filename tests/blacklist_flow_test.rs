//! 黑名单完整流程集成测试

use chrono::{Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use pretty_assertions::assert_eq;
use provider_blacklist::ProviderBlacklistService;
use provider_blacklist::blacklist::{EscalationOutcome, ManualClock};
use provider_blacklist::config::BlacklistConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;

async fn setup_test_db() -> Arc<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.expect("connect test db");
    Migrator::up(&db, None).await.expect("run migrations");
    Arc::new(db)
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

async fn setup_service() -> (ProviderBlacklistService, ManualClock) {
    let db = setup_test_db().await;
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap());
    let config = BlacklistConfig {
        status_cache_ttl_ms: 0,
        ..Default::default()
    };
    let service = ProviderBlacklistService::with_clock(db, &config, Arc::new(clock.clone()));
    (service, clock)
}

#[tokio::test]
async fn blacklist_recover_and_escalate() {
    let (service, clock) = setup_service().await;

    assert!(!service.is_blacklisted("claude", "relay-a").await.unwrap());

    for _ in 0..3 {
        clock.advance(Duration::minutes(1));
        service.record_failure("claude", "relay-a").await.unwrap();
    }
    let record = service.record("claude", "relay-a").await.unwrap().unwrap();
    assert_eq!(record.blacklist_level, 1);
    assert_eq!(record.blacklisted_at, Some(at(10, 3)));
    assert_eq!(record.blacklisted_until, Some(at(10, 33)));

    clock.set(Utc.with_ymd_and_hms(2025, 6, 1, 10, 10, 0).unwrap());
    assert!(service.is_blacklisted("claude", "relay-a").await.unwrap());

    clock.set(Utc.with_ymd_and_hms(2025, 6, 1, 10, 34, 0).unwrap());
    assert!(!service.is_blacklisted("claude", "relay-a").await.unwrap());
    let record = service.record("claude", "relay-a").await.unwrap().unwrap();
    assert!(record.auto_recovered);
    assert_eq!(record.blacklist_level, 1);

    // 下一个小时内再失败三次：升到 2 级，冷却 30 × 2 分钟
    clock.set(Utc.with_ymd_and_hms(2025, 6, 1, 11, 5, 0).unwrap());
    let mut last = None;
    for _ in 0..3 {
        clock.advance(Duration::minutes(1));
        last = service
            .record_failure_detailed("claude", "relay-a")
            .await
            .unwrap()
            .escalation;
    }
    assert_eq!(
        last,
        Some(EscalationOutcome::Escalated {
            level: 2,
            until: at(12, 8)
        })
    );

    let record = service.record("claude", "relay-a").await.unwrap().unwrap();
    assert_eq!(record.blacklist_level, 2);
    assert!(!record.auto_recovered);
    assert!(service.is_blacklisted("claude", "relay-a").await.unwrap());
}

#[tokio::test]
async fn second_threshold_crossing_in_same_hour_keeps_level() {
    let (service, clock) = setup_service().await;

    for _ in 0..3 {
        service.record_failure("codex", "relay-b").await.unwrap();
    }
    // 10:30 冷却结束，失败窗口仍未过期
    clock.advance(Duration::minutes(30));
    assert!(!service.is_blacklisted("codex", "relay-b").await.unwrap());

    // 仍在同一小时桶内：按当前等级重新拉黑，不升级
    let outcome = service
        .record_failure_detailed("codex", "relay-b")
        .await
        .unwrap();
    assert_eq!(
        outcome.escalation,
        Some(EscalationOutcome::HourGuarded {
            level: 1,
            until: at(11, 0)
        })
    );
    assert!(service.is_blacklisted("codex", "relay-b").await.unwrap());

    let record = service.record("codex", "relay-b").await.unwrap().unwrap();
    assert_eq!(record.blacklist_level, 1);
    assert!(!record.auto_recovered);
}

#[tokio::test]
async fn continuous_failures_after_recovery_isolate_provider() {
    let (service, clock) = setup_service().await;

    for _ in 0..3 {
        service.record_failure("claude", "relay-a").await.unwrap();
    }
    clock.advance(Duration::minutes(31));
    assert!(!service.is_blacklisted("claude", "relay-a").await.unwrap());

    for _ in 0..10 {
        service.record_failure("claude", "relay-a").await.unwrap();
    }

    assert!(service.is_blacklisted("claude", "relay-a").await.unwrap());
    let record = service.record("claude", "relay-a").await.unwrap().unwrap();
    assert_eq!(record.failure_count, 10);
    assert_eq!(record.blacklist_level, 1);
    assert_eq!(record.blacklisted_until, Some(at(11, 1)));
}

#[tokio::test]
async fn disabled_blacklist_bypasses_everything() {
    let (service, _clock) = setup_service().await;
    service.set_setting("enable_blacklist", "false").await.unwrap();

    for _ in 0..10 {
        service.record_failure("claude", "relay-a").await.unwrap();
    }
    assert!(!service.is_blacklisted("claude", "relay-a").await.unwrap());

    let record = service.record("claude", "relay-a").await.unwrap().unwrap();
    assert_eq!(record.failure_count, 10);
    assert_eq!(record.blacklist_level, 0);
    assert!(record.blacklisted_until.is_none());
}

#[tokio::test]
async fn level_cycles_at_cap() {
    let db = setup_test_db().await;
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
    let config = BlacklistConfig {
        max_level: 2,
        status_cache_ttl_ms: 0,
        ..Default::default()
    };
    let service = ProviderBlacklistService::with_clock(db, &config, Arc::new(clock.clone()));

    let mut cooldowns = Vec::new();
    for hour in 0..4 {
        clock.set(Utc.with_ymd_and_hms(2025, 6, 1, hour * 3, 0, 0).unwrap());
        for _ in 0..3 {
            service.record_failure("gemini", "relay-g").await.unwrap();
        }
        let record = service.record("gemini", "relay-g").await.unwrap().unwrap();
        let (Some(start), Some(until)) = (record.blacklisted_at, record.blacklisted_until) else {
            panic!("provider should be blacklisted");
        };
        cooldowns.push((record.blacklist_level, (until - start).num_minutes()));
    }

    assert_eq!(cooldowns, vec![(1, 30), (2, 60), (2, 60), (2, 60)]);
}
