//! # 时钟抽象
//!
//! 黑名单判定全部基于注入的时钟，测试中用 [`ManualClock`] 推进时间。

use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};

/// 时间来源
pub trait Clock: Send + Sync {
    /// 当前 UTC 时间
    fn now(&self) -> DateTime<Utc>;

    /// 当前 UTC 时间（数据库使用的无时区格式）
    fn now_naive(&self) -> NaiveDateTime {
        self.now().naive_utc()
    }
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 可手动推进的时钟
#[derive(Debug, Clone)]
pub struct ManualClock {
    current_time: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        Self {
            current_time: Arc::new(RwLock::new(initial_time)),
        }
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut time = self
            .current_time
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *time += duration;
    }

    pub fn set(&self, new_time: DateTime<Utc>) {
        *self
            .current_time
            .write()
            .unwrap_or_else(PoisonError::into_inner) = new_time;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .current_time
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_manual_clock_advances_shared_state() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let shared = clock.clone();

        shared.advance(Duration::minutes(90));
        assert_eq!(clock.now(), start + Duration::minutes(90));
        assert_eq!(clock.now_naive(), (start + Duration::minutes(90)).naive_utc());
    }
}
