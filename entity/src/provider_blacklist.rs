//! # 服务商黑名单实体定义
//!
//! 每个 (platform, provider_name) 一行，记录失败窗口、黑名单等级与恢复状态

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 服务商黑名单实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "provider_blacklist")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub platform: String,
    pub provider_name: String,
    pub failure_count: i32,
    pub blacklisted_at: Option<DateTime>,
    pub blacklisted_until: Option<DateTime>,
    pub last_failure_at: Option<DateTime>,
    pub blacklist_level: i32,
    pub last_recovered_at: Option<DateTime>,
    /// 最近一次升级所在的小时桶（Unix 纪元起的整小时数）
    pub last_degrade_hour: i64,
    pub last_failure_window_start: Option<DateTime>,
    pub auto_recovered: bool,
    /// 乐观锁版本号，每次写入递增
    pub version: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 在给定时间点是否处于黑名单中（`blacklisted_until` 严格晚于 `now`）
    #[must_use]
    pub fn is_blacklisted_at(&self, now: DateTime) -> bool {
        self.blacklisted_until.is_some_and(|until| until > now)
    }

    /// 黑名单是否已到期但尚未被惰性恢复
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime) -> bool {
        self.blacklisted_until.is_some_and(|until| now >= until)
    }
}
