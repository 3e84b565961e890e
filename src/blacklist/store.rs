//! # 黑名单记录存储
//!
//! 每个 (platform, provider_name) 一行。读改写通过 `version` 列做乐观并发控制：
//! 写入是单条条件 `UPDATE`，版本不匹配时不修改任何数据并返回 `false`。

use crate::database_error;
use crate::error::{Context, Result};
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};
use chrono::NaiveDateTime;
use entity::provider_blacklist::{self, ActiveModel, Column, Entity as ProviderBlacklist, Model};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;

/// 黑名单记录存储
#[derive(Clone)]
pub struct BlacklistStore {
    db: Arc<DatabaseConnection>,
}

impl BlacklistStore {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 读取记录，不存在时返回 `None`（不会创建）
    pub async fn find(&self, platform: &str, provider_name: &str) -> Result<Option<Model>> {
        ProviderBlacklist::find()
            .filter(Column::Platform.eq(platform))
            .filter(Column::ProviderName.eq(provider_name))
            .one(self.db.as_ref())
            .await
            .with_context(|| format!("读取黑名单记录失败: {platform}/{provider_name}"))
    }

    /// 读取或创建一条健康记录
    ///
    /// 并发插入由唯一约束裁决：`ON CONFLICT DO NOTHING` 后统一重新读取。
    pub async fn get_or_create(
        &self,
        platform: &str,
        provider_name: &str,
        now: NaiveDateTime,
    ) -> Result<Model> {
        if let Some(record) = self.find(platform, provider_name).await? {
            return Ok(record);
        }

        let fresh = ActiveModel {
            platform: Set(platform.to_string()),
            provider_name: Set(provider_name.to_string()),
            failure_count: Set(0),
            blacklisted_at: Set(None),
            blacklisted_until: Set(None),
            last_failure_at: Set(None),
            blacklist_level: Set(0),
            last_recovered_at: Set(None),
            last_degrade_hour: Set(0),
            last_failure_window_start: Set(None),
            auto_recovered: Set(false),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = ProviderBlacklist::insert(fresh)
            .on_conflict(
                OnConflict::columns([Column::Platform, Column::ProviderName])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .with_context(|| format!("创建黑名单记录失败: {platform}/{provider_name}"))?;

        if inserted == 0 {
            ldebug!(
                "system",
                LogStage::Persistence,
                LogComponent::Store,
                "insert_race_lost",
                "Concurrent writer created the record first, re-reading",
                platform = %platform,
                provider = %provider_name
            );
        }

        self.find(platform, provider_name)
            .await?
            .ok_or_else(|| database_error!("黑名单记录创建后无法读取: {}/{}", platform, provider_name))
    }

    /// 乐观并发保存整条记录
    ///
    /// 仅当数据库中的版本仍为 `expected_version` 时写入，并把版本加一。
    /// 返回 `false` 表示有并发写入，调用方需要重新读取后重试。
    pub async fn compare_and_save(
        &self,
        record: &Model,
        expected_version: i32,
        now: NaiveDateTime,
    ) -> Result<bool> {
        let changes = ActiveModel {
            failure_count: Set(record.failure_count),
            blacklisted_at: Set(record.blacklisted_at),
            blacklisted_until: Set(record.blacklisted_until),
            last_failure_at: Set(record.last_failure_at),
            blacklist_level: Set(record.blacklist_level),
            last_recovered_at: Set(record.last_recovered_at),
            last_degrade_hour: Set(record.last_degrade_hour),
            last_failure_window_start: Set(record.last_failure_window_start),
            auto_recovered: Set(record.auto_recovered),
            version: Set(expected_version + 1),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = ProviderBlacklist::update_many()
            .set(changes)
            .filter(Column::Id.eq(record.id))
            .filter(Column::Version.eq(expected_version))
            .exec(self.db.as_ref())
            .await
            .with_context(|| {
                format!(
                    "保存黑名单记录失败: {}/{}",
                    record.platform, record.provider_name
                )
            })?;

        Ok(result.rows_affected == 1)
    }

    /// 手动重置为健康的零级记录，返回记录是否存在
    pub async fn reset(
        &self,
        platform: &str,
        provider_name: &str,
        now: NaiveDateTime,
    ) -> Result<bool> {
        let result = ProviderBlacklist::update_many()
            .col_expr(Column::FailureCount, Expr::value(0))
            .col_expr(Column::BlacklistedAt, Expr::value(Option::<NaiveDateTime>::None))
            .col_expr(Column::BlacklistedUntil, Expr::value(Option::<NaiveDateTime>::None))
            .col_expr(Column::BlacklistLevel, Expr::value(0))
            .col_expr(Column::LastDegradeHour, Expr::value(0_i64))
            .col_expr(
                Column::LastFailureWindowStart,
                Expr::value(Option::<NaiveDateTime>::None),
            )
            .col_expr(Column::AutoRecovered, Expr::value(false))
            .col_expr(Column::Version, Expr::col(Column::Version).add(1))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Platform.eq(platform))
            .filter(Column::ProviderName.eq(provider_name))
            .exec(self.db.as_ref())
            .await
            .with_context(|| format!("重置黑名单记录失败: {platform}/{provider_name}"))?;

        Ok(result.rows_affected > 0)
    }

    /// 全部记录，按 platform、provider_name 排序
    pub async fn list(&self) -> Result<Vec<provider_blacklist::Model>> {
        ProviderBlacklist::find()
            .order_by_asc(Column::Platform)
            .order_by_asc(Column::ProviderName)
            .all(self.db.as_ref())
            .await
            .context("读取黑名单列表失败")
    }
}
