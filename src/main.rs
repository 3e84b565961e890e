//! # Provider Blacklist 运维命令行
//!
//! 对黑名单库执行迁移、查询、手动记录失败/成功、重置与设置修改

use clap::{Parser, Subcommand};
use provider_blacklist::{
    BlacklistError, ProviderBlacklistService, Result,
    config::{self, AppConfig},
    database, lerror, linfo,
    logging::{self, LogComponent, LogStage},
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "provider-blacklist", version, about = "服务商黑名单运维工具")]
struct Cli {
    /// 配置文件路径
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// 日志级别
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 执行数据库迁移
    Migrate,
    /// 查询服务商当前是否被拉黑
    Check { platform: String, provider: String },
    /// 记录一次失败
    Fail { platform: String, provider: String },
    /// 记录一次成功
    Success { platform: String, provider: String },
    /// 手动重置服务商为健康状态
    Reset { platform: String, provider: String },
    /// 列出全部服务商记录
    List,
    /// 查看或修改黑名单设置
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    /// 显示当前设置
    Show,
    /// 修改一个设置
    Set { key: String, value: String },
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    platform: &'a str,
    provider: &'a str,
    blacklisted: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_optimized_logging(cli.log_level.as_ref());

    if let Err(e) = run(cli).await {
        lerror!(
            "system",
            LogStage::Shutdown,
            LogComponent::Main,
            "command_failed",
            &format!("命令执行失败: {e}"),
            retryable = e.is_retryable()
        );
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let app_config = config::load_config(cli.config.as_deref())?;
    let db = Arc::new(init_data(&app_config).await?);

    if matches!(cli.command, Command::Migrate) {
        let pending = database::check_database_status(&db).await?;
        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Database,
            "migrate_done",
            "数据库迁移检查完成",
            pending = pending
        );
        return Ok(());
    }

    let service = ProviderBlacklistService::new(db, &app_config.blacklist);

    match cli.command {
        Command::Migrate => {}
        Command::Check { platform, provider } => {
            let blacklisted = service.is_blacklisted(&platform, &provider).await?;
            print_json(&CheckOutput {
                platform: &platform,
                provider: &provider,
                blacklisted,
            })?;
        }
        Command::Fail { platform, provider } => {
            let outcome = service.record_failure_detailed(&platform, &provider).await?;
            linfo!(
                "system",
                LogStage::FailureRecording,
                LogComponent::Main,
                "cli_failure_recorded",
                "失败已记录",
                failure_count = outcome.failure_count,
                escalation = ?outcome.escalation
            );
            print_json(&service.record(&platform, &provider).await?)?;
        }
        Command::Success { platform, provider } => {
            service.record_success(&platform, &provider).await?;
            print_json(&service.record(&platform, &provider).await?)?;
        }
        Command::Reset { platform, provider } => {
            let existed = service.reset_provider(&platform, &provider).await?;
            if !existed {
                return Err(BlacklistError::internal(format!(
                    "服务商记录不存在: {platform}/{provider}"
                )));
            }
            print_json(&service.record(&platform, &provider).await?)?;
        }
        Command::List => print_json(&service.list_records().await?)?,
        Command::Settings { action } => match action {
            SettingsAction::Show => print_json(&service.settings().await)?,
            SettingsAction::Set { key, value } => {
                service.set_setting(&key, &value).await?;
                print_json(&service.settings().await)?;
            }
        },
    }

    Ok(())
}

/// 连接数据库并确保表结构存在
async fn init_data(app_config: &AppConfig) -> Result<sea_orm::DatabaseConnection> {
    let db = database::init_database(&app_config.database)
        .await
        .map_err(|e| BlacklistError::database_with_source("数据库连接失败", e))?;
    database::run_migrations(&db)
        .await
        .map_err(|e| BlacklistError::database_with_source("数据库迁移失败", e))?;
    Ok(db)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
