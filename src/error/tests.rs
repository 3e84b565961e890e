//! # 错误处理测试

use crate::error::{BlacklistError, Context};
use std::error::Error;

#[test]
fn test_config_error_creation() {
    let err = BlacklistError::config("测试配置错误");
    assert!(matches!(err, BlacklistError::Config { .. }));
    assert_eq!(err.to_string(), "配置错误: 测试配置错误");
    assert!(!err.is_retryable());
}

#[test]
fn test_database_error_with_source_is_retryable() {
    let db_err = sea_orm::DbErr::Custom("connection reset".to_string());
    let err = BlacklistError::database_with_source("写入黑名单记录失败", db_err);

    assert!(matches!(err, BlacklistError::Database { .. }));
    assert!(err.source().is_some());
    assert!(err.is_retryable());
}

#[test]
fn test_auto_conversion_from_db_err() {
    let err: BlacklistError = sea_orm::DbErr::RecordNotFound("x".to_string()).into();
    assert!(matches!(err, BlacklistError::Database { .. }));
    assert!(err.to_string().contains("数据库操作失败"));
}

#[test]
fn test_auto_conversion_from_toml_error() {
    let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
    let err: BlacklistError = toml_err.into();

    assert!(matches!(err, BlacklistError::Config { .. }));
    assert!(err.to_string().contains("TOML解析失败"));
}

#[test]
fn test_context_wraps_and_keeps_retryability() {
    let result: std::result::Result<(), sea_orm::DbErr> =
        Err(sea_orm::DbErr::Custom("timeout".to_string()));

    let err = result.context("加载黑名单记录失败").unwrap_err();
    assert!(matches!(err, BlacklistError::Context { .. }));
    assert!(err.to_string().starts_with("加载黑名单记录失败"));
    assert!(err.is_retryable());
}

#[test]
fn test_config_error_macro_formats() {
    let err = crate::config_error!("非法阈值: {}", 0);
    assert_eq!(err.to_string(), "配置错误: 非法阈值: 0");
}
