//! # Provider Blacklist Library
//!
//! 上游服务商故障隔离核心：失败计数、阈值拉黑、等级退避与惰性自动恢复

pub mod blacklist;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod testing;

// Re-export commonly used types
pub use blacklist::ProviderBlacklistService;
pub use config::AppConfig;
pub use error::{BlacklistError, Result};
