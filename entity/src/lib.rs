//! # Entity 模块
//!
//! 包含黑名单引擎使用的 Sea-ORM 实体定义

pub mod app_settings;
pub mod provider_blacklist;

pub use app_settings::Entity as AppSettings;
pub use provider_blacklist::Entity as ProviderBlacklist;

#[cfg(test)]
mod tests;
