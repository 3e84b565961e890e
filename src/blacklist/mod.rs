//! # 服务商黑名单模块
//!
//! 按 (platform, provider_name) 统计失败次数，越过阈值后暂时拉黑服务商，
//! 冷却期结束后在下一次查询时自动恢复。重复失败的服务商按等级指数退避。

pub mod clock;
pub mod escalation;
pub mod recovery;
pub mod service;
pub mod settings;
pub mod store;
pub mod tracker;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use escalation::{EscalationOutcome, EscalationPolicy};
pub use recovery::RecoveryEvaluator;
pub use service::ProviderBlacklistService;
pub use settings::SettingsProvider;
pub use store::BlacklistStore;
pub use tracker::{FailureOutcome, FailureTracker};
pub use types::{BlacklistSettings, ProviderKey, SettingKey};
