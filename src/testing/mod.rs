//! # 测试框架模块
//!
//! 提供测试工具和测试辅助函数

#[cfg(any(test, feature = "testing"))]
pub mod helpers;

#[cfg(any(test, feature = "testing"))]
pub use helpers::*;
