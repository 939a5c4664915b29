//! # 批量处理模块
//!
//! 提供文件收集和并行执行能力。
//!
//! ## 功能
//! - 收集目录中匹配模式的直方图文件
//! - 有序并行处理
//! - 进度反馈
//!
//! ## 依赖关系
//! - 被 `parsers/archive.rs` 和 `fit/engine.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::FileCollector;
pub use runner::BatchRunner;
