//! # 解析器模块
//!
//! 读取导出的不变质量直方图，并组织成按名字索引的存档。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: histogram, archive

pub mod archive;
pub mod histogram;

pub use archive::HistogramArchive;
