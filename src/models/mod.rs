//! # 数据模型模块
//!
//! 定义不变质量直方图和 pT 分 bin 的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`fit/` 和 `commands/` 使用
//! - 子模块: histogram, binning

pub mod binning;
pub mod histogram;

pub use binning::{PtBin, PtBinScheme, PtSeries};
pub use histogram::MassHistogram;
