//! # 峰拟合模块
//!
//! 不变质量峰的拟合、信号/本底分解与产额提取。
//!
//! ## 子模块
//! - `model`: 本底、信号和复合模型
//! - `minimizer`: Levenberg–Marquardt 加权最小二乘
//! - `engine`: 逐 pT bin 拟合与产额积分
//! - `spectrum`: 拟合结果与产额谱
//! - `export`: CSV 导出
//! - `plot`: 图表生成
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 使用
//! - 使用 `models/` 的直方图和 pT 分 bin

pub mod engine;
pub mod export;
pub mod minimizer;
pub mod model;
pub mod plot;
pub mod spectrum;

pub use engine::{FitConfig, PeakFitEngine};
pub use spectrum::{FitOutcome, YieldSpectrum};
