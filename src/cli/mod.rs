//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `fit`: 逐 pT bin 拟合不变质量峰并提取产额
//! - `inspect`: 列出存档中的直方图
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: fit, inspect

pub mod fit;
pub mod inspect;

use clap::{Parser, Subcommand};

/// lambda-yield - Λ 不变质量峰拟合与产额提取
#[derive(Parser)]
#[command(name = "lambda-yield")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Invariant-mass peak fitting and raw yield extraction for Lambda candidates", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Fit the Lambda mass peak in every pT bin and extract the raw yield spectrum
    Fit(fit::FitArgs),

    /// List the histograms available in an archive
    Inspect(inspect::InspectArgs),
}
