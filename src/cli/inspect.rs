//! # inspect 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/inspect.rs`

use clap::Args;
use std::path::PathBuf;

/// inspect 子命令参数
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input: long-format histogram table (CSV) or directory of per-histogram CSV files
    pub input: PathBuf,

    /// Histogram name prefix used to detect pT bin indices
    #[arg(long, default_value = "hMassLambdaPt")]
    pub prefix: String,

    /// Glob pattern for histogram files (directory input)
    #[arg(long, default_value = "*.csv")]
    pub pattern: String,
}
