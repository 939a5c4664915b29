//! # lambda-yield - Λ 原始产额提取工具
//!
//! 对每个横动量 (pT) bin 的 Λ 候选不变质量直方图，拟合
//! 四次多项式本底 + 高斯信号，拆分两者并积分得到原始产额及其统计误差。
//!
//! ## 子命令
//! - `fit` - 逐 pT bin 拟合并输出产额谱 (CSV/PNG/SVG)
//! - `inspect` - 列出直方图存档内容
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (直方图读取)
//!   │     ├── fit/       (拟合、积分、导出、绘图)
//!   │     ├── batch/     (文件收集、并行执行)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod fit;
mod models;
mod parsers;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
