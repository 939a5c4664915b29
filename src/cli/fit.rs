//! # fit 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/fit.rs`

use clap::Args;
use std::path::PathBuf;

/// fit 子命令参数
#[derive(Args, Debug)]
pub struct FitArgs {
    /// Input: long-format histogram table (CSV) or directory of per-histogram CSV files
    pub input: PathBuf,

    // ─────────────────────────────────────────────────────────────
    // pT 分 bin
    // ─────────────────────────────────────────────────────────────
    /// Directory of the per-pT-bin histograms inside the archive
    #[arg(long, default_value = "strangeness_tutorial/Lambda")]
    pub hist_dir: String,

    /// Histogram name prefix; the 1-based pT bin index is appended
    #[arg(long, default_value = "hMassLambdaPt")]
    pub prefix: String,

    /// Number of pT bins
    #[arg(long, default_value_t = 16)]
    pub bins: usize,

    /// Lower edge of the first pT bin (GeV/c)
    #[arg(long, default_value_t = 0.5)]
    pub pt_start: f64,

    /// Width of each pT bin (GeV/c)
    #[arg(long, default_value_t = 0.125)]
    pub pt_width: f64,

    // ─────────────────────────────────────────────────────────────
    // 拟合参数
    // ─────────────────────────────────────────────────────────────
    /// Fit window in GeV/c² (e.g., "1.05-1.2")
    #[arg(short, long, default_value = "1.05-1.2")]
    pub window: String,

    /// Minimum signal value for a bin to enter the yield integral (counts)
    #[arg(long, default_value_t = 1.0)]
    pub noise_floor: f64,

    /// Minimum entries in the fit window; sparser bins are reported as degenerate
    #[arg(long, default_value_t = 1.0)]
    pub min_entries: f64,

    /// Initial Gaussian amplitude (default: highest count in the window)
    #[arg(long)]
    pub amplitude_seed: Option<f64>,

    /// Initial Gaussian mean (GeV/c²)
    #[arg(long, default_value_t = 1.115)]
    pub mean_seed: f64,

    /// Initial Gaussian width (GeV/c²)
    #[arg(long, default_value_t = 2.22915e-3)]
    pub sigma_seed: f64,

    /// Maximum number of minimizer iterations per bin
    #[arg(long, default_value_t = 500)]
    pub max_iter: usize,

    /// Relative convergence tolerance of the minimizer
    #[arg(long, default_value_t = 1e-9)]
    pub tolerance: f64,

    /// Also fit this pT-integrated histogram and report it separately (e.g., "strangeness_tutorial/Lambda/hMassLambda")
    #[arg(long)]
    pub inclusive: Option<String>,

    // ─────────────────────────────────────────────────────────────
    // 输出
    // ─────────────────────────────────────────────────────────────
    /// Output CSV file for the yield spectrum
    #[arg(short, long, default_value = "lambda_yields.csv")]
    pub output: PathBuf,

    /// Output CSV file for the sampled fit curves
    #[arg(long)]
    pub curves: Option<PathBuf>,

    /// Output image with one fit panel per pT bin (PNG or SVG by extension)
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// Output image of the yield versus pT (PNG or SVG by extension)
    #[arg(long)]
    pub spectrum_plot: Option<PathBuf>,

    /// Figure width in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 2000)]
    pub width: u32,

    /// Figure height in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 1000)]
    pub height: u32,

    // ─────────────────────────────────────────────────────────────
    // 批量处理参数
    // ─────────────────────────────────────────────────────────────
    /// Glob pattern for histogram files (directory input, e.g., "*.csv")
    #[arg(long, default_value = "*.csv")]
    pub pattern: String,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0, env = "LAMBDA_YIELD_JOBS")]
    pub jobs: usize,
}
