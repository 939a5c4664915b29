//! # 统一错误处理模块
//!
//! 定义 lambda-yield 的所有错误类型，使用 `thiserror` 派生。
//!
//! 单个 pT bin 的拟合失败不是错误：它作为 `FitOutcome::Failed` 记录在
//! 产额谱中，不会中断其他 bin 的处理。这里只包含会终止整次运行的错误。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// lambda-yield 统一错误类型
#[derive(Error, Debug)]
pub enum YieldError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 输入错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Invalid histogram '{name}': {reason}")]
    InvalidHistogram { name: String, reason: String },

    #[error("Histogram '{name}' not found in archive")]
    HistogramNotFound { name: String },

    #[error("No histograms found in '{path}' with pattern: {pattern}")]
    NoHistogramsFound { path: String, pattern: String },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid range format: {0}")]
    InvalidRange(String),

    // ─────────────────────────────────────────────────────────────
    // 输出错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Plot error: {0}")]
    PlotError(String),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, YieldError>;
