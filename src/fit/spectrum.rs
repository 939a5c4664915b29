//! # 拟合结果与产额谱
//!
//! 每个 pT bin 的结果是三种状态之一：
//! - `Converged`: 拟合收敛，带模型参数和产额
//! - `Degenerate`: 数据不足（如全零直方图），产额为 0，不做拟合
//! - `Failed`: 最小化失败，不给出产额
//!
//! `YieldSpectrum` 按 pT 递增保存全部结果，与计算完成顺序无关。
//!
//! ## 依赖关系
//! - 被 `fit/engine.rs` 构造
//! - 被 `fit/export.rs`, `fit/plot.rs`, `commands/fit.rs` 读取

use crate::fit::model::{BackgroundModel, CompositeModel, SignalModel};
use crate::models::PtBin;

/// 收敛的拟合
#[derive(Debug, Clone, PartialEq)]
pub struct PeakFit {
    /// 收敛后的复合模型（σ 已取正）
    pub model: CompositeModel,
    /// 信号参数误差 `[A, μ, σ]`，法方程奇异时为 None
    pub signal_errors: Option<[f64; 3]>,
    pub chi2: f64,
    /// 自由度 = 拟合点数 - 参数个数
    pub ndf: i64,
    pub iterations: usize,
    /// 拟合窗口
    pub window: (f64, f64),
}

impl PeakFit {
    pub fn background(&self) -> BackgroundModel {
        self.model.background
    }

    pub fn signal(&self) -> SignalModel {
        self.model.signal
    }

    /// χ²/ndf，ndf <= 0 时为 None
    pub fn reduced_chi2(&self) -> Option<f64> {
        (self.ndf > 0).then(|| self.chi2 / self.ndf as f64)
    }
}

/// 单个 pT bin 的产额
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BinYield {
    /// signal_sum - background_sum
    pub value: f64,
    /// sqrt(signal_sum)
    pub uncertainty: f64,
    pub signal_sum: f64,
    pub background_sum: f64,
    /// 信号超过噪声阈值的质量 bin 数
    pub bins_used: usize,
}

impl BinYield {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// 单个 pT bin 的拟合结局
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    Converged { fit: PeakFit, bin_yield: BinYield },
    Degenerate { reason: String, bin_yield: BinYield },
    Failed { reason: String },
}

impl FitOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            FitOutcome::Converged { .. } => "converged",
            FitOutcome::Degenerate { .. } => "degenerate",
            FitOutcome::Failed { .. } => "failed",
        }
    }

    pub fn fit(&self) -> Option<&PeakFit> {
        match self {
            FitOutcome::Converged { fit, .. } => Some(fit),
            _ => None,
        }
    }

    /// 失败时没有产额
    pub fn bin_yield(&self) -> Option<&BinYield> {
        match self {
            FitOutcome::Converged { bin_yield, .. } | FitOutcome::Degenerate { bin_yield, .. } => {
                Some(bin_yield)
            }
            FitOutcome::Failed { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            FitOutcome::Converged { .. } => "",
            FitOutcome::Degenerate { reason, .. } | FitOutcome::Failed { reason } => reason,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FitOutcome::Failed { .. })
    }
}

/// 单个 pT bin 的完整结果
#[derive(Debug, Clone, PartialEq)]
pub struct BinResult {
    pub bin: PtBin,
    pub histogram: String,
    pub outcome: FitOutcome,
}

/// 产额谱上的一个点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumPoint {
    pub pt: f64,
    pub half_width: f64,
    pub value: f64,
    pub uncertainty: f64,
    pub background_sum: f64,
}

/// 结果统计
#[derive(Debug, Default)]
pub struct SpectrumSummary {
    pub converged: usize,
    pub degenerate: usize,
    pub failed: usize,
    /// (直方图名, 失败原因)
    pub failures: Vec<(String, String)>,
}

impl SpectrumSummary {
    /// 合并单个结果
    pub fn merge(&mut self, result: &BinResult) {
        match &result.outcome {
            FitOutcome::Converged { .. } => self.converged += 1,
            FitOutcome::Degenerate { .. } => self.degenerate += 1,
            FitOutcome::Failed { reason } => {
                self.failed += 1;
                self.failures.push((result.histogram.clone(), reason.clone()));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.converged + self.degenerate + self.failed
    }
}

/// 按 pT 排序的产额谱
#[derive(Debug, Clone, PartialEq, Default)]
pub struct YieldSpectrum {
    results: Vec<BinResult>,
}

impl YieldSpectrum {
    pub fn from_results(mut results: Vec<BinResult>) -> Self {
        results.sort_by_key(|r| r.bin.index);
        YieldSpectrum { results }
    }

    pub fn results(&self) -> &[BinResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// 有产额的点（收敛和退化的 bin）
    pub fn points(&self) -> Vec<SpectrumPoint> {
        self.results
            .iter()
            .filter_map(|r| {
                r.outcome.bin_yield().map(|y| SpectrumPoint {
                    pt: r.bin.center(),
                    half_width: r.bin.width() / 2.0,
                    value: y.value,
                    uncertainty: y.uncertainty,
                    background_sum: y.background_sum,
                })
            })
            .collect()
    }

    pub fn summary(&self) -> SpectrumSummary {
        let mut summary = SpectrumSummary::default();
        for result in &self.results {
            summary.merge(result);
        }
        summary
    }
}
