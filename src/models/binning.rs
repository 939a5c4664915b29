//! # pT 分 bin 数据模型
//!
//! 用显式的 bin 描述符代替按名字逐个取直方图：
//! `PtBinScheme` 生成有序的 `PtBin` 列表并给出每个 bin 对应的直方图名，
//! `PtSeries` 是加载并校验后的 `PtBin → MassHistogram` 映射。
//!
//! ## 依赖关系
//! - 被 `parsers/archive.rs` 用于解析 pT 序列
//! - 被 `fit/engine.rs` 遍历

use crate::error::{Result, YieldError};
use crate::models::MassHistogram;

/// 单个 pT 区间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PtBin {
    /// 1 起始的序号（与直方图名中的序号一致）
    pub index: usize,
    /// 下边界 (GeV/c)
    pub low: f64,
    /// 上边界 (GeV/c)
    pub high: f64,
}

impl PtBin {
    pub fn center(&self) -> f64 {
        0.5 * (self.low + self.high)
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    /// 用于图表标题和表格的区间标签
    pub fn label(&self) -> String {
        format!("({:.3}, {:.3})", self.low, self.high)
    }
}

/// 固定宽度的 pT 分 bin 方案
#[derive(Debug, Clone, PartialEq)]
pub struct PtBinScheme {
    /// 第一个 bin 的下边界 (GeV/c)
    pub first_low: f64,
    /// bin 宽度 (GeV/c)
    pub width: f64,
    /// bin 数量
    pub count: usize,
    /// 直方图名前缀，序号直接拼接在后面
    pub prefix: String,
    /// 直方图所在目录（为空则直接使用前缀）
    pub directory: Option<String>,
}

impl Default for PtBinScheme {
    fn default() -> Self {
        PtBinScheme {
            first_low: 0.5,
            width: 0.125,
            count: 16,
            prefix: "hMassLambdaPt".to_string(),
            directory: Some("strangeness_tutorial/Lambda".to_string()),
        }
    }
}

impl PtBinScheme {
    /// 检查参数合法性
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(YieldError::InvalidArgument(
                "number of pT bins must be positive".to_string(),
            ));
        }
        if !(self.width > 0.0) || !self.width.is_finite() {
            return Err(YieldError::InvalidArgument(format!(
                "pT bin width must be positive, got {}",
                self.width
            )));
        }
        if !self.first_low.is_finite() || self.first_low < 0.0 {
            return Err(YieldError::InvalidArgument(format!(
                "pT start must be non-negative, got {}",
                self.first_low
            )));
        }
        if self.prefix.trim().is_empty() {
            return Err(YieldError::InvalidArgument(
                "histogram prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// 按 pT 递增顺序生成全部 bin
    pub fn bins(&self) -> Vec<PtBin> {
        (0..self.count)
            .map(|i| {
                let low = self.first_low + i as f64 * self.width;
                PtBin {
                    index: i + 1,
                    low,
                    high: low + self.width,
                }
            })
            .collect()
    }

    /// bin 对应的直方图名：`<directory>/<prefix><index>`
    pub fn histogram_name(&self, bin: &PtBin) -> String {
        match self.directory.as_deref().map(|d| d.trim_matches('/')) {
            Some(dir) if !dir.is_empty() => format!("{}/{}{}", dir, self.prefix, bin.index),
            _ => format!("{}{}", self.prefix, bin.index),
        }
    }
}

/// 有序的 pT bin → 直方图映射
#[derive(Debug, Clone)]
pub struct PtSeries {
    entries: Vec<(PtBin, MassHistogram)>,
}

impl PtSeries {
    /// 创建并按 bin 序号排序，序号重复则报错
    pub fn new(mut entries: Vec<(PtBin, MassHistogram)>) -> Result<Self> {
        entries.sort_by_key(|(bin, _)| bin.index);
        if let Some(pair) = entries.windows(2).find(|w| w[0].0.index == w[1].0.index) {
            return Err(YieldError::InvalidArgument(format!(
                "duplicate pT bin index {}",
                pair[0].0.index
            )));
        }
        Ok(PtSeries { entries })
    }

    pub fn entries(&self) -> &[(PtBin, MassHistogram)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 按序号查找
    pub fn get(&self, index: usize) -> Option<&(PtBin, MassHistogram)> {
        self.entries.iter().find(|(bin, _)| bin.index == index)
    }
}
